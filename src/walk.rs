//! Workspace root discovery and expansion of user-supplied paths.
//!
//! Arguments on the command line are a mix of forms: plain directories,
//! files, build-label syntax (`//pkg/dir:target`, `:target`), and recursive
//! wildcards (`pkg/...`). Expansion turns all of them into a flat list of
//! package directories relative to the workspace root.
//!
//! Relative arguments are interpreted against the directory the command was
//! invoked from (`original_wd`), not the root, so `cd pkg && depsync sync .`
//! does what it looks like. Nothing here consults the process working
//! directory; callers pass both the root and the invocation directory
//! explicitly.

use crate::config::{DIR_CONFIG, DirConfig, WORKSPACE_CONFIG, WorkspaceConfig};
use crate::core::DepsyncError;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Directory names never descended into.
const SKIP_DIRS: &[&str] = &[".git", "plz-out"];

/// Finds the workspace root: the nearest ancestor of `start` (inclusive)
/// containing the workspace configuration file.
///
/// # Errors
///
/// Returns [`DepsyncError::RootNotFound`] when no ancestor has one.
pub fn find_workspace_root(start: &Path) -> Result<PathBuf, DepsyncError> {
    for dir in start.ancestors() {
        if dir.join(WORKSPACE_CONFIG).is_file() {
            return Ok(dir.to_path_buf());
        }
    }
    Err(DepsyncError::RootNotFound {
        start: start.to_string_lossy().into_owned(),
    })
}

/// Expands user-supplied paths into workspace-relative package directories.
///
/// `original_wd` is the invocation directory relative to the root (`"."` when
/// invoked from the root itself). An empty `paths` list means the whole
/// workspace (`...`).
///
/// Rules, applied per argument:
///
/// - `//pkg/dir[:target]` strips the label syntax down to `pkg/dir`; a bare
///   `:target` means the invocation directory.
/// - A trailing `...` expands recursively, skipping `.git`, `plz-out`,
///   directories matching the configured ignore globs, and subtrees whose
///   directory configuration sets `stop = true`.
/// - A path naming a file is replaced by its parent directory, so a changed
///   file or the BUILD file itself can be passed directly.
///
/// Results preserve discovery order and are deduplicated.
///
/// # Errors
///
/// Fails on unreadable directories, on absolute paths outside the workspace,
/// and on malformed directory configuration files.
pub fn expand_paths(
    root: &Path,
    original_wd: &str,
    paths: &[String],
    config: &WorkspaceConfig,
) -> Result<Vec<String>> {
    let requested: Vec<String> = if paths.is_empty() {
        vec!["...".to_string()]
    } else {
        paths.to_vec()
    };
    let ignore = config.ignore_patterns();

    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut push = |dir: String, out: &mut Vec<String>| {
        if seen.insert(dir.clone()) {
            out.push(dir);
        }
    };

    for raw in &requested {
        let mut path = raw.clone();
        let mut anchored_to_root = false;

        // Build-label style arguments.
        if let Some(stripped) = path.strip_prefix("//") {
            path = match stripped.split_once(':') {
                Some((pkg, _)) => pkg.to_string(),
                None => stripped.to_string(),
            };
            anchored_to_root = true;
        } else if path.starts_with(':') {
            path = ".".to_string();
        }

        let mut wildcard = false;
        if path == "..." || path.ends_with("/...") {
            wildcard = true;
            path = path.trim_end_matches("...").trim_end_matches('/').to_string();
        }

        let rel = if Path::new(&path).is_absolute() {
            match Path::new(&path).strip_prefix(root) {
                Ok(stripped) => normalize(&stripped.to_string_lossy()),
                Err(_) => anyhow::bail!("path '{raw}' is outside the workspace root"),
            }
        } else if anchored_to_root {
            normalize(&path)
        } else {
            normalize(&format!("{original_wd}/{path}"))
        };
        let rel = if rel.is_empty() { ".".to_string() } else { rel };

        if !wildcard {
            // Accept a file argument (a changed source or the BUILD file
            // itself) in place of its directory.
            let abs = if rel == "." { root.to_path_buf() } else { root.join(&rel) };
            if abs.is_file() {
                let parent = Path::new(&rel)
                    .parent()
                    .map(|p| p.to_string_lossy().into_owned())
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| ".".to_string());
                push(parent, &mut out);
            } else {
                push(rel, &mut out);
            }
            continue;
        }

        debug!("expanding '{raw}' recursively from '{rel}'");
        let start = if rel == "." { root.to_path_buf() } else { root.join(&rel) };
        let mut walker = WalkDir::new(&start).follow_links(false).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry =
                entry.with_context(|| format!("failed to walk directory {}", start.display()))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if SKIP_DIRS.contains(&name.as_ref()) {
                walker.skip_current_dir();
                continue;
            }
            let rel_dir = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .into_owned();
            let rel_dir = if rel_dir.is_empty() { ".".to_string() } else { rel_dir };
            if rel_dir != "." && ignore.iter().any(|p| p.matches(&rel_dir)) {
                trace!("'{rel_dir}' matches an ignore pattern, skipping subtree");
                walker.skip_current_dir();
                continue;
            }
            let dir_config = DirConfig::load(entry.path())
                .with_context(|| format!("in {}", entry.path().join(DIR_CONFIG).display()))?;
            if dir_config.stop {
                trace!("'{rel_dir}' sets stop = true, skipping subtree");
                walker.skip_current_dir();
                continue;
            }
            push(rel_dir, &mut out);
        }
    }
    Ok(out)
}

/// Collapses `.` and `..` components of a `/`-separated path. The result has
/// no leading or trailing separator; an empty result means the root.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
