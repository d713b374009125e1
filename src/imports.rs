//! Go source discovery and import extraction.
//!
//! A package is one directory of `.go` files that compile together. The
//! scanner collects, per directory and without recursing:
//!
//! - the compilable source files (test files and files whose name starts with
//!   `.` or `_` are excluded, matching the Go toolchain's conventions), and
//! - the union of import paths those files reference.
//!
//! Extraction is line-oriented and deliberately permissive: it handles single
//! `import "x"` declarations and factored `import ( ... )` blocks, with or
//! without aliases, blank (`_`) and dot (`.`) imports. Being conservative
//! here matters more than being exact; a false positive surfaces as an
//! unresolved-import warning downstream, while a false negative would
//! silently drop a dependency edge.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

/// `import "path"` or `import alias "path"` on a single line.
static SINGLE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(?:[A-Za-z_][A-Za-z0-9_]*\s+|\.\s+)?"([^"]+)""#)
        .expect("single import pattern")
});

/// One entry inside a factored `import ( ... )` block.
static BLOCK_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:[A-Za-z_][A-Za-z0-9_]*\s+|\.\s+)?"([^"]+)""#)
        .expect("import block entry pattern")
});

/// Start of a factored import block, e.g. `import (`.
static BLOCK_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s*\(").expect("import block start pattern"));

/// Any quoted import path, for entries collapsed onto the block-start line.
static QUOTED_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("quoted path pattern"));

/// A Go package: one directory plus the sources that compile together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoPackage {
    /// Workspace-relative package directory.
    pub dir: String,
    /// Compilable source file names (sorted, no paths).
    pub files: Vec<String>,
    /// Union of import paths referenced by the sources (sorted, deduplicated).
    pub imports: Vec<String>,
}

/// Scans one package directory for Go sources and their imports.
///
/// Returns `None` when the directory contains no compilable Go files, which
/// lets callers skip non-package directories without treating them as
/// failures.
///
/// # Errors
///
/// Fails when the directory or one of its Go files cannot be read.
pub fn scan_package(root: &Path, dir: &str) -> Result<Option<GoPackage>> {
    let abs = if dir == "." { root.to_path_buf() } else { root.join(dir) };
    let entries = std::fs::read_dir(&abs)
        .with_context(|| format!("failed to read package directory {}", abs.display()))?;

    let mut files = Vec::new();
    let mut imports = BTreeSet::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", abs.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_compilable_source(&name) {
            continue;
        }
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let src = std::fs::read_to_string(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        imports.extend(extract_imports(&src));
        files.push(name);
    }

    if files.is_empty() {
        return Ok(None);
    }
    files.sort();
    Ok(Some(GoPackage {
        dir: dir.to_string(),
        files,
        imports: imports.into_iter().collect(),
    }))
}

/// Whether a file name is a compilable (non-test) Go source.
fn is_compilable_source(name: &str) -> bool {
    name.ends_with(".go")
        && !name.ends_with("_test.go")
        && !name.starts_with('.')
        && !name.starts_with('_')
}

/// Extracts the import paths referenced by one Go source text.
pub fn extract_imports(src: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut in_block = false;
    for line in src.lines() {
        if in_block {
            if line.trim_start().starts_with(')') {
                in_block = false;
                continue;
            }
            if let Some(caps) = BLOCK_ENTRY.captures(line) {
                found.insert(caps[1].to_string());
            }
            continue;
        }
        if BLOCK_START.is_match(line) {
            in_block = true;
            // Handle `import ("a"; "b")` collapsed onto the block-start line.
            if let Some(rest) = line.split_once('(').map(|(_, r)| r) {
                if rest.contains(')') {
                    in_block = false;
                }
                for caps in QUOTED_PATH.captures_iter(rest) {
                    found.insert(caps[1].to_string());
                }
            }
            continue;
        }
        if let Some(caps) = SINGLE_IMPORT.captures(line) {
            found.insert(caps[1].to_string());
        }
    }
    found
}
