//! Shared plumbing for CLI commands: workspace discovery and report
//! rendering.

use crate::config::WorkspaceConfig;
use crate::sync::SyncReport;
use crate::walk::find_workspace_root;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Everything a command needs to know about where it is running.
pub struct WorkspaceContext {
    /// Absolute workspace root.
    pub root: PathBuf,
    /// Invocation directory relative to the root (`"."` at the root itself).
    pub original_wd: String,
    pub config: WorkspaceConfig,
}

/// Locates the workspace and loads its configuration.
///
/// With `--root` the given directory is used as-is; otherwise the root is
/// discovered by walking up from the current directory. The invocation
/// directory is recorded relative to the root so that relative path
/// arguments resolve against where the user actually ran the command.
///
/// # Errors
///
/// Fails when no workspace root can be found or the configuration is
/// invalid; both abort before any file is touched.
pub fn load_workspace(explicit_root: Option<&Path>) -> Result<WorkspaceContext> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let root = match explicit_root {
        Some(root) => root
            .canonicalize()
            .with_context(|| format!("invalid --root {}", root.display()))?,
        None => find_workspace_root(&cwd)?,
    };
    let original_wd = cwd
        .strip_prefix(&root)
        .map(|rel| rel.to_string_lossy().into_owned())
        .ok()
        .filter(|rel| !rel.is_empty())
        .unwrap_or_else(|| ".".to_string());
    let config = WorkspaceConfig::load(&root)?;
    Ok(WorkspaceContext {
        root,
        original_wd,
        config,
    })
}

/// Renders a run report for humans. File changes go to stdout; warnings and
/// failures go to stderr.
pub fn print_report(report: &SyncReport, quiet: bool) {
    if !quiet {
        for path in &report.updated {
            println!("{} {path}", "updated".green().bold());
        }
        for path in &report.created {
            println!("{} {path}", "created".cyan().bold());
        }
        for path in &report.out_of_sync {
            println!("{} {path}", "out-of-sync".yellow().bold());
        }
        for skipped in &report.skipped {
            println!("{} {}: {}", "skipped".yellow().bold(), skipped.dir, skipped.reason);
        }
    }
    for pkg in &report.unresolved {
        eprintln!("{} {}:", "warning".yellow().bold(), pkg.dir);
        for entry in &pkg.imports {
            eprintln!("  cannot resolve import '{}' ({})", entry.import, entry.reason);
        }
    }
    for failure in &report.failures {
        eprintln!("{} {}: {}", "failed".red().bold(), failure.dir, failure.error);
    }
}

/// One-line summary after a writing run.
pub fn print_summary(report: &SyncReport, quiet: bool) {
    if quiet {
        return;
    }
    let changed = report.updated.len() + report.created.len();
    if changed == 0 && !report.has_drift() {
        println!("{}", "all BUILD files up to date".green());
    } else if changed > 0 {
        println!(
            "{} file{} written",
            changed,
            if changed == 1 { "" } else { "s" }
        );
    }
}
