//! The `sync` command: reconcile BUILD files in place.

use super::GlobalOptions;
use super::common::{load_workspace, print_report, print_summary};
use crate::sync::{SyncEngine, SyncOptions};
use crate::utils::progress::ProgressReporter;
use crate::walk::expand_paths;
use anyhow::Result;
use clap::Args;
use tracing::debug;

/// Rewrite BUILD files so their `srcs` and `deps` match the Go sources.
#[derive(Args)]
pub struct SyncCommand {
    /// Directories, files, labels, or `...` wildcards to process. Defaults
    /// to the whole workspace.
    paths: Vec<String>,

    /// Compute and report changes without writing any file.
    #[arg(long)]
    dry_run: bool,
}

impl SyncCommand {
    /// Runs the command and returns the process exit code: 0 on success, 1
    /// when any directory failed.
    ///
    /// # Errors
    ///
    /// Fails on configuration problems and on unreadable path arguments;
    /// per-directory failures are reported and summarized instead.
    pub async fn execute(self, global: &GlobalOptions) -> Result<i32> {
        let ws = load_workspace(global.root.as_deref())?;
        let dirs = expand_paths(&ws.root, &ws.original_wd, &self.paths, &ws.config)?;
        debug!("processing {} package directories", dirs.len());

        let options = SyncOptions {
            dry_run: self.dry_run,
            jobs: global.jobs.unwrap_or_else(|| SyncOptions::default().jobs),
        };
        let progress = ProgressReporter::new(
            dirs.len() as u64,
            !global.quiet && !global.no_progress,
        );
        let engine = SyncEngine::new(ws.root, ws.config)?;
        let report = engine.run(dirs, &options, &progress).await;

        print_report(&report, global.quiet);
        if !self.dry_run {
            print_summary(&report, global.quiet);
        }
        Ok(i32::from(report.has_failures()))
    }
}
