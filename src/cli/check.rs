//! The `check` command: read-only drift detection, suitable for CI.

use super::GlobalOptions;
use super::common::{load_workspace, print_report};
use crate::sync::{SyncEngine, SyncOptions};
use crate::utils::progress::ProgressReporter;
use crate::walk::expand_paths;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;

/// Output format for the drift report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Report BUILD files whose `srcs`/`deps` no longer match the sources.
///
/// Never writes. Exits 1 when anything is out of sync, 2 when a directory
/// could not be processed at all.
#[derive(Args)]
pub struct CheckCommand {
    /// Directories, files, labels, or `...` wildcards to check. Defaults to
    /// the whole workspace.
    paths: Vec<String>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl CheckCommand {
    /// Runs the command and returns the process exit code.
    ///
    /// # Errors
    ///
    /// Fails on configuration problems and on unreadable path arguments.
    pub async fn execute(self, global: &GlobalOptions) -> Result<i32> {
        let ws = load_workspace(global.root.as_deref())?;
        let dirs = expand_paths(&ws.root, &ws.original_wd, &self.paths, &ws.config)?;

        let options = SyncOptions {
            dry_run: true,
            jobs: global.jobs.unwrap_or_else(|| SyncOptions::default().jobs),
        };
        let progress = ProgressReporter::new(
            dirs.len() as u64,
            !global.quiet && !global.no_progress && self.format == OutputFormat::Text,
        );
        let engine = SyncEngine::new(ws.root, ws.config)?;
        let report = engine.run(dirs, &options, &progress).await;

        match self.format {
            OutputFormat::Json => {
                let rendered = serde_json::to_string_pretty(&report)
                    .context("failed to serialize report")?;
                println!("{rendered}");
            }
            OutputFormat::Text => {
                print_report(&report, global.quiet);
                if !global.quiet && !report.has_drift() && !report.has_failures() {
                    println!("{}", "all BUILD files up to date".green());
                }
            }
        }

        if report.has_failures() {
            return Ok(2);
        }
        Ok(i32::from(report.has_drift()))
    }
}
