//! Command-line interface for depsync.
//!
//! Two commands cover the tool's whole surface:
//!
//! - `depsync sync [paths...]` - bring BUILD files in line with the source
//!   imports, rewriting files in place (`--dry-run` to preview).
//! - `depsync check [paths...]` - read-only drift detection for CI, with a
//!   machine-readable `--format json` mode.
//!
//! Path arguments accept directories, files, build labels and `...`
//! wildcards; with no arguments the whole workspace is processed.
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | clean |
//! | 1 | drift found (`check`) or some directories failed (`sync`) |
//! | 2 | configuration error, nothing was touched |

mod check;
pub mod common;
mod sync;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser)]
#[command(
    name = "depsync",
    about = "Keep BUILD files in sync with the imports of a Go workspace",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress everything except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Workspace root; discovered from the current directory when omitted.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Disable the progress bar.
    #[arg(long, global = true)]
    no_progress: bool,

    /// Number of directories to process concurrently.
    #[arg(short, long, global = true, value_name = "N")]
    jobs: Option<usize>,
}

/// Global flags shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Explicit workspace root, when given.
    pub root: Option<PathBuf>,
    pub quiet: bool,
    pub no_progress: bool,
    pub jobs: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite BUILD files to match the source imports.
    Sync(sync::SyncCommand),

    /// Report BUILD files that are out of sync, without writing.
    Check(check::CheckCommand),
}

impl Cli {
    /// Executes the parsed command and returns the process exit code.
    ///
    /// # Errors
    ///
    /// Propagates configuration and I/O errors; per-directory problems are
    /// handled inside the commands and reflected in the exit code instead.
    pub async fn execute(self) -> Result<i32> {
        init_logging(self.verbose, self.quiet);
        let global = GlobalOptions {
            root: self.root.clone(),
            quiet: self.quiet,
            no_progress: self.no_progress,
            jobs: self.jobs,
        };
        match self.command {
            Commands::Sync(cmd) => cmd.execute(&global).await,
            Commands::Check(cmd) => cmd.execute(&global).await,
        }
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` wins when set; otherwise
/// the verbosity flags pick the default filter.
fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose {
        "depsync=debug"
    } else if quiet {
        "error"
    } else {
        "depsync=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_sync() {
        let cli = Cli::try_parse_from(["depsync", "sync", "pkg/...", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Commands::Sync(_)));
    }

    #[test]
    fn test_cli_parses_check_with_globals() {
        let cli =
            Cli::try_parse_from(["depsync", "--quiet", "-j", "4", "check", "--format", "json"])
                .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.jobs, Some(4));
        assert!(matches!(cli.command, Commands::Check(_)));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["depsync", "-v", "-q", "sync"]).is_err());
    }
}
