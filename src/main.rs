//! depsync CLI entry point.
//!
//! Parses arguments, runs the selected command, and maps the outcome to the
//! process exit code: 0 clean, 1 drift or per-directory failures, 2 for
//! configuration errors that aborted before any file was touched.

use clap::Parser;
use colored::Colorize;
use depsync::cli::Cli;
use depsync::core::DepsyncError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.execute().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            let fatal_config = err
                .downcast_ref::<DepsyncError>()
                .is_some_and(DepsyncError::is_fatal);
            std::process::exit(if fatal_config { 2 } else { 1 });
        }
    }
}
