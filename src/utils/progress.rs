//! Progress reporting for long runs.
//!
//! A thin wrapper over `indicatif` that collapses to a no-op when progress
//! output is unwanted: quiet mode, `--no-progress`, or a non-interactive
//! stderr. Cloning is cheap, so one reporter can be shared across worker
//! tasks.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

/// A progress bar over a known number of work items, or silence.
#[derive(Clone)]
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    /// Creates a reporter over `len` items. When `enabled` is false or
    /// stderr is not a terminal, all operations become no-ops.
    #[must_use]
    pub fn new(len: u64, enabled: bool) -> Self {
        if !enabled || !std::io::stderr().is_terminal() {
            return Self { bar: None };
        }
        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar: Some(bar) }
    }

    /// A reporter that never renders anything.
    #[must_use]
    pub const fn hidden() -> Self {
        Self { bar: None }
    }

    /// Marks one item finished and shows what was just processed.
    pub fn inc(&self, message: impl Into<String>) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.into());
            bar.inc(1);
        }
    }

    /// Removes the bar from the terminal.
    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_reporter_is_noop() {
        let reporter = ProgressReporter::hidden();
        reporter.inc("pkg/a");
        reporter.finish_and_clear();
    }

    #[test]
    fn test_disabled_reporter_has_no_bar() {
        let reporter = ProgressReporter::new(10, false);
        assert!(reporter.bar.is_none());
    }
}
