//! Error handling for depsync.
//!
//! The error system is split the same way as the rest of the crate's plumbing:
//! - [`DepsyncError`] - strongly-typed errors for the failure cases the tool
//!   needs to react to programmatically (configuration problems abort the run
//!   before any file is touched, an ambiguous provider skips one package, ...)
//! - `anyhow::Error` with context strings everywhere else, so that I/O and
//!   parse failures carry the path and operation that produced them.
//!
//! Common conversions are automatic: [`std::io::Error`] becomes
//! [`DepsyncError::Io`] via `#[from]`.

use thiserror::Error;

/// The main error type for depsync operations.
///
/// Variants fall into three groups with different blast radii:
///
/// - **Configuration** ([`Config`], [`RootNotFound`], [`InvalidModulePath`]):
///   fatal, reported before any BUILD file is modified. The CLI maps these to
///   exit code 2.
/// - **Per-package** ([`AmbiguousProvider`], [`BuildFileParse`]): abort only
///   the affected package directory; the run continues and summarizes them.
/// - **Mechanical** ([`InvalidLabel`], [`Io`]): propagated with surrounding
///   context by the caller.
///
/// [`Config`]: DepsyncError::Config
/// [`RootNotFound`]: DepsyncError::RootNotFound
/// [`InvalidModulePath`]: DepsyncError::InvalidModulePath
/// [`AmbiguousProvider`]: DepsyncError::AmbiguousProvider
/// [`BuildFileParse`]: DepsyncError::BuildFileParse
/// [`InvalidLabel`]: DepsyncError::InvalidLabel
/// [`Io`]: DepsyncError::Io
#[derive(Error, Debug)]
pub enum DepsyncError {
    /// Workspace configuration is missing a required setting or contains an
    /// invalid one.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// No workspace root marker was found walking up from the starting
    /// directory.
    ///
    /// depsync locates the workspace root by searching for `depsync.toml` in
    /// the starting directory and each parent, the same way git searches for
    /// `.git`.
    #[error("workspace root not found: no depsync.toml in '{start}' or any parent directory")]
    RootNotFound {
        /// The directory the search started from.
        start: String,
    },

    /// A configured module import path is malformed.
    #[error("invalid module import path '{path}': {reason}")]
    InvalidModulePath {
        /// The offending import path string.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A build label string did not match any accepted label form.
    #[error("invalid build label '{label}': {reason}")]
    InvalidLabel {
        /// The label string that failed to parse.
        label: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A BUILD file could not be parsed into statements.
    #[error("failed to parse {file}:{line}: {reason}")]
    BuildFileParse {
        /// Path of the file that failed to parse.
        file: String,
        /// 1-based line of the failure.
        line: usize,
        /// Parser diagnostic.
        reason: String,
    },

    /// A package directory contains more than one rule that could provide its
    /// Go package.
    ///
    /// depsync refuses to guess which rule owns the package; the directory is
    /// skipped and reported.
    #[error("ambiguous provider in '{dir}': rules '{first}' and '{second}' both provide the package")]
    AmbiguousProvider {
        /// Workspace-relative package directory.
        dir: String,
        /// Name of the first candidate rule.
        first: String,
        /// Name of the second candidate rule.
        second: String,
    },

    /// Standard I/O error from [`std::io::Error`].
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DepsyncError {
    /// Whether this error should abort the run before any file is modified.
    ///
    /// Configuration-level problems are fatal; everything else is scoped to a
    /// single package directory.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::RootNotFound { .. } | Self::InvalidModulePath { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DepsyncError::Config {
            message: "import_path is required".to_string(),
        };
        assert_eq!(err.to_string(), "configuration error: import_path is required");

        let err = DepsyncError::AmbiguousProvider {
            dir: "pkg/util".to_string(),
            first: "util".to_string(),
            second: "helpers".to_string(),
        };
        assert!(err.to_string().contains("pkg/util"));
        assert!(err.to_string().contains("helpers"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(
            DepsyncError::Config {
                message: String::new()
            }
            .is_fatal()
        );
        assert!(
            DepsyncError::RootNotFound {
                start: "/tmp".to_string()
            }
            .is_fatal()
        );
        assert!(
            !DepsyncError::AmbiguousProvider {
                dir: String::new(),
                first: String::new(),
                second: String::new(),
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: DepsyncError = io.into();
        assert!(matches!(err, DepsyncError::Io(_)));
    }
}
