//! depsync - keep BUILD files in sync with the imports of a Go workspace.
//!
//! A workspace is described by per-directory BUILD files whose rules declare
//! sources and dependencies; the source files themselves already encode the
//! real dependency graph through their imports. depsync closes the gap: for
//! every package directory it infers the required `srcs` and `deps`, then
//! rewrites the rule definitions minimally - adding missing dependency
//! edges, removing stale ones, creating rules for new packages - while
//! preserving every byte it does not manage.
//!
//! # Architecture Overview
//!
//! The crate is a library with a thin CLI on top. Data flows through four
//! core components:
//!
//! 1. [`registry`] - the set of known module import paths (the workspace's
//!    own module and all configured third-party modules), with boundary-safe
//!    longest-prefix classification.
//! 2. [`resolve`] - maps one raw import path to a build target address,
//!    consulting sibling BUILD files to learn which rule actually provides a
//!    local package.
//! 3. [`label`] - canonical formatting and parsing of target addresses,
//!    including the package-relative, root, shorthand and subrepository
//!    forms.
//! 4. [`sync`] - the per-directory state machine that computes required
//!    attribute sets, diffs them against the declared state, and applies
//!    minimal edits through [`buildfile`].
//!
//! Around those, the supporting cast:
//!
//! - [`buildfile`] - span-preserving BUILD file parsing and editing
//! - [`imports`] - Go source scanning and import extraction
//! - [`walk`] - workspace root discovery and `...` wildcard expansion
//! - [`config`] - workspace and per-directory configuration
//! - [`cli`] - the `sync` and `check` commands
//! - [`core`] - the error type and failure-scoping conventions
//! - [`utils`] - atomic writes, progress reporting
//!
//! # Example
//!
//! ```no_run
//! use depsync::config::WorkspaceConfig;
//! use depsync::sync::{SyncEngine, SyncOptions};
//! use depsync::utils::progress::ProgressReporter;
//! use depsync::walk::{expand_paths, find_workspace_root};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let root = find_workspace_root(std::path::Path::new("."))?;
//! let config = WorkspaceConfig::load(&root)?;
//! let dirs = expand_paths(&root, ".", &["...".to_string()], &config)?;
//!
//! let engine = SyncEngine::new(root, config)?;
//! let report = engine
//!     .run(dirs, &SyncOptions::default(), &ProgressReporter::hidden())
//!     .await;
//! assert!(!report.has_failures());
//! # Ok(())
//! # }
//! ```

pub mod buildfile;
pub mod cli;
pub mod config;
pub mod core;
pub mod imports;
pub mod label;
pub mod registry;
pub mod resolve;
pub mod sync;
pub mod utils;
pub mod walk;
