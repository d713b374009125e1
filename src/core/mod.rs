//! Core types for depsync.
//!
//! This module holds the foundation the rest of the crate builds on:
//!
//! - [`error`] - the [`DepsyncError`] enum and the conventions for when a
//!   failure aborts the whole run versus a single package directory.
//!
//! Everything else in the crate returns `anyhow::Result` and attaches context
//! at the call site; the typed variants here exist for the cases the
//! synchronizer and the CLI need to match on (fatal configuration errors get
//! exit code 2, an ambiguous provider becomes a per-package skip).

pub mod error;

pub use error::DepsyncError;
