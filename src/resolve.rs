//! Import path to build label resolution.
//!
//! Given a raw Go import path, the resolver decides which build target
//! provides it:
//!
//! 1. Standard-library imports (`fmt`, `net/http`) need no build dependency
//!    and resolve to [`Resolution::Stdlib`].
//! 2. Imports covered by the workspace's own module map to a workspace
//!    directory; the rule that actually provides the package is discovered
//!    through the [`ProviderLookup`] capability, because a directory can hold
//!    several rules and only its BUILD file knows which one owns the Go
//!    package.
//! 3. Imports covered by a known third-party module map into the configured
//!    third-party directory, with the module path flattened into a single
//!    directory token (`github.com/example/module` becomes
//!    `github.com_example_module`).
//! 4. Everything else is [`Resolution::Unresolved`]: recorded and reported,
//!    never fatal, because unmapped imports can be intentional (generated
//!    code, build-tag-only files).
//!
//! The resolver itself never touches the filesystem; all file knowledge comes
//! in through [`ProviderLookup`] and the registry.

use anyhow::Result;
use serde::Serialize;
use tracing::trace;

use crate::core::DepsyncError;
use crate::label::BuildLabel;
use crate::registry::ModuleRegistry;

/// Capability for discovering which rule in a directory provides its Go
/// package.
///
/// Implemented by the rule-file layer; resolution only needs the rule name.
/// `Ok(None)` means the directory has no providing rule yet, which makes the
/// import a candidate for rule creation rather than an error.
pub trait ProviderLookup {
    /// Returns the name of the rule providing the Go package in `dir`
    /// (workspace-relative), or `None` when no rule provides it.
    ///
    /// # Errors
    ///
    /// Fails when the directory's BUILD file cannot be read or parsed, or
    /// when several rules could provide the package
    /// ([`DepsyncError::AmbiguousProvider`]).
    fn providing_rule(&self, dir: &str) -> Result<Option<String>>;
}

/// Why an import could not be mapped to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No configured module covers the import path.
    UnknownModule,
    /// The import maps to a workspace directory with no providing rule.
    NoProvidingRule,
    /// The import maps to a workspace directory with several candidate rules.
    AmbiguousProvider,
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::UnknownModule => "no known module covers this import",
            Self::NoProvidingRule => "no rule provides this package",
            Self::AmbiguousProvider => "several rules could provide this package",
        };
        write!(f, "{text}")
    }
}

/// An import the resolver could not map to a target, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedImport {
    /// The raw import path.
    pub import: String,
    /// Why resolution failed.
    pub reason: UnresolvedReason,
}

/// Outcome of resolving one import path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The import is provided by this build target.
    Target(BuildLabel),
    /// Standard-library import; no dependency required.
    Stdlib,
    /// No target could be determined.
    Unresolved(UnresolvedImport),
}

/// Resolves a raw import path to a build target address.
///
/// `third_party_dir` is the workspace-relative directory third-party module
/// rules live under (typically `third_party/go`).
///
/// # Errors
///
/// Only structural failures propagate (an unreadable or unparseable BUILD
/// file encountered through `lookup`). "No match" outcomes are values, not
/// errors.
pub fn resolve(
    import_path: &str,
    registry: &ModuleRegistry,
    lookup: &dyn ProviderLookup,
    third_party_dir: &str,
) -> Result<Resolution> {
    let Some(matched) = registry.classify(import_path) else {
        if is_stdlib(import_path) {
            trace!("{import_path}: standard library, skipping");
            return Ok(Resolution::Stdlib);
        }
        trace!("{import_path}: no known module");
        return Ok(Resolution::Unresolved(UnresolvedImport {
            import: import_path.to_string(),
            reason: UnresolvedReason::UnknownModule,
        }));
    };

    if matched.is_local {
        return resolve_local(import_path, matched.module, lookup);
    }

    // Third-party: the module root maps to one directory under
    // third_party_dir, submodule packages become target names inside it.
    let flattened = matched.module.replace('/', "_");
    let package = format!("{third_party_dir}/{flattened}");
    let name = match import_path.strip_prefix(matched.module) {
        Some("") | None => "module".to_string(),
        Some(rest) => rest.trim_start_matches('/').to_string(),
    };
    trace!("{import_path}: third-party module {}", matched.module);
    Ok(Resolution::Target(BuildLabel::new(package, name)))
}

/// Resolves an import covered by the workspace's own module.
fn resolve_local(
    import_path: &str,
    module: &str,
    lookup: &dyn ProviderLookup,
) -> Result<Resolution> {
    let dir = match import_path.strip_prefix(module) {
        Some("") | None => ".",
        Some(rest) => rest.trim_start_matches('/'),
    };
    match lookup.providing_rule(dir) {
        Ok(Some(rule)) => {
            trace!("{import_path}: provided by //{dir}:{rule}");
            Ok(Resolution::Target(BuildLabel::new(dir, rule)))
        }
        Ok(None) => Ok(Resolution::Unresolved(UnresolvedImport {
            import: import_path.to_string(),
            reason: UnresolvedReason::NoProvidingRule,
        })),
        Err(err) => {
            if let Some(DepsyncError::AmbiguousProvider { .. }) =
                err.downcast_ref::<DepsyncError>()
            {
                return Ok(Resolution::Unresolved(UnresolvedImport {
                    import: import_path.to_string(),
                    reason: UnresolvedReason::AmbiguousProvider,
                }));
            }
            Err(err)
        }
    }
}

/// Whether an import path names a standard-library package.
///
/// Hosted modules always start with a dotted domain (`github.com/...`);
/// standard-library paths never do. This also covers the `C` pseudo-package
/// used by cgo.
fn is_stdlib(import_path: &str) -> bool {
    let first = import_path.split('/').next().unwrap_or(import_path);
    !first.contains('.')
}
