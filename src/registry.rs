//! Registry of known module import paths.
//!
//! The registry answers one question during resolution: which module, if any,
//! owns a given import path. It holds the workspace's own module plus every
//! configured third-party module, and is built once per run from
//! configuration. After construction it is immutable and can be shared by
//! reference across any number of concurrent resolution passes.
//!
//! Matching is hierarchical, not textual: a module matches an import only at
//! path-segment boundaries, so module `org/mod` matches `org/mod` and
//! `org/mod/sub` but never `org/mod-extra`. When several modules match (a
//! multi-module repository where `org/mod` and `org/mod/sub` are both
//! configured), the longest one wins.

use crate::core::DepsyncError;

/// Result of classifying an import path against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleMatch<'a> {
    /// The matching module's import path.
    pub module: &'a str,
    /// Whether the match is the workspace's own module.
    pub is_local: bool,
}

/// Immutable set of known module import paths.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    local: String,
    external: Vec<String>,
}

impl ModuleRegistry {
    /// Builds a registry from the workspace module and the configured
    /// third-party modules.
    ///
    /// # Errors
    ///
    /// Returns [`DepsyncError::InvalidModulePath`] when any path is empty,
    /// has a leading or trailing slash, or contains an empty segment, and
    /// [`DepsyncError::Config`] when the same module is configured twice.
    /// These are construction-time configuration errors; classification
    /// itself cannot fail.
    pub fn new(local: impl Into<String>, external: Vec<String>) -> Result<Self, DepsyncError> {
        let local = local.into();
        validate_module_path(&local)?;
        let mut seen = std::collections::HashSet::new();
        seen.insert(local.clone());
        for module in &external {
            validate_module_path(module)?;
            if !seen.insert(module.clone()) {
                return Err(DepsyncError::Config {
                    message: format!("module '{module}' is configured more than once"),
                });
            }
        }
        Ok(Self { local, external })
    }

    /// The workspace's own module import path.
    #[must_use]
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Classifies an import path against the known modules.
    ///
    /// Returns the most specific (longest) matching module, or `None` when no
    /// module covers the import. The local module participates in the
    /// longest-match comparison like any other; on a length tie it wins, so
    /// the workspace always owns its own import namespace.
    #[must_use]
    pub fn classify(&self, import_path: &str) -> Option<ModuleMatch<'_>> {
        let mut best: Option<ModuleMatch<'_>> = None;
        if matches_at_boundary(&self.local, import_path) {
            best = Some(ModuleMatch {
                module: &self.local,
                is_local: true,
            });
        }
        for module in &self.external {
            if !matches_at_boundary(module, import_path) {
                continue;
            }
            let better = match best {
                Some(current) => module.len() > current.module.len(),
                None => true,
            };
            if better {
                best = Some(ModuleMatch {
                    module,
                    is_local: false,
                });
            }
        }
        best
    }
}

/// Whether `module` covers `import_path` at a `/` boundary.
///
/// True iff the import equals the module or extends it with a `/`-separated
/// suffix. A bare string-prefix match is not enough: `org/mod` must not match
/// `org/mod-extra`.
fn matches_at_boundary(module: &str, import_path: &str) -> bool {
    match import_path.strip_prefix(module) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

fn validate_module_path(path: &str) -> Result<(), DepsyncError> {
    let reject = |reason: &str| {
        Err(DepsyncError::InvalidModulePath {
            path: path.to_string(),
            reason: reason.to_string(),
        })
    };
    if path.is_empty() {
        return reject("empty import path");
    }
    if path.starts_with('/') || path.ends_with('/') {
        return reject("leading or trailing '/'");
    }
    if path.split('/').any(str::is_empty) {
        return reject("empty path segment");
    }
    Ok(())
}
