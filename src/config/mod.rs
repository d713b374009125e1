//! Workspace and per-directory configuration.
//!
//! depsync reads two kinds of configuration file:
//!
//! 1. **Workspace configuration** (`depsync.toml` at the workspace root).
//!    Its presence is also what marks the root. It names the workspace's own
//!    Go module, the known third-party modules, and the conventions the
//!    synchronizer follows (rule-file names, rule kinds, the third-party
//!    directory).
//! 2. **Directory configuration** (`.depsync.toml` in any package
//!    directory). Currently a single switch, `stop`, which excludes the
//!    directory and everything beneath it from recursive expansion.
//!
//! All configuration problems are fatal and reported before any BUILD file
//! is touched; a malformed config never produces a partially-synced
//! workspace.
//!
//! # Example
//!
//! ```toml
//! import_path = "github.com/example/project"
//! third_party_dir = "third_party/go"
//!
//! modules = [
//!     "github.com/stretchr/testify",
//!     "golang.org/x/sync",
//! ]
//!
//! ignore = ["**/testdata"]
//! ```

use crate::core::DepsyncError;
use crate::registry::ModuleRegistry;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// File name of the workspace configuration, which also marks the root.
pub const WORKSPACE_CONFIG: &str = "depsync.toml";

/// File name of the optional per-directory configuration.
pub const DIR_CONFIG: &str = ".depsync.toml";

/// Workspace-level configuration, loaded once per run.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Import path of the workspace's own Go module.
    pub import_path: String,

    /// Import paths of the known third-party modules.
    #[serde(default)]
    pub modules: Vec<String>,

    /// Directory third-party module rules live under.
    #[serde(default = "default_third_party_dir")]
    pub third_party_dir: String,

    /// Candidate rule-file names, searched in order. The first name is used
    /// when a new file has to be created.
    #[serde(default = "default_build_file_names")]
    pub build_file_names: Vec<String>,

    /// Rule kinds that can provide a directory's Go package.
    #[serde(default = "default_library_kinds")]
    pub library_kinds: Vec<String>,

    /// Kind used when creating a rule for a package that has none.
    #[serde(default = "default_rule_kind")]
    pub default_kind: String,

    /// Glob patterns for directories to skip during recursive expansion.
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_third_party_dir() -> String {
    "third_party/go".to_string()
}

fn default_build_file_names() -> Vec<String> {
    vec!["BUILD".to_string(), "BUILD.plz".to_string()]
}

fn default_library_kinds() -> Vec<String> {
    vec!["go_library".to_string(), "go_binary".to_string()]
}

fn default_rule_kind() -> String {
    "go_library".to_string()
}

impl WorkspaceConfig {
    /// Loads and validates the workspace configuration from `root`.
    ///
    /// # Errors
    ///
    /// Returns [`DepsyncError::Config`] when the file is missing, is not
    /// valid TOML, or fails validation (empty `import_path`, no rule-file
    /// names, invalid ignore globs).
    pub fn load(root: &Path) -> Result<Self, DepsyncError> {
        let path = root.join(WORKSPACE_CONFIG);
        let text = std::fs::read_to_string(&path).map_err(|err| DepsyncError::Config {
            message: format!("failed to read {}: {err}", path.display()),
        })?;
        let config: Self = toml::from_str(&text).map_err(|err| DepsyncError::Config {
            message: format!("failed to parse {}: {err}", path.display()),
        })?;
        config.validate()?;
        debug!(
            "loaded workspace config: module {}, {} third-party modules",
            config.import_path,
            config.modules.len()
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), DepsyncError> {
        let fail = |message: String| Err(DepsyncError::Config { message });
        if self.import_path.trim().is_empty() {
            return fail("import_path must not be empty".to_string());
        }
        if self.build_file_names.is_empty() {
            return fail("build_file_names must not be empty".to_string());
        }
        if self.library_kinds.is_empty() {
            return fail("library_kinds must not be empty".to_string());
        }
        if self.third_party_dir.trim_matches('/').is_empty() {
            return fail("third_party_dir must not be empty".to_string());
        }
        for pattern in &self.ignore {
            if let Err(err) = glob::Pattern::new(pattern) {
                return fail(format!("invalid ignore pattern '{pattern}': {err}"));
            }
        }
        Ok(())
    }

    /// Builds the module registry from this configuration.
    ///
    /// # Errors
    ///
    /// Propagates [`DepsyncError::InvalidModulePath`] for malformed module
    /// strings and [`DepsyncError::Config`] for duplicates.
    pub fn registry(&self) -> Result<ModuleRegistry, DepsyncError> {
        ModuleRegistry::new(self.import_path.clone(), self.modules.clone())
    }

    /// Compiled ignore patterns. Validation at load time guarantees these
    /// compile.
    #[must_use]
    pub fn ignore_patterns(&self) -> Vec<glob::Pattern> {
        self.ignore
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect()
    }
}

/// Per-directory configuration overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirConfig {
    /// When true, recursive expansion does not descend into this directory.
    #[serde(default)]
    pub stop: bool,
}

impl DirConfig {
    /// Loads the directory configuration, returning defaults when the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DepsyncError::Config`] when the file exists but is not
    /// valid TOML.
    pub fn load(dir: &Path) -> Result<Self, DepsyncError> {
        let path = dir.join(DIR_CONFIG);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(DepsyncError::Config {
                    message: format!("failed to read {}: {err}", path.display()),
                });
            }
        };
        toml::from_str(&text).map_err(|err| DepsyncError::Config {
            message: format!("failed to parse {}: {err}", path.display()),
        })
    }
}
