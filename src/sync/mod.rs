//! The rule-graph synchronizer.
//!
//! For each package directory the engine runs one unit of work:
//!
//! 1. **Scan** the directory's Go sources and imports.
//! 2. **Locate** the rule providing the package in its BUILD file, or decide
//!    to create one.
//! 3. **Resolve** every import to a build label (or record it as
//!    unresolved).
//! 4. **Diff** the rule's declared `srcs`/`deps` against the computed sets.
//! 5. **Apply** the minimal edit and write the file atomically, or just
//!    report the drift in dry-run mode.
//!
//! Directories are independent: each unit reads its own sources and, at
//! most, other directories' rule files (read-only, through the shared
//! cache). Units therefore run in parallel on a bounded worker pool, and the
//! per-entry lock inside [`RuleFileSet`] serializes the only shared mutable
//! resource, the rule file itself. There is no cross-directory transaction:
//! a unit that fails leaves previously processed directories committed, and
//! each file is either fully old or fully new.
//!
//! Running the engine twice over unchanged sources is a no-op the second
//! time; the first run's output parses back to exactly the computed state.

pub mod diff;

use crate::buildfile::{Attr, RuleFileSet};
use crate::config::WorkspaceConfig;
use crate::core::DepsyncError;
use crate::imports::scan_package;
use crate::label::BuildLabel;
use crate::registry::ModuleRegistry;
use crate::resolve::{Resolution, UnresolvedImport, resolve};
use crate::utils::fs::safe_write;
use crate::utils::progress::ProgressReporter;
use anyhow::{Context, Result, anyhow};
use diff::{Entry, diff_entries};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Attribute holding dependencies the synchronizer must never remove.
const KEEP_DEPS_ATTR: &str = "keep_deps";

/// Options for one engine run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Compute and report edits without writing any file.
    pub dry_run: bool,
    /// Maximum number of directories processed concurrently.
    pub jobs: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
        }
    }
}

/// A package that was skipped rather than guessed at.
#[derive(Debug, Clone, Serialize)]
pub struct Skipped {
    /// Workspace-relative package directory.
    pub dir: String,
    /// Why the package was skipped.
    pub reason: String,
}

/// Unresolved imports of one package.
#[derive(Debug, Clone, Serialize)]
pub struct PackageUnresolved {
    /// Workspace-relative package directory.
    pub dir: String,
    /// The imports that could not be mapped to a target.
    pub imports: Vec<UnresolvedImport>,
}

/// A directory whose unit of work failed.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    /// Workspace-relative package directory.
    pub dir: String,
    /// Rendered error chain.
    pub error: String,
}

/// Aggregated outcome of one engine run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Rule files rewritten.
    pub updated: Vec<String>,
    /// Rule files whose providing rule was newly created.
    pub created: Vec<String>,
    /// Rule files that would change (dry-run only).
    pub out_of_sync: Vec<String>,
    /// Packages skipped instead of guessed at.
    pub skipped: Vec<Skipped>,
    /// Per-package imports that could not be resolved.
    pub unresolved: Vec<PackageUnresolved>,
    /// Directories whose processing failed.
    pub failures: Vec<Failure>,
}

impl SyncReport {
    /// Whether any file was (or would be) modified.
    #[must_use]
    pub fn has_drift(&self) -> bool {
        !self.updated.is_empty() || !self.created.is_empty() || !self.out_of_sync.is_empty()
    }

    /// Whether any directory failed outright.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Outcome of one directory's unit of work.
#[derive(Debug)]
enum DirStatus {
    /// Already in sync.
    Clean,
    /// No Go sources here; nothing to do.
    NoPackage,
    /// File rewritten.
    Updated { path: String },
    /// Providing rule created (possibly in a new file).
    Created { path: String },
    /// Dry run: file differs from the computed state.
    OutOfSync { path: String },
    /// Skipped; see reason.
    Skipped { reason: String },
}

#[derive(Debug)]
struct DirOutcome {
    status: DirStatus,
    unresolved: Vec<UnresolvedImport>,
}

/// The synchronizer. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct SyncEngine {
    root: PathBuf,
    config: Arc<WorkspaceConfig>,
    registry: Arc<ModuleRegistry>,
    files: Arc<RuleFileSet>,
}

impl SyncEngine {
    /// Builds an engine for one workspace.
    ///
    /// # Errors
    ///
    /// Fails on configuration problems (malformed or duplicate module
    /// paths).
    pub fn new(root: impl Into<PathBuf>, config: WorkspaceConfig) -> Result<Self, DepsyncError> {
        let root = root.into();
        let registry = config.registry()?;
        let files = RuleFileSet::new(
            root.clone(),
            config.build_file_names.clone(),
            config.library_kinds.clone(),
        );
        Ok(Self {
            root,
            config: Arc::new(config),
            registry: Arc::new(registry),
            files: Arc::new(files),
        })
    }

    /// Processes the given package directories on a bounded worker pool and
    /// aggregates the results.
    ///
    /// Individual directory failures are collected into the report, never
    /// propagated; callers decide what a non-empty failure list means for
    /// the exit status.
    pub async fn run(
        &self,
        dirs: Vec<String>,
        options: &SyncOptions,
        progress: &ProgressReporter,
    ) -> SyncReport {
        let jobs = options.jobs.max(1);
        let dry_run = options.dry_run;
        let mut results: Vec<(String, Result<DirOutcome>)> = stream::iter(dirs)
            .map(|dir| {
                let engine = self.clone();
                let progress = progress.clone();
                async move {
                    let task_dir = dir.clone();
                    let joined =
                        tokio::task::spawn_blocking(move || engine.sync_dir(&task_dir, dry_run))
                            .await;
                    let result = match joined {
                        Ok(result) => result,
                        Err(err) => Err(anyhow!("worker panicked: {err}")),
                    };
                    progress.inc(dir.clone());
                    (dir, result)
                }
            })
            .buffer_unordered(jobs)
            .collect()
            .await;
        progress.finish_and_clear();

        results.sort_by(|a, b| a.0.cmp(&b.0));
        let mut report = SyncReport::default();
        for (dir, result) in results {
            match result {
                Ok(outcome) => {
                    if !outcome.unresolved.is_empty() {
                        report.unresolved.push(PackageUnresolved {
                            dir: dir.clone(),
                            imports: outcome.unresolved,
                        });
                    }
                    match outcome.status {
                        DirStatus::Clean | DirStatus::NoPackage => {}
                        DirStatus::Updated { path } => report.updated.push(path),
                        DirStatus::Created { path } => report.created.push(path),
                        DirStatus::OutOfSync { path } => report.out_of_sync.push(path),
                        DirStatus::Skipped { reason } => {
                            report.skipped.push(Skipped { dir, reason });
                        }
                    }
                }
                Err(err) => {
                    warn!("{dir}: {err:#}");
                    report.failures.push(Failure {
                        dir,
                        error: format!("{err:#}"),
                    });
                }
            }
        }
        report
    }

    /// Runs the full unit of work for one package directory.
    fn sync_dir(&self, dir: &str, dry_run: bool) -> Result<DirOutcome> {
        let Some(pkg) = scan_package(&self.root, dir)? else {
            return Ok(DirOutcome {
                status: DirStatus::NoPackage,
                unresolved: Vec::new(),
            });
        };
        debug!("{dir}: {} sources, {} imports", pkg.files.len(), pkg.imports.len());

        // Which rule owns this package, if any.
        let provider = match self.files.providing_rule_name(dir) {
            Ok(provider) => provider,
            Err(err) => {
                if let Some(ambiguous @ DepsyncError::AmbiguousProvider { .. }) =
                    err.downcast_ref::<DepsyncError>()
                {
                    return Ok(DirOutcome {
                        status: DirStatus::Skipped {
                            reason: ambiguous.to_string(),
                        },
                        unresolved: Vec::new(),
                    });
                }
                return Err(err);
            }
        };
        let creating = provider.is_none();
        let rule_name = provider.unwrap_or_else(|| self.default_rule_name(dir));
        let own_label = BuildLabel::new(dir, rule_name.clone());

        // Resolve every import; unresolved ones are reported, not fatal.
        let mut required_deps: Vec<Entry> = Vec::new();
        let mut unresolved = Vec::new();
        for import in &pkg.imports {
            match resolve(
                import,
                &self.registry,
                self.files.as_ref(),
                &self.config.third_party_dir,
            )
            .with_context(|| format!("resolving import '{import}'"))?
            {
                Resolution::Stdlib => {}
                Resolution::Target(label) if label == own_label => {}
                Resolution::Target(label) => {
                    required_deps.push(Entry::verbatim(label.to_string()));
                }
                Resolution::Unresolved(entry) => unresolved.push(entry),
            }
        }

        let required_srcs: Vec<Entry> =
            pkg.files.iter().map(|f| Entry::verbatim(f.clone())).collect();

        let applied = self.files.with_file(dir, |file| {
            let rule = match file.find_rule(&rule_name) {
                Some(rule) => rule,
                None => file.create_rule(&self.config.default_kind, &rule_name),
            };

            // Sources: managed only while they are a plain string list.
            match file.attr(rule, "srcs") {
                Attr::Other => {}
                Attr::Absent => {
                    let values: Vec<String> =
                        required_srcs.iter().map(|e| e.text.clone()).collect();
                    if !values.is_empty() {
                        file.set_attr_strings(rule, "srcs", values);
                    }
                }
                Attr::Strings(existing) => {
                    let existing: Vec<Entry> =
                        existing.into_iter().map(Entry::verbatim).collect();
                    let diff = diff_entries(&existing, &required_srcs, &[]);
                    if diff.is_changed() {
                        file.set_attr_strings(rule, "srcs", diff.result.clone());
                    }
                }
            }

            // Dependencies, compared shorthand-insensitively.
            match file.attr(rule, "deps") {
                Attr::Other => {}
                existing_attr => {
                    let raw = match existing_attr {
                        Attr::Strings(v) => v,
                        _ => Vec::new(),
                    };
                    let mut pinned = pinned_keys(file.attr(rule, KEEP_DEPS_ATTR), dir);
                    let existing = canonical_entries(&raw, dir, &mut pinned);
                    let diff = diff_entries(&existing, &required_deps, &pinned);
                    if diff.is_changed() {
                        file.set_attr_strings(rule, "deps", diff.result.clone());
                    }
                }
            }

            if !file.is_modified() {
                return Ok((DirStatus::Clean, false));
            }
            let path = file.path().to_path_buf();
            let rel = path
                .strip_prefix(&self.root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            if dry_run {
                return Ok((DirStatus::OutOfSync { path: rel }, false));
            }
            safe_write(&path, &file.render())
                .with_context(|| format!("writing {}", path.display()))?;
            debug!("{dir}: wrote {rel}");
            let status = if creating {
                DirStatus::Created { path: rel }
            } else {
                DirStatus::Updated { path: rel }
            };
            Ok((status, true))
        });

        let (status, wrote) = applied?;
        if wrote {
            self.files.invalidate(dir);
        }
        Ok(DirOutcome { status, unresolved })
    }

    /// Name for a rule created in a directory that has none: the last path
    /// segment, or the workspace directory's own name at the root.
    fn default_rule_name(&self, dir: &str) -> String {
        if dir == "." {
            return self
                .root
                .file_name()
                .map_or_else(|| "root".to_string(), |n| n.to_string_lossy().into_owned());
        }
        dir.rsplit('/').next().unwrap_or(dir).to_string()
    }
}

/// Canonical keys of the `keep_deps` attribute, which pin dependencies
/// against removal. The attribute itself is never written by depsync.
fn pinned_keys(attr: Attr, dir: &str) -> Vec<String> {
    match attr {
        Attr::Strings(values) => values.iter().map(|raw| canonical_key(raw, dir)).collect(),
        Attr::Absent | Attr::Other => Vec::new(),
    }
}

/// Canonical comparison key for a declared dependency string: parsed and
/// made absolute against the declaring package. Unparseable strings key as
/// themselves.
fn canonical_key(raw: &str, dir: &str) -> String {
    BuildLabel::parse(raw)
        .map(|label| label.resolve_relative(dir).to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Existing dependency entries with canonical keys. Entries that do not
/// parse as labels are foreign to depsync and are implicitly pinned so they
/// are never removed.
fn canonical_entries(raw: &[String], dir: &str, pinned: &mut Vec<String>) -> Vec<Entry> {
    raw.iter()
        .map(|text| match BuildLabel::parse(text) {
            Ok(label) => Entry::new(text.clone(), label.resolve_relative(dir).to_string()),
            Err(_) => {
                pinned.push(text.clone());
                Entry::verbatim(text.clone())
            }
        })
        .collect()
}
