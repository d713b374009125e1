//! Per-run cache of parsed rule files.
//!
//! Resolution constantly asks "which rule provides the package in directory
//! D?", and many packages depend on the same few directories, so parsed files
//! are cached for the duration of a run. The cache is keyed by
//! workspace-relative directory and holds one lock per entry: that lock is
//! also what serializes writers, since the synchronizer performs its
//! load-edit-write cycle for a directory while holding the entry.
//!
//! Entries are dropped when the synchronizer rewrites a directory's file, so
//! later lookups re-read the updated content instead of a stale copy.

use super::RuleFile;
use crate::resolve::ProviderLookup;
use anyhow::{Context, Result};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

type Entry = Arc<Mutex<Option<RuleFile>>>;

/// Shared, lazily-populated view of a workspace's rule files.
pub struct RuleFileSet {
    root: PathBuf,
    /// Candidate file names, searched in order; the first name is used when
    /// creating a file in a directory that has none.
    candidates: Vec<String>,
    /// Rule kinds that can provide a directory's Go package.
    library_kinds: Vec<String>,
    files: DashMap<String, Entry>,
}

impl RuleFileSet {
    /// Creates a file set rooted at the workspace root.
    pub fn new(
        root: impl Into<PathBuf>,
        candidates: Vec<String>,
        library_kinds: Vec<String>,
    ) -> Self {
        Self {
            root: root.into(),
            candidates,
            library_kinds,
            files: DashMap::new(),
        }
    }

    fn dir_path(&self, dir: &str) -> PathBuf {
        if dir == "." { self.root.clone() } else { self.root.join(dir) }
    }

    /// The existing rule file in `dir`, if any candidate name is present.
    #[must_use]
    pub fn existing_path(&self, dir: &str) -> Option<PathBuf> {
        let base = self.dir_path(dir);
        self.candidates
            .iter()
            .map(|name| base.join(name))
            .find(|path| path.is_file())
    }

    /// The path a newly created rule file would get in `dir`.
    #[must_use]
    pub fn default_path(&self, dir: &str) -> PathBuf {
        self.dir_path(dir).join(&self.candidates[0])
    }

    fn entry(&self, dir: &str) -> Result<Entry> {
        if let Some(entry) = self.files.get(dir) {
            return Ok(entry.clone());
        }
        let loaded = match self.existing_path(dir) {
            Some(path) => {
                let src = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Some(RuleFile::parse(path, src)?)
            }
            None => None,
        };
        let entry: Entry = Arc::new(Mutex::new(loaded));
        // On a race the first inserted entry wins; reparsing was harmless.
        Ok(self.files.entry(dir.to_string()).or_insert(entry).value().clone())
    }

    fn lock(entry: &Entry) -> MutexGuard<'_, Option<RuleFile>> {
        entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Name of the rule providing the Go package in `dir`, or `None` when the
    /// directory has no rule file or no rule of a library kind.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, or when several rules
    /// could provide the package.
    pub fn providing_rule_name(&self, dir: &str) -> Result<Option<String>> {
        let entry = self.entry(dir)?;
        let guard = Self::lock(&entry);
        match guard.as_ref() {
            None => Ok(None),
            Some(file) => {
                let found = file.find_providing_rule(&self.library_kinds)?;
                Ok(found.and_then(|rule| file.rule_name(rule)).map(ToString::to_string))
            }
        }
    }

    /// Runs `f` with exclusive access to `dir`'s rule file, materializing an
    /// empty in-memory file (at [`Self::default_path`]) when none exists on
    /// disk. The entry lock is held for the duration of `f`, which is what
    /// keeps concurrent writers to one file serialized.
    pub fn with_file<R>(&self, dir: &str, f: impl FnOnce(&mut RuleFile) -> Result<R>) -> Result<R> {
        let entry = self.entry(dir)?;
        let mut guard = Self::lock(&entry);
        let file = guard.get_or_insert_with(|| RuleFile::empty(self.default_path(dir)));
        f(file)
    }

    /// Drops the cached entry for `dir`, forcing a re-read on next access.
    /// Called after the synchronizer rewrites that directory's file.
    pub fn invalidate(&self, dir: &str) {
        self.files.remove(dir);
    }
}

impl ProviderLookup for RuleFileSet {
    fn providing_rule(&self, dir: &str) -> Result<Option<String>> {
        self.providing_rule_name(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fileset(root: &Path) -> RuleFileSet {
        RuleFileSet::new(
            root,
            vec!["BUILD".to_string(), "BUILD.plz".to_string()],
            vec!["go_library".to_string(), "go_binary".to_string()],
        )
    }

    #[test]
    fn test_providing_rule_name() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("pkg/util");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("BUILD"),
            "go_library(\n    name = \"helpers\",\n    srcs = [\"util.go\"],\n)\n",
        )
        .unwrap();

        let files = fileset(tmp.path());
        assert_eq!(
            files.providing_rule_name("pkg/util").unwrap(),
            Some("helpers".to_string())
        );
        // No rule file at all.
        fs::create_dir_all(tmp.path().join("pkg/empty")).unwrap();
        assert_eq!(files.providing_rule_name("pkg/empty").unwrap(), None);
    }

    #[test]
    fn test_candidate_name_order() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("pkg");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("BUILD.plz"), "go_library(name = \"pkg\")\n").unwrap();

        let files = fileset(tmp.path());
        assert_eq!(
            files.existing_path("pkg").unwrap().file_name().unwrap(),
            "BUILD.plz"
        );
        assert_eq!(files.providing_rule_name("pkg").unwrap(), Some("pkg".to_string()));
        assert_eq!(files.default_path("pkg").file_name().unwrap(), "BUILD");
    }

    #[test]
    fn test_with_file_materializes_missing_file() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("newpkg")).unwrap();
        let files = fileset(tmp.path());
        let path = files
            .with_file("newpkg", |file| {
                assert!(!file.is_modified());
                file.create_rule("go_library", "newpkg");
                Ok(file.path().to_path_buf())
            })
            .unwrap();
        assert_eq!(path, tmp.path().join("newpkg/BUILD"));
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("pkg");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("BUILD"), "go_library(name = \"old\")\n").unwrap();

        let files = fileset(tmp.path());
        assert_eq!(files.providing_rule_name("pkg").unwrap(), Some("old".to_string()));

        fs::write(dir.join("BUILD"), "go_library(name = \"new\")\n").unwrap();
        // Still cached.
        assert_eq!(files.providing_rule_name("pkg").unwrap(), Some("old".to_string()));
        files.invalidate("pkg");
        assert_eq!(files.providing_rule_name("pkg").unwrap(), Some("new".to_string()));
    }
}
