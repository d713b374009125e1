//! File system helpers.
//!
//! All writes go through [`atomic_write`]: content lands in a temporary file
//! that is synced and then renamed over the target, so a rule file is never
//! observable in a half-written state. That guarantee is what makes an
//! interrupted run safe; every file is either its old or its new content.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Ensures a directory exists, creating it and any missing parents.
///
/// # Errors
///
/// Fails when the path exists but is not a directory, or creation fails.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory {}", path.display()))?;
    } else if !path.is_dir() {
        anyhow::bail!("path exists but is not a directory: {}", path.display());
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// 1. Content is written to a sibling `.tmp` file.
/// 2. The temporary file is synced to disk.
/// 3. The temporary file is renamed over the target path.
///
/// Readers never observe a partial write. Parent directories are created as
/// needed.
///
/// # Errors
///
/// Fails when any of the three steps fails; the target file is left
/// untouched in that case.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("failed to create temp file {}", temp_path.display()))?;
        file.write_all(content)
            .with_context(|| format!("failed to write to temp file {}", temp_path.display()))?;
        file.sync_all().context("failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("failed to rename temp file to {}", path.display()))?;
    Ok(())
}

/// Atomically writes a string to a file.
///
/// # Errors
///
/// See [`atomic_write`].
pub fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("a/b/BUILD");
        safe_write(&target, "go_library(name = \"b\")\n").unwrap();
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "go_library(name = \"b\")\n"
        );
        // No stray temp file left behind.
        assert!(!target.with_extension("tmp").exists());
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("BUILD");
        safe_write(&target, "old\n").unwrap();
        safe_write(&target, "new\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new\n");
    }

    #[test]
    fn test_ensure_dir_rejects_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("f");
        fs::write(&file, "x").unwrap();
        assert!(ensure_dir(&file).is_err());
    }
}
