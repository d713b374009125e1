//! Shared fixtures for integration tests: a throwaway Go workspace and a
//! helper for running the depsync binary against it.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary workspace with a root configuration file.
pub struct TestWorkspace {
    _tmp: TempDir,
    root: PathBuf,
}

/// Captured result of one binary invocation.
pub struct RunOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl TestWorkspace {
    /// A workspace whose module is `github.com/some/module`, with one known
    /// third-party module.
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().to_path_buf();
        fs::write(
            root.join("depsync.toml"),
            concat!(
                "import_path = \"github.com/some/module\"\n",
                "modules = [\"github.com/example/module\"]\n",
            ),
        )
        .expect("write workspace config");
        Self { _tmp: tmp, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a file, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(path, content).expect("write file");
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root.join(rel)).expect("read file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).exists()
    }

    /// Runs the depsync binary in this workspace.
    pub fn run(&self, args: &[&str]) -> RunOutput {
        let output = Command::cargo_bin("depsync")
            .expect("depsync binary")
            .args(args)
            .arg("--no-progress")
            .current_dir(&self.root)
            .output()
            .expect("run depsync");
        RunOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}
