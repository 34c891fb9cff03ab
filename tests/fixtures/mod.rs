//! Real repositories in temporary directories for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use gitmate::{GitEngine, GitmateConfig};

/// Run git in `dir`, panicking with its stderr on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("git must be installed for integration tests");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn configure(dir: &Path) {
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    git(dir, &["config", "tag.gpgsign", "false"]);
    git(dir, &["config", "core.editor", "true"]);
}

/// Engine spawning real git with default settings.
pub fn engine() -> GitEngine {
    GitEngine::from_config(&GitmateConfig::default())
}

/// A working repository on `main` with one commit, optionally backed by a
/// bare `origin` in its own temp dir.
pub struct TestRepo {
    pub temp_dir: TempDir,
    pub origin: Option<TempDir>,
}

impl TestRepo {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let dir = temp_dir.path();
        git(dir, &["init", "--quiet"]);
        git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        configure(dir);

        let repo = Self {
            temp_dir,
            origin: None,
        };
        repo.commit_file("README.md", "# Test Repo\n", "Initial commit");
        repo
    }

    /// Repository whose `main` tracks `origin/main` in a bare remote.
    pub fn with_origin() -> Self {
        let mut repo = Self::new();
        let origin = TempDir::new().expect("temp dir");
        git(origin.path(), &["init", "--bare", "--quiet"]);
        git(origin.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);

        let url = origin.path().to_string_lossy().to_string();
        git(repo.path(), &["remote", "add", "origin", &url]);
        git(repo.path(), &["push", "--quiet", "-u", "origin", "main"]);
        repo.origin = Some(origin);
        repo
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn origin_path(&self) -> Option<&Path> {
        self.origin.as_ref().map(|o| o.path())
    }

    pub fn git(&self, args: &[&str]) -> String {
        git(self.path(), args)
    }

    pub fn write(&self, file: &str, content: &str) -> PathBuf {
        let path = self.path().join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, content).expect("write file");
        path
    }

    pub fn commit_file(&self, file: &str, content: &str, message: &str) -> String {
        self.write(file, content);
        self.git(&["add", file]);
        self.git(&["commit", "--quiet", "-m", message]);
        self.head()
    }

    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn current_branch(&self) -> String {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// `feature` and `main` both change `file` differently; HEAD ends on `main`.
    pub fn diverging_branches(&self, file: &str) {
        self.commit_file(file, "base\n", "Add shared file");
        self.git(&["checkout", "--quiet", "-b", "feature"]);
        self.commit_file(file, "feature side\n", "Change on feature");
        self.git(&["checkout", "--quiet", "main"]);
        self.commit_file(file, "main side\n", "Change on main");
    }

    /// A second clone of `origin` that pushes one new commit to `main`.
    pub fn push_from_other_clone(&self, file: &str, message: &str) {
        let origin = self.origin_path().expect("repository has no origin");
        let other = TempDir::new().expect("temp dir");
        let url = origin.to_string_lossy().to_string();
        git(other.path(), &["clone", "--quiet", &url, "."]);
        configure(other.path());
        fs::write(other.path().join(file), "from the other clone\n").expect("write file");
        git(other.path(), &["add", file]);
        git(other.path(), &["commit", "--quiet", "-m", message]);
        git(other.path(), &["push", "--quiet", "origin", "HEAD:main"]);
    }

    pub fn is_clean(&self) -> bool {
        self.git(&["status", "--porcelain"]).is_empty()
    }
}
