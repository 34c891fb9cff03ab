//! Repository guard
//!
//! Pre-flight check run before every guarded primitive. The probe spawns its
//! own short-lived process instead of going through the [`CommandExecutor`]
//! so a rejected call issues no executor traffic at all.
//!
//! [`CommandExecutor`]: crate::external::CommandExecutor

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

use crate::external::DEFAULT_PROGRAM;

/// Default upper bound for the guard probe, kept well below operation timeouts.
pub const DEFAULT_GUARD_TIMEOUT: Duration = Duration::from_secs(3);

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RepositoryGuard: Send + Sync {
    /// Whether `working_dir` is inside a git repository (bare or not).
    async fn is_repository(&self, working_dir: &Path) -> bool;
}

/// Guard backed by `git rev-parse --git-dir`.
#[derive(Debug, Clone)]
pub struct GitRepositoryGuard {
    program: String,
    timeout: Duration,
}

impl GitRepositoryGuard {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            timeout,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for GitRepositoryGuard {
    fn default() -> Self {
        Self::new(DEFAULT_GUARD_TIMEOUT)
    }
}

#[async_trait]
impl RepositoryGuard for GitRepositoryGuard {
    async fn is_repository(&self, working_dir: &Path) -> bool {
        if !working_dir.is_dir() {
            debug!(cwd = %working_dir.display(), "Guard: directory does not exist");
            return false;
        }

        let probe = tokio::process::Command::new(&self.program)
            .args(["rev-parse", "--git-dir"])
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .env("LC_ALL", "C")
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(self.timeout, probe).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                warn!(cwd = %working_dir.display(), error = %e, "Guard probe could not be spawned");
                false
            }
            Err(_) => {
                warn!(
                    cwd = %working_dir.display(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Guard probe timed out"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_directory_is_not_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let guard = GitRepositoryGuard::default();
        assert!(!guard.is_repository(dir.path()).await);
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let guard = GitRepositoryGuard::default();
        assert!(!guard.is_repository(&dir.path().join("missing")).await);
    }

    #[tokio::test]
    async fn test_initialised_directory_is_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let status = std::process::Command::new("git")
            .args(["init", "--quiet"])
            .current_dir(dir.path())
            .status()
            .unwrap();
        assert!(status.success());

        let guard = GitRepositoryGuard::new(Duration::from_secs(5));
        assert!(guard.is_repository(dir.path()).await);
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        assert!(guard.is_repository(&dir.path().join("nested")).await);
    }
}
