//! Git operation execution engine
//!
//! Every primitive follows the same template:
//! 1. repository guard (skipped only by `init` and `clone`)
//! 2. operation-specific validation, using read-only probes at most
//! 3. one mutating command through the [`CommandExecutor`]
//! 4. on failure, classification and, for merge/rebase/cherry-pick,
//!    conflict detection
//! 5. result building
//!
//! Nothing about the repository is cached between calls; other processes may
//! change it at any moment.

pub mod classify;
pub mod conflict;
pub mod guard;
pub mod ops;
pub mod result;

pub use classify::{classify, ErrorKind};
pub use conflict::{ConflictDetector, ConflictKind, ConflictReport};
pub use guard::{GitRepositoryGuard, RepositoryGuard};
pub use ops::*;
pub use result::{OperationMetadata, OperationResult, OperationStatus, Outcome, ResultBuilder};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::GitmateConfig;
use crate::external::{CommandError, CommandExecutor, CommandOutput, GitCommand, ProcessCommandExecutor};
use crate::observability::executor_metrics;
use result::output_lines;

/// Argument problems detected before touching the repository.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{operation}: missing required argument '{field}'")]
    MissingArgument { operation: String, field: String },
    #[error("{operation}: invalid argument '{field}': {reason}")]
    InvalidArgument {
        operation: String,
        field: String,
        reason: String,
    },
    #[error("working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),
}

impl EngineError {
    pub fn missing(operation: &str, field: &str) -> Self {
        EngineError::MissingArgument {
            operation: operation.to_string(),
            field: field.to_string(),
        }
    }

    pub fn invalid(operation: &str, field: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidArgument {
            operation: operation.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Reject empty values and values that git would parse as an option.
pub(crate) fn require_ref(operation: &str, field: &str, value: &str) -> Result<String, EngineError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EngineError::missing(operation, field));
    }
    check_ref(operation, field, value)?;
    Ok(value.to_string())
}

pub(crate) fn optional_ref(
    operation: &str,
    field: &str,
    value: Option<&str>,
) -> Result<Option<String>, EngineError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => {
            check_ref(operation, field, value)?;
            Ok(Some(value.to_string()))
        }
        None => Ok(None),
    }
}

fn check_ref(operation: &str, field: &str, value: &str) -> Result<(), EngineError> {
    if value.starts_with('-') {
        return Err(EngineError::invalid(operation, field, "must not start with '-'"));
    }
    if value.chars().any(char::is_control) {
        return Err(EngineError::invalid(operation, field, "must not contain control characters"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub timeout: Duration,
    pub default_remote: String,
    pub base_branch: String,
    pub protected_branches: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            default_remote: "origin".to_string(),
            base_branch: "main".to_string(),
            protected_branches: vec!["main".to_string(), "master".to_string(), "develop".to_string()],
        }
    }
}

impl From<&GitmateConfig> for EngineSettings {
    fn from(config: &GitmateConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.execution.timeout_ms),
            default_remote: config.workflows.default_remote.clone(),
            base_branch: config.workflows.base_branch.clone(),
            protected_branches: config.workflows.protected_branches.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GitEngine {
    executor: Arc<dyn CommandExecutor>,
    guard: Arc<dyn RepositoryGuard>,
    detector: ConflictDetector,
    settings: EngineSettings,
}

impl GitEngine {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        guard: Arc<dyn RepositoryGuard>,
        settings: EngineSettings,
    ) -> Self {
        let detector = ConflictDetector::new(executor.clone(), settings.timeout);
        Self {
            executor,
            guard,
            detector,
            settings,
        }
    }

    /// Engine spawning the configured program for real.
    pub fn from_config(config: &GitmateConfig) -> Self {
        let program = config.execution.program.clone();
        let guard = GitRepositoryGuard::new(Duration::from_millis(config.execution.guard_timeout_ms))
            .with_program(program.clone());
        Self::new(
            Arc::new(ProcessCommandExecutor::with_program(program)),
            Arc::new(guard),
            EngineSettings::from(config),
        )
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Same engine with a different per-command timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut settings = self.settings.clone();
        settings.timeout = timeout;
        Self::new(self.executor.clone(), self.guard.clone(), settings)
    }

    pub(crate) fn remote_or_default(&self, remote: Option<&str>) -> String {
        remote
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.settings.default_remote)
            .to_string()
    }

    /// `Some(result)` when `working_dir` is not a repository; the caller
    /// returns it without executing anything.
    pub(crate) async fn ensure_repository(&self, builder: &ResultBuilder) -> Option<OperationResult> {
        let dir = builder.working_directory();
        if self.guard.is_repository(dir).await {
            return None;
        }
        executor_metrics().record_guard_rejection();
        warn!(
            operation = builder.operation_name(),
            cwd = %dir.display(),
            "Refusing to run outside a git repository"
        );
        Some(builder.reject(
            ErrorKind::NotARepository,
            format!("{} is not inside a git repository", dir.display()),
        ))
    }

    /// Read-only query used for validation. A non-zero exit is returned as
    /// output; only executor errors become a failed result.
    pub(crate) async fn probe(
        &self,
        builder: &ResultBuilder,
        command: GitCommand,
    ) -> Result<CommandOutput, OperationResult> {
        self.executor
            .execute(&command, builder.working_directory(), self.settings.timeout)
            .await
            .map_err(|error| builder.build(failure_from_error(Some(command), &error)))
    }

    /// Whether `refname` (fully qualified) resolves.
    pub(crate) async fn ref_exists(
        &self,
        builder: &ResultBuilder,
        refname: &str,
    ) -> Result<bool, OperationResult> {
        let output = self
            .probe(
                builder,
                GitCommand::new(["rev-parse", "--verify", "--quiet", refname]),
            )
            .await?;
        Ok(output.success())
    }

    /// Current branch name, `None` when HEAD is detached.
    pub(crate) async fn current_branch(
        &self,
        builder: &ResultBuilder,
    ) -> Result<Option<String>, OperationResult> {
        let output = self
            .probe(builder, GitCommand::new(["rev-parse", "--abbrev-ref", "HEAD"]))
            .await?;
        if !output.success() {
            return Err(builder.build(failure_from_output(
                GitCommand::new(["rev-parse", "--abbrev-ref", "HEAD"]),
                &output,
            )));
        }
        let branch = output.stdout.trim();
        Ok((branch != "HEAD" && !branch.is_empty()).then(|| branch.to_string()))
    }

    /// Step 3-5 of the template.
    pub(crate) async fn run(
        &self,
        builder: &ResultBuilder,
        command: GitCommand,
        conflict_kind: Option<ConflictKind>,
    ) -> OperationResult {
        let dir = builder.working_directory();
        info!(operation = builder.operation_name(), command = %command, "Running");

        let output = match self.executor.execute(&command, dir, self.settings.timeout).await {
            Ok(output) => output,
            Err(error) => {
                warn!(operation = builder.operation_name(), error = %error, "Command did not complete");
                return builder.build(failure_from_error(Some(command), &error));
            }
        };

        if output.success() {
            let mut lines = output_lines(&output.stdout);
            if lines.is_empty() {
                lines = output_lines(&output.stderr);
            }
            return builder.build(Outcome::Success {
                command: Some(command),
                exit_code: Some(output.status_code),
                lines,
            });
        }

        if let Some(kind) = conflict_kind {
            if let Some(report) = self.detector.detect_conflicts(dir, kind).await {
                return builder.build(Outcome::Conflict {
                    command,
                    exit_code: Some(output.status_code),
                    report,
                });
            }
        }

        let outcome = failure_from_output(command, &output);
        if let Outcome::Failure { kind, .. } = &outcome {
            warn!(
                operation = builder.operation_name(),
                exit_code = output.status_code,
                kind = ?kind,
                "Command failed"
            );
        }
        builder.build(outcome)
    }
}

pub(crate) fn failure_from_output(command: GitCommand, output: &CommandOutput) -> Outcome {
    let text = output.diagnostic_text();
    Outcome::Failure {
        command: Some(command),
        exit_code: Some(output.status_code),
        kind: classify(&text),
        detail: output_lines(&text),
    }
}

pub(crate) fn failure_from_error(command: Option<GitCommand>, error: &CommandError) -> Outcome {
    let kind = match error {
        CommandError::Timeout { .. } => ErrorKind::Timeout,
        other => classify(&other.to_string()),
    };
    Outcome::Failure {
        command,
        exit_code: None,
        kind,
        detail: vec![error.to_string()],
    }
}

/// Rejects working directories that do not exist, for primitives that skip the guard.
pub(crate) fn existing_dir(dir: &Path) -> Result<(), EngineError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(EngineError::InvalidWorkingDirectory(dir.to_path_buf()))
    }
}
