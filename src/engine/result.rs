//! Uniform result envelope for every primitive and workflow step
//!
//! All metadata is filled in by [`build`] so step timings are comparable
//! across operations. Building never fails, error outcomes included.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::classify::ErrorKind;
use super::conflict::ConflictReport;
use crate::external::GitCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Succeeded,
    /// Paused on unmerged paths; resolution is up to the caller.
    Conflicted,
    Failed,
    /// Dry-run entry, nothing was executed.
    Preview,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    pub operation_name: String,
    pub duration_ms: u64,
    pub command_issued: Option<String>,
    pub exit_code: Option<i32>,
    pub timestamp: DateTime<Utc>,
    pub working_directory: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,
    pub status: OperationStatus,
    pub message: Vec<String>,
    pub error_kind: Option<ErrorKind>,
    pub remediation: Option<String>,
    pub conflict: Option<ConflictReport>,
    pub metadata: OperationMetadata,
}

impl OperationResult {
    pub fn succeeded(&self) -> bool {
        self.status == OperationStatus::Succeeded
    }

    pub fn is_conflicted(&self) -> bool {
        self.status == OperationStatus::Conflicted
    }

    pub fn is_preview(&self) -> bool {
        self.status == OperationStatus::Preview
    }

    /// Human-readable rendering used by the CLI.
    pub fn render(&self) -> String {
        let mut lines = self.message.clone();
        if let Some(hint) = &self.remediation {
            lines.push(format!("hint: {hint}"));
        }
        lines.join("\n")
    }
}

/// What a primitive produced, before metadata is attached.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success {
        command: Option<GitCommand>,
        exit_code: Option<i32>,
        lines: Vec<String>,
    },
    Failure {
        command: Option<GitCommand>,
        exit_code: Option<i32>,
        kind: ErrorKind,
        detail: Vec<String>,
    },
    Conflict {
        command: GitCommand,
        exit_code: Option<i32>,
        report: ConflictReport,
    },
    Preview {
        command: GitCommand,
    },
}

/// Wrap `outcome` in an [`OperationResult`], timing from `start_time` to now.
pub fn build(
    operation_name: &str,
    working_directory: &Path,
    start_time: Instant,
    outcome: Outcome,
) -> OperationResult {
    let duration_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
    let metadata = |command: Option<&GitCommand>, exit_code: Option<i32>| OperationMetadata {
        operation_name: operation_name.to_string(),
        duration_ms,
        command_issued: command.map(GitCommand::render),
        exit_code,
        timestamp: Utc::now(),
        working_directory: working_directory.to_path_buf(),
    };

    match outcome {
        Outcome::Success {
            command,
            exit_code,
            lines,
        } => {
            let message = if lines.is_empty() {
                vec![format!("{operation_name} completed")]
            } else {
                lines
            };
            OperationResult {
                success: true,
                status: OperationStatus::Succeeded,
                message,
                error_kind: None,
                remediation: None,
                conflict: None,
                metadata: metadata(command.as_ref(), exit_code),
            }
        }
        Outcome::Failure {
            command,
            exit_code,
            kind,
            detail,
        } => {
            let mut message = vec![format!("{operation_name} failed: {kind}")];
            message.extend(detail);
            OperationResult {
                success: false,
                status: OperationStatus::Failed,
                message,
                error_kind: Some(kind),
                remediation: Some(kind.remediation().to_string()),
                conflict: None,
                metadata: metadata(command.as_ref(), exit_code),
            }
        }
        Outcome::Conflict {
            command,
            exit_code,
            report,
        } => {
            let kind = report.kind.error_kind();
            OperationResult {
                success: true,
                status: OperationStatus::Conflicted,
                message: report.summary_lines(),
                error_kind: Some(kind),
                remediation: Some(kind.remediation().to_string()),
                conflict: Some(report),
                metadata: metadata(Some(&command), exit_code),
            }
        }
        Outcome::Preview { command } => OperationResult {
            success: true,
            status: OperationStatus::Preview,
            message: vec![format!("[dry-run] would run: {}", command.render())],
            error_kind: None,
            remediation: None,
            conflict: None,
            metadata: metadata(None, None),
        },
    }
}

/// Captures operation identity and start time once, then builds results.
#[derive(Debug, Clone)]
pub struct ResultBuilder {
    operation_name: String,
    working_directory: PathBuf,
    started: Instant,
}

impl ResultBuilder {
    pub fn start(operation_name: impl Into<String>, working_directory: &Path) -> Self {
        Self {
            operation_name: operation_name.into(),
            working_directory: working_directory.to_path_buf(),
            started: Instant::now(),
        }
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn build(&self, outcome: Outcome) -> OperationResult {
        build(
            &self.operation_name,
            &self.working_directory,
            self.started,
            outcome,
        )
    }

    /// Failure decided before anything was executed.
    pub fn reject(&self, kind: ErrorKind, reason: impl Into<String>) -> OperationResult {
        self.build(Outcome::Failure {
            command: None,
            exit_code: None,
            kind,
            detail: vec![reason.into()],
        })
    }

    pub fn success_message(&self, lines: Vec<String>) -> OperationResult {
        self.build(Outcome::Success {
            command: None,
            exit_code: None,
            lines,
        })
    }

    pub fn preview(&self, command: GitCommand) -> OperationResult {
        self.build(Outcome::Preview { command })
    }
}

/// Non-empty, right-trimmed lines of `text`.
pub fn output_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::conflict::ConflictKind;

    #[test]
    fn test_failure_carries_kind_and_hint() {
        let builder = ResultBuilder::start("push", Path::new("/repo"));
        let result = builder.build(Outcome::Failure {
            command: Some(GitCommand::new(["push"])),
            exit_code: Some(128),
            kind: ErrorKind::NoUpstream,
            detail: vec!["fatal: no upstream branch".to_string()],
        });

        assert!(!result.success);
        assert_eq!(result.status, OperationStatus::Failed);
        assert_eq!(result.error_kind, Some(ErrorKind::NoUpstream));
        assert_eq!(result.message[0], "push failed: no upstream branch");
        assert_eq!(result.remediation.as_deref(), Some(ErrorKind::NoUpstream.remediation()));
        assert_eq!(result.metadata.command_issued.as_deref(), Some("git push"));
        assert_eq!(result.metadata.exit_code, Some(128));
        assert_eq!(result.metadata.operation_name, "push");
        assert_eq!(result.metadata.working_directory, PathBuf::from("/repo"));
    }

    #[test]
    fn test_success_without_output_gets_default_line() {
        let result = ResultBuilder::start("fetch", Path::new("/repo")).success_message(Vec::new());
        assert!(result.succeeded());
        assert_eq!(result.message, vec!["fetch completed".to_string()]);
        assert!(result.remediation.is_none());
    }

    #[test]
    fn test_conflict_is_success_with_caveat() {
        let report = ConflictReport::new(ConflictKind::Merge, ["a.txt"]).unwrap();
        let result = ResultBuilder::start("merge", Path::new("/repo")).build(Outcome::Conflict {
            command: GitCommand::new(["merge", "feature"]),
            exit_code: Some(1),
            report,
        });

        assert!(result.success);
        assert!(result.is_conflicted());
        assert!(!result.succeeded());
        assert_eq!(result.error_kind, Some(ErrorKind::MergeConflict));
        assert!(result.conflict.is_some());
    }

    #[test]
    fn test_preview_issues_no_command() {
        let result =
            ResultBuilder::start("add", Path::new("/repo")).preview(GitCommand::new(["add", "-A"]));
        assert!(result.is_preview());
        assert_eq!(result.message, vec!["[dry-run] would run: git add -A".to_string()]);
        assert!(result.metadata.command_issued.is_none());
    }

    #[test]
    fn test_serializes_camel_case_envelope() {
        let result = ResultBuilder::start("status", Path::new("/repo"))
            .reject(ErrorKind::NotARepository, "not a repo");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["errorKind"], "NotARepository");
        assert_eq!(json["metadata"]["operationName"], "status");
        assert_eq!(json["status"], "failed");
    }

    #[test]
    fn test_output_lines_drops_blank_lines() {
        assert_eq!(
            output_lines("a  \n\n  \nb\n"),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
