//! Conflict detection after merge, rebase and cherry-pick
//!
//! A conflict is only reported when the index actually holds unmerged
//! entries. If the tool claimed a conflict but the index is clean (already
//! resolved, or a concurrent process finished the job) the detector returns
//! `None`, never an empty report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::classify::ErrorKind;
use crate::external::{CommandExecutor, GitCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    Merge,
    Rebase,
    CherryPick,
}

impl ConflictKind {
    /// The git subcommand owning the in-progress state.
    pub fn subcommand(self) -> &'static str {
        match self {
            ConflictKind::Merge => "merge",
            ConflictKind::Rebase => "rebase",
            ConflictKind::CherryPick => "cherry-pick",
        }
    }

    pub fn continue_command(self) -> String {
        format!("{} --continue", self.subcommand())
    }

    pub fn abort_command(self) -> String {
        format!("{} --abort", self.subcommand())
    }

    pub fn error_kind(self) -> ErrorKind {
        match self {
            ConflictKind::Merge => ErrorKind::MergeConflict,
            ConflictKind::Rebase => ErrorKind::RebaseConflict,
            ConflictKind::CherryPick => ErrorKind::CherryPickConflict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub kind: ConflictKind,
    pub conflicted_paths: BTreeSet<String>,
    pub continue_command: String,
    pub abort_command: String,
}

impl ConflictReport {
    /// `None` when `paths` is empty.
    pub fn new<I, S>(kind: ConflictKind, paths: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let conflicted_paths: BTreeSet<String> = paths.into_iter().map(Into::into).collect();
        if conflicted_paths.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            conflicted_paths,
            continue_command: kind.continue_command(),
            abort_command: kind.abort_command(),
        })
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} stopped with {} conflicted path(s):",
            self.kind.subcommand(),
            self.conflicted_paths.len()
        )];
        lines.extend(self.conflicted_paths.iter().map(|p| format!("  {p}")));
        lines.push(format!(
            "resolve and stage the files, then run `git {}` (or `git {}` to give up)",
            self.continue_command, self.abort_command
        ));
        lines
    }
}

/// Query that lists paths with unmerged index entries.
pub fn unmerged_paths_command() -> GitCommand {
    GitCommand::new(["diff", "--name-only", "--diff-filter=U"])
}

pub fn parse_unmerged_paths(stdout: &str) -> BTreeSet<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone)]
pub struct ConflictDetector {
    executor: Arc<dyn CommandExecutor>,
    timeout: Duration,
}

impl ConflictDetector {
    pub fn new(executor: Arc<dyn CommandExecutor>, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    pub async fn detect_conflicts(&self, working_dir: &Path, kind: ConflictKind) -> Option<ConflictReport> {
        let output = match self
            .executor
            .execute(&unmerged_paths_command(), working_dir, self.timeout)
            .await
        {
            Ok(output) if output.success() => output,
            Ok(output) => {
                warn!(exit_code = output.status_code, "Unmerged path query failed");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Unmerged path query could not run");
                return None;
            }
        };

        let report = ConflictReport::new(kind, parse_unmerged_paths(&output.stdout));
        match &report {
            Some(report) => info!(
                kind = kind.subcommand(),
                paths = report.conflicted_paths.len(),
                "Conflict detected"
            ),
            None => info!(kind = kind.subcommand(), "No unmerged paths found"),
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::ScriptedExecutor;

    fn detector(executor: ScriptedExecutor) -> ConflictDetector {
        ConflictDetector::new(Arc::new(executor), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_reports_unmerged_paths() {
        let executor = ScriptedExecutor::new().ok(
            "git diff --name-only --diff-filter=U",
            "src/lib.rs\nREADME.md\n",
        );
        let report = detector(executor)
            .detect_conflicts(Path::new("/repo"), ConflictKind::Rebase)
            .await
            .unwrap();

        assert_eq!(report.kind, ConflictKind::Rebase);
        assert_eq!(
            report.conflicted_paths.iter().cloned().collect::<Vec<_>>(),
            vec!["README.md".to_string(), "src/lib.rs".to_string()]
        );
        assert_eq!(report.continue_command, "rebase --continue");
        assert_eq!(report.abort_command, "rebase --abort");
    }

    #[tokio::test]
    async fn test_clean_index_yields_none() {
        let executor = ScriptedExecutor::new().ok("git diff --name-only --diff-filter=U", "\n");
        let report = detector(executor)
            .detect_conflicts(Path::new("/repo"), ConflictKind::Merge)
            .await;
        assert!(report.is_none());
    }

    #[tokio::test]
    async fn test_query_failure_yields_none() {
        let executor = ScriptedExecutor::new().fail(
            "git diff --name-only --diff-filter=U",
            128,
            "fatal: not a git repository",
        );
        let report = detector(executor)
            .detect_conflicts(Path::new("/repo"), ConflictKind::CherryPick)
            .await;
        assert!(report.is_none());
    }

    #[test]
    fn test_commands_follow_kind() {
        assert_eq!(ConflictKind::CherryPick.continue_command(), "cherry-pick --continue");
        assert_eq!(ConflictKind::Merge.abort_command(), "merge --abort");
        assert_eq!(ConflictKind::Rebase.error_kind(), ErrorKind::RebaseConflict);
        assert!(ConflictReport::new(ConflictKind::Merge, Vec::<String>::new()).is_none());
    }
}
