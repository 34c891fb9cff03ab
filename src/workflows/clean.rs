use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, Instrument};

use super::{preview, WorkflowRun};
use crate::engine::{
    failure_from_output, optional_ref, BranchOptions, EngineError, GitEngine, OperationResult, ResultBuilder,
};
use crate::external::GitCommand;
use crate::observability::create_workflow_span;

/// Prune stale remote-tracking refs, garbage-collect and delete merged branches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct CleanOptions {
    #[arg(long)]
    pub remote: Option<String>,
    /// Branch that merged branches are measured against (configured base when omitted)
    #[arg(long)]
    pub base: Option<String>,
    #[arg(long)]
    pub dry_run: bool,
}

fn prune_command(remote: &str) -> GitCommand {
    GitCommand::new(["remote", "prune"]).arg(remote)
}

fn gc_command() -> GitCommand {
    GitCommand::new(["gc", "--quiet"])
}

fn merged_branches_command(base: &str) -> GitCommand {
    GitCommand::new(["branch", "--merged"])
        .arg(base)
        .arg("--format=%(refname:short)")
}

impl GitEngine {
    pub async fn clean(&self, dir: &Path, options: &CleanOptions) -> Result<WorkflowRun, EngineError> {
        let mut run = WorkflowRun::new("clean", options.dry_run);
        let span = create_workflow_span("clean", &run.correlation_id);
        self.clean_steps(dir, options, &mut run).instrument(span).await?;
        run.log_finished();
        Ok(run)
    }

    async fn clean_steps(
        &self,
        dir: &Path,
        options: &CleanOptions,
        run: &mut WorkflowRun,
    ) -> Result<(), EngineError> {
        let remote = optional_ref("clean", "remote", options.remote.as_deref())?
            .unwrap_or_else(|| self.settings().default_remote.clone());
        let base = optional_ref("clean", "base", options.base.as_deref())?
            .unwrap_or_else(|| self.settings().base_branch.clone());

        if run.dry_run {
            step!(run, preview("prune", dir, prune_command(&remote)));
            step!(run, preview("gc", dir, gc_command()));
            step!(run, preview("branch-cleanup", dir, merged_branches_command(&base)));
            return Ok(());
        }

        step!(run, self.prune_remote(dir, &remote).await);
        step!(run, self.gc(dir).await);

        let (listing, candidates) = self.merged_branches(dir, &base).await;
        step!(run, listing);
        for branch in candidates {
            step!(run, self.branch(dir, &BranchOptions::delete(branch, false)).await?);
        }
        Ok(())
    }

    /// `remote prune`, skipped with a note when the remote is not configured.
    async fn prune_remote(&self, dir: &Path, remote: &str) -> OperationResult {
        let builder = ResultBuilder::start("prune", dir);
        if let Some(rejected) = self.ensure_repository(&builder).await {
            return rejected;
        }
        match self.remote_exists(&builder, remote).await {
            Ok(true) => self.run(&builder, prune_command(remote), None).await,
            Ok(false) => builder.success_message(vec![format!(
                "remote '{remote}' is not configured; nothing to prune"
            )]),
            Err(result) => result,
        }
    }

    async fn gc(&self, dir: &Path) -> OperationResult {
        let builder = ResultBuilder::start("gc", dir);
        if let Some(rejected) = self.ensure_repository(&builder).await {
            return rejected;
        }
        self.run(&builder, gc_command(), None).await
    }

    /// Local branches merged into `base`, minus `base`, the current branch
    /// and protected branches.
    async fn merged_branches(&self, dir: &Path, base: &str) -> (OperationResult, Vec<String>) {
        let builder = ResultBuilder::start("branch-cleanup", dir);
        if let Some(rejected) = self.ensure_repository(&builder).await {
            return (rejected, Vec::new());
        }
        let current = match self.current_branch(&builder).await {
            Ok(current) => current,
            Err(result) => return (result, Vec::new()),
        };

        let command = merged_branches_command(base);
        let output = match self.probe(&builder, command.clone()).await {
            Ok(output) if output.success() => output,
            Ok(output) => return (builder.build(failure_from_output(command, &output)), Vec::new()),
            Err(result) => return (result, Vec::new()),
        };

        let protected = &self.settings().protected_branches;
        let candidates: Vec<String> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|b| !b.is_empty() && *b != base)
            .filter(|b| current.as_deref() != Some(*b))
            .filter(|b| !protected.iter().any(|p| p == b))
            .map(str::to_string)
            .collect();
        debug!(base, count = candidates.len(), "Merged branches selected for deletion");

        let message = if candidates.is_empty() {
            vec![format!("no branches merged into {base} to delete")]
        } else {
            let mut lines = vec![format!("{} branch(es) merged into {base}:", candidates.len())];
            lines.extend(candidates.iter().map(|b| format!("  {b}")));
            lines
        };
        (builder.success_message(message), candidates)
    }
}
