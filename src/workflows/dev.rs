use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::Instrument;

use super::{preview, SyncOptions, WorkflowRun};
use crate::engine::{
    optional_ref, require_ref, CheckoutOptions, EngineError, GitEngine, ResultBuilder, StatusOptions,
};
use crate::observability::create_workflow_span;

/// Start or resume work on a branch and bring it level with its upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct DevOptions {
    /// Branch to work on; created from the base when missing
    pub branch: String,
    /// Start point for a new branch (configured base when omitted)
    #[arg(long)]
    pub base: Option<String>,
    #[arg(long)]
    pub remote: Option<String>,
    #[arg(long)]
    pub rebase: bool,
    #[arg(long)]
    pub dry_run: bool,
}

impl DevOptions {
    fn sync(&self) -> SyncOptions {
        SyncOptions {
            remote: self.remote.clone(),
            rebase: self.rebase,
            dry_run: self.dry_run,
        }
    }
}

impl GitEngine {
    pub async fn dev(&self, dir: &Path, options: &DevOptions) -> Result<WorkflowRun, EngineError> {
        let mut run = WorkflowRun::new("dev", options.dry_run);
        let span = create_workflow_span("dev", &run.correlation_id);
        self.dev_steps(dir, options, &mut run).instrument(span).await?;
        run.log_finished();
        Ok(run)
    }

    async fn dev_steps(&self, dir: &Path, options: &DevOptions, run: &mut WorkflowRun) -> Result<(), EngineError> {
        let branch = require_ref("dev", "branch", &options.branch)?;
        let base = optional_ref("dev", "base", options.base.as_deref())?
            .unwrap_or_else(|| self.settings().base_branch.clone());
        let status = StatusOptions { short: true };
        let switch = CheckoutOptions {
            target: branch.clone(),
            create: false,
            start_point: None,
        };

        if run.dry_run {
            step!(run, preview("status", dir, status.command()));
            let mut checkout = preview("checkout", dir, switch.command()?);
            checkout
                .message
                .push(format!("(created from {base} if '{branch}' does not exist)"));
            step!(run, checkout);
            return self.sync_steps(dir, &options.sync(), run).await;
        }

        step!(run, self.status(dir, &status).await?);

        let builder = ResultBuilder::start("checkout", dir);
        let exists = match self.ref_exists(&builder, &format!("refs/heads/{branch}")).await {
            Ok(exists) => exists,
            Err(result) => {
                step!(run, result);
                return Ok(());
            }
        };
        let checkout = if exists {
            switch
        } else {
            CheckoutOptions {
                create: true,
                start_point: Some(base),
                ..switch
            }
        };
        step!(run, self.checkout(dir, &checkout).await?);

        self.sync_steps(dir, &options.sync(), run).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::*;
    use crate::engine::{EngineSettings, OperationStatus};
    use crate::external::{MockCommandExecutor, ScriptedExecutor};
    use std::sync::Arc;

    fn options(branch: &str) -> DevOptions {
        DevOptions {
            branch: branch.to_string(),
            ..DevOptions::default()
        }
    }

    #[tokio::test]
    async fn test_dry_run_executes_nothing() {
        let mut executor = MockCommandExecutor::new();
        executor.expect_execute().times(0);
        let engine = GitEngine::new(Arc::new(executor), repo_guard(true), EngineSettings::default());
        let run = engine
            .dev(dir(), &DevOptions { dry_run: true, ..options("feature") })
            .await
            .unwrap();

        assert_eq!(run.steps.len(), 6);
        assert!(run.steps.iter().all(|s| s.status == OperationStatus::Preview));
    }

    #[tokio::test]
    async fn test_missing_branch_is_created_from_base_and_published() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .ok("git status --short --branch", "## main\n")
                .fail("git rev-parse --verify --quiet refs/heads/feature", 1, "")
                .ok("git checkout -b feature main", "")
                .ok("git fetch --prune", "")
                .fail(
                    "git rev-list --left-right --count 'HEAD...@{u}'",
                    128,
                    "fatal: no upstream configured for branch 'feature'",
                )
                .ok("git rev-parse --abbrev-ref HEAD", "feature\n")
                .ok("git push --set-upstream origin feature", ""),
        );
        let engine = engine_with(executor.clone());
        let run = engine.dev(dir(), &options("feature")).await.unwrap();

        assert!(run.succeeded(), "{}", run.render());
        assert!(executor.was_called("git checkout -b feature main"));
        assert_eq!(run.steps.len(), 4);
    }

    #[tokio::test]
    async fn test_empty_branch_is_an_argument_error() {
        let engine = engine_with(Arc::new(ScriptedExecutor::new()));
        assert!(matches!(
            engine.dev(dir(), &options(" ")).await,
            Err(EngineError::MissingArgument { .. })
        ));
    }
}
