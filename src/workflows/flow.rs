use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::Instrument;

use super::{preview, WorkflowRun};
use crate::engine::{
    AddOptions, CommitOptions, EngineError, ErrorKind, GitEngine, OperationResult, OperationStatus, PushOptions,
};
use crate::observability::create_workflow_span;

/// Stage, commit and push in one go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct FlowOptions {
    /// Commit message
    #[arg(short, long)]
    pub message: String,
    /// Paths to stage; everything when empty
    pub paths: Vec<String>,
    #[arg(long)]
    pub remote: Option<String>,
    /// Branch to push (the current branch's upstream when omitted)
    #[arg(long)]
    pub branch: Option<String>,
    #[arg(long)]
    pub dry_run: bool,
}

impl FlowOptions {
    fn add(&self) -> AddOptions {
        AddOptions {
            paths: self.paths.clone(),
            all: false,
        }
    }

    fn commit(&self) -> CommitOptions {
        CommitOptions::new(self.message.clone())
    }

    fn push(&self) -> PushOptions {
        PushOptions {
            remote: self.remote.clone(),
            branch: self.branch.clone(),
            ..PushOptions::default()
        }
    }
}

impl GitEngine {
    pub async fn flow(&self, dir: &Path, options: &FlowOptions) -> Result<WorkflowRun, EngineError> {
        let mut run = WorkflowRun::new("flow", options.dry_run);
        let span = create_workflow_span("flow", &run.correlation_id);
        self.flow_steps(dir, options, &mut run).instrument(span).await?;
        run.log_finished();
        Ok(run)
    }

    async fn flow_steps(
        &self,
        dir: &Path,
        options: &FlowOptions,
        run: &mut WorkflowRun,
    ) -> Result<(), EngineError> {
        let add = options.add();
        let commit = options.commit();
        let push = options.push();
        let commit_command = commit.command()?;
        let push_command = push.command(&self.settings().default_remote)?;

        if run.dry_run {
            step!(run, preview("add", dir, add.command()));
            step!(run, preview("commit", dir, commit_command));
            step!(run, preview("push", dir, push_command));
            return Ok(());
        }

        step!(run, already_staged_is_fine(self.add(dir, &add).await?));
        step!(run, self.commit(dir, &commit).await?);
        step!(run, self.push_with_upstream_retry(dir, &push).await?);
        Ok(())
    }
}

/// Changes staged by hand leave `add` nothing to do; commit decides whether
/// there is anything to record.
fn already_staged_is_fine(mut result: OperationResult) -> OperationResult {
    if result.error_kind == Some(ErrorKind::NothingToStage) {
        result.success = true;
        result.status = OperationStatus::Succeeded;
        result.error_kind = None;
        result.remediation = None;
        result.message = vec!["nothing new to stage, committing the index as it is".to_string()];
    }
    result
}
