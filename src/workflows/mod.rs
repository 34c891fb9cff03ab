//! Composite workflows built from primitive operations
//!
//! Steps run strictly in order and the first step that does not succeed
//! stops the run. Nothing is rolled back. With `dry_run` the orchestrator
//! records one preview per step and touches neither the guard nor the
//! executor.

/// Record a step result, returning from the step function when it aborted the run.
macro_rules! step {
    ($run:expr, $result:expr) => {
        if !$run.record($result) {
            return Ok(());
        }
    };
}

mod clean;
mod dev;
mod flow;
mod release;
mod run;
mod sync;

pub use clean::CleanOptions;
pub use dev::DevOptions;
pub use flow::FlowOptions;
pub use release::{release_tag_name, ReleaseOptions};
pub use run::WorkflowRun;
pub use sync::SyncOptions;

use std::path::Path;
use tracing::info;

use crate::engine::{EngineError, ErrorKind, GitEngine, OperationResult, PushOptions, ResultBuilder};
use crate::external::GitCommand;

/// Preview entry for a step that a dry run skips.
pub(crate) fn preview(operation: &str, dir: &Path, command: GitCommand) -> OperationResult {
    ResultBuilder::start(operation, dir).preview(command)
}

impl GitEngine {
    /// Push, retrying once with `--set-upstream` when the branch has no upstream yet.
    pub(crate) async fn push_with_upstream_retry(
        &self,
        dir: &Path,
        options: &PushOptions,
    ) -> Result<OperationResult, EngineError> {
        let first = self.push(dir, options).await?;
        if first.error_kind != Some(ErrorKind::NoUpstream) || options.set_upstream {
            return Ok(first);
        }

        info!(cwd = %dir.display(), "No upstream configured, retrying push with --set-upstream");
        let retry = PushOptions {
            set_upstream: true,
            ..options.clone()
        };
        let mut result = self.push(dir, &retry).await?;
        result
            .message
            .insert(0, "no upstream was configured; pushed with --set-upstream".to_string());
        Ok(result)
    }
}
