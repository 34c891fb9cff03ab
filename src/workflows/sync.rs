use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, Instrument};

use super::{preview, WorkflowRun};
use crate::engine::{
    CompareOptions, EngineError, ErrorKind, FetchOptions, GitEngine, PullOptions, PushOptions,
};
use crate::observability::create_workflow_span;

/// Bring the current branch level with its upstream in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct SyncOptions {
    /// Remote to fetch from and to publish a branch without upstream to.
    /// Comparing, pulling and pushing always follow the branch's upstream.
    #[arg(long)]
    pub remote: Option<String>,
    /// Rebase local commits onto the upstream instead of merging
    #[arg(long)]
    pub rebase: bool,
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncOptions {
    fn fetch(&self) -> FetchOptions {
        FetchOptions {
            remote: self.remote.clone(),
            prune: true,
            ..FetchOptions::default()
        }
    }

    fn pull(&self) -> PullOptions {
        PullOptions {
            rebase: self.rebase,
            ..PullOptions::default()
        }
    }

    fn push(&self) -> PushOptions {
        PushOptions::default()
    }

    fn publish(&self) -> PushOptions {
        PushOptions {
            remote: self.remote.clone(),
            set_upstream: true,
            ..PushOptions::default()
        }
    }
}

impl GitEngine {
    pub async fn sync(&self, dir: &Path, options: &SyncOptions) -> Result<WorkflowRun, EngineError> {
        let mut run = WorkflowRun::new("sync", options.dry_run);
        let span = create_workflow_span("sync", &run.correlation_id);
        self.sync_steps(dir, options, &mut run).instrument(span).await?;
        run.log_finished();
        Ok(run)
    }

    /// Fetch, compare, then pull when behind and push when ahead. A branch
    /// without upstream is published with `--set-upstream` instead.
    pub(crate) async fn sync_steps(
        &self,
        dir: &Path,
        options: &SyncOptions,
        run: &mut WorkflowRun,
    ) -> Result<(), EngineError> {
        let default_remote = self.settings().default_remote.clone();
        let fetch = options.fetch();
        let compare = CompareOptions::default();
        let pull = options.pull();
        let push = options.push();

        if run.dry_run {
            step!(run, preview("fetch", dir, fetch.command()?));
            step!(run, preview("compare", dir, compare.command()?));
            step!(run, preview("pull", dir, pull.command(&default_remote)?));
            step!(run, preview("push", dir, push.command(&default_remote)?));
            return Ok(());
        }

        step!(run, self.fetch(dir, &fetch).await?);

        let (compared, divergence) = self.compare_upstream(dir, &compare).await?;
        if compared.error_kind == Some(ErrorKind::NoUpstream) {
            info!(cwd = %dir.display(), "Branch has no upstream, publishing it");
            let mut published = self.push(dir, &options.publish()).await?;
            published
                .message
                .insert(0, "no upstream was configured; published the branch".to_string());
            step!(run, published);
            return Ok(());
        }
        step!(run, compared);

        let Some(divergence) = divergence else {
            return Ok(());
        };
        if divergence.behind > 0 {
            step!(run, self.pull(dir, &pull).await?);
        }
        if divergence.ahead > 0 {
            step!(run, self.push_with_upstream_retry(dir, &push).await?);
        }
        Ok(())
    }
}
