//! Request model shared by the CLI and the protocol server
//!
//! An [`OperationRequest`] names one primitive or workflow, the directory it
//! runs in and a free-form argument map. [`GitEngine::dispatch`] turns the map
//! into the typed options struct of that operation and runs it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::engine::{EngineError, GitEngine, OperationResult, OperationStatus};
use crate::workflows::WorkflowRun;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Status,
    Add,
    Commit,
    Push,
    Pull,
    Fetch,
    Branch,
    Checkout,
    Log,
    Diff,
    Stash,
    Reset,
    Tag,
    Merge,
    Rebase,
    CherryPick,
    Resume,
    Blame,
    Bisect,
    Remote,
    Clone,
    Init,
    Compare,
    Flow,
    Sync,
    Release,
    Clean,
    Dev,
}

impl Operation {
    pub const ALL: [Operation; 28] = [
        Operation::Status,
        Operation::Add,
        Operation::Commit,
        Operation::Push,
        Operation::Pull,
        Operation::Fetch,
        Operation::Branch,
        Operation::Checkout,
        Operation::Log,
        Operation::Diff,
        Operation::Stash,
        Operation::Reset,
        Operation::Tag,
        Operation::Merge,
        Operation::Rebase,
        Operation::CherryPick,
        Operation::Resume,
        Operation::Blame,
        Operation::Bisect,
        Operation::Remote,
        Operation::Clone,
        Operation::Init,
        Operation::Compare,
        Operation::Flow,
        Operation::Sync,
        Operation::Release,
        Operation::Clean,
        Operation::Dev,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Status => "status",
            Operation::Add => "add",
            Operation::Commit => "commit",
            Operation::Push => "push",
            Operation::Pull => "pull",
            Operation::Fetch => "fetch",
            Operation::Branch => "branch",
            Operation::Checkout => "checkout",
            Operation::Log => "log",
            Operation::Diff => "diff",
            Operation::Stash => "stash",
            Operation::Reset => "reset",
            Operation::Tag => "tag",
            Operation::Merge => "merge",
            Operation::Rebase => "rebase",
            Operation::CherryPick => "cherry-pick",
            Operation::Resume => "resume",
            Operation::Blame => "blame",
            Operation::Bisect => "bisect",
            Operation::Remote => "remote",
            Operation::Clone => "clone",
            Operation::Init => "init",
            Operation::Compare => "compare",
            Operation::Flow => "flow",
            Operation::Sync => "sync",
            Operation::Release => "release",
            Operation::Clean => "clean",
            Operation::Dev => "dev",
        }
    }

    pub fn is_workflow(self) -> bool {
        matches!(
            self,
            Operation::Flow | Operation::Sync | Operation::Release | Operation::Clean | Operation::Dev
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            Operation::Status => "Show the working tree status",
            Operation::Add => "Stage changes; refuses when there is nothing to stage",
            Operation::Commit => "Record staged changes; refuses when nothing is staged",
            Operation::Push => "Push commits or tags to a remote",
            Operation::Pull => "Fetch and integrate upstream changes (merge or rebase)",
            Operation::Fetch => "Download objects and refs from a remote",
            Operation::Branch => "List, create, delete or rename branches",
            Operation::Checkout => "Switch branches, optionally creating the branch",
            Operation::Log => "Show commit history",
            Operation::Diff => "Show changes between commits, the index and the work tree",
            Operation::Stash => "Stash local changes or manage stash entries",
            Operation::Reset => "Reset HEAD, the index or the work tree",
            Operation::Tag => "List, create or delete tags",
            Operation::Merge => "Merge a branch; reports conflicted paths when it stops",
            Operation::Rebase => "Rebase the current branch; reports conflicted paths when it stops",
            Operation::CherryPick => "Apply commits; reports conflicted paths when it stops",
            Operation::Resume => "Continue, abort or skip a merge, rebase or cherry-pick paused on conflicts",
            Operation::Blame => "Show who last changed each line of a file",
            Operation::Bisect => "Binary-search history for the commit that introduced a bug",
            Operation::Remote => "List, add, remove or inspect remotes",
            Operation::Clone => "Clone a repository into the working directory",
            Operation::Init => "Create a repository; a no-op inside an existing one",
            Operation::Compare => "Count commits ahead of and behind the upstream",
            Operation::Flow => "Workflow: add, commit and push",
            Operation::Sync => "Workflow: fetch, compare, then pull and/or push",
            Operation::Release => "Workflow: validate a version, tag it and push the tag",
            Operation::Clean => "Workflow: prune remote refs, gc and delete merged branches",
            Operation::Dev => "Workflow: status, switch to (or create) a branch, then sync",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == wanted || (wanted == "cherrypick" && *op == Operation::CherryPick))
            .ok_or_else(|| RequestError::UnknownOperation(s.to_string()))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("{operation}: invalid arguments: {message}")]
    InvalidArguments { operation: Operation, message: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// One invocation of a primitive or workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub operation: Operation,
    pub working_directory: PathBuf,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Per-command timeout; the configured default when absent
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl OperationRequest {
    pub fn new(operation: Operation, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            operation,
            working_directory: working_directory.into(),
            arguments: Map::new(),
            timeout_ms: None,
        }
    }

    pub fn with_argument(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.to_string(), value.into());
        self
    }

    fn options<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        serde_json::from_value(Value::Object(self.arguments.clone())).map_err(|e| {
            RequestError::InvalidArguments {
                operation: self.operation,
                message: e.to_string(),
            }
        })
    }
}

/// What a dispatched request produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DispatchOutcome {
    Operation(OperationResult),
    Workflow(WorkflowRun),
}

impl DispatchOutcome {
    /// Failed results and aborted runs are errors; conflicts are reported
    /// as errors too since the caller has to act.
    pub fn is_error(&self) -> bool {
        match self {
            DispatchOutcome::Operation(result) => {
                matches!(result.status, OperationStatus::Failed | OperationStatus::Conflicted)
            }
            DispatchOutcome::Workflow(run) => run.aborted,
        }
    }

    /// Status of the result, or of the step that stopped the workflow.
    pub fn status(&self) -> OperationStatus {
        match self {
            DispatchOutcome::Operation(result) => result.status,
            DispatchOutcome::Workflow(run) => match run.failed_step() {
                Some(step) => step.status,
                None if run.dry_run => OperationStatus::Preview,
                None => OperationStatus::Succeeded,
            },
        }
    }

    pub fn render(&self) -> String {
        match self {
            DispatchOutcome::Operation(result) => result.render(),
            DispatchOutcome::Workflow(run) => run.render(),
        }
    }
}

impl GitEngine {
    /// Run the operation a request names with its typed options.
    pub async fn dispatch(&self, request: &OperationRequest) -> Result<DispatchOutcome, RequestError> {
        let engine = match request.timeout_ms {
            Some(ms) => self.with_timeout(Duration::from_millis(ms.max(1))),
            None => self.clone(),
        };
        let dir = request.working_directory.as_path();
        debug!(operation = %request.operation, cwd = %dir.display(), "Dispatching request");

        use DispatchOutcome::{Operation as Op, Workflow as Wf};
        let outcome = match request.operation {
            Operation::Status => Op(engine.status(dir, &request.options()?).await?),
            Operation::Add => Op(engine.add(dir, &request.options()?).await?),
            Operation::Commit => Op(engine.commit(dir, &request.options()?).await?),
            Operation::Push => Op(engine.push(dir, &request.options()?).await?),
            Operation::Pull => Op(engine.pull(dir, &request.options()?).await?),
            Operation::Fetch => Op(engine.fetch(dir, &request.options()?).await?),
            Operation::Branch => Op(engine.branch(dir, &request.options()?).await?),
            Operation::Checkout => Op(engine.checkout(dir, &request.options()?).await?),
            Operation::Log => Op(engine.log(dir, &request.options()?).await?),
            Operation::Diff => Op(engine.diff(dir, &request.options()?).await?),
            Operation::Stash => Op(engine.stash(dir, &request.options()?).await?),
            Operation::Reset => Op(engine.reset(dir, &request.options()?).await?),
            Operation::Tag => Op(engine.tag(dir, &request.options()?).await?),
            Operation::Merge => Op(engine.merge(dir, &request.options()?).await?),
            Operation::Rebase => Op(engine.rebase(dir, &request.options()?).await?),
            Operation::CherryPick => Op(engine.cherry_pick(dir, &request.options()?).await?),
            Operation::Resume => Op(engine.resume(dir, &request.options()?).await?),
            Operation::Blame => Op(engine.blame(dir, &request.options()?).await?),
            Operation::Bisect => Op(engine.bisect(dir, &request.options()?).await?),
            Operation::Remote => Op(engine.remote(dir, &request.options()?).await?),
            Operation::Clone => Op(engine.clone_repository(dir, &request.options()?).await?),
            Operation::Init => Op(engine.init(dir, &request.options()?).await?),
            Operation::Compare => Op(engine.compare(dir, &request.options()?).await?),
            Operation::Flow => Wf(engine.flow(dir, &request.options()?).await?),
            Operation::Sync => Wf(engine.sync(dir, &request.options()?).await?),
            Operation::Release => Wf(engine.release(dir, &request.options()?).await?),
            Operation::Clean => Wf(engine.clean(dir, &request.options()?).await?),
            Operation::Dev => Wf(engine.dev(dir, &request.options()?).await?),
        };
        Ok(outcome)
    }
}
