use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::engine::{
    existing_dir, failure_from_output, optional_ref, require_ref, ConflictKind, EngineError, ErrorKind,
    GitEngine, OperationResult, Outcome, ResultBuilder,
};
use crate::external::GitCommand;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct PushOptions {
    /// Remote to push to (configured default when omitted)
    #[arg(long)]
    pub remote: Option<String>,
    /// Branch or refspec to push
    pub branch: Option<String>,
    /// Record the pushed branch as upstream
    #[arg(short = 'u', long)]
    pub set_upstream: bool,
    #[arg(long)]
    pub force_with_lease: bool,
    /// Push tags as well
    #[arg(long)]
    pub tags: bool,
}

impl PushOptions {
    pub fn command(&self, default_remote: &str) -> Result<GitCommand, EngineError> {
        let branch = optional_ref("push", "branch", self.branch.as_deref())?;
        self.command_for(default_remote, branch)
    }

    fn command_for(&self, default_remote: &str, branch: Option<String>) -> Result<GitCommand, EngineError> {
        let remote = optional_ref("push", "remote", self.remote.as_deref())?;
        let remote = if remote.is_some() || branch.is_some() || self.set_upstream {
            Some(remote.unwrap_or_else(|| default_remote.to_string()))
        } else {
            None
        };

        Ok(GitCommand::new(["push"])
            .arg_if(self.set_upstream, "--set-upstream")
            .arg_if(self.force_with_lease, "--force-with-lease")
            .arg_if(self.tags, "--tags")
            .maybe_arg(remote)
            .maybe_arg(branch))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct PullOptions {
    #[arg(long)]
    pub remote: Option<String>,
    /// Remote branch to pull; requires a remote
    pub branch: Option<String>,
    /// Rebase local commits instead of merging
    #[arg(long)]
    pub rebase: bool,
    #[arg(long)]
    pub ff_only: bool,
}

impl PullOptions {
    pub fn command(&self, default_remote: &str) -> Result<GitCommand, EngineError> {
        let branch = optional_ref("pull", "branch", self.branch.as_deref())?;
        let remote = optional_ref("pull", "remote", self.remote.as_deref())?;
        let remote = match (&remote, &branch) {
            (None, Some(_)) => Some(default_remote.to_string()),
            _ => remote,
        };

        let command = if self.rebase {
            GitCommand::new(["pull", "--rebase"])
        } else {
            GitCommand::new(["pull", "--no-rebase", "--no-edit"])
        };
        Ok(command
            .arg_if(self.ff_only, "--ff-only")
            .maybe_arg(remote)
            .maybe_arg(branch))
    }

    fn conflict_kind(&self) -> ConflictKind {
        if self.rebase {
            ConflictKind::Rebase
        } else {
            ConflictKind::Merge
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct FetchOptions {
    #[arg(long)]
    pub remote: Option<String>,
    /// Fetch every configured remote
    #[arg(long, conflicts_with = "remote")]
    pub all: bool,
    /// Drop remote-tracking refs that no longer exist upstream
    #[arg(long)]
    pub prune: bool,
    #[arg(long)]
    pub tags: bool,
}

impl FetchOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let remote = optional_ref("fetch", "remote", self.remote.as_deref())?;
        if self.all && remote.is_some() {
            return Err(EngineError::invalid("fetch", "all", "cannot be combined with remote"));
        }
        Ok(GitCommand::new(["fetch"])
            .arg_if(self.all, "--all")
            .arg_if(self.prune, "--prune")
            .arg_if(self.tags, "--tags")
            .maybe_arg(remote))
    }
}

/// Commits ahead of and behind an upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divergence {
    pub ahead: u64,
    pub behind: u64,
}

impl Divergence {
    /// Parse `rev-list --left-right --count` output (`<ahead>\t<behind>`).
    pub fn parse(stdout: &str) -> Option<Self> {
        let mut counts = stdout.split_whitespace().map(str::parse::<u64>);
        match (counts.next(), counts.next(), counts.next()) {
            (Some(Ok(ahead)), Some(Ok(behind)), None) => Some(Self { ahead, behind }),
            _ => None,
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.ahead == 0 && self.behind == 0
    }

    pub fn describe(&self, upstream: &str) -> String {
        match (self.ahead, self.behind) {
            (0, 0) => format!("up to date with {upstream}"),
            (a, 0) => format!("ahead of {upstream} by {a} commit(s)"),
            (0, b) => format!("behind {upstream} by {b} commit(s)"),
            (a, b) => format!("diverged from {upstream}: {a} ahead, {b} behind"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct CompareOptions {
    /// Upstream to compare HEAD against
    #[arg(long, default_value = "@{u}")]
    pub upstream: String,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            upstream: "@{u}".to_string(),
        }
    }
}

impl CompareOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let upstream = require_ref("compare", "upstream", &self.upstream)?;
        Ok(GitCommand::new(["rev-list", "--left-right", "--count"]).arg(format!("HEAD...{upstream}")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteAction {
    #[default]
    List,
    Add,
    Remove,
    SetUrl,
    Show,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct RemoteOptions {
    #[arg(value_enum, default_value_t)]
    pub action: RemoteAction,
    pub name: Option<String>,
    pub url: Option<String>,
}

impl RemoteOptions {
    fn name(&self) -> Result<String, EngineError> {
        require_ref("remote", "name", self.name.as_deref().unwrap_or_default())
    }

    fn url(&self) -> Result<String, EngineError> {
        require_ref("remote", "url", self.url.as_deref().unwrap_or_default())
    }

    pub fn command(&self) -> Result<GitCommand, EngineError> {
        Ok(match self.action {
            RemoteAction::List => GitCommand::new(["remote", "-v"]),
            RemoteAction::Add => GitCommand::new(["remote", "add"]).arg(self.name()?).arg(self.url()?),
            RemoteAction::Remove => GitCommand::new(["remote", "remove"]).arg(self.name()?),
            RemoteAction::SetUrl => GitCommand::new(["remote", "set-url"]).arg(self.name()?).arg(self.url()?),
            RemoteAction::Show => GitCommand::new(["remote", "show", "-n"]).arg(self.name()?),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct CloneOptions {
    /// Repository URL or path
    pub url: String,
    /// Target directory, relative to the working directory
    pub directory: Option<String>,
    #[arg(short, long)]
    pub branch: Option<String>,
    /// Shallow clone with this many commits
    #[arg(long)]
    pub depth: Option<u32>,
    #[arg(long)]
    pub bare: bool,
}

impl CloneOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let url = require_ref("clone", "url", &self.url)?;
        let branch = optional_ref("clone", "branch", self.branch.as_deref())?;
        let directory = optional_ref("clone", "directory", self.directory.as_deref())?;
        if self.depth == Some(0) {
            return Err(EngineError::invalid("clone", "depth", "must be at least 1"));
        }

        let mut command = GitCommand::new(["clone"]);
        if let Some(depth) = self.depth {
            command = command.arg("--depth").arg(depth.to_string());
        }
        if let Some(branch) = branch {
            command = command.arg("--branch").arg(branch);
        }
        Ok(command.arg_if(self.bare, "--bare").arg("--").arg(url).maybe_arg(directory))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct InitOptions {
    #[arg(long)]
    pub bare: bool,
    /// Name of the first branch
    #[arg(long)]
    pub initial_branch: Option<String>,
}

impl InitOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let initial_branch = optional_ref("init", "initial_branch", self.initial_branch.as_deref())?;
        Ok(GitCommand::new(["init"])
            .arg_if(self.bare, "--bare")
            .maybe_arg(initial_branch.map(|b| format!("--initial-branch={b}"))))
    }
}

impl GitEngine {
    /// Push. With `set_upstream` and no branch, the current branch is pushed.
    pub async fn push(&self, dir: &Path, options: &PushOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("push", dir);
        guarded!(self, builder);
        let default_remote = self.settings().default_remote.clone();
        let mut command = options.command(&default_remote)?;

        if options.set_upstream && options.branch.as_deref().map_or(true, |b| b.trim().is_empty()) {
            match or_return!(self.current_branch(&builder).await) {
                Some(branch) => command = options.command_for(&default_remote, Some(branch))?,
                None => {
                    return Ok(builder.reject(
                        ErrorKind::InvalidReference,
                        "HEAD is detached; name the branch to push",
                    ))
                }
            }
        }

        Ok(self.run(&builder, command, None).await)
    }

    pub async fn pull(&self, dir: &Path, options: &PullOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("pull", dir);
        guarded!(self, builder);
        let command = options.command(&self.settings().default_remote)?;
        Ok(self.run(&builder, command, Some(options.conflict_kind())).await)
    }

    pub async fn fetch(&self, dir: &Path, options: &FetchOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("fetch", dir);
        guarded!(self, builder);
        let command = options.command()?;
        Ok(self.run(&builder, command, None).await)
    }

    /// Count commits ahead of and behind an upstream.
    pub async fn compare(&self, dir: &Path, options: &CompareOptions) -> Result<OperationResult, EngineError> {
        self.compare_upstream(dir, options).await.map(|(result, _)| result)
    }

    /// [`compare`](Self::compare), also returning the parsed counts on success.
    pub(crate) async fn compare_upstream(
        &self,
        dir: &Path,
        options: &CompareOptions,
    ) -> Result<(OperationResult, Option<Divergence>), EngineError> {
        let builder = ResultBuilder::start("compare", dir);
        if let Some(rejected) = self.ensure_repository(&builder).await {
            return Ok((rejected, None));
        }
        let command = options.command()?;
        let result = self.run(&builder, command.clone(), None).await;
        if !result.succeeded() {
            return Ok((result, None));
        }

        let raw = result.message.join("\n");
        let Some(divergence) = Divergence::parse(&raw) else {
            let unparsable = builder.build(Outcome::Failure {
                command: Some(command),
                exit_code: Some(0),
                kind: ErrorKind::Unknown,
                detail: vec![format!("unexpected rev-list output: {raw}")],
            });
            return Ok((unparsable, None));
        };
        let mut result = result;
        result.message = vec![divergence.describe(options.upstream.trim())];
        Ok((result, Some(divergence)))
    }

    pub async fn remote(&self, dir: &Path, options: &RemoteOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("remote", dir);
        guarded!(self, builder);
        let command = options.command()?;

        if options.action != RemoteAction::List {
            let name = options.name()?;
            let exists = or_return!(self.remote_exists(&builder, &name).await);
            match (options.action, exists) {
                (RemoteAction::Add, true) => {
                    return Ok(builder.reject(
                        ErrorKind::InvalidReference,
                        format!("remote '{name}' already exists"),
                    ))
                }
                (RemoteAction::Remove | RemoteAction::SetUrl | RemoteAction::Show, false) => {
                    return Ok(builder.reject(
                        ErrorKind::InvalidReference,
                        format!("no such remote '{name}'"),
                    ))
                }
                _ => {}
            }
        }

        Ok(self.run(&builder, command, None).await)
    }

    pub(crate) async fn remote_exists(
        &self,
        builder: &ResultBuilder,
        name: &str,
    ) -> Result<bool, OperationResult> {
        let command = GitCommand::new(["remote"]);
        let output = self.probe(builder, command.clone()).await?;
        if !output.success() {
            return Err(builder.build(failure_from_output(command, &output)));
        }
        Ok(output.stdout.lines().any(|line| line.trim() == name))
    }

    /// Clone into `dir`, which must exist but need not be a repository.
    pub async fn clone_repository(
        &self,
        dir: &Path,
        options: &CloneOptions,
    ) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("clone", dir);
        existing_dir(dir)?;
        let command = options.command()?;
        Ok(self.run(&builder, command, None).await)
    }

    /// Initialise a repository. Re-initialising an existing one is a no-op;
    /// a fresh directory nested inside another repository gets its own.
    pub async fn init(&self, dir: &Path, options: &InitOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("init", dir);
        existing_dir(dir)?;
        let command = options.command()?;
        if self.is_repository_root(&builder, dir).await {
            return Ok(builder.success_message(vec![format!(
                "{} is already a git repository",
                dir.display()
            )]));
        }
        Ok(self.run(&builder, command, None).await)
    }

    /// Whether `dir` is the top of a repository rather than somewhere below one.
    async fn is_repository_root(&self, builder: &ResultBuilder, dir: &Path) -> bool {
        if dir.join(".git").exists() {
            return true;
        }
        if !self.guard.is_repository(dir).await {
            return false;
        }
        // a bare repository is its own git dir
        match self.probe(builder, GitCommand::new(["rev-parse", "--git-dir"])).await {
            Ok(output) => output.success() && output.stdout.trim() == ".",
            Err(_) => false,
        }
    }
}
