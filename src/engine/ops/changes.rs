use serde::{Deserialize, Serialize};
use std::path::Path;

use super::has_unstaged_changes;
use crate::engine::{
    failure_from_output, optional_ref, EngineError, ErrorKind, GitEngine, OperationResult, ResultBuilder,
};
use crate::external::GitCommand;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct AddOptions {
    /// Paths to stage; everything when empty
    pub paths: Vec<String>,
    /// Stage removals and untracked files as well
    #[arg(short = 'A', long)]
    pub all: bool,
}

impl AddOptions {
    pub fn command(&self) -> GitCommand {
        GitCommand::new(["add"])
            .arg_if(self.all || self.paths.is_empty(), "-A")
            .pathspecs(&self.paths)
    }

    fn status_probe(&self) -> GitCommand {
        GitCommand::new(["status", "--porcelain", "--untracked-files=all"]).pathspecs(&self.paths)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct CommitOptions {
    /// Commit message
    #[arg(short, long, default_value = "")]
    pub message: String,
    /// Commit all modified tracked files
    #[arg(short, long)]
    pub all: bool,
    /// Replace the previous commit
    #[arg(long)]
    pub amend: bool,
    #[arg(long)]
    pub allow_empty: bool,
}

impl CommitOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let message = self.message.trim();
        if message.is_empty() && !self.amend {
            return Err(EngineError::missing("commit", "message"));
        }
        let command = GitCommand::new(["commit"])
            .arg_if(self.all, "-a")
            .arg_if(self.amend, "--amend")
            .arg_if(self.allow_empty, "--allow-empty");
        Ok(if message.is_empty() {
            command.arg("--no-edit")
        } else {
            command.arg("-m").arg(message)
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResetMode {
    Soft,
    #[default]
    Mixed,
    Hard,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct ResetOptions {
    #[arg(long, value_enum, default_value_t)]
    pub mode: ResetMode,
    /// Commit to reset to (HEAD when omitted)
    #[arg(long)]
    pub target: Option<String>,
    /// Unstage only these paths
    pub paths: Vec<String>,
}

impl ResetOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let target = optional_ref("reset", "target", self.target.as_deref())?;
        if !self.paths.is_empty() {
            if self.mode != ResetMode::Mixed {
                return Err(EngineError::invalid(
                    "reset",
                    "mode",
                    "only a mixed reset can be limited to paths",
                ));
            }
            return Ok(GitCommand::new(["reset"]).maybe_arg(target).pathspecs(&self.paths));
        }

        let mode = match self.mode {
            ResetMode::Soft => "--soft",
            ResetMode::Mixed => "--mixed",
            ResetMode::Hard => "--hard",
        };
        Ok(GitCommand::new(["reset", mode]).maybe_arg(target))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StashAction {
    #[default]
    Push,
    Pop,
    Apply,
    List,
    Drop,
    Clear,
    Show,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct StashOptions {
    #[arg(value_enum, default_value_t)]
    pub action: StashAction,
    #[arg(short, long)]
    pub message: Option<String>,
    #[arg(short = 'u', long)]
    pub include_untracked: bool,
    /// Stash entry for pop/apply/drop/show
    #[arg(long)]
    pub index: Option<u32>,
}

impl StashOptions {
    pub fn command(&self) -> GitCommand {
        let entry = self.index.map(|i| format!("stash@{{{i}}}"));
        match self.action {
            StashAction::Push => GitCommand::new(["stash", "push"])
                .arg_if(self.include_untracked, "--include-untracked")
                .args(
                    self.message
                        .iter()
                        .filter(|m| !m.trim().is_empty())
                        .flat_map(|m| ["-m".to_string(), m.trim().to_string()]),
                ),
            StashAction::Pop => GitCommand::new(["stash", "pop"]).maybe_arg(entry),
            StashAction::Apply => GitCommand::new(["stash", "apply"]).maybe_arg(entry),
            StashAction::Drop => GitCommand::new(["stash", "drop"]).maybe_arg(entry),
            StashAction::Show => GitCommand::new(["stash", "show", "--stat"]).maybe_arg(entry),
            StashAction::List => GitCommand::new(["stash", "list"]),
            StashAction::Clear => GitCommand::new(["stash", "clear"]),
        }
    }
}

impl GitEngine {
    /// Stage changes. Refuses with `NothingToStage` when the paths hold no
    /// unstaged change, without running `git add`.
    pub async fn add(&self, dir: &Path, options: &AddOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("add", dir);
        guarded!(self, builder);

        let status = or_return!(self.probe(&builder, options.status_probe()).await);
        if !status.success() {
            return Ok(builder.build(failure_from_output(options.status_probe(), &status)));
        }
        if !has_unstaged_changes(&status.stdout) {
            return Ok(builder.reject(ErrorKind::NothingToStage, "no unstaged changes match the given paths"));
        }

        let command = options.command();
        let mut result = self.run(&builder, command, None).await;
        if result.succeeded() {
            let staged = status.stdout.lines().filter(|l| has_unstaged_changes(l)).count();
            result.message = vec![format!("staged {staged} path(s)")];
        }
        Ok(result)
    }

    /// Record staged changes. Refuses with `NothingToCommit`, without running
    /// `git commit`, when nothing is staged; repeated calls are no-ops.
    pub async fn commit(&self, dir: &Path, options: &CommitOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("commit", dir);
        guarded!(self, builder);
        let command = options.command()?;

        if !(options.amend || options.allow_empty) {
            let has_changes = if options.all {
                let probe = GitCommand::new(["status", "--porcelain", "--untracked-files=no"]);
                let status = or_return!(self.probe(&builder, probe.clone()).await);
                if !status.success() {
                    return Ok(builder.build(failure_from_output(probe, &status)));
                }
                !status.stdout.trim().is_empty()
            } else {
                let probe = GitCommand::new(["diff", "--cached", "--quiet"]);
                let staged = or_return!(self.probe(&builder, probe.clone()).await);
                match staged.status_code {
                    0 => false,
                    1 => true,
                    _ => return Ok(builder.build(failure_from_output(probe, &staged))),
                }
            };
            if !has_changes {
                return Ok(builder.reject(ErrorKind::NothingToCommit, "no staged changes to commit"));
            }
        }

        Ok(self.run(&builder, command, None).await)
    }

    pub async fn reset(&self, dir: &Path, options: &ResetOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("reset", dir);
        guarded!(self, builder);
        let command = options.command()?;
        Ok(self.run(&builder, command, None).await)
    }

    pub async fn stash(&self, dir: &Path, options: &StashOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("stash", dir);
        guarded!(self, builder);

        if options.action == StashAction::Push {
            let untracked = if options.include_untracked {
                "--untracked-files=all"
            } else {
                "--untracked-files=no"
            };
            let probe = GitCommand::new(["status", "--porcelain", untracked]);
            let status = or_return!(self.probe(&builder, probe.clone()).await);
            if !status.success() {
                return Ok(builder.build(failure_from_output(probe, &status)));
            }
            if status.stdout.trim().is_empty() {
                return Ok(builder.reject(ErrorKind::NothingToCommit, "no local changes to stash"));
            }
        }

        Ok(self.run(&builder, options.command(), None).await)
    }
}
