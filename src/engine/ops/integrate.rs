use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::engine::{
    optional_ref, require_ref, ConflictKind, EngineError, GitEngine, OperationResult, ResultBuilder,
};
use crate::external::GitCommand;

/// Strategies accepted by `merge --strategy`.
pub const MERGE_STRATEGIES: &[&str] = &["ort", "recursive", "resolve", "octopus", "ours", "subtree"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct MergeOptions {
    /// Branch or commit to merge into the current branch
    pub branch: String,
    /// Merge strategy (ort, recursive, resolve, octopus, ours, subtree)
    #[arg(short, long)]
    pub strategy: Option<String>,
    /// Always create a merge commit
    #[arg(long, conflicts_with = "ff_only")]
    pub no_ff: bool,
    /// Refuse anything but a fast-forward
    #[arg(long)]
    pub ff_only: bool,
    #[arg(long)]
    pub squash: bool,
    /// Merge commit message
    #[arg(short, long)]
    pub message: Option<String>,
}

impl MergeOptions {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            ..Self::default()
        }
    }

    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let branch = require_ref("merge", "branch", &self.branch)?;
        if self.no_ff && self.ff_only {
            return Err(EngineError::invalid(
                "merge",
                "ff_only",
                "cannot be combined with no_ff",
            ));
        }
        let strategy = match self.strategy.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) if MERGE_STRATEGIES.contains(&s) => Some(format!("--strategy={s}")),
            Some(s) => {
                return Err(EngineError::invalid(
                    "merge",
                    "strategy",
                    format!("unknown strategy '{s}', expected one of {}", MERGE_STRATEGIES.join(", ")),
                ))
            }
            None => None,
        };

        let command = GitCommand::new(["merge"])
            .arg_if(self.no_ff, "--no-ff")
            .arg_if(self.ff_only, "--ff-only")
            .arg_if(self.squash, "--squash")
            .maybe_arg(strategy);
        let command = match self.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            Some(message) => command.arg("-m").arg(message),
            None => command.arg("--no-edit"),
        };
        Ok(command.arg(branch))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct RebaseOptions {
    /// Upstream to replay the current branch onto
    pub upstream: String,
    /// Transplant onto this base instead of `upstream`
    #[arg(long)]
    pub onto: Option<String>,
    /// Stash local changes around the rebase
    #[arg(long)]
    pub autostash: bool,
}

impl RebaseOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let upstream = require_ref("rebase", "upstream", &self.upstream)?;
        let onto = optional_ref("rebase", "onto", self.onto.as_deref())?;
        let mut command = GitCommand::new(["rebase"]).arg_if(self.autostash, "--autostash");
        if let Some(onto) = onto {
            command = command.arg("--onto").arg(onto);
        }
        Ok(command.arg(upstream))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct CherryPickOptions {
    /// Commits to apply, in order
    #[arg(required = true)]
    pub commits: Vec<String>,
    /// Apply to the work tree and index without committing
    #[arg(short = 'n', long)]
    pub no_commit: bool,
    /// Parent number to diff against when picking a merge commit
    #[arg(short, long)]
    pub mainline: Option<u32>,
}

impl CherryPickOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        if self.commits.iter().all(|c| c.trim().is_empty()) {
            return Err(EngineError::missing("cherry-pick", "commits"));
        }
        let commits = self
            .commits
            .iter()
            .filter(|c| !c.trim().is_empty())
            .map(|c| require_ref("cherry-pick", "commits", c))
            .collect::<Result<Vec<_>, _>>()?;
        if self.mainline == Some(0) {
            return Err(EngineError::invalid("cherry-pick", "mainline", "parent numbers start at 1"));
        }

        Ok(GitCommand::new(["cherry-pick"])
            .arg_if(self.no_commit, "--no-commit")
            .maybe_arg(self.mainline.map(|m| format!("--mainline={m}")))
            .args(commits))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResumeAction {
    #[default]
    Continue,
    Abort,
    Skip,
}

impl ResumeAction {
    fn flag(self) -> &'static str {
        match self {
            ResumeAction::Continue => "--continue",
            ResumeAction::Abort => "--abort",
            ResumeAction::Skip => "--skip",
        }
    }
}

/// Continue, abort or skip an operation paused on conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
pub struct ResumeOptions {
    /// Which paused operation to resume
    #[arg(value_enum)]
    pub kind: ConflictKind,
    #[arg(value_enum, default_value_t)]
    #[serde(default)]
    pub action: ResumeAction,
}

impl ResumeOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        if self.kind == ConflictKind::Merge && self.action == ResumeAction::Skip {
            return Err(EngineError::invalid("resume", "action", "merge cannot be skipped"));
        }
        Ok(GitCommand::new([self.kind.subcommand(), self.action.flag()]))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BisectAction {
    Start,
    Good,
    Bad,
    Skip,
    Reset,
    #[default]
    Log,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct BisectOptions {
    #[arg(value_enum, default_value_t)]
    pub action: BisectAction,
    /// Known bad revision for `start`
    #[arg(long)]
    pub bad: Option<String>,
    /// Known good revisions for `start`
    #[arg(long)]
    pub good: Vec<String>,
    /// Revision to mark for good/bad/skip (current commit when omitted)
    #[arg(long)]
    pub revision: Option<String>,
}

impl BisectOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let command = GitCommand::new(["bisect"]);
        Ok(match self.action {
            BisectAction::Start => {
                let bad = optional_ref("bisect", "bad", self.bad.as_deref())?;
                if bad.is_none() && !self.good.is_empty() {
                    return Err(EngineError::missing("bisect", "bad"));
                }
                let good = self
                    .good
                    .iter()
                    .map(|g| require_ref("bisect", "good", g))
                    .collect::<Result<Vec<_>, _>>()?;
                command.arg("start").maybe_arg(bad).args(good)
            }
            BisectAction::Good | BisectAction::Bad | BisectAction::Skip => {
                let term = match self.action {
                    BisectAction::Good => "good",
                    BisectAction::Bad => "bad",
                    _ => "skip",
                };
                command
                    .arg(term)
                    .maybe_arg(optional_ref("bisect", "revision", self.revision.as_deref())?)
            }
            BisectAction::Reset => command.arg("reset"),
            BisectAction::Log => command.arg("log"),
        })
    }
}

impl GitEngine {
    pub async fn merge(&self, dir: &Path, options: &MergeOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("merge", dir);
        guarded!(self, builder);
        let command = options.command()?;
        Ok(self.run(&builder, command, Some(ConflictKind::Merge)).await)
    }

    pub async fn rebase(&self, dir: &Path, options: &RebaseOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("rebase", dir);
        guarded!(self, builder);
        let command = options.command()?;
        Ok(self.run(&builder, command, Some(ConflictKind::Rebase)).await)
    }

    pub async fn cherry_pick(
        &self,
        dir: &Path,
        options: &CherryPickOptions,
    ) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("cherry-pick", dir);
        guarded!(self, builder);
        let command = options.command()?;
        Ok(self.run(&builder, command, Some(ConflictKind::CherryPick)).await)
    }

    /// Run the continue/abort/skip command of a paused operation. Continuing
    /// can stop on the next conflicting commit, so it is conflict-checked too.
    pub async fn resume(&self, dir: &Path, options: &ResumeOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("resume", dir);
        guarded!(self, builder);
        let command = options.command()?;
        let conflict_kind = (options.action != ResumeAction::Abort).then_some(options.kind);
        Ok(self.run(&builder, command, conflict_kind).await)
    }

    pub async fn bisect(&self, dir: &Path, options: &BisectOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("bisect", dir);
        guarded!(self, builder);
        let command = options.command()?;
        Ok(self.run(&builder, command, None).await)
    }
}
