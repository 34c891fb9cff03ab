use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::engine::{
    AddOptions, BisectOptions, BlameOptions, BranchOptions, CheckoutOptions, CherryPickOptions, CloneOptions,
    CommitOptions, CompareOptions, DiffOptions, FetchOptions, InitOptions, LogOptions, MergeOptions,
    PullOptions, PushOptions, RebaseOptions, RemoteOptions, ResetOptions, ResumeOptions, StashOptions,
    StatusOptions, TagOptions,
};
use crate::identity::{aliases::normalize, IdentityResolver, InvocationContext};
use crate::request::Operation;
use crate::workflows::{CleanOptions, DevOptions, FlowOptions, ReleaseOptions, SyncOptions};

pub mod commands;

pub const PROGRAM_NAME: &str = "gitmate";

#[derive(Parser)]
#[command(name = "gitmate")]
#[command(version)]
#[command(about = "Guarded git primitives and workflows for people and AI assistants")]
#[command(long_about = "gitmate runs git operations behind a repository guard, classifies failures into a \
                       stable taxonomy and reports merge, rebase and cherry-pick conflicts with the commands \
                       that resume or abort them. Invoked as an alias such as 'gcommit' it runs that operation.")]
pub struct Cli {
    /// Repository directory (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
    /// Per-command timeout in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub timeout_ms: Option<u64>,
    /// Print the structured result as JSON
    #[arg(long, global = true)]
    pub json: bool,
    /// Log level written to stderr (RUST_LOG takes precedence)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the working tree status
    Status(StatusOptions),
    /// Stage changes
    Add(AddOptions),
    /// Record staged changes
    Commit(CommitOptions),
    /// Push commits or tags
    Push(PushOptions),
    /// Fetch and integrate upstream changes
    Pull(PullOptions),
    /// Download objects and refs
    Fetch(FetchOptions),
    /// List, create, delete or rename branches
    Branch(BranchOptions),
    /// Switch branches
    Checkout(CheckoutOptions),
    /// Show commit history
    Log(LogOptions),
    /// Show changes
    Diff(DiffOptions),
    /// Stash changes or manage stash entries
    Stash(StashOptions),
    /// Reset HEAD, the index or the work tree
    Reset(ResetOptions),
    /// List, create or delete tags
    Tag(TagOptions),
    /// Merge a branch into the current one
    Merge(MergeOptions),
    /// Rebase the current branch
    Rebase(RebaseOptions),
    /// Apply existing commits
    CherryPick(CherryPickOptions),
    /// Continue, abort or skip a paused merge, rebase or cherry-pick
    Resume(ResumeOptions),
    /// Show who last changed each line
    Blame(BlameOptions),
    /// Binary-search history for a bad commit
    Bisect(BisectOptions),
    /// Manage remotes
    Remote(RemoteOptions),
    /// Clone a repository
    Clone(CloneOptions),
    /// Create a repository
    Init(InitOptions),
    /// Count commits ahead of and behind the upstream
    Compare(CompareOptions),
    /// Workflow: add, commit and push
    Flow(FlowOptions),
    /// Workflow: fetch, compare, then pull and/or push
    Sync(SyncOptions),
    /// Workflow: validate, tag and push a release
    Release(ReleaseOptions),
    /// Workflow: prune, gc and delete merged branches
    Clean(CleanOptions),
    /// Workflow: switch to a branch and bring it up to date
    Dev(DevOptions),
    /// Serve every operation as a tool over line-delimited JSON on stdin/stdout
    Serve,
    /// List alias names, optionally linking them to this binary
    Aliases {
        /// Create one symlink per alias in DIR
        #[arg(long, value_name = "DIR")]
        link: Option<PathBuf>,
    },
}

fn arguments<T: Serialize>(options: &T) -> serde_json::Result<Map<String, Value>> {
    match serde_json::to_value(options)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

impl Commands {
    /// The operation and its argument map, for commands that run one.
    pub fn operation(&self) -> serde_json::Result<Option<(Operation, Map<String, Value>)>> {
        let pair = match self {
            Commands::Status(o) => (Operation::Status, arguments(o)?),
            Commands::Add(o) => (Operation::Add, arguments(o)?),
            Commands::Commit(o) => (Operation::Commit, arguments(o)?),
            Commands::Push(o) => (Operation::Push, arguments(o)?),
            Commands::Pull(o) => (Operation::Pull, arguments(o)?),
            Commands::Fetch(o) => (Operation::Fetch, arguments(o)?),
            Commands::Branch(o) => (Operation::Branch, arguments(o)?),
            Commands::Checkout(o) => (Operation::Checkout, arguments(o)?),
            Commands::Log(o) => (Operation::Log, arguments(o)?),
            Commands::Diff(o) => (Operation::Diff, arguments(o)?),
            Commands::Stash(o) => (Operation::Stash, arguments(o)?),
            Commands::Reset(o) => (Operation::Reset, arguments(o)?),
            Commands::Tag(o) => (Operation::Tag, arguments(o)?),
            Commands::Merge(o) => (Operation::Merge, arguments(o)?),
            Commands::Rebase(o) => (Operation::Rebase, arguments(o)?),
            Commands::CherryPick(o) => (Operation::CherryPick, arguments(o)?),
            Commands::Resume(o) => (Operation::Resume, arguments(o)?),
            Commands::Blame(o) => (Operation::Blame, arguments(o)?),
            Commands::Bisect(o) => (Operation::Bisect, arguments(o)?),
            Commands::Remote(o) => (Operation::Remote, arguments(o)?),
            Commands::Clone(o) => (Operation::Clone, arguments(o)?),
            Commands::Init(o) => (Operation::Init, arguments(o)?),
            Commands::Compare(o) => (Operation::Compare, arguments(o)?),
            Commands::Flow(o) => (Operation::Flow, arguments(o)?),
            Commands::Sync(o) => (Operation::Sync, arguments(o)?),
            Commands::Release(o) => (Operation::Release, arguments(o)?),
            Commands::Clean(o) => (Operation::Clean, arguments(o)?),
            Commands::Dev(o) => (Operation::Dev, arguments(o)?),
            Commands::Serve | Commands::Aliases { .. } => return Ok(None),
        };
        Ok(Some(pair))
    }
}

/// Global options whose value is the next token.
const VALUE_OPTIONS: [&str; 3] = ["--cwd", "--timeout-ms", "--log-level"];

/// Whether `args` already select a subcommand, or ask for help or the version.
fn names_subcommand(args: &[String]) -> bool {
    let mut tokens = args.iter();
    while let Some(token) = tokens.next() {
        match token.as_str() {
            "-h" | "--help" | "-V" | "--version" | "help" => return true,
            option if VALUE_OPTIONS.contains(&option) => {
                tokens.next();
            }
            option if option.starts_with('-') => {}
            name => return Cli::command().find_subcommand(name).is_some(),
        }
    }
    false
}

/// Rewrite `gcommit -m wip` into `gitmate commit -m wip` when the process was
/// started under an alias, or when a wrapper script ran `gitmate "$@"` without
/// naming a subcommand. `None` when the arguments already select a subcommand
/// or no heuristic recognises the invocation.
pub fn alias_argv(context: &InvocationContext, resolver: &IdentityResolver) -> Option<Vec<String>> {
    if normalize(&context.program) == PROGRAM_NAME && names_subcommand(&context.args) {
        return None;
    }
    let resolution = resolver.resolve(context)?;
    let mut argv = Vec::with_capacity(context.args.len() + 2);
    argv.push(PROGRAM_NAME.to_string());
    argv.push(resolution.operation.as_str().to_string());
    argv.extend(context.args.iter().cloned());
    Some(argv)
}
