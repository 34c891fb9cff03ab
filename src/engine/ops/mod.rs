//! Primitive operations, one [`GitEngine`](super::GitEngine) method per capability.
//!
//! Each options struct doubles as the CLI argument set (`clap::Args`) and the
//! protocol argument payload (`serde`), and exposes the command it would run
//! so dry-run previews show exactly what a real run issues.

/// Return the guard's rejection result when the directory is not a repository.
macro_rules! guarded {
    ($engine:expr, $builder:expr) => {
        if let Some(rejected) = $engine.ensure_repository(&$builder).await {
            return Ok(rejected);
        }
    };
}

/// Unwrap a probe, returning its failure result from the primitive.
macro_rules! or_return {
    ($probe:expr) => {
        match $probe {
            Ok(value) => value,
            Err(result) => return Ok(result),
        }
    };
}

mod branches;
mod changes;
mod inspect;
mod integrate;
mod remote;

pub use branches::{BranchAction, BranchOptions, CheckoutOptions, TagAction, TagOptions};
pub use changes::{AddOptions, CommitOptions, ResetMode, ResetOptions, StashAction, StashOptions};
pub use inspect::{BlameOptions, DiffOptions, LogOptions, StatusOptions, DEFAULT_LOG_COUNT};
pub use integrate::{
    BisectAction, BisectOptions, CherryPickOptions, MergeOptions, RebaseOptions, ResumeAction,
    ResumeOptions, MERGE_STRATEGIES,
};
pub use remote::{
    CloneOptions, CompareOptions, Divergence, FetchOptions, InitOptions, PullOptions, PushOptions,
    RemoteAction, RemoteOptions,
};

/// Porcelain v1 lines whose work-tree column shows a change (untracked included).
pub(crate) fn has_unstaged_changes(porcelain: &str) -> bool {
    porcelain
        .lines()
        .any(|line| line.len() >= 2 && line.as_bytes()[1] != b' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_unstaged_changes() {
        assert!(has_unstaged_changes(" M src/lib.rs\n"));
        assert!(has_unstaged_changes("?? new.txt\n"));
        assert!(has_unstaged_changes("MM both.txt\n"));
        assert!(!has_unstaged_changes("M  staged.txt\nA  added.txt\n"));
        assert!(!has_unstaged_changes(""));
    }
}
