//! Error classification
//!
//! Maps raw diagnostic text from the version-control tool onto a closed set of
//! [`ErrorKind`]s. Classification is pure: the same text always yields the
//! same kind and nothing is ever dropped, `Unknown` is the explicit fallback.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotARepository,
    NothingToStage,
    NothingToCommit,
    MergeConflict,
    RebaseConflict,
    CherryPickConflict,
    AuthenticationFailure,
    NetworkUnreachable,
    PermissionDenied,
    RemoteRejected,
    NoUpstream,
    InvalidReference,
    Timeout,
    Unknown,
}

/// How a needle is compared against the raw text.
#[derive(Debug, Clone, Copy)]
enum Needle {
    /// Case-sensitive, for markers git always prints the same way
    Exact(&'static str),
    /// Lowercase needle matched against the lowercased text
    Folded(&'static str),
}

use Needle::{Exact, Folded};

/// The first entry whose needle occurs wins, so more specific phrases sit
/// above the general ones they overlap with. Conflict needles never match a
/// bare word, since paths, branches and URLs may contain "conflict".
const PATTERNS: &[(Needle, ErrorKind)] = &[
    (Folded("not a git repository"), ErrorKind::NotARepository),
    (Folded("rebase --continue"), ErrorKind::RebaseConflict),
    (Folded("rebase in progress"), ErrorKind::RebaseConflict),
    (Folded("cherry-pick --continue"), ErrorKind::CherryPickConflict),
    (Folded("cherry-pick is already in progress"), ErrorKind::CherryPickConflict),
    (Folded("did not match any file(s) known to git"), ErrorKind::InvalidReference),
    (Exact("CONFLICT ("), ErrorKind::MergeConflict),
    (Exact("Merge conflict in"), ErrorKind::MergeConflict),
    (Folded("unresolved conflict"), ErrorKind::MergeConflict),
    (Folded("fix conflicts and then commit"), ErrorKind::MergeConflict),
    (Folded("you have unmerged files"), ErrorKind::MergeConflict),
    (Folded("unmerged paths"), ErrorKind::MergeConflict),
    (Folded("you have not concluded your merge"), ErrorKind::MergeConflict),
    (Folded("nothing to commit"), ErrorKind::NothingToCommit),
    (Folded("nothing added to commit"), ErrorKind::NothingToCommit),
    (Folded("no changes added to commit"), ErrorKind::NothingToCommit),
    (Folded("no local changes to save"), ErrorKind::NothingToCommit),
    (Folded("nothing specified, nothing added"), ErrorKind::NothingToStage),
    (Folded("did not match any files"), ErrorKind::NothingToStage),
    (Folded("permission denied (publickey"), ErrorKind::AuthenticationFailure),
    (Folded("authentication failed"), ErrorKind::AuthenticationFailure),
    (Folded("could not read username"), ErrorKind::AuthenticationFailure),
    (Folded("could not read password"), ErrorKind::AuthenticationFailure),
    (Folded("invalid username or password"), ErrorKind::AuthenticationFailure),
    (Folded("terminal prompts disabled"), ErrorKind::AuthenticationFailure),
    (Folded("could not resolve hostname"), ErrorKind::NetworkUnreachable),
    (Folded("could not resolve host"), ErrorKind::NetworkUnreachable),
    (Folded("network is unreachable"), ErrorKind::NetworkUnreachable),
    (Folded("connection refused"), ErrorKind::NetworkUnreachable),
    (Folded("connection timed out"), ErrorKind::NetworkUnreachable),
    (Folded("failed to connect"), ErrorKind::NetworkUnreachable),
    (Folded("permission denied"), ErrorKind::PermissionDenied),
    (Folded("read-only file system"), ErrorKind::PermissionDenied),
    (Folded("insufficient permission"), ErrorKind::PermissionDenied),
    (Folded("remote rejected"), ErrorKind::RemoteRejected),
    (Folded("[rejected]"), ErrorKind::RemoteRejected),
    (Folded("updates were rejected"), ErrorKind::RemoteRejected),
    (Folded("failed to push some refs"), ErrorKind::RemoteRejected),
    (Folded("no upstream branch"), ErrorKind::NoUpstream),
    (Folded("has no upstream"), ErrorKind::NoUpstream),
    (Folded("no upstream configured"), ErrorKind::NoUpstream),
    (Folded("no tracking information"), ErrorKind::NoUpstream),
    (Folded("unknown revision"), ErrorKind::InvalidReference),
    (Folded("not a valid object name"), ErrorKind::InvalidReference),
    (Folded("not a valid ref"), ErrorKind::InvalidReference),
    (Folded("bad revision"), ErrorKind::InvalidReference),
    (Folded("invalid reference"), ErrorKind::InvalidReference),
    (Folded("needed a single revision"), ErrorKind::InvalidReference),
    (Folded("couldn't find remote ref"), ErrorKind::InvalidReference),
    (Folded("not something we can merge"), ErrorKind::InvalidReference),
    (Folded("does not appear to be a git repository"), ErrorKind::InvalidReference),
    (Folded("no such remote"), ErrorKind::InvalidReference),
    (Folded("timed out"), ErrorKind::Timeout),
];

/// Classify raw tool output. Total: unmatched text is `Unknown`.
pub fn classify(raw_error_text: &str) -> ErrorKind {
    let folded = raw_error_text.to_lowercase();
    PATTERNS
        .iter()
        .find(|(needle, _)| match needle {
            Exact(marker) => raw_error_text.contains(marker),
            Folded(phrase) => folded.contains(phrase),
        })
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}

impl ErrorKind {
    pub fn is_conflict(self) -> bool {
        matches!(
            self,
            ErrorKind::MergeConflict | ErrorKind::RebaseConflict | ErrorKind::CherryPickConflict
        )
    }

    /// Short human remediation hint for this kind.
    pub fn remediation(self) -> &'static str {
        match self {
            ErrorKind::NotARepository => {
                "Run the command inside a git repository, or initialise one with `git init`."
            }
            ErrorKind::NothingToStage => {
                "There are no changes matching the given paths; check the paths or edit files first."
            }
            ErrorKind::NothingToCommit => "Stage changes with `add` before committing.",
            ErrorKind::MergeConflict => {
                "Resolve the conflicted files, stage them, then continue or abort the merge."
            }
            ErrorKind::RebaseConflict => {
                "Resolve the conflicted files, stage them, then run `git rebase --continue` or `git rebase --abort`."
            }
            ErrorKind::CherryPickConflict => {
                "Resolve the conflicted files, stage them, then run `git cherry-pick --continue` or `git cherry-pick --abort`."
            }
            ErrorKind::AuthenticationFailure => {
                "Check your credentials or SSH key and that you have access to the remote."
            }
            ErrorKind::NetworkUnreachable => {
                "Check your network connection and the remote URL (`git remote -v`)."
            }
            ErrorKind::PermissionDenied => {
                "Check file system permissions on the repository and your access rights on the remote."
            }
            ErrorKind::RemoteRejected => {
                "Fetch and integrate the remote changes first (`sync`), then push again."
            }
            ErrorKind::NoUpstream => {
                "Push with --set-upstream to link this branch to a remote branch."
            }
            ErrorKind::InvalidReference => {
                "Check the branch, tag, commit or remote name; list them with `branch`, `tag` or `remote`."
            }
            ErrorKind::Timeout => {
                "Narrow the scope of the operation or check connectivity, then retry with a larger timeout."
            }
            ErrorKind::Unknown => "Inspect the command output for details.",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ErrorKind::NotARepository => "not a git repository",
            ErrorKind::NothingToStage => "nothing to stage",
            ErrorKind::NothingToCommit => "nothing to commit",
            ErrorKind::MergeConflict => "merge conflict",
            ErrorKind::RebaseConflict => "rebase conflict",
            ErrorKind::CherryPickConflict => "cherry-pick conflict",
            ErrorKind::AuthenticationFailure => "authentication failed",
            ErrorKind::NetworkUnreachable => "network unreachable",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::RemoteRejected => "rejected by remote",
            ErrorKind::NoUpstream => "no upstream branch",
            ErrorKind::InvalidReference => "invalid reference",
            ErrorKind::Timeout => "timed out",
            ErrorKind::Unknown => "unknown error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}
