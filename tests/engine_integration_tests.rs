//! Primitive operations against real repositories
//!
//! Each test builds its own repository in a temp dir and drives the engine
//! with the real `git` binary.

mod fixtures;

use fixtures::{engine, TestRepo};
use gitmate::engine::{
    AddOptions, CheckoutOptions, CherryPickOptions, CommitOptions, CompareOptions, InitOptions,
    MergeOptions, RebaseOptions, ResumeAction, ResumeOptions, StatusOptions, TagOptions,
};
use gitmate::{ConflictKind, EngineError, ErrorKind, OperationStatus};
use tempfile::TempDir;

#[tokio::test]
async fn test_operations_outside_a_repository_are_rejected() {
    let not_a_repo = TempDir::new().unwrap();
    let result = engine()
        .status(not_a_repo.path(), &StatusOptions::default())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.status, OperationStatus::Failed);
    assert_eq!(result.error_kind, Some(ErrorKind::NotARepository));
    assert!(result.remediation.is_some());
    assert!(result.metadata.command_issued.is_none());
}

#[tokio::test]
async fn test_add_refuses_when_nothing_changed() {
    let repo = TestRepo::new();
    let engine = engine();

    let result = engine.add(repo.path(), &AddOptions::default()).await.unwrap();
    assert_eq!(result.error_kind, Some(ErrorKind::NothingToStage));

    repo.write("notes.txt", "hello\n");
    let result = engine.add(repo.path(), &AddOptions::default()).await.unwrap();
    assert!(result.succeeded(), "{:?}", result.message);
    assert_eq!(result.message, vec!["staged 1 path(s)".to_string()]);
    assert_eq!(repo.git(&["diff", "--cached", "--name-only"]), "notes.txt");
}

#[tokio::test]
async fn test_commit_with_nothing_staged_leaves_history_alone() {
    let repo = TestRepo::new();
    let before = repo.head();

    let result = engine()
        .commit(repo.path(), &CommitOptions::new("should not happen"))
        .await
        .unwrap();

    assert_eq!(result.error_kind, Some(ErrorKind::NothingToCommit));
    assert_eq!(repo.head(), before);
}

#[tokio::test]
async fn test_commit_records_staged_changes() {
    let repo = TestRepo::new();
    repo.write("src/lib.rs", "pub fn answer() -> u32 { 42 }\n");
    repo.git(&["add", "src/lib.rs"]);

    let result = engine()
        .commit(repo.path(), &CommitOptions::new("Add answer"))
        .await
        .unwrap();

    assert!(result.succeeded(), "{:?}", result.message);
    assert_eq!(repo.git(&["log", "-1", "--format=%s"]), "Add answer");
    assert_eq!(result.metadata.exit_code, Some(0));
    assert!(result.metadata.command_issued.as_deref().unwrap().starts_with("git commit"));
}

#[tokio::test]
async fn test_empty_commit_message_is_an_argument_error() {
    let repo = TestRepo::new();
    let err = engine()
        .commit(repo.path(), &CommitOptions::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingArgument { .. }));
}

#[tokio::test]
async fn test_merge_conflict_is_reported_and_can_be_aborted() {
    let repo = TestRepo::new();
    repo.diverging_branches("shared.txt");
    let engine = engine();

    let result = engine
        .merge(repo.path(), &MergeOptions::new("feature"))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.status, OperationStatus::Conflicted);
    assert_eq!(result.error_kind, Some(ErrorKind::MergeConflict));
    let report = result.conflict.expect("conflict report");
    assert_eq!(report.kind, ConflictKind::Merge);
    assert!(report.conflicted_paths.contains("shared.txt"));
    assert_eq!(report.continue_command, "merge --continue");
    assert_eq!(report.abort_command, "merge --abort");

    let aborted = engine
        .resume(
            repo.path(),
            &ResumeOptions {
                kind: ConflictKind::Merge,
                action: ResumeAction::Abort,
            },
        )
        .await
        .unwrap();
    assert!(aborted.succeeded(), "{:?}", aborted.message);
    assert!(repo.is_clean());
}

#[tokio::test]
async fn test_rebase_conflict_is_reported() {
    let repo = TestRepo::new();
    repo.diverging_branches("shared.txt");
    repo.git(&["checkout", "--quiet", "feature"]);
    let engine = engine();

    let result = engine
        .rebase(
            repo.path(),
            &RebaseOptions {
                upstream: "main".to_string(),
                ..RebaseOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(result.status, OperationStatus::Conflicted);
    assert_eq!(result.error_kind, Some(ErrorKind::RebaseConflict));
    assert_eq!(result.conflict.as_ref().unwrap().abort_command, "rebase --abort");

    let aborted = engine
        .resume(
            repo.path(),
            &ResumeOptions {
                kind: ConflictKind::Rebase,
                action: ResumeAction::Abort,
            },
        )
        .await
        .unwrap();
    assert!(aborted.succeeded(), "{:?}", aborted.message);
    assert_eq!(repo.current_branch(), "feature");
}

#[tokio::test]
async fn test_cherry_pick_conflict_is_reported() {
    let repo = TestRepo::new();
    repo.diverging_branches("shared.txt");
    let feature_tip = repo.git(&["rev-parse", "feature"]);

    let result = engine()
        .cherry_pick(
            repo.path(),
            &CherryPickOptions {
                commits: vec![feature_tip],
                ..CherryPickOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(result.status, OperationStatus::Conflicted);
    assert_eq!(result.error_kind, Some(ErrorKind::CherryPickConflict));
    assert!(result.conflict.unwrap().conflicted_paths.contains("shared.txt"));
    repo.git(&["cherry-pick", "--abort"]);
}

#[tokio::test]
async fn test_clean_merge_succeeds_without_report() {
    let repo = TestRepo::new();
    repo.git(&["checkout", "--quiet", "-b", "feature"]);
    repo.commit_file("feature.txt", "new\n", "Add feature file");
    repo.git(&["checkout", "--quiet", "main"]);

    let result = engine()
        .merge(repo.path(), &MergeOptions::new("feature"))
        .await
        .unwrap();

    assert!(result.succeeded(), "{:?}", result.message);
    assert!(result.conflict.is_none());
    assert!(repo.path().join("feature.txt").exists());
}

#[tokio::test]
async fn test_checkout_create_refuses_existing_branch() {
    let repo = TestRepo::new();
    repo.git(&["branch", "topic"]);

    let result = engine()
        .checkout(
            repo.path(),
            &CheckoutOptions {
                target: "topic".to_string(),
                create: true,
                start_point: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(result.error_kind, Some(ErrorKind::InvalidReference));
    assert_eq!(repo.current_branch(), "main");
}

#[tokio::test]
async fn test_checkout_unknown_branch_is_classified() {
    let repo = TestRepo::new();
    let result = engine()
        .checkout(
            repo.path(),
            &CheckoutOptions {
                target: "does-not-exist".to_string(),
                create: false,
                start_point: None,
            },
        )
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::InvalidReference));
    assert!(result.metadata.exit_code.is_some());
}

#[tokio::test]
async fn test_tag_create_is_not_repeated() {
    let repo = TestRepo::new();
    let engine = engine();
    let options = TagOptions::create("v1.0.0", Some("Release v1.0.0".to_string()));

    let first = engine.tag(repo.path(), &options).await.unwrap();
    assert!(first.succeeded(), "{:?}", first.message);
    assert_eq!(repo.git(&["tag", "--list"]), "v1.0.0");

    let second = engine.tag(repo.path(), &options).await.unwrap();
    assert_eq!(second.error_kind, Some(ErrorKind::InvalidReference));
}

#[tokio::test]
async fn test_init_is_a_no_op_inside_a_repository() {
    let empty = TempDir::new().unwrap();
    let engine = engine();
    let options = InitOptions::default();

    let created = engine.init(empty.path(), &options).await.unwrap();
    assert!(created.succeeded(), "{:?}", created.message);
    assert!(empty.path().join(".git").is_dir());

    let again = engine.init(empty.path(), &options).await.unwrap();
    assert!(again.succeeded());
    assert!(again.metadata.command_issued.is_none());
}

#[tokio::test]
async fn test_init_inside_a_repository_subdirectory_creates_a_new_one() {
    let repo = TestRepo::new();
    let nested = repo.path().join("newproject");
    std::fs::create_dir(&nested).unwrap();

    let result = engine().init(&nested, &InitOptions::default()).await.unwrap();

    assert!(result.succeeded(), "{:?}", result.message);
    assert!(result.metadata.command_issued.is_some());
    assert!(nested.join(".git").is_dir());
}

#[tokio::test]
async fn test_compare_counts_commits_ahead() {
    let repo = TestRepo::with_origin();
    repo.commit_file("local.txt", "local\n", "Local work");

    let result = engine()
        .compare(repo.path(), &CompareOptions::default())
        .await
        .unwrap();

    assert!(result.succeeded(), "{:?}", result.message);
    assert_eq!(result.message, vec!["ahead of @{u} by 1 commit(s)".to_string()]);
}

#[tokio::test]
async fn test_compare_without_upstream_is_classified() {
    let repo = TestRepo::new();
    let result = engine()
        .compare(repo.path(), &CompareOptions::default())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::NoUpstream));
}
