//! Composite workflows against real repositories with a bare origin

mod fixtures;

use fixtures::{engine, git, TestRepo};
use gitmate::workflows::{CleanOptions, DevOptions, FlowOptions, ReleaseOptions, SyncOptions};
use gitmate::{ErrorKind, OperationStatus};

fn flow(message: &str) -> FlowOptions {
    FlowOptions {
        message: message.to_string(),
        ..FlowOptions::default()
    }
}

#[tokio::test]
async fn test_flow_adds_commits_and_pushes() {
    let repo = TestRepo::with_origin();
    repo.write("feature.txt", "new feature\n");

    let run = engine().flow(repo.path(), &flow("Add feature")).await.unwrap();

    assert!(run.succeeded(), "{}", run.render());
    assert_eq!(run.steps.len(), 3);
    let origin = repo.origin_path().unwrap();
    assert_eq!(git(origin, &["log", "-1", "--format=%s", "main"]), "Add feature");
    assert!(repo.is_clean());
}

#[tokio::test]
async fn test_flow_stops_at_first_failing_step() {
    let repo = TestRepo::with_origin();
    let before = repo.head();

    let run = engine().flow(repo.path(), &flow("Nothing to see")).await.unwrap();

    assert!(run.aborted);
    assert_eq!(run.aborted_at_step, Some(1));
    assert_eq!(run.steps.len(), 2);
    assert_eq!(run.steps[1].error_kind, Some(ErrorKind::NothingToCommit));
    assert_eq!(repo.head(), before);
}

#[tokio::test]
async fn test_flow_commits_changes_staged_by_hand() {
    let repo = TestRepo::with_origin();
    repo.write("README.md", "# Staged by hand\n");
    repo.git(&["add", "README.md"]);

    let run = engine().flow(repo.path(), &flow("Update readme")).await.unwrap();

    assert!(run.succeeded(), "{}", run.render());
    let origin = repo.origin_path().unwrap();
    assert_eq!(git(origin, &["log", "-1", "--format=%s", "main"]), "Update readme");
}

#[tokio::test]
async fn test_flow_publishes_branch_without_upstream() {
    let repo = TestRepo::with_origin();
    repo.git(&["checkout", "--quiet", "-b", "topic"]);
    repo.write("topic.txt", "topic work\n");

    let run = engine().flow(repo.path(), &flow("Topic work")).await.unwrap();

    assert!(run.succeeded(), "{}", run.render());
    let push = run.steps.last().unwrap();
    assert!(push.message[0].contains("no upstream was configured"));
    assert_eq!(repo.git(&["rev-parse", "--abbrev-ref", "topic@{u}"]), "origin/topic");
}

#[tokio::test]
async fn test_flow_dry_run_changes_nothing() {
    let repo = TestRepo::with_origin();
    repo.write("draft.txt", "draft\n");
    let options = FlowOptions {
        dry_run: true,
        ..flow("Draft")
    };

    let run = engine().flow(repo.path(), &options).await.unwrap();

    assert!(run.dry_run);
    assert!(run.steps.iter().all(|s| s.status == OperationStatus::Preview));
    assert_eq!(repo.git(&["status", "--porcelain"]), "?? draft.txt");
}

#[tokio::test]
async fn test_sync_pulls_when_behind() {
    let repo = TestRepo::with_origin();
    repo.push_from_other_clone("upstream.txt", "Upstream change");

    let run = engine().sync(repo.path(), &SyncOptions::default()).await.unwrap();

    assert!(run.succeeded(), "{}", run.render());
    let names: Vec<&str> = run.steps.iter().map(|s| s.metadata.operation_name.as_str()).collect();
    assert_eq!(names, vec!["fetch", "compare", "pull"]);
    assert!(repo.path().join("upstream.txt").exists());
}

#[tokio::test]
async fn test_sync_up_to_date_does_nothing_more() {
    let repo = TestRepo::with_origin();

    let run = engine().sync(repo.path(), &SyncOptions::default()).await.unwrap();

    assert!(run.succeeded(), "{}", run.render());
    assert_eq!(run.steps.len(), 2);
    assert_eq!(run.steps[1].message, vec!["up to date with @{u}".to_string()]);
}

#[tokio::test]
async fn test_release_tags_and_pushes_the_tag() {
    let repo = TestRepo::with_origin();
    let options = ReleaseOptions {
        version: "1.2.0".to_string(),
        ..ReleaseOptions::default()
    };

    let run = engine().release(repo.path(), &options).await.unwrap();

    assert!(run.succeeded(), "{}", run.render());
    assert_eq!(repo.git(&["tag", "--list"]), "v1.2.0");
    let origin = repo.origin_path().unwrap();
    assert_eq!(git(origin, &["tag", "--list"]), "v1.2.0");
}

#[tokio::test]
async fn test_release_refuses_dirty_tree() {
    let repo = TestRepo::with_origin();
    repo.write("README.md", "# Changed\n");
    let options = ReleaseOptions {
        version: "v2.0.0".to_string(),
        ..ReleaseOptions::default()
    };

    let run = engine().release(repo.path(), &options).await.unwrap();

    assert!(run.aborted);
    assert_eq!(run.aborted_at_step, Some(0));
    assert!(repo.git(&["tag", "--list"]).is_empty());
}

#[tokio::test]
async fn test_release_rejects_bad_version_before_running() {
    let repo = TestRepo::with_origin();
    let options = ReleaseOptions {
        version: "next".to_string(),
        ..ReleaseOptions::default()
    };
    assert!(engine().release(repo.path(), &options).await.is_err());
}

#[tokio::test]
async fn test_clean_deletes_merged_branches_only() {
    let repo = TestRepo::with_origin();
    repo.git(&["branch", "merged-topic"]);
    repo.git(&["checkout", "--quiet", "-b", "open-topic"]);
    repo.commit_file("open.txt", "unmerged\n", "Unmerged work");
    repo.git(&["checkout", "--quiet", "main"]);

    let run = engine().clean(repo.path(), &CleanOptions::default()).await.unwrap();

    assert!(run.succeeded(), "{}", run.render());
    let branches = repo.git(&["branch", "--format=%(refname:short)"]);
    assert!(!branches.contains("merged-topic"));
    assert!(branches.contains("open-topic"));
    assert!(branches.contains("main"));
}

#[tokio::test]
async fn test_dev_creates_and_publishes_branch() {
    let repo = TestRepo::with_origin();
    let options = DevOptions {
        branch: "feature-x".to_string(),
        ..DevOptions::default()
    };

    let run = engine().dev(repo.path(), &options).await.unwrap();

    assert!(run.succeeded(), "{}", run.render());
    assert_eq!(repo.current_branch(), "feature-x");
    let origin = repo.origin_path().unwrap();
    assert!(git(origin, &["branch", "--list", "feature-x"]).contains("feature-x"));
}
