//! Repository Snapshot Integration Tests
//!
//! Snapshot collection against a fake git bridge:
//! - Empty repository path short-circuits without touching the bridge
//! - Diff targets come from plan targets, then status paths, in order
//! - Failing calls are recorded and collection carries on

use changeflow::models::change_request::ChangeRequest;
use changeflow::services::git::UnavailableGitBridge;
use changeflow::services::plan_engine::create_plan;
use changeflow::services::snapshot::{collect_repository_snapshot, SnapshotRequest};

use crate::fakes::FakeGit;

fn request(path: &str) -> SnapshotRequest<'_> {
    SnapshotRequest {
        repository_path: path,
        plan: None,
        focus_paths: Vec::new(),
        max_diffs: None,
    }
}

#[tokio::test]
async fn test_empty_path_never_invokes_bridge() {
    let git = FakeGit::new().with_status(&["a.rs"]);
    let outcome = collect_repository_snapshot(&git, request("")).await;

    assert!(outcome.snapshot.status.is_empty());
    assert!(outcome.snapshot.diffs.is_empty());
    assert!(outcome.snapshot.summary.is_none());
    assert_eq!(outcome.errors.len(), 1);
    assert!(git.call_names().is_empty());
}

#[tokio::test]
async fn test_context_status_then_ordered_diffs() {
    let git = FakeGit::new()
        .with_status(&["src/b.rs", "src/a.rs", "README.md"])
        .with_diff("src/a.rs", "diff a")
        .with_diff("src/b.rs", "diff b")
        .with_diff("src/main.rs", "diff main");
    let plan = create_plan(&ChangeRequest::new("Update `src/main.rs`", "/repo"));

    let outcome = collect_repository_snapshot(
        &git,
        SnapshotRequest {
            plan: Some(&plan),
            ..request("/repo")
        },
    )
    .await;

    let names = git.call_names();
    assert_eq!(&names[..2], &["get-repository-context", "repository-status"]);
    assert_eq!(
        git.diff_requests(),
        vec!["src/main.rs", "src/b.rs", "src/a.rs", "README.md"]
    );

    // README.md has no diff and is dropped.
    let diffs: Vec<&str> = outcome.snapshot.diffs.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(diffs, vec!["src/main.rs", "src/b.rs", "src/a.rs"]);
    assert_eq!(outcome.snapshot.summary.unwrap().branch, "main");
    assert!(outcome.errors.is_empty());
}

#[tokio::test]
async fn test_diff_fan_out_is_capped() {
    let git = FakeGit::new().with_status(&["1", "2", "3", "4", "5", "6", "7"]);
    collect_repository_snapshot(&git, request("/repo")).await;
    assert_eq!(git.diff_requests(), vec!["1", "2", "3", "4", "5"]);

    let git = FakeGit::new().with_status(&["1", "2", "3"]);
    collect_repository_snapshot(
        &git,
        SnapshotRequest {
            max_diffs: Some(2),
            focus_paths: vec!["extra".to_string(), "1".to_string()],
            ..request("/repo")
        },
    )
    .await;
    assert_eq!(git.diff_requests(), vec!["extra", "1"]);
}

#[tokio::test]
async fn test_failures_accumulate() {
    let git = FakeGit::new()
        .with_status(&["a.rs"])
        .failing("get-repository-context")
        .failing("get-file-diff");
    let outcome = collect_repository_snapshot(&git, request("/repo")).await;

    assert!(outcome.snapshot.summary.is_none());
    assert_eq!(outcome.snapshot.status.len(), 1);
    assert_eq!(
        outcome.errors,
        vec![
            "Failed to load repository context: simulated failure".to_string(),
            "Failed to load diff for a.rs: simulated failure".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unavailable_bridge_degrades() {
    let outcome = collect_repository_snapshot(&UnavailableGitBridge, request("/repo")).await;
    assert!(outcome.snapshot.is_empty());
    assert_eq!(outcome.errors.len(), 2);
    assert!(outcome
        .errors
        .iter()
        .all(|e| e.starts_with("Git bridge unavailable")));
}
