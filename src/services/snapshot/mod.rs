//! Repository Snapshot Collector
//!
//! Gathers repository context, working-tree status and bounded per-file
//! diffs through a `GitBridge`. Failures are recorded and never abort the
//! collection.

use futures_util::future::join_all;

use crate::models::plan::Plan;
use crate::models::snapshot::{FileDiff, RepositorySnapshot};
use crate::services::git::{GitBridge, GitBridgeError, GitBridgeExt};

/// Default number of per-file diffs collected.
pub const DEFAULT_MAX_DIFFS: usize = 5;

/// Input to [`collect_repository_snapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotRequest<'a> {
    pub repository_path: &'a str,
    /// Plan whose target paths seed the focus set
    pub plan: Option<&'a Plan>,
    pub focus_paths: Vec<String>,
    /// Cap on diffs (defaults to [`DEFAULT_MAX_DIFFS`])
    pub max_diffs: Option<usize>,
}

/// Collected snapshot plus the non-fatal errors hit along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotOutcome {
    pub snapshot: RepositorySnapshot,
    pub errors: Vec<String>,
}

fn describe_failure(stage: &str, err: &GitBridgeError) -> String {
    if err.is_unavailable() {
        tracing::debug!(stage, "git bridge unavailable");
        format!("Git bridge unavailable: {} skipped", stage)
    } else {
        tracing::warn!(stage, error = %err, "snapshot fetch failed");
        format!("Failed to {}: {}", stage, err.detail())
    }
}

/// Insertion-ordered, de-duplicated, capped focus set.
fn push_focus(focus: &mut Vec<String>, path: &str, cap: usize) {
    let path = path.trim();
    if focus.len() < cap && !path.is_empty() && !focus.iter().any(|p| p == path) {
        focus.push(path.to_string());
    }
}

/// Collect a repository snapshot for analysis.
pub async fn collect_repository_snapshot(
    bridge: &dyn GitBridge,
    request: SnapshotRequest<'_>,
) -> SnapshotOutcome {
    let mut outcome = SnapshotOutcome::default();
    let repository_path = request.repository_path.trim();

    if repository_path.is_empty() {
        outcome
            .errors
            .push("Repository path is empty: snapshot collection skipped".to_string());
        return outcome;
    }

    match bridge.repository_context(repository_path).await {
        Ok(summary) => outcome.snapshot.summary = Some(summary),
        Err(e) => outcome
            .errors
            .push(describe_failure("load repository context", &e)),
    }

    match bridge.repository_status(repository_path).await {
        Ok(status) => outcome.snapshot.status = status,
        Err(e) => outcome
            .errors
            .push(describe_failure("load repository status", &e)),
    }

    let cap = request.max_diffs.unwrap_or(DEFAULT_MAX_DIFFS);
    let mut focus: Vec<String> = Vec::new();
    if let Some(plan) = request.plan {
        for step in &plan.steps {
            if let Some(target) = &step.target_path {
                push_focus(&mut focus, target, cap);
            }
        }
    }
    for path in &request.focus_paths {
        push_focus(&mut focus, path, cap);
    }
    for entry in &outcome.snapshot.status {
        push_focus(&mut focus, &entry.path, cap);
    }

    let fetches = focus
        .iter()
        .map(|path| async move { (path, bridge.file_diff(repository_path, path).await) });

    for (path, result) in join_all(fetches).await {
        match result {
            Ok(diff) if diff.trim().is_empty() => {}
            Ok(diff) => outcome.snapshot.diffs.push(FileDiff {
                path: path.clone(),
                diff,
            }),
            Err(e) => outcome
                .errors
                .push(describe_failure(&format!("load diff for {}", path), &e)),
        }
    }

    tracing::debug!(
        path = repository_path,
        status = outcome.snapshot.status.len(),
        diffs = outcome.snapshot.diffs.len(),
        errors = outcome.errors.len(),
        "repository snapshot collected"
    );

    outcome
}
