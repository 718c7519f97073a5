//! Workflow Commands
//!
//! Command surface for presentation callers. Every command wraps its outcome
//! in a `CommandResponse`; errors never escape as panics or `Err`.

use crate::models::response::CommandResponse;
use crate::models::workflow::WorkflowRequest;
use crate::services::workflow::{QueueRequest, WorkflowCoordinator};

/// Queue a workflow request. `data` is `None` when the prompt was blank.
pub async fn queue_workflow_request(
    coordinator: &WorkflowCoordinator,
    request: QueueRequest,
) -> CommandResponse<Option<WorkflowRequest>> {
    CommandResponse::ok(coordinator.queue_request(request).await)
}

pub async fn get_workflow_request(
    coordinator: &WorkflowCoordinator,
) -> CommandResponse<Option<WorkflowRequest>> {
    CommandResponse::ok(coordinator.current_request())
}

pub async fn clear_workflow_request(coordinator: &WorkflowCoordinator) -> CommandResponse<bool> {
    coordinator.clear_request().await;
    CommandResponse::ok(true)
}

pub async fn toggle_workflow_dry_run(
    coordinator: &WorkflowCoordinator,
    enabled: bool,
) -> CommandResponse<WorkflowRequest> {
    coordinator.set_dry_run(enabled).into()
}

pub async fn toggle_workflow_manual_approval(
    coordinator: &WorkflowCoordinator,
    enabled: bool,
) -> CommandResponse<WorkflowRequest> {
    coordinator.set_manual_approval(enabled).into()
}

/// Approve, reject, or reset (`None`) one plan step.
pub async fn approve_workflow_step(
    coordinator: &WorkflowCoordinator,
    step_id: String,
    approved: Option<bool>,
) -> CommandResponse<WorkflowRequest> {
    coordinator.set_step_approval(&step_id, approved).into()
}

pub async fn sync_workflow_repository(
    coordinator: &WorkflowCoordinator,
    repository_path: String,
    remote: Option<String>,
    branch: Option<String>,
) -> CommandResponse<String> {
    let result = coordinator
        .sync_repository(&repository_path, remote, branch)
        .await;
    if let Err(err) = &result {
        tracing::warn!(path = %repository_path, error = %err, "repository sync failed");
    }
    result.into()
}
