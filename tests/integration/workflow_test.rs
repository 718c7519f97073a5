//! Workflow Coordinator Integration Tests
//!
//! The single workflow slot under real scheduling:
//! - Immediate heuristic publish, then the analysis outcome
//! - Supersession and clearing discard late results
//! - Error, fallback and no-backend outcomes
//! - Project preferences override retry settings
//! - Toggles made during analysis survive the commit
//! - Shutdown settles every request as an error

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use changeflow::models::agent::{AgentDefinition, ExecutionMode, ProjectPreferences};
use changeflow::models::change_request::RiskLevel;
use changeflow::models::plan::StepAction;
use changeflow::models::settings::WorkflowConfig;
use changeflow::models::workflow::WorkflowStatus;
use changeflow::services::agents::AgentRegistry;
use changeflow::services::workflow::{InMemoryMessages, QueueRequest, WorkflowCoordinator, WorkflowDeps};

use crate::fakes::{schema_payload, FakeGit, ScriptedFetch, ScriptedInvoker, Step};

fn preferences() -> ProjectPreferences {
    let mut preferences = ProjectPreferences {
        repository_path: Some("/repo".to_string()),
        ..Default::default()
    };
    preferences.orchestrator.retry_delay_ms = Some(5);
    preferences
}

fn messages() -> InMemoryMessages {
    InMemoryMessages::new()
        .with_user_message("m1", "Update `README.md` with install steps")
        .with_user_message("m2", "Delete `old.txt` and commit")
        .with_user_message("blank", "  \n ")
}

fn coordinator_with(
    agents: Vec<AgentDefinition>,
    invoker: ScriptedInvoker,
    fetch: ScriptedFetch,
    preferences: ProjectPreferences,
) -> WorkflowCoordinator {
    WorkflowCoordinator::new(WorkflowDeps {
        git: Arc::new(FakeGit::new().with_status(&["README.md"])),
        messages: Arc::new(messages()),
        registry: Arc::new(AgentRegistry::new(agents)),
        invoker: Arc::new(invoker),
        fetch: Arc::new(fetch),
        preferences,
        config: WorkflowConfig::default(),
        api_keys: HashMap::new(),
    })
}

fn local() -> Vec<AgentDefinition> {
    vec![AgentDefinition::local("local", "ollama", "llama3.1")]
}

#[tokio::test]
async fn test_blank_prompt_publishes_nothing() {
    let coordinator = coordinator_with(
        local(),
        ScriptedInvoker::offline(),
        ScriptedFetch::offline(),
        preferences(),
    );
    let receiver = coordinator.subscribe();

    assert!(coordinator.queue_request(QueueRequest::new("blank")).await.is_none());
    assert!(coordinator
        .queue_request(QueueRequest::new("blank").with_canonical_code("   "))
        .await
        .is_none());
    assert!(!receiver.has_changed().unwrap());
    assert!(coordinator.current_request().is_none());
}

#[tokio::test]
async fn test_queue_publishes_analyzing_then_ready() {
    let coordinator = coordinator_with(
        local(),
        ScriptedInvoker::new(vec![Step::Slow(20, schema_payload().to_string())]),
        ScriptedFetch::offline(),
        preferences(),
    );
    let mut receiver = coordinator.subscribe();

    let queued = coordinator.queue_request(QueueRequest::new("m1")).await.unwrap();
    assert_eq!(queued.status, WorkflowStatus::Analyzing);
    assert_eq!(queued.primary_agent_id.as_deref(), Some("local"));
    assert_eq!(queued.plan.steps[0].action, StepAction::Modify);
    assert_eq!(queued.plan.steps[0].target_path.as_deref(), Some("README.md"));

    receiver.changed().await.unwrap();
    assert_eq!(
        receiver.borrow_and_update().as_ref().map(|r| r.status),
        Some(WorkflowStatus::Analyzing)
    );

    let settled = coordinator.wait_for_settled().await.unwrap();
    assert_eq!(settled.id, queued.id);
    assert_eq!(settled.status, WorkflowStatus::Ready);
    assert_eq!(settled.plan.steps.len(), 3);
    assert_eq!(settled.repository.as_ref().unwrap().status.len(), 1);
    assert!(settled.analysis_errors.is_empty());
    assert!(!settled.traces.is_empty());
}

#[tokio::test]
async fn test_newer_request_supersedes_in_flight_analysis() {
    let coordinator = coordinator_with(
        local(),
        ScriptedInvoker::new(vec![
            Step::Slow(300, r#"{"plan": {"summary": "stale"}}"#.to_string()),
            Step::Reply(r#"{"plan": {"summary": "fresh"}}"#.to_string()),
        ]),
        ScriptedFetch::offline(),
        preferences(),
    );

    let first = coordinator.queue_request(QueueRequest::new("m1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = coordinator.queue_request(QueueRequest::new("m2")).await.unwrap();
    assert_ne!(first.id, second.id);

    let settled = coordinator.wait_for_settled().await.unwrap();
    assert_eq!(settled.id, second.id);
    assert_eq!(settled.plan.summary, "fresh");

    // The first analysis would have finished by now; its result must not land.
    tokio::time::sleep(Duration::from_millis(400)).await;
    let current = coordinator.current_request().unwrap();
    assert_eq!(current.id, second.id);
    assert_eq!(current.plan.summary, "fresh");
}

#[tokio::test]
async fn test_clear_discards_late_result() {
    let coordinator = coordinator_with(
        local(),
        ScriptedInvoker::new(vec![Step::Slow(100, r#"{"plan": {}}"#.to_string())]),
        ScriptedFetch::offline(),
        preferences(),
    );

    coordinator.queue_request(QueueRequest::new("m1")).await.unwrap();
    coordinator.clear_request().await;
    assert!(coordinator.wait_for_settled().await.is_none());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(coordinator.current_request().is_none());
}

#[tokio::test]
async fn test_toggles_during_analysis_survive_commit() {
    let coordinator = coordinator_with(
        local(),
        ScriptedInvoker::new(vec![Step::Slow(
            200,
            r#"{"plan": {"summary": "Analysed", "steps": [{"description": "Delete the stale file"}, {}]}}"#
                .to_string(),
        )]),
        ScriptedFetch::offline(),
        preferences(),
    );

    let queued = coordinator
        .queue_request(QueueRequest {
            risk_level: Some(RiskLevel::Low),
            ..QueueRequest::new("m2")
        })
        .await
        .unwrap();
    assert!(queued.plan.safeguards.dry_run);
    assert!(!queued.plan.safeguards.manual_approval);
    let delete_step = queued.plan.steps[0].id.clone();

    coordinator.set_dry_run(false).unwrap();
    coordinator.set_manual_approval(true).unwrap();
    coordinator.set_step_approval(&delete_step, Some(true)).unwrap();

    let settled = coordinator.wait_for_settled().await.unwrap();
    assert_eq!(settled.status, WorkflowStatus::Ready);
    assert_eq!(settled.plan.summary, "Analysed");
    assert!(!settled.plan.safeguards.dry_run);
    assert!(settled.plan.safeguards.manual_approval);
    assert!(settled
        .plan
        .safeguards
        .notes
        .iter()
        .any(|n| n.starts_with("Dry run disabled")));
    assert_eq!(settled.plan.steps[0].description, "Delete the stale file");
    assert_eq!(settled.plan.steps[0].approved, Some(true));
    assert_eq!(settled.plan.steps[1].approved, None);
}

#[tokio::test]
async fn test_queue_after_shutdown_settles_as_error() {
    let coordinator = coordinator_with(
        local(),
        ScriptedInvoker::replying(r#"{"plan": {}}"#),
        ScriptedFetch::offline(),
        preferences(),
    );
    coordinator.shutdown();

    let queued = coordinator.queue_request(QueueRequest::new("m1")).await.unwrap();
    assert_eq!(queued.status, WorkflowStatus::Error);
    assert_eq!(queued.analysis_errors, vec!["Coordinator shut down".to_string()]);

    let settled = tokio::time::timeout(Duration::from_secs(2), coordinator.wait_for_settled())
        .await
        .expect("request settled");
    assert_eq!(settled, Some(queued));
}

#[tokio::test]
async fn test_shutdown_during_analysis_settles_as_error() {
    let coordinator = coordinator_with(
        local(),
        ScriptedInvoker::new(vec![Step::Slow(300, r#"{"plan": {}}"#.to_string())]),
        ScriptedFetch::offline(),
        preferences(),
    );

    let queued = coordinator.queue_request(QueueRequest::new("m1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    coordinator.shutdown();

    let settled = tokio::time::timeout(Duration::from_secs(2), coordinator.wait_for_settled())
        .await
        .expect("request settled")
        .unwrap();
    assert_eq!(settled.id, queued.id);
    assert_eq!(settled.status, WorkflowStatus::Error);
    assert!(settled
        .analysis_errors
        .contains(&"Coordinator shut down".to_string()));
    assert_eq!(settled.plan.step_signature(), queued.plan.step_signature());
}

#[tokio::test]
async fn test_local_failure_yields_error_with_heuristic_plan() {
    let coordinator = coordinator_with(
        local(),
        ScriptedInvoker::offline(),
        ScriptedFetch::offline(),
        preferences(),
    );

    let queued = coordinator.queue_request(QueueRequest::new("m2")).await.unwrap();
    let settled = coordinator.wait_for_settled().await.unwrap();

    assert_eq!(settled.status, WorkflowStatus::Error);
    assert_eq!(settled.plan.step_signature(), queued.plan.step_signature());
    assert!(settled
        .analysis_errors
        .iter()
        .any(|e| e.contains("runtime offline")));
}

#[tokio::test]
async fn test_cloud_failure_yields_fallback() {
    let agents = vec![AgentDefinition::cloud(
        "cloud",
        "openai",
        "gpt-4o",
        Some("sk-test".to_string()),
    )];
    let coordinator = coordinator_with(
        agents,
        ScriptedInvoker::offline(),
        ScriptedFetch::offline(),
        preferences(),
    );

    let queued = coordinator.queue_request(QueueRequest::new("m1")).await.unwrap();
    let settled = coordinator.wait_for_settled().await.unwrap();

    assert_eq!(settled.status, WorkflowStatus::Fallback);
    assert_eq!(settled.plan.step_signature(), queued.plan.step_signature());
    assert!(!settled.analysis_errors.is_empty());
}

#[tokio::test]
async fn test_no_backend_for_mode() {
    let mut prefs = preferences();
    prefs.orchestrator.mode = ExecutionMode::Cloud;
    let coordinator = coordinator_with(
        local(),
        ScriptedInvoker::offline(),
        ScriptedFetch::offline(),
        prefs,
    );

    let queued = coordinator.queue_request(QueueRequest::new("m1")).await.unwrap();
    assert_eq!(queued.status, WorkflowStatus::Error);
    assert!(queued.primary_agent_id.is_none());
    assert!(queued.analysis_errors[0].starts_with("No backend configured"));
    assert_eq!(coordinator.wait_for_settled().await, Some(queued));
}

#[tokio::test]
async fn test_preferences_override_retry_limit() {
    let script = || {
        ScriptedInvoker::new(vec![
            Step::Fail("flaky".to_string()),
            Step::Reply(r#"{"plan": {}}"#.to_string()),
        ])
    };

    let coordinator = coordinator_with(local(), script(), ScriptedFetch::offline(), preferences());
    coordinator.queue_request(QueueRequest::new("m1")).await.unwrap();
    assert_eq!(
        coordinator.wait_for_settled().await.unwrap().status,
        WorkflowStatus::Ready
    );

    let mut single = preferences();
    single.orchestrator.retry_limit = Some(1);
    let coordinator = coordinator_with(local(), script(), ScriptedFetch::offline(), single);
    coordinator.queue_request(QueueRequest::new("m1")).await.unwrap();
    assert_eq!(
        coordinator.wait_for_settled().await.unwrap().status,
        WorkflowStatus::Error
    );
}

#[tokio::test]
async fn test_request_arguments_and_preferences() {
    let mut prefs = preferences();
    prefs.default_branch = Some("develop".to_string());
    prefs.actor = Some("dev@example.com".to_string());
    prefs.prefer_dry_run = Some(false);
    let coordinator = coordinator_with(Vec::new(), ScriptedInvoker::offline(), ScriptedFetch::offline(), prefs);

    let queued = coordinator
        .queue_request(QueueRequest {
            message_id: "unknown".to_string(),
            canonical_code: Some("Push the release branch".to_string()),
            repository_path: Some("/other".to_string()),
            branch: None,
            risk_level: Some(RiskLevel::Low),
        })
        .await
        .unwrap();

    let context = &queued.change_request.context;
    assert!(queued.source_message.synthetic);
    assert_eq!(context.repository_path, "/other");
    assert_eq!(context.branch.as_deref(), Some("develop"));
    assert_eq!(context.actor.as_deref(), Some("dev@example.com"));
    assert_eq!(context.risk_level, RiskLevel::Low);
    assert!(!queued.plan.safeguards.dry_run);
    assert!(!queued.plan.safeguards.manual_approval);

    coordinator.set_preferences(ProjectPreferences::default());
    let next = coordinator.queue_request(QueueRequest::new("m1")).await.unwrap();
    assert_eq!(next.change_request.context.repository_path, "");
    assert!(next.plan.safeguards.dry_run);
}

#[tokio::test]
async fn test_sync_repository_through_bridge() {
    let coordinator = coordinator_with(
        Vec::new(),
        ScriptedInvoker::offline(),
        ScriptedFetch::offline(),
        preferences(),
    );
    let summary = coordinator
        .sync_repository("/repo", Some("origin".to_string()), Some("main".to_string()))
        .await
        .unwrap();
    assert_eq!(summary, "Already up to date.");
}
