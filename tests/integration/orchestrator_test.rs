//! Orchestrator Integration Tests
//!
//! One analysis run end to end over fake backends:
//! - Retry, timeout and cancellation on the local path
//! - Graceful degradation on the cloud path
//! - Fenced and streamed replies, parse failures
//! - Cross-backend failover and trace delivery

use std::sync::{Arc, Mutex};

use changeflow::models::agent::AgentDefinition;
use changeflow::models::artifacts::AnalysisStatus;
use changeflow::models::change_request::ChangeRequest;
use changeflow::models::settings::WorkflowConfig;
use changeflow::models::trace::{TraceEvent, TraceKind};
use changeflow::services::orchestrator::{AnalysisInput, Orchestrator};
use changeflow::services::plan_engine::create_plan;
use changeflow::utils::error::AppError;
use changeflow_core::{RetryPolicy, StreamEvent};
use changeflow_llm::ProviderFetchOutcome;

use crate::fakes::{fenced, schema_payload, FakeGit, ScriptedFetch, ScriptedInvoker, Step};

const PROMPT: &str = "Update `README.md` with the new install steps";

fn local_agent() -> AgentDefinition {
    AgentDefinition::local("local", "ollama", "llama3.1")
}

fn cloud_agent() -> AgentDefinition {
    AgentDefinition::cloud("cloud", "openai", "gpt-4o", Some("sk-test".to_string()))
}

fn orchestrator(invoker: ScriptedInvoker, fetch: ScriptedFetch, config: WorkflowConfig) -> Orchestrator {
    let git = FakeGit::new()
        .with_status(&["README.md"])
        .with_diff("README.md", "@@ -1 +1 @@\n-old\n+new");
    Orchestrator::new(Arc::new(git), Arc::new(invoker), Arc::new(fetch), config)
}

fn input(agent: AgentDefinition) -> AnalysisInput {
    let request = ChangeRequest::new(PROMPT, "/repo");
    let plan = create_plan(&request);
    let mut input = AnalysisInput::new(request, plan, agent, &WorkflowConfig::default());
    input.retry = RetryPolicy::new(2, 5);
    input
}

#[tokio::test]
async fn test_local_retry_recovers() {
    let orchestrator = orchestrator(
        ScriptedInvoker::new(vec![
            Step::Fail("connection reset".to_string()),
            Step::Reply(schema_payload().to_string()),
        ]),
        ScriptedFetch::offline(),
        WorkflowConfig::default(),
    );

    let result = orchestrator.analyze(input(local_agent())).await.unwrap();
    assert_eq!(result.status, AnalysisStatus::Success);
    assert_eq!(result.attempts(), Some(2));
    assert_eq!(result.artifacts.plan.summary, "Refresh the README");
    assert_eq!(result.repository.diffs.len(), 1);

    let kinds: Vec<TraceKind> = result.traces.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TraceKind::PromptSent,
            TraceKind::Error,
            TraceKind::RetryAttempted,
            TraceKind::PromptSent,
            TraceKind::ResponseReceived
        ]
    );
}

#[tokio::test]
async fn test_local_exhaustion_is_an_error() {
    let orchestrator = orchestrator(
        ScriptedInvoker::offline(),
        ScriptedFetch::offline(),
        WorkflowConfig::default(),
    );
    let err = orchestrator.analyze(input(local_agent())).await.unwrap_err();
    assert!(matches!(err, AppError::ProviderTransport(_)));
}

#[tokio::test]
async fn test_cloud_throwing_every_attempt_falls_back_to_heuristic_plan() {
    let fetch = ScriptedFetch::offline();
    let orchestrator = orchestrator(ScriptedInvoker::offline(), fetch, WorkflowConfig::default());

    let analysis = input(cloud_agent());
    let expected = create_plan(&analysis.request).step_signature();
    let result = orchestrator.analyze(analysis).await.unwrap();

    assert_eq!(result.status, AnalysisStatus::Fallback);
    assert_eq!(result.artifacts.plan.step_signature(), expected);
    assert!(result
        .errors
        .iter()
        .any(|e| e.contains("connection refused")));
}

#[tokio::test]
async fn test_cloud_fetch_receives_agent_key() {
    let fetch = Arc::new(ScriptedFetch::new(vec![Ok(ProviderFetchOutcome::success(
        schema_payload().to_string(),
    ))]));
    let git = FakeGit::new();
    let orchestrator = Orchestrator::new(
        Arc::new(git),
        Arc::new(ScriptedInvoker::offline()),
        fetch.clone(),
        WorkflowConfig::default(),
    );

    let result = orchestrator.analyze(input(cloud_agent())).await.unwrap();
    assert_eq!(result.status, AnalysisStatus::Success);

    let requests = fetch.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].agent.agent_id, "cloud");
    assert_eq!(requests[0].api_keys.get("openai").map(String::as_str), Some("sk-test"));
    assert!(requests[0].prompt.contains("## Request"));
    assert!(requests[0].prompt.contains(PROMPT));
}

#[tokio::test]
async fn test_timeout_names_stage_and_budget() {
    let orchestrator = orchestrator(
        ScriptedInvoker::new(vec![Step::Slow(500, "{}".to_string())]),
        ScriptedFetch::offline(),
        WorkflowConfig::default(),
    );
    let mut analysis = input(local_agent());
    analysis.retry = RetryPolicy::once();
    analysis.timeout_ms = Some(20);

    let err = orchestrator.analyze(analysis).await.unwrap_err();
    assert_eq!(err.to_string(), "Local model invocation timed out after 20ms");
}

#[tokio::test]
async fn test_cancelled_signal_aborts() {
    let invoker = ScriptedInvoker::replying("{}");
    let orchestrator = orchestrator(invoker, ScriptedFetch::offline(), WorkflowConfig::default());
    let analysis = input(local_agent());
    analysis.signal.cancel();

    let err = orchestrator.analyze(analysis).await.unwrap_err();
    assert!(matches!(err, AppError::Cancelled));
}

#[tokio::test]
async fn test_fenced_reply_round_trip() {
    let payload = schema_payload();
    let orchestrator = orchestrator(
        ScriptedInvoker::replying(&fenced(&payload)),
        ScriptedFetch::offline(),
        WorkflowConfig::default(),
    );

    let result = orchestrator.analyze(input(local_agent())).await.unwrap();
    let plan = &result.artifacts.plan;
    assert_eq!(result.status, AnalysisStatus::Success);
    assert_eq!(plan.summary, payload["plan"]["summary"]);
    assert_eq!(plan.intent, payload["plan"]["intent"]);
    assert_eq!(plan.steps.len(), 3);
    assert_eq!(result.artifacts.final_prompt, "Refined: update the README");
    assert_eq!(result.artifacts.patches.len(), 1);
    assert_eq!(result.artifacts.commits[0].message, "docs: refresh README");
    assert_eq!(
        result.artifacts.pull_request.as_ref().map(|pr| pr.title.as_str()),
        Some("Refresh README")
    );
    assert!(result.artifacts.raw_response.is_some());
}

#[tokio::test]
async fn test_streamed_reply_is_collected() {
    let orchestrator = orchestrator(
        ScriptedInvoker::new(vec![Step::Stream(vec![
            StreamEvent::chunk(r#"{"plan": "#),
            StreamEvent::chunk(r#"{"summary": "Streamed plan"}}"#),
        ])]),
        ScriptedFetch::offline(),
        WorkflowConfig::default(),
    );

    let result = orchestrator.analyze(input(local_agent())).await.unwrap();
    assert_eq!(result.status, AnalysisStatus::Success);
    assert_eq!(result.artifacts.plan.summary, "Streamed plan");
}

#[tokio::test]
async fn test_unparseable_reply_degrades_to_heuristic_plan() {
    let orchestrator = orchestrator(
        ScriptedInvoker::replying("I would start by reading the README."),
        ScriptedFetch::offline(),
        WorkflowConfig::default(),
    );

    let analysis = input(local_agent());
    let expected = analysis.fallback_plan.step_signature();
    let result = orchestrator.analyze(analysis).await.unwrap();

    assert_eq!(result.status, AnalysisStatus::Fallback);
    assert_eq!(result.artifacts.plan.step_signature(), expected);
    assert!(!result.errors.is_empty());
    assert_eq!(
        result.artifacts.raw_response.as_deref(),
        Some("I would start by reading the README.")
    );
}

#[tokio::test]
async fn test_cross_backend_failover() {
    let config = WorkflowConfig {
        cross_backend_failover: true,
        ..WorkflowConfig::default()
    };
    let orchestrator = orchestrator(
        ScriptedInvoker::offline(),
        ScriptedFetch::new(vec![Ok(ProviderFetchOutcome::success(
            schema_payload().to_string(),
        ))]),
        config,
    );
    let mut analysis = input(local_agent());
    analysis.fallback_agent = Some(cloud_agent());

    let result = orchestrator.analyze(analysis).await.unwrap();
    assert_eq!(result.status, AnalysisStatus::Success);
    assert!(result
        .errors
        .contains(&"Primary agent local failed; result produced by cloud".to_string()));

    let metadata = result.artifacts.provider_metadata.unwrap();
    let failover = &metadata.details.unwrap()["failover"];
    assert!(failover.is_object());
}

#[tokio::test]
async fn test_failover_disabled_by_config() {
    let orchestrator = orchestrator(
        ScriptedInvoker::offline(),
        ScriptedFetch::new(vec![Ok(ProviderFetchOutcome::success("{}"))]),
        WorkflowConfig::default(),
    );
    let mut analysis = input(local_agent());
    analysis.fallback_agent = Some(cloud_agent());

    assert!(orchestrator.analyze(analysis).await.is_err());
}

#[tokio::test]
async fn test_trace_sink_receives_events() {
    let seen: Arc<Mutex<Vec<TraceEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let orchestrator = orchestrator(
        ScriptedInvoker::replying("{}"),
        ScriptedFetch::offline(),
        WorkflowConfig::default(),
    );
    let mut analysis = input(local_agent());
    analysis.trace_sink = Some(Arc::new(move |events: &[TraceEvent]| {
        sink.lock().unwrap().extend_from_slice(events);
    }));

    let result = orchestrator.analyze(analysis).await.unwrap();
    let seen = seen.lock().unwrap();
    assert_eq!(*seen, result.traces);
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|t| t.agent_id == "local"));
}
