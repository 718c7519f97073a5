//! Workflow Coordinator
//!
//! Owns the single workflow slot. Queuing a request publishes the heuristic
//! plan immediately, then runs one cancellable analysis whose outcome is
//! committed only if no newer request has superseded it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use changeflow_core::RetryPolicy;
use changeflow_llm::{ChatInvoker, ProviderFetch};

use super::messages::MessageLookup;
use crate::models::agent::ProjectPreferences;
use crate::models::change_request::{ChangeRequest, RequestContext, RiskLevel};
use crate::models::plan::Plan;
use crate::models::settings::WorkflowConfig;
use crate::models::trace::TraceEvent;
use crate::models::workflow::{SourceMessage, WorkflowRequest, WorkflowStatus};
use crate::services::agents::{select_agents, AgentRegistry};
use crate::services::git::{GitBridge, GitBridgeExt};
use crate::services::orchestrator::{AnalysisInput, Orchestrator, TraceSink};
use crate::services::plan_engine::create_plan;
use crate::utils::error::{AppError, AppResult};

const SHUT_DOWN: &str = "Coordinator shut down";

/// Collaborators of the coordinator.
pub struct WorkflowDeps {
    pub git: Arc<dyn GitBridge>,
    pub messages: Arc<dyn MessageLookup>,
    pub registry: Arc<AgentRegistry>,
    pub invoker: Arc<dyn ChatInvoker>,
    pub fetch: Arc<dyn ProviderFetch>,
    pub preferences: ProjectPreferences,
    pub config: WorkflowConfig,
    /// Provider id -> API key, forwarded to cloud fetches
    pub api_keys: HashMap<String, String>,
}

/// Arguments of `queue_request`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRequest {
    pub message_id: String,
    /// Explicit request text; overrides the message body when non-blank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
}

impl QueueRequest {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            ..Default::default()
        }
    }

    /// Builder pattern: set canonical code
    pub fn with_canonical_code(mut self, code: impl Into<String>) -> Self {
        self.canonical_code = Some(code.into());
        self
    }

    /// Builder pattern: set repository path
    pub fn with_repository(mut self, path: impl Into<String>) -> Self {
        self.repository_path = Some(path.into());
        self
    }
}

struct InFlight {
    generation: u64,
    token: CancellationToken,
}

struct Shared {
    git: Arc<dyn GitBridge>,
    messages: Arc<dyn MessageLookup>,
    registry: Arc<AgentRegistry>,
    orchestrator: Orchestrator,
    preferences: RwLock<ProjectPreferences>,
    api_keys: HashMap<String, String>,
    state: watch::Sender<Option<WorkflowRequest>>,
    generation: AtomicU64,
    in_flight: Mutex<Option<InFlight>>,
    /// Parent of every per-analysis token
    shutdown: CancellationToken,
}

impl Shared {
    /// Swap in the next version of request `id`. False if the slot moved on.
    fn commit<F>(&self, id: &str, next: F) -> bool
    where
        F: FnOnce(&WorkflowRequest) -> WorkflowRequest,
    {
        self.state.send_if_modified(|slot| match slot {
            Some(current) if current.id == id => {
                *current = next(current);
                true
            }
            _ => false,
        })
    }
}

/// Coordinates the single workflow slot. Cloning shares the slot.
#[derive(Clone)]
pub struct WorkflowCoordinator {
    shared: Arc<Shared>,
}

impl WorkflowCoordinator {
    pub fn new(deps: WorkflowDeps) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                orchestrator: Orchestrator::new(
                    deps.git.clone(),
                    deps.invoker,
                    deps.fetch,
                    deps.config,
                ),
                git: deps.git,
                messages: deps.messages,
                registry: deps.registry,
                preferences: RwLock::new(deps.preferences),
                api_keys: deps.api_keys,
                state,
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.shared.registry
    }

    pub fn preferences(&self) -> ProjectPreferences {
        self.shared
            .preferences
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the project preferences used by later requests.
    pub fn set_preferences(&self, preferences: ProjectPreferences) {
        *self
            .shared
            .preferences
            .write()
            .unwrap_or_else(|e| e.into_inner()) = preferences;
    }

    pub fn current_request(&self) -> Option<WorkflowRequest> {
        self.shared.state.borrow().clone()
    }

    /// Receiver observing every published state of the slot.
    pub fn subscribe(&self) -> watch::Receiver<Option<WorkflowRequest>> {
        self.shared.state.subscribe()
    }

    /// Queue a request for analysis.
    ///
    /// Returns the initially published request, or `None` when the effective
    /// prompt is blank (nothing is published in that case).
    pub async fn queue_request(&self, queued: QueueRequest) -> Option<WorkflowRequest> {
        let shared = &self.shared;
        let source = shared
            .messages
            .find_message(&queued.message_id)
            .unwrap_or_else(|| {
                debug!(message_id = %queued.message_id, "source message not found, using stand-in");
                SourceMessage::synthetic(queued.message_id.clone())
            });

        let Some(prompt) = effective_prompt(queued.canonical_code.as_deref(), &source.content)
        else {
            debug!(message_id = %queued.message_id, "empty prompt, nothing queued");
            return None;
        };

        let preferences = self.preferences();
        let config = shared.orchestrator.config();
        let request = build_change_request(prompt, &queued, &preferences, config);
        let plan = create_plan(&request);
        let selection = select_agents(&shared.registry.snapshot(), &preferences.orchestrator);

        let mut in_flight = shared.in_flight.lock().await;
        if let Some(previous) = in_flight.take() {
            debug!(generation = previous.generation, "superseding in-flight analysis");
            previous.token.cancel();
        }
        let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let now = chrono::Utc::now().to_rfc3339();
        let mut workflow = WorkflowRequest {
            id: Uuid::new_v4().to_string(),
            message_id: queued.message_id.clone(),
            source_message: source,
            change_request: request.clone(),
            status: WorkflowStatus::Analyzing,
            final_prompt: request.prompt.clone(),
            plan: plan.clone(),
            patches: Vec::new(),
            commits: Vec::new(),
            pull_request: None,
            provider_metadata: None,
            repository: None,
            traces: Vec::new(),
            analysis_errors: Vec::new(),
            primary_agent_id: selection.primary_id().map(str::to_string),
            fallback_agent_id: selection.fallback_id().map(str::to_string),
            created_at: now.clone(),
            updated_at: now,
        };

        if shared.shutdown.is_cancelled() {
            warn!(request_id = %workflow.id, "coordinator shut down, request not analysed");
            workflow.status = WorkflowStatus::Error;
            workflow.analysis_errors.push(SHUT_DOWN.to_string());
            shared.state.send_replace(Some(workflow.clone()));
            return Some(workflow);
        }

        let Some(agent) = selection.primary else {
            warn!(request_id = %workflow.id, mode = ?preferences.orchestrator.mode, "no usable agent");
            workflow.status = WorkflowStatus::Error;
            workflow.analysis_errors.push(
                AppError::NoBackendConfigured(
                    "no active agent with valid credentials matches the orchestrator preferences"
                        .to_string(),
                )
                .to_string(),
            );
            shared.state.send_replace(Some(workflow.clone()));
            return Some(workflow);
        };

        shared.state.send_replace(Some(workflow.clone()));
        let token = shared.shutdown.child_token();
        *in_flight = Some(InFlight {
            generation,
            token: token.clone(),
        });
        drop(in_flight);

        let orchestrator = &preferences.orchestrator;
        let mut input = AnalysisInput::new(request, plan, agent, config);
        input.fallback_agent = selection.fallback;
        input.degradation_policy = orchestrator.degradation_policy;
        input.retry = RetryPolicy::new(
            orchestrator.retry_limit.unwrap_or(config.retry_attempts),
            orchestrator.retry_delay_ms.unwrap_or(config.retry_delay_ms),
        );
        input.instructions = preferences.instructions.clone();
        input.api_keys = shared.api_keys.clone();
        input.signal = token.clone();
        input.trace_sink = Some(trace_logger(workflow.id.clone()));

        info!(
            request_id = %workflow.id,
            generation,
            agent_id = %input.agent.id,
            steps = workflow.plan.steps.len(),
            "workflow request queued"
        );

        tokio::spawn(run_analysis(
            shared.clone(),
            generation,
            token,
            workflow.id.clone(),
            workflow.plan.clone(),
            input,
        ));
        Some(workflow)
    }

    /// Wait until the slot is empty or holds a terminal request.
    pub async fn wait_for_settled(&self) -> Option<WorkflowRequest> {
        let mut receiver = self.shared.state.subscribe();
        let settled = receiver
            .wait_for(|slot| slot.as_ref().map_or(true, |r| r.status.is_terminal()))
            .await;
        settled.ok().and_then(|slot| (*slot).clone())
    }

    /// Cancel any in-flight analysis and empty the slot.
    pub async fn clear_request(&self) {
        let mut in_flight = self.shared.in_flight.lock().await;
        if let Some(previous) = in_flight.take() {
            previous.token.cancel();
        }
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.state.send_replace(None);
        debug!("workflow slot cleared");
    }

    /// Cancel every analysis, current and future.
    ///
    /// A request still analysing settles as `error`, and so does every
    /// request queued afterwards.
    pub fn shutdown(&self) {
        self.shared.shutdown.cancel();
    }

    pub fn set_dry_run(&self, enabled: bool) -> AppResult<WorkflowRequest> {
        self.update_current(|request| {
            request.plan.safeguards.set_dry_run(enabled);
            Ok(())
        })
    }

    pub fn set_manual_approval(&self, enabled: bool) -> AppResult<WorkflowRequest> {
        self.update_current(|request| {
            request.plan.safeguards.set_manual_approval(enabled);
            Ok(())
        })
    }

    /// Set (or clear with `None`) the approval of one plan step.
    pub fn set_step_approval(
        &self,
        step_id: &str,
        approved: Option<bool>,
    ) -> AppResult<WorkflowRequest> {
        self.update_current(|request| {
            if request.plan.set_step_approval(step_id, approved) {
                Ok(())
            } else {
                Err(AppError::not_found(format!("Plan step not found: {}", step_id)))
            }
        })
    }

    /// Pull the repository through the git bridge.
    ///
    /// A missing bridge yields a descriptive message instead of an error.
    pub async fn sync_repository(
        &self,
        repository_path: &str,
        remote: Option<String>,
        branch: Option<String>,
    ) -> AppResult<String> {
        if repository_path.trim().is_empty() {
            return Err(AppError::validation("Repository path is empty"));
        }

        match self.shared.git.pull(repository_path, remote, branch).await {
            Ok(summary) if summary.trim().is_empty() => Ok("Repository is up to date".to_string()),
            Ok(summary) => {
                info!(path = %repository_path, "repository synced");
                Ok(summary.trim().to_string())
            }
            Err(err) if err.is_unavailable() => {
                warn!(path = %repository_path, "git bridge unavailable, sync skipped");
                Ok(format!(
                    "Git bridge unavailable: {} was not synced",
                    repository_path
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_current<F>(&self, change: F) -> AppResult<WorkflowRequest>
    where
        F: FnOnce(&mut WorkflowRequest) -> AppResult<()>,
    {
        let mut outcome = Err(AppError::not_found("No workflow request is active"));
        self.shared.state.send_if_modified(|slot| {
            let Some(current) = slot.as_ref() else {
                return false;
            };
            let mut next = current.clone();
            match change(&mut next) {
                Ok(()) => {
                    next.updated_at = chrono::Utc::now().to_rfc3339();
                    outcome = Ok(next.clone());
                    *slot = Some(next);
                    true
                }
                Err(err) => {
                    outcome = Err(err);
                    false
                }
            }
        });
        outcome
    }
}

/// `baseline` is the plan published at queue time. Toggles made on the slot
/// since then are carried onto the analysed plan.
async fn run_analysis(
    shared: Arc<Shared>,
    generation: u64,
    token: CancellationToken,
    request_id: String,
    baseline: Plan,
    input: AnalysisInput,
) {
    let outcome = shared.orchestrator.analyze(input).await;

    let mut in_flight = shared.in_flight.lock().await;
    if !in_flight
        .as_ref()
        .is_some_and(|f| f.generation == generation)
    {
        debug!(%request_id, generation, "discarding superseded analysis result");
        return;
    }
    *in_flight = None;

    // Supersession and clearing move the generation on, so a cancelled token
    // that still holds the slot can only come from shutdown.
    let committed = match outcome {
        _ if token.is_cancelled() => {
            warn!(%request_id, "coordinator shut down during analysis");
            shared.commit(&request_id, |request| request.with_error(SHUT_DOWN))
        }
        Ok(result) => {
            let status = WorkflowStatus::from(result.status);
            info!(%request_id, %status, errors = result.errors.len(), "analysis committed");
            shared.commit(&request_id, |request| {
                let mut next = request.with_result(result);
                next.plan.carry_decisions(&baseline, &request.plan);
                next
            })
        }
        Err(err) => {
            warn!(%request_id, error = %err, "analysis failed");
            shared.commit(&request_id, |request| request.with_error(err.to_string()))
        }
    };
    if !committed {
        debug!(%request_id, "workflow slot changed before commit");
    }
}

fn trace_logger(request_id: String) -> TraceSink {
    Arc::new(move |events: &[TraceEvent]| {
        debug!(%request_id, events = events.len(), "analysis trace flushed");
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Canonical code when non-blank, else the message body.
fn effective_prompt(canonical_code: Option<&str>, body: &str) -> Option<String> {
    non_blank(canonical_code).or_else(|| non_blank(Some(body)))
}

fn build_change_request(
    prompt: String,
    queued: &QueueRequest,
    preferences: &ProjectPreferences,
    config: &WorkflowConfig,
) -> ChangeRequest {
    let repository_path = non_blank(queued.repository_path.as_deref())
        .or_else(|| non_blank(preferences.repository_path.as_deref()))
        .unwrap_or_default();
    let branch = non_blank(queued.branch.as_deref())
        .or_else(|| non_blank(preferences.default_branch.as_deref()));

    ChangeRequest {
        prompt,
        context: RequestContext {
            repository_path,
            branch,
            actor: preferences.actor.clone(),
            risk_level: queued
                .risk_level
                .or(preferences.default_risk_level)
                .unwrap_or(config.default_risk_level),
        },
        prefer_dry_run: preferences.prefer_dry_run,
        require_approval: preferences.require_approval,
    }
}
