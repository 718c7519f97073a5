//! Orchestrator Service
//!
//! One analysis run: snapshot collection, prompt composition, provider
//! execution (with optional cross-backend failover) and normalization.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use changeflow_core::RetryPolicy;
use changeflow_llm::{ChatInvoker, ProviderFetch};

use super::failover::BackendFailover;
use super::gateway::{GatewayCall, ProviderGateway};
use super::normalizer::{decode_response, normalize};
use super::prompt::{compose_prompt, PromptInputs};
use super::trace::{TraceBuffer, TraceSink};
use crate::models::agent::{AgentDefinition, DegradationPolicy};
use crate::models::artifacts::{AnalysisArtifacts, AnalysisResult, AnalysisStatus};
use crate::models::change_request::ChangeRequest;
use crate::models::plan::Plan;
use crate::models::settings::WorkflowConfig;
use crate::services::git::GitBridge;
use crate::services::snapshot::{collect_repository_snapshot, SnapshotRequest};
use crate::utils::error::{AppError, AppResult};

/// Everything one analysis run needs. Agents are passed by value.
#[derive(Clone)]
pub struct AnalysisInput {
    pub request: ChangeRequest,
    /// Heuristic plan the provider output is merged onto
    pub fallback_plan: Plan,
    pub agent: AgentDefinition,
    pub fallback_agent: Option<AgentDefinition>,
    pub degradation_policy: DegradationPolicy,
    pub retry: RetryPolicy,
    pub timeout_ms: Option<u64>,
    pub instructions: Option<String>,
    pub additional_context: Option<String>,
    pub focus_paths: Vec<String>,
    pub api_keys: HashMap<String, String>,
    pub signal: CancellationToken,
    pub trace_sink: Option<TraceSink>,
}

impl AnalysisInput {
    /// Input with retry and timeout taken from `config`.
    pub fn new(
        request: ChangeRequest,
        fallback_plan: Plan,
        agent: AgentDefinition,
        config: &WorkflowConfig,
    ) -> Self {
        Self {
            request,
            fallback_plan,
            agent,
            fallback_agent: None,
            degradation_policy: DegradationPolicy::default(),
            retry: config.retry_policy(),
            timeout_ms: config.timeout_ms,
            instructions: None,
            additional_context: None,
            focus_paths: Vec::new(),
            api_keys: HashMap::new(),
            signal: CancellationToken::new(),
            trace_sink: None,
        }
    }
}

pub struct Orchestrator {
    git: Arc<dyn GitBridge>,
    gateway: ProviderGateway,
    config: WorkflowConfig,
}

impl Orchestrator {
    pub fn new(
        git: Arc<dyn GitBridge>,
        invoker: Arc<dyn ChatInvoker>,
        fetch: Arc<dyn ProviderFetch>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            git,
            gateway: ProviderGateway::new(invoker, fetch),
            config,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run one analysis.
    ///
    /// Returns `Err` when the run was cancelled or a local backend exhausted
    /// its retries. Every other failure degrades to a `fallback` result.
    pub async fn analyze(&self, input: AnalysisInput) -> AppResult<AnalysisResult> {
        let repository_path = input.request.context.repository_path.clone();
        info!(agent_id = %input.agent.id, path = %repository_path, "analysis started");

        let outcome = collect_repository_snapshot(
            self.git.as_ref(),
            SnapshotRequest {
                repository_path: &repository_path,
                plan: Some(&input.fallback_plan),
                focus_paths: input.focus_paths.clone(),
                max_diffs: Some(self.config.max_diff_count),
            },
        )
        .await;
        if input.signal.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        let snapshot = outcome.snapshot;
        let mut errors = outcome.errors;

        let instructions = input
            .instructions
            .as_deref()
            .or(self.config.project_instructions.as_deref());
        let prompt = compose_prompt(&PromptInputs {
            instructions,
            snapshot: &snapshot,
            additional_context: input.additional_context.as_deref(),
            request: &input.request.prompt,
            max_diff_excerpt_chars: self.config.max_diff_excerpt_chars,
        });

        let trace = TraceBuffer::new();
        let call = GatewayCall {
            prompt: prompt.clone(),
            system_prompt: Some(self.config.system_prompt.clone()),
            fallback_content: serde_json::to_string(&json!({ "plan": input.fallback_plan }))
                .unwrap_or_default(),
            api_keys: input.api_keys.clone(),
            retry: input.retry,
            timeout_ms: input.timeout_ms,
            signal: input.signal.clone(),
            trace: trace.clone(),
        };

        let failover = BackendFailover::from_settings(
            input.agent.clone(),
            input.fallback_agent.clone(),
            input.degradation_policy,
            self.config.cross_backend_failover,
        );
        let gateway = &self.gateway;
        let run = failover
            .run(|agent| {
                let call = call.clone();
                async move { gateway.execute(&agent, call).await }
            })
            .await;

        let traces = trace.flush(input.trace_sink.as_ref());
        let response = run.result?;

        if run.log.switched() {
            errors.push(format!(
                "Primary agent {} failed; result produced by {}",
                input.agent.id, run.agent_id
            ));
        }
        if response.status == AnalysisStatus::Fallback {
            if let Some(message) = &response.error_message {
                errors.push(message.clone());
            }
        }

        let mut metadata = response.metadata.clone();
        metadata.attempt = Some(response.attempts);
        if run.log.switched() {
            let mut details = metadata.details.take().unwrap_or_else(|| json!({}));
            if let Some(map) = details.as_object_mut() {
                map.insert(
                    "failover".to_string(),
                    serde_json::to_value(&run.log).unwrap_or_default(),
                );
            }
            metadata.details = Some(details);
        }

        let parsed = decode_response(&response.content)
            .map_err(|e| e.to_string())
            .and_then(|payload| {
                normalize(&payload, &input.fallback_plan, &metadata, &prompt)
                    .ok_or_else(|| "Provider response is not a JSON object".to_string())
            });

        let (status, artifacts) = match parsed {
            Ok(mut artifacts) => {
                artifacts.raw_response = Some(response.content.clone());
                (response.status, artifacts)
            }
            Err(message) => {
                warn!(agent_id = %run.agent_id, error = %message, "provider response could not be parsed");
                errors.push(message);
                let mut artifacts = AnalysisArtifacts::heuristic(prompt.clone(), input.fallback_plan.clone());
                artifacts.provider_metadata = Some(metadata);
                if !response.content.trim().is_empty() {
                    artifacts.raw_response = Some(response.content.clone());
                }
                (AnalysisStatus::Fallback, artifacts)
            }
        };

        info!(
            agent_id = %run.agent_id,
            %status,
            attempts = response.attempts,
            errors = errors.len(),
            "analysis finished"
        );

        Ok(AnalysisResult {
            status,
            artifacts,
            repository: snapshot,
            errors,
            traces,
        })
    }
}
