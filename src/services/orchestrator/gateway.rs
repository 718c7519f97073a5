//! Provider Gateway
//!
//! Executes one analysis turn against a single backend. Each attempt is raced
//! against the configured timeout and the run's cancellation token; failed
//! attempts are retried sequentially after a fixed delay.
//!
//! A timed-out attempt is abandoned, not aborted: a transport without native
//! cancellation may keep running in the background until it resolves.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use changeflow_core::RetryPolicy;
use changeflow_llm::{
    collect_reply, ChatInvoker, ChatRequest, FetchStatus, LlmError, ProviderFetch,
    ProviderFetchOutcome, ProviderFetchRequest,
};

use super::trace::TraceBuffer;
use crate::models::agent::{AgentDefinition, AgentKind};
use crate::models::artifacts::{AnalysisStatus, ProviderMetadata};
use crate::models::trace::TraceKind;
use crate::utils::error::{AppError, AppResult};

pub const LOCAL_STAGE: &str = "Local model invocation";
pub const CLOUD_STAGE: &str = "Cloud provider request";

/// One provider call.
#[derive(Debug, Clone)]
pub struct GatewayCall {
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Content the cloud bridge answers with when it degrades
    pub fallback_content: String,
    pub api_keys: HashMap<String, String>,
    pub retry: RetryPolicy,
    pub timeout_ms: Option<u64>,
    pub signal: CancellationToken,
    pub trace: TraceBuffer,
}

/// Outcome of a provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub content: String,
    pub status: AnalysisStatus,
    pub attempts: u32,
    pub metadata: ProviderMetadata,
    pub error_message: Option<String>,
}

pub struct ProviderGateway {
    invoker: Arc<dyn ChatInvoker>,
    fetch: Arc<dyn ProviderFetch>,
}

impl ProviderGateway {
    pub fn new(invoker: Arc<dyn ChatInvoker>, fetch: Arc<dyn ProviderFetch>) -> Self {
        Self { invoker, fetch }
    }

    /// Run the call against `agent`.
    ///
    /// Local agents return `Err` once every attempt failed. Cloud agents
    /// return the last fallback outcome instead, synthesised from the last
    /// error when every attempt failed outright.
    pub async fn execute(&self, agent: &AgentDefinition, call: GatewayCall) -> AppResult<GatewayResponse> {
        match agent.kind {
            AgentKind::Local => self.execute_local(agent, &call).await,
            AgentKind::Cloud => self.execute_cloud(agent, &call).await,
        }
    }

    async fn execute_local(&self, agent: &AgentDefinition, call: &GatewayCall) -> AppResult<GatewayResponse> {
        let max_attempts = call.retry.max_attempts();
        let mut last_error = AppError::provider_transport("no attempt was made");

        for attempt in 1..=max_attempts {
            call.trace.record(
                TraceKind::PromptSent,
                &agent.id,
                Some(attempt),
                format!("Prompt sent to {}/{}", agent.provider, agent.model),
            );
            let started = Instant::now();

            let request = ChatRequest {
                prompt: call.prompt.clone(),
                system_prompt: call.system_prompt.clone(),
                model: Some(agent.model.clone()),
                stream: true,
                signal: Some(call.signal.clone()),
            };
            let invoker = self.invoker.clone();
            let signal = call.signal.clone();
            let attempt_future = async move {
                let reply = invoker.invoke(request).await?;
                collect_reply(reply, Some(&signal)).await
            };

            match race(attempt_future, call.timeout_ms, LOCAL_STAGE, &call.signal).await {
                Ok(content) => {
                    call.trace.record(
                        TraceKind::ResponseReceived,
                        &agent.id,
                        Some(attempt),
                        format!("Received {} characters", content.len()),
                    );
                    debug!(agent_id = %agent.id, attempt, "local model responded");
                    return Ok(GatewayResponse {
                        content,
                        status: AnalysisStatus::Success,
                        attempts: attempt,
                        metadata: attempt_metadata(agent, attempt, started),
                        error_message: None,
                    });
                }
                Err(AppError::Cancelled) => return Err(AppError::Cancelled),
                Err(e) => {
                    call.trace
                        .record(TraceKind::Error, &agent.id, Some(attempt), e.to_string());
                    warn!(agent_id = %agent.id, attempt, error = %e, "local model attempt failed");
                    last_error = e;
                }
            }

            if call.retry.has_next(attempt) {
                retry_pause(agent, attempt, call).await?;
            }
        }

        Err(last_error)
    }

    async fn execute_cloud(&self, agent: &AgentDefinition, call: &GatewayCall) -> AppResult<GatewayResponse> {
        let max_attempts = call.retry.max_attempts();
        let mut api_keys = call.api_keys.clone();
        if let Some(key) = agent.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            api_keys.insert(agent.provider.clone(), key.clone());
        }

        let mut last_fallback: Option<(ProviderFetchOutcome, u32, Instant)> = None;
        let mut last_error: Option<AppError> = None;
        let mut started = Instant::now();

        for attempt in 1..=max_attempts {
            call.trace.record(
                TraceKind::PromptSent,
                &agent.id,
                Some(attempt),
                format!("Prompt sent to {}/{}", agent.provider, agent.model),
            );
            started = Instant::now();

            let request = ProviderFetchRequest {
                agent: agent.cloud_target(),
                prompt: call.prompt.clone(),
                system_prompt: call.system_prompt.clone(),
                api_keys: api_keys.clone(),
                fallback: call.fallback_content.clone(),
            };
            let fetch = self.fetch.clone();
            let attempt_future = async move { fetch.fetch(request).await };

            match race(attempt_future, call.timeout_ms, CLOUD_STAGE, &call.signal).await {
                Ok(outcome) if outcome.status == FetchStatus::Success => {
                    call.trace.record(
                        TraceKind::ResponseReceived,
                        &agent.id,
                        Some(attempt),
                        format!("Received {} characters", outcome.content.len()),
                    );
                    debug!(agent_id = %agent.id, attempt, "cloud provider responded");
                    return Ok(GatewayResponse {
                        content: outcome.content,
                        status: AnalysisStatus::Success,
                        attempts: attempt,
                        metadata: attempt_metadata(agent, attempt, started),
                        error_message: None,
                    });
                }
                Ok(outcome) => {
                    let message = outcome
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "Provider returned a fallback response".to_string());
                    call.trace
                        .record(TraceKind::Error, &agent.id, Some(attempt), message.clone());
                    warn!(agent_id = %agent.id, attempt, error = %message, "cloud provider degraded");
                    last_fallback = Some((outcome, attempt, started));
                }
                Err(AppError::Cancelled) => return Err(AppError::Cancelled),
                Err(e) => {
                    call.trace
                        .record(TraceKind::Error, &agent.id, Some(attempt), e.to_string());
                    warn!(agent_id = %agent.id, attempt, error = %e, "cloud provider attempt failed");
                    last_error = Some(e);
                }
            }

            if call.retry.has_next(attempt) {
                retry_pause(agent, attempt, call).await?;
            }
        }

        if let Some((outcome, attempt, started)) = last_fallback {
            let mut metadata = attempt_metadata(agent, attempt, started);
            metadata.attempt = Some(max_attempts);
            return Ok(GatewayResponse {
                content: outcome.content,
                status: AnalysisStatus::Fallback,
                attempts: max_attempts,
                metadata,
                error_message: outcome
                    .error_message
                    .or_else(|| last_error.map(|e| e.to_string())),
            });
        }

        let error_message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Cloud provider returned no response".to_string());
        Ok(GatewayResponse {
            content: call.fallback_content.clone(),
            status: AnalysisStatus::Fallback,
            attempts: max_attempts,
            metadata: attempt_metadata(agent, max_attempts, started),
            error_message: Some(error_message),
        })
    }
}

/// Race `future` against the optional timeout and the cancellation token.
async fn race<F, T>(future: F, timeout_ms: Option<u64>, stage: &str, signal: &CancellationToken) -> AppResult<T>
where
    F: Future<Output = Result<T, LlmError>>,
{
    let timed = async {
        match timeout_ms {
            Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), future).await {
                Ok(result) => result.map_err(AppError::from),
                Err(_) => Err(AppError::timeout(stage, ms)),
            },
            None => future.await.map_err(AppError::from),
        }
    };

    tokio::select! {
        _ = signal.cancelled() => Err(AppError::Cancelled),
        result = timed => result,
    }
}

/// Record the retry and wait the fixed delay, aborting on cancellation.
async fn retry_pause(agent: &AgentDefinition, attempt: u32, call: &GatewayCall) -> AppResult<()> {
    call.trace.record(
        TraceKind::RetryAttempted,
        &agent.id,
        Some(attempt + 1),
        format!("Retrying in {}ms", call.retry.delay_ms),
    );
    debug!(agent_id = %agent.id, next_attempt = attempt + 1, "retrying provider call");

    tokio::select! {
        _ = call.signal.cancelled() => Err(AppError::Cancelled),
        _ = tokio::time::sleep(call.retry.delay()) => Ok(()),
    }
}

fn attempt_metadata(agent: &AgentDefinition, attempt: u32, started: Instant) -> ProviderMetadata {
    ProviderMetadata {
        provider_id: agent.provider.clone(),
        model_id: agent.model.clone(),
        latency_ms: Some(started.elapsed().as_millis() as u64),
        attempt: Some(attempt),
        cost: None,
        timestamp: Some(chrono::Utc::now().to_rfc3339()),
        details: Some(json!({ "agentId": agent.id, "kind": agent.kind })),
    }
}
