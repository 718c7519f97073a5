//! Cross-Backend Failover
//!
//! Optional switch from the primary agent to the fallback agent when the
//! primary outcome is an error or a degraded response. Disabled unless the
//! workflow config opts in and the degradation policy is `on-error`.

use std::future::Future;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::gateway::GatewayResponse;
use crate::models::agent::{AgentDefinition, DegradationPolicy};
use crate::models::artifacts::AnalysisStatus;
use crate::utils::error::{AppError, AppResult};

/// Why a backend run produced no usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// No reachable backend behind the agent
    Unavailable,
    Timeout,
    /// Transport failure that outlived the gateway's retries
    Transport,
    /// The gateway settled on a fallback outcome
    Degraded,
    Cancelled,
    Other,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::Unavailable => "unavailable",
            FailureReason::Timeout => "timeout",
            FailureReason::Transport => "transport",
            FailureReason::Degraded => "degraded",
            FailureReason::Cancelled => "cancelled",
            FailureReason::Other => "other",
        }
    }

    /// Cancellation ends the run; every other failure may switch agents.
    pub fn should_fallback(self) -> bool {
        self != FailureReason::Cancelled
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&AppError> for FailureReason {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Cancelled => FailureReason::Cancelled,
            AppError::AnalysisTimeout { .. } => FailureReason::Timeout,
            AppError::BackendUnavailable(_) | AppError::NoBackendConfigured(_) => {
                FailureReason::Unavailable
            }
            AppError::ProviderTransport(_) => FailureReason::Transport,
            AppError::Parse(_) => FailureReason::Degraded,
            _ => FailureReason::Other,
        }
    }
}

/// Record of a single backend run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailoverAttempt {
    pub agent_id: String,
    pub success: bool,
    pub failure_reason: Option<FailureReason>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
    pub started_at: String,
}

/// Log of every backend run of one analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailoverLog {
    pub attempts: Vec<FailoverAttempt>,
    pub total_duration_ms: u64,
    pub successful_agent: Option<String>,
    pub overall_success: bool,
}

impl FailoverLog {
    pub fn add_attempt(&mut self, attempt: FailoverAttempt) {
        self.total_duration_ms += attempt.duration_ms;
        if attempt.success {
            self.successful_agent = Some(attempt.agent_id.clone());
            self.overall_success = true;
        }
        self.attempts.push(attempt);
    }

    pub fn switched(&self) -> bool {
        self.attempts.len() > 1
    }
}

/// Result of a failover run: the chosen outcome, its agent, and the log.
#[derive(Debug)]
pub struct FailoverOutcome {
    pub result: AppResult<GatewayResponse>,
    pub agent_id: String,
    pub log: FailoverLog,
}

/// Primary agent plus the fallback agent it may switch to.
#[derive(Debug, Clone)]
pub struct BackendFailover {
    primary: AgentDefinition,
    fallback: Option<AgentDefinition>,
}

impl BackendFailover {
    /// Runs only the primary agent.
    pub fn primary_only(primary: AgentDefinition) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    /// Keeps the fallback agent only when failover is enabled under `on-error`.
    pub fn from_settings(
        primary: AgentDefinition,
        fallback: Option<AgentDefinition>,
        policy: DegradationPolicy,
        enabled: bool,
    ) -> Self {
        let fallback = fallback.filter(|f| {
            enabled && policy == DegradationPolicy::OnError && f.id != primary.id
        });
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &AgentDefinition {
        &self.primary
    }

    pub fn fallback(&self) -> Option<&AgentDefinition> {
        self.fallback.as_ref()
    }

    /// Run `executor` against the primary, then against the fallback if the
    /// primary outcome failed for a reason that allows switching.
    ///
    /// The first successful outcome wins; otherwise the last degraded
    /// response, otherwise the last error.
    pub async fn run<F, Fut>(&self, mut executor: F) -> FailoverOutcome
    where
        F: FnMut(AgentDefinition) -> Fut,
        Fut: Future<Output = AppResult<GatewayResponse>>,
    {
        let mut log = FailoverLog::default();
        let mut degraded: Option<(GatewayResponse, String)> = None;
        let mut last_error: Option<(AppError, String)> = None;

        let chain = std::iter::once(&self.primary).chain(self.fallback.as_ref());
        for agent in chain {
            let started = Instant::now();
            let started_at = chrono::Utc::now().to_rfc3339();
            let result = executor(agent.clone()).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let reason = match &result {
                Ok(response) if response.status == AnalysisStatus::Success => None,
                Ok(_) => Some(FailureReason::Degraded),
                Err(e) => Some(FailureReason::from(e)),
            };

            log.add_attempt(FailoverAttempt {
                agent_id: agent.id.clone(),
                success: reason.is_none(),
                failure_reason: reason,
                error_message: match &result {
                    Ok(response) => response.error_message.clone(),
                    Err(e) => Some(e.to_string()),
                },
                duration_ms,
                started_at,
            });

            match result {
                Ok(response) if reason.is_none() => {
                    if log.switched() {
                        info!(agent_id = %agent.id, "fallback agent succeeded");
                    }
                    return FailoverOutcome {
                        result: Ok(response),
                        agent_id: agent.id.clone(),
                        log,
                    };
                }
                Ok(response) => degraded = Some((response, agent.id.clone())),
                Err(e) => last_error = Some((e, agent.id.clone())),
            }

            let Some(reason) = reason else { break };
            if !reason.should_fallback() {
                break;
            }
            if self.fallback.is_some() && agent.id == self.primary.id {
                warn!(agent_id = %agent.id, %reason, "primary agent failed, switching to fallback");
            }
        }

        let (result, agent_id) = match (degraded, last_error) {
            (Some((response, agent_id)), _) => (Ok(response), agent_id),
            (None, Some((err, agent_id))) => (Err(err), agent_id),
            (None, None) => (
                Err(AppError::internal("failover ran no agent")),
                self.primary.id.clone(),
            ),
        };
        FailoverOutcome {
            result,
            agent_id,
            log,
        }
    }
}
