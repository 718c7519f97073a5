//! Settings Models
//!
//! Pipeline configuration stored in workflow.json.

use serde::{Deserialize, Serialize};

use changeflow_core::RetryPolicy;

use super::change_request::RiskLevel;

/// Default system prompt sent with every analysis call.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a careful repository change planner. \
Study the repository context, propose the smallest safe set of steps that fulfils the request, \
and answer strictly in the requested JSON format.";

/// Workflow pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Maximum number of per-file diffs collected into a snapshot
    #[serde(default = "default_max_diff_count")]
    pub max_diff_count: usize,
    /// Per-file diff excerpt budget inside the prompt (characters)
    #[serde(default = "default_max_diff_excerpt_chars")]
    pub max_diff_excerpt_chars: usize,
    /// Total attempts per backend call
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Fixed delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Per-attempt timeout in milliseconds (`None` disables the race)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: Option<u64>,
    /// System prompt sent with every analysis call
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Instructions prepended to every prompt when the project has none
    #[serde(default)]
    pub project_instructions: Option<String>,
    /// Switch from the primary to the fallback agent mid-analysis
    #[serde(default)]
    pub cross_backend_failover: bool,
    /// Risk level used when neither the caller nor the project names one
    #[serde(default)]
    pub default_risk_level: RiskLevel,
}

fn default_max_diff_count() -> usize {
    5
}

fn default_max_diff_excerpt_chars() -> usize {
    4000
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    750
}

fn default_timeout_ms() -> Option<u64> {
    Some(120_000)
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_diff_count: default_max_diff_count(),
            max_diff_excerpt_chars: default_max_diff_excerpt_chars(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
            system_prompt: default_system_prompt(),
            project_instructions: None,
            cross_backend_failover: false,
            default_risk_level: RiskLevel::default(),
        }
    }
}

impl WorkflowConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.retry_attempts == 0 {
            return Err("retry_attempts must be at least 1".to_string());
        }
        if self.max_diff_count == 0 {
            return Err("max_diff_count must be at least 1".to_string());
        }
        if self.timeout_ms == Some(0) {
            return Err("timeout_ms must be positive when set".to_string());
        }
        Ok(())
    }

    /// Retry policy built from the configured defaults.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, self.retry_delay_ms)
    }
}
