//! Agent Models
//!
//! Configured AI execution targets (cloud providers and local runtimes) and
//! the per-project preferences used to choose between them.

use serde::{Deserialize, Serialize};

use changeflow_llm::CloudTarget;

use super::change_request::RiskLevel;

/// Backend kind of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Cloud,
    Local,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentKind::Cloud => write!(f, "cloud"),
            AgentKind::Local => write!(f, "local"),
        }
    }
}

/// A configured AI execution target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    /// Unique identifier
    pub id: String,
    pub kind: AgentKind,
    /// Provider id (e.g. "openai", "ollama")
    pub provider: String,
    /// Model id (e.g. "gpt-4o", "llama3.1")
    pub model: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// API key for cloud agents; never serialized
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_active() -> bool {
    true
}

impl AgentDefinition {
    /// Create an active cloud agent
    pub fn cloud(
        id: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: AgentKind::Cloud,
            provider: provider.into(),
            model: model.into(),
            active: true,
            api_key,
        }
    }

    /// Create an active local agent
    pub fn local(
        id: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: AgentKind::Local,
            provider: provider.into(),
            model: model.into(),
            active: true,
            api_key: None,
        }
    }

    /// Builder pattern: set active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Cloud agents need a non-empty API key; local agents are always credentialed.
    pub fn has_valid_credentials(&self) -> bool {
        match self.kind {
            AgentKind::Local => true,
            AgentKind::Cloud => self
                .api_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty()),
        }
    }

    pub fn is_local(&self) -> bool {
        self.kind == AgentKind::Local
    }

    pub fn cloud_target(&self) -> CloudTarget {
        CloudTarget {
            agent_id: self.id.clone(),
            provider: self.provider.clone(),
            model: self.model.clone(),
        }
    }
}

/// Which backend kinds the orchestrator may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Auto,
    Cloud,
    Local,
}

impl ExecutionMode {
    pub fn allows(&self, kind: AgentKind) -> bool {
        match self {
            ExecutionMode::Auto => true,
            ExecutionMode::Cloud => kind == AgentKind::Cloud,
            ExecutionMode::Local => kind == AgentKind::Local,
        }
    }
}

/// Whether a failed primary backend triggers fallback to a secondary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DegradationPolicy {
    None,
    #[default]
    OnError,
}

/// Orchestrator preferences of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorPreferences {
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_model: Option<String>,
    /// Total attempts per backend; falls back to the workflow config when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    #[serde(default)]
    pub degradation_policy: DegradationPolicy,
}

/// Per-project preferences consumed by the workflow coordinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPreferences {
    /// Repository used when a request does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_dry_run: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_approval: Option<bool>,
    /// Project-specific instructions prepended to every prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default)]
    pub orchestrator: OrchestratorPreferences,
}
