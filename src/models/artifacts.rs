//! Analysis Artifact Models
//!
//! Typed artifact set produced by one analysis attempt: the plan plus
//! patches, commits, and an optional pull-request summary.

use serde::{Deserialize, Serialize};

use super::plan::Plan;
use super::snapshot::RepositorySnapshot;
use super::trace::TraceEvent;

/// Which backend produced an artifact and how the call went.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    pub provider_id: String,
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ProviderMetadata {
    pub fn new(provider_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model_id: model_id.into(),
            ..Default::default()
        }
    }
}

/// A proposed patch for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchArtifact {
    pub path: String,
    pub diff: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_metadata: Option<ProviderMetadata>,
}

/// A proposed commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitArtifact {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_metadata: Option<ProviderMetadata>,
}

/// A proposed pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestArtifact {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_metadata: Option<ProviderMetadata>,
}

/// Everything one analysis attempt produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisArtifacts {
    pub final_prompt: String,
    pub plan: Plan,
    #[serde(default)]
    pub patches: Vec<PatchArtifact>,
    #[serde(default)]
    pub commits: Vec<CommitArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_metadata: Option<ProviderMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl AnalysisArtifacts {
    /// Artifact set backed only by the heuristic plan.
    pub fn heuristic(final_prompt: impl Into<String>, plan: Plan) -> Self {
        Self {
            final_prompt: final_prompt.into(),
            plan,
            patches: Vec::new(),
            commits: Vec::new(),
            pull_request: None,
            provider_metadata: None,
            raw_response: None,
        }
    }
}

/// Outcome classification of an analysis attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Provider call succeeded and its output parsed into the artifact schema
    Success,
    /// Produced without, or despite failure of, a parseable provider response
    Fallback,
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisStatus::Success => write!(f, "success"),
            AnalysisStatus::Fallback => write!(f, "fallback"),
        }
    }
}

/// Result of one orchestrated analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub status: AnalysisStatus,
    pub artifacts: AnalysisArtifacts,
    pub repository: RepositorySnapshot,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub traces: Vec<TraceEvent>,
}

impl AnalysisResult {
    /// Number of transport attempts recorded in the provider metadata.
    pub fn attempts(&self) -> Option<u32> {
        self.artifacts
            .provider_metadata
            .as_ref()
            .and_then(|m| m.attempt)
    }
}
