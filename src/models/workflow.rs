//! Workflow Request Models
//!
//! A workflow request links one source chat message to one analysis attempt
//! and carries the evolving artifacts of that attempt.

use serde::{Deserialize, Serialize};

use super::artifacts::{
    AnalysisResult, AnalysisStatus, CommitArtifact, PatchArtifact, ProviderMetadata,
    PullRequestArtifact,
};
use super::change_request::ChangeRequest;
use super::plan::Plan;
use super::snapshot::RepositorySnapshot;
use super::trace::TraceEvent;

/// Execution status of a workflow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Analysis in flight
    Analyzing,
    /// Provider-enriched artifacts are ready
    Ready,
    /// Heuristic artifacts only (provider or parse fallback)
    Fallback,
    /// No backend, or the backend failed outright
    Error,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowStatus::Analyzing)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::Analyzing => write!(f, "analyzing"),
            WorkflowStatus::Ready => write!(f, "ready"),
            WorkflowStatus::Fallback => write!(f, "fallback"),
            WorkflowStatus::Error => write!(f, "error"),
        }
    }
}

impl From<AnalysisStatus> for WorkflowStatus {
    fn from(status: AnalysisStatus) -> Self {
        match status {
            AnalysisStatus::Success => WorkflowStatus::Ready,
            AnalysisStatus::Fallback => WorkflowStatus::Fallback,
        }
    }
}

/// The chat message a workflow request was created from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// True when the message could not be found and a stand-in was used
    #[serde(default)]
    pub synthetic: bool,
}

impl SourceMessage {
    /// Stand-in for a message the lookup could not resolve.
    pub fn synthetic(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: "user".to_string(),
            content: String::new(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            synthetic: true,
        }
    }
}

/// One analysis attempt tied to a source message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRequest {
    pub id: String,
    pub message_id: String,
    pub source_message: SourceMessage,
    pub change_request: ChangeRequest,
    pub status: WorkflowStatus,
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
    pub repository: Option<RepositorySnapshot>,
    #[serde(default)]
    pub traces: Vec<TraceEvent>,
    #[serde(default)]
    pub analysis_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_agent_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl WorkflowRequest {
    /// Copy of this request carrying the outcome of a finished analysis.
    pub fn with_result(&self, result: AnalysisResult) -> Self {
        let mut next = self.clone();
        next.status = result.status.into();
        next.final_prompt = result.artifacts.final_prompt;
        next.plan = result.artifacts.plan;
        next.patches = result.artifacts.patches;
        next.commits = result.artifacts.commits;
        next.pull_request = result.artifacts.pull_request;
        next.provider_metadata = result.artifacts.provider_metadata;
        next.repository = Some(result.repository);
        next.traces = result.traces;
        next.analysis_errors = result.errors;
        next.updated_at = chrono::Utc::now().to_rfc3339();
        next
    }

    /// Copy of this request marked as failed, keeping the heuristic plan.
    pub fn with_error(&self, error: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.status = WorkflowStatus::Error;
        next.analysis_errors.push(error.into());
        next.updated_at = chrono::Utc::now().to_rfc3339();
        next
    }
}
