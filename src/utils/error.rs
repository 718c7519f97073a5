//! Error Handling
//!
//! Unified error types for the analysis pipeline.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use changeflow_core::CoreError;
use changeflow_llm::LlmError;

use crate::services::git::GitBridgeError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// No git/desktop bridge in this runtime (non-fatal to analysis)
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Repository context, status, or diff call failed
    #[error("Snapshot fetch failed: {0}")]
    SnapshotFetch(String),

    /// Network/auth/availability failure calling a model backend
    #[error("Provider transport error: {0}")]
    ProviderTransport(String),

    /// An attempt exceeded its configured time budget
    #[error("{stage} timed out after {timeout_ms}ms")]
    AnalysisTimeout { stage: String, timeout_ms: u64 },

    /// Model output did not match the artifact schema
    #[error("Parse error: {0}")]
    Parse(String),

    /// Agent selection found nothing usable
    #[error("No backend configured: {0}")]
    NoBackendConfigured(String),

    /// Git operation failed
    #[error("Git error: {0}")]
    Git(String),

    /// The analysis was aborted
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a provider transport error
    pub fn provider_transport(msg: impl Into<String>) -> Self {
        Self::ProviderTransport(msg.into())
    }

    /// Create a timeout error naming the stage that ran out of time
    pub fn timeout(stage: impl Into<String>, timeout_ms: u64) -> Self {
        Self::AnalysisTimeout {
            stage: stage.into(),
            timeout_ms,
        }
    }

    /// Create a git error
    pub fn git(msg: impl Into<String>) -> Self {
        Self::Git(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether another attempt against the same backend may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::ProviderTransport(_) | AppError::AnalysisTimeout { .. }
        )
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Cancelled => AppError::Cancelled,
            other => AppError::ProviderTransport(other.to_string()),
        }
    }
}

impl From<GitBridgeError> for AppError {
    fn from(err: GitBridgeError) -> Self {
        if err.is_unavailable() {
            AppError::BackendUnavailable(err.to_string())
        } else {
            AppError::Git(err.to_string())
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => AppError::Validation(msg),
            CoreError::Stream(msg) => AppError::ProviderTransport(msg),
        }
    }
}

/// Convert AppError to a string suitable for command responses
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
