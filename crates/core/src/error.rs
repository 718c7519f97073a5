//! Core Error Types
//!
//! Defines the foundational error types used across the changeflow workspace.
//! These error types depend only on thiserror to keep the core crate
//! lightweight.
//!
//! The main crate extends these with the analysis taxonomy (backend
//! unavailable, provider transport, timeouts, and so on).

use thiserror::Error;

/// Core error type for the changeflow workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A streamed reply reported an error event
    #[error("Stream error: {0}")]
    Stream(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
