//! Trace Models
//!
//! Ordered events recorded while one analysis run talks to a backend.

use serde::{Deserialize, Serialize};

/// Kind of trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    PromptSent,
    ResponseReceived,
    RetryAttempted,
    Error,
}

/// A single trace entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    pub kind: TraceKind,
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    pub message: String,
    pub timestamp: String,
}
