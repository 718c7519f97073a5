//! LLM Types
//!
//! Request, reply, and error types for the two backend seams: the local chat
//! invoker and the cloud provider fetch bridge.

use std::collections::HashMap;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use changeflow_core::streaming::StreamEvent;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single complete chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Request sent to a local model runtime.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Model identifier understood by the runtime
    pub model: Option<String>,
    /// Ask the runtime for an event stream instead of a single message
    pub stream: bool,
    /// Abort signal for the in-flight call
    pub signal: Option<CancellationToken>,
}

/// Reply from a local model runtime: either one message or a stream of events.
pub enum ChatReply {
    Message(ChatMessage),
    Stream(BoxStream<'static, StreamEvent>),
}

impl std::fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatReply::Message(message) => f.debug_tuple("Message").field(message).finish(),
            ChatReply::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Identity of the cloud agent a fetch is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudTarget {
    pub agent_id: String,
    pub provider: String,
    pub model: String,
}

/// Request handed to the cloud provider bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFetchRequest {
    pub agent: CloudTarget,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Provider id -> API key
    #[serde(default, skip_serializing)]
    pub api_keys: HashMap<String, String>,
    /// Content the bridge reports back when it has to degrade
    pub fallback: String,
}

/// Transport-level outcome reported by the cloud bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Success,
    Fallback,
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchStatus::Success => write!(f, "success"),
            FetchStatus::Fallback => write!(f, "fallback"),
        }
    }
}

/// Response from the cloud provider bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFetchOutcome {
    pub content: String,
    pub status: FetchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ProviderFetchOutcome {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: FetchStatus::Success,
            error_message: None,
        }
    }

    pub fn fallback(content: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: FetchStatus::Fallback,
            error_message: Some(error_message.into()),
        }
    }
}

/// LLM backend error types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed (invalid or missing API key)
    AuthenticationFailed { message: String },
    /// Rate limit exceeded
    RateLimited { message: String },
    /// Network/connection error
    NetworkError { message: String },
    /// Backend not reachable (e.g. local runtime not running)
    ProviderUnavailable { message: String },
    /// A streamed reply emitted an error event
    StreamFailed { message: String },
    /// The call was aborted through its signal
    Cancelled,
    /// Other error
    Other { message: String },
}

impl LlmError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether retrying the same backend can plausibly help.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            LlmError::AuthenticationFailed { .. } | LlmError::Cancelled
        )
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message } => {
                write!(f, "Rate limited: {}", message)
            }
            LlmError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            LlmError::ProviderUnavailable { message } => {
                write!(f, "Provider unavailable: {}", message)
            }
            LlmError::StreamFailed { message } => {
                write!(f, "Stream failed: {}", message)
            }
            LlmError::Cancelled => write!(f, "Request cancelled"),
            LlmError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
