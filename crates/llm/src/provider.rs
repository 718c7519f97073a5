//! Backend Traits
//!
//! The two narrow seams through which the pipeline reaches model backends.
//! Implementations live outside this workspace (desktop bridge, HTTP clients,
//! local runtimes); tests substitute in-memory fakes.

use async_trait::async_trait;

use super::types::{
    ChatReply, ChatRequest, LlmError, LlmResult, ProviderFetchOutcome, ProviderFetchRequest,
};

/// Chat invoker for a locally hosted model runtime.
///
/// May answer with a single message or an event stream; see
/// [`crate::stream::collect_reply`] for the aggregation rules.
#[async_trait]
pub trait ChatInvoker: Send + Sync {
    async fn invoke(&self, request: ChatRequest) -> LlmResult<ChatReply>;
}

/// Fetch bridge for cloud providers.
///
/// A `fallback` status means the bridge degraded on its own; the caller
/// decides whether to retry.
#[async_trait]
pub trait ProviderFetch: Send + Sync {
    async fn fetch(&self, request: ProviderFetchRequest) -> LlmResult<ProviderFetchOutcome>;
}

/// Helper function to create an error for a missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}
