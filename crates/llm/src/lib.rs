//! Changeflow LLM
//!
//! Backend seams used by the analysis pipeline:
//! - `ChatInvoker` for locally hosted model runtimes (single message or event stream)
//! - `ProviderFetch` for cloud providers reached through a fetch bridge
//!
//! No provider is implemented here; the crate only fixes the contracts and
//! the transport-independent stream collection.

pub mod provider;
pub mod stream;
pub mod types;

// Re-export main types
pub use provider::{missing_api_key_error, ChatInvoker, ProviderFetch};
pub use stream::collect_reply;
pub use types::*;
