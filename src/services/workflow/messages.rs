//! Source message lookup
//!
//! The coordinator resolves the chat message a request was queued from
//! through this seam; the chat store itself lives outside the pipeline.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::workflow::SourceMessage;

pub trait MessageLookup: Send + Sync {
    fn find_message(&self, id: &str) -> Option<SourceMessage>;
}

/// In-memory message store.
#[derive(Debug, Default)]
pub struct InMemoryMessages {
    messages: RwLock<HashMap<String, SourceMessage>>,
}

impl InMemoryMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, message: SourceMessage) {
        self.messages
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(message.id.clone(), message);
    }

    /// Builder pattern: add a user message
    pub fn with_user_message(self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(SourceMessage {
            id: id.into(),
            role: "user".to_string(),
            content: content.into(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            synthetic: false,
        });
        self
    }
}

impl MessageLookup for InMemoryMessages {
    fn find_message(&self, id: &str) -> Option<SourceMessage> {
        self.messages
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }
}
