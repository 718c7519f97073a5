//! Workflow
//!
//! Single-slot coordination of change-request analyses.

pub mod coordinator;
pub mod messages;

pub use coordinator::{QueueRequest, WorkflowCoordinator, WorkflowDeps};
pub use messages::{InMemoryMessages, MessageLookup};
