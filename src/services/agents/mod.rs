//! Agents
//!
//! Registry of configured AI backends and the selection policy over it.

pub mod registry;
pub mod selector;

pub use registry::{AgentRegistry, RegistryListener, SubscriptionId};
pub use selector::{select_agents, AgentSelection};
