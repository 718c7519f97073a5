//! Services
//!
//! Business logic of the change-request pipeline.
//! Services are called by commands and by embedding applications.

pub mod agents;
pub mod git;
pub mod orchestrator;
pub mod plan_engine;
pub mod snapshot;
pub mod workflow;

pub use agents::{select_agents, AgentRegistry, AgentSelection};
pub use git::{GitBridge, GitBridgeExt, GitCliBridge};
pub use orchestrator::Orchestrator;
pub use plan_engine::create_plan;
pub use snapshot::collect_repository_snapshot;
pub use workflow::{MessageLookup, QueueRequest, WorkflowCoordinator, WorkflowDeps};
