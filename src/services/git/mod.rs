//! Git Services
//!
//! The git command interface consumed by the pipeline and its CLI-backed
//! implementation.

pub mod bridge;
pub mod cli_bridge;
pub mod git_ops;

pub use bridge::{
    GitBridge, GitBridgeError, GitBridgeExt, GitBridgeResult, GitCommand, UnavailableGitBridge,
};
pub use cli_bridge::GitCliBridge;
pub use git_ops::GitOps;
