//! Changeflow - Change-Request Analysis Library
//!
//! Turns a natural-language repository-change request into a reviewable plan.
//! It includes:
//! - A deterministic heuristic plan engine
//! - Repository snapshot collection through a git command bridge
//! - Provider orchestration with retry, timeout and fallback
//! - A single-slot workflow coordinator and its command surface
//! - Read-only JSON configuration

pub mod commands;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::response::*;
pub use models::settings::WorkflowConfig;
pub use services::workflow::{QueueRequest, WorkflowCoordinator, WorkflowDeps};
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
