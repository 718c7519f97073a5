//! Storage Layer
//!
//! Read-only JSON configuration. Runtime state is never persisted.

pub mod config;

pub use config::*;
