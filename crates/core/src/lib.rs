//! Changeflow Core
//!
//! Foundational types for the changeflow workspace. This crate has zero
//! dependencies on application-level code (git bridge, model backends, etc.).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `streaming` - Stream event union and its pure reducer
//! - `retry` - Retry policy value object shared by every backend kind

pub mod error;
pub mod retry;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Retry Policy ───────────────────────────────────────────────────────
pub use retry::RetryPolicy;

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{StreamAggregator, StreamControl, StreamEvent};
