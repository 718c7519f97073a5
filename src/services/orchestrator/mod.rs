//! Orchestrator
//!
//! Provider execution under retry, timeout and fallback discipline, plus
//! normalization of free-text model output into typed artifacts.

pub mod failover;
pub mod gateway;
pub mod normalizer;
pub mod prompt;
pub mod service;
pub mod trace;

pub use failover::{BackendFailover, FailoverLog, FailureReason};
pub use gateway::{GatewayCall, GatewayResponse, ProviderGateway};
pub use normalizer::{decode_response, normalize, ParseFailure};
pub use prompt::{compose_prompt, PromptInputs};
pub use service::{AnalysisInput, Orchestrator};
pub use trace::{TraceBuffer, TraceSink};
