//! Data Models
//!
//! Serde-serializable types shared by services and commands.

pub mod agent;
pub mod artifacts;
pub mod change_request;
pub mod plan;
pub mod response;
pub mod settings;
pub mod snapshot;
pub mod trace;
pub mod workflow;

pub use agent::*;
pub use artifacts::*;
pub use change_request::*;
pub use plan::*;
pub use response::*;
pub use settings::*;
pub use snapshot::*;
pub use trace::*;
pub use workflow::*;
