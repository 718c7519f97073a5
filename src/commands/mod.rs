//! Commands
//!
//! Presentation-facing command handlers returning `CommandResponse`.

pub mod workflow;

pub use workflow::*;
