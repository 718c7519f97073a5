//! Integration Tests Module
//!
//! End-to-end tests of the change-request pipeline over in-memory fakes of
//! the git bridge, the local model runtime and the cloud provider bridge.

// Shared fakes and payloads
mod fakes;

// Heuristic plan engine tests
mod plan_engine_test;

// Repository snapshot collection tests
mod snapshot_test;

// Orchestrator retry, fallback and normalization tests
mod orchestrator_test;

// Workflow coordinator tests
mod workflow_test;
