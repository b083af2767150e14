//! Service Harness - conformance and load harness for a local REST service
//!
//! Starts the service under test behind a bounded health gate, runs scenario
//! files against it in a seeded, reproducible order and records resource
//! costs of bulk operations to a CSV log.

pub mod cli;
pub mod commands;
pub mod common;
pub mod perf;
pub mod scheduler;
pub mod service;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use scheduler::{OrderPolicy, RunSeed, ScenarioFile};
