//! Scenario execution
//!
//! Runs the ordered scenario list against the service under test. Each
//! scenario gets its own [`ScenarioContext`]; nothing is shared between
//! scenarios except the service itself.

mod context;
mod engine;
mod runner;

pub use context::{RecordedRequest, RecordedResponse, ScenarioContext};
pub use engine::{CommandEngine, ScenarioEngine, ScenarioOutcome};
pub use runner::{run_suite, ScenarioResult, SuitePlan, SuiteReport};
