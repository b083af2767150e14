//! Scenario execution engines
//!
//! The harness treats a scenario file as an opaque unit of work; an engine
//! is whatever knows how to execute one against the running service.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::ScenarioContext;
use crate::common::{Error, Result};
use crate::scheduler::ScenarioFile;

/// Result of executing one scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOutcome {
    pub passed: bool,
    pub detail: Option<String>,
}

impl ScenarioOutcome {
    pub fn passed() -> Self {
        Self {
            passed: true,
            detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: Some(detail.into()),
        }
    }
}

/// Executes one scenario at a time
#[async_trait]
pub trait ScenarioEngine: Send {
    /// Run `scenario` with its own context
    ///
    /// `Ok` with a failed outcome means the scenario ran and failed; `Err`
    /// means it could not be run at all. Neither stops the suite.
    async fn run(&mut self, scenario: &ScenarioFile, ctx: &mut ScenarioContext) -> Result<ScenarioOutcome>;
}

/// Runs an external program once per scenario file
///
/// The scenario path is passed as the last argument. The service address,
/// run seed and scenario path are exported as `HARNESS_BASE_URL`,
/// `HARNESS_SEED` and `HARNESS_SCENARIO`. Exit status 0 is a pass.
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    verbose: bool,
}

impl CommandEngine {
    /// Build from a command line: program followed by leading arguments
    pub fn new(command: &[String], timeout: Duration, verbose: bool) -> Result<Self> {
        let (program, args) = command.split_first().ok_or_else(|| {
            Error::Config("scenarios.engine must name a program to run scenarios with".to_string())
        })?;

        let program_path = PathBuf::from(program);
        let program = if program_path.components().count() > 1 {
            program_path
        } else {
            which::which(program).map_err(|_| {
                Error::Config(format!(
                    "Scenario engine '{}' not found on PATH. Set scenarios.engine in the config file",
                    program
                ))
            })?
        };

        Ok(Self {
            program,
            args: args.to_vec(),
            timeout,
            verbose,
        })
    }

    fn output(&self) -> Stdio {
        if self.verbose {
            Stdio::inherit()
        } else {
            Stdio::null()
        }
    }
}

#[async_trait]
impl ScenarioEngine for CommandEngine {
    async fn run(&mut self, scenario: &ScenarioFile, ctx: &mut ScenarioContext) -> Result<ScenarioOutcome> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(scenario.path())
            .env("HARNESS_BASE_URL", ctx.base_url())
            .env("HARNESS_SEED", ctx.seed().to_string())
            .env("HARNESS_SCENARIO", scenario.path())
            .stdin(Stdio::null())
            .stdout(self.output())
            .stderr(self.output())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::EngineFailed {
                scenario: scenario.to_string(),
                message: e.to_string(),
            })?;

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::debug!("Failed to kill timed-out scenario engine: {}", e);
                }
                return Err(Error::ScenarioTimeout {
                    scenario: scenario.name(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if status.success() {
            Ok(ScenarioOutcome::passed())
        } else {
            Ok(ScenarioOutcome::failed(format!(
                "engine exited with code {:?}",
                status.code()
            )))
        }
    }
}
