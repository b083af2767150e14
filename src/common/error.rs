//! Error types for the harness
//!
//! Fatal errors name the precondition that failed (no scenarios, service
//! unreachable) so a broken run is diagnosable from its output alone.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Discovery Errors ===
    #[error("No scenarios found under '{}' (expected files ending in '{suffix}')", root.display())]
    NoScenariosFound { root: PathBuf, suffix: String },

    // === Service Lifecycle Errors ===
    #[error("Service did not start at {url} after {attempts} health probe(s) over {waited_ms} ms: {reason}")]
    ServiceDidNotStart {
        url: String,
        attempts: u32,
        waited_ms: u64,
        reason: String,
    },

    #[error("Service did not exit within the {0} second shutdown grace period")]
    ServiceShutdownTimeout(u64),

    #[error("Service executable '{name}' not found on PATH")]
    ExecutableNotFound { name: String },

    #[error("Failed to launch service: {0}")]
    LaunchFailed(#[source] io::Error),

    #[error("Cannot {action} while service is {state}")]
    InvalidState { action: String, state: String },

    // === Scenario Errors ===
    #[error("Scenario '{scenario}' timed out after {secs} seconds")]
    ScenarioTimeout { scenario: String, secs: u64 },

    #[error("Scenario engine failed to run '{scenario}': {message}")]
    EngineFailed { scenario: String, message: String },

    #[error("{failed} of {total} scenario(s) failed (seed {seed})")]
    SuiteFailed { failed: usize, total: usize, seed: u64 },

    // === Benchmark Errors ===
    #[error("Failed to write benchmark results to '{}': {source}", path.display())]
    RecorderWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === HTTP / Serialization Errors ===
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a service-did-not-start error
    pub fn did_not_start(url: &str, attempts: u32, waited_ms: u64, reason: &str) -> Self {
        Self::ServiceDidNotStart {
            url: url.to_string(),
            attempts,
            waited_ms,
            reason: reason.to_string(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(action: &str, state: &str) -> Self {
        Self::InvalidState {
            action: action.to_string(),
            state: state.to_string(),
        }
    }

    /// Whether this error must abort the whole suite
    ///
    /// Discovery and lifecycle failures are fatal; recorder and shutdown
    /// failures are recovered where they happen.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::ServiceShutdownTimeout(_) | Error::RecorderWrite { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_messages_name_the_precondition() {
        let err = Error::NoScenariosFound {
            root: PathBuf::from("/tmp/none"),
            suffix: ".feature".to_string(),
        };
        assert!(err.to_string().contains("No scenarios found"));
        assert!(err.is_fatal());

        let err = Error::did_not_start("http://localhost:4567", 3, 750, "health probe never returned 200");
        let msg = err.to_string();
        assert!(msg.contains("did not start"));
        assert!(msg.contains("http://localhost:4567"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(!Error::ServiceShutdownTimeout(5).is_fatal());
        let err = Error::RecorderWrite {
            path: PathBuf::from("out.csv"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_suite_failure_names_seed() {
        let err = Error::SuiteFailed {
            failed: 2,
            total: 9,
            seed: 12345,
        };
        assert_eq!(err.to_string(), "2 of 9 scenario(s) failed (seed 12345)");
    }
}
