//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};
use crate::scheduler::OrderPolicy;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Service under test
    #[serde(default)]
    pub service: ServiceConfig,

    /// Scenario discovery and ordering
    #[serde(default)]
    pub scenarios: ScenarioConfig,

    /// Benchmark workloads
    #[serde(default)]
    pub bench: BenchConfig,
}

/// How to launch, probe and stop the service under test
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Executable to launch (resolved on PATH if not a path)
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Arguments passed to the executable
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Base address the service listens on
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Endpoint that returns 200 once the service is ready
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Endpoint that makes the service exit
    #[serde(default = "default_shutdown_path")]
    pub shutdown_path: String,

    /// Maximum number of health probes after launch
    #[serde(default = "default_health_attempts")]
    pub health_attempts: u32,

    /// Fixed delay between health probes
    #[serde(default = "default_health_interval")]
    pub health_interval_ms: u64,

    /// Upper bound on the whole health-gate wait
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,

    /// Time allowed for a graceful exit before the process is killed
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Let the service write to our stdout/stderr instead of discarding it
    #[serde(default)]
    pub inherit_output: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            args: default_args(),
            base_url: default_base_url(),
            health_path: default_health_path(),
            shutdown_path: default_shutdown_path(),
            health_attempts: default_health_attempts(),
            health_interval_ms: default_health_interval(),
            max_wait_secs: default_max_wait(),
            shutdown_grace_secs: default_shutdown_grace(),
            inherit_output: false,
        }
    }
}

impl ServiceConfig {
    /// Full URL of the health endpoint
    pub fn health_url(&self) -> String {
        join_url(&self.base_url, &self.health_path)
    }

    /// Full URL of the shutdown endpoint
    pub fn shutdown_url(&self) -> String {
        join_url(&self.base_url, &self.shutdown_path)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn default_executable() -> String {
    "java".to_string()
}
fn default_args() -> Vec<String> {
    vec!["-jar".to_string(), "runTodoManagerRestAPI-1.5.5.jar".to_string()]
}
fn default_base_url() -> String {
    "http://localhost:4567".to_string()
}
fn default_health_path() -> String {
    "/".to_string()
}
fn default_shutdown_path() -> String {
    "/shutdown".to_string()
}
fn default_health_attempts() -> u32 {
    40
}
fn default_health_interval() -> u64 {
    250
}
fn default_max_wait() -> u64 {
    15
}
fn default_shutdown_grace() -> u64 {
    5
}

/// Scenario discovery and ordering settings
#[derive(Debug, Deserialize, Clone)]
pub struct ScenarioConfig {
    /// Directory searched recursively for scenario files
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// File-name suffix identifying a scenario file
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Seed for the run order
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Whether scenarios are shuffled or run in path order
    #[serde(default)]
    pub order: OrderPolicy,

    /// Per-scenario time limit
    #[serde(default = "default_scenario_timeout")]
    pub timeout_secs: u64,

    /// Engine program plus leading arguments; the scenario path is appended
    #[serde(default = "default_engine")]
    pub engine: Vec<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            suffix: default_suffix(),
            seed: default_seed(),
            order: OrderPolicy::default(),
            timeout_secs: default_scenario_timeout(),
            engine: default_engine(),
        }
    }
}

impl ScenarioConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("scenarios")
}
fn default_suffix() -> String {
    ".feature".to_string()
}
fn default_seed() -> u64 {
    12345
}
fn default_scenario_timeout() -> u64 {
    300
}
fn default_engine() -> Vec<String> {
    vec!["cucumber-runner".to_string()]
}

/// Benchmark workload settings
#[derive(Debug, Deserialize, Clone)]
pub struct BenchConfig {
    /// CSV file receiving benchmark rows
    #[serde(default = "default_results_file")]
    pub results_file: PathBuf,

    /// Collection endpoint exercised by the workloads (e.g. "projects")
    #[serde(default = "default_resource")]
    pub resource: String,

    /// Number of objects per measured burst
    #[serde(default = "default_load_sizes")]
    pub load_sizes: Vec<usize>,

    /// Length of the CPU sampling window before and after a burst
    #[serde(default = "default_sample_window")]
    pub sample_window_ms: u64,

    /// Delay between CPU readings inside a window
    #[serde(default = "default_sample_interval")]
    pub sample_interval_ms: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            results_file: default_results_file(),
            resource: default_resource(),
            load_sizes: default_load_sizes(),
            sample_window_ms: default_sample_window(),
            sample_interval_ms: default_sample_interval(),
        }
    }
}

impl BenchConfig {
    pub fn sample_window(&self) -> Duration {
        Duration::from_millis(self.sample_window_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

fn default_results_file() -> PathBuf {
    PathBuf::from("benchmark_results.csv")
}
fn default_resource() -> String {
    "projects".to_string()
}
fn default_load_sizes() -> Vec<usize> {
    vec![1, 200, 400, 600, 800, 1000, 1200]
}
fn default_sample_window() -> u64 {
    1000
}
fn default_sample_interval() -> u64 {
    10
}

impl Config {
    /// Load configuration from `path`, or from the default config file
    ///
    /// Returns default configuration if no file exists at the default
    /// location. An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Reject settings that would make a bounded wait unbounded or empty
    pub fn validate(&self) -> Result<()> {
        if self.service.executable.trim().is_empty() {
            return Err(Error::Config("service.executable must not be empty".to_string()));
        }
        if self.service.health_attempts == 0 {
            return Err(Error::Config("service.health_attempts must be at least 1".to_string()));
        }
        if self.service.health_interval_ms == 0 {
            return Err(Error::Config("service.health_interval_ms must be positive".to_string()));
        }
        if self.scenarios.suffix.is_empty() {
            return Err(Error::Config("scenarios.suffix must not be empty".to_string()));
        }
        if self.bench.load_sizes.is_empty() {
            return Err(Error::Config("bench.load_sizes must not be empty".to_string()));
        }
        if self.bench.sample_interval_ms == 0 {
            return Err(Error::Config("bench.sample_interval_ms must be positive".to_string()));
        }
        Ok(())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_local_service() {
        let config = Config::default();
        assert_eq!(config.service.base_url, "http://localhost:4567");
        assert_eq!(config.service.health_url(), "http://localhost:4567/");
        assert_eq!(config.service.shutdown_url(), "http://localhost:4567/shutdown");
        assert_eq!(config.scenarios.seed, 12345);
        assert_eq!(config.scenarios.suffix, ".feature");
        assert_eq!(config.bench.load_sizes, vec![1, 200, 400, 600, 800, 1000, 1200]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [service]
            base_url = "http://127.0.0.1:9000/"
            health_attempts = 4

            [scenarios]
            order = "sorted"
            "#,
        )
        .unwrap();
        assert_eq!(config.service.health_attempts, 4);
        assert_eq!(config.service.health_url(), "http://127.0.0.1:9000/");
        assert_eq!(config.service.shutdown_path, "/shutdown");
        assert_eq!(config.scenarios.order, OrderPolicy::Sorted);
        assert_eq!(config.bench.resource, "projects");
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let err = Config::from_toml("[service]\nhealth_attempts = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = Config::from_toml("[service\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/harness.toml"))).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
