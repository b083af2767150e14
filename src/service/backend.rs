//! Service backends
//!
//! A backend knows how to launch the service, probe it, ask it to exit and
//! kill it. It does not decide when; that is the controller's job.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::common::config::ServiceConfig;
use crate::common::{Error, Result};

/// Time allowed for one health or shutdown request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Time a terminated process gets before it is killed outright
#[cfg(unix)]
const TERM_WAIT: Duration = Duration::from_millis(500);

/// Operations the lifecycle controller drives
#[async_trait]
pub trait ServiceBackend: Send {
    /// Address used in diagnostics
    fn endpoint(&self) -> &str;

    /// Launch the service process
    async fn start(&mut self) -> Result<()>;

    /// Probe the health endpoint; true only for a 200 response
    async fn health_check(&mut self) -> bool;

    /// Ask whatever is listening on the endpoint to exit
    async fn request_shutdown(&mut self) -> Result<()>;

    /// Whether the launched process has exited (true if none was launched)
    fn has_exited(&mut self) -> Result<bool>;

    /// Terminate the launched process without its cooperation
    async fn force_kill(&mut self) -> Result<()>;

    /// OS process id of the launched process, if any
    fn pid(&self) -> Option<u32>;
}

/// Runs the service as a child process and talks to it over HTTP
pub struct ProcessBackend {
    executable: PathBuf,
    args: Vec<String>,
    base_url: String,
    health_url: String,
    shutdown_url: String,
    inherit_output: bool,
    client: reqwest::Client,
    child: Option<Child>,
}

impl ProcessBackend {
    /// Build a backend from configuration
    ///
    /// Bare executable names are resolved on PATH up front so a missing
    /// runtime is reported before any probing starts.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let executable = resolve_executable(&config.executable)?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            executable,
            args: config.args.clone(),
            base_url: config.base_url.clone(),
            health_url: config.health_url(),
            shutdown_url: config.shutdown_url(),
            inherit_output: config.inherit_output,
            client,
            child: None,
        })
    }

    fn output(&self) -> Stdio {
        if self.inherit_output {
            Stdio::inherit()
        } else {
            Stdio::null()
        }
    }
}

fn resolve_executable(name: &str) -> Result<PathBuf> {
    let path = PathBuf::from(name);
    if path.components().count() > 1 || path.is_absolute() {
        return Ok(path);
    }
    which::which(name).map_err(|_| Error::ExecutableNotFound {
        name: name.to_string(),
    })
}

#[async_trait]
impl ServiceBackend for ProcessBackend {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn start(&mut self) -> Result<()> {
        if self.child.is_some() && !self.has_exited()? {
            return Err(Error::invalid_state("start", "already running"));
        }

        tracing::debug!(
            executable = %self.executable.display(),
            args = ?self.args,
            "Launching service"
        );

        let child = Command::new(&self.executable)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(self.output())
            .stderr(self.output())
            .kill_on_drop(true)
            .spawn()
            .map_err(Error::LaunchFailed)?;

        tracing::info!(pid = ?child.id(), "Service process spawned");
        self.child = Some(child);
        Ok(())
    }

    async fn health_check(&mut self) -> bool {
        match self.client.get(&self.health_url).send().await {
            Ok(response) => {
                tracing::trace!(status = %response.status(), "Health probe answered");
                response.status() == reqwest::StatusCode::OK
            }
            Err(e) => {
                tracing::trace!("Health probe failed: {}", e);
                false
            }
        }
    }

    async fn request_shutdown(&mut self) -> Result<()> {
        // The service may drop the connection while exiting; callers treat
        // an error here as advisory.
        self.client.get(&self.shutdown_url).send().await?;
        Ok(())
    }

    fn has_exited(&mut self) -> Result<bool> {
        match self.child.as_mut() {
            Some(child) => Ok(child.try_wait()?.is_some()),
            None => Ok(true),
        }
    }

    async fn force_kill(&mut self) -> Result<()> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        if child.try_wait()?.is_some() {
            tracing::debug!("Service process already exited");
            return Ok(());
        }

        // Ask politely with SIGTERM first so the JVM can run its hooks
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            let result = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
            if result == 0
                && matches!(tokio::time::timeout(TERM_WAIT, child.wait()).await, Ok(Ok(_)))
            {
                tracing::debug!(pid, "Service exited after SIGTERM");
                return Ok(());
            }
        }

        child.kill().await?;
        tracing::debug!("Service process killed");
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(executable: &str) -> ServiceConfig {
        ServiceConfig {
            executable: executable.to_string(),
            args: Vec::new(),
            // Nothing listens on port 9; probes fail fast
            base_url: "http://127.0.0.1:9".to_string(),
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn test_missing_executable_is_reported() {
        let err = ProcessBackend::new(&config_for("no-such-service-binary-xyz")).err();
        assert!(matches!(err, Some(Error::ExecutableNotFound { .. })));
    }

    #[test]
    fn test_explicit_paths_are_not_resolved() {
        assert_eq!(
            resolve_executable("./bin/service").unwrap(),
            PathBuf::from("./bin/service")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_and_kill_real_process() {
        let mut config = config_for("sleep");
        config.args = vec!["30".to_string()];
        let mut backend = ProcessBackend::new(&config).unwrap();

        assert!(backend.has_exited().unwrap());
        backend.start().await.unwrap();
        assert!(backend.pid().is_some());
        assert!(!backend.has_exited().unwrap());
        assert!(!backend.health_check().await);

        backend.force_kill().await.unwrap();
        assert!(backend.has_exited().unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kill_after_exit_is_a_no_op() {
        let mut backend = ProcessBackend::new(&config_for("true")).unwrap();
        backend.start().await.unwrap();

        while !backend.has_exited().unwrap() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        backend.force_kill().await.unwrap();
        assert!(backend.has_exited().unwrap());
    }
}
