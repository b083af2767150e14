//! Health-gated start and bounded shutdown of the service under test

use std::sync::Arc;
use std::time::Duration;

use super::{ServiceBackend, ServiceState};
use crate::common::clock::{self, Clock};
use crate::common::config::ServiceConfig;
use crate::common::{Error, Result};

/// Bounds on the waits the controller performs
#[derive(Debug, Clone, Copy)]
pub struct HealthPolicy {
    /// Maximum number of health probes after launch
    pub max_attempts: u32,
    /// Fixed delay between probes (and between exit checks)
    pub interval: Duration,
    /// Upper bound on the whole health-gate wait
    pub max_wait: Duration,
    /// Time allowed for a graceful exit before the process is killed
    pub shutdown_grace: Duration,
}

impl HealthPolicy {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            max_attempts: config.health_attempts,
            interval: config.health_interval(),
            max_wait: config.max_wait(),
            shutdown_grace: config.shutdown_grace(),
        }
    }
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

/// Owner of the one service process of a suite
pub struct ServiceHandle {
    backend: Box<dyn ServiceBackend>,
    state: ServiceState,
}

impl ServiceHandle {
    fn new(backend: Box<dyn ServiceBackend>) -> Self {
        Self {
            backend,
            state: ServiceState::NotStarted,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ServiceState::Ready
    }

    pub fn pid(&self) -> Option<u32> {
        self.backend.pid()
    }

    pub fn endpoint(&self) -> &str {
        self.backend.endpoint()
    }

    fn transition(&mut self, next: ServiceState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid service transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "Service state change");
        self.state = next;
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("endpoint", &self.backend.endpoint())
            .field("state", &self.state)
            .field("pid", &self.backend.pid())
            .finish()
    }
}

/// Starts and stops the service; the only component allowed to do either
pub struct LifecycleController {
    policy: HealthPolicy,
    clock: Arc<dyn Clock>,
}

impl LifecycleController {
    pub fn new(policy: HealthPolicy) -> Self {
        Self::with_clock(policy, clock::system())
    }

    pub fn with_clock(policy: HealthPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { policy, clock }
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Launch the service and wait until it answers its health probe
    ///
    /// An instance already answering on the endpoint is asked to shut down
    /// first, so the suite always starts against a fresh service and two
    /// instances never race for the port. The returned handle is `Ready`;
    /// on any failure the launched process is killed and
    /// [`Error::ServiceDidNotStart`] (or the launch error) is returned.
    pub async fn ensure_running(&self, backend: Box<dyn ServiceBackend>) -> Result<ServiceHandle> {
        let mut handle = ServiceHandle::new(backend);

        if handle.backend.health_check().await {
            self.stop_foreign_instance(&mut handle).await?;
        }

        handle.transition(ServiceState::Starting);
        if let Err(e) = handle.backend.start().await {
            handle.transition(ServiceState::Failed);
            tracing::error!("Service launch failed: {}", e);
            return Err(e);
        }

        let started = self.clock.now();
        let mut attempts = 0u32;

        let reason = loop {
            if attempts >= self.policy.max_attempts {
                break "health probe never returned 200";
            }
            if self.clock.now().duration_since(started) >= self.policy.max_wait {
                break "maximum startup wait exceeded";
            }

            attempts += 1;
            if handle.backend.health_check().await {
                handle.transition(ServiceState::Ready);
                tracing::info!(
                    endpoint = handle.endpoint(),
                    attempts,
                    pid = ?handle.pid(),
                    "Service is ready"
                );
                return Ok(handle);
            }
            tracing::debug!(attempt = attempts, "Service not healthy yet");

            match handle.backend.has_exited() {
                Ok(true) => break "process exited before becoming healthy",
                Ok(false) => {}
                Err(e) => tracing::warn!("Could not query service process: {}", e),
            }

            if attempts < self.policy.max_attempts {
                self.clock.sleep(self.policy.interval).await;
            }
        };

        let waited_ms = self.clock.now().duration_since(started).as_millis() as u64;
        handle.transition(ServiceState::Failed);
        if let Err(e) = handle.backend.force_kill().await {
            tracing::warn!("Failed to kill unhealthy service: {}", e);
        }

        let err = Error::did_not_start(handle.endpoint(), attempts, waited_ms, reason);
        tracing::error!("{}", err);
        Err(err)
    }

    /// Stop the service: shutdown request, bounded wait, then force
    ///
    /// Calling this on a handle that is not running is a no-op. A service
    /// that ignores the request past the grace period is killed; that is
    /// logged as [`Error::ServiceShutdownTimeout`] but not returned.
    pub async fn shutdown(&self, handle: &mut ServiceHandle) -> Result<()> {
        if handle.state.is_terminal_or_idle() {
            tracing::debug!(state = %handle.state, "Shutdown requested on idle service; nothing to do");
            return Ok(());
        }

        if handle.state == ServiceState::Starting {
            handle.transition(ServiceState::Failed);
            return handle.backend.force_kill().await;
        }

        // A shutdown dropped mid-wait leaves the handle in `Stopping`
        if handle.state != ServiceState::Stopping {
            handle.transition(ServiceState::Stopping);
        }
        if let Err(e) = handle.backend.request_shutdown().await {
            tracing::debug!("Shutdown request was not acknowledged: {}", e);
        }

        if let Err(e) = self.wait_for_exit(handle).await {
            // The process may still be alive; never report it as stopped
            handle.transition(ServiceState::Failed);
            tracing::error!(endpoint = handle.endpoint(), "Service could not be stopped: {}", e);
            return Err(e);
        }

        handle.transition(ServiceState::Stopped);
        tracing::info!(endpoint = handle.endpoint(), "Service stopped");
        Ok(())
    }

    /// Poll for exit until the grace period ends, then kill
    async fn wait_for_exit(&self, handle: &mut ServiceHandle) -> Result<()> {
        let deadline = self.clock.now() + self.policy.shutdown_grace;
        loop {
            match handle.backend.has_exited() {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Could not query service process, killing it: {}", e);
                    return handle.backend.force_kill().await;
                }
            }

            if self.clock.now() >= deadline {
                let timeout = Error::ServiceShutdownTimeout(self.policy.shutdown_grace.as_secs());
                tracing::warn!("{}; forcing termination", timeout);
                return handle.backend.force_kill().await;
            }

            self.clock.sleep(self.policy.interval).await;
        }
    }

    /// Stop an instance we did not launch and wait for the port to go quiet
    async fn stop_foreign_instance(&self, handle: &mut ServiceHandle) -> Result<()> {
        tracing::warn!(
            endpoint = handle.endpoint(),
            "A service instance is already running; stopping it first"
        );
        if let Err(e) = handle.backend.request_shutdown().await {
            tracing::debug!("Shutdown request to previous instance failed: {}", e);
        }

        let started = self.clock.now();
        loop {
            self.clock.sleep(self.policy.interval).await;
            if !handle.backend.health_check().await {
                tracing::debug!("Previous instance stopped");
                return Ok(());
            }
            let waited = self.clock.now().duration_since(started);
            if waited >= self.policy.shutdown_grace {
                return Err(Error::did_not_start(
                    handle.endpoint(),
                    0,
                    waited.as_millis() as u64,
                    "a previous instance is still answering on the endpoint",
                ));
            }
        }
    }
}
