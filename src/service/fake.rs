//! Scripted backend for exercising the controller without a real process

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::ServiceBackend;
use crate::common::{Error, Result};

#[derive(Debug, Default)]
struct FakeState {
    /// Probe results consumed after `start`; once empty, probes report `running`
    health_script: VecDeque<bool>,
    /// An instance not owned by us is answering on the endpoint
    foreign_instance: bool,
    /// The foreign instance ignores shutdown requests
    foreign_ignores_shutdown: bool,
    started: bool,
    running: bool,
    /// Our process ignores shutdown requests
    ignores_shutdown: bool,
    fail_launch: bool,
    /// Killing the process fails, as for a process we lack permission on
    fail_kill: bool,
    starts: u32,
    health_checks: u32,
    shutdown_requests: u32,
    kills: u32,
}

/// In-memory [`ServiceBackend`] whose probe results are scripted
///
/// Clones share state, so a test can keep one clone for inspection and hand
/// the other to the controller.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    /// Backend whose process becomes healthy on the first probe
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe results returned after launch, in order
    pub fn with_health_script(self, script: impl IntoIterator<Item = bool>) -> Self {
        self.lock().health_script = script.into_iter().collect();
        self
    }

    /// Probe fails `failures` times after launch, then succeeds
    pub fn healthy_after(self, failures: usize) -> Self {
        self.with_health_script(std::iter::repeat(false).take(failures))
    }

    /// Probe never succeeds after launch
    pub fn never_healthy(self) -> Self {
        self.with_health_script(std::iter::repeat(false).take(10_000))
    }

    /// A previous instance is already answering before launch
    pub fn with_foreign_instance(self, stops_on_request: bool) -> Self {
        {
            let mut state = self.lock();
            state.foreign_instance = true;
            state.foreign_ignores_shutdown = !stops_on_request;
        }
        self
    }

    /// Launched process does not exit when asked to
    pub fn ignoring_shutdown(self) -> Self {
        self.lock().ignores_shutdown = true;
        self
    }

    /// Launch fails outright
    pub fn failing_launch(self) -> Self {
        self.lock().fail_launch = true;
        self
    }

    /// Forced termination fails and leaves the process running
    pub fn failing_kill(self) -> Self {
        self.lock().fail_kill = true;
        self
    }

    pub fn starts(&self) -> u32 {
        self.lock().starts
    }

    pub fn health_checks(&self) -> u32 {
        self.lock().health_checks
    }

    pub fn shutdown_requests(&self) -> u32 {
        self.lock().shutdown_requests
    }

    pub fn kills(&self) -> u32 {
        self.lock().kills
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn foreign_instance_running(&self) -> bool {
        self.lock().foreign_instance
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ServiceBackend for FakeBackend {
    fn endpoint(&self) -> &str {
        "fake://service"
    }

    async fn start(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.starts += 1;
        if state.fail_launch {
            return Err(Error::LaunchFailed(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "scripted launch failure",
            )));
        }
        state.started = true;
        state.running = true;
        Ok(())
    }

    async fn health_check(&mut self) -> bool {
        let mut state = self.lock();
        state.health_checks += 1;
        if !state.started {
            return state.foreign_instance;
        }
        match state.health_script.pop_front() {
            Some(result) => result && state.running,
            None => state.running,
        }
    }

    async fn request_shutdown(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.shutdown_requests += 1;
        if state.foreign_instance && !state.foreign_ignores_shutdown {
            state.foreign_instance = false;
        }
        if state.running && !state.ignores_shutdown {
            state.running = false;
        }
        Ok(())
    }

    fn has_exited(&mut self) -> Result<bool> {
        Ok(!self.lock().running)
    }

    async fn force_kill(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.kills += 1;
        if state.fail_kill {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "scripted kill failure",
            )));
        }
        state.running = false;
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        if self.lock().running {
            Some(4242)
        } else {
            None
        }
    }
}
