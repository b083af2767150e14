//! Lifecycle of the service under test
//!
//! The service is an opaque process reached only through its HTTP surface.
//! [`ServiceBackend`] captures the operations the controller needs, so the
//! health gate and shutdown logic run the same against a real child process
//! ([`ProcessBackend`]) or a scripted stand-in ([`FakeBackend`]).

mod backend;
mod controller;
mod fake;

use std::fmt;

pub use backend::{ProcessBackend, ServiceBackend};
pub use controller::{HealthPolicy, LifecycleController, ServiceHandle};
pub use fake::FakeBackend;

/// State of a [`ServiceHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    NotStarted,
    Starting,
    Ready,
    Stopping,
    Stopped,
    /// Terminal; reached from `Starting`, `Ready` or a `Stopping` that
    /// could not kill the process
    Failed,
}

impl ServiceState {
    /// Whether `self -> next` is an edge of the lifecycle
    pub fn can_transition_to(self, next: ServiceState) -> bool {
        use ServiceState::*;
        matches!(
            (self, next),
            (NotStarted, Starting)
                | (Starting, Ready)
                | (Starting, Failed)
                | (Ready, Stopping)
                | (Ready, Failed)
                | (Stopping, Stopped)
                | (Stopping, Failed)
        )
    }

    /// States in which no process is owned any more (or yet)
    pub fn is_terminal_or_idle(self) -> bool {
        matches!(
            self,
            ServiceState::NotStarted | ServiceState::Stopped | ServiceState::Failed
        )
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::NotStarted => "not started",
            ServiceState::Starting => "starting",
            ServiceState::Ready => "ready",
            ServiceState::Stopping => "stopping",
            ServiceState::Stopped => "stopped",
            ServiceState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
