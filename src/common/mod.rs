//! Common utilities shared by the harness subsystems

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
