//! Scenario discovery and run ordering
//!
//! Scenario files are enumerated from a directory tree and then put into a
//! reproducible order derived from a [`RunSeed`]. The scheduler never runs a
//! scenario itself; it hands the ordered list to a scenario engine.

mod discover;
mod order;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

pub use discover::discover;
pub use order::{log_order, resolve_order, schedule};

/// One discoverable scenario definition, identified by its absolute path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScenarioFile(PathBuf);

impl ScenarioFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// File name without directories, for compact progress output
    pub fn name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.display().to_string())
    }
}

impl fmt::Display for ScenarioFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Seed fixing the scenario permutation for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunSeed(pub u64);

impl RunSeed {
    /// Draw a fresh seed; callers log it so the run stays reproducible
    pub fn random() -> Self {
        Self(fastrand::u64(..))
    }
}

impl fmt::Display for RunSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RunSeed {
    fn from(seed: u64) -> Self {
        Self(seed)
    }
}

/// How the run order is derived from the discovered set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OrderPolicy {
    /// Seeded pseudo-random permutation
    #[default]
    Shuffled,
    /// Lexicographic path order
    Sorted,
}

impl FromStr for OrderPolicy {
    type Err = crate::common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shuffled" | "shuffle" => Ok(Self::Shuffled),
            "sorted" | "sort" => Ok(Self::Sorted),
            other => Err(crate::common::Error::Config(format!(
                "Unknown order policy '{}'. Supported: 'shuffled', 'sorted'",
                other
            ))),
        }
    }
}

impl fmt::Display for OrderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shuffled => write!(f, "shuffled"),
            Self::Sorted => write!(f, "sorted"),
        }
    }
}
