//! Scenario file discovery

use std::path::Path;

use walkdir::WalkDir;

use super::ScenarioFile;
use crate::common::{Error, Result};

/// Recursively enumerate scenario files under `root`
///
/// Only regular files whose name ends with `suffix` are returned. The order
/// is whatever the filesystem walk yields and must not be relied upon.
/// A missing root or an empty result is an error: an empty suite must never
/// be reported as a passing one.
pub fn discover(root: &Path, suffix: &str) -> Result<Vec<ScenarioFile>> {
    let no_scenarios = || Error::NoScenariosFound {
        root: root.to_path_buf(),
        suffix: suffix.to_string(),
    };

    if !root.is_dir() {
        tracing::error!(root = %root.display(), "Scenario directory does not exist");
        return Err(no_scenarios());
    }

    // Canonical root so every identifier is absolute
    let root_abs = root.canonicalize()?;

    let files: Vec<ScenarioFile> = WalkDir::new(&root_abs)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry during discovery: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(suffix))
        .map(|entry| ScenarioFile::new(entry.into_path()))
        .collect();

    if files.is_empty() {
        return Err(no_scenarios());
    }

    tracing::debug!(count = files.len(), root = %root_abs.display(), "Discovered scenarios");
    Ok(files)
}
