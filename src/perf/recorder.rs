//! Append-only CSV benchmark log
//!
//! Each row is written with its own open/append/close so a crash mid-suite
//! loses at most the row being written. There is no locking; one writer per
//! result file is assumed.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::common::paths::ensure_parent_dir;
use crate::common::{Error, Result};

/// Column order of the result log
///
/// `duration` covers only the measured burst. Logs from runs that also
/// timed the pre-burst sampling window read about one window longer per
/// row and are not directly comparable.
pub const CSV_HEADER: &str = "operation,numObjects,duration,cpuUsage,memoryUsage";

/// Resource cost of one operation at one load size
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkRecord {
    pub label: String,
    pub object_count: usize,
    pub duration_millis: u64,
    pub cpu_delta_percent: f64,
    pub memory_delta_bytes: u64,
}

impl BenchmarkRecord {
    /// One CSV line, without terminator, in [`CSV_HEADER`] order
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{:.2},{}",
            csv_field(&self.label),
            self.object_count,
            self.duration_millis,
            self.cpu_delta_percent.max(0.0),
            self.memory_delta_bytes
        )
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_failure(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::RecorderWrite {
        path: path.to_path_buf(),
        source,
    }
}

/// Create (or truncate) `path` and write the header line
///
/// Called once at the start of a benchmark run, before any record.
pub fn write_header(path: &Path) -> Result<()> {
    ensure_parent_dir(path).map_err(write_failure(path))?;
    let mut file = File::create(path).map_err(write_failure(path))?;
    writeln!(file, "{}", CSV_HEADER).map_err(write_failure(path))?;
    Ok(())
}

/// Append one record as a data line to `path`
pub fn append_record(path: &Path, record: &BenchmarkRecord) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_failure(path))?;
    writeln!(file, "{}", record.to_csv_line()).map_err(write_failure(path))?;
    tracing::debug!(label = %record.label, count = record.object_count, "Benchmark row appended");
    Ok(())
}

/// Append a record, logging instead of failing
///
/// Benchmark rows are diagnostics; a lost row must not abort the suite.
pub fn append_record_or_warn(path: &Path, record: &BenchmarkRecord) -> bool {
    match append_record(path, record) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("{}", e);
            false
        }
    }
}
