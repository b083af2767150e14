//! CPU and memory sampling
//!
//! A coarse instrument for spotting trends across load sizes, not a
//! profiler. CPU load is read from the host at a fixed interval over a
//! bounded window; memory is this process's own resident size, used only as
//! a before/after baseline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::common::clock::{self, Clock};
use crate::common::{Error, Result};

/// Source of host CPU load readings
pub trait CpuProbe: Send {
    /// Current load as a fraction in `0.0..=1.0`
    fn cpu_load(&mut self) -> f64;
}

/// Source of memory usage readings
pub trait MemoryProbe: Send {
    /// Bytes currently in use
    fn used_bytes(&mut self) -> u64;
}

/// Host-wide CPU load via sysinfo
pub struct SystemCpuProbe {
    sys: System,
}

impl SystemCpuProbe {
    pub fn new() -> Self {
        let mut sys = System::new();
        // The first refresh only primes the counters
        sys.refresh_cpu_usage();
        Self { sys }
    }
}

impl Default for SystemCpuProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuProbe for SystemCpuProbe {
    fn cpu_load(&mut self) -> f64 {
        self.sys.refresh_cpu_usage();
        f64::from(self.sys.global_cpu_usage()) / 100.0
    }
}

/// Resident memory of the harness process via sysinfo
pub struct ProcessMemoryProbe {
    sys: System,
    pid: Pid,
}

impl ProcessMemoryProbe {
    pub fn new() -> Result<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| Error::Internal(format!("Failed to get current process id: {}", e)))?;
        Ok(Self {
            sys: System::new(),
            pid,
        })
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn used_bytes(&mut self) -> u64 {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        self.sys.process(self.pid).map_or(0, |p| p.memory())
    }
}

/// Resource readings taken at one point of a benchmark
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSnapshot {
    /// Mean CPU load over the sampling window, in percent
    pub cpu_percent: f64,
    /// Memory in use at the end of the window
    pub memory_bytes: u64,
}

impl ResourceSnapshot {
    /// CPU increase from `before` to `self`, never negative
    pub fn cpu_delta(&self, before: &ResourceSnapshot) -> f64 {
        (self.cpu_percent - before.cpu_percent).max(0.0)
    }

    /// Memory increase from `before` to `self`, never negative
    pub fn memory_delta(&self, before: &ResourceSnapshot) -> u64 {
        self.memory_bytes.saturating_sub(before.memory_bytes)
    }
}

/// Polls CPU and memory probes on an injectable clock
pub struct Sampler {
    clock: Arc<dyn Clock>,
    cpu: Box<dyn CpuProbe>,
    memory: Box<dyn MemoryProbe>,
    interval: Duration,
}

impl Sampler {
    pub fn new(
        clock: Arc<dyn Clock>,
        cpu: Box<dyn CpuProbe>,
        memory: Box<dyn MemoryProbe>,
        interval: Duration,
    ) -> Self {
        Self {
            clock,
            cpu,
            memory,
            interval,
        }
    }

    /// Sampler reading the real host and process on the real clock
    pub fn system(interval: Duration) -> Result<Self> {
        Ok(Self::new(
            clock::system(),
            Box::new(SystemCpuProbe::new()),
            Box::new(ProcessMemoryProbe::new()?),
            interval,
        ))
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Mean CPU load in percent over `[window_start, window_end)`
    ///
    /// Readings are taken every `interval` until the window end is reached.
    /// If the window has already elapsed no reading is taken and `0.0` is
    /// returned.
    pub async fn sample_cpu(&mut self, window_start: Instant, window_end: Instant) -> f64 {
        let now = self.clock.now();
        if now < window_start {
            self.clock.sleep(window_start - now).await;
        }

        let mut sum = 0.0;
        let mut samples = 0u32;

        while self.clock.now() < window_end {
            let load = self.cpu.cpu_load();
            if load.is_finite() {
                sum += load.clamp(0.0, 1.0);
                samples += 1;
            }
            self.clock.sleep(self.interval).await;
        }

        if samples == 0 {
            return 0.0;
        }
        (sum / f64::from(samples)) * 100.0
    }

    /// Point-in-time memory usage of this process
    pub fn current_memory_usage(&mut self) -> u64 {
        self.memory.used_bytes()
    }

    /// Sample CPU over a window of `length` starting now, then read memory
    pub async fn snapshot(&mut self, length: Duration) -> ResourceSnapshot {
        let start = self.clock.now();
        let cpu_percent = self.sample_cpu(start, start + length).await;
        let memory_bytes = self.current_memory_usage();
        ResourceSnapshot {
            cpu_percent,
            memory_bytes,
        }
    }
}
