//! Performance measurement: resource sampling, bulk workloads and the
//! CSV result log

mod bench;
mod recorder;
mod sampler;

pub use bench::{object_id, run_benchmarks, run_workload, BenchPlan, Workload};
pub use recorder::{append_record, append_record_or_warn, write_header, BenchmarkRecord, CSV_HEADER};
pub use sampler::{
    CpuProbe, MemoryProbe, ProcessMemoryProbe, ResourceSnapshot, Sampler, SystemCpuProbe,
};
