//! Bulk-operation benchmarks
//!
//! Each workload runs one kind of request `n` times in a burst, bracketed by
//! a CPU/memory snapshot before and after. Only the burst is timed; setup
//! and cleanup requests are not.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};

use super::recorder::{self, BenchmarkRecord};
use super::sampler::Sampler;
use crate::common::config::BenchConfig;
use crate::common::{Error, Result};
use crate::testing::ScenarioContext;

/// A measured bulk operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// POST `n` new objects to the collection
    Create,
    /// POST `n` amendments to one existing object
    Amend,
    /// PUT `n` replacements of one existing object
    Update,
    /// DELETE `n` existing objects
    Delete,
}

impl Workload {
    pub const ALL: [Workload; 4] = [
        Workload::Create,
        Workload::Amend,
        Workload::Update,
        Workload::Delete,
    ];

    fn verb(&self) -> &'static str {
        match self {
            Workload::Create => "create",
            Workload::Amend => "amend",
            Workload::Update => "update",
            Workload::Delete => "delete",
        }
    }

    /// Method of the measured request
    fn method(&self) -> Method {
        match self {
            Workload::Create | Workload::Amend => Method::POST,
            Workload::Update => Method::PUT,
            Workload::Delete => Method::DELETE,
        }
    }

    /// Row label in the established result-log vocabulary
    ///
    /// Bulk workloads over many objects read `createMultipleProjects`;
    /// repeated writes to one object read `amendProjectPost`.
    pub fn label(&self, resource: &str) -> String {
        match self {
            Workload::Create | Workload::Delete => {
                format!("{}Multiple{}", self.verb(), capitalize(resource))
            }
            Workload::Amend | Workload::Update => format!(
                "{}{}{}",
                self.verb(),
                capitalize(singular(resource)),
                capitalize(&self.method().as_str().to_ascii_lowercase())
            ),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn singular(resource: &str) -> &str {
    resource.strip_suffix('s').unwrap_or(resource)
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// What to benchmark and where to write it
#[derive(Debug, Clone)]
pub struct BenchPlan {
    pub resource: String,
    pub load_sizes: Vec<usize>,
    pub sample_window: Duration,
    pub output: PathBuf,
}

impl BenchPlan {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            resource: config.resource.clone(),
            load_sizes: config.load_sizes.clone(),
            sample_window: config.sample_window(),
            output: config.results_file.clone(),
        }
    }
}

/// Request body for the `index`-th object of a burst
fn payload(workload: Workload, index: usize) -> Value {
    json!({
        "title": format!("{} bench object {}", workload, index),
        "completed": false,
        "active": index % 2 == 0,
        "description": format!("generated for the {} workload", workload),
    })
}

/// Identifier of a created object, whether the service sends it as a string
/// or a number
pub fn object_id(body: &Value) -> Option<String> {
    match body.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

async fn create_object(
    ctx: &mut ScenarioContext,
    resource: &str,
    workload: Workload,
    index: usize,
) -> Result<String> {
    let body = ctx
        .send(Method::POST, &format!("/{}", resource), Some(payload(workload, index)))
        .await?
        .json();
    ctx.expect_status(201)?;
    object_id(&body?).ok_or_else(|| {
        Error::TestAssertion(format!("POST /{} response has no id field", resource))
    })
}

async fn create_objects(
    ctx: &mut ScenarioContext,
    resource: &str,
    workload: Workload,
    count: usize,
) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        ids.push(create_object(ctx, resource, workload, i).await?);
    }
    Ok(ids)
}

async fn delete_objects(ctx: &mut ScenarioContext, resource: &str, ids: &[String]) -> Result<()> {
    for id in ids {
        ctx.send(Method::DELETE, &format!("/{}/{}", resource, id), None)
            .await?;
        ctx.expect_status(200)?;
    }
    Ok(())
}

/// Run one workload at one load size and build its record
///
/// Objects the burst acts on are created before the first snapshot, and
/// objects only the burst needed are deleted after the second one.
pub async fn run_workload(
    ctx: &mut ScenarioContext,
    sampler: &mut Sampler,
    workload: Workload,
    resource: &str,
    count: usize,
    window: Duration,
) -> Result<BenchmarkRecord> {
    let prepared = match workload {
        Workload::Create => Vec::new(),
        Workload::Amend | Workload::Update => vec![create_object(ctx, resource, workload, 0).await?],
        Workload::Delete => create_objects(ctx, resource, workload, count).await?,
    };

    let before = sampler.snapshot(window).await;
    let started = sampler.clock().now();

    match workload {
        Workload::Create => {
            for i in 0..count {
                create_object(ctx, resource, workload, i).await?;
            }
        }
        Workload::Amend | Workload::Update => {
            for (i, id) in prepared.iter().cycle().take(count).enumerate() {
                ctx.send(
                    workload.method(),
                    &format!("/{}/{}", resource, id),
                    Some(payload(workload, i)),
                )
                .await?;
                ctx.expect_status(200)?;
            }
        }
        Workload::Delete => delete_objects(ctx, resource, &prepared).await?,
    }

    let duration = sampler.clock().now().saturating_duration_since(started);
    let after = sampler.snapshot(window).await;

    if matches!(workload, Workload::Amend | Workload::Update) {
        if let Err(e) = delete_objects(ctx, resource, &prepared).await {
            tracing::warn!("Failed to clean up after {}: {}", workload.label(resource), e);
        }
    }

    Ok(BenchmarkRecord {
        label: workload.label(resource),
        object_count: count,
        duration_millis: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        cpu_delta_percent: after.cpu_delta(&before),
        memory_delta_bytes: after.memory_delta(&before),
    })
}

/// Run every workload at every load size, appending one row per pair
///
/// The result file is truncated and given a header first. A workload that
/// fails is logged and skipped; the remaining pairs still run.
pub async fn run_benchmarks(
    plan: &BenchPlan,
    ctx: &mut ScenarioContext,
    sampler: &mut Sampler,
) -> Result<Vec<BenchmarkRecord>> {
    recorder::write_header(&plan.output)?;

    let mut records = Vec::new();
    for workload in Workload::ALL {
        let label = workload.label(&plan.resource);
        for &count in &plan.load_sizes {
            tracing::info!(label = %label, count, "Running workload");
            match run_workload(ctx, sampler, workload, &plan.resource, count, plan.sample_window).await {
                Ok(record) => {
                    recorder::append_record_or_warn(&plan.output, &record);
                    records.push(record);
                }
                Err(e) => {
                    tracing::warn!(label = %label, count, "Workload failed: {}", e);
                }
            }
        }
    }

    Ok(records)
}
