//! CLI command handling
//!
//! Turns parsed commands plus configuration into a suite or benchmark run and
//! formats the results.

use std::path::PathBuf;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::perf::{self, BenchPlan, Sampler};
use crate::scheduler::{OrderPolicy, RunSeed};
use crate::service::{HealthPolicy, LifecycleController, ProcessBackend};
use crate::testing::{self, CommandEngine, ScenarioContext, SuitePlan};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Run {
            root,
            seed,
            random_seed,
            order,
            verbose,
        } => {
            let seed = if random_seed {
                RunSeed::random()
            } else {
                RunSeed(seed.unwrap_or(config.scenarios.seed))
            };
            let plan = suite_plan(&config, root, seed, order)?;

            let backend = ProcessBackend::new(&config.service)?;
            let controller = LifecycleController::new(HealthPolicy::from_config(&config.service));
            let mut engine = CommandEngine::new(
                &config.scenarios.engine,
                config.scenarios.timeout(),
                verbose,
            )?;

            let report = testing::run_suite(
                &plan,
                &controller,
                Box::new(backend),
                &mut engine,
                &config.service.base_url,
            )
            .await?;

            if report.passed() {
                Ok(())
            } else {
                Err(Error::SuiteFailed {
                    failed: report.failed_count(),
                    total: report.results.len(),
                    seed: report.seed.0,
                })
            }
        }

        Commands::Order { root, seed, order } => {
            let seed = RunSeed(seed.unwrap_or(config.scenarios.seed));
            let plan = suite_plan(&config, root, seed, order)?;
            plan.print();
            Ok(())
        }

        Commands::Bench {
            output,
            resource,
            sizes,
            json,
        } => {
            let mut plan = BenchPlan::from_config(&config.bench);
            if let Some(output) = output {
                plan.output = output;
            }
            if let Some(resource) = resource {
                plan.resource = resource;
            }
            if let Some(sizes) = sizes {
                if sizes.is_empty() {
                    return Err(Error::Config("--sizes must name at least one load size".to_string()));
                }
                plan.load_sizes = sizes;
            }

            let records = run_bench(&config, &plan).await?;

            println!(
                "\n{} {} row(s) written to {}",
                "✓".green(),
                records.len(),
                plan.output.display()
            );
            for record in &records {
                println!(
                    "  {:<28} n={:<6} {:>8} ms  cpu +{:.2}%  mem +{} B",
                    record.label,
                    record.object_count,
                    record.duration_millis,
                    record.cpu_delta_percent,
                    record.memory_delta_bytes
                );
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
            Ok(())
        }
    }
}

fn suite_plan(
    config: &Config,
    root: Option<PathBuf>,
    seed: RunSeed,
    order: Option<OrderPolicy>,
) -> Result<SuitePlan> {
    let root = root.unwrap_or_else(|| config.scenarios.root.clone());
    let policy = order.unwrap_or(config.scenarios.order);
    SuitePlan::build(&root, &config.scenarios.suffix, seed, policy)
}

async fn run_bench(config: &Config, plan: &BenchPlan) -> Result<Vec<perf::BenchmarkRecord>> {
    let backend = ProcessBackend::new(&config.service)?;
    let controller = LifecycleController::new(HealthPolicy::from_config(&config.service));
    let mut sampler = Sampler::system(config.bench.sample_interval())?;
    let mut ctx = ScenarioContext::new(&config.service.base_url, RunSeed(config.scenarios.seed))?;

    println!("{}", "Starting service...".cyan());
    let mut handle = controller.ensure_running(Box::new(backend)).await?;
    println!("  {} Service ready at {}", "✓".green(), handle.endpoint());

    let result = perf::run_benchmarks(plan, &mut ctx, &mut sampler).await;

    if let Err(e) = controller.shutdown(&mut handle).await {
        tracing::warn!("Service shutdown failed: {}", e);
    }
    result
}
