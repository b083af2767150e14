//! Suite runner
//!
//! Discovers and orders scenarios, brings the service up behind its health
//! gate, runs every scenario strictly one after another and shuts the
//! service down again, whatever the scenarios did.

use std::path::Path;
use std::time::{Duration, Instant};

use colored::Colorize;

use super::{ScenarioContext, ScenarioEngine};
use crate::common::Result;
use crate::scheduler::{self, OrderPolicy, RunSeed, ScenarioFile};
use crate::service::{LifecycleController, ServiceBackend};

/// Result of one scenario within a suite
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub scenario: ScenarioFile,
    pub position: usize,
    pub passed: bool,
    pub duration: Duration,
    pub error: Option<String>,
}

/// Outcome of a whole suite
#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub seed: RunSeed,
    pub policy: OrderPolicy,
    pub results: Vec<ScenarioResult>,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.passed)
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }
}

/// The fixed run order of a suite, computed before anything executes
#[derive(Debug, Clone)]
pub struct SuitePlan {
    pub order: Vec<ScenarioFile>,
    pub seed: RunSeed,
    pub policy: OrderPolicy,
}

impl SuitePlan {
    /// Discover scenarios under `root` and resolve their order
    pub fn build(root: &Path, suffix: &str, seed: RunSeed, policy: OrderPolicy) -> Result<Self> {
        let files = scheduler::discover(root, suffix)?;
        let order = scheduler::resolve_order(&files, seed, policy);
        Ok(Self {
            order,
            seed,
            policy,
        })
    }

    /// Print the order so a failed run can be replayed exactly
    pub fn print(&self) {
        println!(
            "\n{} (seed={}, {})",
            "Scenario run order".blue().bold(),
            self.seed.to_string().white().bold(),
            self.policy
        );
        for (i, file) in self.order.iter().enumerate() {
            println!("  {:>3}. {}", i + 1, file.to_string().dimmed());
        }
    }
}

/// Run every scenario of `plan` against a freshly started service
///
/// Discovery and start-up failures abort before any scenario runs. A failed
/// or unrunnable scenario is recorded and the suite moves on. The service is
/// always shut down before returning.
pub async fn run_suite(
    plan: &SuitePlan,
    controller: &LifecycleController,
    backend: Box<dyn ServiceBackend>,
    engine: &mut dyn ScenarioEngine,
    base_url: &str,
) -> Result<SuiteReport> {
    scheduler::log_order(&plan.order, plan.seed, plan.policy);
    plan.print();

    println!("\n{}", "Starting service...".cyan());
    let mut handle = controller.ensure_running(backend).await?;
    println!("  {} Service ready at {}", "✓".green(), handle.endpoint());

    let results = run_scenarios(plan, engine, base_url).await;

    if let Err(e) = controller.shutdown(&mut handle).await {
        tracing::warn!("Service shutdown failed: {}", e);
    }

    let report = SuiteReport {
        seed: plan.seed,
        policy: plan.policy,
        results: results?,
    };
    print_summary(&report);
    Ok(report)
}

async fn run_scenarios(
    plan: &SuitePlan,
    engine: &mut dyn ScenarioEngine,
    base_url: &str,
) -> Result<Vec<ScenarioResult>> {
    let base_ctx = ScenarioContext::new(base_url, plan.seed)?;
    let mut results = Vec::with_capacity(plan.order.len());

    println!("\n{}", "Scenarios:".cyan());

    for (i, scenario) in plan.order.iter().enumerate() {
        let position = i + 1;
        let mut ctx = base_ctx.for_scenario(scenario);
        let started = Instant::now();

        tracing::info!(position, scenario = %scenario, "Running scenario");
        let outcome = engine.run(scenario, &mut ctx).await;
        let duration = started.elapsed();

        let (passed, error) = match outcome {
            Ok(outcome) => (outcome.passed, outcome.detail),
            Err(e) => (false, Some(e.to_string())),
        };

        if passed {
            println!(
                "  {} {:>3}. {} {}",
                "✓".green(),
                position,
                scenario.name(),
                format!("({} ms)", duration.as_millis()).dimmed()
            );
        } else {
            let detail = error.as_deref().unwrap_or("failed");
            println!("  {} {:>3}. {}: {}", "✗".red(), position, scenario.name(), detail);
            tracing::warn!(position, scenario = %scenario, "Scenario failed: {}", detail);
        }

        results.push(ScenarioResult {
            scenario: scenario.clone(),
            position,
            passed,
            duration,
            error,
        });
    }

    Ok(results)
}

fn print_summary(report: &SuiteReport) {
    let total = report.results.len();
    let failed = report.failed_count();

    if failed == 0 {
        println!(
            "\n{} {}\n",
            "✓".green().bold(),
            format!("All {} scenarios passed", total).green().bold()
        );
    } else {
        println!(
            "\n{} {}",
            "✗".red().bold(),
            format!("{} of {} scenarios failed", failed, total).red().bold()
        );
        for result in report.results.iter().filter(|r| !r.passed) {
            println!("  {:>3}. {}", result.position, result.scenario);
        }
        println!(
            "  Re-run this order with {}\n",
            format!("--seed {} --order {}", report.seed, report.policy).white().bold()
        );
    }
}
