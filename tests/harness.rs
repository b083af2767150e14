//! End-to-end tests for the harness
//!
//! These run the suite runner and the benchmark workloads against an
//! in-process stand-in for the REST service, and drive the `harness` binary
//! for the commands that need no service at all.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use harness::common::clock::ManualClock;
use harness::perf::{self, BenchPlan, CpuProbe, MemoryProbe, Sampler, CSV_HEADER};
use harness::service::{FakeBackend, HealthPolicy, LifecycleController};
use harness::testing::{self, CommandEngine, ScenarioContext, SuitePlan};
use harness::{OrderPolicy, RunSeed};
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Objects held by the stand-in service
#[derive(Default)]
struct Store {
    next_id: u64,
    objects: HashMap<String, Value>,
}

/// Minimal JSON-over-HTTP/1.1 collection service
///
/// Supports POST /{collection}, POST, PUT and DELETE /{collection}/{id}, and
/// GET /.
async fn start_service() -> (String, Arc<Mutex<Store>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = Arc::new(Mutex::new(Store::default()));

    let shared = store.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(serve_connection(stream, shared.clone()));
        }
    });

    (format!("http://{}", addr), store)
}

async fn serve_connection(stream: TcpStream, store: Arc<Mutex<Store>>) {
    let mut reader = BufReader::new(stream);
    loop {
        let mut request_line = String::new();
        match reader.read_line(&mut request_line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let mut content_length = 0usize;
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).await.unwrap_or(0) == 0 {
                return;
            }
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }

        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).await.is_err() {
            return;
        }

        let (status, reply) = route(&store, &method, &path, &body);
        let reply = reply.to_string();
        let response = format!(
            "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            status,
            reply.len(),
            reply
        );
        if reader.get_mut().write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

fn route(store: &Mutex<Store>, method: &str, path: &str, body: &[u8]) -> (u16, Value) {
    let mut store = store.lock().unwrap();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method, segments.as_slice()) {
        ("GET", [""]) => (200, json!({"status": "ok"})),
        ("POST", [_collection]) => {
            let Ok(mut object) = serde_json::from_slice::<Value>(body) else {
                return (400, json!({"errorMessages": ["invalid json"]}));
            };
            store.next_id += 1;
            let id = store.next_id.to_string();
            object["id"] = json!(id);
            store.objects.insert(id, object.clone());
            (201, object)
        }
        ("POST" | "PUT", [_collection, id]) => match store.objects.get_mut(*id) {
            Some(existing) => {
                if let Ok(Value::Object(update)) = serde_json::from_slice::<Value>(body) {
                    for (k, v) in update {
                        existing[k] = v;
                    }
                }
                (200, existing.clone())
            }
            None => (404, json!({"errorMessages": ["not found"]})),
        },
        ("DELETE", [_collection, id]) => match store.objects.remove(*id) {
            Some(_) => (200, json!({})),
            None => (404, json!({"errorMessages": ["not found"]})),
        },
        _ => (404, json!({"errorMessages": ["no route"]})),
    }
}

struct Steady;

impl CpuProbe for Steady {
    fn cpu_load(&mut self) -> f64 {
        0.1
    }
}

impl MemoryProbe for Steady {
    fn used_bytes(&mut self) -> u64 {
        64 * 1024
    }
}

fn manual_sampler() -> Sampler {
    Sampler::new(
        Arc::new(ManualClock::new()),
        Box::new(Steady),
        Box::new(Steady),
        Duration::from_millis(10),
    )
}

fn write_scenarios(root: &Path, names: &[&str]) {
    for name in names {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "Feature: placeholder\n").unwrap();
    }
}

#[tokio::test]
async fn test_benchmarks_write_one_row_per_workload_and_size() {
    let (base_url, store) = start_service().await;
    let dir = tempdir().unwrap();
    let plan = BenchPlan {
        resource: "projects".to_string(),
        load_sizes: vec![1, 3],
        sample_window: Duration::from_millis(50),
        output: dir.path().join("out").join("results.csv"),
    };
    let mut ctx = ScenarioContext::new(&base_url, RunSeed(1)).unwrap();
    let mut sampler = manual_sampler();

    let records = perf::run_benchmarks(&plan, &mut ctx, &mut sampler).await.unwrap();

    let labels: Vec<(&str, usize)> = records
        .iter()
        .map(|r| (r.label.as_str(), r.object_count))
        .collect();
    assert_eq!(
        labels,
        vec![
            ("createMultipleProjects", 1),
            ("createMultipleProjects", 3),
            ("amendProjectPost", 1),
            ("amendProjectPost", 3),
            ("updateProjectPut", 1),
            ("updateProjectPut", 3),
            ("deleteMultipleProjects", 1),
            ("deleteMultipleProjects", 3),
        ]
    );
    // Steady probes give identical snapshots on both sides of each burst
    assert!(records.iter().all(|r| r.cpu_delta_percent == 0.0));
    assert!(records.iter().all(|r| r.memory_delta_bytes == 0));

    let content = fs::read_to_string(&plan.output).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), records.len() + 1);
    assert_eq!(lines[0], CSV_HEADER);
    assert!(lines[1].starts_with("createMultipleProjects,1,"));

    // Only objects from the create bursts remain
    assert_eq!(store.lock().unwrap().objects.len(), 4);
}

#[tokio::test]
async fn test_failing_workloads_leave_header_only() {
    let (base_url, _store) = start_service().await;
    let dir = tempdir().unwrap();
    // A nested collection path has no route, so every workload fails
    let plan = BenchPlan {
        resource: "projects/extra".to_string(),
        load_sizes: vec![2],
        sample_window: Duration::from_millis(20),
        output: dir.path().join("results.csv"),
    };
    let mut ctx = ScenarioContext::new(&base_url, RunSeed(1)).unwrap();
    let mut sampler = manual_sampler();

    let records = perf::run_benchmarks(&plan, &mut ctx, &mut sampler).await.unwrap();

    assert!(records.is_empty());
    assert_eq!(fs::read_to_string(&plan.output).unwrap().lines().count(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_suite_runs_every_discovered_scenario() {
    let dir = tempdir().unwrap();
    write_scenarios(
        dir.path(),
        &["todos/Create.feature", "todos/Broken.feature", "projects/Delete.feature", "notes.txt"],
    );

    let plan = SuitePlan::build(dir.path(), ".feature", RunSeed(12345), OrderPolicy::Shuffled).unwrap();
    assert_eq!(plan.order.len(), 3);

    let command = vec![
        "sh".to_string(),
        "-c".to_string(),
        r#"test -f "$0" && case "$0" in *Broken*) exit 1;; esac"#.to_string(),
    ];
    let mut engine = CommandEngine::new(&command, Duration::from_secs(10), false).unwrap();
    let fake = FakeBackend::new().healthy_after(2);
    let controller = LifecycleController::with_clock(
        HealthPolicy {
            max_attempts: 5,
            interval: Duration::from_millis(100),
            max_wait: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(1),
        },
        Arc::new(ManualClock::new()),
    );

    let report = testing::run_suite(&plan, &controller, Box::new(fake.clone()), &mut engine, "http://localhost:4567")
        .await
        .unwrap();

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.failed_count(), 1);
    let failed = report.results.iter().find(|r| !r.passed).unwrap();
    assert_eq!(failed.scenario.name(), "Broken.feature");
    assert_eq!(fake.starts(), 1);
    assert!(!fake.is_running());
}

#[tokio::test]
async fn test_same_seed_gives_same_plan() {
    let dir = tempdir().unwrap();
    let names: Vec<String> = (0..12).map(|i| format!("s{:02}.feature", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    write_scenarios(dir.path(), &refs);

    let a = SuitePlan::build(dir.path(), ".feature", RunSeed(99), OrderPolicy::Shuffled).unwrap();
    let b = SuitePlan::build(dir.path(), ".feature", RunSeed(99), OrderPolicy::Shuffled).unwrap();
    assert_eq!(a.order, b.order);

    let sorted = SuitePlan::build(dir.path(), ".feature", RunSeed(99), OrderPolicy::Sorted).unwrap();
    let mut expected = a.order.clone();
    expected.sort();
    assert_eq!(sorted.order, expected);
}

fn harness_bin() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_harness"));
    command.env("NO_COLOR", "1").env("CLICOLOR", "0").env_remove("RUST_LOG");
    command
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("harness.toml");
    fs::write(
        &path,
        "[service]\nexecutable = \"sh\"\n\n[scenarios]\nseed = 7\nengine = [\"sh\"]\n",
    )
    .unwrap();
    path
}

#[test]
fn test_order_command_is_reproducible() {
    let dir = tempdir().unwrap();
    let scenarios = dir.path().join("scenarios");
    write_scenarios(&scenarios, &["a.feature", "b.feature", "c.feature", "d.feature"]);
    let config = write_config(dir.path());

    let run = || {
        let output = harness_bin()
            .arg("--config")
            .arg(&config)
            .arg("order")
            .arg("--root")
            .arg(&scenarios)
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        String::from_utf8(output.stdout).unwrap()
    };

    let first = run();
    assert_eq!(first, run());
    assert!(first.contains("seed=7"));
    assert!(first.contains("a.feature"));
}

#[test]
fn test_run_without_scenarios_exits_non_zero() {
    let dir = tempdir().unwrap();
    let empty = dir.path().join("empty");
    fs::create_dir_all(&empty).unwrap();
    let config = write_config(dir.path());

    let output = harness_bin()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg("--root")
        .arg(&empty)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No scenarios found"), "stderr: {stderr}");
}
