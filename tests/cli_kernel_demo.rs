use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "cloudsim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn run_demo(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kernel_demo"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run kernel_demo")
}

fn count_cloudlet_lines(stdout: &str) -> usize {
    stdout
        .lines()
        .filter(|line| line.starts_with("cloudlet "))
        .count()
}

#[test]
fn kernel_demo_runs_default_scenario_to_completion() {
    let out = run_demo(&[]);
    assert!(
        out.status.success(),
        "kernel_demo failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(count_cloudlet_lines(&stdout), 3, "stdout: {stdout}");
    assert!(stdout.contains("cloudlet id=2 submitted=4.00 finish=6.00"));
    assert!(stdout.contains("done @ 10.00, reason=Natural"), "stdout: {stdout}");
}

#[test]
fn kernel_demo_terminate_at_stops_exactly() {
    let out = run_demo(&["--terminate-at", "8"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("done @ 8.00, reason=TerminatedAt"), "stdout: {stdout}");
    assert!(stdout.contains("finished_cloudlets=2"), "stdout: {stdout}");
}

#[test]
fn kernel_demo_pause_at_is_reported_and_resumed() {
    let out = run_demo(&["--pause-at", "3.5"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("paused @ 3.50"), "stdout: {stdout}");
    assert!(stdout.contains("done @ 10.00"), "stdout: {stdout}");
    assert_eq!(count_cloudlet_lines(&stdout), 3);
}

#[test]
fn kernel_demo_writes_trace_json() {
    let dir = unique_temp_dir("kernel-demo-trace");
    let scenario = write_file(
        &dir,
        "scenario.json",
        r#"
{
  "mips": 500,
  "scheduling_interval": 0.5,
  "cloudlets": [
    { "id": 1, "length": 1000 },
    { "id": 2, "length": 500, "submit_delay": 1.0 }
  ]
}
"#,
    );
    let trace = dir.join("trace.json");

    let out = run_demo(&[
        "--scenario",
        scenario.to_str().expect("utf8 path"),
        "--trace-json",
        trace.to_str().expect("utf8 path"),
    ]);
    assert!(
        out.status.success(),
        "kernel_demo failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(count_cloudlet_lines(&stdout), 2, "stdout: {stdout}");

    let raw = fs::read_to_string(&trace).expect("read trace");
    let json: Value = serde_json::from_str(&raw).expect("parse trace");
    let records = json.as_array().expect("trace is an array");
    assert!(!records.is_empty());
    assert_eq!(records[0]["kind"], "send");
    assert_eq!(records[0]["dst_name"], "datacenter0");
    assert!(records.iter().any(|r| r["tag"] == -1));
}

#[test]
fn kernel_demo_rejects_invalid_scenario() {
    let dir = unique_temp_dir("kernel-demo-invalid");
    let scenario = write_file(&dir, "scenario.json", r#"{ "mips": 0 }"#);

    let out = run_demo(&["--scenario", scenario.to_str().expect("utf8 path")]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("mips must be positive"), "stderr: {stderr}");
}
