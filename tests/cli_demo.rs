//! CLI integration tests for the simulation and benchmark modes.

use std::process::Command;

fn summary_value<'a>(stdout: &'a str, key: &str) -> &'a str {
    let prefix = format!("{key}=");
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .unwrap_or_else(|| panic!("{key} line missing"))
        .trim()
}

fn run(args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_estoresim");
    Command::new(bin)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run simulator binary")
}

#[test]
fn coarse_run_drains_both_queues() {
    let output = run(&[
        "--suppliers", "4", "--customers", "5", "--requests", "80", "--capacity", "12", "--seed",
        "1",
    ]);
    assert!(
        output.status.success(),
        "simulation exited with non-zero status: {:?}",
        output.status
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("SIMULATION SUMMARY"), "summary missing from output");
    assert_eq!(summary_value(&stdout, "discipline"), "coarse");
    // Every generated request runs exactly once and every worker sees one sentinel.
    assert_eq!(summary_value(&stdout, "tasks_executed"), "160");
    assert_eq!(summary_value(&stdout, "shutdowns_observed"), "9");
    assert_eq!(summary_value(&stdout, "orders_committed"), "0");
    assert_eq!(summary_value(&stdout, "leftover_tasks"), "0");
}

#[test]
fn fine_flag_switches_discipline() {
    let output = run(&["--fine", "--requests", "50", "--seed", "2"]);
    assert!(output.status.success(), "fine run failed: {:?}", output.status);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(summary_value(&stdout, "discipline"), "fine");
    assert_eq!(summary_value(&stdout, "tasks_executed"), "100");
    assert_eq!(summary_value(&stdout, "shutdowns_observed"), "20");
    assert_eq!(summary_value(&stdout, "leftover_tasks"), "0");
}

#[test]
fn bench_prints_one_row_per_discipline() {
    let output = run(&["bench", "--suppliers", "2", "--customers", "2", "--requests", "20"]);
    assert!(output.status.success(), "bench failed: {:?}", output.status);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "unexpected bench output: {stdout}");
    assert!(lines[0].starts_with("discipline,"));
    assert!(lines[1].starts_with("coarse,2,2,20,40,"));
    assert!(lines[2].starts_with("fine,2,2,20,40,"));
}

#[test]
fn invalid_arguments_exit_with_usage() {
    let output = run(&["--suppliers", "0"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("suppliers must be > 0"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
}
