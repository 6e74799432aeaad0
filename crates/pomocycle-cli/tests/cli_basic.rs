//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs. Each run
//! gets its own HOME so config files never touch the real profile.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "pomocycle-cli", "--"])
        .args(args)
        .env("HOME", home)
        .env_remove("POMOCYCLE_ENV")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_config_list_has_schedule_defaults() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0, "config list failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["schedule"]["focus_duration"], 25);
    assert_eq!(parsed["schedule"]["long_break_interval"], 4);
}

#[test]
fn test_config_set_then_get() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(home.path(), &["config", "set", "schedule.long_break_interval", "2"]);
    assert_eq!(code, 0, "config set failed");

    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "schedule.long_break_interval"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "2");
}

#[test]
fn test_config_rejects_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "schedule.nap"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown key"));

    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "schedule.tick_seconds", "0"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("pomocycle"));
}

#[test]
fn test_run_two_phases_json() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(
        home.path(),
        &[
            "run", "--focus", "1s", "--short", "1s", "--tick", "500ms", "--poll", "20ms",
            "--phases", "2", "--json",
        ],
    );
    assert_eq!(code, 0, "run failed: {stderr}");

    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let boundaries: Vec<(String, String)> = events
        .iter()
        .filter(|e| e["event"] != "tick")
        .map(|e| {
            (
                e["event"].as_str().unwrap().to_string(),
                e["phase"].as_str().unwrap().to_string(),
            )
        })
        .collect();

    let expected = [
        ("start", "focus"),
        ("expire", "focus"),
        ("start", "short-break"),
        ("expire", "short-break"),
        ("start", "focus"),
        ("stop", "focus"),
    ];
    let expected: Vec<(String, String)> = expected
        .iter()
        .map(|(e, p)| (e.to_string(), p.to_string()))
        .collect();
    assert_eq!(boundaries, expected);
    assert!(events.iter().any(|e| e["event"] == "tick"));
}

#[test]
fn test_run_rejects_bad_duration() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(home.path(), &["run", "--focus", "soon"]);
    assert_ne!(code, 0);
}
