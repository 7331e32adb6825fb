//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary HOME so the
//! config file and database start empty.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_intervals"))
        .args(args)
        .env("HOME", home)
        .env_remove("INTERVALS_ENV")
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("stdout is JSON")
}

#[test]
fn test_training_create_and_list() {
    let home = TempDir::new().unwrap();
    let created = json(&run_ok(home.path(), &["training", "create", "Legs", "--time", "40"]));
    assert_eq!(created["name"], "Legs");
    assert_eq!(created["default_time_secs"], 40);
    assert_eq!(created["default_rest_secs"], 10);

    let listed = json(&run_ok(home.path(), &["training", "list", "--json"]));
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], created["id"]);
}

#[test]
fn test_exercise_editing() {
    let home = TempDir::new().unwrap();
    run_ok(home.path(), &["training", "create", "Core"]);
    run_ok(home.path(), &["exercise", "add", "Core", "Plank", "--time", "60"]);
    run_ok(home.path(), &["exercise", "add", "Core", "Crunches", "--icon", "sit_up"]);
    run_ok(home.path(), &["exercise", "duplicate", "Core", "1"]);
    run_ok(home.path(), &["exercise", "move", "Core", "3", "1"]);

    let shown = json(&run_ok(home.path(), &["training", "show", "Core", "--json"]));
    let names: Vec<&str> = shown["exercises"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Crunches", "Plank", "Plank"]);
    assert_eq!(shown["exercises"][0]["icon"], "sit_up");
    assert_eq!(shown["total_time_secs"], 70 + 70 + 40);

    run_ok(home.path(), &["exercise", "remove", "Core", "2"]);
    let shown = json(&run_ok(home.path(), &["training", "show", "Core", "--json"]));
    assert_eq!(shown["exercises"].as_array().unwrap().len(), 2);

    let (_, stderr, code) = run_cli(home.path(), &["exercise", "move", "Core", "1", "9"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("out of bounds"), "{stderr}");
}

#[test]
fn test_training_duplicate_and_delete() {
    let home = TempDir::new().unwrap();
    run_ok(home.path(), &["training", "create", "Arms"]);
    run_ok(home.path(), &["exercise", "add", "Arms", "Curls"]);
    let copy = json(&run_ok(home.path(), &["training", "duplicate", "Arms"]));
    assert_eq!(copy["name"], "Arms (copy)");
    assert_eq!(copy["total_time_secs"], 40);

    run_ok(home.path(), &["training", "delete", "Arms"]);
    let listed = json(&run_ok(home.path(), &["training", "list", "--json"]));
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "Arms (copy)");
}

#[test]
fn test_unknown_training_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["training", "show", "Nope"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"), "{stderr}");
}

#[test]
fn test_config_get_and_set() {
    let home = TempDir::new().unwrap();
    assert_eq!(run_ok(home.path(), &["config", "get", "playback.countdown_to_change"]).trim(), "3");
    run_ok(home.path(), &["config", "set", "sounds.rest_start", "false"]);
    assert_eq!(run_ok(home.path(), &["config", "get", "sounds.rest_start"]).trim(), "false");

    let (_, _, code) = run_cli(home.path(), &["config", "set", "playback.volume", "3"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(home.path(), &["config", "get", "nope"]);
    assert_eq!(code, 1);
}

#[test]
fn test_play_records_session() {
    let home = TempDir::new().unwrap();
    run_ok(home.path(), &["config", "set", "playback.training_start_delay_secs", "0"]);
    run_ok(home.path(), &["training", "create", "Quick"]);
    run_ok(home.path(), &["exercise", "add", "Quick", "Hop", "--time", "1", "--rest", "0"]);

    let stdout = run_ok(home.path(), &["play", "Quick", "--json", "--mute"]);
    let kinds: Vec<String> = stdout
        .lines()
        .map(|l| json(l)["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds.first().map(String::as_str), Some("training_started"));
    assert_eq!(kinds.last().map(String::as_str), Some("training_completed"));
    assert!(kinds.iter().any(|k| k == "exercise_started"));

    let stats = json(&run_ok(home.path(), &["stats", "--training", "Quick", "--json"]));
    assert_eq!(stats["sessions"], 1);
    assert_eq!(stats["completed"], 1);
}

#[test]
fn test_play_restart_after_completion() {
    let home = TempDir::new().unwrap();
    run_ok(home.path(), &["config", "set", "playback.training_start_delay_secs", "0"]);
    run_ok(home.path(), &["training", "create", "Again"]);
    run_ok(home.path(), &["exercise", "add", "Again", "Hop", "--time", "1", "--rest", "0"]);

    let mut child = Command::new(env!("CARGO_BIN_EXE_intervals"))
        .args(["play", "Again", "--json", "--mute"])
        .env("HOME", home.path())
        .env_remove("INTERVALS_ENV")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to spawn play");
    let mut stdin = child.stdin.take().unwrap();
    let stdout = BufReader::new(child.stdout.take().unwrap());

    let mut kinds = Vec::new();
    for line in stdout.lines() {
        let kind = json(&line.unwrap())["type"].as_str().unwrap().to_string();
        let done = kind == "training_completed";
        kinds.push(kind);
        if done {
            let completions = kinds.iter().filter(|k| *k == "training_completed").count();
            if completions == 1 {
                stdin.write_all(b"r\n").unwrap();
                stdin.flush().unwrap();
            } else {
                break;
            }
        }
    }
    // Closing stdin lets a finished playback exit.
    drop(stdin);
    assert!(child.wait().unwrap().success());

    let count = |kind: &str| kinds.iter().filter(|k| *k == kind).count();
    assert_eq!(count("training_started"), 2);
    assert_eq!(count("restarted"), 1);
    assert_eq!(count("training_completed"), 2);

    let stats = json(&run_ok(home.path(), &["stats", "--training", "Again", "--json"]));
    assert_eq!(stats["sessions"], 2);
    assert_eq!(stats["completed"], 2);
}

#[test]
fn test_play_empty_training_fails() {
    let home = TempDir::new().unwrap();
    run_ok(home.path(), &["training", "create", "Empty"]);
    let (_, stderr, code) = run_cli(home.path(), &["play", "Empty", "--mute"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no exercises"), "{stderr}");
}

#[test]
fn test_stats_empty() {
    let home = TempDir::new().unwrap();
    let stats = json(&run_ok(home.path(), &["stats", "--json", "--from", "2024-01-01"]));
    assert_eq!(stats["sessions"], 0);
    assert_eq!(stats["total_secs"], 0);
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    let script = run_ok(home.path(), &["completions", "bash"]);
    assert!(script.contains("intervals"));
}
