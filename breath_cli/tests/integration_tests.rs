//! Integration tests for the breathe binary.
//!
//! These tests verify end-to-end behavior including:
//! - Catalog listing and custom catalog files
//! - Offline schedules and durations
//! - Live runs on the logical clock
//! - Persisted exercise selection

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI isolated from the user's config and data
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("breathe"));
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_DATA_HOME", dir.join("data"))
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn write_catalog(dir: &Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("exercises.json");
    fs::write(&path, json).expect("Failed to write catalog");
    path
}

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Guided breathing exercises"));
}

#[test]
fn test_list_builtin_exercises() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Box Breathing"))
        .stdout(predicate::str::contains("sigh"))
        .stdout(predicate::str::contains("open"));
}

#[test]
fn test_schedule_json() {
    let temp_dir = setup_test_dir();
    let output = cli(temp_dir.path())
        .args(["schedule", "box", "--loops", "1", "--json"])
        .output()
        .expect("Failed to run schedule");
    assert!(output.status.success());

    let schedule: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("schedule is JSON");
    let events = schedule["events"].as_array().expect("events array");
    assert_eq!(events.len(), 32);
    assert_eq!(events[0]["cue"], "inhale");
    assert_eq!(events[1]["cue"], "hold");
    assert_eq!(events[1]["time"], 4.0);
    assert_eq!(schedule["total_duration"], 128.0);
}

#[test]
fn test_schedule_with_delay() {
    let temp_dir = setup_test_dir();
    let catalog = write_catalog(
        temp_dir.path(),
        r#"[{"id": "ie", "name": "In Out", "seq": [
            {"type": "inhale", "count": 3},
            {"type": "exhale", "count": 2}
        ]}]"#,
    );

    cli(temp_dir.path())
        .arg("--catalog")
        .arg(&catalog)
        .args(["schedule", "ie", "--delay", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5.0s  inhale"))
        .stdout(predicate::str::contains("8.0s  exhale"))
        .stdout(predicate::str::contains("total 10.0s"));
}

#[test]
fn test_schedule_rejects_open_ended_exercise() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["schedule", "coherent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("open-ended"));
}

#[test]
fn test_duration_counts_repeats() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["duration", "sigh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("47.5s"));
}

#[test]
fn test_unknown_exercise() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["duration", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown exercise: nope"));
}

#[test]
fn test_invalid_catalog_rejected() {
    let temp_dir = setup_test_dir();
    let catalog = write_catalog(
        temp_dir.path(),
        r#"[
            {"id": "a", "name": "A", "seq": [{"type": "hold", "count": 1}]},
            {"id": "a", "name": "B", "seq": [{"type": "hold", "count": 1}]}
        ]"#,
    );

    cli(temp_dir.path())
        .arg("--catalog")
        .arg(&catalog)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Catalog validation error"));
}

#[test]
fn test_run_custom_exercise() {
    let temp_dir = setup_test_dir();
    let catalog = write_catalog(
        temp_dir.path(),
        r#"[{"id": "calm", "name": "Calm", "loopable": true, "seq": [
            {"type": "inhale", "count": 1},
            {"type": "exhale", "count": 1}
        ]}]"#,
    );

    cli(temp_dir.path())
        .arg("--catalog")
        .arg(&catalog)
        .args(["run", "calm", "--speed", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("inhale (01)"))
        .stdout(predicate::str::contains("cue: exhale"))
        .stdout(predicate::str::contains("done after 2.0s"));
}

#[test]
fn test_run_reports_repeats() {
    let temp_dir = setup_test_dir();
    let catalog = write_catalog(
        temp_dir.path(),
        r#"[{"id": "rep", "name": "Repeat", "seq": [
            {"type": "hold", "count": 1},
            {"type": "repeat", "value": [1], "count": 3},
            {"type": "text", "text": "Rest", "count": 1}
        ]}]"#,
    );

    cli(temp_dir.path())
        .arg("--catalog")
        .arg(&catalog)
        .args(["run", "rep", "--speed", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("repeat 2/3"))
        .stdout(predicate::str::contains("repeat 3/3"))
        .stdout(predicate::str::contains("repeat done"))
        .stdout(predicate::str::contains("\"Rest\" (01)"))
        .stdout(predicate::str::contains("done after 4.0s"));
}

#[test]
fn test_run_taps_open_ended_steps() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["run", "coherent", "--speed", "0", "--tap-after", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("inhale n° 1"))
        .stdout(predicate::str::contains("(tap)"));
}

#[test]
fn test_next_persists_selection() {
    let temp_dir = setup_test_dir();
    let selection = temp_dir.path().join("data").join("selection.json");

    cli(temp_dir.path())
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::contains("Selected 1: 4-7-8 Relaxing Breath"));
    assert!(selection.exists());

    cli(temp_dir.path())
        .args(["next", "--delta", "-3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Selected 3: Physiological Sigh"));

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&selection).unwrap()).unwrap();
    assert_eq!(saved["exercise_index"], 3);
}

#[test]
fn test_run_uses_persisted_selection() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path()).arg("next").assert().success();

    cli(temp_dir.path())
        .args(["run", "--speed", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4-7-8 Relaxing Breath"));
}

#[test]
fn test_corrupted_selection_falls_back() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("selection.json"), "{ not json").unwrap();

    cli(temp_dir.path())
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::contains("Selected 1:"));
}
