//! # Dockhand CLI Compose Integration Tests
//!
//! File: cli/tests/compose.rs
//!
//! ## Overview
//!
//! Integration tests for `dockhand compose`. The `events` subcommand needs no
//! Docker installation and is exercised end to end against captured stderr in
//! `tests/fixtures/`. Verbs that run Compose are only checked for argument
//! validation; a live run is left to the ignored test at the bottom.
//!

mod common;
use common::*;
use predicates::prelude::*;

#[test]
fn test_events_text_reports_changes() {
    let dir = workspace();
    isolated_cmd(dir.path())
        .args(["compose", "events"])
        .arg(fixture("compose_up.txt"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"changed\": true"))
        .stdout(predicate::str::contains("\"failed\": false"))
        .stdout(predicate::str::contains("demo-web-1"))
        .stdout(predicate::str::contains("demo_default"));
}

#[test]
fn test_events_running_only_is_unchanged() {
    let dir = workspace();
    isolated_cmd(dir.path())
        .args(["compose", "events"])
        .arg(fixture("compose_noop.txt"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"changed\": false"));
}

#[test]
fn test_events_json_failure_is_reported_not_raised() {
    let dir = workspace();
    isolated_cmd(dir.path())
        .args(["compose", "events", "--format", "json", "--rc", "1"])
        .arg(fixture("compose_error.jsonl"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"failed\": true"))
        .stdout(predicate::str::contains(
            "Error when processing container demo-db-1: port is already allocated",
        ));
}

#[test]
fn test_events_from_stdin() {
    let dir = workspace();
    isolated_cmd(dir.path())
        .args(["compose", "events", "-"])
        .write_stdin(" Container demo-web-1  Stopping\n Container demo-web-1  Stopped\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"changed\": true"));
}

#[test]
fn test_events_missing_input_fails() {
    let dir = workspace();
    isolated_cmd(dir.path())
        .args(["compose", "events", "does-not-exist.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read Compose output"));
}

#[test]
fn test_up_wait_timeout_requires_wait() {
    let dir = workspace();
    isolated_cmd(dir.path())
        .args(["compose", "up", "--wait-timeout", "30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--wait"));
}

#[test]
fn test_up_rejects_malformed_scale() {
    let dir = workspace();
    isolated_cmd(dir.path())
        .args(["compose", "up", "--scale", "web"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_project_config_fails_before_compose_runs() {
    let dir = workspace();
    std::fs::write(dir.path().join(".dockhand.toml"), "[docker]\nengine = \"podman\"\n").unwrap();
    isolated_cmd(dir.path())
        .args(["compose", "ps"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(".dockhand.toml"));
}

/// Requires Docker with the Compose v2 plugin.
#[test]
#[ignore]
fn test_compose_ps_live() {
    let dir = workspace();
    std::fs::write(
        dir.path().join("compose.yaml"),
        "services:\n  idle:\n    image: alpine:3\n    command: sleep 60\n",
    )
    .unwrap();
    isolated_cmd(dir.path())
        .args(["compose", "--project-src"])
        .arg(dir.path())
        .arg("ps")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["));
}
