//! # Dockhand CLI Main Integration Tests
//!
//! File: cli/tests/main_tests.rs
//!
//! ## Overview
//!
//! Top-level behaviour of the `dockhand` binary: `--help`, `--version`, the
//! `help` subcommand and rejection of unknown commands.
//!

mod common;
use common::*;
use predicates::prelude::*;

#[test]
fn test_help_flag() {
    dockhand_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compose"))
        .stdout(predicate::str::contains("container"));
}

#[test]
fn test_version_flag() {
    dockhand_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_subcommand_version_is_propagated() {
    dockhand_cmd()
        .args(["compose", "--version"])
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_subcommand() {
    dockhand_cmd()
        .args(["help", "container"])
        .assert()
        .success()
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("remove"));
}

#[test]
fn test_missing_command_fails() {
    dockhand_cmd().assert().failure();
}

#[test]
fn test_unknown_command_fails() {
    dockhand_cmd()
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
