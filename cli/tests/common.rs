//! # Dockhand CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration test crates in `cli/tests/`. Each test
//! file declares `mod common;` and runs the compiled `dockhand` binary.
//!
//! Commands run inside an isolated directory with `HOME` and
//! `XDG_CONFIG_HOME` pointed at it, so neither a user configuration nor a
//! `.dockhand.toml` from the surrounding checkout leaks into the tests.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Command pointing at the compiled `dockhand` binary.
pub fn dockhand_cmd() -> Command {
    Command::cargo_bin("dockhand").expect("Failed to find dockhand binary for testing")
}

/// Command running inside `dir`, isolated from user and project configuration.
pub fn isolated_cmd(dir: &Path) -> Command {
    let mut cmd = dockhand_cmd();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

/// Scratch directory marked as a repository root, so the project config
/// search stops inside it.
pub fn workspace() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::create_dir(dir.path().join(".git")).expect("Failed to create .git marker");
    dir
}

/// Path of a file under `cli/tests/fixtures/`.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
