//! # Dockhand Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! Aggregates the top-level command groups of the Dockhand CLI and makes them
//! accessible to `main.rs`.
//!
//! ## Command Groups
//!
//! - `compose`: Docker Compose project verbs (`up`, `down`, `stop`, `restart`,
//!   `pull`, `build`, `ps`, `images`) and offline event classification.
//! - `container`: declarative single-container reconciliation (`apply`,
//!   `remove`).
//!
//! Each group defines its own arguments structure and handler. Subcommands
//! are declared within the group's `mod.rs`, not here.
//!
use crate::core::error::Result;
use anyhow::Context;
use serde::Serialize;

/// Command group driving a Docker Compose project.
pub mod compose;
/// Command group reconciling individual containers.
pub mod container;

/// Prints a command result as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize result as JSON")?;
    println!("{}", rendered);
    Ok(())
}
