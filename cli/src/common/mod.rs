//! # Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! Shared building blocks used by the command handlers:
//!
//! - **`process`**: running external programs behind the `CommandRunner` seam.
//! - **`compose`**: Docker Compose event parsing and invocation.
//! - **`docker`**: container engine backends (Engine API and CLI).
//! - **`container`**: single-container specs and the reconciler.
//!

/// Docker Compose parsing, classification and invocation.
pub mod compose;
/// Declarative container specs and reconciliation.
pub mod container;
/// Container engine backends.
pub mod docker;
/// External process execution.
pub mod process;
