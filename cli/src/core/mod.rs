//! # Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! Foundational pieces used by every command:
//! - `config`: configuration loading, merging and validation
//! - `error`: the error type and `Result` alias
//!
pub mod config;
pub mod error;
