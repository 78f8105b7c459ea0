//! # Docker Backends
//!
//! File: cli/src/common/docker/mod.rs
//!
//! ## Overview
//!
//! Everything the container reconciler needs from Docker, behind the
//! [`engine::ContainerEngine`] trait:
//!
//! - **`engine`**: the trait, request types and image reference helpers.
//! - **`api`**: Engine HTTP API backend (`bollard`).
//! - **`cli`**: `docker` command-line backend.
//! - **`connect`**: opening the `bollard` client.
//!
//! [`open_engine`] picks the backend from the configuration.
//!
use crate::common::process::SystemRunner;
use crate::core::config::{Config, EngineKind};
use crate::core::error::Result;
use std::sync::Arc;
use tracing::info;

pub mod api;
pub mod cli;
pub mod connect;
pub mod engine;
#[cfg(test)]
pub(crate) mod fake;

pub use engine::ContainerEngine;

/// Opens the backend selected by `kind`.
pub async fn open_engine(kind: EngineKind, config: &Config) -> Result<Box<dyn ContainerEngine>> {
    info!("Using the {:?} container engine", kind);
    Ok(match kind {
        EngineKind::Api => Box::new(api::ApiEngine::connect().await?),
        EngineKind::Cli => Box::new(cli::CliEngine::new(
            Arc::new(SystemRunner),
            config.docker.cli.clone(),
        )),
    })
}
