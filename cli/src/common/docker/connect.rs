//! # Docker Connection Helper
//!
//! File: cli/src/common/docker/connect.rs
//!
//! ## Overview
//!
//! Opens the `bollard` client used by [`super::api::ApiEngine`]. The local
//! defaults honour `DOCKER_HOST` and otherwise use the platform socket
//! (`/var/run/docker.sock` on Unix, the named pipe on Windows).
//!
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use bollard::Docker;
use tracing::{debug, instrument};

/// Connects to the Docker daemon and checks that it answers.
///
/// # Errors
///
/// `DockhandError::DockerApi` when the client cannot be built or the daemon
/// does not respond to a ping.
#[instrument]
pub async fn connect_docker() -> Result<Docker> {
    let docker = Docker::connect_with_local_defaults()
        .map_err(|e| anyhow!(DockhandError::DockerApi { source: e }))
        .context("Failed to connect to Docker daemon. Is it running and accessible?")?;
    docker
        .ping()
        .await
        .map_err(|e| anyhow!(DockhandError::DockerApi { source: e }))
        .context("Docker daemon did not answer. Is it running and accessible?")?;
    debug!("Connected to Docker daemon");
    Ok(docker)
}
