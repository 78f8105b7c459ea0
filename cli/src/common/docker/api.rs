//! # Engine API Backend
//!
//! File: cli/src/common/docker/api.rs
//!
//! ## Overview
//!
//! [`ContainerEngine`] over the Docker Engine HTTP API via `bollard`.
//!
//! Create payloads are built as Engine API JSON and deserialised into bollard's
//! `Config`; update payloads are copied field by field into
//! `UpdateContainerOptions`, which bollard only serialises. Inspection results
//! are converted back to JSON. The daemon's status codes map as follows:
//!
//! * `404` on an inspection is `Ok(None)`, elsewhere `ContainerNotFound`.
//! * `304` (already started / already stopped) is success.
//! * Any other server error goes through
//!   [`DockhandError::from_daemon_message`] so the reconciler can recognise
//!   the paused-container and removal-in-progress races.
//!
use super::connect::connect_docker;
use super::engine::{ContainerEngine, CreateRequest, EndpointRequest, RemoveOptions, UpdateRequest};
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, KillContainerOptions,
    RemoveContainerOptions, RestartContainerOptions, StartContainerOptions, StopContainerOptions,
    UpdateContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{EndpointSettings, RestartPolicy, RestartPolicyNameEnum};
use bollard::network::{ConnectNetworkOptions, DisconnectNetworkOptions, InspectNetworkOptions};
use bollard::Docker;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

fn update_field_error(key: &str, value: i64) -> anyhow::Error {
    anyhow!(DockhandError::Config(format!(
        "Update value for {} is out of range: {}",
        key, value
    )))
}

/// Copies the in-place updatable keys of an Engine API update body into
/// bollard's options.
fn update_options(payload: &Value) -> Result<UpdateContainerOptions<String>> {
    let int = |key: &str| payload.get(key).and_then(Value::as_i64);
    let text = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);

    let cpu_shares = int("CpuShares")
        .map(|v| isize::try_from(v).map_err(|_| update_field_error("CpuShares", v)))
        .transpose()?;
    let blkio_weight = int("BlkioWeight")
        .map(|v| u16::try_from(v).map_err(|_| update_field_error("BlkioWeight", v)))
        .transpose()?;
    let restart_policy = match payload.get("RestartPolicy") {
        None => None,
        Some(policy) => {
            let name = policy
                .get("Name")
                .and_then(Value::as_str)
                .map(|name| name.parse::<RestartPolicyNameEnum>())
                .transpose()
                .map_err(|e| {
                    anyhow!(DockhandError::Config(format!("Invalid restart policy: {}", e)))
                })?;
            Some(RestartPolicy {
                name,
                maximum_retry_count: policy.get("MaximumRetryCount").and_then(Value::as_i64),
            })
        }
    };

    Ok(UpdateContainerOptions {
        memory: int("Memory"),
        memory_reservation: int("MemoryReservation"),
        memory_swap: int("MemorySwap"),
        cpu_shares,
        nano_cpus: int("NanoCpus"),
        cpu_period: int("CpuPeriod"),
        cpu_quota: int("CpuQuota"),
        cpuset_cpus: text("CpusetCpus"),
        cpuset_mems: text("CpusetMems"),
        blkio_weight,
        pids_limit: int("PidsLimit"),
        restart_policy,
        ..Default::default()
    })
}

pub struct ApiEngine {
    docker: Docker,
}

/// Maps a bollard failure on `target` into the crate's error kinds.
fn daemon_error(target: &str, err: BollardError) -> anyhow::Error {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => anyhow!(DockhandError::ContainerNotFound {
            name: target.to_string()
        }),
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } => anyhow!(DockhandError::from_daemon_message(target, status_code, &message)),
        other => anyhow!(DockhandError::DockerApi { source: other }),
    }
}

/// `Ok(None)` for a 404, the value otherwise.
fn found<T: Serialize>(target: &str, outcome: std::result::Result<T, BollardError>) -> Result<Option<Value>> {
    match outcome {
        Ok(inspection) => Ok(Some(
            serde_json::to_value(inspection).context("Failed to serialize inspection result")?,
        )),
        Err(BollardError::DockerResponseServerError {
            status_code: 404, ..
        }) => Ok(None),
        Err(e) => Err(daemon_error(target, e)),
    }
}

/// Treats "Not Modified" as success.
fn unchanged_ok(target: &str, outcome: std::result::Result<(), BollardError>) -> Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(BollardError::DockerResponseServerError {
            status_code: 304, ..
        }) => {
            debug!("Container '{}' already in the requested state", target);
            Ok(())
        }
        Err(e) => Err(daemon_error(target, e)),
    }
}

impl ApiEngine {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    pub async fn connect() -> Result<Self> {
        Ok(Self::new(connect_docker().await?))
    }
}

#[async_trait]
impl ContainerEngine for ApiEngine {
    fn name(&self) -> &'static str {
        "api"
    }

    #[instrument(skip(self))]
    async fn inspect_container(&self, name: &str) -> Result<Option<Value>> {
        let outcome = self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await;
        found(name, outcome)
    }

    #[instrument(skip(self))]
    async fn inspect_image(&self, reference: &str) -> Result<Option<Value>> {
        found(reference, self.docker.inspect_image(reference).await)
    }

    #[instrument(skip(self))]
    async fn inspect_network(&self, name: &str) -> Result<Option<Value>> {
        let outcome = self
            .docker
            .inspect_network(name, None::<InspectNetworkOptions<String>>)
            .await;
        found(name, outcome)
    }

    #[instrument(skip(self))]
    async fn pull_image(&self, repository: &str, tag: &str) -> Result<()> {
        info!("Pulling image {}:{}", repository, tag);
        let options = CreateImageOptions {
            from_image: repository.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            match progress {
                Ok(info) => {
                    if let Some(status) = info.status {
                        debug!("{}", status);
                    }
                }
                Err(e) => {
                    warn!("Pull of {}:{} failed: {}", repository, tag, e);
                    return Err(daemon_error(repository, e))
                        .with_context(|| format!("Error pulling image {}:{}", repository, tag));
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(container = %request.name))]
    async fn create_container(&self, request: &CreateRequest) -> Result<String> {
        let config: Config<String> = serde_json::from_value(request.payload.clone())
            .context("Create payload does not match the Engine API schema")?;
        let options = CreateContainerOptions {
            name: request.name.clone(),
            platform: None,
        };
        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| daemon_error(&request.name, e))?;
        for warning in &response.warnings {
            warn!("Docker: {}", warning);
        }
        Ok(response.id)
    }

    #[instrument(skip(self, request))]
    async fn update_container(&self, id: &str, request: &UpdateRequest) -> Result<()> {
        let options = update_options(&request.payload)?;
        self.docker
            .update_container(id, options)
            .await
            .map_err(|e| daemon_error(id, e))
    }

    #[instrument(skip(self))]
    async fn start(&self, id: &str) -> Result<()> {
        let outcome = self
            .docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await;
        unchanged_ok(id, outcome)
    }

    #[instrument(skip(self))]
    async fn stop(&self, id: &str, timeout: Option<u32>) -> Result<()> {
        let options = timeout.map(|t| StopContainerOptions { t: i64::from(t) });
        unchanged_ok(id, self.docker.stop_container(id, options).await)
    }

    #[instrument(skip(self))]
    async fn restart(&self, id: &str, timeout: Option<u32>) -> Result<()> {
        let options = timeout.map(|t| RestartContainerOptions { t: t as isize });
        self.docker
            .restart_container(id, options)
            .await
            .map_err(|e| daemon_error(id, e))
    }

    #[instrument(skip(self))]
    async fn kill(&self, id: &str, signal: Option<&str>) -> Result<()> {
        let options = signal.map(|s| KillContainerOptions { signal: s.to_string() });
        self.docker
            .kill_container(id, options)
            .await
            .map_err(|e| daemon_error(id, e))
    }

    #[instrument(skip(self))]
    async fn pause(&self, id: &str) -> Result<()> {
        self.docker
            .pause_container(id)
            .await
            .map_err(|e| daemon_error(id, e))
    }

    #[instrument(skip(self))]
    async fn unpause(&self, id: &str) -> Result<()> {
        self.docker
            .unpause_container(id)
            .await
            .map_err(|e| daemon_error(id, e))
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: &str, options: RemoveOptions) -> Result<()> {
        let options = RemoveContainerOptions {
            v: options.volumes,
            force: options.force,
            link: false,
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| daemon_error(id, e))
    }

    #[instrument(skip(self, endpoint))]
    async fn connect_network(&self, container: &str, network: &str, endpoint: &EndpointRequest) -> Result<()> {
        let endpoint_config: EndpointSettings = serde_json::from_value(endpoint.to_api())
            .context("Endpoint settings do not match the Engine API schema")?;
        let options = ConnectNetworkOptions {
            container: container.to_string(),
            endpoint_config,
        };
        self.docker
            .connect_network(network, options)
            .await
            .map_err(|e| daemon_error(container, e))
    }

    #[instrument(skip(self))]
    async fn disconnect_network(&self, container: &str, network: &str) -> Result<()> {
        let options = DisconnectNetworkOptions {
            container: container.to_string(),
            force: false,
        };
        self.docker
            .disconnect_network(network, options)
            .await
            .map_err(|e| daemon_error(container, e))
    }
}
