//! # Docker CLI Backend
//!
//! File: cli/src/common/docker/cli.rs
//!
//! ## Overview
//!
//! [`ContainerEngine`] implemented by running the `docker` client through a
//! [`CommandRunner`]. Inspections parse the JSON array printed by
//! `docker ... inspect`; a "No such ..." failure becomes `Ok(None)`.
//!
//! Failures are classified from stderr after stripping the
//! `Error response from daemon:` prefix, so the same race variants surface as
//! with the API backend. The CLI exposes no HTTP status; the exit code is
//! reported instead.
//!
use super::engine::{ContainerEngine, CreateRequest, EndpointRequest, RemoveOptions, UpdateRequest};
use crate::common::process::{quote_command, CommandOutput, CommandRunner};
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const DAEMON_PREFIX: &str = "Error response from daemon:";

pub struct CliEngine {
    runner: Arc<dyn CommandRunner>,
    docker_cli: String,
}

fn is_missing(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("no such container")
        || lower.contains("no such object")
        || lower.contains("no such image")
        || lower.contains("no such network")
        || lower.contains("not found")
}

fn args<const N: usize>(words: [&str; N]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl CliEngine {
    pub fn new(runner: Arc<dyn CommandRunner>, docker_cli: impl Into<String>) -> Self {
        Self {
            runner,
            docker_cli: docker_cli.into(),
        }
    }

    async fn docker(&self, args: &[String]) -> Result<CommandOutput> {
        self.runner.run(&self.docker_cli, args, None).await
    }

    /// Runs a mutating command; non-zero exits become classified errors.
    async fn mutate(&self, target: &str, args: Vec<String>) -> Result<CommandOutput> {
        let output = self.docker(&args).await?;
        if output.success() {
            return Ok(output);
        }
        Err(self.classify(target, &args, &output))
    }

    fn classify(&self, target: &str, args: &[String], output: &CommandOutput) -> anyhow::Error {
        let message = output
            .stderr
            .lines()
            .map(|l| l.trim_start_matches(DAEMON_PREFIX).trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if message.to_lowercase().contains("no such container") {
            return anyhow!(DockhandError::ContainerNotFound {
                name: target.to_string()
            });
        }
        let status = u16::try_from(output.rc).unwrap_or(u16::MAX);
        anyhow!(DockhandError::from_daemon_message(target, status, &message))
            .context(format!("'{}' failed", quote_command(&self.docker_cli, args)))
    }

    async fn inspect(&self, kind: &str, target: &str) -> Result<Option<Value>> {
        let args = args([kind, "inspect", target]);
        let output = self.docker(&args).await?;
        if !output.success() {
            if is_missing(&output.stderr) {
                debug!("{} {} does not exist", kind, target);
                return Ok(None);
            }
            return Err(self.classify(target, &args, &output));
        }
        let parsed: Value = serde_json::from_str(&output.stdout).map_err(|e| {
            anyhow!(DockhandError::Parse {
                what: quote_command(&self.docker_cli, &args),
                message: e.to_string(),
            })
        })?;
        Ok(match parsed {
            Value::Array(mut items) if !items.is_empty() => Some(items.swap_remove(0)),
            Value::Array(_) => None,
            other => Some(other),
        })
    }

    fn with_timeout(mut args: Vec<String>, timeout: Option<u32>, id: &str) -> Vec<String> {
        if let Some(t) = timeout {
            args.extend(["--time".to_string(), t.to_string()]);
        }
        args.push(id.to_string());
        args
    }
}

#[async_trait]
impl ContainerEngine for CliEngine {
    fn name(&self) -> &'static str {
        "cli"
    }

    async fn inspect_container(&self, name: &str) -> Result<Option<Value>> {
        self.inspect("container", name).await
    }

    async fn inspect_image(&self, reference: &str) -> Result<Option<Value>> {
        self.inspect("image", reference).await
    }

    async fn inspect_network(&self, name: &str) -> Result<Option<Value>> {
        self.inspect("network", name).await
    }

    #[instrument(skip(self))]
    async fn pull_image(&self, repository: &str, tag: &str) -> Result<()> {
        let reference = if tag.is_empty() {
            repository.to_string()
        } else {
            format!("{}:{}", repository, tag)
        };
        self.mutate(&reference, args(["image", "pull", &reference]))
            .await
            .with_context(|| format!("Error pulling image {}", reference))?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(container = %request.name))]
    async fn create_container(&self, request: &CreateRequest) -> Result<String> {
        let mut command = args(["container", "create", "--name", &request.name]);
        command.extend(request.cli_args.iter().cloned());
        let output = self.mutate(&request.name, command).await?;
        for line in output.stderr.lines().filter(|l| l.to_lowercase().contains("warning")) {
            warn!("Docker: {}", line.trim());
        }
        output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow!(DockhandError::Parse {
                    what: "docker container create".to_string(),
                    message: "no container ID printed".to_string(),
                })
            })
    }

    async fn update_container(&self, id: &str, request: &UpdateRequest) -> Result<()> {
        let mut command = args(["container", "update"]);
        command.extend(request.cli_args.iter().cloned());
        command.push(id.to_string());
        self.mutate(id, command).await.map(drop)
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.mutate(id, args(["container", "start", id])).await.map(drop)
    }

    async fn stop(&self, id: &str, timeout: Option<u32>) -> Result<()> {
        let command = Self::with_timeout(args(["container", "stop"]), timeout, id);
        self.mutate(id, command).await.map(drop)
    }

    async fn restart(&self, id: &str, timeout: Option<u32>) -> Result<()> {
        let command = Self::with_timeout(args(["container", "restart"]), timeout, id);
        self.mutate(id, command).await.map(drop)
    }

    async fn kill(&self, id: &str, signal: Option<&str>) -> Result<()> {
        let mut command = args(["container", "kill"]);
        if let Some(signal) = signal {
            command.extend(["--signal".to_string(), signal.to_string()]);
        }
        command.push(id.to_string());
        self.mutate(id, command).await.map(drop)
    }

    async fn pause(&self, id: &str) -> Result<()> {
        self.mutate(id, args(["container", "pause", id])).await.map(drop)
    }

    async fn unpause(&self, id: &str) -> Result<()> {
        self.mutate(id, args(["container", "unpause", id])).await.map(drop)
    }

    async fn remove(&self, id: &str, options: RemoveOptions) -> Result<()> {
        let mut command = args(["container", "rm"]);
        if options.volumes {
            command.push("--volumes".to_string());
        }
        if options.force {
            command.push("--force".to_string());
        }
        command.push(id.to_string());
        self.mutate(id, command).await.map(drop)
    }

    async fn connect_network(&self, container: &str, network: &str, endpoint: &EndpointRequest) -> Result<()> {
        let mut command = args(["network", "connect"]);
        command.extend(endpoint.to_cli("--alias"));
        if endpoint.mac_address.is_some() {
            warn!("The docker CLI cannot set a MAC address when connecting {} to {}", container, network);
        }
        command.extend([network.to_string(), container.to_string()]);
        self.mutate(container, command).await.map(drop)
    }

    async fn disconnect_network(&self, container: &str, network: &str) -> Result<()> {
        self.mutate(container, args(["network", "disconnect", network, container]))
            .await
            .map(drop)
    }
}
