//! # Container Engine Seam
//!
//! File: cli/src/common/docker/engine.rs
//!
//! ## Overview
//!
//! The reconciler talks to Docker through the [`ContainerEngine`] trait. Two
//! implementations exist and are selected by configuration:
//!
//! * [`super::api::ApiEngine`]: the Engine HTTP API through `bollard`,
//! * [`super::cli::CliEngine`]: the `docker` command-line client.
//!
//! Inspection results are plain `serde_json::Value` documents in the Engine API
//! shape, whichever backend produced them. "Not found" is a normal outcome
//! (`Ok(None)`), never an error.
//!
//! Requests carry both representations a backend may need: the JSON payload
//! for the API and the argument vector for the CLI.
//!
use crate::core::error::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// Everything needed to create one container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateRequest {
    pub name: String,
    /// `POST /containers/create` body.
    pub payload: Value,
    /// `docker container create` arguments after `--name NAME`.
    pub cli_args: Vec<String>,
}

/// In-place resource/restart-policy update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRequest {
    /// `POST /containers/{id}/update` body.
    pub payload: Value,
    /// `docker container update` flags.
    pub cli_args: Vec<String>,
}

/// Endpoint settings used when connecting a container to a network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointRequest {
    pub ipv4_address: Option<String>,
    pub ipv6_address: Option<String>,
    pub aliases: Vec<String>,
    pub links: Vec<String>,
    pub mac_address: Option<String>,
}

impl EndpointRequest {
    /// `EndpointSettings` as used by `/networks/{id}/connect` and
    /// `NetworkingConfig.EndpointsConfig`.
    pub fn to_api(&self) -> Value {
        let mut settings = Map::new();
        let mut ipam = Map::new();
        if let Some(ip) = &self.ipv4_address {
            ipam.insert("IPv4Address".into(), json!(ip));
        }
        if let Some(ip) = &self.ipv6_address {
            ipam.insert("IPv6Address".into(), json!(ip));
        }
        if !ipam.is_empty() {
            settings.insert("IPAMConfig".into(), Value::Object(ipam));
        }
        if !self.aliases.is_empty() {
            settings.insert("Aliases".into(), json!(self.aliases));
        }
        if !self.links.is_empty() {
            settings.insert("Links".into(), json!(self.links));
        }
        if let Some(mac) = &self.mac_address {
            settings.insert("MacAddress".into(), json!(mac));
        }
        Value::Object(settings)
    }

    /// Flags shared by `docker network connect` and `docker container create`.
    pub fn to_cli(&self, alias_flag: &str) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ip) = &self.ipv4_address {
            args.extend(["--ip".to_string(), ip.clone()]);
        }
        if let Some(ip) = &self.ipv6_address {
            args.extend(["--ip6".to_string(), ip.clone()]);
        }
        for alias in &self.aliases {
            args.extend([alias_flag.to_string(), alias.clone()]);
        }
        for link in &self.links {
            args.extend(["--link".to_string(), link.clone()]);
        }
        args
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Also remove anonymous volumes.
    pub volumes: bool,
    pub force: bool,
}

/// Splits `registry:5000/app:1.2` into `("registry:5000/app", "1.2")`.
/// Digests (`app@sha256:...`) are returned whole with an empty tag; a missing
/// tag defaults to `latest`.
pub fn split_image_reference(reference: &str) -> (String, String) {
    if reference.contains('@') {
        return (reference.to_string(), String::new());
    }
    match reference.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') => (repo.to_string(), tag.to_string()),
        _ => (reference.to_string(), "latest".to_string()),
    }
}

/// Operations the reconciler needs from a Docker backend.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Short backend name for logs and results.
    fn name(&self) -> &'static str;

    async fn inspect_container(&self, name: &str) -> Result<Option<Value>>;
    async fn inspect_image(&self, reference: &str) -> Result<Option<Value>>;
    async fn inspect_network(&self, name: &str) -> Result<Option<Value>>;

    async fn pull_image(&self, repository: &str, tag: &str) -> Result<()>;

    /// Returns the new container's ID.
    async fn create_container(&self, request: &CreateRequest) -> Result<String>;
    async fn update_container(&self, id: &str, request: &UpdateRequest) -> Result<()>;

    async fn start(&self, id: &str) -> Result<()>;
    async fn stop(&self, id: &str, timeout: Option<u32>) -> Result<()>;
    async fn restart(&self, id: &str, timeout: Option<u32>) -> Result<()>;
    async fn kill(&self, id: &str, signal: Option<&str>) -> Result<()>;
    async fn pause(&self, id: &str) -> Result<()>;
    async fn unpause(&self, id: &str) -> Result<()>;
    async fn remove(&self, id: &str, options: RemoveOptions) -> Result<()>;

    async fn connect_network(&self, container: &str, network: &str, endpoint: &EndpointRequest) -> Result<()>;
    async fn disconnect_network(&self, container: &str, network: &str) -> Result<()>;
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_image_reference() {
        let split = |r: &str| split_image_reference(r);
        assert_eq!(split("nginx"), ("nginx".into(), "latest".into()));
        assert_eq!(split("nginx:1.25"), ("nginx".into(), "1.25".into()));
        assert_eq!(
            split("localhost:5000/app"),
            ("localhost:5000/app".into(), "latest".into())
        );
        assert_eq!(
            split("localhost:5000/app:v2"),
            ("localhost:5000/app".into(), "v2".into())
        );
        assert_eq!(split("app@sha256:abc"), ("app@sha256:abc".into(), String::new()));
    }

    #[test]
    fn test_endpoint_rendering() {
        let endpoint = EndpointRequest {
            ipv4_address: Some("172.20.0.5".into()),
            aliases: vec!["web".into()],
            ..Default::default()
        };
        assert_eq!(
            endpoint.to_api(),
            json!({"IPAMConfig": {"IPv4Address": "172.20.0.5"}, "Aliases": ["web"]})
        );
        assert_eq!(endpoint.to_cli("--alias"), vec!["--ip", "172.20.0.5", "--alias", "web"]);
        assert_eq!(EndpointRequest::default().to_api(), json!({}));
    }
}
