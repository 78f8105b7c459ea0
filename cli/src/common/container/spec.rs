//! # Container Spec Files
//!
//! File: cli/src/common/container/spec.rs
//!
//! ## Overview
//!
//! A container spec is a TOML (or JSON) document describing one container:
//! lifecycle settings (`state`, `pull`, `recreate`, ...) as named fields, and
//! configuration facets (`memory`, `env`, ...) as free-form keys validated
//! against the facet registry.
//!
//! ```toml
//! name = "web"
//! image = "nginx:1.25"
//! state = "started"
//! memory = "256m"
//! published_ports = ["8080:80"]
//!
//! [env]
//! NGINX_HOST = "example.org"
//!
//! [[networks]]
//! name = "frontend"
//! aliases = ["web"]
//!
//! [comparisons]
//! env = "strict"
//! ```
//!
//! [`ContainerSpec::prepare`] turns a spec into a [`PreparedSpec`]: every facet
//! value in canonical form, the effective comparison modes, and the lifecycle
//! settings merged with the `[container]` configuration defaults. All
//! parameter errors surface here, before any daemon interaction.
//!
use super::compare::ComparisonMode;
use super::facets::{FacetRegistry, FacetValues};
use super::mounts::{prepare_storage, MountSpec};
use super::networks::{validate_networks, NetworkSpec};
use super::ports::{bindings_to_value, parse_published_ports};
use crate::core::config::{ContainerDefaults, LabelMismatchPolicy};
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{fs, path::Path};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Exists with the desired configuration; running state untouched.
    Present,
    #[default]
    Started,
    /// Started, then wait until the healthcheck passes.
    Healthy,
    Stopped,
    Absent,
}

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PullPolicy {
    #[default]
    Missing,
    Always,
    Never,
}

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ImageComparison {
    /// Compare the container's image ID with the ID `image` resolves to.
    #[default]
    DesiredImage,
    /// Compare configuration against the container's current image.
    CurrentImage,
}

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageNameMismatch {
    #[default]
    Ignore,
    /// Recreate when the container was created from a differently named
    /// reference, even if the IDs match.
    Recreate,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct ContainerSpec {
    pub name: String,
    #[serde(default)]
    pub state: DesiredState,
    pub image: Option<String>,
    #[serde(default)]
    pub pull: PullPolicy,
    #[serde(default)]
    pub image_comparison: ImageComparison,
    #[serde(default)]
    pub image_name_mismatch: ImageNameMismatch,
    pub image_label_mismatch: Option<LabelMismatchPolicy>,
    /// Always recreate, even without differences.
    #[serde(default)]
    pub recreate: bool,
    /// Restart an already running container.
    #[serde(default)]
    pub restart: bool,
    /// Kill instead of stop before removal.
    #[serde(default)]
    pub force_kill: bool,
    pub kill_signal: Option<String>,
    #[serde(default)]
    pub remove_volumes: bool,
    pub stop_timeout: Option<u32>,
    pub removal_wait_timeout: Option<u64>,
    pub healthy_wait_timeout: Option<u64>,
    pub paused: Option<bool>,
    pub networks: Option<Vec<NetworkSpec>>,
    pub networks_cli_compatible: Option<bool>,
    pub default_host_ip: Option<String>,
    #[serde(default)]
    pub comparisons: IndexMap<String, String>,
    pub volumes: Option<Vec<String>>,
    pub mounts: Option<Vec<MountSpec>>,
    pub published_ports: Option<Vec<String>>,
    /// Remaining keys: facet parameters.
    #[serde(flatten)]
    pub options: IndexMap<String, Value>,
}

/// A validated spec, ready for reconciliation.
#[derive(Debug, Clone)]
pub struct PreparedSpec {
    pub name: String,
    pub state: DesiredState,
    pub image: Option<String>,
    pub pull: PullPolicy,
    pub image_comparison: ImageComparison,
    pub image_name_mismatch: ImageNameMismatch,
    pub label_policy: LabelMismatchPolicy,
    pub recreate: bool,
    pub restart: bool,
    pub force_kill: bool,
    pub kill_signal: Option<String>,
    pub remove_volumes: bool,
    pub stop_timeout: Option<u32>,
    pub removal_wait_timeout: u64,
    pub healthy_wait_timeout: u64,
    pub paused: Option<bool>,
    pub networks: Option<Vec<NetworkSpec>>,
    pub networks_cli_compatible: bool,
    pub default_host_ip: Option<String>,
    pub values: FacetValues,
    pub comparisons: IndexMap<&'static str, ComparisonMode>,
}

impl PreparedSpec {
    pub fn mode(&self, facet: &str) -> ComparisonMode {
        self.comparisons
            .get(facet)
            .copied()
            .unwrap_or(ComparisonMode::Strict)
    }
}

fn config_error(message: String) -> anyhow::Error {
    anyhow!(DockhandError::Config(message))
}

/// Loads a spec file; `.json` files are parsed as JSON, everything else as TOML.
pub fn load_spec(path: &Path) -> Result<ContainerSpec> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read container spec: {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let spec: ContainerSpec = if is_json {
        serde_json::from_str(&content)
            .map_err(|e| config_error(format!("Invalid container spec {}: {}", path.display(), e)))?
    } else {
        toml::from_str(&content)
            .map_err(|e| config_error(format!("Invalid container spec {}: {}", path.display(), e)))?
    };
    debug!("Loaded container spec '{}' from {}", spec.name, path.display());
    Ok(spec)
}

impl ContainerSpec {
    /// Validates the spec and brings every facet value into canonical form.
    ///
    /// # Errors
    ///
    /// `DockhandError::Config` for unknown parameters, malformed values and
    /// invalid `comparisons` entries.
    pub fn prepare(&self, registry: &FacetRegistry, defaults: &ContainerDefaults) -> Result<PreparedSpec> {
        if self.name.trim().is_empty() {
            return Err(config_error("Container spec needs a non-empty name".to_string()));
        }

        let mut values = FacetValues::new();
        for (key, raw) in &self.options {
            let facet = registry
                .get(key)
                .filter(|f| !f.is_out_of_band() && f.name != "volume_binds")
                .ok_or_else(|| config_error(format!("Unsupported parameter '{}'", key)))?;
            if raw.is_null() {
                continue;
            }
            if let Some(prepared) = facet.prepare(raw)? {
                values.insert(facet.name, prepared);
            }
        }

        if self.volumes.is_some() || self.mounts.is_some() {
            let storage = prepare_storage(self.volumes.as_deref(), self.mounts.as_deref())?;
            if self.volumes.is_some() {
                values.insert("volumes", json!(storage.volumes));
                values.insert("volume_binds", json!(storage.binds));
            }
            if let Some(mounts) = storage.mounts {
                values.insert("mounts", Value::Array(mounts));
            }
        }

        if let Some(published) = &self.published_ports {
            let (all, specs): (Vec<&String>, Vec<&String>) =
                published.iter().partition(|p| p.as_str() == "all");
            if !all.is_empty() {
                values.insert("publish_all_ports", json!(true));
            }
            let specs: Vec<String> = specs.into_iter().cloned().collect();
            let bindings = parse_published_ports(&specs)?;
            if !bindings.is_empty() {
                if let Some(Value::Array(exposed)) = values.get_mut("exposed_ports") {
                    for port in bindings.keys() {
                        if !exposed.iter().any(|e| e.as_str() == Some(port)) {
                            exposed.push(json!(port));
                        }
                    }
                }
                values.insert("published_ports", bindings_to_value(&bindings));
            }
        }

        if values.contains_key("restart_retries")
            && values.get("restart_policy").and_then(Value::as_str) != Some("on-failure")
        {
            return Err(config_error(
                "restart_retries can only be used with restart_policy \"on-failure\"".to_string(),
            ));
        }

        let networks_cli_compatible = self
            .networks_cli_compatible
            .unwrap_or(defaults.networks_cli_compatible);
        if let Some(networks) = &self.networks {
            validate_networks(networks)?;
            if networks_cli_compatible && !values.contains_key("network_mode") {
                if let Some(first) = networks.first() {
                    values.insert("network_mode", json!(first.name));
                }
            }
        }

        let comparisons = registry.resolve_comparisons(&self.comparisons, self.networks.is_some())?;

        Ok(PreparedSpec {
            name: self.name.clone(),
            state: self.state,
            image: self.image.clone(),
            pull: self.pull,
            image_comparison: self.image_comparison,
            image_name_mismatch: self.image_name_mismatch,
            label_policy: self
                .image_label_mismatch
                .unwrap_or(defaults.image_label_mismatch),
            recreate: self.recreate,
            restart: self.restart,
            force_kill: self.force_kill,
            kill_signal: self.kill_signal.clone(),
            remove_volumes: self.remove_volumes,
            stop_timeout: self.stop_timeout.or(defaults.stop_timeout),
            removal_wait_timeout: self
                .removal_wait_timeout
                .unwrap_or(defaults.removal_wait_timeout),
            healthy_wait_timeout: self
                .healthy_wait_timeout
                .unwrap_or(defaults.healthy_wait_timeout),
            paused: self.paused,
            networks: self.networks.clone(),
            networks_cli_compatible,
            default_host_ip: self.default_host_ip.clone(),
            values,
            comparisons,
        })
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn parse(toml_text: &str) -> ContainerSpec {
        toml::from_str(toml_text).unwrap()
    }

    fn prepare(toml_text: &str) -> Result<PreparedSpec> {
        parse(toml_text).prepare(&FacetRegistry::build(), &ContainerDefaults::default())
    }

    #[test]
    fn test_full_spec() {
        let prepared = prepare(
            r#"
name = "web"
image = "nginx:1.25"
state = "healthy"
memory = "256m"
exposed_ports = ["9000"]
published_ports = ["8080:80", "all"]
volumes = ["/data", "/srv/www:/usr/share/nginx/html:ro"]
restart_policy = "on-failure"
restart_retries = 5

[env]
NGINX_HOST = "example.org"

[[networks]]
name = "frontend"
aliases = ["web"]

[comparisons]
env = "strict"
"#,
        )
        .unwrap();
        assert_eq!(prepared.state, DesiredState::Healthy);
        assert_eq!(prepared.values["memory"], json!(268435456));
        assert_eq!(prepared.values["exposed_ports"], json!(["9000/tcp", "80/tcp"]));
        assert_eq!(prepared.values["publish_all_ports"], json!(true));
        assert_eq!(
            prepared.values["published_ports"],
            json!({"80/tcp": [{"HostIp": null, "HostPort": "8080"}]})
        );
        assert_eq!(prepared.values["volumes"], json!(["/data"]));
        assert_eq!(prepared.values["volume_binds"], json!(["/srv/www:/usr/share/nginx/html:ro"]));
        assert_eq!(prepared.values["network_mode"], json!("frontend"));
        assert_eq!(prepared.mode("env"), ComparisonMode::Strict);
        assert_eq!(prepared.healthy_wait_timeout, 300);
        assert_eq!(prepared.label_policy, LabelMismatchPolicy::Ignore);
    }

    #[test]
    fn test_unknown_parameter() {
        let err = prepare("name = \"web\"\nmemroy = \"1g\"\n").unwrap_err();
        assert!(err.to_string().contains("Unsupported parameter 'memroy'"));
        assert!(prepare("name = \"web\"\nvolume_binds = []\n").is_err());
    }

    #[test]
    fn test_restart_retries_requires_on_failure() {
        let err = prepare("name = \"web\"\nrestart_policy = \"always\"\nrestart_retries = 3\n").unwrap_err();
        assert!(err.to_string().contains("restart_retries"));
    }

    #[test]
    fn test_network_mode_not_forced_when_incompatible() {
        let prepared = prepare(
            "name = \"web\"\nnetworks_cli_compatible = false\n[[networks]]\nname = \"frontend\"\n",
        )
        .unwrap();
        assert!(!prepared.values.contains_key("network_mode"));
        assert!(!prepared.networks_cli_compatible);
    }

    #[test]
    fn test_load_json_and_toml() {
        let mut json_file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(json_file, r#"{{"name": "db", "image": "postgres:16", "pids_limit": 100}}"#).unwrap();
        let spec = load_spec(json_file.path()).unwrap();
        assert_eq!(spec.name, "db");
        assert_eq!(spec.options["pids_limit"], json!(100));

        let mut toml_file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(toml_file, "name = \"db\"\nstate = \"sideways\"\n").unwrap();
        let err = load_spec(toml_file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid container spec"));
    }
}
