//! # Network Attachments
//!
//! File: cli/src/common/container/networks.rs
//!
//! Networks are reconciled outside the generic facet diff. A desired network
//! differs from the live attachment when it is missing, or when an explicitly
//! requested IPv4/IPv6 address, alias, link or MAC address is not present.
//! Aliases and links only need to be a subset of what the daemon reports.
//!
use super::compare::{compare, ComparisonMode, ComparisonType};
use crate::common::docker::engine::EndpointRequest;
use crate::core::error::{DockhandError, Result};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_address: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// `container` or `container:alias`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

impl NetworkSpec {
    /// Links in the `container:alias` form the daemon reports.
    pub fn normalized_links(&self) -> Vec<String> {
        self.links
            .iter()
            .map(|link| match link.split_once(':') {
                Some(_) => link.clone(),
                None => format!("{}:{}", link, link),
            })
            .collect()
    }

    pub fn endpoint(&self) -> EndpointRequest {
        EndpointRequest {
            ipv4_address: self.ipv4_address.clone(),
            ipv6_address: self.ipv6_address.clone(),
            aliases: self.aliases.clone(),
            links: self.normalized_links(),
            mac_address: self.mac_address.clone(),
        }
    }
}

/// One desired network that needs (re)connecting.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkDifference {
    pub spec: NetworkSpec,
    /// Summary of the current attachment; `None` when not connected.
    pub current: Option<Value>,
}

/// Rejects empty names and malformed links before talking to the daemon.
pub fn validate_networks(networks: &[NetworkSpec]) -> Result<()> {
    for network in networks {
        if network.name.trim().is_empty() {
            return Err(anyhow!(DockhandError::Config(
                "Every entry in networks needs a name".to_string()
            )));
        }
        if let Some(bad) = network.links.iter().find(|l| l.split(':').count() > 2) {
            return Err(anyhow!(DockhandError::Config(format!(
                "Invalid link \"{}\" for network {}: expected container or container:alias",
                bad, network.name
            ))));
        }
    }
    Ok(())
}

fn connected(raw: &Value) -> Option<&serde_json::Map<String, Value>> {
    raw.get("NetworkSettings")?.get("Networks")?.as_object()
}

fn summarize(name: &str, info: &Value) -> Value {
    let ipam = info.get("IPAMConfig").filter(|v| !v.is_null());
    json!({
        "name": name,
        "ipv4_address": ipam.and_then(|i| i.get("IPv4Address")),
        "ipv6_address": ipam.and_then(|i| i.get("IPv6Address")),
        "aliases": info.get("Aliases"),
        "links": info.get("Links"),
        "mac_address": info.get("MacAddress"),
    })
}

/// Desired networks whose attachment is missing or out of date.
pub fn network_differences(desired: &[NetworkSpec], raw: &Value) -> Vec<NetworkDifference> {
    let live = connected(raw);
    let mut differences = Vec::new();
    for spec in desired {
        let Some(info) = live.and_then(|m| m.get(&spec.name)) else {
            differences.push(NetworkDifference {
                spec: spec.clone(),
                current: None,
            });
            continue;
        };
        let ipam = info.get("IPAMConfig").filter(|v| !v.is_null());
        let ipam_field = |key: &str| ipam.and_then(|i| i.get(key)).and_then(Value::as_str);

        let mut differs = false;
        if let Some(ip) = &spec.ipv4_address {
            differs |= ipam_field("IPv4Address") != Some(ip.as_str());
        }
        if let Some(ip) = &spec.ipv6_address {
            differs |= ipam_field("IPv6Address") != Some(ip.as_str());
        }
        if !spec.aliases.is_empty() {
            differs |= !compare(
                ComparisonType::Set,
                ComparisonMode::AllowMorePresent,
                Some(&json!(spec.aliases)),
                info.get("Aliases"),
            );
        }
        if !spec.links.is_empty() {
            differs |= !compare(
                ComparisonType::Set,
                ComparisonMode::AllowMorePresent,
                Some(&json!(spec.normalized_links())),
                info.get("Links"),
            );
        }
        if let Some(mac) = &spec.mac_address {
            differs |= info.get("MacAddress").and_then(Value::as_str) != Some(mac.as_str());
        }
        if differs {
            differences.push(NetworkDifference {
                spec: spec.clone(),
                current: Some(summarize(&spec.name, info)),
            });
        }
    }
    differences
}

/// Connected networks that are not in the desired set.
pub fn extra_networks(desired: &[NetworkSpec], raw: &Value) -> Vec<String> {
    connected(raw)
        .map(|m| {
            m.keys()
                .filter(|name| !desired.iter().any(|d| &d.name == *name))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}
