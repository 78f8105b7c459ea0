//! # Port Specifications
//!
//! File: cli/src/common/container/ports.rs
//!
//! ## Overview
//!
//! Parses `published_ports` and `exposed_ports` entries into the shapes the
//! Docker API uses (`"80/tcp"` keys, `{HostIp, HostPort}` bindings).
//!
//! Accepted published forms (1 to 3 colon-separated parts):
//!
//! * `80`, `80/udp`, `8000-8002`: container port(s), random host port
//! * `8080:80`, `8000-8002:9000-9002`: host port(s) to container port(s)
//! * `127.0.0.1:8080:80`, `[::1]:8080:80`, `127.0.0.1::80`: explicit bind address
//!
//! Bindings without an address keep `host_ip = None` until apply time, when
//! the default bind address is resolved (explicit `default_host_ip`, else the
//! bridge network's `host_binding_ipv4` option, else `0.0.0.0`).
//!
use crate::core::error::{DockhandError, Result};
use anyhow::anyhow;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::net::Ipv4Addr;
use std::sync::LazyLock;

static RE_BRACKETED_IPV6: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[[0-9a-fA-F:]+(?:%[^\]/]+)?\]$").expect("ipv6 grammar")
});

const BRIDGE_HOST_BINDING_OPTION: &str = "com.docker.network.bridge.host_binding_ipv4";

fn config_error(message: String) -> anyhow::Error {
    anyhow!(DockhandError::Config(message))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// `None` stands for the default bind address.
    pub host_ip: Option<String>,
    pub host_port: String,
}

/// Container port key (`"80/tcp"`) to its host bindings, in spec order.
pub type PortBindings = IndexMap<String, Vec<Binding>>;

/// Splits on `:` while keeping bracketed IPv6 addresses intact.
fn split_colon_ipv6(text: &str) -> Result<Vec<String>> {
    if !text.contains('[') {
        return Ok(text.split(':').map(str::to_string).collect());
    }
    let mut result: Vec<String> = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let Some(open) = text[start..].find('[').map(|i| i + start) else {
            result.extend(text[start..].split(':').map(str::to_string));
            break;
        };
        let close = text[open..].find(']').map(|i| i + open).ok_or_else(|| {
            config_error(format!(
                "Cannot find closing \"]\" in input \"{}\" for opening \"[\" at index {}!",
                text,
                open + 1
            ))
        })?;
        result.extend(text[start..open].split(':').map(str::to_string));
        match text[close..].find(':').map(|i| i + close) {
            None => {
                if let Some(last) = result.last_mut() {
                    last.push_str(&text[open..]);
                }
                start = text.len();
            }
            Some(colon) => {
                if let Some(last) = result.last_mut() {
                    last.push_str(&text[open..colon]);
                }
                start = colon + 1;
                if start == text.len() {
                    result.push(String::new());
                }
            }
        }
    }
    Ok(result)
}

fn parse_port_range(text: &str) -> Result<Vec<u16>> {
    match text.split_once('-') {
        Some((start, end)) => {
            let invalid = || config_error(format!("Invalid port range: \"{}\"", text));
            let start: u16 = start.trim().parse().map_err(|_| invalid())?;
            let end: u16 = end.trim().parse().map_err(|_| invalid())?;
            if end < start {
                return Err(invalid());
            }
            Ok((start..=end).collect())
        }
        None => text
            .trim()
            .parse::<u16>()
            .map(|p| vec![p])
            .map_err(|_| config_error(format!("Invalid port: \"{}\"", text))),
    }
}

fn split_protocol(container_part: &str) -> (&str, String) {
    match container_part.split_once('/') {
        Some((port, proto)) => (port, proto.to_lowercase()),
        None => (container_part, "tcp".to_string()),
    }
}

/// Parses one `exposed_ports` entry (`80`, `53/udp`, `8000-8002`).
pub fn parse_exposed_port(spec: &str) -> Result<Vec<String>> {
    let (ports, proto) = split_protocol(spec.trim());
    Ok(parse_port_range(ports)?
        .into_iter()
        .map(|p| format!("{}/{}", p, proto))
        .collect())
}

/// Parses `published_ports` entries into bindings.
///
/// # Errors
///
/// `DockhandError::Config` for ranges of mismatched length, hostnames used as
/// bind addresses, or more than three colon-separated parts.
pub fn parse_published_ports(specs: &[String]) -> Result<PortBindings> {
    let mut bindings = PortBindings::new();
    for spec in specs {
        let parts = split_colon_ipv6(spec.trim())?;
        let Some(container_part) = parts.last() else {
            continue;
        };
        let (container_ports, proto) = split_protocol(container_part);
        let container_ports = parse_port_range(container_ports)?;

        let binds: Vec<Binding> = match parts.len() {
            1 => vec![
                Binding {
                    host_ip: None,
                    host_port: String::new(),
                };
                container_ports.len()
            ],
            2 => host_port_bindings(None, &parts[0], container_ports.len())?,
            3 => {
                let ip = &parts[0];
                if ip.parse::<Ipv4Addr>().is_err() && !RE_BRACKETED_IPV6.is_match(ip) {
                    return Err(config_error(format!(
                        "Bind addresses for published ports must be IPv4 or IPv6 addresses, \
                         not hostnames. (Found hostname: {})",
                        ip
                    )));
                }
                let ip = ip.trim_start_matches('[').trim_end_matches(']').to_string();
                if parts[1].is_empty() {
                    vec![
                        Binding {
                            host_ip: Some(ip),
                            host_port: String::new(),
                        };
                        container_ports.len()
                    ]
                } else {
                    host_port_bindings(Some(ip), &parts[1], container_ports.len())?
                }
            }
            n => {
                return Err(config_error(format!(
                    "Invalid port description \"{}\" - expected 1 to 3 colon-separated parts, \
                     but got {}. Maybe you forgot to use square brackets ([...]) around an \
                     IPv6 address?",
                    spec, n
                )))
            }
        };

        for (bind, port) in binds.into_iter().zip(container_ports) {
            bindings
                .entry(format!("{}/{}", port, proto))
                .or_default()
                .push(bind);
        }
    }
    Ok(bindings)
}

fn host_port_bindings(host_ip: Option<String>, host_part: &str, count: usize) -> Result<Vec<Binding>> {
    if count == 1 {
        return Ok(vec![Binding {
            host_ip,
            host_port: host_part.to_string(),
        }]);
    }
    let host_ports = parse_port_range(host_part)?;
    if host_ports.len() != count {
        return Err(config_error(format!(
            "Host port range \"{}\" does not match the number of container ports ({})",
            host_part, count
        )));
    }
    Ok(host_ports
        .into_iter()
        .map(|p| Binding {
            host_ip: host_ip.clone(),
            host_port: p.to_string(),
        })
        .collect())
}

/// Resolves the default bind address.
///
/// # Arguments
///
/// * `explicit` - the spec's `default_host_ip`, if any.
/// * `networks` - inspections of the networks the container should join.
pub fn resolve_default_host_ip(explicit: Option<&str>, networks: &[Value]) -> String {
    if let Some(ip) = explicit {
        return ip.trim_start_matches('[').trim_end_matches(']').to_string();
    }
    networks
        .iter()
        .filter(|n| n.get("Driver").and_then(Value::as_str) == Some("bridge"))
        .find_map(|n| {
            n.get("Options")?
                .get(BRIDGE_HOST_BINDING_OPTION)?
                .as_str()
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "0.0.0.0".to_string())
}

/// `HostConfig.PortBindings` shape with `HostIp: null` standing for the
/// default bind address.
pub fn bindings_to_value(bindings: &PortBindings) -> Value {
    let map: Map<String, Value> = bindings
        .iter()
        .map(|(port, binds)| {
            let list = binds
                .iter()
                .map(|b| json!({"HostIp": b.host_ip, "HostPort": b.host_port}))
                .collect();
            (port.clone(), Value::Array(list))
        })
        .collect();
    Value::Object(map)
}

/// Replaces the `HostIp: null` placeholders with `default_ip`.
pub fn resolve_placeholders(bindings: &Value, default_ip: &str) -> Value {
    let mut resolved = bindings.clone();
    if let Some(ports) = resolved.as_object_mut() {
        for binds in ports.values_mut().filter_map(Value::as_array_mut) {
            for bind in binds.iter_mut().filter_map(Value::as_object_mut) {
                if bind.get("HostIp").is_none_or(Value::is_null) {
                    bind.insert("HostIp".into(), json!(default_ip));
                }
            }
        }
    }
    resolved
}

/// `--publish` values for the Docker CLI, from resolved bindings.
pub fn bindings_to_cli(bindings: &Value) -> Vec<String> {
    let mut args = Vec::new();
    let Some(ports) = bindings.as_object() else {
        return args;
    };
    for (port, binds) in ports {
        for bind in binds.as_array().map(Vec::as_slice).unwrap_or_default() {
            let ip = bind.get("HostIp").and_then(Value::as_str).unwrap_or("");
            let host_port = bind.get("HostPort").and_then(Value::as_str).unwrap_or("");
            let ip = if ip.contains(':') {
                format!("[{}]", ip)
            } else {
                ip.to_string()
            };
            args.push("--publish".to_string());
            args.push(format!("{}:{}:{}", ip, host_port, port));
        }
    }
    args
}
