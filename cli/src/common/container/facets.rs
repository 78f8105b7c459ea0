//! # Container Facet Registry
//!
//! File: cli/src/common/container/facets.rs
//!
//! ## Overview
//!
//! A facet is one named, independently comparable aspect of a container's
//! configuration (`memory`, `env`, `mounts`, ...). The registry is an immutable,
//! insertion-ordered table built once by [`FacetRegistry::build`]. Each entry
//! knows how to:
//!
//! * **prepare** a raw spec value into its canonical form,
//! * **extract** the live value from a container inspection,
//! * compute the **expected** value (some facets merge image defaults),
//! * write itself into the **create** payload and, for a few, the **update** payload,
//! * render **CLI** flags for the command-line engine.
//!
//! ## Architecture
//!
//! Most facets are plain [`FacetKind::Field`] entries: a value at a JSON path
//! inside `Config` or `HostConfig`, typed by [`ValueKind`]. Facets whose shape
//! spans several daemon fields, or that merge image defaults, have a bespoke
//! kind. `image` and `networks` are out of band: they take part in comparison
//! overrides but are reconciled by dedicated code, never by the generic diff.
//!
//! Canonical values use the Engine API representation, so the same value is
//! compared against an inspection and written into a payload unchanged.
//!
use super::compare::{ComparisonMode, ComparisonType};
use super::healthcheck::{healthcheck_cli_args, normalize_healthcheck};
use super::mounts::{mount_from_api, mount_to_api, mount_to_cli, normalize_bind};
use super::ports::{bindings_to_cli, parse_exposed_port, resolve_placeholders};
use super::units::human_to_bytes;
use crate::core::config::LabelMismatchPolicy;
use crate::core::error::{DockhandError, Result};
use anyhow::anyhow;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

fn config_error(message: String) -> anyhow::Error {
    anyhow!(DockhandError::Config(message))
}

/// Which inspection sub-object a field facet lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Config,
    HostConfig,
}

/// Value shape of a field facet, driving preparation and CLI rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Bool,
    /// Stored inverted (`oom_killer = true` is `OomKillDisable = false`).
    NegatedBool,
    Int,
    Bytes,
    /// Bytes, or `unlimited` for `-1`.
    SwapBytes,
    /// Fractional CPUs stored as billionths.
    NanoCpus,
    StrList,
    StrMap,
    /// `{host = "ip"}` stored as `["host:ip"]`.
    ExtraHosts,
    Devices,
    Ulimits,
    /// `["/run:size=64m"]` stored as `{"/run": "size=64m"}`.
    Tmpfs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetKind {
    Field {
        section: Section,
        path: &'static [&'static str],
        value: ValueKind,
        /// Path inside the `update` payload, for facets updatable in place.
        update: Option<&'static [&'static str]>,
        cli: Option<&'static str>,
    },
    Command,
    Entrypoint,
    Env,
    Labels,
    Interactive,
    Detach,
    ExposedPorts,
    PublishedPorts,
    Volumes,
    VolumeBinds,
    Mounts,
    Healthcheck,
    RestartPolicy,
    Links,
    OutOfBand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub name: &'static str,
    pub comparison_type: ComparisonType,
    pub default_mode: ComparisonMode,
    pub kind: FacetKind,
}

impl Facet {
    fn new(name: &'static str, comparison_type: ComparisonType, kind: FacetKind) -> Self {
        Self {
            name,
            comparison_type,
            default_mode: comparison_type.default_mode(),
            kind,
        }
    }

    fn strict(mut self) -> Self {
        self.default_mode = ComparisonMode::Strict;
        self
    }

    pub fn is_out_of_band(&self) -> bool {
        self.kind == FacetKind::OutOfBand
    }

    pub fn is_updatable(&self) -> bool {
        matches!(
            self.kind,
            FacetKind::RestartPolicy | FacetKind::Field { update: Some(_), .. }
        )
    }
}

/// Inputs for the expected-value computation that do not come from the spec.
#[derive(Debug, Clone, Copy)]
pub struct FacetContext<'a> {
    /// Inspection of the image the container should run.
    pub image: Option<&'a Value>,
    pub label_policy: LabelMismatchPolicy,
    pub default_host_ip: &'a str,
}

/// Prepared facet values in canonical form, keyed by facet name.
pub type FacetValues = IndexMap<&'static str, Value>;

fn get_path<'v>(root: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(root, |node, key| node.get(key))
}

fn set_path(root: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = root;
    for key in parents {
        if !node.is_object() {
            *node = json!({});
        }
        let Some(map) = node.as_object_mut() else {
            return;
        };
        node = map.entry(key.to_string()).or_insert_with(|| json!({}));
    }
    if !node.is_object() {
        *node = json!({});
    }
    if let Some(map) = node.as_object_mut() {
        map.insert(last.to_string(), value);
    }
}

fn section_root<'v>(raw: &'v Value, section: Section) -> Option<&'v Value> {
    match section {
        Section::Config => raw.get("Config"),
        Section::HostConfig => raw.get("HostConfig"),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn object_keys(value: Option<&Value>) -> Vec<Value> {
    value
        .and_then(Value::as_object)
        .map(|m| m.keys().map(|k| json!(k)).collect())
        .unwrap_or_default()
}

fn keys_as_object(items: &Value) -> Value {
    let map: Map<String, Value> = items
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(|k| (k.to_string(), json!({})))
                .collect()
        })
        .unwrap_or_default();
    Value::Object(map)
}

fn union(first: Vec<Value>, second: &Value) -> Value {
    let mut items = first;
    for item in second.as_array().map(Vec::as_slice).unwrap_or_default() {
        if !items.contains(item) {
            items.push(item.clone());
        }
    }
    Value::Array(items)
}

fn type_error(name: &str, expected: &str, raw: &Value) -> anyhow::Error {
    config_error(format!(
        "Invalid value for option \"{}\": expected {}, got {}",
        name, expected, raw
    ))
}

fn string_list(name: &str, raw: &Value) -> Result<Vec<String>> {
    match raw {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|v| scalar_string(v).ok_or_else(|| type_error(name, "a list of strings", raw)))
            .collect(),
        _ => Err(type_error(name, "a list of strings", raw)),
    }
}

fn string_map(name: &str, raw: &Value) -> Result<Map<String, Value>> {
    let map = raw
        .as_object()
        .ok_or_else(|| type_error(name, "a table of strings", raw))?;
    map.iter()
        .map(|(k, v)| {
            scalar_string(v)
                .map(|s| (k.clone(), json!(s)))
                .ok_or_else(|| type_error(name, "a table of strings", raw))
        })
        .collect()
}

fn parse_device(name: &str, raw: &Value) -> Result<Value> {
    if let Some(obj) = raw.as_object() {
        let host = obj
            .get("path_on_host")
            .and_then(Value::as_str)
            .ok_or_else(|| type_error(name, "a device with path_on_host", raw))?;
        let container = obj
            .get("path_in_container")
            .and_then(Value::as_str)
            .unwrap_or(host);
        let perms = obj
            .get("cgroup_permissions")
            .and_then(Value::as_str)
            .unwrap_or("rwm");
        return Ok(json!({
            "PathOnHost": host, "PathInContainer": container, "CgroupPermissions": perms
        }));
    }
    let text = raw
        .as_str()
        .ok_or_else(|| type_error(name, "device strings", raw))?;
    let parts: Vec<&str> = text.split(':').collect();
    let (host, container, perms) = match parts.as_slice() {
        [host] => (*host, *host, "rwm"),
        [host, container] => (*host, *container, "rwm"),
        [host, container, perms] => (*host, *container, *perms),
        _ => {
            return Err(config_error(format!(
                "Invalid device specification \"{}\"",
                text
            )))
        }
    };
    Ok(json!({"PathOnHost": host, "PathInContainer": container, "CgroupPermissions": perms}))
}

fn parse_ulimit(raw: &Value) -> Result<Value> {
    let text = raw.as_str().unwrap_or_default();
    let parts: Vec<&str> = text.split(':').collect();
    let invalid = || config_error(format!("Invalid ulimit \"{}\": expected name:soft[:hard]", text));
    let (name, soft, hard) = match parts.as_slice() {
        [name, soft] => (*name, *soft, *soft),
        [name, soft, hard] => (*name, *soft, *hard),
        _ => return Err(invalid()),
    };
    let soft: i64 = soft.parse().map_err(|_| invalid())?;
    let hard: i64 = hard.parse().map_err(|_| invalid())?;
    Ok(json!({"Name": name, "Soft": soft, "Hard": hard}))
}

fn parse_bytes(name: &str, raw: &Value) -> Result<i64> {
    match raw {
        Value::Number(n) => n.as_i64().ok_or_else(|| type_error(name, "a byte size", raw)),
        Value::String(s) => human_to_bytes(s).map_err(|e| {
            config_error(format!("Failed to convert {} to bytes: {}", name, e))
        }),
        _ => Err(type_error(name, "a byte size", raw)),
    }
}

fn prepare_field(name: &str, kind: ValueKind, raw: &Value) -> Result<Value> {
    match kind {
        ValueKind::Str => scalar_string(raw)
            .map(Value::String)
            .ok_or_else(|| type_error(name, "a string", raw)),
        ValueKind::Bool => raw
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| type_error(name, "a boolean", raw)),
        ValueKind::NegatedBool => raw
            .as_bool()
            .map(|b| Value::Bool(!b))
            .ok_or_else(|| type_error(name, "a boolean", raw)),
        ValueKind::Int => match raw {
            Value::Number(n) => n.as_i64().map(|i| json!(i)),
            Value::String(s) => s.trim().parse::<i64>().ok().map(|i| json!(i)),
            _ => None,
        }
        .ok_or_else(|| type_error(name, "an integer", raw)),
        ValueKind::Bytes => parse_bytes(name, raw).map(|b| json!(b)),
        ValueKind::SwapBytes => match raw {
            Value::String(s) if s == "unlimited" => Ok(json!(-1)),
            Value::Number(n) if n.as_i64() == Some(-1) => Ok(json!(-1)),
            _ => parse_bytes(name, raw).map(|b| json!(b)),
        },
        ValueKind::NanoCpus => {
            let cpus = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .filter(|c| *c >= 0.0)
            .ok_or_else(|| type_error(name, "a number of CPUs", raw))?;
            Ok(json!((cpus * 1e9).round() as i64))
        }
        ValueKind::StrList => Ok(json!(string_list(name, raw)?)),
        ValueKind::StrMap => Ok(Value::Object(string_map(name, raw)?)),
        ValueKind::ExtraHosts => match raw {
            Value::Object(_) => {
                let hosts: Vec<String> = string_map(name, raw)?
                    .iter()
                    .map(|(host, ip)| format!("{}:{}", host, ip.as_str().unwrap_or_default()))
                    .collect();
                Ok(json!(hosts))
            }
            _ => Ok(json!(string_list(name, raw)?)),
        },
        ValueKind::Devices => raw
            .as_array()
            .ok_or_else(|| type_error(name, "a list of devices", raw))?
            .iter()
            .map(|d| parse_device(name, d))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        ValueKind::Ulimits => string_list(name, raw)?
            .into_iter()
            .map(|u| parse_ulimit(&json!(u)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        ValueKind::Tmpfs => {
            let map: Map<String, Value> = string_list(name, raw)?
                .into_iter()
                .map(|entry| match entry.split_once(':') {
                    Some((path, opts)) => (path.to_string(), json!(opts)),
                    None => (entry, json!("")),
                })
                .collect();
            Ok(Value::Object(map))
        }
    }
}

fn prepare_command(name: &str, raw: &Value) -> Result<Value> {
    match raw {
        Value::String(s) => shlex::split(s)
            .map(|parts| json!(parts))
            .ok_or_else(|| config_error(format!("Cannot split {} \"{}\" into words", name, s))),
        _ => Ok(json!(string_list(name, raw)?)),
    }
}

fn prepare_env(raw: &Value) -> Result<Value> {
    let map = raw
        .as_object()
        .ok_or_else(|| type_error("env", "a table", raw))?;
    for (key, value) in map {
        if !value.is_string() {
            return Err(config_error(format!(
                "Non-string value found for env option. Ambiguous env options must be \
                 wrapped in quotes to avoid them being interpreted. Key: {}",
                key
            )));
        }
    }
    Ok(raw.clone())
}

fn prepare_links(raw: &Value) -> Result<Value> {
    let links: Vec<String> = string_list("links", raw)?
        .into_iter()
        .map(|link| match link.split_once(':') {
            Some(_) => link,
            None => format!("{}:{}", link, link),
        })
        .collect();
    Ok(json!(links))
}

/// `/db:/web/database` as stored by the daemon becomes `db:database`.
fn normalize_link(stored: &str) -> String {
    match stored.split_once(':') {
        Some((target, alias)) => format!(
            "{}:{}",
            target.trim_start_matches('/'),
            alias.rsplit('/').next().unwrap_or(alias)
        ),
        None => stored.trim_start_matches('/').to_string(),
    }
}

fn env_pairs(env: &Value) -> Vec<Value> {
    env.as_object()
        .map(|m| {
            m.iter()
                .map(|(k, v)| json!(format!("{}={}", k, v.as_str().unwrap_or_default())))
                .collect()
        })
        .unwrap_or_default()
}

fn image_config<'v>(ctx: &FacetContext<'v>, key: &str) -> Option<&'v Value> {
    ctx.image?.get("Config")?.get(key).filter(|v| !v.is_null())
}

fn cli_scalar(value: &Value) -> String {
    scalar_string(value).unwrap_or_else(|| value.to_string())
}

fn format_cpus(nanos: i64) -> String {
    format!("{}", nanos as f64 / 1e9)
}

fn render_field_cli(flag: &str, kind: ValueKind, value: &Value) -> Vec<String> {
    let mut args = Vec::new();
    let mut push = |v: String| {
        args.push(flag.to_string());
        args.push(v);
    };
    match kind {
        ValueKind::Bool | ValueKind::NegatedBool => {
            return vec![format!("{}={}", flag, value.as_bool().unwrap_or(false))];
        }
        ValueKind::NanoCpus => push(format_cpus(value.as_i64().unwrap_or(0))),
        ValueKind::StrList | ValueKind::ExtraHosts => {
            for item in value.as_array().map(Vec::as_slice).unwrap_or_default() {
                push(cli_scalar(item));
            }
        }
        ValueKind::StrMap => {
            for (k, v) in value.as_object().into_iter().flatten() {
                push(format!("{}={}", k, cli_scalar(v)));
            }
        }
        ValueKind::Tmpfs => {
            for (path, opts) in value.as_object().into_iter().flatten() {
                let opts = cli_scalar(opts);
                push(if opts.is_empty() {
                    path.clone()
                } else {
                    format!("{}:{}", path, opts)
                });
            }
        }
        ValueKind::Devices => {
            for d in value.as_array().map(Vec::as_slice).unwrap_or_default() {
                let field = |k: &str| d.get(k).map(cli_scalar).unwrap_or_default();
                push(format!(
                    "{}:{}:{}",
                    field("PathOnHost"),
                    field("PathInContainer"),
                    field("CgroupPermissions")
                ));
            }
        }
        ValueKind::Ulimits => {
            for u in value.as_array().map(Vec::as_slice).unwrap_or_default() {
                let field = |k: &str| u.get(k).map(cli_scalar).unwrap_or_default();
                push(format!("{}={}:{}", field("Name"), field("Soft"), field("Hard")));
            }
        }
        ValueKind::Str | ValueKind::Int | ValueKind::Bytes | ValueKind::SwapBytes => {
            push(cli_scalar(value))
        }
    }
    args
}

fn merge_object(body: &mut Value, path: &[&str], additions: &Value) {
    let mut merged = get_path(body, path)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    if let Some(extra) = additions.as_object() {
        merged.extend(extra.clone());
    }
    set_path(body, path, Value::Object(merged));
}

impl Facet {
    /// Canonical form of a raw spec value.
    pub fn prepare(&self, raw: &Value) -> Result<Option<Value>> {
        let prepared = match &self.kind {
            FacetKind::Field { value, .. } => prepare_field(self.name, *value, raw)?,
            FacetKind::Command | FacetKind::Entrypoint => prepare_command(self.name, raw)?,
            FacetKind::Env => prepare_env(raw)?,
            FacetKind::Labels => Value::Object(string_map(self.name, raw)?),
            FacetKind::Interactive | FacetKind::Detach => prepare_field(self.name, ValueKind::Bool, raw)?,
            FacetKind::ExposedPorts => {
                let mut ports = Vec::new();
                for spec in string_list(self.name, raw)? {
                    ports.extend(parse_exposed_port(&spec)?.into_iter().map(Value::String));
                }
                Value::Array(ports)
            }
            FacetKind::Healthcheck => return normalize_healthcheck(raw),
            FacetKind::RestartPolicy => {
                let policy = prepare_field(self.name, ValueKind::Str, raw)?;
                match policy.as_str() {
                    Some("no" | "always" | "on-failure" | "unless-stopped") => policy,
                    _ => return Err(type_error(self.name, "no, always, on-failure or unless-stopped", raw)),
                }
            }
            FacetKind::Links => prepare_links(raw)?,
            FacetKind::PublishedPorts
            | FacetKind::Volumes
            | FacetKind::VolumeBinds
            | FacetKind::Mounts
            | FacetKind::OutOfBand => raw.clone(),
        };
        Ok(Some(prepared))
    }

    /// Reads the facet's live value from a container inspection.
    pub fn extract(&self, raw: &Value) -> Option<Value> {
        let config = raw.get("Config");
        let host = raw.get("HostConfig");
        let cfg = |key: &str| config.and_then(|c| c.get(key)).filter(|v| !v.is_null()).cloned();
        match &self.kind {
            FacetKind::Field { section, path, .. } => {
                get_path(section_root(raw, *section)?, path).cloned()
            }
            FacetKind::Command => cfg("Cmd"),
            FacetKind::Entrypoint => cfg("Entrypoint"),
            FacetKind::Env => cfg("Env"),
            FacetKind::Labels => cfg("Labels"),
            FacetKind::Healthcheck => cfg("Healthcheck"),
            FacetKind::Interactive => Some(json!(cfg("OpenStdin")
                .and_then(|v| v.as_bool())
                .unwrap_or(false))),
            FacetKind::Detach => {
                let attached = |key: &str| cfg(key).and_then(|v| v.as_bool()).unwrap_or(false);
                Some(json!(!(attached("AttachStderr") && attached("AttachStdout"))))
            }
            FacetKind::ExposedPorts => {
                Some(Value::Array(object_keys(config.and_then(|c| c.get("ExposedPorts")))))
            }
            FacetKind::Volumes => Some(Value::Array(object_keys(config.and_then(|c| c.get("Volumes"))))),
            FacetKind::VolumeBinds => {
                let binds = host?.get("Binds")?.as_array()?;
                Some(Value::Array(
                    binds
                        .iter()
                        .filter_map(Value::as_str)
                        .map(|b| json!(normalize_bind(b)))
                        .collect(),
                ))
            }
            FacetKind::Mounts => {
                let mounts = host?.get("Mounts")?.as_array()?;
                Some(Value::Array(mounts.iter().map(mount_from_api).collect()))
            }
            FacetKind::PublishedPorts => host?.get("PortBindings").filter(|v| !v.is_null()).cloned(),
            FacetKind::RestartPolicy => get_path(host?, &["RestartPolicy", "Name"]).cloned(),
            FacetKind::Links => {
                let links = host?.get("Links")?.as_array()?;
                Some(Value::Array(
                    links
                        .iter()
                        .filter_map(Value::as_str)
                        .map(|l| json!(normalize_link(l)))
                        .collect(),
                ))
            }
            FacetKind::OutOfBand => None,
        }
    }

    /// The value a converged container would show for this facet.
    ///
    /// # Errors
    ///
    /// Fails for `labels` under strict comparison with the `fail` mismatch
    /// policy when the image carries labels the container spec does not repeat.
    pub fn expected(&self, prepared: &Value, mode: ComparisonMode, ctx: &FacetContext) -> Result<Value> {
        match &self.kind {
            FacetKind::Env => {
                let mut merged: IndexMap<String, String> = IndexMap::new();
                let image_env = image_config(ctx, "Env").and_then(Value::as_array);
                for entry in image_env.into_iter().flatten().filter_map(Value::as_str) {
                    let (k, v) = entry.split_once('=').unwrap_or((entry, ""));
                    merged.insert(k.to_string(), v.to_string());
                }
                for pair in env_pairs(prepared) {
                    if let Some((k, v)) = pair.as_str().and_then(|p| p.split_once('=')) {
                        merged.insert(k.to_string(), v.to_string());
                    }
                }
                Ok(json!(merged
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()))
            }
            FacetKind::Labels => {
                let image_labels = image_config(ctx, "Labels")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                let wanted = prepared.as_object().cloned().unwrap_or_default();
                match ctx.label_policy {
                    LabelMismatchPolicy::Ignore => {
                        let mut merged = image_labels;
                        merged.extend(wanted);
                        Ok(Value::Object(merged))
                    }
                    LabelMismatchPolicy::Fail => {
                        if mode == ComparisonMode::Strict {
                            let mut missing: Vec<&String> =
                                image_labels.keys().filter(|k| !wanted.contains_key(*k)).collect();
                            missing.sort();
                            if !missing.is_empty() {
                                let names: Vec<&str> = missing.iter().map(|k| k.as_str()).collect();
                                return Err(config_error(format!(
                                    "Some labels should be removed but are present in the base \
                                     image. You can set image_label_mismatch to \"ignore\" to \
                                     ignore this error. Labels: {}",
                                    names.join(", ")
                                )));
                            }
                        }
                        Ok(Value::Object(wanted))
                    }
                }
            }
            FacetKind::ExposedPorts => Ok(union(
                object_keys(image_config(ctx, "ExposedPorts")),
                prepared,
            )),
            FacetKind::Volumes => Ok(union(object_keys(image_config(ctx, "Volumes")), prepared)),
            FacetKind::PublishedPorts => Ok(resolve_placeholders(prepared, ctx.default_host_ip)),
            _ => Ok(prepared.clone()),
        }
    }

    /// Writes the facet into a `POST /containers/create` body.
    ///
    /// `Config` fields live at the top level of the body, host settings under
    /// `HostConfig`.
    pub fn apply_create(&self, prepared: &Value, ctx: &FacetContext, body: &mut Value) {
        match &self.kind {
            FacetKind::Field { section, path, .. } => {
                let mut full: Vec<&str> = Vec::with_capacity(path.len() + 1);
                if *section == Section::HostConfig {
                    full.push("HostConfig");
                }
                full.extend_from_slice(path);
                set_path(body, &full, prepared.clone());
            }
            FacetKind::Command => set_path(body, &["Cmd"], prepared.clone()),
            FacetKind::Entrypoint => set_path(body, &["Entrypoint"], prepared.clone()),
            FacetKind::Env => set_path(body, &["Env"], Value::Array(env_pairs(prepared))),
            FacetKind::Labels => set_path(body, &["Labels"], prepared.clone()),
            FacetKind::Healthcheck => set_path(body, &["Healthcheck"], prepared.clone()),
            FacetKind::Interactive => set_path(body, &["OpenStdin"], prepared.clone()),
            FacetKind::Detach => {
                let attach = !prepared.as_bool().unwrap_or(true);
                let interactive = body.get("OpenStdin").and_then(Value::as_bool).unwrap_or(false);
                set_path(body, &["AttachStdout"], json!(attach));
                set_path(body, &["AttachStderr"], json!(attach));
                set_path(body, &["AttachStdin"], json!(attach && interactive));
                set_path(body, &["StdinOnce"], json!(attach && interactive));
            }
            FacetKind::ExposedPorts => merge_object(body, &["ExposedPorts"], &keys_as_object(prepared)),
            FacetKind::PublishedPorts => {
                let resolved = resolve_placeholders(prepared, ctx.default_host_ip);
                let keys: Vec<Value> = object_keys(Some(&resolved));
                merge_object(body, &["ExposedPorts"], &keys_as_object(&Value::Array(keys)));
                set_path(body, &["HostConfig", "PortBindings"], resolved);
            }
            FacetKind::Volumes => merge_object(body, &["Volumes"], &keys_as_object(prepared)),
            FacetKind::VolumeBinds => set_path(body, &["HostConfig", "Binds"], prepared.clone()),
            FacetKind::Mounts => {
                let mounts: Vec<Value> = prepared
                    .as_array()
                    .map(|m| m.iter().map(mount_to_api).collect())
                    .unwrap_or_default();
                set_path(body, &["HostConfig", "Mounts"], Value::Array(mounts));
            }
            FacetKind::RestartPolicy => {
                set_path(body, &["HostConfig", "RestartPolicy", "Name"], prepared.clone())
            }
            FacetKind::Links => set_path(body, &["HostConfig", "Links"], prepared.clone()),
            FacetKind::OutOfBand => {}
        }
    }

    /// Writes the facet into a `POST /containers/{id}/update` body.
    /// Returns `false` for facets that cannot be updated in place.
    pub fn apply_update(&self, prepared: &Value, body: &mut Value) -> bool {
        match &self.kind {
            FacetKind::Field {
                update: Some(path), ..
            } => {
                set_path(body, path, prepared.clone());
                true
            }
            FacetKind::RestartPolicy => {
                set_path(body, &["RestartPolicy", "Name"], prepared.clone());
                true
            }
            _ => false,
        }
    }

    /// Docker CLI flags for `docker container create`, or for
    /// `docker container update` on updatable facets.
    ///
    /// `values` gives access to sibling facets (`restart_retries`).
    pub fn cli_args(&self, prepared: &Value, values: &FacetValues, ctx: &FacetContext) -> Vec<String> {
        let pair = |flag: &str, v: String| vec![flag.to_string(), v];
        match &self.kind {
            FacetKind::Field { value, cli: Some(flag), .. } => render_field_cli(flag, *value, prepared),
            FacetKind::Env => env_pairs(prepared)
                .iter()
                .flat_map(|p| pair("--env", cli_scalar(p)))
                .collect(),
            FacetKind::Labels => prepared
                .as_object()
                .into_iter()
                .flatten()
                .flat_map(|(k, v)| pair("--label", format!("{}={}", k, cli_scalar(v))))
                .collect(),
            FacetKind::Healthcheck => healthcheck_cli_args(prepared),
            FacetKind::Interactive if prepared.as_bool() == Some(true) => vec!["--interactive".into()],
            FacetKind::Detach if prepared.as_bool() == Some(false) => {
                let mut args = vec!["--attach", "stdout", "--attach", "stderr"];
                if values.get("interactive").and_then(Value::as_bool) == Some(true) {
                    args.extend(["--attach", "stdin"]);
                }
                args.into_iter().map(String::from).collect()
            }
            FacetKind::ExposedPorts => prepared
                .as_array()
                .into_iter()
                .flatten()
                .flat_map(|p| pair("--expose", cli_scalar(p)))
                .collect(),
            FacetKind::PublishedPorts => bindings_to_cli(&resolve_placeholders(prepared, ctx.default_host_ip)),
            FacetKind::Volumes | FacetKind::VolumeBinds => prepared
                .as_array()
                .into_iter()
                .flatten()
                .flat_map(|v| pair("--volume", cli_scalar(v)))
                .collect(),
            FacetKind::Mounts => prepared
                .as_array()
                .into_iter()
                .flatten()
                .flat_map(|m| pair("--mount", mount_to_cli(m)))
                .collect(),
            FacetKind::RestartPolicy => {
                let name = cli_scalar(prepared);
                match values.get("restart_retries").and_then(Value::as_i64) {
                    Some(retries) => pair("--restart", format!("{}:{}", name, retries)),
                    None => pair("--restart", name),
                }
            }
            FacetKind::Links => prepared
                .as_array()
                .into_iter()
                .flatten()
                .flat_map(|l| pair("--link", cli_scalar(l)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// The immutable facet table.
#[derive(Debug, Clone)]
pub struct FacetRegistry {
    facets: IndexMap<&'static str, Facet>,
}

const fn field(
    section: Section,
    path: &'static [&'static str],
    value: ValueKind,
    cli: &'static str,
) -> FacetKind {
    FacetKind::Field {
        section,
        path,
        value,
        update: None,
        cli: Some(cli),
    }
}

const fn updatable(path: &'static [&'static str], value: ValueKind, cli: Option<&'static str>) -> FacetKind {
    FacetKind::Field {
        section: Section::HostConfig,
        path,
        value,
        update: Some(path),
        cli,
    }
}

impl FacetRegistry {
    /// Builds the registry. The order of entries is the order in which
    /// differences are reported and payload fields are written.
    pub fn build() -> Self {
        use ComparisonType::{Dict, List, Set, SetOfDict, Value as Scalar};
        use Section::{Config as C, HostConfig as H};
        use ValueKind as V;

        let facets = vec![
            Facet::new("image", Scalar, FacetKind::OutOfBand),
            Facet::new("command", List, FacetKind::Command),
            Facet::new("entrypoint", List, FacetKind::Entrypoint),
            Facet::new("env", Set, FacetKind::Env),
            Facet::new("labels", Dict, FacetKind::Labels),
            Facet::new("hostname", Scalar, field(C, &["Hostname"], V::Str, "--hostname")),
            Facet::new("domainname", Scalar, field(C, &["Domainname"], V::Str, "--domainname")),
            Facet::new("user", Scalar, field(C, &["User"], V::Str, "--user")),
            Facet::new("working_dir", Scalar, field(C, &["WorkingDir"], V::Str, "--workdir")),
            Facet::new("tty", Scalar, field(C, &["Tty"], V::Bool, "--tty")),
            Facet::new("interactive", Scalar, FacetKind::Interactive),
            Facet::new("detach", Scalar, FacetKind::Detach),
            Facet::new("stop_signal", Scalar, field(C, &["StopSignal"], V::Str, "--stop-signal")),
            Facet::new("exposed_ports", Set, FacetKind::ExposedPorts),
            Facet::new("volumes", Set, FacetKind::Volumes),
            Facet::new("healthcheck", Dict, FacetKind::Healthcheck).strict(),
            Facet::new("mac_address", Scalar, field(C, &["MacAddress"], V::Str, "--mac-address")),
            Facet::new("published_ports", Dict, FacetKind::PublishedPorts).strict(),
            Facet::new("publish_all_ports", Scalar, field(H, &["PublishAllPorts"], V::Bool, "--publish-all")),
            Facet::new("volume_binds", Set, FacetKind::VolumeBinds),
            Facet::new("mounts", SetOfDict, FacetKind::Mounts),
            Facet::new("volumes_from", Set, field(H, &["VolumesFrom"], V::StrList, "--volumes-from")),
            Facet::new("memory", Scalar, updatable(&["Memory"], V::Bytes, Some("--memory"))),
            Facet::new(
                "memory_reservation",
                Scalar,
                updatable(&["MemoryReservation"], V::Bytes, Some("--memory-reservation")),
            ),
            Facet::new("memory_swap", Scalar, updatable(&["MemorySwap"], V::SwapBytes, Some("--memory-swap"))),
            Facet::new(
                "memory_swappiness",
                Scalar,
                field(H, &["MemorySwappiness"], V::Int, "--memory-swappiness"),
            ),
            Facet::new("shm_size", Scalar, field(H, &["ShmSize"], V::Bytes, "--shm-size")),
            Facet::new("cpu_shares", Scalar, updatable(&["CpuShares"], V::Int, Some("--cpu-shares"))),
            Facet::new("cpus", Scalar, updatable(&["NanoCpus"], V::NanoCpus, Some("--cpus"))),
            Facet::new("cpu_period", Scalar, updatable(&["CpuPeriod"], V::Int, Some("--cpu-period"))),
            Facet::new("cpu_quota", Scalar, updatable(&["CpuQuota"], V::Int, Some("--cpu-quota"))),
            Facet::new("cpuset_cpus", Scalar, updatable(&["CpusetCpus"], V::Str, Some("--cpuset-cpus"))),
            Facet::new("cpuset_mems", Scalar, updatable(&["CpusetMems"], V::Str, Some("--cpuset-mems"))),
            Facet::new("blkio_weight", Scalar, updatable(&["BlkioWeight"], V::Int, Some("--blkio-weight"))),
            Facet::new("pids_limit", Scalar, updatable(&["PidsLimit"], V::Int, Some("--pids-limit"))),
            Facet::new("restart_policy", Scalar, FacetKind::RestartPolicy),
            Facet::new(
                "restart_retries",
                Scalar,
                updatable(&["RestartPolicy", "MaximumRetryCount"], V::Int, None),
            ),
            Facet::new("privileged", Scalar, field(H, &["Privileged"], V::Bool, "--privileged")),
            Facet::new("read_only", Scalar, field(H, &["ReadonlyRootfs"], V::Bool, "--read-only")),
            Facet::new("init", Scalar, field(H, &["Init"], V::Bool, "--init")),
            Facet::new("auto_remove", Scalar, field(H, &["AutoRemove"], V::Bool, "--rm")),
            Facet::new(
                "oom_killer",
                Scalar,
                field(H, &["OomKillDisable"], V::NegatedBool, "--oom-kill-disable"),
            ),
            Facet::new("oom_score_adj", Scalar, field(H, &["OomScoreAdj"], V::Int, "--oom-score-adj")),
            Facet::new("network_mode", Scalar, field(H, &["NetworkMode"], V::Str, "--network")),
            Facet::new("pid_mode", Scalar, field(H, &["PidMode"], V::Str, "--pid")),
            Facet::new("ipc_mode", Scalar, field(H, &["IpcMode"], V::Str, "--ipc")),
            Facet::new("userns_mode", Scalar, field(H, &["UsernsMode"], V::Str, "--userns")),
            Facet::new("uts", Scalar, field(H, &["UTSMode"], V::Str, "--uts")),
            Facet::new("runtime", Scalar, field(H, &["Runtime"], V::Str, "--runtime")),
            Facet::new("cgroupns_mode", Scalar, field(H, &["CgroupnsMode"], V::Str, "--cgroupns")),
            Facet::new("cgroup_parent", Scalar, field(H, &["CgroupParent"], V::Str, "--cgroup-parent")),
            Facet::new("dns_servers", List, field(H, &["Dns"], V::StrList, "--dns")),
            Facet::new("dns_search_domains", List, field(H, &["DnsSearch"], V::StrList, "--dns-search")),
            Facet::new("dns_opts", Set, field(H, &["DnsOptions"], V::StrList, "--dns-option")),
            Facet::new("etc_hosts", Set, field(H, &["ExtraHosts"], V::ExtraHosts, "--add-host")),
            Facet::new("capabilities", Set, field(H, &["CapAdd"], V::StrList, "--cap-add")),
            Facet::new("cap_drop", Set, field(H, &["CapDrop"], V::StrList, "--cap-drop")),
            Facet::new("security_opts", Set, field(H, &["SecurityOpt"], V::StrList, "--security-opt")),
            Facet::new("groups", Set, field(H, &["GroupAdd"], V::StrList, "--group-add")),
            Facet::new("links", Set, FacetKind::Links),
            Facet::new("devices", SetOfDict, field(H, &["Devices"], V::Devices, "--device")),
            Facet::new("ulimits", SetOfDict, field(H, &["Ulimits"], V::Ulimits, "--ulimit")),
            Facet::new("sysctls", Dict, field(H, &["Sysctls"], V::StrMap, "--sysctl")),
            Facet::new("tmpfs", Dict, field(H, &["Tmpfs"], V::Tmpfs, "--tmpfs")),
            Facet::new("log_driver", Scalar, field(H, &["LogConfig", "Type"], V::Str, "--log-driver")),
            Facet::new("log_options", Dict, field(H, &["LogConfig", "Config"], V::StrMap, "--log-opt")),
            Facet::new("storage_opts", Dict, field(H, &["StorageOpt"], V::StrMap, "--storage-opt")),
            Facet::new("networks", Set, FacetKind::OutOfBand),
        ];
        Self {
            facets: facets.into_iter().map(|f| (f.name, f)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Facet> {
        self.facets.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Facet> {
        self.facets.values()
    }

    /// Resolves the effective comparison mode of every facet.
    ///
    /// # Arguments
    ///
    /// * `overrides` - the container spec's `comparisons` table.
    /// * `networks_given` - whether the container spec names networks; the `*` wildcard
    ///   only reaches `networks` when it does.
    ///
    /// # Errors
    ///
    /// `DockhandError::Config` for unknown facet names, unknown modes, a
    /// wildcard other than `strict`/`ignore`, or `allow_more_present` on a
    /// value facet.
    pub fn resolve_comparisons(
        &self,
        overrides: &IndexMap<String, String>,
        networks_given: bool,
    ) -> Result<IndexMap<&'static str, ComparisonMode>> {
        let mut modes: IndexMap<&'static str, ComparisonMode> =
            self.iter().map(|f| (f.name, f.default_mode)).collect();

        if let Some(raw) = overrides.get("*") {
            let mode = match ComparisonMode::parse(raw) {
                Some(m @ (ComparisonMode::Strict | ComparisonMode::Ignore)) => m,
                _ => {
                    return Err(config_error(
                        "The wildcard can only be used with comparison modes 'strict' and 'ignore'!"
                            .to_string(),
                    ))
                }
            };
            for (name, slot) in modes.iter_mut() {
                if *name == "networks" && !networks_given {
                    continue;
                }
                *slot = mode;
            }
        }

        for (key, raw) in overrides.iter().filter(|(k, _)| k.as_str() != "*") {
            let facet = self.get(key).ok_or_else(|| {
                config_error(format!("Unknown module option '{}' in comparisons dict!", key))
            })?;
            let mode = ComparisonMode::parse(raw)
                .ok_or_else(|| config_error(format!("Unknown comparison mode '{}'!", raw)))?;
            if facet.comparison_type == ComparisonType::Value && mode == ComparisonMode::AllowMorePresent {
                return Err(config_error(format!(
                    "Option '{}' does not support comparison mode 'allow_more_present'.",
                    key
                )));
            }
            modes.insert(facet.name, mode);
        }

        if let Some(volumes) = modes.get("volumes").copied() {
            modes.insert("volume_binds", volumes);
        }
        Ok(modes)
    }

    /// Full `POST /containers/create` body and the matching
    /// `docker container create` arguments (flags, image, command).
    pub fn create_request(&self, values: &FacetValues, ctx: &FacetContext, image: &str) -> (Value, Vec<String>) {
        let mut body = json!({"Image": image, "HostConfig": {}});
        let mut args: Vec<String> = Vec::new();
        for facet in self.iter() {
            let Some(prepared) = values.get(facet.name) else {
                continue;
            };
            facet.apply_create(prepared, ctx, &mut body);
            if facet.kind != FacetKind::Command && facet.kind != FacetKind::Entrypoint {
                args.extend(facet.cli_args(prepared, values, ctx));
            }
        }

        let words = |name: &str| -> Vec<String> {
            values
                .get(name)
                .and_then(Value::as_array)
                .map(|a| a.iter().map(cli_scalar).collect())
                .unwrap_or_default()
        };
        let entrypoint = words("entrypoint");
        let mut trailing: Vec<String> = Vec::new();
        if values.contains_key("entrypoint") {
            match entrypoint.split_first() {
                Some((first, rest)) => {
                    args.push("--entrypoint".into());
                    args.push(first.clone());
                    trailing.extend(rest.iter().cloned());
                }
                None => {
                    args.push("--entrypoint".into());
                    args.push(String::new());
                }
            }
        }
        args.push(image.to_string());
        args.extend(trailing);
        args.extend(words("command"));
        (body, args)
    }

    /// `POST /containers/{id}/update` body and `docker container update` flags
    /// covering every updatable facet the container spec sets.
    pub fn update_request(&self, values: &FacetValues, ctx: &FacetContext) -> (Value, Vec<String>) {
        let mut body = json!({});
        let mut args = Vec::new();
        for facet in self.iter().filter(|f| f.is_updatable()) {
            if let Some(prepared) = values.get(facet.name) {
                facet.apply_update(prepared, &mut body);
                args.extend(facet.cli_args(prepared, values, ctx));
            }
        }
        (body, args)
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(image: Option<&'a Value>) -> FacetContext<'a> {
        FacetContext {
            image,
            label_policy: LabelMismatchPolicy::Ignore,
            default_host_ip: "0.0.0.0",
        }
    }

    fn prepare(registry: &FacetRegistry, name: &str, raw: Value) -> Value {
        registry.get(name).unwrap().prepare(&raw).unwrap().unwrap()
    }

    #[test]
    fn test_registry_shape() {
        let registry = FacetRegistry::build();
        let first: Vec<&str> = registry.iter().take(3).map(|f| f.name).collect();
        assert_eq!(first, vec!["image", "command", "entrypoint"]);
        assert!(registry.get("memory").unwrap().is_updatable());
        assert!(registry.get("restart_policy").unwrap().is_updatable());
        assert!(!registry.get("env").unwrap().is_updatable());
        assert!(registry.get("networks").unwrap().is_out_of_band());
        assert_eq!(registry.get("healthcheck").unwrap().default_mode, ComparisonMode::Strict);
    }

    #[test]
    fn test_field_preparation() {
        let r = FacetRegistry::build();
        assert_eq!(prepare(&r, "memory", json!("256m")), json!(268435456));
        assert_eq!(prepare(&r, "memory_swap", json!("unlimited")), json!(-1));
        assert_eq!(prepare(&r, "cpus", json!(1.5)), json!(1_500_000_000i64));
        assert_eq!(prepare(&r, "oom_killer", json!(true)), json!(false));
        assert_eq!(prepare(&r, "etc_hosts", json!({"db": "10.0.0.2"})), json!(["db:10.0.0.2"]));
        assert_eq!(
            prepare(&r, "ulimits", json!(["nofile:1024:2048"])),
            json!([{"Name": "nofile", "Soft": 1024, "Hard": 2048}])
        );
        assert_eq!(prepare(&r, "tmpfs", json!(["/run:size=64m", "/tmp"])), json!({"/run": "size=64m", "/tmp": ""}));
        assert_eq!(prepare(&r, "command", json!("sh -c 'echo hi'")), json!(["sh", "-c", "echo hi"]));
        assert!(r.get("memory").unwrap().prepare(&json!("lots")).is_err());
        assert!(r.get("tty").unwrap().prepare(&json!("yes")).is_err());
        assert!(r.get("restart_policy").unwrap().prepare(&json!("sometimes")).is_err());
    }

    #[test]
    fn test_env_rejects_non_strings_and_merges_image() {
        let r = FacetRegistry::build();
        let env = r.get("env").unwrap();
        let err = env.prepare(&json!({"DEBUG": true})).unwrap_err();
        assert!(err.to_string().contains("Key: DEBUG"));

        let image = json!({"Config": {"Env": ["PATH=/usr/bin", "LANG=C"]}});
        let prepared = prepare(&r, "env", json!({"LANG": "en_US.UTF-8", "APP": "1"}));
        let expected = env.expected(&prepared, ComparisonMode::Strict, &ctx(Some(&image))).unwrap();
        assert_eq!(expected, json!(["PATH=/usr/bin", "LANG=en_US.UTF-8", "APP=1"]));
    }

    #[test]
    fn test_label_mismatch_policy() {
        let r = FacetRegistry::build();
        let labels = r.get("labels").unwrap();
        let image = json!({"Config": {"Labels": {"maintainer": "ops"}}});
        let prepared = prepare(&r, "labels", json!({"app": "web"}));

        let merged = labels.expected(&prepared, ComparisonMode::Strict, &ctx(Some(&image))).unwrap();
        assert_eq!(merged, json!({"maintainer": "ops", "app": "web"}));

        let mut failing = ctx(Some(&image));
        failing.label_policy = LabelMismatchPolicy::Fail;
        let err = labels.expected(&prepared, ComparisonMode::Strict, &failing).unwrap_err();
        assert!(err.to_string().contains("Labels: maintainer"));
        assert!(labels.expected(&prepared, ComparisonMode::AllowMorePresent, &failing).is_ok());
    }

    #[test]
    fn test_extract_bespoke_facets() {
        let r = FacetRegistry::build();
        let raw = json!({
            "Config": {"AttachStdout": true, "AttachStderr": true, "OpenStdin": false,
                       "ExposedPorts": {"80/tcp": {}}},
            "HostConfig": {"Binds": ["/srv:/data"], "Links": ["/db:/web/database"],
                           "RestartPolicy": {"Name": "always", "MaximumRetryCount": 0},
                           "Memory": 134217728}
        });
        let get = |name: &str| r.get(name).unwrap().extract(&raw);
        assert_eq!(get("detach"), Some(json!(false)));
        assert_eq!(get("interactive"), Some(json!(false)));
        assert_eq!(get("exposed_ports"), Some(json!(["80/tcp"])));
        assert_eq!(get("volume_binds"), Some(json!(["/srv:/data:rw"])));
        assert_eq!(get("links"), Some(json!(["db:database"])));
        assert_eq!(get("restart_policy"), Some(json!("always")));
        assert_eq!(get("memory"), Some(json!(134217728)));
        assert_eq!(get("cpus"), None);
    }

    #[test]
    fn test_comparison_resolution() {
        let r = FacetRegistry::build();
        let table = |pairs: &[(&str, &str)]| -> IndexMap<String, String> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };

        let modes = r.resolve_comparisons(&table(&[("*", "ignore"), ("env", "strict")]), false).unwrap();
        assert_eq!(modes["memory"], ComparisonMode::Ignore);
        assert_eq!(modes["env"], ComparisonMode::Strict);
        assert_eq!(modes["networks"], ComparisonMode::AllowMorePresent);

        let modes = r.resolve_comparisons(&table(&[("*", "strict")]), true).unwrap();
        assert_eq!(modes["networks"], ComparisonMode::Strict);

        let modes = r.resolve_comparisons(&table(&[("volumes", "strict")]), false).unwrap();
        assert_eq!(modes["volume_binds"], ComparisonMode::Strict);

        assert!(r.resolve_comparisons(&table(&[("*", "allow_more_present")]), false).is_err());
        assert!(r.resolve_comparisons(&table(&[("nonsense", "strict")]), false).is_err());
        assert!(r.resolve_comparisons(&table(&[("env", "loose")]), false).is_err());
        let err = r.resolve_comparisons(&table(&[("memory", "allow_more_present")]), false).unwrap_err();
        assert!(err.to_string().contains("does not support comparison mode"));
    }

    #[test]
    fn test_create_and_update_requests() {
        let r = FacetRegistry::build();
        let mut values = FacetValues::new();
        for (name, raw) in [
            ("entrypoint", json!(["/bin/sh", "-c"])),
            ("command", json!(["echo hi"])),
            ("env", json!({"A": "1"})),
            ("memory", json!("256m")),
            ("restart_policy", json!("on-failure")),
            ("restart_retries", json!(3)),
            ("detach", json!(false)),
        ] {
            values.insert(r.get(name).unwrap().name, prepare(&r, name, raw));
        }

        let (body, args) = r.create_request(&values, &ctx(None), "nginx:1.25");
        assert_eq!(body["Image"], json!("nginx:1.25"));
        assert_eq!(body["Env"], json!(["A=1"]));
        assert_eq!(body["HostConfig"]["Memory"], json!(268435456));
        assert_eq!(body["HostConfig"]["RestartPolicy"], json!({"Name": "on-failure", "MaximumRetryCount": 3}));
        assert_eq!(body["AttachStdout"], json!(true));
        assert_eq!(
            args,
            vec![
                "--env", "A=1", "--attach", "stdout", "--attach", "stderr", "--memory", "268435456",
                "--restart", "on-failure:3", "--entrypoint", "/bin/sh", "nginx:1.25", "-c", "echo hi"
            ]
        );

        let (update, update_args) = r.update_request(&values, &ctx(None));
        assert_eq!(
            update,
            json!({"Memory": 268435456, "RestartPolicy": {"Name": "on-failure", "MaximumRetryCount": 3}})
        );
        assert_eq!(update_args, vec!["--memory", "268435456", "--restart", "on-failure:3"]);
    }
}
