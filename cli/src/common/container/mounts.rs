//! # Volumes, Binds and Mounts
//!
//! File: cli/src/common/container/mounts.rs
//!
//! ## Overview
//!
//! A container's storage is described three ways at once:
//!
//! * `volumes` entries without a host part are anonymous volumes (`Config.Volumes`),
//! * `volumes` entries with a host part are bind strings (`HostConfig.Binds`),
//! * `mounts` are structured specs (`HostConfig.Mounts`).
//!
//! [`prepare_storage`] splits the user input into those representations once,
//! validates modes and mount-type options, and rejects a target that appears
//! twice across all of them.
//!
use crate::core::error::{DockhandError, Result};
use super::units::human_to_bytes;
use anyhow::anyhow;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path;

const VOLUME_MODES: &[&str] = &[
    "rw", "ro", "consistent", "delegated", "cached", "rprivate", "private", "rshared", "shared",
    "rslave", "slave", "nocopy", "z", "Z",
];

fn config_error(message: String) -> anyhow::Error {
    anyhow!(DockhandError::Config(message))
}

/// Whether every comma-separated part of `mode` is a known volume mode.
pub fn is_volume_mode(mode: &str) -> bool {
    mode.split(',').all(|part| VOLUME_MODES.contains(&part))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountType {
    Bind,
    #[default]
    Volume,
    Tmpfs,
    Npipe,
    Cluster,
}

impl MountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bind => "bind",
            Self::Volume => "volume",
            Self::Tmpfs => "tmpfs",
            Self::Npipe => "npipe",
            Self::Cluster => "cluster",
        }
    }
}

/// One `mounts` entry as written in a container spec.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountSpec {
    pub target: String,
    pub source: Option<String>,
    #[serde(default, rename = "type")]
    pub mount_type: MountType,
    pub read_only: Option<bool>,
    pub consistency: Option<String>,
    pub propagation: Option<String>,
    pub no_copy: Option<bool>,
    pub labels: Option<IndexMap<String, String>>,
    pub volume_driver: Option<String>,
    pub volume_options: Option<IndexMap<String, String>>,
    pub tmpfs_size: Option<String>,
    pub tmpfs_mode: Option<String>,
}

/// Storage split into the three daemon-side representations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedStorage {
    /// Anonymous volume container paths.
    pub volumes: Vec<String>,
    /// `host:container:mode` bind strings.
    pub binds: Vec<String>,
    /// Flat, snake_case mount dicts with unset options omitted.
    pub mounts: Option<Vec<Value>>,
}

struct TargetTracker {
    seen: HashMap<String, &'static str>,
}

impl TargetTracker {
    fn claim(&mut self, target: &str, option: &'static str) -> Result<()> {
        if let Some(previous) = self.seen.insert(target.to_string(), option) {
            return Err(config_error(if previous == option {
                format!("The mount point \"{}\" appears twice in the {} option", target, option)
            } else {
                format!(
                    "The mount point \"{}\" appears both in the {} and {} option",
                    target, option, previous
                )
            }));
        }
        Ok(())
    }
}

fn absolutize(host: &str) -> String {
    if !(host.starts_with('.') || host.starts_with('~')) {
        return host.to_string();
    }
    let expanded = shellexpand::tilde(host).into_owned();
    let path = Path::new(&expanded);
    if path.is_absolute() {
        return expanded;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path).to_string_lossy().into_owned())
        .unwrap_or(expanded)
}

fn prepare_mount(mount: &MountSpec) -> Result<Value> {
    let mount_type = mount.mount_type;
    if mount.source.is_none() && !matches!(mount_type, MountType::Tmpfs | MountType::Volume) {
        return Err(config_error(format!(
            "source must be specified for mount \"{}\" of type \"{}\"",
            mount.target,
            mount_type.as_str()
        )));
    }

    let type_bound: [(&str, bool, MountType); 7] = [
        ("volume_driver", mount.volume_driver.is_some(), MountType::Volume),
        ("volume_options", mount.volume_options.is_some(), MountType::Volume),
        ("propagation", mount.propagation.is_some(), MountType::Bind),
        ("no_copy", mount.no_copy.is_some(), MountType::Volume),
        ("labels", mount.labels.is_some(), MountType::Volume),
        ("tmpfs_size", mount.tmpfs_size.is_some(), MountType::Tmpfs),
        ("tmpfs_mode", mount.tmpfs_mode.is_some(), MountType::Tmpfs),
    ];
    for (option, set, required) in type_bound {
        if set && mount_type != required {
            return Err(config_error(format!(
                "{} cannot be specified for mount \"{}\" of type \"{}\" (needs type \"{}\")",
                option,
                mount.target,
                mount_type.as_str(),
                required.as_str()
            )));
        }
    }

    let mut out = Map::new();
    out.insert("target".into(), json!(mount.target));
    out.insert("type".into(), json!(mount_type.as_str()));
    if let Some(source) = &mount.source {
        let source = if mount_type == MountType::Bind {
            absolutize(source)
        } else {
            source.clone()
        };
        out.insert("source".into(), json!(source));
    }
    if let Some(v) = mount.read_only {
        out.insert("read_only".into(), json!(v));
    }
    if let Some(v) = &mount.consistency {
        out.insert("consistency".into(), json!(v));
    }
    if let Some(v) = &mount.propagation {
        out.insert("propagation".into(), json!(v));
    }
    if let Some(v) = mount.no_copy {
        out.insert("no_copy".into(), json!(v));
    }
    if let Some(v) = mount.labels.as_ref().filter(|l| !l.is_empty()) {
        out.insert("labels".into(), json!(v));
    }
    if let Some(v) = &mount.volume_driver {
        out.insert("volume_driver".into(), json!(v));
        if let Some(opts) = mount.volume_options.as_ref().filter(|o| !o.is_empty()) {
            out.insert("volume_options".into(), json!(opts));
        }
    }
    if let Some(size) = &mount.tmpfs_size {
        let bytes = human_to_bytes(size).map_err(|e| {
            config_error(format!(
                "Failed to convert tmpfs_size of mount \"{}\" to bytes: {}",
                mount.target, e
            ))
        })?;
        out.insert("tmpfs_size".into(), json!(bytes));
    }
    if let Some(mode) = &mount.tmpfs_mode {
        let mode = i64::from_str_radix(mode, 8).map_err(|_| {
            config_error(format!(
                "tmpfs_mode of mount \"{}\" is not an octal string!",
                mount.target
            ))
        })?;
        out.insert("tmpfs_mode".into(), json!(mode));
    }
    Ok(Value::Object(out))
}

/// Validates and splits `volumes` and `mounts`.
///
/// # Errors
///
/// `DockhandError::Config` for invalid volume modes, options that do not fit
/// the mount type, non-octal tmpfs modes, unparsable sizes and duplicate targets.
pub fn prepare_storage(volumes: Option<&[String]>, mounts: Option<&[MountSpec]>) -> Result<PreparedStorage> {
    let mut targets = TargetTracker {
        seen: HashMap::new(),
    };
    let mut storage = PreparedStorage::default();

    if let Some(mounts) = mounts {
        let mut prepared = Vec::with_capacity(mounts.len());
        for mount in mounts {
            targets.claim(&mount.target, "mounts")?;
            prepared.push(prepare_mount(mount)?);
        }
        storage.mounts = Some(prepared);
    }

    for volume in volumes.unwrap_or_default() {
        let parts: Vec<&str> = volume.split(':').collect();
        match parts.as_slice() {
            [host, container, mode] => {
                if !is_volume_mode(mode) {
                    return Err(config_error(format!("Found invalid volumes mode: {}", mode)));
                }
                targets.claim(container, "volumes")?;
                storage
                    .binds
                    .push(format!("{}:{}:{}", absolutize(host), container, mode));
            }
            [container, mode] if is_volume_mode(mode) => {
                targets.claim(container, "volumes")?;
                storage.volumes.push(container.to_string());
            }
            [host, container] => {
                targets.claim(container, "volumes")?;
                storage
                    .binds
                    .push(format!("{}:{}:rw", absolutize(host), container));
            }
            [container] => {
                targets.claim(container, "volumes")?;
                storage.volumes.push(container.to_string());
            }
            _ => {
                return Err(config_error(format!(
                    "Invalid volume specification \"{}\"",
                    volume
                )))
            }
        }
    }
    Ok(storage)
}

/// Brings stored binds to the `host:container:mode` form.
pub fn normalize_bind(bind: &str) -> String {
    let parts: Vec<&str> = bind.split(':').collect();
    match parts.as_slice() {
        [host, container] if !is_volume_mode(container) => format!("{}:{}:rw", host, container),
        _ => bind.to_string(),
    }
}

fn opt_map(value: Option<&Value>) -> Value {
    value.cloned().unwrap_or_else(|| json!({}))
}

/// Reads `HostConfig.Mounts` entries into the flat snake_case shape.
pub fn mount_from_api(mount: &Value) -> Value {
    let empty = json!({});
    let bind = mount.get("BindOptions").unwrap_or(&empty);
    let volume = mount.get("VolumeOptions").unwrap_or(&empty);
    let driver = volume.get("DriverConfig").unwrap_or(&empty);
    let tmpfs = mount.get("TmpfsOptions").unwrap_or(&empty);
    json!({
        "type": mount.get("Type"),
        "source": mount.get("Source"),
        "target": mount.get("Target"),
        "read_only": mount.get("ReadOnly").cloned().unwrap_or(json!(false)),
        "consistency": mount.get("Consistency"),
        "propagation": bind.get("Propagation"),
        "no_copy": volume.get("NoCopy").cloned().unwrap_or(json!(false)),
        "labels": opt_map(volume.get("Labels")),
        "volume_driver": driver.get("Name"),
        "volume_options": opt_map(driver.get("Options")),
        "tmpfs_size": tmpfs.get("SizeBytes"),
        "tmpfs_mode": tmpfs.get("Mode"),
    })
}

/// Converts a prepared mount into the Engine API `Mount` object.
pub fn mount_to_api(mount: &Value) -> Value {
    let get = |key: &str| mount.get(key).cloned();
    let mut out = Map::new();
    for (from, to) in [
        ("target", "Target"),
        ("source", "Source"),
        ("read_only", "ReadOnly"),
        ("consistency", "Consistency"),
    ] {
        if let Some(v) = get(from) {
            out.insert(to.into(), v);
        }
    }
    if let Some(kind) = get("type") {
        out.insert("Type".into(), kind);
    }
    if let Some(p) = get("propagation") {
        out.insert("BindOptions".into(), json!({"Propagation": p}));
    }

    let mut volume = Map::new();
    if let Some(v) = get("no_copy") {
        volume.insert("NoCopy".into(), v);
    }
    if let Some(v) = get("labels") {
        volume.insert("Labels".into(), v);
    }
    if let Some(name) = get("volume_driver") {
        let mut driver = Map::new();
        driver.insert("Name".into(), name);
        if let Some(opts) = get("volume_options") {
            driver.insert("Options".into(), opts);
        }
        volume.insert("DriverConfig".into(), Value::Object(driver));
    }
    if !volume.is_empty() {
        out.insert("VolumeOptions".into(), Value::Object(volume));
    }

    let mut tmpfs = Map::new();
    if let Some(v) = get("tmpfs_size") {
        tmpfs.insert("SizeBytes".into(), v);
    }
    if let Some(v) = get("tmpfs_mode") {
        tmpfs.insert("Mode".into(), v);
    }
    if !tmpfs.is_empty() {
        out.insert("TmpfsOptions".into(), Value::Object(tmpfs));
    }
    Value::Object(out)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders a prepared mount as a `--mount` value.
pub fn mount_to_cli(mount: &Value) -> String {
    let mut fields: Vec<String> = Vec::new();
    let text = |key: &str| mount.get(key).map(scalar_text);
    for (key, flag) in [("type", "type"), ("source", "source"), ("target", "target")] {
        if let Some(v) = text(key) {
            fields.push(format!("{}={}", flag, v));
        }
    }
    if mount.get("read_only").and_then(Value::as_bool) == Some(true) {
        fields.push("readonly".into());
    }
    if let Some(v) = text("consistency") {
        fields.push(format!("consistency={}", v));
    }
    if let Some(v) = text("propagation") {
        fields.push(format!("bind-propagation={}", v));
    }
    if mount.get("no_copy").and_then(Value::as_bool) == Some(true) {
        fields.push("volume-nocopy".into());
    }
    if let Some(v) = text("volume_driver") {
        fields.push(format!("volume-driver={}", v));
    }
    for (key, flag) in [("volume_options", "volume-opt"), ("labels", "volume-label")] {
        if let Some(map) = mount.get(key).and_then(Value::as_object) {
            for (k, v) in map {
                fields.push(format!("{}={}={}", flag, k, scalar_text(v)));
            }
        }
    }
    if let Some(v) = text("tmpfs_size") {
        fields.push(format!("tmpfs-size={}", v));
    }
    if let Some(mode) = mount.get("tmpfs_mode").and_then(Value::as_i64) {
        fields.push(format!("tmpfs-mode={:o}", mode));
    }
    fields.join(",")
}
