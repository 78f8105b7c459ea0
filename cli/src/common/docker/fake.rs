//! # In-Memory Engine
//!
//! File: cli/src/common/docker/fake.rs
//!
//! A [`ContainerEngine`] holding containers, images and networks in memory.
//! Created containers look like daemon inspections: image defaults are merged
//! into `Config`, `HostConfig` comes from the request, and endpoints appear
//! under `NetworkSettings.Networks`. Only mutating calls are recorded.
//!
use super::engine::{ContainerEngine, CreateRequest, EndpointRequest, RemoveOptions, UpdateRequest};
use crate::core::error::{DockhandError, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::sync::Mutex;

#[derive(Default)]
struct FakeState {
    containers: IndexMap<String, Value>,
    images: IndexMap<String, Value>,
    remote_images: IndexMap<String, Value>,
    networks: IndexMap<String, Value>,
    calls: Vec<String>,
    next_id: u32,
    health_delay: u32,
    sticky_pause: bool,
    /// Remaining inspections before a "removing" container disappears.
    removing: IndexMap<String, u32>,
    /// Remaining inspections before "starting" turns "healthy".
    health_ticks: IndexMap<String, u32>,
}

impl FakeState {
    fn key_for(&self, name_or_id: &str) -> Option<String> {
        if self.containers.contains_key(name_or_id) {
            return Some(name_or_id.to_string());
        }
        self.containers
            .iter()
            .find(|(_, c)| c["Id"].as_str() == Some(name_or_id))
            .map(|(k, _)| k.clone())
    }

    fn container_mut(&mut self, name_or_id: &str) -> Result<&mut Value> {
        let key = self.key_for(name_or_id).ok_or_else(|| {
            anyhow!(DockhandError::ContainerNotFound {
                name: name_or_id.to_string()
            })
        })?;
        self.containers
            .get_mut(&key)
            .ok_or_else(|| anyhow!("container {} vanished", key))
    }
}

#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

fn set_state(container: &mut Value, status: &str, running: bool) {
    container["State"]["Status"] = json!(status);
    container["State"]["Running"] = json!(running);
    if !running {
        container["State"]["Paused"] = json!(false);
    }
}

/// `KEY=VALUE` lists where later entries override earlier keys.
fn merge_env(base: Option<&Value>, overlay: Option<&Value>) -> Value {
    let mut merged: IndexMap<String, String> = IndexMap::new();
    for entry in [base, overlay]
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(Value::as_str)
    {
        let (k, v) = entry.split_once('=').unwrap_or((entry, ""));
        merged.insert(k.to_string(), v.to_string());
    }
    json!(merged
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>())
}

fn merge_objects(base: Option<&Value>, overlay: Option<&Value>) -> Value {
    let mut merged = Map::new();
    for object in [base, overlay].into_iter().flatten().filter_map(Value::as_object) {
        merged.extend(object.clone());
    }
    Value::Object(merged)
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_image(&self, reference: &str, inspection: Value) {
        self.lock().images.insert(reference.to_string(), inspection);
    }

    /// An image that only becomes local after a pull.
    pub fn add_remote_image(&self, reference: &str, inspection: Value) {
        self.lock().remote_images.insert(reference.to_string(), inspection);
    }

    pub fn add_network(&self, name: &str, inspection: Value) {
        self.lock().networks.insert(name.to_string(), inspection);
    }

    pub fn set_health_delay(&self, inspections: u32) {
        self.lock().health_delay = inspections;
    }

    /// Unpausing reports success but leaves the container paused.
    pub fn set_sticky_pause(&self, sticky: bool) {
        self.lock().sticky_pause = sticky;
    }

    pub fn mark_removing(&self, name: &str, inspections: u32) {
        let mut state = self.lock();
        if let Some(container) = state.containers.get_mut(name) {
            container["State"]["Status"] = json!("removing");
            container["State"]["Running"] = json!(false);
        }
        state.removing.insert(name.to_string(), inspections);
    }

    /// Attaches a network behind the reconciler's back.
    pub fn connect_extra(&self, name: &str, network: &str) {
        let mut state = self.lock();
        if let Some(container) = state.containers.get_mut(name) {
            container["NetworkSettings"]["Networks"][network] = json!({"NetworkID": network, "Aliases": null});
        }
    }

    pub fn container(&self, name: &str) -> Option<Value> {
        self.lock().containers.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn mutate(&self, call: String, id: &str, change: impl FnOnce(&mut Value, bool) -> Result<()>) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(call);
        let sticky = state.sticky_pause;
        let container = state.container_mut(id)?;
        change(container, sticky)
    }
}

fn refuse_if_paused(container: &Value) -> Result<()> {
    if container["State"]["Paused"] == json!(true) {
        return Err(anyhow!(DockhandError::UnpauseRequired(format!(
            "cannot stop container: {}: Container is paused, Unpause the container before stopping or killing",
            container["Id"].as_str().unwrap_or_default()
        ))));
    }
    Ok(())
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn inspect_container(&self, name: &str) -> Result<Option<Value>> {
        let mut state = self.lock();
        let Some(key) = state.key_for(name) else {
            return Ok(None);
        };
        if let Some(remaining) = state.removing.get(&key).copied() {
            if remaining == 0 {
                state.removing.shift_remove(&key);
                state.containers.shift_remove(&key);
                return Ok(None);
            }
            state.removing.insert(key.clone(), remaining - 1);
        }
        if let Some(remaining) = state.health_ticks.get(&key).copied() {
            if remaining == 0 {
                state.health_ticks.shift_remove(&key);
                if let Some(container) = state.containers.get_mut(&key) {
                    container["State"]["Health"]["Status"] = json!("healthy");
                }
            } else {
                state.health_ticks.insert(key.clone(), remaining - 1);
            }
        }
        Ok(state.containers.get(&key).cloned())
    }

    async fn inspect_image(&self, reference: &str) -> Result<Option<Value>> {
        let state = self.lock();
        Ok(state
            .images
            .get(reference)
            .or_else(|| state.images.values().find(|i| i["Id"].as_str() == Some(reference)))
            .cloned())
    }

    async fn inspect_network(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.lock().networks.get(name).cloned())
    }

    async fn pull_image(&self, repository: &str, tag: &str) -> Result<()> {
        let mut state = self.lock();
        let reference = format!("{}:{}", repository, tag);
        state.calls.push(format!("pull {}", reference));
        match state.remote_images.get(&reference).cloned() {
            Some(image) => {
                state.images.insert(reference, image);
                Ok(())
            }
            None => Err(anyhow!(DockhandError::ImageNotFound { name: reference })),
        }
    }

    async fn create_container(&self, request: &CreateRequest) -> Result<String> {
        let mut state = self.lock();
        state.calls.push(format!("create {}", request.name));
        state.next_id += 1;
        let id = format!("{:064x}", state.next_id);

        let mut body = request.payload.clone();
        let body_map = body
            .as_object_mut()
            .ok_or_else(|| anyhow!("create payload must be an object"))?;
        let reference = body_map
            .get("Image")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let host_config = body_map.remove("HostConfig").unwrap_or_else(|| json!({}));
        let networking = body_map.remove("NetworkingConfig");
        let image = state
            .images
            .get(&reference)
            .or_else(|| state.images.values().find(|i| i["Id"].as_str() == Some(&reference)))
            .cloned()
            .unwrap_or_else(|| json!({"Id": reference}));
        let defaults = &image["Config"];

        let mut config = Value::Object(body_map.clone());
        config["Env"] = merge_env(defaults.get("Env"), body_map.get("Env"));
        for key in ["Labels", "ExposedPorts", "Volumes"] {
            let merged = merge_objects(defaults.get(key), body_map.get(key));
            if merged.as_object().is_some_and(|m| !m.is_empty()) {
                config[key] = merged;
            }
        }
        if config.get("Cmd").is_none() {
            if let Some(cmd) = defaults.get("Cmd") {
                config["Cmd"] = cmd.clone();
            }
        }

        let mut host_config = host_config;
        let network_mode = host_config
            .get("NetworkMode")
            .and_then(Value::as_str)
            .unwrap_or("default")
            .to_string();
        if network_mode == "default" {
            host_config["NetworkMode"] = json!("bridge");
        }
        let mut networks = Map::new();
        match networking.as_ref().and_then(|n| n.get("EndpointsConfig")).and_then(Value::as_object) {
            Some(endpoints) => {
                for (name, endpoint) in endpoints {
                    let mut settings = endpoint.clone();
                    settings["NetworkID"] = json!(name);
                    networks.insert(name.clone(), settings);
                }
            }
            None => {
                let name = if network_mode == "default" { "bridge" } else { network_mode.as_str() };
                if state.networks.contains_key(name) {
                    networks.insert(name.to_string(), json!({"NetworkID": name, "Aliases": null}));
                }
            }
        }

        let mut container_state = json!({"Status": "created", "Running": false, "Paused": false});
        let healthcheck = config.get("Healthcheck").or_else(|| defaults.get("Healthcheck"));
        if healthcheck.is_some_and(|h| h["Test"] != json!(["NONE"])) {
            container_state["Health"] = json!({"Status": "starting"});
        }

        let container = json!({
            "Id": id,
            "Name": format!("/{}", request.name),
            "Image": image["Id"],
            "Config": config,
            "HostConfig": host_config,
            "State": container_state,
            "NetworkSettings": {"Networks": networks},
        });
        state.containers.insert(request.name.clone(), container);
        Ok(id)
    }

    async fn update_container(&self, id: &str, request: &UpdateRequest) -> Result<()> {
        self.mutate(format!("update {}", id), id, |container, _| {
            if let Some(fields) = request.payload.as_object() {
                for (key, value) in fields {
                    container["HostConfig"][key.as_str()] = value.clone();
                }
            }
            Ok(())
        })
    }

    async fn start(&self, id: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(format!("start {}", id));
        let delay = state.health_delay;
        let key = state.key_for(id).ok_or_else(|| {
            anyhow!(DockhandError::ContainerNotFound { name: id.to_string() })
        })?;
        let container = state.container_mut(id)?;
        set_state(container, "running", true);
        let has_health = container["State"].get("Health").is_some();
        if has_health {
            container["State"]["Health"]["Status"] = json!("starting");
            state.health_ticks.insert(key, delay);
        }
        Ok(())
    }

    async fn stop(&self, id: &str, _timeout: Option<u32>) -> Result<()> {
        self.mutate(format!("stop {}", id), id, |container, _| {
            refuse_if_paused(container)?;
            set_state(container, "exited", false);
            Ok(())
        })
    }

    async fn restart(&self, id: &str, _timeout: Option<u32>) -> Result<()> {
        self.mutate(format!("restart {}", id), id, |container, _| {
            set_state(container, "running", true);
            Ok(())
        })
    }

    async fn kill(&self, id: &str, signal: Option<&str>) -> Result<()> {
        self.mutate(format!("kill {} {}", id, signal.unwrap_or("KILL")), id, |container, _| {
            refuse_if_paused(container)?;
            set_state(container, "exited", false);
            Ok(())
        })
    }

    async fn pause(&self, id: &str) -> Result<()> {
        self.mutate(format!("pause {}", id), id, |container, _| {
            container["State"]["Paused"] = json!(true);
            container["State"]["Status"] = json!("paused");
            Ok(())
        })
    }

    async fn unpause(&self, id: &str) -> Result<()> {
        self.mutate(format!("unpause {}", id), id, |container, sticky| {
            if !sticky {
                container["State"]["Paused"] = json!(false);
                container["State"]["Status"] = json!("running");
            }
            Ok(())
        })
    }

    async fn remove(&self, id: &str, options: RemoveOptions) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(format!("remove {} volumes={}", id, options.volumes));
        let key = state.key_for(id).ok_or_else(|| {
            anyhow!(DockhandError::ContainerNotFound { name: id.to_string() })
        })?;
        let container = &state.containers[&key];
        if !options.force && container["State"]["Running"] == json!(true) {
            return Err(anyhow!(DockhandError::Daemon {
                status: 409,
                message: "You cannot remove a running container".to_string(),
            }));
        }
        state.containers.shift_remove(&key);
        Ok(())
    }

    async fn connect_network(&self, container: &str, network: &str, endpoint: &EndpointRequest) -> Result<()> {
        self.mutate(format!("connect {} {}", container, network), container, |c, _| {
            let mut settings = endpoint.to_api();
            settings["NetworkID"] = json!(network);
            c["NetworkSettings"]["Networks"][network] = settings;
            Ok(())
        })
    }

    async fn disconnect_network(&self, container: &str, network: &str) -> Result<()> {
        self.mutate(format!("disconnect {} {}", container, network), container, |c, _| {
            if let Some(networks) = c["NetworkSettings"]["Networks"].as_object_mut() {
                networks.remove(network);
            }
            Ok(())
        })
    }
}
