//! # Container Snapshot
//!
//! File: cli/src/common/container/snapshot.rs
//!
//! A point-in-time view of one container inspection. Snapshots are never
//! mutated; every state-changing operation is followed by a fresh inspection.
//!
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    raw: Option<Value>,
}

impl Container {
    pub fn new(raw: Option<Value>) -> Self {
        Self { raw }
    }

    pub fn absent() -> Self {
        Self { raw: None }
    }

    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    pub fn into_raw(self) -> Option<Value> {
        self.raw
    }

    fn state_field(&self, key: &str) -> Option<&Value> {
        self.raw.as_ref()?.get("State")?.get(key)
    }

    pub fn exists(&self) -> bool {
        self.raw.is_some()
    }

    pub fn id(&self) -> Option<&str> {
        self.raw.as_ref()?.get("Id")?.as_str()
    }

    /// Image ID the container was created from.
    pub fn image(&self) -> Option<&str> {
        self.raw.as_ref()?.get("Image")?.as_str()
    }

    /// Image reference as written at creation time.
    pub fn image_name(&self) -> Option<&str> {
        self.raw.as_ref()?.get("Config")?.get("Image")?.as_str()
    }

    pub fn running(&self) -> bool {
        let running = self
            .state_field("Running")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let ghost = self
            .state_field("Ghost")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        running && !ghost
    }

    pub fn paused(&self) -> bool {
        self.state_field("Paused")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn removing(&self) -> bool {
        self.state_field("Status").and_then(Value::as_str) == Some("removing")
    }

    /// `None` when the container has no healthcheck.
    pub fn health_status(&self) -> Option<&str> {
        self.state_field("Health")?.get("Status")?.as_str()
    }
}
