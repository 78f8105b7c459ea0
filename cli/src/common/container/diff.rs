//! # Difference Tracking
//!
//! File: cli/src/common/container/diff.rs
//!
//! Ordered record of `(name, parameter, active)` triples collected while
//! comparing a container against its spec. Drives both the recreate/update
//! decision and the `diff` section of the reconciler result.
//!
use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Difference {
    pub name: String,
    pub parameter: Value,
    pub active: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferenceTracker {
    entries: Vec<Difference>,
}

/// The `before`/`after` maps shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BeforeAfter {
    pub before: Map<String, Value>,
    pub after: Map<String, Value>,
}

impl DifferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, parameter: Value, active: Value) {
        self.entries.push(Difference {
            name: name.into(),
            parameter,
            active,
        });
    }

    pub fn merge(&mut self, other: DifferenceTracker) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Difference] {
        &self.entries
    }

    /// Later entries for the same name win.
    pub fn before_after(&self) -> BeforeAfter {
        let mut result = BeforeAfter::default();
        for entry in &self.entries {
            result.before.insert(entry.name.clone(), entry.active.clone());
            result.after.insert(entry.name.clone(), entry.parameter.clone());
        }
        result
    }

    /// `[{name: {parameter, container}}, ...]`, the per-facet listing.
    pub fn legacy_diffs(&self) -> Vec<Value> {
        self.entries
            .iter()
            .map(|entry| {
                let mut item = Map::new();
                item.insert(
                    entry.name.clone(),
                    json!({"parameter": entry.parameter, "container": entry.active}),
                );
                Value::Object(item)
            })
            .collect()
    }
}
