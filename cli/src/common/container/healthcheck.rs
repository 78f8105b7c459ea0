//! # Healthcheck Normalization
//!
//! File: cli/src/common/container/healthcheck.rs
//!
//! Turns the user-facing healthcheck shapes into the Engine API
//! `Config.Healthcheck` object:
//!
//! * `test = "curl -f localhost"` becomes `["CMD-SHELL", "curl -f localhost"]`,
//! * `test = ["CMD", ...]` is passed through,
//! * `disable = true` or `test = ["NONE"]` becomes `{"Test": ["NONE"]}`,
//! * durations (`interval`, `timeout`, `start_period`, `start_interval`) become
//!   nanoseconds.
//!
use super::units::{duration_to_nanos, nanos_to_go_duration};
use crate::core::error::{DockhandError, Result};
use anyhow::anyhow;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HealthTest {
    Shell(String),
    Exec(Vec<String>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthcheckSpec {
    pub test: Option<HealthTest>,
    pub interval: Option<String>,
    pub timeout: Option<String>,
    pub start_period: Option<String>,
    pub start_interval: Option<String>,
    pub retries: Option<u32>,
    #[serde(default)]
    pub disable: bool,
}

const DURATIONS: &[(&str, &str)] = &[
    ("interval", "Interval"),
    ("timeout", "Timeout"),
    ("start_period", "StartPeriod"),
    ("start_interval", "StartInterval"),
];

impl HealthcheckSpec {
    fn duration(&self, key: &str) -> Option<&String> {
        match key {
            "interval" => self.interval.as_ref(),
            "timeout" => self.timeout.as_ref(),
            "start_period" => self.start_period.as_ref(),
            _ => self.start_interval.as_ref(),
        }
    }
}

/// Normalizes a healthcheck parameter.
///
/// Returns `None` when nothing was configured (an empty table), so the facet
/// is not compared at all.
pub fn normalize_healthcheck(raw: &Value) -> Result<Option<Value>> {
    let spec: HealthcheckSpec = serde_json::from_value(raw.clone())
        .map_err(|e| anyhow!(DockhandError::Config(format!("Invalid healthcheck: {}", e))))?;

    let test = match &spec.test {
        Some(HealthTest::Shell(cmd)) => Some(vec!["CMD-SHELL".to_string(), cmd.clone()]),
        Some(HealthTest::Exec(args)) => Some(args.clone()),
        None => None,
    };
    let disabled = spec.disable
        || test
            .as_ref()
            .and_then(|t| t.first())
            .is_some_and(|first| first == "NONE");
    if disabled {
        return Ok(Some(json!({"Test": ["NONE"]})));
    }

    let mut out = Map::new();
    if let Some(test) = test {
        out.insert("Test".into(), json!(test));
    }
    for (key, api_key) in DURATIONS {
        if let Some(text) = spec.duration(key) {
            let nanos = duration_to_nanos(text)?;
            out.insert((*api_key).into(), json!(nanos));
        }
    }
    if let Some(retries) = spec.retries {
        out.insert("Retries".into(), json!(retries));
    }
    Ok((!out.is_empty()).then_some(Value::Object(out)))
}

/// `docker container create` flags for a normalized healthcheck.
pub fn healthcheck_cli_args(healthcheck: &Value) -> Vec<String> {
    let mut args = Vec::new();
    let test: Vec<&str> = healthcheck
        .get("Test")
        .and_then(Value::as_array)
        .map(|t| t.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    match test.split_first() {
        Some((&"NONE", _)) => {
            args.push("--no-healthcheck".to_string());
            return args;
        }
        Some((&"CMD-SHELL", rest)) => {
            args.push("--health-cmd".to_string());
            args.push(rest.join(" "));
        }
        Some((&"CMD", rest)) => {
            args.push("--health-cmd".to_string());
            args.push(shlex::try_join(rest.iter().copied()).unwrap_or_else(|_| rest.join(" ")));
        }
        _ => {}
    }
    let flags = [
        ("Interval", "--health-interval"),
        ("Timeout", "--health-timeout"),
        ("StartPeriod", "--health-start-period"),
        ("StartInterval", "--health-start-interval"),
    ];
    for (key, flag) in flags {
        if let Some(nanos) = healthcheck.get(key).and_then(Value::as_i64) {
            args.push(flag.to_string());
            args.push(nanos_to_go_duration(nanos));
        }
    }
    if let Some(retries) = healthcheck.get("Retries").and_then(Value::as_i64) {
        args.push("--health-retries".to_string());
        args.push(retries.to_string());
    }
    args
}
