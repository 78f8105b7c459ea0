//! # Docker Compose Support
//!
//! File: cli/src/common/compose/mod.rs
//!
//! ## Overview
//!
//! Parsing and driving Docker Compose v2:
//!
//! - **`event`**: the typed event model and status vocabulary.
//! - **`logfmt`**: the `key=value` line parser used for daemon-style logs.
//! - **`text`**: the text progress parser (plugins before 2.29.0).
//! - **`json`**: the JSON-lines progress parser (2.29.0 and later).
//! - **`classify`**: change detection, actions, warnings and failure messages.
//! - **`version`**: plugin version parsing and feature thresholds.
//! - **`manager`**: `up`, `down`, `stop`, `restart`, `pull`, `build`, `ps`, `images`.
//!
//! [`summarize_events`] runs the parser and classifier offline over captured
//! stderr, without invoking Compose.
//!
use classify::{build_failure_message, emit_warnings, extract_actions, has_changes, is_failed, Action};
use event::Event;
use serde::Serialize;

pub mod classify;
pub mod event;
pub mod json;
pub mod logfmt;
pub mod manager;
pub mod text;
pub mod version;

/// Progress format of captured Compose stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EventFormat {
    #[default]
    Text,
    Json,
}

/// Classification of one captured Compose invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventSummary {
    pub changed: bool,
    pub actions: Vec<Action>,
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

/// Parses and classifies captured stderr.
///
/// `rc` is the exit code the invocation ended with; a non-zero code marks the
/// summary failed and lets the text parser recover bare error lines.
pub fn summarize_events(stderr: &str, format: EventFormat, dry_run: bool, rc: i32) -> EventSummary {
    let parsed = match format {
        EventFormat::Text => text::parse_text_events(stderr, dry_run, rc != 0),
        EventFormat::Json => json::parse_json_events(stderr),
    };
    let mut warnings = parsed.warnings;
    warnings.extend(emit_warnings(&parsed.events));
    let failed = is_failed(rc);
    EventSummary {
        changed: has_changes(&parsed.events, false, false),
        actions: extract_actions(&parsed.events),
        msg: failed.then(|| build_failure_message(&parsed.events, rc)),
        events: parsed.events,
        warnings,
        failed,
    }
}
