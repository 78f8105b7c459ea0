//! # Compose JSON Event Parser
//!
//! File: cli/src/common/compose/json.rs
//!
//! ## Overview
//!
//! Parses the newline-delimited JSON that `docker compose --progress json`
//! (Compose 2.29 and later) writes to stderr. Each object carries some of the
//! fields `id`, `text`, `status`, `error`, `message`, `tail`, `dry-run`,
//! `level` and `msg`.
//!
//! ## Architecture
//!
//! The format has no stable schema, so the parser is a quirks table. Objects are
//! dispatched by shape (`tail`, then `error`, then everything else) and the
//! generic shape is normalised by a sequence of rules, each written against a
//! malformation observed in some Compose release:
//!
//! 1. `{"id":" ","text":"build service app"}` becomes a `Service`/`Building` event.
//! 2. Ids ending in `==>` with `writing image`/`naming to` text are build echo and dropped.
//! 3. `"<Type> <id>"` ids are split; unknown types map to `Unknown` with a warning.
//! 4. Pull and layer-progress words are moved into `status`, whichever field held them.
//! 5. `Skipped - reason` text is split into status and message.
//! 6. `level`/`msg` log objects are promoted to `Warning`/`Error`.
//! 7. A final swap when only `text` holds a recognised status.
//!
//! No single line can abort the stream: anything undecodable becomes a warning.
//!
use super::event::{
    is_known_status, is_pull_progress_status, is_pull_status, Event, ParsedEvents, ResourceType,
};
use serde_json::{Map, Value};
use tracing::warn;

/// Python-style truthiness of a JSON value.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn str_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

fn level_to_status(level: &str) -> Option<&'static str> {
    match level {
        "warning" => Some("Warning"),
        "error" => Some("Error"),
        _ => None,
    }
}

/// Whether an `id`/`text` pair is the echo of an image build step.
fn is_build_echo(resource_id: &str, text: &str) -> bool {
    if !resource_id.ends_with("==>") {
        return false;
    }
    let text = text.trim_start_matches(|c: char| c == '=' || c == '>' || c.is_whitespace());
    text.starts_with("writing image") || text.starts_with("naming to")
}

/// Converts one decoded JSON object into an event. Returns `None` for
/// objects that are pure progress noise.
fn event_from_object(
    data: &Map<String, Value>,
    line: &str,
    warnings: &mut Vec<String>,
) -> Option<Event> {
    if truthy(data.get("tail")) {
        let mut msg = str_field(data, "text");
        let mut status = "Error";
        if let Some(text) = msg.as_deref() {
            if text.to_lowercase().starts_with("warning:") {
                status = "Warning";
                msg = Some(text.get("warning:".len()..).unwrap_or("").trim_start().to_string());
            }
        }
        return Some(Event {
            resource_type: ResourceType::Unknown,
            resource_id: None,
            status: Some(status.to_string()),
            msg,
        });
    }

    if truthy(data.get("error")) {
        return Some(Event {
            resource_type: ResourceType::Unknown,
            resource_id: str_field(data, "id"),
            status: Some("Error".to_string()),
            msg: str_field(data, "message"),
        });
    }

    let mut resource_type = ResourceType::Unknown;
    let mut resource_id = str_field(data, "id");
    let mut status = str_field(data, "status");
    let mut text = str_field(data, "text");

    // Rule 1: build start reported with a blank id.
    if resource_id.as_deref() == Some(" ") {
        if let Some(service) = text.as_deref().and_then(|t| t.strip_prefix("build service ")) {
            resource_id = Some(format!("Service {}", service));
            text = Some("Building".to_string());
        }
    }

    // Rule 2: build progress echo.
    if let (Some(id), Some(t)) = (resource_id.as_deref(), text.as_deref()) {
        if is_build_echo(id, t) {
            return None;
        }
    }

    let status_word = |s: &Option<String>, pred: fn(&str) -> bool| s.as_deref().is_some_and(pred);

    if let Some(full_id) = resource_id.clone().filter(|id| id.contains(' ')) {
        // Rule 3: "<Type> <id>".
        let (type_word, id) = full_id.split_once(' ').unwrap_or((full_id.as_str(), ""));
        resource_type = match type_word {
            "Service" => ResourceType::Service,
            other => ResourceType::from_compose_word(other).unwrap_or_else(|| {
                warnings.push(format!(
                    "Unknown resource type {:?} in line {:?}",
                    other, line
                ));
                ResourceType::Unknown
            }),
        };
        resource_id = Some(id.to_string());
    } else if status_word(&text, is_pull_status) || status_word(&status, is_pull_status) {
        // Rule 4: pull status, in either field. The id is the service name.
        resource_type = ResourceType::Service;
        if status_word(&text, is_pull_status) {
            std::mem::swap(&mut status, &mut text);
        }
    } else if status_word(&text, is_pull_progress_status)
        || status_word(&status, is_pull_progress_status)
    {
        // Rule 4: layer progress, in either field.
        resource_type = ResourceType::ImageLayer;
        if status_word(&text, is_pull_progress_status) {
            std::mem::swap(&mut status, &mut text);
        }
    } else if status.is_none() && text.as_deref().is_some_and(|t| t.starts_with("Skipped - ")) {
        // Rule 5.
        let split = text
            .as_deref()
            .and_then(|t| t.split_once(" - "))
            .map(|(s, rest)| (s.to_string(), rest.to_string()));
        if let Some((s, rest)) = split {
            status = Some(s);
            text = Some(rest);
        }
    } else if let Some(level_status) = data
        .get("level")
        .and_then(Value::as_str)
        .and_then(level_to_status)
        .filter(|_| data.contains_key("msg"))
    {
        // Rule 6.
        status = Some(level_status.to_string());
        text = str_field(data, "msg");
    }

    // Rule 7.
    if !status_word(&status, is_known_status) && status_word(&text, is_known_status) {
        std::mem::swap(&mut status, &mut text);
    }

    Some(Event {
        resource_type,
        resource_id,
        status,
        msg: text,
    })
}

/// Parses Compose's JSON-lines event stream.
///
/// # Returns
///
/// The events in input order plus collected warnings. Warnings are also
/// emitted through `tracing`.
pub fn parse_json_events(stderr: &str) -> ParsedEvents {
    let mut events = Vec::new();
    let mut warnings = Vec::new();

    for line in stderr.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !line.starts_with('{') || !line.ends_with('}') {
            if let Some(rest) = line.strip_prefix("Warning: ") {
                events.push(Event::new(ResourceType::Unknown, None, Some("Warning"), Some(rest)));
            } else {
                warnings.push(format!("Cannot parse event from non-JSON line: {:?}", line));
            }
            continue;
        }

        let data: Map<String, Value> = match serde_json::from_str(line) {
            Ok(data) => data,
            Err(e) => {
                warnings.push(format!("Cannot parse event from line: {:?}: {}", line, e));
                continue;
            }
        };

        if let Some(event) = event_from_object(&data, line, &mut warnings) {
            events.push(event);
        }
    }

    for message in &warnings {
        warn!("{}", message);
    }
    ParsedEvents { events, warnings }
}
