//! # Compose Event Classification
//!
//! File: cli/src/common/compose/classify.rs
//!
//! ## Overview
//!
//! Pure functions over a parsed event sequence. They answer the questions the
//! Compose manager needs for its result: did anything change, which actions
//! were taken, did the invocation fail and why, and which events deserve a
//! user-visible warning.
//!
use super::event::{
    is_build_status, is_error_status, is_pull_status, is_working_status, Event, ResourceType,
    PULL_PROGRESS_WORKING, WARNING_STATUSES,
};
use serde::Serialize;
use std::collections::HashSet;

/// One mutating step Compose reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub what: ResourceType,
    pub id: Option<String>,
    pub status: String,
}

fn is_layer_progress_working(event: &Event) -> bool {
    event.resource_type == ResourceType::ImageLayer
        && event
            .status
            .as_deref()
            .is_some_and(|s| PULL_PROGRESS_WORKING.contains(&s))
}

/// Whether any event reports a mutating step.
///
/// Service-level pull and build statuses are skipped when the matching
/// `ignore_*` flag is set. A working layer-progress event always counts.
pub fn has_changes(events: &[Event], ignore_pull: bool, ignore_build: bool) -> bool {
    events.iter().any(|event| {
        if is_layer_progress_working(event) {
            return true;
        }
        match event.status.as_deref() {
            Some(status) if is_working_status(status) => {
                !(ignore_pull && is_pull_status(status) || ignore_build && is_build_status(status))
            }
            _ => false,
        }
    })
}

/// Lists the working-status events as actions, in order.
///
/// Layer-progress entries are deduplicated by `(id, status)`; the first
/// occurrence wins.
pub fn extract_actions(events: &[Event]) -> Vec<Action> {
    let mut seen_layers: HashSet<(Option<&str>, &str)> = HashSet::new();
    let mut actions = Vec::new();
    for event in events {
        let Some(status) = event.status.as_deref() else {
            continue;
        };
        if is_layer_progress_working(event) {
            if !seen_layers.insert((event.resource_id.as_deref(), status)) {
                continue;
            }
        } else if event.resource_type == ResourceType::ImageLayer || !is_working_status(status) {
            continue;
        }
        actions.push(Action {
            what: event.resource_type,
            id: event.resource_id.clone(),
            status: status.to_string(),
        });
    }
    actions
}

/// Failure is decided by the exit code alone.
pub fn is_failed(rc: i32) -> bool {
    rc != 0
}

/// Formats the user-facing warnings carried by the events.
///
/// Informational events (no status, but a message) and explicit `Warning`
/// events each yield one line.
pub fn emit_warnings(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| {
            let is_warning = event
                .status
                .as_deref()
                .is_some_and(|s| WARNING_STATUSES.contains(&s));
            let informational = event.status.is_none() && event.msg.is_some();
            if !(is_warning || informational) {
                return None;
            }
            let mut line = format!("Docker compose: {}", event.resource_type);
            if let Some(id) = event.resource_id.as_deref().filter(|id| !id.is_empty()) {
                line.push(' ');
                line.push_str(id);
            }
            line.push_str(": ");
            line.push_str(event.msg.as_deref().unwrap_or("(no message)"));
            Some(line)
        })
        .collect()
}

/// Builds the failure message for a failed invocation.
///
/// One line per error event. When no error event was recovered the message is
/// `Return code <rc> is non-zero`.
pub fn build_failure_message(events: &[Event], rc: i32) -> String {
    let lines: Vec<String> = events
        .iter()
        .filter(|e| e.status.as_deref().is_some_and(is_error_status))
        .map(|event| {
            let prefix = match (event.resource_id.as_deref(), event.resource_type) {
                (None | Some(""), ResourceType::Unknown) => "General error: ".to_string(),
                (None | Some(""), rt) => format!("Error when processing {}: ", rt),
                (Some(id), ResourceType::Unknown) => format!("Error when processing {}: ", id),
                (Some(id), rt) => format!("Error when processing {} {}: ", rt, id),
            };
            let detail = event
                .msg
                .as_deref()
                .or(event.status.as_deref())
                .unwrap_or_default();
            format!("{}{}", prefix, detail)
        })
        .collect();

    if lines.is_empty() {
        format!("Return code {} is non-zero", rc)
    } else {
        lines.join("\n")
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::compose::text::parse_text_events;

    fn ev(rt: ResourceType, id: Option<&str>, status: Option<&str>, msg: Option<&str>) -> Event {
        Event::new(rt, id, status, msg)
    }

    #[test]
    fn test_up_scenario_actions() {
        let parsed = parse_text_events(
            "Container web  Creating\nContainer web  Created\nContainer web  Starting\nContainer web  Started\n",
            false,
            false,
        );
        assert!(has_changes(&parsed.events, false, false));
        assert_eq!(
            extract_actions(&parsed.events),
            vec![
                Action {
                    what: ResourceType::Container,
                    id: Some("web".into()),
                    status: "Creating".into()
                },
                Action {
                    what: ResourceType::Container,
                    id: Some("web".into()),
                    status: "Starting".into()
                },
            ]
        );
    }

    #[test]
    fn test_done_only_is_unchanged() {
        let events = vec![
            ev(ResourceType::Container, Some("web"), Some("Running"), None),
            ev(ResourceType::Network, Some("n"), None, Some("info")),
        ];
        assert!(!has_changes(&events, false, false));
        assert!(extract_actions(&events).is_empty());
    }

    #[test]
    fn test_has_changes_is_pure() {
        let events = vec![ev(ResourceType::Container, Some("web"), Some("Stopping"), None)];
        assert_eq!(has_changes(&events, false, false), has_changes(&events, false, false));
    }

    #[test]
    fn test_ignore_pull_and_build() {
        let mut events = vec![
            ev(ResourceType::Service, Some("web"), Some("Pulling"), None),
            ev(ResourceType::Service, Some("api"), Some("Building"), None),
        ];
        assert!(has_changes(&events, false, false));
        assert!(has_changes(&events, true, false));
        assert!(has_changes(&events, false, true));
        assert!(!has_changes(&events, true, true));

        events.push(ev(ResourceType::ImageLayer, Some("l1"), Some("Downloading"), None));
        assert!(has_changes(&events, true, true));
    }

    #[test]
    fn test_layer_actions_deduplicated() {
        let events = vec![
            ev(ResourceType::ImageLayer, Some("l1"), Some("Downloading"), None),
            ev(ResourceType::ImageLayer, Some("l1"), Some("Downloading"), None),
            ev(ResourceType::ImageLayer, Some("l2"), Some("Downloading"), None),
            ev(ResourceType::ImageLayer, Some("l1"), Some("Extracting"), None),
            ev(ResourceType::ImageLayer, Some("l1"), Some("Pull complete"), None),
        ];
        let actions = extract_actions(&events);
        let pairs: Vec<(&str, &str)> = actions
            .iter()
            .map(|a| (a.id.as_deref().unwrap(), a.status.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("l1", "Downloading"), ("l2", "Downloading"), ("l1", "Extracting")]
        );
    }

    #[test]
    fn test_failure_messages() {
        let events = vec![
            ev(ResourceType::Container, Some("web"), Some("Error"), Some("boom")),
            ev(ResourceType::Unknown, Some("db"), Some("Error"), None),
            ev(ResourceType::Unknown, Some(""), Some("Error"), Some("lone line")),
            ev(ResourceType::Unknown, None, Some("Error"), Some("tail")),
            ev(ResourceType::Network, None, Some("Error"), Some("net")),
            ev(ResourceType::Container, Some("ok"), Some("Started"), None),
        ];
        assert_eq!(
            build_failure_message(&events, 1),
            "Error when processing container web: boom\n\
             Error when processing db: Error\n\
             General error: lone line\n\
             General error: tail\n\
             Error when processing network: net"
        );
    }

    #[test]
    fn test_failure_message_keeps_type_without_id() {
        let events = vec![
            ev(ResourceType::Container, Some(""), Some("Error"), Some("no name")),
            ev(ResourceType::Unknown, Some(""), Some("Error"), Some("untyped")),
        ];
        assert_eq!(
            build_failure_message(&events, 1),
            "Error when processing container: no name\n\
             General error: untyped"
        );
    }

    #[test]
    fn test_failure_message_fallback() {
        let events = vec![ev(ResourceType::Container, Some("web"), Some("Started"), None)];
        assert_eq!(build_failure_message(&events, 17), "Return code 17 is non-zero");
        assert!(is_failed(17));
        assert!(!is_failed(0));
    }

    #[test]
    fn test_emit_warnings() {
        let events = vec![
            ev(ResourceType::Network, Some("proj_default"), None, Some("Resource is still in use")),
            ev(ResourceType::Unknown, None, Some("Warning"), Some("orphans")),
            ev(ResourceType::Container, Some("web"), Some("Started"), None),
        ];
        assert_eq!(
            emit_warnings(&events),
            vec![
                "Docker compose: network proj_default: Resource is still in use".to_string(),
                "Docker compose: unknown: orphans".to_string(),
            ]
        );
    }
}
