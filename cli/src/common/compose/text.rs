//! # Compose Text Event Parser
//!
//! File: cli/src/common/compose/text.rs
//!
//! ## Overview
//!
//! Parses the human-oriented stderr of `docker compose --progress plain`
//! (and of older Compose versions that have no progress flag) into typed
//! [`Event`]s.
//!
//! ## Architecture
//!
//! Each line is matched against a fixed list of grammars, first match wins:
//!
//! | Grammar          | Example                                     | Result                      |
//! |------------------|---------------------------------------------|-----------------------------|
//! | resource         | `Container web  Started`                    | typed event                 |
//! | pull             | `web Pulling`                               | service event               |
//! | pull progress    | `a1b2c3 Downloading [==>  ] 1.2MB/3MB`      | image-layer event           |
//! | error            | `web Error pull access denied`              | error event (opens context) |
//! | warning          | `web Warning no such file`                  | warning only                |
//! | skipped          | `web Skipped - No image to be pulled`       | skipped event               |
//! | build start      | `build service web`                         | service `Building` event    |
//! | build progress   | `==> writing image sha256:...`              | dropped                     |
//! | continuation     | `web - waiting for health check`            | merged into earlier event   |
//! | logfmt           | `time=... level=warning msg="..."`          | warning only                |
//!
//! Lines matching nothing attach to an open error context, become a synthesized
//! error when they are the only (or last failing) line, or produce a
//! "Cannot parse event from line" warning.
//!
//! The scan is a fold over the lines with an explicit [`TextParseState`]
//! accumulator; continuation lines replace an earlier entry in place so output
//! order reflects where each event was first introduced.
//!
use super::event::{
    is_known_status, Event, ParsedEvents, ResourceType, DRY_RUN_MARKER,
    PULL_PROGRESS_DONE, PULL_PROGRESS_WORKING, PULL_STATUSES,
};
use super::logfmt;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static RE_RESOURCE_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<resource_type>Network|Image|Volume|Container)\s+(?P<resource_id>\S+)\s+(?P<status>\S(?:.*\S)?)\s*$",
    )
    .expect("resource event grammar")
});

static RE_PULL_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*(?P<service>\S+)\s+(?P<status>{})\s*$",
        alternation(PULL_STATUSES)
    ))
    .expect("pull event grammar")
});

static RE_PULL_PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    let mut statuses: Vec<&str> = PULL_PROGRESS_DONE
        .iter()
        .chain(PULL_PROGRESS_WORKING)
        .copied()
        .collect();
    statuses.sort_unstable();
    Regex::new(&format!(
        r"^\s*(?P<layer>\S+)\s+(?P<status>{})\s*(?:\s\[[^\]]+\]\s+\S+\s*|\s+[0-9.kKmMgGbB]+/[0-9.kKmMgGbB]+\s*)?$",
        alternation(&statuses)
    ))
    .expect("pull progress grammar")
});

static RE_ERROR_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<resource_id>\S+)\s+(?P<status>Error)\s*(?P<msg>\S(?:.*\S)?)?$")
        .expect("error event grammar")
});

static RE_WARNING_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<resource_id>\S+)\s+(?P<status>Warning)\s*(?P<msg>\S(?:.*\S)?)?$")
        .expect("warning event grammar")
});

static RE_SKIPPED_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<resource_id>\S+)\s+Skipped -\s*(?P<msg>\S(?:.*\S)?)$")
        .expect("skipped event grammar")
});

static RE_BUILD_START_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*build service\s+(?P<resource_id>\S+)$").expect("build start grammar")
});

static RE_BUILD_PROGRESS_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*==>\s+(?P<msg>.*)$").expect("build progress grammar")
});

static RE_CONTINUE_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<resource_id>\S+)\s+-\s*(?P<msg>\S(?:.*\S)?)$")
        .expect("continuation grammar")
});

fn alternation(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

/// Outcome of matching one line against the structured grammars.
enum LineMatch {
    Event(Event),
    /// The line was recognised but yields no event (warnings).
    Consumed,
    NoMatch,
}

fn extract_event(line: &str, warnings: &mut Vec<String>) -> LineMatch {
    if let Some(caps) = RE_RESOURCE_EVENT.captures(line) {
        let resource_type = ResourceType::from_compose_word(&caps["resource_type"])
            .unwrap_or(ResourceType::Unknown);
        let text = &caps["status"];
        // Anything that is not a lifecycle word is informational output.
        let (status, msg) = if is_known_status(text) {
            (Some(text), None)
        } else {
            (None, Some(text))
        };
        return LineMatch::Event(Event::new(
            resource_type,
            Some(&caps["resource_id"]),
            status,
            msg,
        ));
    }
    if let Some(caps) = RE_PULL_EVENT.captures(line) {
        return LineMatch::Event(Event::new(
            ResourceType::Service,
            Some(&caps["service"]),
            Some(&caps["status"]),
            None,
        ));
    }
    if let Some(caps) = RE_PULL_PROGRESS.captures(line) {
        return LineMatch::Event(Event::new(
            ResourceType::ImageLayer,
            Some(&caps["layer"]),
            Some(&caps["status"]),
            None,
        ));
    }
    if let Some(caps) = RE_ERROR_EVENT.captures(line) {
        return LineMatch::Event(Event::new(
            ResourceType::Unknown,
            Some(&caps["resource_id"]),
            Some(&caps["status"]),
            caps.name("msg").map(|m| m.as_str()),
        ));
    }
    if let Some(caps) = RE_WARNING_EVENT.captures(line) {
        let resource_id = &caps["resource_id"];
        warnings.push(match caps.name("msg") {
            Some(msg) => format!("{}: {}", resource_id, msg.as_str()),
            None => format!("Unspecified warning for {}", resource_id),
        });
        return LineMatch::Consumed;
    }
    if let Some(caps) = RE_SKIPPED_EVENT.captures(line) {
        return LineMatch::Event(Event::new(
            ResourceType::Unknown,
            Some(&caps["resource_id"]),
            Some("Skipped"),
            Some(&caps["msg"]),
        ));
    }
    if let Some(caps) = RE_BUILD_START_EVENT.captures(line) {
        return LineMatch::Event(Event::new(
            ResourceType::Service,
            Some(&caps["resource_id"]),
            Some("Building"),
            None,
        ));
    }
    LineMatch::NoMatch
}

/// Accumulator threaded through the line fold.
#[derive(Debug, Default)]
struct TextParseState {
    events: Vec<Event>,
    warnings: Vec<String>,
    /// Index of the error event that unparsable lines currently attach to.
    error_context: Option<usize>,
}

impl TextParseState {
    fn push_event(&mut self, event: Event) {
        self.error_context = event.is_error().then_some(self.events.len());
        self.events.push(event);
    }

    fn append_msg(&mut self, index: usize, text: &str) {
        let event = &mut self.events[index];
        event.msg = Some(match event.msg.take() {
            Some(existing) => format!("{}\n{}", existing, text),
            None => text.to_string(),
        });
    }

    fn find_last_event_for(&self, resource_id: &str) -> Option<usize> {
        self.events
            .iter()
            .rposition(|e| e.resource_id.as_deref() == Some(resource_id))
    }

    /// Tries the logfmt grammar. Returns `true` when the line was consumed.
    fn handle_logfmt(&mut self, line: &str) -> bool {
        if !line.contains("level=") {
            return false;
        }
        match logfmt::parse_line(line) {
            Ok(fields) if fields.get("level").map(String::as_str) == Some("warning") => {
                if let Some(msg) = fields.get("msg") {
                    self.warnings.push(msg.clone());
                }
                true
            }
            _ => false,
        }
    }

    fn step(
        mut self,
        line: &str,
        index: usize,
        line_count: usize,
        dry_run: bool,
        nonzero_rc: bool,
    ) -> Self {
        let mut line = line.trim();
        if line.is_empty() {
            return self;
        }
        if dry_run {
            match line.strip_prefix(DRY_RUN_MARKER) {
                Some(rest) => line = rest.trim_start(),
                None => self
                    .warnings
                    .push(format!("Event line is missing dry-run mode marker: {:?}", line)),
            }
        }

        match extract_event(line, &mut self.warnings) {
            LineMatch::Event(event) => {
                self.push_event(event);
                return self;
            }
            LineMatch::Consumed => return self,
            LineMatch::NoMatch => {}
        }

        if RE_BUILD_PROGRESS_EVENT.is_match(line) {
            return self;
        }

        if let Some(caps) = RE_CONTINUE_EVENT.captures(line) {
            if let Some(idx) = self.find_last_event_for(&caps["resource_id"]) {
                self.append_msg(idx, &caps["msg"]);
                return self;
            }
        }

        if self.handle_logfmt(line) {
            return self;
        }

        if let Some(idx) = self.error_context {
            self.append_msg(idx, line);
            return self;
        }

        if line.starts_with("Error ") {
            self.push_event(Event::new(ResourceType::Unknown, None, Some("Error"), Some(line)));
            return self;
        }

        if line_count == 1 || (nonzero_rc && index + 1 == line_count) {
            // A lone unparsable line under failure is almost certainly the real error.
            self.push_event(Event::new(ResourceType::Unknown, Some(""), Some("Error"), Some(line)));
            return self;
        }

        self.warnings
            .push(format!("Cannot parse event from line: {:?}", line));
        self
    }
}

/// Parses Compose's text event stream.
///
/// # Arguments
///
/// * `stderr` - Captured stderr of one Compose invocation.
/// * `dry_run` - Whether `--dry-run` was passed, so every line should carry the marker.
/// * `nonzero_rc` - Whether the invocation failed; makes an unparsable last line an error.
///
/// # Returns
///
/// The events in order of first introduction, plus collected warnings. The
/// warnings are also emitted through `tracing`.
pub fn parse_text_events(stderr: &str, dry_run: bool, nonzero_rc: bool) -> ParsedEvents {
    let mut lines: Vec<&str> = stderr.lines().collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    let line_count = lines.len();

    let state = lines
        .iter()
        .enumerate()
        .fold(TextParseState::default(), |state, (index, line)| {
            state.step(line, index, line_count, dry_run, nonzero_rc)
        });

    for message in &state.warnings {
        warn!("{}", message);
    }
    ParsedEvents {
        events: state.events,
        warnings: state.warnings,
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn ev(rt: ResourceType, id: &str, status: Option<&str>, msg: Option<&str>) -> Event {
        Event::new(rt, Some(id), status, msg)
    }

    #[test]
    fn test_resource_events() {
        let parsed = parse_text_events(
            "Container web  Creating\nContainer web  Created\nContainer web  Starting\nContainer web  Started\n",
            false,
            false,
        );
        assert_eq!(parsed.events.len(), 4);
        assert_eq!(
            parsed.events[0],
            ev(ResourceType::Container, "web", Some("Creating"), None)
        );
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_resource_event_with_message_instead_of_status() {
        let parsed = parse_text_events(" Network proj_default  Resource is still in use", false, false);
        assert_eq!(
            parsed.events,
            vec![ev(
                ResourceType::Network,
                "proj_default",
                None,
                Some("Resource is still in use")
            )]
        );
    }

    #[test]
    fn test_continuation_merges_into_earlier_event() {
        let parsed = parse_text_events(
            "Container abc  Starting\nabc - waiting for health check",
            false,
            false,
        );
        assert_eq!(
            parsed.events,
            vec![ev(
                ResourceType::Container,
                "abc",
                Some("Starting"),
                Some("waiting for health check")
            )]
        );
    }

    #[test]
    fn test_continuation_replaces_entry_in_place() {
        let parsed = parse_text_events(
            "Container a  Starting\nContainer b  Starting\na - first\na - second",
            false,
            false,
        );
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(parsed.events[0].msg.as_deref(), Some("first\nsecond"));
        assert_eq!(parsed.events[1].resource_id.as_deref(), Some("b"));
        assert_eq!(parsed.events[1].msg, None);
    }

    #[test]
    fn test_dry_run_marker_stripped() {
        let with = parse_text_events("DRY-RUN MODE - Container abc  Started", true, false);
        let without = parse_text_events("Container abc  Started", false, false);
        assert_eq!(with.events, without.events);
        assert!(with.warnings.is_empty());
    }

    #[test]
    fn test_dry_run_marker_missing_warns() {
        let parsed = parse_text_events(
            "Container abc  Started\nContainer abc  Stopping",
            true,
            false,
        );
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(parsed.warnings.len(), 2);
        assert!(parsed.warnings[0].contains("dry-run mode marker"));
    }

    #[test]
    fn test_pull_and_progress_events() {
        let parsed = parse_text_events(
            "web Pulling\n\
             a1b2c3d4 Pulling fs layer\n\
             a1b2c3d4 Downloading [==>        ]  1.2MB/30MB\n\
             a1b2c3d4 Extracting  12.5MB/30MB\n\
             a1b2c3d4 Pull complete\n\
             web Pulled\n",
            false,
            false,
        );
        assert_eq!(
            parsed.events,
            vec![
                ev(ResourceType::Service, "web", Some("Pulling"), None),
                ev(ResourceType::ImageLayer, "a1b2c3d4", Some("Pulling fs layer"), None),
                ev(ResourceType::ImageLayer, "a1b2c3d4", Some("Downloading"), None),
                ev(ResourceType::ImageLayer, "a1b2c3d4", Some("Extracting"), None),
                ev(ResourceType::ImageLayer, "a1b2c3d4", Some("Pull complete"), None),
                ev(ResourceType::Service, "web", Some("Pulled"), None),
            ]
        );
    }

    #[test]
    fn test_error_context_absorbs_following_lines() {
        let parsed = parse_text_events(
            "web Error pull access denied\nrepository does not exist\nmay require login",
            false,
            true,
        );
        assert_eq!(
            parsed.events,
            vec![ev(
                ResourceType::Unknown,
                "web",
                Some("Error"),
                Some("pull access denied\nrepository does not exist\nmay require login")
            )]
        );
    }

    #[test]
    fn test_error_context_closed_by_structured_event() {
        let parsed = parse_text_events(
            "web Error failed\nContainer db  Started\nsome noise\nContainer db  Stopped",
            false,
            false,
        );
        assert_eq!(parsed.events.len(), 3);
        assert_eq!(parsed.events[0].msg.as_deref(), Some("failed"));
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].starts_with("Cannot parse event from line"));
    }

    #[test]
    fn test_warning_line_only_warns() {
        let parsed = parse_text_events("web Warning something odd\nweb Warning", false, false);
        assert!(parsed.events.is_empty());
        assert_eq!(
            parsed.warnings,
            vec![
                "web: something odd".to_string(),
                "Unspecified warning for web".to_string()
            ]
        );
    }

    #[test]
    fn test_skipped_build_and_progress() {
        let parsed = parse_text_events(
            "web Skipped - No image to be pulled\nbuild service web\n==> writing image sha256:abc\n==> naming to docker.io/library/web",
            false,
            false,
        );
        assert_eq!(
            parsed.events,
            vec![
                ev(ResourceType::Unknown, "web", Some("Skipped"), Some("No image to be pulled")),
                ev(ResourceType::Service, "web", Some("Building"), None),
            ]
        );
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_logfmt_warning() {
        let parsed = parse_text_events(
            "time=\"2024-01-01T00:00:00Z\" level=warning msg=\"The \\\"FOO\\\" variable is not set.\"\nContainer a  Started",
            false,
            false,
        );
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.warnings, vec!["The \"FOO\" variable is not set.".to_string()]);
    }

    #[test]
    fn test_lone_unparsable_line_is_error() {
        let parsed = parse_text_events("no configuration file provided: not found\n", false, true);
        assert_eq!(
            parsed.events,
            vec![ev(
                ResourceType::Unknown,
                "",
                Some("Error"),
                Some("no configuration file provided: not found")
            )]
        );
    }

    #[test]
    fn test_last_line_under_failure_is_error() {
        let parsed = parse_text_events("Container a  Started\nunexpected noise\nservice \"x\" failed", false, true);
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(parsed.events[1].msg.as_deref(), Some("service \"x\" failed"));
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_generic_error_line() {
        let parsed = parse_text_events(
            "Container a  Started\nError response from daemon: conflict\nmore detail\nContainer a  Stopped",
            false,
            false,
        );
        assert_eq!(parsed.events.len(), 3);
        assert_eq!(parsed.events[1].resource_id, None);
        assert_eq!(
            parsed.events[1].msg.as_deref(),
            Some("Error response from daemon: conflict\nmore detail")
        );
    }
}
