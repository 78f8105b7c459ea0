//! # Compose Event Model
//!
//! File: cli/src/common/compose/event.rs
//!
//! ## Overview
//!
//! The value type produced by both Compose stderr parsers, and the fixed
//! status vocabulary the parsers and the classifier agree on.
//!
use serde::Serialize;
use std::fmt;

/// Kind of resource an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Network,
    Image,
    ImageLayer,
    Volume,
    Container,
    Service,
    Unknown,
}

impl ResourceType {
    /// Maps the capitalised word Compose prints in front of a resource id.
    pub fn from_compose_word(word: &str) -> Option<Self> {
        match word {
            "Network" => Some(Self::Network),
            "Image" => Some(Self::Image),
            "Volume" => Some(Self::Volume),
            "Container" => Some(Self::Container),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Image => "image",
            Self::ImageLayer => "image-layer",
            Self::Volume => "volume",
            Self::Container => "container",
            Self::Service => "service",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed event recovered from Compose stderr.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub resource_type: ResourceType,
    pub resource_id: Option<String>,
    pub status: Option<String>,
    pub msg: Option<String>,
}

impl Event {
    pub fn new(
        resource_type: ResourceType,
        resource_id: Option<&str>,
        status: Option<&str>,
        msg: Option<&str>,
    ) -> Self {
        Self {
            resource_type,
            resource_id: resource_id.map(str::to_string),
            status: status.map(str::to_string),
            msg: msg.map(str::to_string),
        }
    }

    /// Whether this event opens an error context.
    pub fn is_error(&self) -> bool {
        self.status.as_deref().is_some_and(is_error_status)
    }
}

/// Events plus the protocol-drift diagnostics collected while parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEvents {
    pub events: Vec<Event>,
    pub warnings: Vec<String>,
}

/// Terminal statuses. Seeing one of these alone does not mean anything changed.
pub const DONE_STATUSES: &[&str] = &[
    "Started", "Healthy", "Exited", "Restarted", "Running", "Created", "Stopped", "Killed",
    "Removed", "Recreated", "Pulled", "Built",
];

/// In-progress statuses. Each one means Compose is mutating something.
pub const WORKING_STATUSES: &[&str] = &[
    "Creating", "Starting", "Waiting", "Restarting", "Stopping", "Killing", "Removing",
    "Recreate", "Pulling", "Building",
];

pub const PULL_STATUSES: &[&str] = &["Pulled", "Pulling"];
pub const BUILD_STATUSES: &[&str] = &["Built", "Building"];
pub const ERROR_STATUSES: &[&str] = &["Error"];
pub const WARNING_STATUSES: &[&str] = &["Warning"];

pub const PULL_PROGRESS_DONE: &[&str] = &["Already exists", "Download complete", "Pull complete"];
pub const PULL_PROGRESS_WORKING: &[&str] = &[
    "Pulling fs layer",
    "Waiting",
    "Downloading",
    "Verifying Checksum",
    "Extracting",
];

/// Prefix Compose puts in front of every line when `--dry-run` is active.
pub const DRY_RUN_MARKER: &str = "DRY-RUN MODE -";

pub fn is_working_status(status: &str) -> bool {
    WORKING_STATUSES.contains(&status)
}

pub fn is_error_status(status: &str) -> bool {
    ERROR_STATUSES.contains(&status)
}

pub fn is_pull_status(status: &str) -> bool {
    PULL_STATUSES.contains(&status)
}

pub fn is_build_status(status: &str) -> bool {
    BUILD_STATUSES.contains(&status)
}

pub fn is_pull_progress_status(status: &str) -> bool {
    PULL_PROGRESS_DONE.contains(&status) || PULL_PROGRESS_WORKING.contains(&status)
}

/// Any status the parsers recognise as a lifecycle word.
pub fn is_known_status(status: &str) -> bool {
    DONE_STATUSES.contains(&status)
        || WORKING_STATUSES.contains(&status)
        || ERROR_STATUSES.contains(&status)
        || WARNING_STATUSES.contains(&status)
}
