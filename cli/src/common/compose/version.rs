//! # Compose Plugin Version
//!
//! File: cli/src/common/compose/version.rs
//!
//! Parsing and ordering of the version string reported by
//! `docker compose version --format json` (e.g. `v2.29.1-desktop.1`).
//!
use crate::core::error::{DockhandError, Result};
use anyhow::anyhow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComposeVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ComposeVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses `v2.29.1`, `2.29.1-desktop.1`, `2.18` and similar.
    ///
    /// # Errors
    ///
    /// Returns `DockhandError::Parse` when no numeric major version is found.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_start_matches('v');
        let core = trimmed
            .split(|c: char| c == '-' || c == '+')
            .next()
            .unwrap_or_default();
        let mut parts = core.split('.').map(|p| p.parse::<u64>());
        let invalid = || {
            anyhow!(DockhandError::Parse {
                what: "docker compose version".to_string(),
                message: format!("invalid version string {:?}", raw),
            })
        };
        let major = parts.next().and_then(|p| p.ok()).ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => p.map_err(|_| invalid())?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.map_err(|_| invalid())?,
            None => 0,
        };
        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for ComposeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Oldest Compose plugin the manager drives.
pub const MINIMUM_COMPOSE_VERSION: ComposeVersion = ComposeVersion::new(2, 18, 0);
/// First version whose JSON progress output is complete enough to parse.
pub const JSON_EVENTS_VERSION: ComposeVersion = ComposeVersion::new(2, 29, 0);
/// First version accepting `--progress plain`.
pub const PLAIN_PROGRESS_VERSION: ComposeVersion = ComposeVersion::new(2, 19, 0);
/// First version whose `ps --format json` emits one object per line.
pub const PS_JSON_LINES_VERSION: ComposeVersion = ComposeVersion::new(2, 21, 0);
/// First version accepting `pull --policy`.
pub const PULL_POLICY_VERSION: ComposeVersion = ComposeVersion::new(2, 22, 0);
/// First version accepting `ps --no-trunc`.
pub const PS_NO_TRUNC_VERSION: ComposeVersion = ComposeVersion::new(2, 23, 0);
