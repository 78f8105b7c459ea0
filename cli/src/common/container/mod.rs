//! # Container Reconciliation
//!
//! File: cli/src/common/container/mod.rs
//!
//! ## Overview
//!
//! Declarative single-container management: a spec file describes the desired
//! container, the reconciler compares it with the live inspection and applies
//! the smallest set of changes.
//!
//! ## Architecture
//!
//! - **`spec`**: spec file loading and preparation into canonical facet values.
//! - **`facets`**: the registry of comparable container properties and how each
//!   is prepared, read back, compared and rendered into API/CLI requests.
//! - **`compare`**: `strict` / `allow_more_present` / `ignore` comparison.
//! - **`diff`**: difference tracking for the `before`/`after` output.
//! - **`units`**, **`ports`**, **`mounts`**, **`healthcheck`**, **`networks`**:
//!   value normalisation for the facets that need it.
//! - **`snapshot`**: read-only view of one inspection.
//! - **`reconciler`**: the state machine driving a
//!   [`crate::common::docker::ContainerEngine`].
//!
pub mod compare;
pub mod diff;
pub mod facets;
pub mod healthcheck;
pub mod mounts;
pub mod networks;
pub mod ports;
pub mod reconciler;
pub mod snapshot;
pub mod spec;
pub mod units;
