//! # Dockhand Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error taxonomy shared by the Compose driver and the
//! container reconciler. Fatal conditions travel as `anyhow::Error` values that
//! wrap a `DockhandError`, so callers can add context with `.context()` and still
//! recover the specific failure kind with `downcast_ref`.
//!
//! ## Architecture
//!
//! - `DockhandError`: domain error enum derived with `thiserror`
//! - `Result<T>`: alias for `anyhow::Result<T>`
//!
//! The variants map onto the failure classes the engines distinguish:
//! - Configuration errors (invalid parameters, rejected before any daemon call)
//! - Transport errors (Docker API client errors, process spawn failures)
//! - Daemon-reported errors (non-404 error responses, failed CLI calls)
//! - Race conditions the reconciler retries (`UnpauseRequired`, `RemovalInProgress`)
//!
//! "Not found" is deliberately absent from the engine seam: inspection calls
//! return `Option` instead.
//!
//! ## Examples
//!
//! ```rust,ignore
//! match engine.stop(id, Some(10)).await {
//!     Ok(()) => {}
//!     Err(e) if is_kind(&e, |k| matches!(k, DockhandError::UnpauseRequired(_))) => {
//!         engine.unpause(id).await?;
//!     }
//!     Err(e) => return Err(e),
//! }
//! ```
//!
use thiserror::Error;

/// Custom error type for the Dockhand application.
#[derive(Error, Debug)]
pub enum DockhandError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Docker API interaction failed: {source}")]
    DockerApi {
        #[from]
        source: bollard::errors::Error,
    },

    #[error("Docker daemon returned status {status}: {message}")]
    Daemon { status: u16, message: String },

    /// The daemon refused to stop or remove a paused container.
    #[error("Container '{0}' must be unpaused first")]
    UnpauseRequired(String),

    /// The daemon reports that removal of the container was already started.
    #[error("Removal of container '{0}' is already in progress")]
    RemovalInProgress(String),

    #[error("Container '{name}' not found.")]
    ContainerNotFound { name: String },

    #[error("Image '{name}' not found.")]
    ImageNotFound { name: String },

    #[error("External command failed: {cmd}, Status: {status}, Output:\n{output}")]
    ExternalCommand {
        cmd: String,
        status: String,
        output: String,
    },

    #[error("Docker Compose error: {0}")]
    ComposeVersion(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Cannot parse output of '{what}': {message}")]
    Parse { what: String, message: String },
}

impl DockhandError {
    /// Classifies a daemon error message. Returns the retryable race variants
    /// for the two messages the reconciler knows how to recover from, and a
    /// generic `Daemon` error otherwise.
    pub fn from_daemon_message(container: &str, status: u16, message: &str) -> Self {
        if message.contains("Unpause the container before stopping or killing") {
            DockhandError::UnpauseRequired(container.to_string())
        } else if message.contains("removal of container") && message.contains("is already in progress")
        {
            DockhandError::RemovalInProgress(container.to_string())
        } else {
            DockhandError::Daemon {
                status,
                message: message.to_string(),
            }
        }
    }
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;

/// Returns `true` when `err` wraps a `DockhandError` matching `pred`.
pub fn is_kind(err: &anyhow::Error, pred: impl Fn(&DockhandError) -> bool) -> bool {
    err.downcast_ref::<DockhandError>().is_some_and(pred)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_error_display() {
        let config_err = DockhandError::Config("Missing setting 'foo'".to_string());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: Missing setting 'foo'"
        );

        let daemon = DockhandError::Daemon {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(daemon.to_string(), "Docker daemon returned status 500: boom");
    }

    #[test]
    fn test_daemon_message_classification() {
        let e = DockhandError::from_daemon_message(
            "web",
            409,
            "cannot stop container: Unpause the container before stopping or killing",
        );
        assert!(matches!(e, DockhandError::UnpauseRequired(ref n) if n == "web"));

        let e = DockhandError::from_daemon_message(
            "web",
            409,
            "removal of container abc123 is already in progress",
        );
        assert!(matches!(e, DockhandError::RemovalInProgress(_)));

        let e = DockhandError::from_daemon_message("web", 500, "something else");
        assert!(matches!(e, DockhandError::Daemon { status: 500, .. }));
    }

    #[test]
    fn test_is_kind_through_context() {
        let err = anyhow!(DockhandError::UnpauseRequired("x".into())).context("while stopping");
        assert!(is_kind(&err, |e| matches!(e, DockhandError::UnpauseRequired(_))));
        assert!(!is_kind(&err, |e| matches!(e, DockhandError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_unpause_then_stop_pattern() {
        use crate::common::docker::engine::{ContainerEngine, CreateRequest};
        use crate::common::docker::fake::FakeEngine;
        use serde_json::json;

        let engine = FakeEngine::new();
        let request = CreateRequest {
            name: "web".into(),
            payload: json!({"Image": "nginx:1.25"}),
            cli_args: Vec::new(),
        };
        let id = engine.create_container(&request).await.unwrap();
        engine.start(&id).await.unwrap();
        engine.pause(&id).await.unwrap();

        let outcome: Result<()> = async {
            match engine.stop(&id, Some(10)).await {
                Ok(()) => {}
                Err(e) if is_kind(&e, |k| matches!(k, DockhandError::UnpauseRequired(_))) => {
                    engine.unpause(&id).await?;
                    engine.stop(&id, Some(10)).await?;
                }
                Err(e) => return Err(e),
            }
            Ok(())
        }
        .await;
        outcome.unwrap();
        assert_eq!(engine.container("web").unwrap()["State"]["Running"], json!(false));
    }
}
