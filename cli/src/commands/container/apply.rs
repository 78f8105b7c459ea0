//! # `dockhand container apply`
//!
//! File: cli/src/commands/container/apply.rs
//!
//! ## Overview
//!
//! Loads a container spec (TOML, or JSON by extension), prepares it against
//! the configured defaults and reconciles the live container towards it. The
//! reconciliation result is printed as pretty JSON.
//!
//! ## Workflow
//!
//! 1. Load configuration and the spec file.
//! 2. Prepare the spec (unknown options and malformed values fail here,
//!    before Docker is contacted).
//! 3. Open the engine chosen by `--engine` or `docker.engine`.
//! 4. Reconcile, honouring `--check`.
//!
use crate::common::container::facets::FacetRegistry;
use crate::common::container::reconciler::reconcile;
use crate::common::container::spec::load_spec;
use crate::common::docker::open_engine;
use crate::core::config::{self, EngineKind};
use crate::core::error::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Reconcile a container towards a spec file")]
pub struct ApplyArgs {
    /// Path to the container spec (`.toml` or `.json`).
    spec: PathBuf,
    /// Backend used to talk to Docker; defaults to `docker.engine`.
    #[arg(long, value_enum)]
    engine: Option<EngineKind>,
    /// Report what would change without changing anything.
    #[arg(long)]
    check: bool,
}

pub async fn handle_apply(args: ApplyArgs) -> Result<()> {
    let config = config::load_config()?;
    let spec = load_spec(&args.spec)?;
    let registry = FacetRegistry::build();
    let prepared = spec.prepare(&registry, &config.container)?;
    info!(
        "Applying spec for container '{}' (state {:?}, check mode: {})",
        prepared.name, prepared.state, args.check
    );

    let engine = open_engine(args.engine.unwrap_or(config.docker.engine), &config).await?;
    let result = reconcile(engine.as_ref(), &registry, &prepared, args.check).await?;
    crate::commands::print_json(&result)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_args_parsing() {
        let args = ApplyArgs::try_parse_from(["apply", "web.toml", "--engine", "cli", "--check"]).unwrap();
        assert_eq!(args.spec, PathBuf::from("web.toml"));
        assert_eq!(args.engine, Some(EngineKind::Cli));
        assert!(args.check);

        let args = ApplyArgs::try_parse_from(["apply", "web.json"]).unwrap();
        assert_eq!(args.engine, None);
        assert!(!args.check);
    }

    #[test]
    fn test_apply_requires_spec() {
        assert!(ApplyArgs::try_parse_from(["apply"]).is_err());
        assert!(ApplyArgs::try_parse_from(["apply", "x.toml", "--engine", "podman"]).is_err());
    }
}
