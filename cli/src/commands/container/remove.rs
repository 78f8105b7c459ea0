//! # `dockhand container remove`
//!
//! File: cli/src/commands/container/remove.rs
//!
//! ## Overview
//!
//! Brings one or more containers to the `absent` state: running containers
//! are stopped (or killed with `--force-kill`), then removed. Containers that
//! do not exist are reported unchanged.
//!
//! ## Workflow
//!
//! 1. Build an `absent` spec per name and prepare it.
//! 2. Reconcile them one after another against one engine. A failure does
//!    not stop the remaining names.
//! 3. Print a JSON object keyed by container name.
//! 4. If any removal failed, return the first failure after printing the
//!    results that succeeded.
//!
use crate::common::container::facets::FacetRegistry;
use crate::common::container::reconciler::{reconcile, ReconcileResult};
use crate::common::container::spec::{ContainerSpec, DesiredState};
use crate::common::docker::open_engine;
use crate::core::config::{self, EngineKind};
use crate::core::error::Result;
use anyhow::Context;
use clap::Parser;
use indexmap::IndexMap;
use tracing::error;

#[derive(Parser, Debug)]
#[command(about = "Stop and remove containers")]
pub struct RemoveArgs {
    /// Names or IDs of the containers to remove.
    #[arg(required = true, num_args = 1..)]
    names: Vec<String>,
    /// Kill instead of stopping gracefully.
    #[arg(long)]
    force_kill: bool,
    /// Signal sent with `--force-kill`.
    #[arg(long, requires = "force_kill")]
    kill_signal: Option<String>,
    /// Also remove anonymous volumes.
    #[arg(long)]
    volumes: bool,
    /// Seconds to wait for a graceful stop.
    #[arg(long, short)]
    time: Option<u32>,
    #[arg(long, value_enum)]
    engine: Option<EngineKind>,
    #[arg(long)]
    check: bool,
}

impl RemoveArgs {
    fn spec_for(&self, name: &str) -> ContainerSpec {
        ContainerSpec {
            name: name.to_string(),
            state: DesiredState::Absent,
            force_kill: self.force_kill,
            kill_signal: self.kill_signal.clone(),
            remove_volumes: self.volumes,
            stop_timeout: self.time,
            ..Default::default()
        }
    }
}

pub async fn handle_remove(args: RemoveArgs) -> Result<()> {
    let config = config::load_config()?;
    let registry = FacetRegistry::build();
    let specs = args
        .names
        .iter()
        .map(|name| args.spec_for(name).prepare(&registry, &config.container))
        .collect::<Result<Vec<_>>>()?;

    let engine = open_engine(args.engine.unwrap_or(config.docker.engine), &config).await?;
    let mut results: IndexMap<&str, ReconcileResult> = IndexMap::new();
    let mut failures = Vec::new();
    for spec in &specs {
        match reconcile(engine.as_ref(), &registry, spec, args.check).await {
            Ok(result) => {
                results.insert(spec.name.as_str(), result);
            }
            Err(e) => {
                error!("Failed to remove container '{}': {:?}", spec.name, e);
                failures.push((spec.name.clone(), e));
            }
        }
    }
    crate::commands::print_json(&results)?;

    match failures.into_iter().next() {
        None => Ok(()),
        Some((name, e)) => Err(e).with_context(|| format!("Failed to remove container '{}'", name)),
    }
}
