//! # `dockhand compose pull`
//!
//! File: cli/src/commands/compose/pull.rs
//!
use crate::common::compose::manager::{PullOptions, PullPolicy};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Pull service images")]
pub struct PullArgs {
    /// `missing` only pulls images that are not present locally.
    #[arg(long, value_enum, default_value_t = PullPolicy::Always)]
    policy: PullPolicy,
    /// Skip services that have a build section.
    #[arg(long)]
    ignore_buildable: bool,
    /// Also pull images of dependencies.
    #[arg(long)]
    include_deps: bool,
    #[arg(long)]
    dry_run: bool,
    services: Vec<String>,
}

impl PullArgs {
    pub fn into_options(self) -> PullOptions {
        PullOptions {
            policy: self.policy,
            ignore_buildable: self.ignore_buildable,
            include_deps: self.include_deps,
            dry_run: self.dry_run,
            services: self.services,
        }
    }
}
