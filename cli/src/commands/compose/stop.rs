//! # `dockhand compose stop` / `restart`
//!
//! File: cli/src/commands/compose/stop.rs
//!
//! Both verbs take the same flags. `stop` only reports a change when a dry run
//! shows something is actually running.
//!
use crate::common::compose::manager::StopOptions;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct StopArgs {
    /// Shutdown timeout in seconds.
    #[arg(long, short)]
    timeout: Option<u32>,
    #[arg(long)]
    dry_run: bool,
    services: Vec<String>,
}

impl StopArgs {
    pub fn into_options(self) -> StopOptions {
        StopOptions {
            timeout: self.timeout,
            dry_run: self.dry_run,
            services: self.services,
        }
    }
}
