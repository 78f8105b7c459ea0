//! # `dockhand compose down`
//!
//! File: cli/src/commands/compose/down.rs
//!
use crate::common::compose::manager::{DownOptions, RemoveImages};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Stop and remove the project's containers and networks")]
pub struct DownArgs {
    /// Remove containers for services not defined in the Compose files.
    #[arg(long)]
    remove_orphans: bool,
    /// Also remove images used by services.
    #[arg(long, value_enum)]
    rmi: Option<RemoveImages>,
    /// Also remove named and anonymous volumes.
    #[arg(long)]
    volumes: bool,
    /// Shutdown timeout in seconds.
    #[arg(long, short)]
    timeout: Option<u32>,
    #[arg(long)]
    dry_run: bool,
    services: Vec<String>,
}

impl DownArgs {
    pub fn into_options(self) -> DownOptions {
        DownOptions {
            remove_orphans: self.remove_orphans,
            remove_images: self.rmi,
            remove_volumes: self.volumes,
            timeout: self.timeout,
            dry_run: self.dry_run,
            services: self.services,
        }
    }
}
