//! # Container Command Group
//!
//! File: cli/src/commands/container/mod.rs
//!
//! ## Overview
//!
//! `dockhand container <subcommand>` manages individual containers
//! declaratively:
//!
//! - **`apply`**: reconcile a container towards a spec file.
//! - **`remove`**: bring containers to the `absent` state.
//!
//! Both accept `--engine api|cli` to override `docker.engine` and `--check` to
//! report changes without making them.
//!
use crate::core::error::Result;
use clap::{Parser, Subcommand};

mod apply;
mod remove;

#[derive(Parser, Debug)]
pub struct ContainerArgs {
    #[command(subcommand)]
    command: ContainerCommand,
}

#[derive(Subcommand, Debug)]
enum ContainerCommand {
    /// Reconcile a container towards a spec file.
    Apply(apply::ApplyArgs),
    /// Stop and remove containers.
    #[command(alias = "rm")]
    Remove(remove::RemoveArgs),
}

pub async fn handle_container(args: ContainerArgs) -> Result<()> {
    match args.command {
        ContainerCommand::Apply(args) => apply::handle_apply(args).await,
        ContainerCommand::Remove(args) => remove::handle_remove(args).await,
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcommand_dispatch_parsing() {
        let args = ContainerArgs::try_parse_from(["container", "rm", "web"]).unwrap();
        assert!(matches!(args.command, ContainerCommand::Remove(_)));
        let args = ContainerArgs::try_parse_from(["container", "apply", "web.toml"]).unwrap();
        assert!(matches!(args.command, ContainerCommand::Apply(_)));
        assert!(ContainerArgs::try_parse_from(["container", "run"]).is_err());
    }
}
