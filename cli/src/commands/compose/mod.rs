//! # Compose Command Group
//!
//! File: cli/src/commands/compose/mod.rs
//!
//! ## Overview
//!
//! `dockhand compose <verb>` drives one Compose project and prints the result
//! as pretty JSON on stdout. A failed invocation still prints its result and
//! then exits non-zero.
//!
//! Project flags (`--project-src`, `--project-name`, `--file`, `--env-file`,
//! `--profile`) override the `[compose]` section of the configuration.
//!
//! `dockhand compose events` classifies captured Compose stderr offline and
//! does not need a Docker installation.
//!
use crate::common::compose::manager::{ComposeManager, ComposeResult, ProjectOptions};
use crate::common::process::SystemRunner;
use crate::core::config::{self, Config};
use crate::core::error::Result;
use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

mod build;
mod down;
mod events;
mod pull;
mod stop;
mod up;

/// Flags selecting the Compose project.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Directory containing the Compose project.
    #[arg(long, global = true)]
    project_src: Option<PathBuf>,
    /// Compose project name.
    #[arg(long, short = 'p', global = true)]
    project_name: Option<String>,
    /// Compose file(s), relative to the project directory.
    #[arg(long = "file", short = 'f', global = true)]
    files: Vec<String>,
    /// Environment file(s) passed to Compose.
    #[arg(long = "env-file", global = true)]
    env_files: Vec<String>,
    /// Profiles to enable.
    #[arg(long = "profile", global = true)]
    profiles: Vec<String>,
}

impl ProjectArgs {
    /// Command-line flags win over the configuration.
    fn resolve(&self, config: &Config) -> ProjectOptions {
        let pick = |cli: &Vec<String>, configured: &Vec<String>| {
            if cli.is_empty() {
                configured.clone()
            } else {
                cli.clone()
            }
        };
        ProjectOptions {
            project_src: self
                .project_src
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.compose.project_src)),
            project_name: self
                .project_name
                .clone()
                .or_else(|| config.compose.project_name.clone()),
            files: pick(&self.files, &config.compose.files),
            env_files: pick(&self.env_files, &config.compose.env_files),
            profiles: pick(&self.profiles, &config.compose.profiles),
        }
    }
}

#[derive(Parser, Debug)]
pub struct ComposeArgs {
    #[command(flatten)]
    project: ProjectArgs,
    #[command(subcommand)]
    command: ComposeCommand,
}

#[derive(Subcommand, Debug)]
enum ComposeCommand {
    /// Create and start (or stop, or restart) the project's services.
    Up(up::UpArgs),
    /// Stop and remove the project's containers and networks.
    Down(down::DownArgs),
    /// Stop running services.
    Stop(stop::StopArgs),
    /// Restart services.
    Restart(stop::StopArgs),
    /// Pull service images.
    Pull(pull::PullArgs),
    /// Build service images.
    Build(build::BuildArgs),
    /// List the project's containers.
    Ps,
    /// List the images used by the project's containers.
    Images,
    /// Classify captured Compose stderr without running Compose.
    Events(events::EventsArgs),
}

async fn open_manager(project: &ProjectArgs) -> Result<ComposeManager> {
    let config = config::load_config()?;
    let options = project.resolve(&config);
    debug!("Compose project options: {:?}", options);
    let manager = ComposeManager::new(Arc::new(SystemRunner), &config.docker.cli, options).await?;
    info!("Using Docker Compose {}", manager.version());
    Ok(manager)
}

/// Prints a result and turns a failed invocation into an error.
fn finish(result: ComposeResult) -> Result<()> {
    crate::commands::print_json(&result)?;
    if result.failed {
        return Err(anyhow!(result
            .msg
            .unwrap_or_else(|| "Docker Compose failed".to_string())));
    }
    Ok(())
}

pub async fn handle_compose(args: ComposeArgs) -> Result<()> {
    if let ComposeCommand::Events(events_args) = args.command {
        return events::handle_events(events_args);
    }
    let manager = open_manager(&args.project).await?;
    match args.command {
        ComposeCommand::Up(a) => finish(manager.up(&a.into_options()).await?),
        ComposeCommand::Down(a) => finish(manager.down(&a.into_options()).await?),
        ComposeCommand::Stop(a) => finish(manager.stop(&a.into_options()).await?),
        ComposeCommand::Restart(a) => finish(manager.restart(&a.into_options()).await?),
        ComposeCommand::Pull(a) => finish(manager.pull(&a.into_options()).await?),
        ComposeCommand::Build(a) => finish(manager.build(&a.into_options()).await?),
        ComposeCommand::Ps => crate::commands::print_json(&manager.ps().await?),
        ComposeCommand::Images => crate::commands::print_json(&manager.images().await?),
        ComposeCommand::Events(_) => Ok(()),
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_flags_override_config() {
        let args = ComposeArgs::try_parse_from([
            "compose",
            "--project-src",
            "/srv/app",
            "-f",
            "compose.yaml",
            "-f",
            "compose.prod.yaml",
            "ps",
        ])
        .unwrap();
        let mut config = Config::default();
        config.compose.project_name = Some("configured".into());
        config.compose.profiles = vec!["debug".into()];

        let options = args.project.resolve(&config);
        assert_eq!(options.project_src, PathBuf::from("/srv/app"));
        assert_eq!(options.files, vec!["compose.yaml", "compose.prod.yaml"]);
        assert_eq!(options.project_name.as_deref(), Some("configured"));
        assert_eq!(options.profiles, vec!["debug"]);
        assert!(matches!(args.command, ComposeCommand::Ps));
    }

    #[test]
    fn test_global_flags_after_verb() {
        let args = ComposeArgs::try_parse_from(["compose", "down", "-p", "demo", "--volumes"]).unwrap();
        assert_eq!(args.project.project_name.as_deref(), Some("demo"));
        assert!(matches!(args.command, ComposeCommand::Down(_)));
    }
}
