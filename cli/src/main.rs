//! # Dockhand Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point of the `dockhand` CLI. It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to the command group handlers
//!
//! ## Architecture
//!
//! - `compose`: runs Docker Compose v2 and classifies its progress output into
//!   an idempotent change report.
//! - `container`: reconciles a single container against a declarative spec,
//!   through the Engine API or the `docker` CLI.
//!
//! Results are printed as JSON on stdout; logs go to stderr. All errors are
//! propagated to this level and reported with their context chain.
//!
//! ## Examples
//!
//! ```bash
//! dockhand compose --project-src ./app up --wait
//! dockhand -vv container apply web.toml --check
//! dockhand compose events captured-stderr.txt --format json
//! ```
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands; // Command groups (compose, container)
mod common; // Compose driver, container reconciler, Docker engines, process runner
mod core; // Errors and configuration

#[derive(Parser, Debug)]
#[command(
    name = "dockhand",
    about = "Idempotent Docker Compose driver and declarative container reconciler",
    long_about = "Drive Docker Compose projects and reconcile individual containers,\n\
                  reporting what changed as JSON.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Parser, Debug)]
enum Commands {
    Compose(commands::compose::ComposeArgs),
    #[command(alias = "c")]
    Container(commands::container::ContainerArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let command_result = match cli.command {
        Commands::Compose(args) => commands::compose::handle_compose(args).await,
        Commands::Container(args) => commands::container::handle_container(args).await,
    };

    if let Err(e) = command_result {
        tracing::debug!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
