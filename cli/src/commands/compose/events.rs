//! # `dockhand compose events`
//!
//! File: cli/src/commands/compose/events.rs
//!
//! Reads captured Compose stderr from a file (or `-` for stdin) and prints the
//! parsed events with their classification. Useful for checking how a given
//! plugin version's output is understood without touching a Docker host.
//!
use crate::common::compose::{summarize_events, EventFormat};
use crate::core::error::Result;
use anyhow::Context;
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Classify captured Docker Compose stderr")]
pub struct EventsArgs {
    /// File holding the captured stderr; `-` reads stdin.
    input: PathBuf,
    /// Progress format the output was produced with.
    #[arg(long, value_enum, default_value_t = EventFormat::Text)]
    format: EventFormat,
    /// The output came from a `--dry-run` invocation.
    #[arg(long)]
    dry_run: bool,
    /// Exit code of the captured invocation.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    rc: i32,
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read Compose output from stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read Compose output from {}", path.display()))
}

/// Prints the summary. A non-zero `--rc` is reported in the output, not as a
/// failure of this command.
pub fn handle_events(args: EventsArgs) -> Result<()> {
    let stderr = read_input(&args.input)?;
    info!("Classifying {} bytes of {:?} output", stderr.len(), args.format);
    let summary = summarize_events(&stderr, args.format, args.dry_run, args.rc);
    crate::commands::print_json(&summary)
}
