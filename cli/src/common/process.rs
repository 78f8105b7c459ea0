//! # Dockhand Process Execution (`common::process`)
//!
//! File: cli/src/common/process.rs
//!
//! ## Overview
//!
//! This module runs external programs (the `docker` CLI and its Compose plugin)
//! and captures their output. It is the seam shared by the Compose manager and
//! the CLI container engine.
//!
//! ## Architecture
//!
//! - `CommandRunner`: async trait with a single `run` method
//! - `SystemRunner`: implementation on top of `tokio::process::Command`
//! - `CommandOutput`: exit code plus captured stdout/stderr
//!
//! A non-zero exit code is *not* an error at this level; the caller decides what
//! it means. Only a failure to spawn the process is reported as `Err`.
//!
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub rc: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.rc == 0
    }

    /// Converts a non-zero exit into `DockhandError::ExternalCommand`.
    pub fn check(self, program: &str, args: &[String]) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(anyhow!(DockhandError::ExternalCommand {
                cmd: quote_command(program, args),
                status: self.rc.to_string(),
                output: if self.stderr.trim().is_empty() {
                    self.stdout
                } else {
                    self.stderr
                },
            }))
        }
    }
}

/// Runs external programs.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args`, optionally inside `cwd`, and waits for it.
    async fn run(&self, program: &str, args: &[String], cwd: Option<&Path>)
        -> Result<CommandOutput>;
}

/// `CommandRunner` that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    #[instrument(skip(self, args, cwd), fields(program = %program))]
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<CommandOutput> {
        debug!("Running: {}", quote_command(program, args));
        let mut command = tokio::process::Command::new(program);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to execute command '{}'", program))?;

        let result = CommandOutput {
            rc: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(rc = result.rc, "Command finished");
        Ok(result)
    }
}

/// Renders a command line the way a user would type it in a shell.
pub fn quote_command(program: &str, args: &[String]) -> String {
    let parts = std::iter::once(program).chain(args.iter().map(String::as_str));
    let parts: Vec<&str> = parts.collect();
    shlex::try_join(parts.iter().copied()).unwrap_or_else(|_| parts.join(" "))
}
