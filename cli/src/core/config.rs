//! # Dockhand Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! This module loads, merges and validates Dockhand's configuration. It
//! supplies defaults for the Docker CLI binary, the container backend, the
//! Compose project flags, and the container reconciler's timeouts and
//! policies. Command-line flags override whatever is loaded here.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. Project-specific `.dockhand.toml` in the current directory or its ancestors
//!    (the search stops at a directory containing `.git`)
//! 2. User-specific `config.toml` in the platform config directory
//!    (e.g. `~/.config/dockhand/config.toml`)
//! 3. Default values defined in the code
//!
//! Paths are expanded (`~` to the home directory) and the merged result is
//! validated before use.
//!
//! ## Examples
//!
//! ```toml
//! [docker]
//! cli = "docker"
//! engine = "api"
//!
//! [compose]
//! project_src = "~/stacks/web"
//! files = ["compose.yaml", "compose.override.yaml"]
//!
//! [container]
//! healthy_wait_timeout = 120
//! image_label_mismatch = "fail"
//! ```
//!
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub compose: ComposeConfig,
    #[serde(default)]
    pub container: ContainerDefaults,
}

/// Which backend the container reconciler talks to.
#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Docker Engine HTTP API via bollard.
    #[default]
    Api,
    /// The `docker` command-line client.
    Cli,
}

/// How to react when labels declared by the image would be dropped.
#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LabelMismatchPolicy {
    #[default]
    Ignore,
    Fail,
}

/// Docker client settings.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DockerConfig {
    /// Docker CLI binary used for Compose and the CLI engine.
    #[serde(default = "default_docker_cli")]
    pub cli: String,
    /// Backend for `dockhand container ...`.
    #[serde(default)]
    pub engine: EngineKind,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            cli: default_docker_cli(),
            engine: EngineKind::default(),
        }
    }
}

/// Default project flags for `dockhand compose ...`.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ComposeConfig {
    /// Project directory (can use ~). Will be expanded.
    #[serde(default = "default_project_src")]
    pub project_src: String,
    pub project_name: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub env_files: Vec<String>,
    #[serde(default)]
    pub profiles: Vec<String>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            project_src: default_project_src(),
            project_name: None,
            files: Vec::new(),
            env_files: Vec::new(),
            profiles: Vec::new(),
        }
    }
}

/// Defaults applied to every container spec that does not override them.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ContainerDefaults {
    /// Seconds to wait for a graceful stop before the daemon kills the container.
    pub stop_timeout: Option<u32>,
    /// Upper bound (seconds) for waiting on a removal already in progress.
    #[serde(default = "default_removal_wait_timeout")]
    pub removal_wait_timeout: u64,
    /// Upper bound (seconds) for `state = "healthy"`.
    #[serde(default = "default_healthy_wait_timeout")]
    pub healthy_wait_timeout: u64,
    #[serde(default)]
    pub image_label_mismatch: LabelMismatchPolicy,
    /// Attach the first network at creation time and use it as network mode.
    #[serde(default = "default_true")]
    pub networks_cli_compatible: bool,
}

impl Default for ContainerDefaults {
    fn default() -> Self {
        Self {
            stop_timeout: None,
            removal_wait_timeout: default_removal_wait_timeout(),
            healthy_wait_timeout: default_healthy_wait_timeout(),
            image_label_mismatch: LabelMismatchPolicy::default(),
            networks_cli_compatible: true,
        }
    }
}

fn default_docker_cli() -> String {
    "docker".to_string()
}
fn default_project_src() -> String {
    ".".to_string()
}
fn default_removal_wait_timeout() -> u64 {
    60
}
fn default_healthy_wait_timeout() -> u64 {
    300
}
fn default_true() -> bool {
    true
}

const PROJECT_CONFIG_FILENAME: &str = ".dockhand.toml";

/// Loads the effective configuration (project over user over defaults).
///
/// # Errors
///
/// Fails if a configuration file exists but cannot be read or parsed, or if
/// the merged configuration does not validate.
pub fn load_config() -> Result<Config> {
    let user_config = load_user_config()?;
    let project_config = load_project_config()?;
    let mut merged_config = merge_configs(user_config.unwrap_or_default(), project_config);
    expand_config_paths(&mut merged_config);
    validate_config(&merged_config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged_config);
    Ok(merged_config)
}

fn load_user_config() -> Result<Option<Config>> {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "Dockhand", "dockhand") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config() -> Result<Option<Config>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    if let Some(project_config_path) = find_project_config_path(&current_dir) {
        info!(
            "Loading project configuration from: {}",
            project_config_path.display()
        );
        load_config_from_path(&project_config_path).map(Some)
    } else {
        debug!("No project configuration file ({PROJECT_CONFIG_FILENAME}) found.");
        Ok(None)
    }
}

fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

/// Reads and parses one TOML configuration file.
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project_cfg = match project {
        Some(p) => p,
        None => return user,
    };
    let mut merged = Config::default();

    merged.docker.cli = if project_cfg.docker.cli != default_docker_cli() {
        project_cfg.docker.cli
    } else {
        user.docker.cli
    };
    merged.docker.engine = if project_cfg.docker.engine != EngineKind::default() {
        project_cfg.docker.engine
    } else {
        user.docker.engine
    };

    merged.compose.project_src = if project_cfg.compose.project_src != default_project_src() {
        project_cfg.compose.project_src
    } else {
        user.compose.project_src
    };
    merged.compose.project_name = project_cfg
        .compose
        .project_name
        .or(user.compose.project_name);
    merged.compose.files = prefer_non_empty(project_cfg.compose.files, user.compose.files);
    merged.compose.env_files =
        prefer_non_empty(project_cfg.compose.env_files, user.compose.env_files);
    merged.compose.profiles = prefer_non_empty(project_cfg.compose.profiles, user.compose.profiles);

    let (p, u) = (project_cfg.container, user.container);
    merged.container.stop_timeout = p.stop_timeout.or(u.stop_timeout);
    merged.container.removal_wait_timeout =
        if p.removal_wait_timeout != default_removal_wait_timeout() {
            p.removal_wait_timeout
        } else {
            u.removal_wait_timeout
        };
    merged.container.healthy_wait_timeout =
        if p.healthy_wait_timeout != default_healthy_wait_timeout() {
            p.healthy_wait_timeout
        } else {
            u.healthy_wait_timeout
        };
    merged.container.image_label_mismatch =
        if p.image_label_mismatch != LabelMismatchPolicy::default() {
            p.image_label_mismatch
        } else {
            u.image_label_mismatch
        };
    merged.container.networks_cli_compatible =
        p.networks_cli_compatible && u.networks_cli_compatible;
    merged
}

fn prefer_non_empty(project: Vec<String>, user: Vec<String>) -> Vec<String> {
    if project.is_empty() {
        user
    } else {
        project
    }
}

fn expand_config_paths(config: &mut Config) {
    config.compose.project_src = shellexpand::tilde(&config.compose.project_src).into_owned();
    for file in config
        .compose
        .files
        .iter_mut()
        .chain(config.compose.env_files.iter_mut())
    {
        *file = shellexpand::tilde(file).into_owned();
    }
    debug!("Expanded project directory: {}", config.compose.project_src);
}

fn validate_config(config: &Config) -> Result<()> {
    if config.docker.cli.trim().is_empty() {
        return Err(anyhow!(DockhandError::Config(
            "docker.cli must not be empty".to_string()
        )));
    }
    if config.container.healthy_wait_timeout == 0 {
        return Err(anyhow!(DockhandError::Config(
            "container.healthy_wait_timeout must be greater than zero".to_string()
        )));
    }
    let src = PathBuf::from(&config.compose.project_src);
    if src.exists() && !src.is_dir() {
        return Err(anyhow!(DockhandError::Config(format!(
            "Configured project_src '{}' exists but is not a directory.",
            src.display()
        ))));
    }
    Ok(())
}
