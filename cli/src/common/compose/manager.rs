//! # Compose Invocation Manager
//!
//! File: cli/src/common/compose/manager.rs
//!
//! ## Overview
//!
//! Drives `docker compose` for one project and turns each invocation into an
//! idempotency-aware result (`changed`, `actions`, `failed`, `msg`, ...).
//!
//! ## Architecture
//!
//! Per manager instance:
//! 1. **Version check** (`ComposeManager::new`): `docker compose version --format json`;
//!    fails below [`MINIMUM_COMPOSE_VERSION`] and picks the JSON event parser
//!    from 2.29.0 on.
//!
//! Per invocation:
//! 2. **Argument assembly**: `compose --ansi never [--progress json|plain]`, then
//!    the project flags, then the verb and its flags.
//! 3. **Invoke** through the [`CommandRunner`] seam.
//! 4. **Parse** stderr with the JSON or text parser.
//! 5. **Aggregate** into a [`ComposeResult`]; several invocations can feed one result.
//! 6. **Failure check**: a non-zero exit marks the result failed and stops the sequence.
//!
//! Compose `stop` reports `Stopping` even for containers that are already
//! stopped, so stopping first runs with `--dry-run` and only issues the real
//! stop when the dry run reports work.
//!
use super::classify::{
    build_failure_message, emit_warnings, extract_actions, has_changes, is_failed, Action,
};
use super::event::ParsedEvents;
use super::json::parse_json_events;
use super::text::parse_text_events;
use super::version::{
    ComposeVersion, JSON_EVENTS_VERSION, MINIMUM_COMPOSE_VERSION, PLAIN_PROGRESS_VERSION,
    PS_JSON_LINES_VERSION, PS_NO_TRUNC_VERSION, PULL_POLICY_VERSION,
};
use crate::common::process::{quote_command, CommandOutput, CommandRunner};
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Project-level flags shared by every verb.
#[derive(Debug, Clone, Default)]
pub struct ProjectOptions {
    pub project_src: PathBuf,
    pub project_name: Option<String>,
    pub files: Vec<String>,
    pub env_files: Vec<String>,
    pub profiles: Vec<String>,
}

/// Desired project state for `up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum UpState {
    #[default]
    Present,
    Stopped,
    Restarted,
}

/// `up --pull` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UpPullPolicy {
    Always,
    Missing,
    Never,
    Build,
}

/// `--build` / `--no-build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BuildPolicy {
    Always,
    Never,
}

/// `--force-recreate` / `--no-recreate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RecreatePolicy {
    #[default]
    Auto,
    Always,
    Never,
}

/// `down --rmi` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RemoveImages {
    All,
    Local,
}

/// `pull --policy` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PullPolicy {
    #[default]
    Always,
    Missing,
}

macro_rules! arg_names {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_arg(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }
    };
}

arg_names!(UpPullPolicy { Always => "always", Missing => "missing", Never => "never", Build => "build" });
arg_names!(RemoveImages { All => "all", Local => "local" });
arg_names!(PullPolicy { Always => "always", Missing => "missing" });

#[derive(Debug, Clone)]
pub struct UpOptions {
    pub state: UpState,
    pub pull: Option<UpPullPolicy>,
    pub build: Option<BuildPolicy>,
    pub recreate: RecreatePolicy,
    pub remove_orphans: bool,
    pub renew_anon_volumes: bool,
    pub dependencies: bool,
    pub timeout: Option<u32>,
    pub scale: BTreeMap<String, u32>,
    pub wait: bool,
    pub wait_timeout: Option<u32>,
    pub dry_run: bool,
    pub services: Vec<String>,
}

impl Default for UpOptions {
    fn default() -> Self {
        Self {
            state: UpState::default(),
            pull: None,
            build: None,
            recreate: RecreatePolicy::default(),
            remove_orphans: false,
            renew_anon_volumes: false,
            dependencies: true,
            timeout: None,
            scale: BTreeMap::new(),
            wait: false,
            wait_timeout: None,
            dry_run: false,
            services: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DownOptions {
    pub remove_orphans: bool,
    pub remove_images: Option<RemoveImages>,
    pub remove_volumes: bool,
    pub timeout: Option<u32>,
    pub dry_run: bool,
    pub services: Vec<String>,
}

/// Options for `stop` and `restart`.
#[derive(Debug, Clone, Default)]
pub struct StopOptions {
    pub timeout: Option<u32>,
    pub dry_run: bool,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    pub policy: PullPolicy,
    pub ignore_buildable: bool,
    pub include_deps: bool,
    pub dry_run: bool,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub no_cache: bool,
    pub pull: bool,
    pub with_dependencies: bool,
    pub dry_run: bool,
    pub services: Vec<String>,
}

/// Result of one or more Compose invocations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComposeResult {
    pub changed: bool,
    pub actions: Vec<Action>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub rc: i32,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub containers: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Value>>,
}

fn combine_text_output(existing: &str, new: &str) -> String {
    match (existing.is_empty(), new.is_empty()) {
        (true, _) => new.to_string(),
        (false, true) => existing.to_string(),
        (false, false) => format!("{}\n{}", existing, new),
    }
}

/// Whether stop/pull/build events should be ignored for `changed`.
#[derive(Debug, Clone, Copy, Default)]
struct IgnoreEvents {
    pull: bool,
    build: bool,
}

/// Driver for one Compose project.
pub struct ComposeManager {
    runner: Arc<dyn CommandRunner>,
    docker_cli: String,
    project: ProjectOptions,
    version: ComposeVersion,
    use_json_events: bool,
}

impl ComposeManager {
    /// Queries the Compose plugin version and prepares a manager.
    ///
    /// # Errors
    ///
    /// * `DockhandError::ComposeVersion` - plugin missing or older than 2.18.0.
    /// * Transport errors from the runner.
    #[instrument(skip(runner, project), fields(cli = %docker_cli))]
    pub async fn new(
        runner: Arc<dyn CommandRunner>,
        docker_cli: &str,
        project: ProjectOptions,
    ) -> Result<Self> {
        let args = vec![
            "compose".to_string(),
            "version".to_string(),
            "--format".to_string(),
            "json".to_string(),
        ];
        let output = runner
            .run(docker_cli, &args, None)
            .await
            .context("Failed to query the Docker Compose version")?;
        if !output.success() {
            return Err(anyhow!(DockhandError::ComposeVersion(format!(
                "Docker CLI '{}' does not have the compose plugin installed: {}",
                docker_cli,
                output.stderr.trim()
            ))));
        }
        let raw: Value = serde_json::from_str(output.stdout.trim()).map_err(|e| {
            anyhow!(DockhandError::Parse {
                what: "docker compose version".to_string(),
                message: e.to_string(),
            })
        })?;
        let raw_version = raw.get("version").and_then(Value::as_str).ok_or_else(|| {
            anyhow!(DockhandError::Parse {
                what: "docker compose version".to_string(),
                message: "missing 'version' key".to_string(),
            })
        })?;
        let version = ComposeVersion::parse(raw_version)?;
        Self::with_version(runner, docker_cli, project, version)
    }

    /// Builds a manager for an already known plugin version.
    pub fn with_version(
        runner: Arc<dyn CommandRunner>,
        docker_cli: &str,
        project: ProjectOptions,
        version: ComposeVersion,
    ) -> Result<Self> {
        if version < MINIMUM_COMPOSE_VERSION {
            return Err(anyhow!(DockhandError::ComposeVersion(format!(
                "Docker Compose version {} is too old; at least {} is required",
                version, MINIMUM_COMPOSE_VERSION
            ))));
        }
        let use_json_events = version >= JSON_EVENTS_VERSION;
        info!(%version, use_json_events, "Using Docker Compose");
        Ok(Self {
            runner,
            docker_cli: docker_cli.to_string(),
            project,
            version,
            use_json_events,
        })
    }

    pub fn version(&self) -> ComposeVersion {
        self.version
    }

    /// Global arguments common to every verb.
    pub fn base_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec!["compose".into(), "--ansi".into(), "never".into()];
        if self.use_json_events {
            args.extend(["--progress".into(), "json".into()]);
        } else if self.version >= PLAIN_PROGRESS_VERSION {
            args.extend(["--progress".into(), "plain".into()]);
        }
        args.push("--project-directory".into());
        args.push(self.project.project_src.to_string_lossy().into_owned());
        if let Some(name) = &self.project.project_name {
            args.extend(["--project-name".into(), name.clone()]);
        }
        for file in &self.project.files {
            args.extend(["--file".into(), file.clone()]);
        }
        for env_file in &self.project.env_files {
            args.extend(["--env-file".into(), env_file.clone()]);
        }
        for profile in &self.project.profiles {
            args.extend(["--profile".into(), profile.clone()]);
        }
        args
    }

    /// Routes stderr to the parser matching the plugin version.
    pub fn parse_events(&self, stderr: &str, dry_run: bool, nonzero_rc: bool) -> ParsedEvents {
        if self.use_json_events {
            parse_json_events(stderr)
        } else {
            parse_text_events(stderr, dry_run, nonzero_rc)
        }
    }

    async fn call(&self, args: &[String]) -> Result<CommandOutput> {
        self.runner
            .run(&self.docker_cli, args, Some(&self.project.project_src))
            .await
    }

    /// Runs one invocation and folds it into `result`.
    ///
    /// Returns `false` when the invocation failed.
    async fn run_into(
        &self,
        result: &mut ComposeResult,
        args: Vec<String>,
        dry_run: bool,
        ignore: IgnoreEvents,
    ) -> Result<bool> {
        let output = self.call(&args).await?;
        let parsed = self.parse_events(&output.stderr, dry_run, output.rc != 0);

        result.changed |= has_changes(&parsed.events, ignore.pull, ignore.build);
        result.actions.extend(extract_actions(&parsed.events));
        result.stdout = combine_text_output(&result.stdout, &output.stdout);
        result.stderr = combine_text_output(&result.stderr, &output.stderr);
        result.warnings.extend(parsed.warnings);
        result.warnings.extend(emit_warnings(&parsed.events));
        result.rc = output.rc;

        if is_failed(output.rc) {
            result.failed = true;
            result.msg = Some(build_failure_message(&parsed.events, output.rc));
            result.cmd = Some(quote_command(&self.docker_cli, &args));
            debug!(rc = output.rc, "Compose invocation failed");
            return Ok(false);
        }
        Ok(true)
    }

    fn up_args(&self, opts: &UpOptions, no_start: bool) -> Vec<String> {
        let mut args = self.base_args();
        args.extend(["up", "--detach", "--no-color", "--quiet-pull"].map(String::from));
        if let Some(pull) = opts.pull {
            args.extend(["--pull".to_string(), pull.as_arg().to_string()]);
        }
        if opts.remove_orphans {
            args.push("--remove-orphans".into());
        }
        match opts.recreate {
            RecreatePolicy::Always => args.push("--force-recreate".into()),
            RecreatePolicy::Never => args.push("--no-recreate".into()),
            RecreatePolicy::Auto => {}
        }
        if opts.renew_anon_volumes {
            args.push("--renew-anon-volumes".into());
        }
        if !opts.dependencies {
            args.push("--no-deps".into());
        }
        if let Some(timeout) = opts.timeout {
            args.extend(["--timeout".to_string(), timeout.to_string()]);
        }
        match opts.build {
            Some(BuildPolicy::Always) => args.push("--build".into()),
            Some(BuildPolicy::Never) => args.push("--no-build".into()),
            None => {}
        }
        for (service, count) in &opts.scale {
            args.extend(["--scale".to_string(), format!("{}={}", service, count)]);
        }
        if opts.wait {
            args.push("--wait".into());
            if let Some(wait_timeout) = opts.wait_timeout {
                args.extend(["--wait-timeout".to_string(), wait_timeout.to_string()]);
            }
        }
        if no_start {
            args.push("--no-start".into());
        }
        if opts.dry_run {
            args.push("--dry-run".into());
        }
        args.push("--".into());
        args.extend(opts.services.iter().cloned());
        args
    }

    fn stop_like_args(&self, verb: &str, opts: &StopOptions, dry_run: bool) -> Vec<String> {
        let mut args = self.base_args();
        args.push(verb.to_string());
        if let Some(timeout) = opts.timeout {
            args.extend(["--timeout".to_string(), timeout.to_string()]);
        }
        if dry_run {
            args.push("--dry-run".into());
        }
        args.push("--".into());
        args.extend(opts.services.iter().cloned());
        args
    }

    /// Brings the project to `opts.state`.
    #[instrument(skip(self, opts), fields(state = ?opts.state))]
    pub async fn up(&self, opts: &UpOptions) -> Result<ComposeResult> {
        let ignore = IgnoreEvents {
            pull: true,
            build: true,
        };
        let mut result = ComposeResult::default();
        match opts.state {
            UpState::Present => {
                self.run_into(&mut result, self.up_args(opts, false), opts.dry_run, ignore)
                    .await?;
            }
            UpState::Stopped => {
                if self
                    .run_into(&mut result, self.up_args(opts, true), opts.dry_run, ignore)
                    .await?
                {
                    let stop = StopOptions {
                        timeout: opts.timeout,
                        dry_run: opts.dry_run,
                        services: opts.services.clone(),
                    };
                    self.stop_into(&mut result, &stop).await?;
                }
            }
            UpState::Restarted => {
                let restart = StopOptions {
                    timeout: opts.timeout,
                    dry_run: opts.dry_run,
                    services: opts.services.clone(),
                };
                self.run_into(
                    &mut result,
                    self.stop_like_args("restart", &restart, opts.dry_run),
                    opts.dry_run,
                    IgnoreEvents::default(),
                )
                .await?;
            }
        }
        Ok(result)
    }

    async fn stop_into(&self, result: &mut ComposeResult, opts: &StopOptions) -> Result<()> {
        let mut rehearsal = ComposeResult::default();
        let ok = self
            .run_into(
                &mut rehearsal,
                self.stop_like_args("stop", opts, true),
                true,
                IgnoreEvents::default(),
            )
            .await?;
        let needs_stop = ok && rehearsal.changed;
        merge_results(result, rehearsal);
        if needs_stop && !opts.dry_run {
            self.run_into(
                result,
                self.stop_like_args("stop", opts, false),
                false,
                IgnoreEvents::default(),
            )
            .await?;
        }
        Ok(())
    }

    /// Stops running services; reports `changed` only if something was running.
    #[instrument(skip(self, opts))]
    pub async fn stop(&self, opts: &StopOptions) -> Result<ComposeResult> {
        let mut result = ComposeResult::default();
        self.stop_into(&mut result, opts).await?;
        Ok(result)
    }

    #[instrument(skip(self, opts))]
    pub async fn restart(&self, opts: &StopOptions) -> Result<ComposeResult> {
        let mut result = ComposeResult::default();
        self.run_into(
            &mut result,
            self.stop_like_args("restart", opts, opts.dry_run),
            opts.dry_run,
            IgnoreEvents::default(),
        )
        .await?;
        Ok(result)
    }

    #[instrument(skip(self, opts))]
    pub async fn down(&self, opts: &DownOptions) -> Result<ComposeResult> {
        let mut args = self.base_args();
        args.push("down".into());
        if opts.remove_orphans {
            args.push("--remove-orphans".into());
        }
        if let Some(rmi) = opts.remove_images {
            args.extend(["--rmi".to_string(), rmi.as_arg().to_string()]);
        }
        if opts.remove_volumes {
            args.push("--volumes".into());
        }
        if let Some(timeout) = opts.timeout {
            args.extend(["--timeout".to_string(), timeout.to_string()]);
        }
        if opts.dry_run {
            args.push("--dry-run".into());
        }
        args.push("--".into());
        args.extend(opts.services.iter().cloned());

        let mut result = ComposeResult::default();
        self.run_into(&mut result, args, opts.dry_run, IgnoreEvents::default())
            .await?;
        Ok(result)
    }

    /// Pulls service images.
    ///
    /// # Errors
    ///
    /// `DockhandError::Config` when `--policy missing` is requested from a
    /// plugin older than 2.22.0.
    #[instrument(skip(self, opts))]
    pub async fn pull(&self, opts: &PullOptions) -> Result<ComposeResult> {
        let mut args = self.base_args();
        args.push("pull".into());
        if opts.policy != PullPolicy::Always {
            if self.version < PULL_POLICY_VERSION {
                return Err(anyhow!(DockhandError::Config(format!(
                    "--policy {} requires Docker Compose {} or newer, found {}",
                    opts.policy.as_arg(),
                    PULL_POLICY_VERSION,
                    self.version
                ))));
            }
            args.extend(["--policy".to_string(), opts.policy.as_arg().to_string()]);
        }
        if opts.ignore_buildable {
            args.push("--ignore-buildable".into());
        }
        if opts.include_deps {
            args.push("--include-deps".into());
        }
        if opts.dry_run {
            args.push("--dry-run".into());
        }
        args.push("--".into());
        args.extend(opts.services.iter().cloned());

        let mut result = ComposeResult::default();
        self.run_into(&mut result, args, opts.dry_run, IgnoreEvents::default())
            .await?;
        Ok(result)
    }

    #[instrument(skip(self, opts))]
    pub async fn build(&self, opts: &BuildOptions) -> Result<ComposeResult> {
        let mut args = self.base_args();
        args.push("build".into());
        if opts.no_cache {
            args.push("--no-cache".into());
        }
        if opts.pull {
            args.push("--pull".into());
        }
        if opts.with_dependencies {
            args.push("--with-dependencies".into());
        }
        if opts.dry_run {
            args.push("--dry-run".into());
        }
        args.push("--".into());
        args.extend(opts.services.iter().cloned());

        let mut result = ComposeResult::default();
        self.run_into(&mut result, args, opts.dry_run, IgnoreEvents::default())
            .await?;
        Ok(result)
    }

    /// Lists the project's containers (including stopped ones), normalised.
    #[instrument(skip(self))]
    pub async fn ps(&self) -> Result<Vec<Value>> {
        let mut args = self.base_args();
        args.extend(["ps", "--format", "json", "--all"].map(String::from));
        if self.version >= PS_NO_TRUNC_VERSION {
            args.push("--no-trunc".into());
        }
        let output = self.call(&args).await?.check(&self.docker_cli, &args)?;
        let raw = if self.version >= PS_JSON_LINES_VERSION {
            parse_json_lines(&output.stdout, "docker compose ps")?
        } else {
            parse_json_list(&output.stdout, "docker compose ps")?
        };
        Ok(raw.into_iter().map(normalize_container).collect())
    }

    /// Lists the images used by the project's containers.
    #[instrument(skip(self))]
    pub async fn images(&self) -> Result<Vec<Value>> {
        let mut args = self.base_args();
        args.extend(["images", "--format", "json"].map(String::from));
        let output = self.call(&args).await?.check(&self.docker_cli, &args)?;
        let trimmed = output.stdout.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        let value: Value = serde_json::from_str(trimmed).map_err(|e| {
            anyhow!(DockhandError::Parse {
                what: "docker compose images".to_string(),
                message: e.to_string(),
            })
        })?;
        match value {
            Value::Array(items) => Ok(items),
            // Compose 2.37 returns an object keyed by image id.
            Value::Object(map) => Ok(map.into_iter().map(|(_, v)| v).collect()),
            Value::Null => Ok(Vec::new()),
            other => Err(anyhow!(DockhandError::Parse {
                what: "docker compose images".to_string(),
                message: format!("unexpected JSON value {}", other),
            })),
        }
    }
}

/// Folds `other` into `result`: OR `changed`, concatenate the rest.
pub fn merge_results(result: &mut ComposeResult, other: ComposeResult) {
    result.changed |= other.changed;
    result.actions.extend(other.actions);
    result.stdout = combine_text_output(&result.stdout, &other.stdout);
    result.stderr = combine_text_output(&result.stderr, &other.stderr);
    result.warnings.extend(other.warnings);
    result.rc = other.rc;
    if other.failed {
        result.failed = true;
        result.msg = other.msg;
        result.cmd = other.cmd;
    }
}

fn parse_json_lines(stdout: &str, what: &str) -> Result<Vec<Value>> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| {
            if line.starts_with('[') {
                parse_json_list(line, what)
            } else {
                serde_json::from_str::<Value>(line)
                    .map(|v| vec![v])
                    .map_err(|e| {
                        anyhow!(DockhandError::Parse {
                            what: what.to_string(),
                            message: e.to_string(),
                        })
                    })
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(|chunks| chunks.into_iter().flatten().collect())
}

fn parse_json_list(stdout: &str, what: &str) -> Result<Vec<Value>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Vec<Value>>(trimmed).map_err(|e| {
        anyhow!(DockhandError::Parse {
            what: what.to_string(),
            message: e.to_string(),
        })
    })
}

fn split_comma_list(value: Option<&Value>) -> Option<Value> {
    match value {
        Some(Value::String(s)) => Some(Value::Array(
            s.split(',')
                .filter(|p| !p.is_empty())
                .map(|p| Value::String(p.to_string()))
                .collect(),
        )),
        _ => None,
    }
}

/// Converts the comma-joined string fields of `compose ps` into structured values.
fn normalize_container(mut container: Value) -> Value {
    let Some(obj) = container.as_object_mut() else {
        return container;
    };

    let labels: Map<String, Value> = match obj.get("Labels") {
        Some(Value::String(s)) => s
            .split(',')
            .filter(|p| !p.is_empty())
            .map(|part| match part.split_once('=') {
                Some((k, v)) => (k.to_string(), Value::String(v.to_string())),
                None => (part.to_string(), Value::String(String::new())),
            })
            .collect(),
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    obj.insert("Labels".into(), Value::Object(labels));

    let names = split_comma_list(obj.get("Names")).or_else(|| split_comma_list(obj.get("Name")));
    if let Some(names) = names {
        obj.insert("Names".into(), names);
    }
    if let Some(networks) = split_comma_list(obj.get("Networks")) {
        obj.insert("Networks".into(), networks);
    }
    if obj.get("Publishers").map_or(true, Value::is_null) {
        obj.insert("Publishers".into(), Value::Array(Vec::new()));
    }
    container
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::compose::event::ResourceType;
    use crate::common::process::testing::ScriptedRunner;

    fn project() -> ProjectOptions {
        ProjectOptions {
            project_src: PathBuf::from("/srv/app"),
            project_name: Some("app".into()),
            files: vec!["compose.yaml".into()],
            env_files: vec![],
            profiles: vec!["debug".into()],
        }
    }

    fn manager(runner: &Arc<ScriptedRunner>, version: ComposeVersion) -> ComposeManager {
        ComposeManager::with_version(runner.clone(), "docker", project(), version).unwrap()
    }

    #[tokio::test]
    async fn test_version_check_selects_json() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push(0, r#"{"version":"v2.29.1-desktop.1"}"#, "");
        let mgr = ComposeManager::new(runner.clone(), "docker", project())
            .await
            .unwrap();
        assert_eq!(mgr.version(), ComposeVersion::new(2, 29, 1));
        assert_eq!(
            &mgr.base_args()[..5],
            &["compose", "--ansi", "never", "--progress", "json"]
        );
        assert_eq!(
            runner.calls()[0],
            vec!["docker", "compose", "version", "--format", "json"]
        );
    }

    #[tokio::test]
    async fn test_version_check_rejects_old_or_missing() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push(0, r#"{"version":"v2.17.3"}"#, "");
        let err = ComposeManager::new(runner.clone(), "docker", project())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("too old"));

        runner.push(1, "", "docker: 'compose' is not a docker command.");
        let err = ComposeManager::new(runner.clone(), "docker", project())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("compose plugin"));
    }

    #[test]
    fn test_base_args_by_version() {
        let runner = Arc::new(ScriptedRunner::new());
        let old = manager(&runner, ComposeVersion::new(2, 18, 1));
        assert_eq!(
            old.base_args(),
            vec![
                "compose",
                "--ansi",
                "never",
                "--project-directory",
                "/srv/app",
                "--project-name",
                "app",
                "--file",
                "compose.yaml",
                "--profile",
                "debug"
            ]
        );
        let plain = manager(&runner, ComposeVersion::new(2, 20, 0));
        assert_eq!(&plain.base_args()[3..5], &["--progress", "plain"]);
    }

    #[tokio::test]
    async fn test_up_reports_actions() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push(
            0,
            "",
            "Container web  Creating\nContainer web  Created\nContainer web  Starting\nContainer web  Started\n",
        );
        let mgr = manager(&runner, ComposeVersion::new(2, 20, 0));
        let opts = UpOptions {
            pull: Some(UpPullPolicy::Missing),
            scale: BTreeMap::from([("web".to_string(), 2)]),
            services: vec!["web".into()],
            ..Default::default()
        };
        let result = mgr.up(&opts).await.unwrap();
        assert!(result.changed);
        assert!(!result.failed);
        assert_eq!(result.actions.len(), 2);
        assert_eq!(result.actions[0].what, ResourceType::Container);
        assert_eq!(result.actions[0].status, "Creating");
        assert_eq!(result.actions[1].status, "Starting");

        let call = &runner.calls()[0];
        let up_pos = call.iter().position(|a| a == "up").unwrap();
        assert_eq!(
            &call[up_pos..],
            &[
                "up", "--detach", "--no-color", "--quiet-pull", "--pull", "missing", "--scale",
                "web=2", "--", "web"
            ]
        );
    }

    #[tokio::test]
    async fn test_up_ignores_pull_events_for_changed() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push(0, "", "web Pulling\nweb Pulled\nContainer web  Running\n");
        let mgr = manager(&runner, ComposeVersion::new(2, 20, 0));
        let result = mgr.up(&UpOptions::default()).await.unwrap();
        assert!(!result.changed);
        assert_eq!(result.actions.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_preserves_output() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push(
            1,
            "partial",
            "Container web  Creating\nweb Error pull access denied for nope\n",
        );
        let mgr = manager(&runner, ComposeVersion::new(2, 20, 0));
        let result = mgr.up(&UpOptions::default()).await.unwrap();
        assert!(result.failed);
        assert_eq!(result.rc, 1);
        assert_eq!(
            result.msg.as_deref(),
            Some("Error when processing web: pull access denied for nope")
        );
        assert_eq!(result.stdout, "partial");
        assert!(result.cmd.as_deref().unwrap().starts_with("docker compose --ansi never"));
    }

    #[tokio::test]
    async fn test_stopped_state_short_circuits_on_failure() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push(3, "", "");
        let mgr = manager(&runner, ComposeVersion::new(2, 20, 0));
        let opts = UpOptions {
            state: UpState::Stopped,
            ..Default::default()
        };
        let result = mgr.up(&opts).await.unwrap();
        assert!(result.failed);
        assert_eq!(result.msg.as_deref(), Some("Return code 3 is non-zero"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_stopped_state_dry_runs_then_stops() {
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .push(0, "", "Container web  Created\n")
            .push(0, "", "DRY-RUN MODE - Container web  Stopping\nDRY-RUN MODE - Container web  Stopped\n")
            .push(0, "", "Container web  Stopping\nContainer web  Stopped\n");
        let mgr = manager(&runner, ComposeVersion::new(2, 20, 0));
        let opts = UpOptions {
            state: UpState::Stopped,
            ..Default::default()
        };
        let result = mgr.up(&opts).await.unwrap();
        assert!(result.changed);
        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].contains(&"--no-start".to_string()));
        assert!(calls[1].contains(&"--dry-run".to_string()));
        assert!(!calls[2].contains(&"--dry-run".to_string()));
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_stop_skips_real_stop_when_dry_run_is_clean() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push(0, "", "");
        let mgr = manager(&runner, ComposeVersion::new(2, 20, 0));
        let result = mgr.stop(&StopOptions::default()).await.unwrap();
        assert!(!result.changed);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_down_with_json_events() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push(
            0,
            "",
            "{\"id\":\"Container app-web-1\",\"status\":\"Working\",\"text\":\"Stopping\"}\n\
             {\"id\":\"Container app-web-1\",\"status\":\"Done\",\"text\":\"Removed\"}\n",
        );
        let mgr = manager(&runner, ComposeVersion::new(2, 30, 0));
        let opts = DownOptions {
            remove_images: Some(RemoveImages::Local),
            remove_volumes: true,
            ..Default::default()
        };
        let result = mgr.down(&opts).await.unwrap();
        assert!(result.changed);
        assert_eq!(result.actions[0].id.as_deref(), Some("app-web-1"));
        let call = &runner.calls()[0];
        let pos = call.iter().position(|a| a == "down").unwrap();
        assert_eq!(&call[pos..], &["down", "--rmi", "local", "--volumes", "--"]);
    }

    #[tokio::test]
    async fn test_pull_policy_requires_version() {
        let runner = Arc::new(ScriptedRunner::new());
        let mgr = manager(&runner, ComposeVersion::new(2, 21, 0));
        let opts = PullOptions {
            policy: PullPolicy::Missing,
            ..Default::default()
        };
        assert!(mgr.pull(&opts).await.is_err());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_ps_normalizes_containers() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push(
            0,
            "{\"Name\":\"app-web-1\",\"Labels\":\"a=1,b=\",\"Networks\":\"app_default\",\"Publishers\":null}\n",
            "",
        );
        let mgr = manager(&runner, ComposeVersion::new(2, 23, 0));
        let containers = mgr.ps().await.unwrap();
        assert_eq!(containers.len(), 1);
        let c = &containers[0];
        assert_eq!(c["Labels"]["a"], "1");
        assert_eq!(c["Labels"]["b"], "");
        assert_eq!(c["Names"], serde_json::json!(["app-web-1"]));
        assert_eq!(c["Networks"], serde_json::json!(["app_default"]));
        assert_eq!(c["Publishers"], serde_json::json!([]));
        assert!(runner.calls()[0].contains(&"--no-trunc".to_string()));
    }

    #[tokio::test]
    async fn test_images_accepts_map_shape() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push(0, r#"{"sha256:1":{"ContainerName":"web"}}"#, "");
        runner.push(0, r#"[{"ContainerName":"web"}]"#, "");
        let mgr = manager(&runner, ComposeVersion::new(2, 37, 0));
        assert_eq!(mgr.images().await.unwrap().len(), 1);
        assert_eq!(mgr.images().await.unwrap().len(), 1);
    }

    #[test]
    fn test_merge_results() {
        let mut a = ComposeResult {
            stdout: "one".into(),
            ..Default::default()
        };
        let b = ComposeResult {
            changed: true,
            stdout: "two".into(),
            ..Default::default()
        };
        merge_results(&mut a, b);
        assert!(a.changed);
        assert_eq!(a.stdout, "one\ntwo");
        assert_eq!(a.stderr, "");
    }
}
