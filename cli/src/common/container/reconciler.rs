//! # Container Reconciler
//!
//! File: cli/src/common/container/reconciler.rs
//!
//! ## Overview
//!
//! Converges one container towards a [`PreparedSpec`] through a
//! [`ContainerEngine`]. The result reports whether anything changed, the
//! actions taken, the final inspection, a before/after diff and the same
//! differences as a per-facet list.
//!
//! ## Architecture
//!
//! For every state except `absent`:
//!
//! 1. Resolve the image according to the `pull` policy.
//! 2. If the container is missing (or still being removed, after waiting for
//!    that to finish), create it.
//! 3. Otherwise compare image and facets. Any difference in a facet that cannot
//!    be updated in place, a different image ID, or `recreate = true` leads to
//!    stop, remove and create.
//! 4. Apply in-place updates (resource limits, restart policy) unless the
//!    container was just recreated.
//! 5. Reconcile network attachments.
//! 6. Drive the running state, then pause/unpause.
//! 7. For `healthy`, poll the health status.
//!
//! For `absent`: stop if running, then remove.
//!
//! Polling (removal, health) backs off from 1s by a factor of 1.1, capped at
//! 10s, and fails once the configured maximum wait is exceeded. Stop, kill and
//! remove unpause and retry up to three times when the daemon refuses to act
//! on a paused container.
//!
//! In check mode every mutating call is skipped while `changed`, `actions` and
//! the diff are still reported.
//!
use super::compare::{compare, ComparisonMode};
use super::diff::{BeforeAfter, DifferenceTracker};
use super::facets::{FacetContext, FacetRegistry};
use super::networks::{extra_networks, network_differences};
use super::ports::resolve_default_host_ip;
use super::snapshot::Container;
use super::spec::{DesiredState, ImageComparison, ImageNameMismatch, PreparedSpec, PullPolicy};
use crate::common::docker::engine::{
    split_image_reference, ContainerEngine, CreateRequest, RemoveOptions, UpdateRequest,
};
use crate::core::error::{is_kind, DockhandError, Result};
use anyhow::{anyhow, Context};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const MAX_UNPAUSE_ATTEMPTS: u32 = 3;
const INITIAL_DELAY_SECS: f64 = 1.0;
const MAX_DELAY_SECS: f64 = 10.0;
const DELAY_FACTOR: f64 = 1.1;

/// One step taken (or, in check mode, planned) by the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    PulledImage { image: String },
    Created { image: String },
    Removed { id: String },
    Stopped { id: String },
    Killed { id: String, signal: Option<String> },
    Started { id: String },
    Restarted { id: String },
    Updated { id: String, parameters: Value },
    AddedToNetwork { id: String, network: String, parameters: Value },
    RemovedFromNetwork { id: String, network: String },
    SetPaused { id: String, paused: bool },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileResult {
    pub changed: bool,
    pub actions: Vec<Action>,
    /// Final inspection; `None` when the container does not exist.
    pub container: Option<Value>,
    pub diff: BeforeAfter,
    /// `[{facet: {parameter, container}}]`, in detection order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diffs: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PausedOp {
    Stop,
    Kill,
    Remove,
}

impl PausedOp {
    fn verb(&self) -> &'static str {
        match self {
            Self::Stop => "stopping",
            Self::Kill => "killing",
            Self::Remove => "removing",
        }
    }
}

/// What a wait loop polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOn {
    Status,
    Health,
}

pub struct ContainerReconciler<'a> {
    engine: &'a dyn ContainerEngine,
    registry: &'a FacetRegistry,
    spec: &'a PreparedSpec,
    check_mode: bool,
    result: ReconcileResult,
    diff: DifferenceTracker,
}

fn image_id(image: Option<&Value>) -> Option<&str> {
    image?.get("Id")?.as_str()
}

/// `nginx` and `nginx:latest` name the same image.
fn with_default_tag(reference: &str) -> String {
    let (repo, tag) = split_image_reference(reference);
    if tag.is_empty() {
        repo
    } else {
        format!("{}:{}", repo, tag)
    }
}

impl<'a> ContainerReconciler<'a> {
    pub fn new(
        engine: &'a dyn ContainerEngine,
        registry: &'a FacetRegistry,
        spec: &'a PreparedSpec,
        check_mode: bool,
    ) -> Self {
        Self {
            engine,
            registry,
            spec,
            check_mode,
            result: ReconcileResult::default(),
            diff: DifferenceTracker::new(),
        }
    }

    /// Runs the reconciliation and returns the accumulated result.
    #[instrument(skip(self), fields(container = %self.spec.name, engine = self.engine.name()))]
    pub async fn run(mut self) -> Result<ReconcileResult> {
        let container = match self.spec.state {
            DesiredState::Absent => self.ensure_absent().await?,
            _ => self.ensure_present().await?,
        };
        self.result.container = container.into_raw();
        self.result.diff = self.diff.before_after();
        self.result.diffs = self.diff.legacy_diffs();
        Ok(self.result)
    }

    fn record(&mut self, action: Action) {
        info!("{:?}", action);
        self.result.actions.push(action);
        self.result.changed = true;
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.result.warnings.push(message);
    }

    async fn inspect(&self) -> Result<Container> {
        Ok(Container::new(
            self.engine.inspect_container(&self.spec.name).await?,
        ))
    }

    // --- absent ---

    async fn ensure_absent(&mut self) -> Result<Container> {
        let mut container = self.inspect().await?;
        if container.removing() {
            container = self.wait_for_removal().await?;
        }
        if !container.exists() {
            return Ok(container);
        }
        self.diff.add("exists", json!(false), json!(true));
        let id = container.id().unwrap_or(&self.spec.name).to_string();
        if container.running() {
            self.stop_container(&id).await?;
        }
        self.remove_container(&id).await?;
        if self.check_mode {
            return Ok(container);
        }
        Ok(Container::absent())
    }

    // --- present / started / healthy / stopped ---

    async fn ensure_present(&mut self) -> Result<Container> {
        let mut container = self.inspect().await?;
        if container.removing() {
            debug!("Container {} is being removed, waiting", self.spec.name);
            container = self.wait_for_removal().await?;
        }

        self.check_networks_exist().await?;
        let image = self.resolve_image(&container).await?;
        let comparison_image = match self.spec.image_comparison {
            ImageComparison::CurrentImage if container.exists() => match container.image() {
                Some(current) => self.engine.inspect_image(current).await?,
                None => image.clone(),
            },
            _ => image.clone(),
        };
        let default_host_ip = self.default_host_ip().await?;
        let ctx = FacetContext {
            image: comparison_image.as_ref(),
            label_policy: self.spec.label_policy,
            default_host_ip: &default_host_ip,
        };

        let mut recreated = false;
        if !container.exists() {
            self.diff.add("exists", json!(true), json!(false));
            container = self.create_container(&container, image.as_ref(), &ctx).await?;
            recreated = true;
        } else {
            let differences = self.has_different_configuration(&container, &ctx)?;
            let image_different = self.image_different(&container, image.as_ref());
            if image_different || !differences.is_empty() || self.spec.recreate {
                if image_different {
                    self.diff.add(
                        "image",
                        json!(image_id(image.as_ref())),
                        json!(container.image()),
                    );
                }
                let reasons: Vec<&str> = differences
                    .entries()
                    .iter()
                    .map(|d| d.name.as_str())
                    .collect();
                info!(
                    "Recreating {} (image changed: {}, differing: [{}], forced: {})",
                    self.spec.name,
                    image_different,
                    reasons.join(", "),
                    self.spec.recreate
                );
                self.diff.merge(differences);
                let id = container.id().unwrap_or(&self.spec.name).to_string();
                if container.running() {
                    self.stop_container(&id).await?;
                }
                self.remove_container(&id).await?;
                if !self.check_mode {
                    self.wait_for_removal().await?;
                }
                container = self.create_container(&container, image.as_ref(), &ctx).await?;
                recreated = true;
            }
        }

        if !recreated {
            let limits = self.has_different_resource_limits(&container, &ctx)?;
            if !limits.is_empty() {
                self.diff.merge(limits);
                container = self.update_limits(container, &ctx).await?;
            }
        }

        container = self.update_networks(container, recreated).await?;
        container = self.drive_running_state(container, recreated).await?;
        container = self.apply_paused(container).await?;

        if self.spec.state == DesiredState::Healthy && !self.check_mode {
            container = self
                .wait_for_state(
                    &["starting", "unhealthy"],
                    false,
                    self.spec.healthy_wait_timeout,
                    WaitOn::Health,
                )
                .await?;
        }
        Ok(container)
    }

    async fn resolve_image(&mut self, container: &Container) -> Result<Option<Value>> {
        let Some(reference) = self.spec.image.clone() else {
            return match container.image() {
                Some(current) => self.engine.inspect_image(current).await,
                None => Ok(None),
            };
        };

        let mut image = self.engine.inspect_image(&reference).await?;
        let should_pull = match self.spec.pull {
            PullPolicy::Always => true,
            PullPolicy::Missing => image.is_none(),
            PullPolicy::Never => false,
        };
        if !should_pull {
            if image.is_none() {
                return Err(anyhow!(DockhandError::ImageNotFound { name: reference }));
            }
            return Ok(image);
        }

        let before = image_id(image.as_ref()).map(str::to_string);
        if self.check_mode {
            if image.is_none() {
                self.record(Action::PulledImage { image: reference });
            }
            return Ok(image);
        }
        let (repository, tag) = split_image_reference(&reference);
        self.engine
            .pull_image(&repository, &tag)
            .await
            .with_context(|| format!("Failed to pull image {}", reference))?;
        image = self.engine.inspect_image(&reference).await?;
        if image.is_none() {
            return Err(anyhow!(DockhandError::ImageNotFound { name: reference }));
        }
        if image_id(image.as_ref()).map(str::to_string) != before {
            self.record(Action::PulledImage { image: reference });
        }
        Ok(image)
    }

    async fn default_host_ip(&self) -> Result<String> {
        if !self.spec.values.contains_key("published_ports") {
            return Ok(String::new());
        }
        if let Some(explicit) = self.spec.default_host_ip.as_deref() {
            return Ok(resolve_default_host_ip(Some(explicit), &[]));
        }
        let mut names: Vec<String> = self
            .spec
            .networks
            .iter()
            .flatten()
            .map(|n| n.name.clone())
            .collect();
        if names.is_empty() {
            let mode = self.spec.values.get("network_mode").and_then(Value::as_str);
            names.push(match mode {
                Some(m) if m != "default" => m.to_string(),
                _ => "bridge".to_string(),
            });
        }
        let mut inspections = Vec::new();
        for name in names {
            if let Some(network) = self.engine.inspect_network(&name).await? {
                inspections.push(network);
            }
        }
        Ok(resolve_default_host_ip(None, &inspections))
    }

    async fn check_networks_exist(&self) -> Result<()> {
        for network in self.spec.networks.iter().flatten() {
            if self.engine.inspect_network(&network.name).await?.is_none() {
                return Err(anyhow!(DockhandError::Config(format!(
                    "Parameter error: network named {} could not be found. Does it exist?",
                    network.name
                ))));
            }
        }
        Ok(())
    }

    fn image_different(&self, container: &Container, image: Option<&Value>) -> bool {
        let Some(reference) = self.spec.image.as_deref() else {
            return false;
        };
        if self.spec.mode("image") != ComparisonMode::Strict {
            return false;
        }
        if self.spec.image_comparison == ImageComparison::DesiredImage
            && image_id(image) != container.image()
        {
            return true;
        }
        self.spec.image_name_mismatch == ImageNameMismatch::Recreate
            && container.image_name().map(with_default_tag) != Some(with_default_tag(reference))
    }

    fn differences(
        &self,
        container: &Container,
        ctx: &FacetContext,
        updatable: bool,
    ) -> Result<DifferenceTracker> {
        let mut tracker = DifferenceTracker::new();
        let Some(raw) = container.raw() else {
            return Ok(tracker);
        };
        for facet in self.registry.iter() {
            if facet.is_out_of_band() || facet.is_updatable() != updatable {
                continue;
            }
            let Some(prepared) = self.spec.values.get(facet.name) else {
                continue;
            };
            let mode = self.spec.mode(facet.name);
            if mode == ComparisonMode::Ignore {
                continue;
            }
            let expected = facet.expected(prepared, mode, ctx)?;
            let actual = facet.extract(raw);
            if !compare(facet.comparison_type, mode, Some(&expected), actual.as_ref()) {
                debug!("{} differs: wanted {} found {:?}", facet.name, expected, actual);
                tracker.add(facet.name, expected, actual.unwrap_or(Value::Null));
            }
        }
        Ok(tracker)
    }

    /// Differences that require recreating the container.
    pub fn has_different_configuration(
        &self,
        container: &Container,
        ctx: &FacetContext,
    ) -> Result<DifferenceTracker> {
        self.differences(container, ctx, false)
    }

    /// Differences in facets the daemon can update in place.
    pub fn has_different_resource_limits(
        &self,
        container: &Container,
        ctx: &FacetContext,
    ) -> Result<DifferenceTracker> {
        self.differences(container, ctx, true)
    }

    async fn create_container(
        &mut self,
        previous: &Container,
        image: Option<&Value>,
        ctx: &FacetContext<'_>,
    ) -> Result<Container> {
        let image_ref = match (&self.spec.image, previous.image()) {
            (Some(reference), _) => reference.clone(),
            (None, Some(current)) => current.to_string(),
            (None, None) => {
                return Err(anyhow!(DockhandError::Config(
                    "Cannot create container when image is not specified!".to_string()
                )))
            }
        };
        if image.is_none() && !self.check_mode {
            return Err(anyhow!(DockhandError::ImageNotFound { name: image_ref }));
        }

        let (mut payload, mut cli_args) =
            self.registry.create_request(&self.spec.values, ctx, &image_ref);
        let network_mode = self.spec.values.get("network_mode").and_then(Value::as_str);
        if let Some(first) = self.spec.networks.as_ref().and_then(|n| n.first()) {
            if self.spec.networks_cli_compatible && network_mode == Some(first.name.as_str()) {
                let endpoint = first.endpoint();
                payload["NetworkingConfig"] = json!({
                    "EndpointsConfig": {first.name.clone(): endpoint.to_api()}
                });
                let mut flags = endpoint.to_cli("--network-alias");
                flags.append(&mut cli_args);
                cli_args = flags;
            }
        }

        self.record(Action::Created { image: image_ref });
        if self.check_mode {
            return Ok(Container::absent());
        }
        let request = CreateRequest {
            name: self.spec.name.clone(),
            payload,
            cli_args,
        };
        let id = self.engine.create_container(&request).await?;
        info!("Created container {} ({})", self.spec.name, id);
        self.inspect().await
    }

    async fn update_limits(
        &mut self,
        container: Container,
        ctx: &FacetContext<'_>,
    ) -> Result<Container> {
        let id = container.id().unwrap_or(&self.spec.name).to_string();
        let (payload, cli_args) = self.registry.update_request(&self.spec.values, ctx);
        self.record(Action::Updated {
            id: id.clone(),
            parameters: payload.clone(),
        });
        if self.check_mode {
            return Ok(container);
        }
        self.engine
            .update_container(&id, &UpdateRequest { payload, cli_args })
            .await
            .with_context(|| format!("Error updating container {}", id))?;
        self.inspect().await
    }

    async fn update_networks(&mut self, container: Container, created: bool) -> Result<Container> {
        let Some(desired) = self.spec.networks.as_ref() else {
            return Ok(container);
        };
        let network_mode = self.spec.values.get("network_mode").and_then(Value::as_str);
        if matches!(network_mode, Some("host" | "none"))
            || network_mode.is_some_and(|m| m.starts_with("container:"))
        {
            self.warn(format!(
                "networks are ignored because network_mode is {}",
                network_mode.unwrap_or_default()
            ));
            return Ok(container);
        }
        let Some(raw) = container.raw() else {
            // Created in check mode: nothing is attached yet.
            if created {
                for network in desired.iter().skip(usize::from(self.spec.networks_cli_compatible)) {
                    self.record(Action::AddedToNetwork {
                        id: self.spec.name.clone(),
                        network: network.name.clone(),
                        parameters: json!(network),
                    });
                }
            }
            return Ok(container);
        };
        let id = container.id().unwrap_or(&self.spec.name).to_string();
        let differences = network_differences(desired, raw);
        let extras = if self.spec.mode("networks") == ComparisonMode::Strict {
            extra_networks(desired, raw)
        } else {
            Vec::new()
        };
        if differences.is_empty() && extras.is_empty() {
            return Ok(container);
        }

        for difference in differences {
            let name = difference.spec.name.clone();
            self.diff.add(
                format!("network.{}", name),
                json!(difference.spec),
                difference.current.clone().unwrap_or(Value::Null),
            );
            if difference.current.is_some() {
                self.record(Action::RemovedFromNetwork {
                    id: id.clone(),
                    network: name.clone(),
                });
                if !self.check_mode {
                    self.engine
                        .disconnect_network(&id, &name)
                        .await
                        .with_context(|| {
                            format!("Error disconnecting container from network {}", name)
                        })?;
                }
            }
            self.record(Action::AddedToNetwork {
                id: id.clone(),
                network: name.clone(),
                parameters: json!(difference.spec),
            });
            if !self.check_mode {
                self.engine
                    .connect_network(&id, &name, &difference.spec.endpoint())
                    .await
                    .with_context(|| format!("Error connecting container to network {}", name))?;
            }
        }
        for name in extras {
            self.diff.add(format!("network.{}", name), Value::Null, json!({"name": name}));
            self.record(Action::RemovedFromNetwork {
                id: id.clone(),
                network: name.clone(),
            });
            if !self.check_mode {
                self.engine
                    .disconnect_network(&id, &name)
                    .await
                    .with_context(|| {
                        format!("Error disconnecting container from network {}", name)
                    })?;
            }
        }
        if self.check_mode {
            return Ok(container);
        }
        self.inspect().await
    }

    async fn drive_running_state(
        &mut self,
        container: Container,
        created: bool,
    ) -> Result<Container> {
        let id = container.id().unwrap_or(&self.spec.name).to_string();
        let running = container.running();
        match self.spec.state {
            DesiredState::Started | DesiredState::Healthy => {
                if !running {
                    self.diff.add("running", json!(true), json!(false));
                    self.record(Action::Started { id: id.clone() });
                    if !self.check_mode {
                        self.engine
                            .start(&id)
                            .await
                            .with_context(|| format!("Error starting container {}", id))?;
                    }
                } else if self.spec.restart && !created {
                    self.diff.add("restarted", json!(true), json!(false));
                    self.record(Action::Restarted { id: id.clone() });
                    if !self.check_mode {
                        self.engine
                            .restart(&id, self.spec.stop_timeout)
                            .await
                            .with_context(|| format!("Error restarting container {}", id))?;
                    }
                } else {
                    return Ok(container);
                }
            }
            DesiredState::Stopped if running => {
                self.diff.add("running", json!(false), json!(true));
                self.stop_container(&id).await?;
            }
            _ => return Ok(container),
        }
        if self.check_mode {
            return Ok(container);
        }
        self.inspect().await
    }

    async fn apply_paused(&mut self, container: Container) -> Result<Container> {
        let Some(wanted) = self.spec.paused else {
            return Ok(container);
        };
        if !container.exists() || container.paused() == wanted {
            return Ok(container);
        }
        if !container.running() {
            if wanted {
                self.warn(format!("Cannot pause container {}: it is not running", self.spec.name));
            }
            return Ok(container);
        }
        let id = container.id().unwrap_or(&self.spec.name).to_string();
        self.diff.add("paused", json!(wanted), json!(container.paused()));
        self.record(Action::SetPaused {
            id: id.clone(),
            paused: wanted,
        });
        if self.check_mode {
            return Ok(container);
        }
        let outcome = if wanted {
            self.engine.pause(&id).await
        } else {
            self.engine.unpause(&id).await
        };
        outcome.with_context(|| {
            format!("Error {} container {}", if wanted { "pausing" } else { "unpausing" }, id)
        })?;
        self.inspect().await
    }

    // --- stop / remove with the unpause race ---

    async fn stop_container(&mut self, id: &str) -> Result<()> {
        if self.spec.force_kill {
            self.record(Action::Killed {
                id: id.to_string(),
                signal: self.spec.kill_signal.clone(),
            });
            if !self.check_mode {
                self.retry_unpaused(id, PausedOp::Kill).await?;
            }
        } else {
            self.record(Action::Stopped { id: id.to_string() });
            if !self.check_mode {
                self.retry_unpaused(id, PausedOp::Stop).await?;
            }
        }
        Ok(())
    }

    async fn remove_container(&mut self, id: &str) -> Result<()> {
        self.record(Action::Removed { id: id.to_string() });
        if self.check_mode {
            return Ok(());
        }
        match self.retry_unpaused(id, PausedOp::Remove).await {
            Ok(()) => Ok(()),
            Err(e)
                if is_kind(&e, |k| {
                    matches!(
                        k,
                        DockhandError::RemovalInProgress(_)
                            | DockhandError::ContainerNotFound { .. }
                    )
                }) =>
            {
                debug!("Removal of {} already under way or done: {}", id, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn retry_unpaused(&self, id: &str, op: PausedOp) -> Result<()> {
        let mut unpauses = 0;
        loop {
            let outcome = match op {
                PausedOp::Stop => self.engine.stop(id, self.spec.stop_timeout).await,
                PausedOp::Kill => self.engine.kill(id, self.spec.kill_signal.as_deref()).await,
                PausedOp::Remove => {
                    self.engine
                        .remove(
                            id,
                            RemoveOptions {
                                volumes: self.spec.remove_volumes,
                                force: false,
                            },
                        )
                        .await
                }
            };
            let err = match outcome {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            if !is_kind(&err, |k| matches!(k, DockhandError::UnpauseRequired(_))) {
                return Err(err.context(format!("Error {} container {}", op.verb(), id)));
            }
            if unpauses == MAX_UNPAUSE_ATTEMPTS {
                return Err(err.context(format!(
                    "Error {} container {} [tried to unpause three times]",
                    op.verb(),
                    id
                )));
            }
            unpauses += 1;
            debug!("Container {} is paused, unpausing (attempt {})", id, unpauses);
            self.engine
                .unpause(id)
                .await
                .with_context(|| format!("Error unpausing container {} for {}", id, op.verb()))?;
        }
    }

    // --- polling ---

    /// Waits out an in-progress removal.
    async fn wait_for_removal(&self) -> Result<Container> {
        self.wait_for_state(
            &["removing"],
            true,
            self.spec.removal_wait_timeout,
            WaitOn::Status,
        )
        .await
    }

    /// Polls until the container leaves `wait_states`.
    ///
    /// `max_wait` of zero waits forever. A vanished container is accepted only
    /// when `accept_removal` is set.
    async fn wait_for_state(
        &self,
        wait_states: &[&str],
        accept_removal: bool,
        max_wait: u64,
        wait_on: WaitOn,
    ) -> Result<Container> {
        let max_wait = max_wait as f64;
        let mut delay = INITIAL_DELAY_SECS;
        let mut total_wait = 0.0;
        loop {
            let container = self.inspect().await?;
            if !container.exists() {
                if accept_removal {
                    return Ok(container);
                }
                return Err(anyhow!(DockhandError::ContainerNotFound {
                    name: self.spec.name.clone()
                }))
                .context("Encountered vanished container while waiting for it");
            }
            let state = match wait_on {
                WaitOn::Status => container
                    .raw()
                    .and_then(|r| r.get("State")?.get("Status")?.as_str()),
                WaitOn::Health => container.health_status(),
            };
            if !state.is_some_and(|s| wait_states.contains(&s)) {
                return Ok(container);
            }
            if max_wait > 0.0 {
                if total_wait > max_wait || delay < 1e-4 {
                    return Err(anyhow!(DockhandError::Timeout(format!(
                        "Timeout of {} seconds exceeded while waiting for container {} (last state: {})",
                        max_wait,
                        self.spec.name,
                        state.unwrap_or_default()
                    ))));
                }
                if total_wait + delay > max_wait {
                    delay = max_wait - total_wait;
                }
            }
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            total_wait += delay;
            delay = (delay * DELAY_FACTOR).min(MAX_DELAY_SECS);
        }
    }
}

/// Reconciles one prepared spec.
pub async fn reconcile(
    engine: &dyn ContainerEngine,
    registry: &FacetRegistry,
    spec: &PreparedSpec,
    check_mode: bool,
) -> Result<ReconcileResult> {
    ContainerReconciler::new(engine, registry, spec, check_mode)
        .run()
        .await
}
