//! # `dockhand compose up`
//!
//! File: cli/src/commands/compose/up.rs
//!
//! Maps the command line onto [`UpOptions`]. `--state stopped` creates the
//! services and then stops them; `--state restarted` restarts them.
//!
use crate::common::compose::manager::{BuildPolicy, RecreatePolicy, UpOptions, UpPullPolicy, UpState};
use clap::Parser;
use std::collections::BTreeMap;

/// `SERVICE=COUNT`.
fn parse_scale(raw: &str) -> Result<(String, u32), String> {
    let (service, count) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SERVICE=COUNT, got '{}'", raw))?;
    if service.is_empty() {
        return Err(format!("missing service name in '{}'", raw));
    }
    let count = count
        .parse::<u32>()
        .map_err(|_| format!("'{}' is not a valid replica count", count))?;
    Ok((service.to_string(), count))
}

#[derive(Parser, Debug)]
#[command(about = "Create and start the project's services")]
pub struct UpArgs {
    /// Desired state of the services.
    #[arg(long, value_enum, default_value_t = UpState::Present)]
    state: UpState,
    /// Image pull policy.
    #[arg(long, value_enum)]
    pull: Option<UpPullPolicy>,
    /// Build images before starting (`always`) or never build (`never`).
    #[arg(long, value_enum)]
    build: Option<BuildPolicy>,
    /// Container recreation policy.
    #[arg(long, value_enum, default_value_t = RecreatePolicy::Auto)]
    recreate: RecreatePolicy,
    /// Remove containers for services not defined in the Compose files.
    #[arg(long)]
    remove_orphans: bool,
    /// Recreate anonymous volumes instead of reusing them.
    #[arg(long)]
    renew_anon_volumes: bool,
    /// Do not start linked services.
    #[arg(long)]
    no_deps: bool,
    /// Shutdown timeout in seconds.
    #[arg(long, short)]
    timeout: Option<u32>,
    /// Scale SERVICE to COUNT instances. Repeatable.
    #[arg(long, value_parser = parse_scale)]
    scale: Vec<(String, u32)>,
    /// Wait for services to be running or healthy.
    #[arg(long)]
    wait: bool,
    /// Maximum seconds to wait with `--wait`.
    #[arg(long, requires = "wait")]
    wait_timeout: Option<u32>,
    /// Report what would change without changing it.
    #[arg(long)]
    dry_run: bool,
    /// Services to act on; all when omitted.
    services: Vec<String>,
}

impl UpArgs {
    pub fn into_options(self) -> UpOptions {
        UpOptions {
            state: self.state,
            pull: self.pull,
            build: self.build,
            recreate: self.recreate,
            remove_orphans: self.remove_orphans,
            renew_anon_volumes: self.renew_anon_volumes,
            dependencies: !self.no_deps,
            timeout: self.timeout,
            scale: self.scale.into_iter().collect::<BTreeMap<_, _>>(),
            wait: self.wait,
            wait_timeout: self.wait_timeout,
            dry_run: self.dry_run,
            services: self.services,
        }
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_args_parsing() {
        let args = UpArgs::try_parse_from([
            "up", "--state", "stopped", "--pull", "missing", "--recreate", "always", "--scale", "web=3",
            "--no-deps", "web",
        ])
        .unwrap();
        let opts = args.into_options();
        assert_eq!(opts.state, UpState::Stopped);
        assert_eq!(opts.pull, Some(UpPullPolicy::Missing));
        assert_eq!(opts.recreate, RecreatePolicy::Always);
        assert_eq!(opts.scale.get("web"), Some(&3));
        assert!(!opts.dependencies);
        assert_eq!(opts.services, vec!["web"]);
    }

    #[test]
    fn test_up_defaults() {
        let opts = UpArgs::try_parse_from(["up"]).unwrap().into_options();
        assert_eq!(opts.state, UpState::Present);
        assert!(opts.dependencies);
        assert!(opts.services.is_empty());
    }

    #[test]
    fn test_invalid_scale_and_wait_timeout_without_wait() {
        assert!(UpArgs::try_parse_from(["up", "--scale", "web"]).is_err());
        assert!(UpArgs::try_parse_from(["up", "--scale", "web=many"]).is_err());
        assert!(UpArgs::try_parse_from(["up", "--wait-timeout", "30"]).is_err());
    }
}
