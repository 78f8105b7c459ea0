//! # `dockhand compose build`
//!
//! File: cli/src/commands/compose/build.rs
//!
use crate::common::compose::manager::BuildOptions;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Build service images")]
pub struct BuildArgs {
    /// Do not use the build cache.
    #[arg(long)]
    no_cache: bool,
    /// Always try to pull newer base images.
    #[arg(long)]
    pull: bool,
    /// Also build dependencies.
    #[arg(long)]
    with_dependencies: bool,
    #[arg(long)]
    dry_run: bool,
    services: Vec<String>,
}

impl BuildArgs {
    pub fn into_options(self) -> BuildOptions {
        BuildOptions {
            no_cache: self.no_cache,
            pull: self.pull,
            with_dependencies: self.with_dependencies,
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
    fn test_build_args_parsing() {
        let opts = BuildArgs::try_parse_from(["build", "--no-cache", "api"])
            .unwrap()
            .into_options();
        assert!(opts.no_cache);
        assert!(!opts.pull);
        assert_eq!(opts.services, vec!["api"]);
    }
}
