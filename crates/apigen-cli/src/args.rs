//! CLI arguments for the `apigen` binary.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{Architecture, Configuration, Platform};

/// Scripting-bindings generator for native game-engine modules.
#[derive(Parser, Debug)]
#[command(name = "apigen", version, about)]
pub struct CliArgs {
    /// Path to the JSON build manifest.
    #[arg(short = 'p', long = "project")]
    pub project: PathBuf,

    /// Only process the named module(s); defaults to every module in the
    /// manifest.
    #[arg(short = 'm', long = "module")]
    pub modules: Vec<String>,

    /// Override the manifest's target platform.
    #[arg(long, value_enum, ignore_case = true)]
    pub platform: Option<Platform>,

    /// Override the manifest's target architecture.
    #[arg(long, value_enum, ignore_case = true)]
    pub arch: Option<Architecture>,

    /// Override the manifest's build configuration.
    #[arg(short = 'c', long, value_enum, ignore_case = true)]
    pub configuration: Option<Configuration>,

    /// Parse headers sequentially instead of with the worker pool.
    #[arg(long)]
    pub serial: bool,

    /// Ignore cached module snapshots and reparse everything.
    #[arg(short = 'f', long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_invocation_parses() {
        let args = CliArgs::parse_from(["apigen", "-p", "build.json"]);
        assert_eq!(args.project, PathBuf::from("build.json"));
        assert!(args.modules.is_empty());
        assert!(!args.serial);
        assert!(!args.force);
    }

    #[test]
    fn module_filter_repeats() {
        let args = CliArgs::parse_from([
            "apigen", "-p", "build.json", "-m", "Core", "-m", "Graphics", "--serial",
        ]);
        assert_eq!(args.modules, vec!["Core", "Graphics"]);
        assert!(args.serial);
    }

    #[test]
    fn value_enums_ignore_case() {
        let args = CliArgs::parse_from([
            "apigen", "-p", "b.json", "--platform", "linux", "-c", "release",
        ]);
        assert_eq!(args.platform, Some(Platform::Linux));
        assert_eq!(args.configuration, Some(Configuration::Release));
    }
}
