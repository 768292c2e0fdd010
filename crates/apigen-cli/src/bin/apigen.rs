use anyhow::Result;
use clap::Parser;
use tracing::info;

use apigen_cli::args::CliArgs;
use apigen_cli::config::BuildManifest;
use apigen_cli::driver::{DriverOptions, init_tracing, run_build};

fn main() -> Result<()> {
    init_tracing();
    let args = CliArgs::parse();

    let mut manifest = BuildManifest::load(&args.project)?;
    if let Some(platform) = args.platform {
        manifest.platform = platform;
    }
    if let Some(arch) = args.arch {
        manifest.architecture = arch;
    }
    if let Some(configuration) = args.configuration {
        manifest.configuration = configuration;
    }

    let options = DriverOptions {
        module_filter: args.modules,
        serial: args.serial,
        force: args.force,
    };
    let results = run_build(&manifest, &options)?;

    let generated = results.iter().filter(|r| r.generated).count();
    let cached = results.iter().filter(|r| r.from_cache).count();
    info!(
        "{} module(s) processed, {generated} with bindings, {cached} from cache",
        results.len()
    );
    Ok(())
}
