//! The per-module orchestration loop.
//!
//! For each module: collect and sort headers, try the cache, otherwise
//! parse every header (in parallel by default) and run the analyzer, save
//! the snapshot, and emit the native glue. A failing module is logged and
//! skipped; unrelated modules still build.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use apigen_binder::{Analyzer, BuildContext};
use apigen_cache::{CacheKey, cache_path, load_cache, save_cache};
use apigen_emitter::{emit_binary_module_descriptor, emit_native_module, write_if_changed};
use apigen_model::{ModuleInfo, Node, NodeIndex, NodeKind};
use apigen_parser::{ExternalDefines, ParseOptions, parse_header};
use rayon::prelude::*;
use tracing::{error, info, info_span};
use walkdir::WalkDir;

use crate::config::{BuildManifest, ModuleConfig};

/// Header skipped for the engine-core module: it defines the `API_*`
/// macros themselves.
const API_DEFINES_HEADER: &str = "ScriptingApiDefines.h";

/// Outcome for one module.
#[derive(Clone, Debug)]
pub struct BindingsResult {
    pub module: String,
    /// The emitted native glue file.
    pub native_path: PathBuf,
    /// The managed glue file the external C# emitter produces.
    pub managed_path: PathBuf,
    /// Whether the module exported anything at all.
    pub generated: bool,
    /// Whether the model came from the cache.
    pub from_cache: bool,
}

/// Driver options beyond the manifest.
#[derive(Clone, Debug, Default)]
pub struct DriverOptions {
    /// Only process these modules when non-empty.
    pub module_filter: Vec<String>,
    /// Disable parallel header parsing.
    pub serial: bool,
    /// Skip cache loads (still saves fresh snapshots).
    pub force: bool,
}

/// Run the whole build. Module failures are logged and counted; an error
/// is returned only after every module had its chance.
pub fn run_build(manifest: &BuildManifest, options: &DriverOptions) -> Result<Vec<BindingsResult>> {
    let mut build = BuildContext::new();
    let mut analyzer = Analyzer::new();
    let mut results = Vec::new();
    let mut failures = 0usize;

    for module_config in &manifest.modules {
        if !options.module_filter.is_empty()
            && !options.module_filter.contains(&module_config.name)
        {
            continue;
        }
        let span = info_span!("module", name = %module_config.name);
        let _guard = span.enter();

        match process_module(manifest, module_config, options, &mut build, &mut analyzer) {
            Ok(result) => results.push(result),
            Err(err) => {
                error!("{err:#}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} module(s) failed to generate bindings");
    }
    Ok(results)
}

fn process_module(
    manifest: &BuildManifest,
    config: &ModuleConfig,
    options: &DriverOptions,
    build: &mut BuildContext,
    analyzer: &mut Analyzer,
) -> Result<BindingsResult> {
    let headers = collect_headers(config)?;
    info!("{} header(s)", headers.len());

    let key = CacheKey {
        intermediate_folder: config.intermediate_folder.to_string_lossy().into_owned(),
        platform: manifest.platform as u32,
        architecture: manifest.architecture as u32,
        configuration: manifest.configuration as u32,
        public_defines: config.public_defines.clone(),
        private_defines: config.private_defines.clone(),
        env_defines: manifest.env_defines.clone(),
        generator_ticks: 0,
    }
    .with_current_generator();
    let snapshot = cache_path(&config.intermediate_folder, &config.name);

    let mut from_cache = false;
    let module = if !options.force {
        load_cache(&snapshot, &key, &headers, &mut build.arena)
    } else {
        None
    };
    let module = match module {
        Some(module) => {
            from_cache = true;
            build.add_module(module);
            module
        }
        None => {
            let module = parse_module(config, &manifest.env_defines, &headers, options, build)?;
            analyzer
                .initialize_module(build, module)
                .map_err(|err| anyhow::anyhow!("{err}"))?;
            save_cache(&snapshot, &key, &headers, &build.arena, module)
                .with_context(|| format!("saving cache {}", snapshot.display()))?;
            module
        }
    };

    // Emit the native glue and, when configured, the binary-module
    // descriptor pair.
    let native_path = config
        .intermediate_folder
        .join(format!("{}.Bindings.Gen.cpp", config.name));
    let managed_path = config
        .intermediate_folder
        .join(format!("{}.Bindings.Gen.cs", config.name));
    let generated = module_exports_anything(build, module);
    if generated {
        let glue = emit_native_module(build, module).map_err(|err| anyhow::anyhow!("{err}"))?;
        write_if_changed(&native_path, &glue)
            .with_context(|| format!("writing {}", native_path.display()))?;
    }
    if let Some(binary_module) = &config.binary_module {
        let source_dir = manifest.project_folder.join("Source");
        let (header, source) = emit_binary_module_descriptor(binary_module);
        write_if_changed(&source_dir.join(format!("{binary_module}.Gen.h")), &header)
            .map_err(|err| anyhow::anyhow!("{err}"))?;
        write_if_changed(&source_dir.join(format!("{binary_module}.Gen.cpp")), &source)
            .map_err(|err| anyhow::anyhow!("{err}"))?;
    }

    info!(
        from_cache,
        generated,
        "bindings {}",
        if generated { "emitted" } else { "skipped (no exports)" }
    );
    Ok(BindingsResult {
        module: config.name.clone(),
        native_path,
        managed_path,
        generated,
        from_cache,
    })
}

/// Collect the module's headers, sorted by path for determinism.
fn collect_headers(config: &ModuleConfig) -> Result<Vec<PathBuf>> {
    let mut headers = Vec::new();
    for entry in WalkDir::new(&config.source_folder)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "h") {
            continue;
        }
        if config.core_module
            && path
                .file_name()
                .is_some_and(|name| name == API_DEFINES_HEADER)
        {
            continue;
        }
        headers.push(path.to_path_buf());
    }
    headers.sort();
    if headers.is_empty() {
        bail!(
            "no headers found under {}",
            config.source_folder.display()
        );
    }
    Ok(headers)
}

/// Parse every header into scratch arenas, then graft them into the build
/// arena in path order.
fn parse_module(
    config: &ModuleConfig,
    env_defines: &[String],
    headers: &[PathBuf],
    options: &DriverOptions,
    build: &mut BuildContext,
) -> Result<NodeIndex> {
    let parse_options = ParseOptions {
        namespace: config.namespace.clone(),
        external_defines: ExternalDefines::from_lists(
            &config.public_defines,
            &config.private_defines,
            env_defines,
        ),
        unknown_tag_hook: None,
    };

    let parse_one = |path: &PathBuf| -> Result<(apigen_model::ApiArena, NodeIndex)> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        parse_header(&source, &path.to_string_lossy(), &parse_options)
            .map_err(|err| anyhow::anyhow!("{err}"))
    };

    // Workers parse into scratch arenas; grafting happens afterwards, in
    // the already-sorted header order, so output is deterministic.
    let parsed: Vec<(apigen_model::ApiArena, NodeIndex)> = if options.serial {
        headers.iter().map(parse_one).collect::<Result<_>>()?
    } else {
        headers
            .par_iter()
            .map(parse_one)
            .collect::<Result<Vec<_>>>()?
    };

    let module = build.arena.alloc(Node::new(
        config.name.clone(),
        NodeKind::Module(ModuleInfo {
            path: config.source_folder.to_string_lossy().into_owned(),
            build_flags: config.build_flags.clone(),
        }),
    ));
    build.add_module(module);
    for (scratch, file) in &parsed {
        build.arena.graft(scratch, *file, module);
    }
    Ok(module)
}

/// Whether the module declares any exported types.
fn module_exports_anything(build: &BuildContext, module: NodeIndex) -> bool {
    build
        .arena
        .get(module)
        .children
        .iter()
        .any(|&file| !build.arena.get(file).children.is_empty())
}

/// Install the tracing subscriber; `APIGEN_LOG` controls the filter.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("APIGEN_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod driver_tests;
