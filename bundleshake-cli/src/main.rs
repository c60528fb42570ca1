//! Command-line interface entry point for `bundleshake`.

mod cli;
mod config;
mod logging;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rustc_hash::FxHashSet;

use bundleshake::ecosystem::ImportAliasMap;
use bundleshake::event::{EventSink, NoopEventHandler};
use bundleshake::fqn::Fqn;
use bundleshake::module_spec::ModuleSpecService;

use cli::{parse_resource_pair, Cli, Commands};
use config::Config;
use progress::ProgressSink;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Bundle {
            module_spec,
            destination,
            resolution,
            vendor_name,
            bundle_metadata,
            resources,
        } => run_bundle(
            module_spec,
            destination,
            resolution.search_paths,
            vendor_name,
            bundle_metadata,
            resources,
            cli.quiet,
        ),
        Commands::Treeshake {
            source_dir,
            resolution,
            preserve,
        } => run_treeshake(source_dir, resolution.search_paths, preserve, cli.quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn sink_for(quiet: bool) -> Box<dyn EventSink> {
    if quiet {
        Box::new(NoopEventHandler)
    } else {
        Box::new(ProgressSink::new())
    }
}

#[allow(clippy::too_many_arguments)]
fn run_bundle(
    module_spec: String,
    destination: PathBuf,
    search_paths: Vec<PathBuf>,
    vendor_name: Option<String>,
    bundle_metadata: bool,
    resources: Vec<(PathBuf, PathBuf)>,
    quiet: bool,
) -> Result<()> {
    let config = Config::load();
    let module_spec = Fqn::new(module_spec);
    let roots = resolve_roots(search_paths, &config);
    let vendor_name = vendor_name
        .or(config.bundleshake.vendor_name)
        .unwrap_or_else(|| "_vendor".to_string());
    let bundle_metadata = bundle_metadata || config.bundleshake.bundle_metadata.unwrap_or(false);

    let mut resources = resources;
    if let Some(configured) = config.bundleshake.resources {
        for pair in configured {
            resources.push(parse_resource_pair(&pair).map_err(anyhow::Error::msg)?);
        }
    }

    let service = ModuleSpecService::new(roots, Fqn::new(module_spec.top_level().to_string()));
    let sink = sink_for(quiet);

    bundleshake::bundle::bundle(
        &service,
        &module_spec,
        &destination,
        &vendor_name,
        bundle_metadata,
        &resources,
        &ImportAliasMap::new(),
        sink.as_ref(),
    )
    .context("bundling failed")
}

fn run_treeshake(source_dir: PathBuf, _search_paths: Vec<PathBuf>, preserve: Vec<String>, quiet: bool) -> Result<()> {
    let config = Config::load();

    let mut preserve_symbols: FxHashSet<Fqn> = preserve.into_iter().map(Fqn::new).collect();
    if let Some(configured) = config.bundleshake.preserve_symbols {
        preserve_symbols.extend(configured.into_iter().map(Fqn::new));
    }

    let import_aliases = bundleshake::ecosystem::default_import_aliases();
    let preserve_symbols = import_aliases.close_preservation_set(preserve_symbols);
    let safe_decorators = bundleshake::ecosystem::default_safe_decorators();
    let sink = sink_for(quiet);

    let removed = bundleshake::treeshake::treeshake(
        &source_dir,
        &import_aliases,
        &preserve_symbols,
        &safe_decorators,
        sink.as_ref(),
    )
    .context("treeshaking failed")?;

    if !quiet {
        println!("removed {removed} dead statement(s)");
    }
    Ok(())
}

fn resolve_roots(search_paths: Vec<PathBuf>, config: &Config) -> Vec<PathBuf> {
    if !search_paths.is_empty() {
        return search_paths;
    }
    if let Some(configured) = &config.bundleshake.search_paths {
        if !configured.is_empty() {
            return configured.clone();
        }
    }
    vec![PathBuf::from(".")]
}
