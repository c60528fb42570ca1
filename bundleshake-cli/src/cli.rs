use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Help text for configuration file options, shown at the bottom of --help.
const CONFIG_HELP: &str = "\
CONFIGURATION FILE (.bundleshake.toml):
  Create this file in your project root to set defaults.

  [bundleshake]
  # Resolution roots searched, in order, for every module spec.
  search_paths = [\"src\"]

  # Identifier the bundled package's third-party dependencies are vendored
  # under, e.g. `app.requests` becomes `app._vendor.requests`.
  vendor_name = \"_vendor\"

  # Whether to copy *.dist-info/*.egg-info directories alongside vendored
  # packages.
  bundle_metadata = true

  # Fully-qualified names exempted from removal during treeshaking even if
  # nothing in the program references them (public API surface kept alive).
  preserve_symbols = [\"app.cli.main\"]

  # \"source:destination\" directory pairs copied verbatim once bundling
  # succeeds, merged with any --resource flags given on the command line.
  resources = [\"vendor/app.dist-info:app/.dist-info\"]
";

/// Options shared by `bundle` and `treeshake`: where modules resolve from.
#[derive(Args, Debug, Default, Clone)]
pub struct ResolutionOptions {
    /// Additional directories to search for modules, in order, before the
    /// package's own parent directory.
    #[arg(long = "search-path")]
    pub search_paths: Vec<PathBuf>,
}

/// Command line interface using `clap`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, after_help = CONFIG_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress progress output; only warnings and errors are printed.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Produce a self-contained, vendored copy of a package.
    Bundle {
        /// Dotted module spec of the package to bundle, e.g. `app`.
        module_spec: String,

        /// Directory the vendored tree is written into.
        destination: PathBuf,

        /// Resolution options shared with `treeshake`.
        #[command(flatten)]
        resolution: ResolutionOptions,

        /// Identifier third-party dependencies are vendored under.
        #[arg(long)]
        vendor_name: Option<String>,

        /// Copy `*.dist-info`/`*.egg-info` metadata alongside vendored
        /// third-party packages.
        #[arg(long)]
        bundle_metadata: bool,

        /// `source:destination` directory pairs copied verbatim once
        /// bundling succeeds (e.g. a resolved `*.dist-info` directory).
        /// May be given multiple times.
        #[arg(long = "resource", value_parser = parse_resource_pair)]
        resources: Vec<(PathBuf, PathBuf)>,
    },
    /// Remove unreferenced definitions, imports and assignments in place.
    Treeshake {
        /// Directory containing the source tree to treeshake in place.
        source_dir: PathBuf,

        /// Resolution options shared with `bundle`.
        #[command(flatten)]
        resolution: ResolutionOptions,

        /// Fully-qualified names to keep alive even if nothing in the
        /// program references them. May be given multiple times.
        #[arg(long)]
        preserve: Vec<String>,
    },
}

/// Parse a `source:destination` pair (from `--resource` or a
/// `.bundleshake.toml` `resources` entry) into its two paths.
///
/// # Errors
/// Returns a message if `value` does not contain exactly one `:` separator.
pub fn parse_resource_pair(value: &str) -> Result<(PathBuf, PathBuf), String> {
    let (source, destination) = value
        .split_once(':')
        .ok_or_else(|| format!("expected SOURCE:DESTINATION, got '{value}'"))?;
    Ok((PathBuf::from(source), PathBuf::from(destination)))
}
