//! `log`/`env_logger` setup. The core only ever emits progress through
//! [`bundleshake::event::EventSink`]; this module wires up the separate
//! `log` facade the core's components call into directly (parse warnings,
//! resolver fallbacks) so they reach the terminal alongside event-sink
//! output, mirroring `cytoscnpy-cli`'s own split between structured findings
//! output and ambient `log` diagnostics.

use env_logger::Builder;
use log::LevelFilter;

/// Initialize the global logger. `verbose` enables debug-level output;
/// otherwise only warnings and errors are printed.
pub fn init(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    Builder::new().filter_level(level).format_timestamp(None).init();
}
