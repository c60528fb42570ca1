//! Core library for `bundleshake`, a bundler/treeshaker for dynamically
//! typed, module-based source trees modeled on Python's import system.
//!
//! `bundle()` produces a self-contained, vendored copy of a package; `treeshake()`
//! removes whatever that package never actually references. Everything that
//! needs a terminal, a config file parser or a progress bar lives in the
//! separate `bundleshake-cli` binary crate - this crate is the pipeline the
//! two public entry points below orchestrate.

#![allow(clippy::too_many_arguments, clippy::similar_names)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Crate-wide error type and `Result` alias.
pub mod error;

/// `EventSink`/`Event`: the narrow progress-reporting contract `bundle()`
/// and `treeshake()` report through.
pub mod event;

/// The `Fqn`/`ModuleSpec` newtypes shared by every component below.
pub mod fqn;

/// C1: adapts `ruff_python_parser` output into [`parsing::ParsedModule`].
pub mod parsing;

/// Shared byte-range edit application, used by C5 and C7 alike.
pub mod fix;

/// C3: classifies and resolves dotted module specs against search roots.
pub mod module_spec;

/// C2: resolves every name in a module to a fully qualified binding.
pub mod resolver;

/// C4: walks a package's import closure, collecting and parsing every
/// reachable first-party and third-party module.
pub mod collector;

/// C5: rewrites imports (and their usages) to vendor third-party
/// dependencies under a package-local namespace.
pub mod rewrite;

/// C6: the whole-program, monotone fixpoint reference counter.
pub mod refcount;

/// C7: turns a reference index into the edits that delete dead syntax.
pub mod node_remover;

/// Swappable ecosystem defaults (safe decorators, preserved symbols, import
/// aliases) consumed by C6/C7.
pub mod ecosystem;

/// Static standard-library module membership, queried instead of a live
/// interpreter.
pub mod stdlib;

/// Resource collaborators copied alongside a bundled tree (package
/// metadata, native-extension `.libs` directories).
pub mod resources;

/// The `bundle()` public entry point.
pub mod bundle;

/// The `treeshake()` public entry point.
pub mod treeshake;

pub use bundle::bundle;
pub use error::{BundleshakeError, Result};
pub use event::{Event, EventSink, NoopEventHandler};
pub use fqn::{Fqn, ModuleSpec};
pub use treeshake::treeshake;
