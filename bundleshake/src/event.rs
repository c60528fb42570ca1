//! Event sink contract: the narrow interface through which the core reports
//! progress to an external collaborator (a progress bar, a log line, a test
//! assertion) without depending on how that collaborator renders anything.
//!
//! Grounded in `flay.common.events` (`Event`, `EventHandler`,
//! `NoopEventHandler`) and the callback set `bundle_package`/
//! `treeshake_package` accept in `flay.cli.bundle`/`flay.cli.treeshake`
//! (`found_module_callback`, `found_total_modules_callback`,
//! `process_module_callback`, `bundled_metadata_callback`).

use crate::fqn::Fqn;

/// A single typed event emitted during `bundle()` or `treeshake()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// C4 discovered a new module spec while walking the import closure.
    FoundModule {
        /// The spec that was discovered.
        spec: Fqn,
    },
    /// C4 finished discovery; `count` is the final size of the worklist.
    TotalModules {
        /// Total modules that will be processed.
        count: usize,
    },
    /// C5 is about to rewrite (or C7 is about to prune) the named module.
    ProcessModule {
        /// The module being processed.
        spec: Fqn,
    },
    /// C6 completed one fixpoint pass; `iteration` is 1-based.
    ReferencesIteration {
        /// Iteration number, starting at 1.
        iteration: usize,
    },
    /// C7 removed one or more nodes from the named module.
    NodesRemoval {
        /// The module that was pruned.
        spec: Fqn,
        /// Number of top-level statements removed from it.
        removed: usize,
    },
    /// `bundle()` finished copying dist-info/`.libs` resource collaborators.
    BundledMetadata,
    /// A non-fatal condition the caller should surface (see spec §7).
    Warning {
        /// Human-readable warning message.
        message: String,
    },
}

/// Receives a synchronous stream of [`Event`]s.
///
/// Handlers must not mutate core state; they are called from within
/// `bundle()`/`treeshake()` while the core holds its own data structures.
pub trait EventSink {
    /// Handle one event.
    fn on_event(&self, event: Event);
}

/// An `EventSink` that discards every event. The core must work correctly
/// with this sink; no progress reporting is load-bearing for correctness.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventHandler;

impl EventSink for NoopEventHandler {
    fn on_event(&self, _event: Event) {}
}

impl<F: Fn(Event)> EventSink for F {
    fn on_event(&self, event: Event) {
        self(event);
    }
}
