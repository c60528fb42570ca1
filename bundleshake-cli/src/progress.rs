//! An [`EventSink`] that drives an indicatif progress bar from the core's
//! own progress events, instead of the caller polling file counts itself.
//!
//! Modeled directly on `cytoscnpy::output::create_spinner`/
//! `create_progress_bar`: a hidden spinner first (module count is unknown
//! until [`Event::TotalModules`] arrives), upgraded in place to a sized bar
//! once it does, ticking on every [`Event::ProcessModule`] and surfacing
//! [`Event::Warning`]s via `colored` rather than interrupting the bar.

use std::cell::RefCell;
use std::time::Duration;

use bundleshake::event::{Event, EventSink};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Renders `bundle()`/`treeshake()` progress to stderr.
///
/// In test mode (and whenever stderr is not a terminal) the bar is hidden so
/// output stays silent; everything else about the event handling still
/// runs, so callers can rely on [`ProgressSink`] for its side effects
/// (warning printouts) even when nothing is drawn.
pub struct ProgressSink {
    bar: ProgressBar,
    total_known: RefCell<bool>,
}

impl ProgressSink {
    #[must_use]
    pub fn new() -> Self {
        let bar = if cfg!(test) || !atty_stderr() {
            ProgressBar::hidden()
        } else {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.set_message("discovering modules…");
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        };
        Self {
            bar,
            total_known: RefCell::new(false),
        }
    }

    fn upgrade_to_bar(&self, total: u64) {
        if cfg!(test) || !atty_stderr() {
            return;
        }
        self.bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(20));
        self.bar.set_length(total);
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} modules ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        self.bar.tick();
    }
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ProgressSink {
    fn on_event(&self, event: Event) {
        match event {
            Event::TotalModules { count } => {
                *self.total_known.borrow_mut() = true;
                self.upgrade_to_bar(count as u64);
            }
            Event::FoundModule { spec } => {
                if !*self.total_known.borrow() {
                    self.bar.set_message(format!("found {spec}"));
                }
            }
            Event::ProcessModule { spec } => {
                self.bar.set_message(format!("processing {spec}"));
                if *self.total_known.borrow() {
                    self.bar.inc(1);
                }
            }
            Event::ReferencesIteration { iteration } => {
                self.bar
                    .set_message(format!("resolving references (pass {iteration})"));
            }
            Event::NodesRemoval { spec, removed } => {
                self.bar
                    .set_message(format!("{spec}: removed {removed} dead statement(s)"));
            }
            Event::BundledMetadata => {
                self.bar.set_message("copied package metadata");
            }
            Event::Warning { message } => {
                self.bar.println(format!("{} {}", "warning:".yellow().bold(), message));
            }
        }
    }
}

impl Drop for ProgressSink {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

fn atty_stderr() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_in_test_mode_accepts_every_event_without_panicking() {
        let sink = ProgressSink::new();
        sink.on_event(Event::TotalModules { count: 3 });
        sink.on_event(Event::FoundModule {
            spec: bundleshake::fqn::Fqn::new("pkg.mod"),
        });
        sink.on_event(Event::ProcessModule {
            spec: bundleshake::fqn::Fqn::new("pkg.mod"),
        });
        sink.on_event(Event::ReferencesIteration { iteration: 1 });
        sink.on_event(Event::NodesRemoval {
            spec: bundleshake::fqn::Fqn::new("pkg.mod"),
            removed: 2,
        });
        sink.on_event(Event::BundledMetadata);
        sink.on_event(Event::Warning {
            message: "no .libs directory".to_string(),
        });
    }
}
