//! Reference counter (C6): whole-program fixpoint over every collected,
//! already-rewritten module, producing the `FQN -> count` `ReferenceIndex`
//! spec §3 defines and §4.6 specifies the iteration rule for.
//!
//! Grounded in `flay.treeshake.package`'s whole-program pass (seed
//! `__main__`/preservation set, then iterate until no statement newly
//! becomes alive) and spec §4.6/§5 directly: counts live in an explicit
//! `FxHashMap`, never a shared mutable visitor field, matching SPEC_FULL
//! §9's "model the index as an explicit value" resolution of the
//! fixpoint-vs-visitor re-architecture note.

use std::collections::hash_map::Entry;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ecosystem::ImportAliasMap;
use crate::event::{Event, EventSink};
use crate::fqn::Fqn;
use crate::resolver::{ModuleNames, StmtKind};

/// `FQN -> reference count` (spec §3). Absent or zero means unreferenced.
pub type ReferenceIndex = FxHashMap<Fqn, usize>;

/// Computes a [`ReferenceIndex`] over a whole program.
pub struct ReferenceCounter<'a> {
    safe_decorators: &'a FxHashSet<Fqn>,
}

impl<'a> ReferenceCounter<'a> {
    /// Build a counter that treats `safe_decorators` as not forcing
    /// preservation of the definition they decorate.
    #[must_use]
    pub fn new(safe_decorators: &'a FxHashSet<Fqn>) -> Self {
        Self { safe_decorators }
    }

    /// Run the fixpoint (spec §4.6) over `modules`, seeded from every
    /// `__main__` module, `preserve_symbols`, and `import_aliases`' closure.
    #[must_use]
    pub fn count(
        &self,
        modules: &[(PathBuf, ModuleNames)],
        preserve_symbols: &FxHashSet<Fqn>,
        import_aliases: &ImportAliasMap,
        sink: &dyn EventSink,
    ) -> ReferenceIndex {
        let order = sorted_order(modules);
        let mut index: ReferenceIndex = FxHashMap::default();

        // Preservation set, closed under alias equivalence, seeded before
        // the fixpoint begins (spec §4.6 seeding rule 2/3).
        let closed = import_aliases.close_preservation_set(preserve_symbols.clone());
        for fqn in &closed {
            bump(&mut index, fqn);
        }

        // Per-(module index, stmt index) latch: a statement's references
        // are folded into the index exactly once, at the pass where it
        // first becomes alive - re-visiting an already-alive statement on
        // a later pass is a no-op, keeping this a monotone fixpoint rather
        // than an uncapped re-accumulation.
        let mut bumped: Vec<Vec<bool>> = modules.iter().map(|(_, m)| vec![false; m.top_level.len()]).collect();

        let mut iteration = 0usize;
        loop {
            iteration += 1;
            sink.on_event(Event::ReferencesIteration { iteration });
            let mut changed = false;

            for &module_index in &order {
                let (path, names) = &modules[module_index];
                let is_entry_point = names.module_fqn.leaf() == "__main__";
                let _ = path;

                for (stmt_index, stmt) in names.top_level.iter().enumerate() {
                    if bumped[module_index][stmt_index] {
                        continue;
                    }

                    let alive = is_entry_point || self.is_alive(&stmt.kind, &index);
                    if !alive {
                        continue;
                    }

                    bumped[module_index][stmt_index] = true;
                    changed = true;

                    for fqn in &stmt.references {
                        bump(&mut index, fqn);
                    }
                    for fqn in own_fqns(&stmt.kind) {
                        bump(&mut index, fqn);
                    }
                }
            }

            if !changed {
                break;
            }
        }

        warn_unused_preserve_symbols(preserve_symbols, modules, sink);

        index
    }

    fn is_alive(&self, kind: &StmtKind, index: &ReferenceIndex) -> bool {
        match kind {
            StmtKind::Definition { fqn, decorator_fqns } => {
                is_referenced(index, fqn)
                    || decorator_fqns
                        .iter()
                        .any(|d| !self.safe_decorators.contains(d))
            }
            StmtKind::Assignment { fqns } => fqns.iter().any(|f| is_referenced(index, f)),
            StmtKind::CallExpr | StmtKind::MainBlock | StmtKind::Other => true,
            StmtKind::Import { .. } | StmtKind::ImportFrom { .. } => false,
        }
    }
}

fn is_referenced(index: &ReferenceIndex, fqn: &Fqn) -> bool {
    index.get(fqn).is_some_and(|&count| count > 0)
}

fn bump(index: &mut ReferenceIndex, fqn: &Fqn) {
    match index.entry(fqn.clone()) {
        Entry::Occupied(mut e) => *e.get_mut() += 1,
        Entry::Vacant(e) => {
            e.insert(1);
        }
    }
}

/// The FQN(s) a statement itself defines, re-bumped alongside its body
/// references when it becomes alive. Without this, a definition kept alive
/// only by a non-allowlisted decorator (never itself referenced elsewhere)
/// would have its own FQN stay at count 0 and get deleted by C7 anyway -
/// self-bumping keeps "alive" and "count >= 1" the same fact.
fn own_fqns(kind: &StmtKind) -> Vec<&Fqn> {
    match kind {
        StmtKind::Definition { fqn, .. } => vec![fqn],
        StmtKind::Assignment { fqns } => fqns.iter().collect(),
        _ => Vec::new(),
    }
}

/// Spec §5: "modules are visited in a fixed order (sorted by path,
/// `__init__` files last)". Returns an index permutation rather than
/// sorting `modules` in place, since C7 later needs the original indices to
/// report progress per-module.
fn sorted_order(modules: &[(PathBuf, ModuleNames)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..modules.len()).collect();
    order.sort_by(|&a, &b| sort_key(&modules[a].0).cmp(&sort_key(&modules[b].0)));
    order
}

fn sort_key(path: &Path) -> (PathBuf, u8, String) {
    let dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
    let is_init = path.file_stem() == Some(OsStr::new("__init__"));
    let name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    (dir, u8::from(is_init), name)
}

fn warn_unused_preserve_symbols(
    preserve_symbols: &FxHashSet<Fqn>,
    modules: &[(PathBuf, ModuleNames)],
    sink: &dyn EventSink,
) {
    let mut defined: FxHashSet<Fqn> = FxHashSet::default();
    for (_, names) in modules {
        for stmt in &names.top_level {
            match &stmt.kind {
                StmtKind::Definition { fqn, .. } => {
                    defined.insert(fqn.clone());
                }
                StmtKind::Assignment { fqns } => {
                    defined.extend(fqns.iter().cloned());
                }
                StmtKind::Import { aliases } | StmtKind::ImportFrom { aliases, .. } => {
                    defined.extend(aliases.iter().map(|a| a.binding_fqn.clone()));
                }
                _ => {}
            }
        }
    }

    for symbol in preserve_symbols {
        if !defined.contains(symbol) {
            sink.on_event(Event::Warning {
                message: format!("preservation symbol `{symbol}` was never observed in the corpus"),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NoopEventHandler;

    fn names_for(source: &str, module_fqn: &str) -> ModuleNames {
        // Every fixture in this module is a package `__init__.py` except
        // where noted below.
        names_for_kind(source, module_fqn, true)
    }

    fn names_for_kind(source: &str, module_fqn: &str, is_package_init: bool) -> ModuleNames {
        let parsed = ruff_python_parser::parse_module(source).expect("parses");
        let module = parsed.into_syntax();
        crate::resolver::NameResolver::resolve(&Fqn::new(module_fqn), is_package_init, &module)
    }

    #[test]
    fn unreferenced_definition_stays_at_zero() {
        let modules = vec![(
            PathBuf::from("pkg/__init__.py"),
            names_for("def dead():\n    pass\n", "pkg"),
        )];
        let safe = FxHashSet::default();
        let counter = ReferenceCounter::new(&safe);
        let index = counter.count(&modules, &FxHashSet::default(), &ImportAliasMap::new(), &NoopEventHandler);
        assert!(!is_referenced(&index, &Fqn::new("pkg.dead")));
    }

    #[test]
    fn main_block_keeps_callee_alive() {
        let modules = vec![(
            PathBuf::from("pkg/__init__.py"),
            names_for(
                "def used():\n    pass\n\nif __name__ == \"__main__\":\n    used()\n",
                "pkg",
            ),
        )];
        let safe = FxHashSet::default();
        let counter = ReferenceCounter::new(&safe);
        let index = counter.count(&modules, &FxHashSet::default(), &ImportAliasMap::new(), &NoopEventHandler);
        assert!(is_referenced(&index, &Fqn::new("pkg.used")));
    }

    #[test]
    fn main_module_executes_unconditionally() {
        let modules = vec![(
            PathBuf::from("pkg/__main__.py"),
            names_for_kind("def used():\n    pass\n\nused()\n", "pkg.__main__", false),
        )];
        let safe = FxHashSet::default();
        let counter = ReferenceCounter::new(&safe);
        let index = counter.count(&modules, &FxHashSet::default(), &ImportAliasMap::new(), &NoopEventHandler);
        assert!(is_referenced(&index, &Fqn::new("pkg.__main__.used")));
    }

    #[test]
    fn unsafe_decorator_forces_preservation_even_unreferenced() {
        let modules = vec![(
            PathBuf::from("pkg/__init__.py"),
            names_for("@unknown_decorator\ndef f():\n    pass\n", "pkg"),
        )];
        let safe = FxHashSet::default();
        let counter = ReferenceCounter::new(&safe);
        let index = counter.count(&modules, &FxHashSet::default(), &ImportAliasMap::new(), &NoopEventHandler);
        assert!(is_referenced(&index, &Fqn::new("pkg.f")));
    }

    #[test]
    fn safe_decorator_allows_removal_when_unreferenced() {
        let modules = vec![(
            PathBuf::from("pkg/__init__.py"),
            names_for("class C:\n    @staticmethod\n    def f():\n        pass\n", "pkg"),
        )];
        let mut safe = FxHashSet::default();
        safe.insert(Fqn::new("builtins.staticmethod"));
        let counter = ReferenceCounter::new(&safe);
        let index = counter.count(&modules, &FxHashSet::default(), &ImportAliasMap::new(), &NoopEventHandler);
        // `C` itself is unreferenced, so nothing forces the nested `f` alive.
        assert!(!is_referenced(&index, &Fqn::new("pkg.C.f")));
    }

    #[test]
    fn cross_module_reference_propagates() {
        let modules = vec![
            (
                PathBuf::from("pkg/__init__.py"),
                names_for("from .helper import compute\n\nif __name__ == \"__main__\":\n    compute()\n", "pkg"),
            ),
            (
                PathBuf::from("pkg/helper.py"),
                names_for_kind("def compute():\n    pass\n", "pkg.helper", false),
            ),
        ];
        let safe = FxHashSet::default();
        let counter = ReferenceCounter::new(&safe);
        let index = counter.count(&modules, &FxHashSet::default(), &ImportAliasMap::new(), &NoopEventHandler);
        assert!(is_referenced(&index, &Fqn::new("pkg.compute")));
        assert!(is_referenced(&index, &Fqn::new("pkg.helper.compute")));
    }

    #[test]
    fn preservation_set_seeds_count() {
        let modules = vec![(
            PathBuf::from("pkg/__init__.py"),
            names_for("def kept():\n    pass\n", "pkg"),
        )];
        let safe = FxHashSet::default();
        let mut preserve = FxHashSet::default();
        preserve.insert(Fqn::new("pkg.kept"));
        let counter = ReferenceCounter::new(&safe);
        let index = counter.count(&modules, &preserve, &ImportAliasMap::new(), &NoopEventHandler);
        assert!(is_referenced(&index, &Fqn::new("pkg.kept")));
    }
}
