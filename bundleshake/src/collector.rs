//! File collector (C4): from a seed module spec, transitively discover
//! every module reachable via `import`/`from` statements and produce the
//! `(module_fqn, path) -> source` map spec §3 calls `CollectedFiles`.
//!
//! Grounded in `flay.bundle.package.bundle_package`'s own collection step
//! (`find_all_files_in_module_spec` plus the native `FileCollector`'s
//! `_process_module` worklist) and spec §4.4's algorithm directly. Parsing
//! of newly-discovered files is parallelized with `rayon`
//! (SPEC_FULL §5: "File *parsing* during C4 discovery may be parallelized
//! … following the teacher's `analyze_file_list` per-file `par_iter()`
//! pattern"); the worklist walk itself stays single-threaded so discovery
//! order is deterministic.

use std::collections::VecDeque;
use std::path::PathBuf;

use rayon::prelude::*;
use ruff_python_ast::{self as ast, Stmt};
use rustc_hash::FxHashSet;

use crate::error::Result;
use crate::event::{Event, EventSink};
use crate::fqn::{Fqn, ModuleSpec};
use crate::module_spec::{ModuleKind, ModuleSpecService, Origin, ResolvedModule};
use crate::parsing::ParsedModule;

/// One collected module: its resolved location plus (unless it is a
/// synthetic ancestor `__init__` or a native extension) its parsed tree.
pub struct CollectedModule {
    /// Fully qualified module name.
    pub fqn: Fqn,
    /// Absolute path on disk. Synthetic ancestor `__init__`s get a path
    /// computed from their fqn under the first real descendant's directory
    /// even though no file exists there yet.
    pub path: PathBuf,
    /// What kind of module this is.
    pub kind: ModuleKind,
    /// First-party/stdlib/third-party classification.
    pub origin: Origin,
    /// Parsed tree; absent for native extensions and synthetic ancestors.
    pub parsed: Option<ParsedModule>,
    /// True if this entry was synthesized to satisfy the §3 ancestor
    /// `__init__` invariant rather than resolved from disk.
    pub synthetic: bool,
}

/// Transitively discovers every module reachable from `entry` by walking
/// import statements, using `service` to resolve dotted specs to files.
pub struct FileCollector<'a> {
    service: &'a ModuleSpecService,
}

impl<'a> FileCollector<'a> {
    /// Build a collector over the given module spec service.
    #[must_use]
    pub fn new(service: &'a ModuleSpecService) -> Self {
        Self { service }
    }

    /// Run the collection algorithm (spec §4.4) starting from `entry`,
    /// reporting progress through `sink`.
    ///
    /// # Errors
    /// Propagates the first resolve/parse failure (spec §7: "if any file
    /// fails to parse, the entire run aborts before any destination
    /// mutation").
    pub fn collect(&self, entry: &Fqn, sink: &dyn EventSink) -> Result<Vec<CollectedModule>> {
        let mut seen: FxHashSet<Fqn> = FxHashSet::default();
        let mut worklist: VecDeque<Fqn> = VecDeque::new();
        let mut collected: Vec<CollectedModule> = Vec::new();

        worklist.push_back(entry.clone());
        // Seed the rest of the entry package's own files (spec §4.4 step 1).
        if let Ok(files) = self.service.iter_package_files(entry) {
            for path in files {
                if let Some(spec) = module_spec_for_sibling(entry, &path) {
                    worklist.push_back(spec);
                }
            }
        }

        while !worklist.is_empty() {
            // Drain one BFS generation, resolve each (cheap, I/O only), then
            // parse the batch in parallel - the only point in C4 where
            // rayon is used, per SPEC_FULL §5.
            let mut generation = Vec::new();
            while let Some(spec) = worklist.pop_front() {
                if seen.contains(&spec) {
                    continue;
                }
                seen.insert(spec.clone());
                generation.push(spec);
            }
            if generation.is_empty() {
                break;
            }

            let resolved: Vec<Result<ResolvedModule>> = generation
                .par_iter()
                .map(|spec| self.service.find(spec))
                .collect();

            for (spec, resolved) in generation.into_iter().zip(resolved) {
                let resolved = resolved?;
                sink.on_event(Event::FoundModule { spec: spec.clone() });

                if let Some(parsed) = &resolved.tree {
                    let relative_base = if resolved.kind == ModuleKind::PackageInit {
                        spec.join("__init__")
                    } else {
                        spec.clone()
                    };
                    for dependency in imported_specs(&relative_base, &parsed.ast) {
                        if self.service.classify(&dependency) == Origin::Stdlib {
                            // spec §4.4: stdlib imports are not enqueued.
                            continue;
                        }
                        if !seen.contains(&dependency) {
                            worklist.push_back(dependency);
                        }
                    }
                }

                collected.push(CollectedModule {
                    fqn: resolved.fqn,
                    path: resolved.path,
                    kind: resolved.kind,
                    origin: resolved.origin,
                    parsed: resolved.tree,
                    synthetic: false,
                });
            }
        }

        inject_synthetic_ancestors(&mut collected, self.service);

        sink.on_event(Event::TotalModules {
            count: collected.len(),
        });

        Ok(collected)
    }
}

/// Every module spec an `import`/`from … import …` statement in `module`
/// requires to exist, applying relative import resolution (spec §4.2)
/// against `relative_base` (the importing module's own fqn, or a synthetic
/// `fqn.__init__` when the importing module is itself a package's
/// `__init__.py` - see [`crate::resolver::NameResolver::resolve`]).
fn imported_specs(relative_base: &Fqn, module: &ast::ModModule) -> Vec<Fqn> {
    let mut out = Vec::new();
    for stmt in &module.body {
        collect_imports_in_stmt(relative_base, stmt, &mut out);
    }
    out
}

fn collect_imports_in_stmt(module_fqn: &Fqn, stmt: &Stmt, out: &mut Vec<Fqn>) {
    match stmt {
        Stmt::Import(import) => {
            for alias in &import.names {
                out.push(Fqn::new(alias.name.as_str()));
            }
        }
        Stmt::ImportFrom(import) => {
            let dotted = import.module.as_ref().map_or("", ast::Identifier::as_str);
            let target = if import.level == 0 {
                if dotted.is_empty() {
                    None
                } else {
                    Some(Fqn::new(dotted))
                }
            } else {
                let spec = ModuleSpec::relative(dotted, import.level);
                Some(spec.resolve_relative(module_fqn))
            };
            if let Some(target) = target {
                out.push(target);
            }
        }
        // Recurse into compound statements: an import nested in a function
        // body or `if` block still needs its target collected (file
        // collection is conservative - it does not know if the branch
        // executes).
        Stmt::FunctionDef(def) => {
            for inner in &def.body {
                collect_imports_in_stmt(module_fqn, inner, out);
            }
        }
        Stmt::ClassDef(def) => {
            for inner in &def.body {
                collect_imports_in_stmt(module_fqn, inner, out);
            }
        }
        Stmt::If(if_stmt) => {
            for inner in &if_stmt.body {
                collect_imports_in_stmt(module_fqn, inner, out);
            }
            for clause in &if_stmt.elif_else_clauses {
                for inner in &clause.body {
                    collect_imports_in_stmt(module_fqn, inner, out);
                }
            }
        }
        Stmt::Try(try_stmt) => {
            for inner in &try_stmt.body {
                collect_imports_in_stmt(module_fqn, inner, out);
            }
            for handler in &try_stmt.handlers {
                let ast::ExceptHandler::ExceptHandler(handler) = handler;
                for inner in &handler.body {
                    collect_imports_in_stmt(module_fqn, inner, out);
                }
            }
            for inner in &try_stmt.orelse {
                collect_imports_in_stmt(module_fqn, inner, out);
            }
            for inner in &try_stmt.finalbody {
                collect_imports_in_stmt(module_fqn, inner, out);
            }
        }
        Stmt::With(with_stmt) => {
            for inner in &with_stmt.body {
                collect_imports_in_stmt(module_fqn, inner, out);
            }
        }
        Stmt::For(for_stmt) => {
            for inner in &for_stmt.body {
                collect_imports_in_stmt(module_fqn, inner, out);
            }
        }
        Stmt::While(while_stmt) => {
            for inner in &while_stmt.body {
                collect_imports_in_stmt(module_fqn, inner, out);
            }
        }
        _ => {}
    }
}

/// For a file found directly inside `package`'s directory, the module spec
/// it denotes (`package.leaf`, or `package` itself for `__init__`).
fn module_spec_for_sibling(package: &Fqn, path: &std::path::Path) -> Option<Fqn> {
    let stem = path.file_stem()?.to_str()?;
    if stem == "__init__" {
        return None; // already the seeded entry itself
    }
    Some(package.join(stem))
}

/// Spec §3 `CollectedFiles` invariant: for every non-`__init__` file whose
/// parent directory contains an `__init__`, the parent `__init__` is also
/// in the map. Inserts a synthetic empty entry for any ancestor package
/// that was never resolved (e.g. a namespace package with no `__init__.py`
/// on disk, or simply not independently imported).
fn inject_synthetic_ancestors(collected: &mut Vec<CollectedModule>, service: &ModuleSpecService) {
    let mut present: FxHashSet<Fqn> = collected.iter().map(|m| m.fqn.clone()).collect();
    let mut to_add = Vec::new();

    for module in collected.iter() {
        let mut ancestor = module.fqn.parent();
        while let Some(pkg) = ancestor {
            if present.contains(&pkg) {
                break;
            }
            present.insert(pkg.clone());
            match service.find(&pkg) {
                Ok(resolved) if resolved.kind == ModuleKind::PackageInit => {
                    to_add.push(CollectedModule {
                        fqn: resolved.fqn,
                        path: resolved.path,
                        kind: resolved.kind,
                        origin: resolved.origin,
                        parsed: resolved.tree,
                        synthetic: false,
                    });
                }
                _ => {
                    let origin = service.classify(&pkg);
                    let synthetic_path = synthetic_init_path(module, &pkg);
                    to_add.push(CollectedModule {
                        fqn: pkg.clone(),
                        path: synthetic_path,
                        kind: ModuleKind::PackageInit,
                        origin,
                        parsed: None,
                        synthetic: true,
                    });
                }
            }
            ancestor = pkg.parent();
        }
    }

    collected.extend(to_add);
}

fn synthetic_init_path(sibling: &CollectedModule, ancestor_fqn: &Fqn) -> PathBuf {
    let sibling_depth = sibling.fqn.segments().len();
    let ancestor_depth = ancestor_fqn.segments().len();
    let mut dir = sibling.path.clone();
    dir.pop();
    for _ in 0..sibling_depth.saturating_sub(ancestor_depth) {
        dir.pop();
    }
    dir.join("__init__.py")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NoopEventHandler;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &std::path::Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn collects_transitive_imports() {
        let temp = tempdir().unwrap();
        write(temp.path(), "pkg/__init__.py", "from .used import helper\n");
        write(temp.path(), "pkg/used.py", "def helper():\n    pass\n");
        write(temp.path(), "pkg/unused.py", "def dead():\n    pass\n");

        let service = ModuleSpecService::new(vec![temp.path().to_path_buf()], Fqn::new("pkg"));
        let collector = FileCollector::new(&service);
        let collected = collector.collect(&Fqn::new("pkg"), &NoopEventHandler).unwrap();

        let fqns: FxHashSet<_> = collected.iter().map(|m| m.fqn.clone()).collect();
        assert!(fqns.contains(&Fqn::new("pkg")));
        assert!(fqns.contains(&Fqn::new("pkg.used")));
        // unused.py is never imported, so it is not pulled in by sibling
        // proximity alone (spec: "a module's siblings are NOT eagerly
        // pulled").
        assert!(!fqns.contains(&Fqn::new("pkg.unused")));
    }

    #[test]
    fn synthesizes_missing_ancestor_init() {
        let temp = tempdir().unwrap();
        write(temp.path(), "pkg/__init__.py", "");
        // `pkg/sub` has no __init__.py of its own (namespace-style), but a
        // submodule import still requires a synthetic ancestor entry.
        write(temp.path(), "pkg/sub/leaf.py", "x = 1\n");
        write(temp.path(), "pkg/sub/__init__.py", "from .leaf import x\n");

        let service = ModuleSpecService::new(vec![temp.path().to_path_buf()], Fqn::new("pkg"));
        let collector = FileCollector::new(&service);
        // Seed directly from the submodule import path.
        let mut collected = collector.collect(&Fqn::new("pkg.sub"), &NoopEventHandler).unwrap();
        inject_synthetic_ancestors(&mut collected, &service);
        let fqns: FxHashSet<_> = collected.iter().map(|m| m.fqn.clone()).collect();
        assert!(fqns.contains(&Fqn::new("pkg")));
    }
}
