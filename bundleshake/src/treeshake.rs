//! Top-level `treeshake()` entry point (spec §6): run C2 (name resolution)
//! over every source file under a directory, fold the results through C6
//! (the whole-program fixpoint), then apply C7 (node removal) per file and
//! delete whatever that leaves empty.
//!
//! Grounded in `flay.treeshake.package.treeshake_package`'s own pipeline
//! (walk `source_dir`, resolve every module, run the fixpoint, prune each
//! file, then remove files/`__init__.py`s/directories left empty) and spec
//! §4.6/§4.7 directly.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use crate::ecosystem::ImportAliasMap;
use crate::error::Result;
use crate::event::{Event, EventSink};
use crate::fix::ByteRangeRewriter;
use crate::fqn::Fqn;
use crate::node_remover::NodeRemover;
use crate::parsing::{self, ParsedModule};
use crate::refcount::ReferenceCounter;
use crate::resolver::{ModuleNames, NameResolver};

/// Treeshake every `.py`/`.pyi` file under `source_dir` in place.
///
/// Returns the total number of top-level statements removed across the
/// tree (spec §6's `count_of_removed_statements`).
///
/// # Errors
/// Propagates the first parse/IO failure encountered while walking or
/// rewriting `source_dir`.
pub fn treeshake(
    source_dir: &Path,
    import_aliases: &ImportAliasMap,
    preserve_symbols: &FxHashSet<Fqn>,
    safe_decorators: &FxHashSet<Fqn>,
    sink: &dyn EventSink,
) -> Result<usize> {
    let files = discover_source_files(source_dir)?;

    let mut parsed_files: Vec<(PathBuf, ParsedModule, Fqn)> = Vec::with_capacity(files.len());
    for path in files {
        let parsed = parsing::parse_file(&path)?;
        let fqn = module_fqn_for(source_dir, &path);
        parsed_files.push((path, parsed, fqn));
    }

    let resolved: Vec<ModuleNames> = parsed_files
        .iter()
        .map(|(path, parsed, fqn)| {
            let is_package_init = is_package_init(path);
            NameResolver::resolve(fqn, is_package_init, &parsed.ast)
        })
        .collect();

    let counter_input: Vec<(PathBuf, ModuleNames)> = parsed_files
        .iter()
        .zip(resolved)
        .map(|((path, _, _), names)| (path.clone(), names))
        .collect();

    let counter = ReferenceCounter::new(safe_decorators);
    let index = counter.count(&counter_input, preserve_symbols, import_aliases, sink);

    let remover = NodeRemover::new(&index);
    let mut total_removed = 0usize;

    for (path, names) in &counter_input {
        let (_, parsed, fqn) = parsed_files
            .iter()
            .find(|(p, _, _)| p == path)
            .expect("every module resolved above was parsed above");

        sink.on_event(Event::ProcessModule { spec: fqn.clone() });
        let (edits, removed) = remover.prune(names, &parsed.ast, &parsed.source);

        if removed > 0 {
            sink.on_event(Event::NodesRemoval {
                spec: fqn.clone(),
                removed,
            });
        }
        total_removed += removed;

        let new_source = if edits.is_empty() {
            parsed.source.clone()
        } else {
            let mut applier = ByteRangeRewriter::new(parsed.source.clone());
            applier.add_edits(edits);
            applier.apply()?
        };

        if new_source.trim().is_empty() {
            std::fs::remove_file(path)?;
        } else if new_source != parsed.source {
            std::fs::write(path, new_source)?;
        }
    }

    remove_empty_directories(source_dir)?;

    Ok(total_removed)
}

fn is_package_init(path: &Path) -> bool {
    path.file_stem().and_then(|s| s.to_str()) == Some("__init__")
}

/// The dotted FQN a file denotes, purely from its position under
/// `source_dir`: `<dir>/a/b.py` is `a.b`; `<dir>/a/__init__.py` is `a`.
fn module_fqn_for(source_dir: &Path, path: &Path) -> Fqn {
    let relative = path.strip_prefix(source_dir).unwrap_or(path);
    let mut segments: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    if let Some(last) = segments.last_mut() {
        let stem = Path::new(last).file_stem().and_then(|s| s.to_str()).unwrap_or(last);
        if stem == "__init__" {
            segments.pop();
        } else {
            *last = stem;
        }
    }
    Fqn::new(segments.join("."))
}

fn discover_source_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    collect_source_files(root, &mut out)?;
    out.sort();
    Ok(out)
}

fn collect_source_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_source_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "py" || ext == "pyi") {
            out.push(path);
        }
    }
    Ok(())
}

/// Delete any `__init__.py` whose directory would otherwise be empty, then
/// any directory left empty by that (spec §4.7: "an `__init__.py` is
/// deleted only if its directory becomes otherwise empty; a directory with
/// only an emptied-out `__init__.py` is then removed too"). Works bottom-up
/// so a cascade of now-empty parent directories is fully collapsed.
fn remove_empty_directories(dir: &Path) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).map(|e| e.path()).collect();

    for entry in &entries {
        if entry.is_dir() {
            remove_empty_directories(entry)?;
        }
    }

    entries = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    if entries.len() == 1 && entries[0].file_name().and_then(|n| n.to_str()) == Some("__init__.py") {
        std::fs::remove_file(&entries[0])?;
        entries.clear();
    }

    if entries.is_empty() {
        std::fs::remove_dir(dir)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecosystem::ImportAliasMap;
    use crate::event::NoopEventHandler;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn removes_dead_function_and_keeps_live_one() {
        let temp = tempdir().expect("tempdir");
        write(
            temp.path(),
            "pkg/__init__.py",
            "from pkg.helper import used\n\nif __name__ == \"__main__\":\n    used()\n",
        );
        write(
            temp.path(),
            "pkg/helper.py",
            "def used():\n    pass\n\ndef dead():\n    pass\n",
        );

        let removed = treeshake(
            temp.path(),
            &ImportAliasMap::new(),
            &FxHashSet::default(),
            &FxHashSet::default(),
            &NoopEventHandler,
        )
        .expect("treeshakes");

        assert!(removed >= 1);
        let helper = fs::read_to_string(temp.path().join("pkg/helper.py")).expect("reads");
        assert!(helper.contains("def used"));
        assert!(!helper.contains("def dead"));
    }

    #[test]
    fn file_emptied_entirely_is_deleted() {
        let temp = tempdir().expect("tempdir");
        write(temp.path(), "pkg/__init__.py", "if __name__ == \"__main__\":\n    pass\n");
        write(temp.path(), "pkg/unused.py", "def dead():\n    pass\n");

        treeshake(
            temp.path(),
            &ImportAliasMap::new(),
            &FxHashSet::default(),
            &FxHashSet::default(),
            &NoopEventHandler,
        )
        .expect("treeshakes");

        assert!(!temp.path().join("pkg/unused.py").exists());
    }

    #[test]
    fn directory_left_with_only_emptied_init_is_removed() {
        let temp = tempdir().expect("tempdir");
        write(temp.path(), "pkg/__init__.py", "if __name__ == \"__main__\":\n    pass\n");
        write(temp.path(), "pkg/sub/__init__.py", "def dead():\n    pass\n");

        treeshake(
            temp.path(),
            &ImportAliasMap::new(),
            &FxHashSet::default(),
            &FxHashSet::default(),
            &NoopEventHandler,
        )
        .expect("treeshakes");

        assert!(!temp.path().join("pkg/sub").exists());
    }

    #[test]
    fn module_fqn_for_strips_init_suffix() {
        let root = Path::new("/tmp/out");
        assert_eq!(module_fqn_for(root, Path::new("/tmp/out/a/b.py")), Fqn::new("a.b"));
        assert_eq!(module_fqn_for(root, Path::new("/tmp/out/a/__init__.py")), Fqn::new("a"));
    }
}
