//! Node remover (C7): turns C6's whole-program [`ReferenceIndex`] into the
//! byte-range [`Edit`]s that actually delete dead syntax from one module.
//!
//! Grounded in `flay.treeshake.node_remover.NodeRemover` - its
//! `NODE_HANDLERS` dispatch (`default_handler`, `import_handler`,
//! `import_from_handler`) and `_is_referenced_str`'s module-prefix backfill
//! - but reimplemented as a batch of [`Edit`]s over the teacher's
//! `fix::ByteRangeRewriter` rather than a `libcst.CSTTransformer` walk,
//! since this crate's edit representation is byte-range based everywhere
//! else (spec §3, and C5's `rewrite.rs` before it).

use ruff_python_ast::{self as ast, ModModule, Stmt};
use ruff_text_size::Ranged;

use crate::fix::Edit;
use crate::fqn::Fqn;
use crate::refcount::ReferenceIndex;
use crate::resolver::{ImportAlias, ModuleNames, StmtKind, TopLevelStmt};

/// Computes the edits that prune one module's dead top-level statements and
/// import aliases, given the whole-program [`ReferenceIndex`] C6 built.
pub struct NodeRemover<'a> {
    index: &'a ReferenceIndex,
}

impl<'a> NodeRemover<'a> {
    #[must_use]
    pub fn new(index: &'a ReferenceIndex) -> Self {
        Self { index }
    }

    /// Compute edits for one module, plus the count of statements removed
    /// outright (spec §4.7's `NodesRemoval` event - partial import prunes
    /// that keep at least one alias do not count as a removal).
    #[must_use]
    pub fn prune(&self, names: &ModuleNames, ast: &ModModule, source: &str) -> (Vec<Edit>, usize) {
        let mut edits = Vec::new();
        let mut removed = 0usize;

        for (stmt, top) in ast.body.iter().zip(&names.top_level) {
            match &top.kind {
                StmtKind::Definition { fqn, .. } => {
                    if !self.is_referenced(fqn) {
                        edits.push(Edit::delete(top.range.0 as usize, next_start(names, top.index, source)));
                        removed += 1;
                    }
                }
                StmtKind::Assignment { fqns } => {
                    if !fqns.is_empty() && fqns.iter().all(|f| !self.is_referenced(f)) {
                        edits.push(Edit::delete(top.range.0 as usize, next_start(names, top.index, source)));
                        removed += 1;
                    }
                }
                StmtKind::Import { aliases } => {
                    self.prune_import(stmt, top, aliases, names, source, &mut edits, &mut removed);
                }
                StmtKind::ImportFrom { is_star, aliases, .. } => {
                    // `from pkg import *` is never pruned (flay's
                    // `import_from_handler` skips `ImportStar` outright: a
                    // star import's bindings aren't enumerable, so there is
                    // no safe partial deletion).
                    if *is_star {
                        continue;
                    }
                    self.prune_import(stmt, top, aliases, names, source, &mut edits, &mut removed);
                }
                StmtKind::CallExpr | StmtKind::MainBlock | StmtKind::Other => {}
            }
        }

        (edits, removed)
    }

    fn prune_import(
        &self,
        stmt: &Stmt,
        top: &TopLevelStmt,
        aliases: &[ImportAlias],
        names: &ModuleNames,
        source: &str,
        edits: &mut Vec<Edit>,
        removed: &mut usize,
    ) {
        if aliases.is_empty() {
            return;
        }
        let nodes: &[ast::Alias] = match stmt {
            Stmt::Import(import) => &import.names,
            Stmt::ImportFrom(import) => &import.names,
            _ => return,
        };

        let live: Vec<&ast::Alias> = nodes
            .iter()
            .zip(aliases)
            .filter(|(_, info)| self.is_referenced(&info.binding_fqn) || self.is_referenced(&info.source_fqn))
            .map(|(node, _)| node)
            .collect();

        if live.len() == nodes.len() {
            return;
        }

        let stmt_start = top.range.0 as usize;
        let stmt_end = top.range.1 as usize;

        if live.is_empty() {
            edits.push(Edit::delete(stmt_start, next_start(names, top.index, source)));
            *removed += 1;
            return;
        }

        // Partial prune: keep each surviving alias's original source text
        // verbatim (so `a as b` stays `a as b`), joined by ", ", and keep
        // whatever text precedes the first alias ("from pkg import " or
        // "import ") and follows the last one (a trailing comma, closing
        // paren, ...) exactly as written.
        let first_start = nodes[0].range().start().to_usize();
        let last_end = nodes[nodes.len() - 1].range().end().to_usize();
        let prefix = &source[stmt_start..first_start];
        let tail = &source[last_end..stmt_end];
        let kept_text = live
            .iter()
            .map(|alias| &source[alias.range().start().to_usize()..alias.range().end().to_usize()])
            .collect::<Vec<_>>()
            .join(", ");
        edits.push(Edit::new(stmt_start, stmt_end, format!("{prefix}{kept_text}{tail}")));
        *removed += nodes.len() - live.len();
    }

    /// Whether `fqn` is alive, with `flay`'s module-prefix backfill: a bare
    /// module name absent from the index (or at zero) still counts as
    /// referenced if anything qualified under it is - e.g. `import pkg`
    /// itself never appears as a callee, only `pkg.thing()` does, and that
    /// reference must keep the `import pkg` statement alive.
    fn is_referenced(&self, fqn: &Fqn) -> bool {
        if self.index.get(fqn).is_some_and(|&count| count > 0) {
            return true;
        }
        let prefix = format!("{fqn}.");
        self.index.keys().any(|k| k.as_str().starts_with(&prefix))
    }
}

/// Byte offset where the statement following `index` in module-body order
/// begins, or the source's length if `index` is the last one. Deleting up
/// to this point (rather than just the statement's own end) also removes
/// any blank lines separating it from the next statement.
fn next_start(names: &ModuleNames, index: usize, source: &str) -> usize {
    names
        .top_level
        .get(index + 1)
        .map_or_else(|| source.len(), |next| next.range.0 as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::ByteRangeRewriter;
    use rustc_hash::FxHashMap;

    fn prune(source: &str, module_fqn: &str, index: &ReferenceIndex) -> String {
        let parsed = ruff_python_parser::parse_module(source).expect("parses");
        let ast = parsed.into_syntax();
        let names = crate::resolver::NameResolver::resolve(&Fqn::new(module_fqn), true, &ast);
        let remover = NodeRemover::new(index);
        let (edits, _) = remover.prune(&names, &ast, source);
        let mut applier = ByteRangeRewriter::new(source);
        applier.add_edits(edits);
        applier.apply().expect("applies")
    }

    #[test]
    fn unreferenced_definition_is_deleted() {
        let mut index = FxHashMap::default();
        index.insert(Fqn::new("pkg.used"), 1);
        let out = prune(
            "def used():\n    pass\n\n\ndef dead():\n    pass\n",
            "pkg",
            &index,
        );
        assert!(out.contains("def used"));
        assert!(!out.contains("def dead"));
    }

    #[test]
    fn referenced_definition_is_kept() {
        let mut index = FxHashMap::default();
        index.insert(Fqn::new("pkg.used"), 1);
        let out = prune("def used():\n    pass\n", "pkg", &index);
        assert_eq!(out, "def used():\n    pass\n");
    }

    #[test]
    fn fully_unreferenced_import_statement_is_removed() {
        let index = FxHashMap::default();
        let out = prune("import os\nimport sys\n", "pkg", &index);
        assert!(!out.contains("import os"));
        assert!(!out.contains("import sys"));
    }

    #[test]
    fn partially_referenced_import_keeps_only_live_names() {
        let mut index = FxHashMap::default();
        index.insert(Fqn::new("pkg.sys"), 1);
        let out = prune("import os, sys\n", "pkg", &index);
        assert_eq!(out, "import sys\n");
    }

    #[test]
    fn partially_referenced_from_import_keeps_only_live_names() {
        let mut index = FxHashMap::default();
        index.insert(Fqn::new("secrets.token_urlsafe"), 1);
        let out = prune("from secrets import token_urlsafe, choice\n", "pkg", &index);
        assert_eq!(out, "from secrets import token_urlsafe\n");
    }

    #[test]
    fn star_import_is_never_removed() {
        let index = FxHashMap::default();
        let out = prune("from pkg.sub import *\n", "pkg", &index);
        assert_eq!(out, "from pkg.sub import *\n");
    }

    #[test]
    fn module_prefix_backfill_keeps_bare_import_alive() {
        let mut index = FxHashMap::default();
        // Nothing ever references the bare name `os`, only `os.getcwd`.
        index.insert(Fqn::new("os.getcwd"), 1);
        let out = prune("import os\n", "pkg", &index);
        assert_eq!(out, "import os\n");
    }

    #[test]
    fn unreferenced_assignment_is_deleted_but_referenced_target_kept() {
        let mut index = FxHashMap::default();
        index.insert(Fqn::new("pkg.KEPT"), 1);
        let out = prune("DEAD = 1\nKEPT = 2\n", "pkg", &index);
        assert!(!out.contains("DEAD"));
        assert!(out.contains("KEPT = 2"));
    }
}
