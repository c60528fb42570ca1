//! Name resolver (C2): for a module's AST, compute the FQNs each top-level
//! statement defines and every FQN referenced anywhere within it (body,
//! decorators, default values, base classes, annotations), plus enough
//! scope information to tell a locally-shadowed name from a reference to a
//! module-level/imported binding.
//!
//! Scope tracking follows the teacher's `visitor.rs` shape (a stack of
//! frames, each holding a set of locally-bound names) but does not carry
//! per-statement `DefinitionInfo`/`Definition` records the way the teacher
//! does - here the output only needs to feed C6's fixpoint, not drive a
//! findings report, so resolution stops at top-level statement granularity
//! (spec's conservative-approximation clause: "does not guarantee removal
//! of every dead definition").

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use ruff_python_ast::{self as ast, Expr, Stmt};
use ruff_text_size::Ranged;

use crate::fqn::{Fqn, ModuleSpec};

/// What a module-level statement is, for C6/C7 purposes.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `def`/`class`, optionally decorated.
    Definition {
        /// The FQN this definition binds.
        fqn: Fqn,
        /// FQNs of the decorators applied to it, in source order.
        decorator_fqns: Vec<Fqn>,
    },
    /// A plain or annotated assignment to one or more simple names.
    Assignment {
        /// FQNs bound by the assignment's target(s).
        fqns: Vec<Fqn>,
    },
    /// An expression statement containing a call (always alive: possible
    /// side effects).
    CallExpr,
    /// `if __name__ == "__main__":` (always alive).
    MainBlock,
    /// `import a, b.c [as d]`.
    Import {
        /// One binding per imported name.
        aliases: Vec<ImportAlias>,
    },
    /// `from .pkg import a, b [as c]` / `from pkg import *`.
    ImportFrom {
        /// Resolved FQN of the module imported from, if resolvable.
        source_module: Option<Fqn>,
        /// Whether this is `from pkg import *`.
        is_star: bool,
        /// One binding per imported name (empty when `is_star`).
        aliases: Vec<ImportAlias>,
    },
    /// Anything else (plain expressions, `pass`, loops, ...): never itself
    /// a pruning target, never itself a liveness seed.
    Other,
}

/// One imported name's local binding plus the FQN it refers to in its
/// source module.
#[derive(Debug, Clone)]
pub struct ImportAlias {
    /// The local name this import binds in the current module
    /// (`asname` if present, else the plain/last segment of `name`).
    pub local_name: String,
    /// `module_fqn.local_name` - the FQN this import statement itself
    /// defines in the current module.
    pub binding_fqn: Fqn,
    /// The FQN this name refers to in its *source* module - what C7 checks
    /// before pruning the alias from the import statement.
    pub source_fqn: Fqn,
}

/// A single top-level statement, with its resolved kind, byte range (for
/// C7's edits), and every FQN referenced anywhere in its subtree.
#[derive(Debug, Clone)]
pub struct TopLevelStmt {
    /// Index into the module's top-level statement list.
    pub index: usize,
    /// Byte range of the statement itself (decorators included for defs,
    /// via ruff's range which spans the `decorated` definition already for
    /// FunctionDef/ClassDef... actually ruff's stmt range starts at the
    /// first decorator already, see resolver tests).
    pub range: (u32, u32),
    /// What this statement is, for liveness/pruning purposes.
    pub kind: StmtKind,
    /// Every FQN referenced anywhere within this statement's subtree.
    pub references: Vec<Fqn>,
}

/// All resolved names for one module.
#[derive(Debug)]
pub struct ModuleNames {
    /// The module's own FQN.
    pub module_fqn: Fqn,
    /// Resolved top-level statements, in source order.
    pub top_level: Vec<TopLevelStmt>,
}

/// A name bound somewhere visible from module scope.
#[derive(Debug, Clone)]
enum Binding {
    /// A name defined inside this module (function, class, or assignment
    /// target) - referencing it means referencing `module_fqn.name`.
    Local(Fqn),
    /// A name bound by an import - referencing it bumps both the local
    /// binding FQN and the FQN in the import's source module (spec §4.2:
    /// "produces both the binding FQN M.X and the source FQN P.X;
    /// treeshaking keys both").
    Import { binding_fqn: Fqn, source_fqn: Fqn },
}

/// Resolves names for a single parsed module.
pub struct NameResolver<'a> {
    module_fqn: &'a Fqn,
    /// The FQN relative imports resolve against: equal to `module_fqn` for a
    /// regular module (its own package is its parent), but a synthetic
    /// `module_fqn.__init__` for a package's `__init__.py` (whose own
    /// package is itself, not its parent - see [`Self::resolve`]).
    relative_base: Fqn,
    module_scope: rustc_hash::FxHashMap<String, Binding>,
}

impl<'a> NameResolver<'a> {
    /// Resolve every top-level statement of `module` (whose own FQN is
    /// `module_fqn`). `is_package_init` must be `true` when `module` is a
    /// package's `__init__.py`: a relative import written there resolves
    /// against `module_fqn` itself, not its parent, since `__init__.py`'s
    /// own FQN already denotes the package (spec §4.2's "`from .` resolves
    /// against the current module's own package", applied literally would
    /// otherwise strip a level that does not exist for a package root).
    #[must_use]
    pub fn resolve(module_fqn: &'a Fqn, is_package_init: bool, module: &ast::ModModule) -> ModuleNames {
        let relative_base = if is_package_init {
            module_fqn.join("__init__")
        } else {
            module_fqn.clone()
        };
        let mut resolver = Self {
            module_fqn,
            relative_base,
            module_scope: rustc_hash::FxHashMap::default(),
        };
        resolver.seed_module_scope(&module.body);

        let top_level = module
            .body
            .iter()
            .enumerate()
            .map(|(index, stmt)| resolver.resolve_top_level(index, stmt))
            .collect();

        ModuleNames {
            module_fqn: module_fqn.clone(),
            top_level,
        }
    }

    fn seed_module_scope(&mut self, body: &[Stmt]) {
        for stmt in body {
            match stmt {
                Stmt::FunctionDef(def) => {
                    self.module_scope.insert(
                        def.name.to_string(),
                        Binding::Local(self.module_fqn.join(def.name.as_str())),
                    );
                }
                Stmt::ClassDef(def) => {
                    self.module_scope.insert(
                        def.name.to_string(),
                        Binding::Local(self.module_fqn.join(def.name.as_str())),
                    );
                }
                Stmt::Assign(assign) => {
                    for target in &assign.targets {
                        self.bind_simple_target(target);
                    }
                }
                Stmt::AnnAssign(assign) => {
                    self.bind_simple_target(&assign.target);
                }
                Stmt::Import(import) => {
                    for alias in &import.names {
                        let local = local_name_for(alias);
                        let source = import_source_fqn(alias);
                        self.module_scope.insert(
                            local.clone(),
                            Binding::Import {
                                binding_fqn: self.module_fqn.join(&local),
                                source_fqn: source,
                            },
                        );
                    }
                }
                Stmt::ImportFrom(import) => {
                    if let Some(source_module) = resolve_import_from_module(&self.relative_base, import)
                    {
                        for alias in &import.names {
                            if alias.name.as_str() == "*" {
                                continue;
                            }
                            let local = local_name_for(alias);
                            let source = source_module.join(alias.name.as_str());
                            self.module_scope.insert(
                                local.clone(),
                                Binding::Import {
                                    binding_fqn: self.module_fqn.join(&local),
                                    source_fqn: source,
                                },
                            );
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn bind_simple_target(&mut self, target: &Expr) {
        if let Expr::Name(name) = target {
            self.module_scope.insert(
                name.id.to_string(),
                Binding::Local(self.module_fqn.join(name.id.as_str())),
            );
        }
    }

    fn resolve_top_level(&self, index: usize, stmt: &Stmt) -> TopLevelStmt {
        let range = (stmt.range().start().to_u32(), stmt.range().end().to_u32());
        let mut shadow = ShadowStack::new();
        let mut references = Vec::new();

        let kind = match stmt {
            Stmt::FunctionDef(def) => {
                let fqn = self.module_fqn.join(def.name.as_str());
                let decorator_fqns = def
                    .decorator_list
                    .iter()
                    .map(|d| self.decorator_fqn_or_fallback(&d.expression, &mut shadow))
                    .collect();
                for decorator in &def.decorator_list {
                    self.collect_expr(&decorator.expression, &mut shadow, &mut references);
                }
                shadow.push();
                for param in iter_parameters(&def.parameters) {
                    shadow.bind(param.name.as_str());
                }
                for default in iter_defaults(&def.parameters) {
                    self.collect_expr(default, &mut shadow, &mut references);
                }
                if let Some(returns) = &def.returns {
                    self.collect_annotation(returns, &mut shadow, &mut references);
                }
                for inner in &def.body {
                    self.collect_stmt(inner, &mut shadow, &mut references);
                }
                shadow.pop();
                StmtKind::Definition {
                    fqn,
                    decorator_fqns,
                }
            }
            Stmt::ClassDef(def) => {
                let fqn = self.module_fqn.join(def.name.as_str());
                let decorator_fqns = def
                    .decorator_list
                    .iter()
                    .map(|d| self.decorator_fqn_or_fallback(&d.expression, &mut shadow))
                    .collect();
                for decorator in &def.decorator_list {
                    self.collect_expr(&decorator.expression, &mut shadow, &mut references);
                }
                if let Some(arguments) = &def.arguments {
                    for base in &arguments.args {
                        self.collect_expr(base, &mut shadow, &mut references);
                    }
                    for keyword in &arguments.keywords {
                        self.collect_expr(&keyword.value, &mut shadow, &mut references);
                    }
                }
                for inner in &def.body {
                    self.collect_stmt(inner, &mut shadow, &mut references);
                }
                StmtKind::Definition {
                    fqn,
                    decorator_fqns,
                }
            }
            Stmt::Assign(assign) => {
                let fqns = assign
                    .targets
                    .iter()
                    .filter_map(|t| simple_target_fqn(self.module_fqn, t))
                    .collect();
                self.collect_expr(&assign.value, &mut shadow, &mut references);
                StmtKind::Assignment { fqns }
            }
            Stmt::AnnAssign(assign) => {
                let fqns = simple_target_fqn(self.module_fqn, &assign.target)
                    .into_iter()
                    .collect();
                self.collect_annotation(&assign.annotation, &mut shadow, &mut references);
                if let Some(value) = &assign.value {
                    self.collect_expr(value, &mut shadow, &mut references);
                }
                StmtKind::Assignment { fqns }
            }
            Stmt::Expr(expr_stmt) => {
                self.collect_expr(&expr_stmt.value, &mut shadow, &mut references);
                if matches!(expr_stmt.value.as_ref(), Expr::Call(_)) {
                    StmtKind::CallExpr
                } else {
                    StmtKind::Other
                }
            }
            Stmt::If(if_stmt) if is_main_guard(if_stmt) => {
                self.collect_expr(&if_stmt.test, &mut shadow, &mut references);
                for inner in &if_stmt.body {
                    self.collect_stmt(inner, &mut shadow, &mut references);
                }
                StmtKind::MainBlock
            }
            Stmt::Import(import) => {
                let aliases = import
                    .names
                    .iter()
                    .map(|alias| {
                        let local = local_name_for(alias);
                        ImportAlias {
                            local_name: local.clone(),
                            binding_fqn: self.module_fqn.join(&local),
                            source_fqn: import_source_fqn(alias),
                        }
                    })
                    .collect();
                StmtKind::Import { aliases }
            }
            Stmt::ImportFrom(import) => {
                let source_module = resolve_import_from_module(&self.relative_base, import);
                let is_star = import
                    .names
                    .first()
                    .is_some_and(|alias| alias.name.as_str() == "*");
                let aliases = if is_star {
                    Vec::new()
                } else {
                    import
                        .names
                        .iter()
                        .map(|alias| {
                            let local = local_name_for(alias);
                            let source_fqn = source_module
                                .clone()
                                .unwrap_or_else(|| Fqn::new(""))
                                .join(alias.name.as_str());
                            ImportAlias {
                                local_name: local.clone(),
                                binding_fqn: self.module_fqn.join(&local),
                                source_fqn,
                            }
                        })
                        .collect()
                };
                StmtKind::ImportFrom {
                    source_module,
                    is_star,
                    aliases,
                }
            }
            other => {
                self.collect_stmt(other, &mut shadow, &mut references);
                StmtKind::Other
            }
        };

        TopLevelStmt {
            index,
            range,
            kind,
            references,
        }
    }

    /// Resolve only the immediate dotted-chain head of an expression (used
    /// for decorator-callee FQN lookup, where we need "is this decorator in
    /// the safe allowlist" and not a full reference collection).
    fn resolve_expr_head(&self, expr: &Expr, shadow: &mut ShadowStack) -> Option<Fqn> {
        let (root, attrs) = dotted_chain(expr)?;
        if shadow.is_shadowed(&root) {
            return None;
        }
        match self.module_scope.get(&root)? {
            Binding::Local(fqn) => Some(fqn.clone()),
            Binding::Import {
                binding_fqn,
                source_fqn,
            } => {
                if attrs.is_empty() {
                    Some(binding_fqn.clone())
                } else {
                    Some(source_fqn.join(&attrs.join(".")))
                }
            }
        }
    }

    /// Resolve a decorator's callee to an FQN for the safe-decorator
    /// allowlist check. Unlike [`Self::resolve_expr_head`], this never
    /// drops the decorator: one whose callee can't be resolved to a scope
    /// binding still yields a distinguishing textual fallback, so it reads
    /// as "not in the allowlist" and conservatively forces preservation
    /// (spec §4.6: "any decorator outside the allowlist forces
    /// preservation") rather than being silently treated as absent.
    fn decorator_fqn_or_fallback(&self, expr: &Expr, shadow: &mut ShadowStack) -> Fqn {
        let callee = match expr {
            Expr::Call(call) => &call.func,
            other => other,
        };
        self.resolve_expr_head(callee, shadow)
            .unwrap_or_else(|| fallback_decorator_fqn(callee))
    }

    fn collect_annotation(&self, expr: &Expr, shadow: &mut ShadowStack, out: &mut Vec<Fqn>) {
        // String-literal forward references in annotation position are
        // handled by C5's rewriter (it rewrites the text); for reference
        // counting we conservatively do not parse the string's contents,
        // matching the "heuristic: operate only on strings whose containing
        // syntactic position is an annotation" scope of C5, not C6/C2.
        self.collect_expr(expr, shadow, out);
    }

    fn collect_stmt(&self, stmt: &Stmt, shadow: &mut ShadowStack, out: &mut Vec<Fqn>) {
        match stmt {
            Stmt::FunctionDef(def) => {
                for decorator in &def.decorator_list {
                    self.collect_expr(&decorator.expression, shadow, out);
                }
                shadow.push();
                shadow.bind(def.name.as_str());
                for param in iter_parameters(&def.parameters) {
                    shadow.bind(param.name.as_str());
                }
                for default in iter_defaults(&def.parameters) {
                    self.collect_expr(default, shadow, out);
                }
                for inner in &def.body {
                    self.collect_stmt(inner, shadow, out);
                }
                shadow.pop();
            }
            Stmt::ClassDef(def) => {
                for decorator in &def.decorator_list {
                    self.collect_expr(&decorator.expression, shadow, out);
                }
                if let Some(arguments) = &def.arguments {
                    for base in &arguments.args {
                        self.collect_expr(base, shadow, out);
                    }
                }
                shadow.push();
                shadow.bind(def.name.as_str());
                for inner in &def.body {
                    self.collect_stmt(inner, shadow, out);
                }
                shadow.pop();
            }
            Stmt::Assign(assign) => {
                for target in &assign.targets {
                    self.collect_assignment_target(target, shadow, out);
                }
                self.collect_expr(&assign.value, shadow, out);
            }
            Stmt::AugAssign(assign) => {
                self.collect_expr(&assign.target, shadow, out);
                self.collect_expr(&assign.value, shadow, out);
            }
            Stmt::AnnAssign(assign) => {
                self.collect_assignment_target(&assign.target, shadow, out);
                self.collect_expr(&assign.annotation, shadow, out);
                if let Some(value) = &assign.value {
                    self.collect_expr(value, shadow, out);
                }
            }
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.collect_expr(value, shadow, out);
                }
            }
            Stmt::Expr(expr_stmt) => self.collect_expr(&expr_stmt.value, shadow, out),
            Stmt::If(if_stmt) => {
                self.collect_expr(&if_stmt.test, shadow, out);
                for inner in &if_stmt.body {
                    self.collect_stmt(inner, shadow, out);
                }
                for clause in &if_stmt.elif_else_clauses {
                    if let Some(test) = &clause.test {
                        self.collect_expr(test, shadow, out);
                    }
                    for inner in &clause.body {
                        self.collect_stmt(inner, shadow, out);
                    }
                }
            }
            Stmt::For(for_stmt) => {
                self.collect_assignment_target(&for_stmt.target, shadow, out);
                self.collect_expr(&for_stmt.iter, shadow, out);
                for inner in &for_stmt.body {
                    self.collect_stmt(inner, shadow, out);
                }
                for inner in &for_stmt.orelse {
                    self.collect_stmt(inner, shadow, out);
                }
            }
            Stmt::While(while_stmt) => {
                self.collect_expr(&while_stmt.test, shadow, out);
                for inner in &while_stmt.body {
                    self.collect_stmt(inner, shadow, out);
                }
                for inner in &while_stmt.orelse {
                    self.collect_stmt(inner, shadow, out);
                }
            }
            Stmt::With(with_stmt) => {
                for item in &with_stmt.items {
                    self.collect_expr(&item.context_expr, shadow, out);
                    if let Some(target) = &item.optional_vars {
                        self.collect_assignment_target(target, shadow, out);
                    }
                }
                for inner in &with_stmt.body {
                    self.collect_stmt(inner, shadow, out);
                }
            }
            Stmt::Try(try_stmt) => {
                for inner in &try_stmt.body {
                    self.collect_stmt(inner, shadow, out);
                }
                for handler in &try_stmt.handlers {
                    let ast::ExceptHandler::ExceptHandler(handler) = handler;
                    if let Some(ty) = &handler.type_ {
                        self.collect_expr(ty, shadow, out);
                    }
                    for inner in &handler.body {
                        self.collect_stmt(inner, shadow, out);
                    }
                }
                for inner in &try_stmt.orelse {
                    self.collect_stmt(inner, shadow, out);
                }
                for inner in &try_stmt.finalbody {
                    self.collect_stmt(inner, shadow, out);
                }
            }
            Stmt::Assert(assert_stmt) => {
                self.collect_expr(&assert_stmt.test, shadow, out);
                if let Some(msg) = &assert_stmt.msg {
                    self.collect_expr(msg, shadow, out);
                }
            }
            Stmt::Raise(raise_stmt) => {
                if let Some(exc) = &raise_stmt.exc {
                    self.collect_expr(exc, shadow, out);
                }
                if let Some(cause) = &raise_stmt.cause {
                    self.collect_expr(cause, shadow, out);
                }
            }
            Stmt::Delete(delete_stmt) => {
                for target in &delete_stmt.targets {
                    self.collect_expr(target, shadow, out);
                }
            }
            Stmt::Import(import) => {
                for alias in &import.names {
                    shadow.bind(&local_name_for(alias));
                }
            }
            Stmt::ImportFrom(import) => {
                for alias in &import.names {
                    if alias.name.as_str() != "*" {
                        shadow.bind(&local_name_for(alias));
                    }
                }
            }
            _ => {}
        }
    }

    fn collect_assignment_target(&self, target: &Expr, shadow: &mut ShadowStack, out: &mut Vec<Fqn>) {
        match target {
            Expr::Name(name) => shadow.bind(name.id.as_str()),
            Expr::Tuple(tuple) => {
                for elt in &tuple.elts {
                    self.collect_assignment_target(elt, shadow, out);
                }
            }
            Expr::List(list) => {
                for elt in &list.elts {
                    self.collect_assignment_target(elt, shadow, out);
                }
            }
            Expr::Starred(starred) => self.collect_assignment_target(&starred.value, shadow, out),
            other => self.collect_expr(other, shadow, out),
        }
    }

    fn collect_expr(&self, expr: &Expr, shadow: &mut ShadowStack, out: &mut Vec<Fqn>) {
        // A Name/Attribute chain gets resolved as a whole, not recursed
        // into field-by-field (an Attribute's `.value` is itself a Name or
        // Attribute node that would otherwise double-report).
        if let Some((root, attrs)) = dotted_chain(expr) {
            if !shadow.is_shadowed(&root) {
                if let Some(binding) = self.module_scope.get(&root) {
                    match binding {
                        Binding::Local(fqn) => out.push(fqn.clone()),
                        Binding::Import {
                            binding_fqn,
                            source_fqn,
                        } => {
                            out.push(binding_fqn.clone());
                            if attrs.is_empty() {
                                out.push(source_fqn.clone());
                            } else {
                                out.push(source_fqn.join(&attrs.join(".")));
                            }
                        }
                    }
                }
            }
            return;
        }

        match expr {
            Expr::BoolOp(e) => {
                for value in &e.values {
                    self.collect_expr(value, shadow, out);
                }
            }
            Expr::BinOp(e) => {
                self.collect_expr(&e.left, shadow, out);
                self.collect_expr(&e.right, shadow, out);
            }
            Expr::UnaryOp(e) => self.collect_expr(&e.operand, shadow, out),
            Expr::Lambda(e) => {
                shadow.push();
                if let Some(parameters) = &e.parameters {
                    for param in iter_parameters(parameters) {
                        shadow.bind(param.name.as_str());
                    }
                }
                self.collect_expr(&e.body, shadow, out);
                shadow.pop();
            }
            Expr::Dict(e) => {
                for item in &e.items {
                    if let Some(key) = &item.key {
                        self.collect_expr(key, shadow, out);
                    }
                    self.collect_expr(&item.value, shadow, out);
                }
            }
            Expr::Set(e) => {
                for elt in &e.elts {
                    self.collect_expr(elt, shadow, out);
                }
            }
            Expr::ListComp(e) => self.collect_comprehension(&e.elt, None, &e.generators, shadow, out),
            Expr::SetComp(e) => self.collect_comprehension(&e.elt, None, &e.generators, shadow, out),
            Expr::Generator(e) => self.collect_comprehension(&e.elt, None, &e.generators, shadow, out),
            Expr::DictComp(e) => {
                self.collect_comprehension(&e.key, Some(&e.value), &e.generators, shadow, out);
            }
            Expr::Await(e) => self.collect_expr(&e.value, shadow, out),
            Expr::Yield(e) => {
                if let Some(value) = &e.value {
                    self.collect_expr(value, shadow, out);
                }
            }
            Expr::YieldFrom(e) => self.collect_expr(&e.value, shadow, out),
            Expr::Compare(e) => {
                self.collect_expr(&e.left, shadow, out);
                for comparator in &e.comparators {
                    self.collect_expr(comparator, shadow, out);
                }
            }
            Expr::Call(e) => {
                self.collect_expr(&e.func, shadow, out);
                for arg in &e.arguments.args {
                    self.collect_expr(arg, shadow, out);
                }
                for keyword in &e.arguments.keywords {
                    self.collect_expr(&keyword.value, shadow, out);
                }
            }
            Expr::Tuple(e) => {
                for elt in &e.elts {
                    self.collect_expr(elt, shadow, out);
                }
            }
            Expr::List(e) => {
                for elt in &e.elts {
                    self.collect_expr(elt, shadow, out);
                }
            }
            Expr::Starred(e) => self.collect_expr(&e.value, shadow, out),
            Expr::Slice(e) => {
                if let Some(lower) = &e.lower {
                    self.collect_expr(lower, shadow, out);
                }
                if let Some(upper) = &e.upper {
                    self.collect_expr(upper, shadow, out);
                }
                if let Some(step) = &e.step {
                    self.collect_expr(step, shadow, out);
                }
            }
            Expr::Subscript(e) => {
                self.collect_expr(&e.value, shadow, out);
                self.collect_expr(&e.slice, shadow, out);
            }
            _ => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_comprehension(
        &self,
        elt: &Expr,
        value: Option<&Expr>,
        generators: &[ast::Comprehension],
        shadow: &mut ShadowStack,
        out: &mut Vec<Fqn>,
    ) {
        shadow.push();
        for generator in generators {
            self.collect_expr(&generator.iter, shadow, out);
            self.collect_assignment_target(&generator.target, shadow, out);
            for if_clause in &generator.ifs {
                self.collect_expr(if_clause, shadow, out);
            }
        }
        self.collect_expr(elt, shadow, out);
        if let Some(value) = value {
            self.collect_expr(value, shadow, out);
        }
        shadow.pop();
    }
}

/// A stack of locally-shadowed name sets, innermost frame last.
struct ShadowStack(Vec<FxHashSet<String>>);

impl ShadowStack {
    fn new() -> Self {
        Self(vec![FxHashSet::default()])
    }

    fn push(&mut self) {
        self.0.push(FxHashSet::default());
    }

    fn pop(&mut self) {
        self.0.pop();
    }

    fn bind(&mut self, name: &str) {
        if let Some(frame) = self.0.last_mut() {
            frame.insert(name.to_owned());
        }
    }

    fn is_shadowed(&self, name: &str) -> bool {
        self.0.iter().any(|frame| frame.contains(name))
    }
}

/// Extract a pure `Name`/`Attribute` dotted chain: `(root_name, [attr, ...])`.
/// Returns `None` as soon as a non-chain node (`Call`, `Subscript`, ...) is
/// encountered, since the chain beyond that point is not statically an FQN.
fn dotted_chain(expr: &Expr) -> Option<(String, Vec<String>)> {
    match expr {
        Expr::Name(name) => Some((name.id.to_string(), Vec::new())),
        Expr::Attribute(attr) => {
            let (root, mut attrs) = dotted_chain(&attr.value)?;
            attrs.push(attr.attr.to_string());
            Some((root, attrs))
        }
        _ => None,
    }
}

/// Every named parameter of a signature, positional-only through `**kwargs`.
fn iter_parameters(parameters: &ast::Parameters) -> impl Iterator<Item = &ast::Parameter> {
    parameters
        .posonlyargs
        .iter()
        .chain(parameters.args.iter())
        .chain(parameters.kwonlyargs.iter())
        .map(|p| &p.parameter)
        .chain(parameters.vararg.as_deref())
        .chain(parameters.kwarg.as_deref())
}

/// Default-value expressions of a signature's positional/keyword parameters
/// (`*args`/`**kwargs` never carry a default).
fn iter_defaults(parameters: &ast::Parameters) -> impl Iterator<Item = &Expr> {
    parameters
        .posonlyargs
        .iter()
        .chain(parameters.args.iter())
        .chain(parameters.kwonlyargs.iter())
        .filter_map(|p| p.default.as_deref())
}

fn simple_target_fqn(module_fqn: &Fqn, target: &Expr) -> Option<Fqn> {
    match target {
        Expr::Name(name) => Some(module_fqn.join(name.id.as_str())),
        _ => None,
    }
}

fn local_name_for(alias: &ast::Alias) -> String {
    alias
        .asname
        .as_ref()
        .map_or_else(|| first_segment(alias.name.as_str()), |n| n.to_string())
}

/// Best-effort textual FQN for a decorator callee that resolved to no scope
/// binding (not imported, not locally defined) - e.g. a dynamically
/// constructed or framework-injected name. Never coincides with a real
/// module-qualified FQN, so it can never accidentally match an entry in a
/// safe-decorator allowlist.
fn fallback_decorator_fqn(expr: &Expr) -> Fqn {
    dotted_chain(expr).map_or_else(
        || Fqn::new("<unresolved-decorator>"),
        |(root, attrs)| {
            if attrs.is_empty() {
                // A bare name with no local/import binding is either a real
                // builtin (classmethod, staticmethod, property, ...) or a
                // NameError at runtime; `builtins.<root>` is the FQN the
                // safe-decorator allowlist actually lists these under.
                Fqn::new(format!("builtins.{root}"))
            } else {
                Fqn::new(format!("<unresolved>.{root}.{}", attrs.join(".")))
            }
        },
    )
}

fn first_segment(dotted: &str) -> String {
    dotted.split('.').next().unwrap_or(dotted).to_owned()
}

/// The FQN a plain `import a.b.c [as d]` statement's binding refers to in
/// its source module. An explicit `asname` binds the *full* dotted path
/// (`d` means exactly `a.b.c`); without one, Python only binds the root
/// segment (`a`) and every use re-spells the rest (`a.b.c.whatever`), so the
/// source FQN must be just the root - joining the full dotted path again at
/// each attribute access would double-count the middle segments.
fn import_source_fqn(alias: &ast::Alias) -> Fqn {
    if alias.asname.is_some() {
        Fqn::new(alias.name.as_str())
    } else {
        Fqn::new(first_segment(alias.name.as_str()))
    }
}

/// Resolve an `ImportFrom`'s `module` (honoring relative-import `level`)
/// against the importing module's own FQN.
fn resolve_import_from_module(module_fqn: &Fqn, import: &ast::StmtImportFrom) -> Option<Fqn> {
    let dotted = import.module.as_ref().map_or("", ast::Identifier::as_str);
    if import.level == 0 {
        if dotted.is_empty() {
            None
        } else {
            Some(Fqn::new(dotted))
        }
    } else {
        let spec = ModuleSpec::relative(dotted, import.level);
        Some(spec.resolve_relative(module_fqn))
    }
}

fn is_main_guard(if_stmt: &ast::StmtIf) -> bool {
    let Expr::Compare(compare) = if_stmt.test.as_ref() else {
        return false;
    };
    if compare.comparators.len() != 1 {
        return false;
    }
    let lhs_is_dunder_name = matches!(compare.left.as_ref(), Expr::Name(n) if n.id.as_str() == "__name__");
    let rhs_is_dunder_name =
        matches!(&compare.comparators[0], Expr::Name(n) if n.id.as_str() == "__name__");
    let lhs_is_main_str =
        matches!(compare.left.as_ref(), Expr::StringLiteral(s) if s.value.to_str() == "__main__");
    let rhs_is_main_str =
        matches!(&compare.comparators[0], Expr::StringLiteral(s) if s.value.to_str() == "__main__");

    (lhs_is_dunder_name && rhs_is_main_str) || (lhs_is_main_str && rhs_is_dunder_name)
}

/// Test-only helper exposing `SmallVec` for call sites that want a
/// zero-allocation handful of FQNs without pulling in the full module
/// resolution pass.
#[must_use]
pub fn single(fqn: Fqn) -> SmallVec<[Fqn; 2]> {
    let mut v = SmallVec::new();
    v.push(fqn);
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(source: &str, module_fqn: &str) -> ModuleNames {
        let parsed = ruff_python_parser::parse_module(source).expect("parses");
        let module = parsed.into_syntax();
        NameResolver::resolve(&Fqn::new(module_fqn), false, &module)
    }

    fn resolve_package_init(source: &str, module_fqn: &str) -> ModuleNames {
        let parsed = ruff_python_parser::parse_module(source).expect("parses");
        let module = parsed.into_syntax();
        NameResolver::resolve(&Fqn::new(module_fqn), true, &module)
    }

    #[test]
    fn import_binds_both_local_and_source_fqn() {
        let names = resolve("import os\n\ndef use():\n    return os.getcwd()\n", "app");
        let func = names
            .top_level
            .iter()
            .find(|s| matches!(s.kind, StmtKind::Definition { .. }))
            .expect("function present");
        assert!(func.references.contains(&Fqn::new("app.os")));
        assert!(func.references.contains(&Fqn::new("os.getcwd")));
    }

    #[test]
    fn assignment_target_is_recognized() {
        let names = resolve("X = 1\n", "app");
        let assign = &names.top_level[0];
        assert!(matches!(&assign.kind, StmtKind::Assignment { fqns } if fqns == &vec![Fqn::new("app.X")]));
    }

    #[test]
    fn main_guard_detected() {
        let names = resolve("if __name__ == \"__main__\":\n    pass\n", "app");
        assert!(matches!(names.top_level[0].kind, StmtKind::MainBlock));
    }

    #[test]
    fn star_import_has_no_aliases_but_resolves_source() {
        let names = resolve("from .pkg import *\n", "app.mod");
        let StmtKind::ImportFrom {
            source_module,
            is_star,
            aliases,
        } = &names.top_level[0].kind
        else {
            panic!("expected ImportFrom");
        };
        assert!(*is_star);
        assert!(aliases.is_empty());
        assert_eq!(*source_module, Some(Fqn::new("app.pkg")));
    }

    #[test]
    fn relative_import_inside_package_init_resolves_against_itself() {
        // `pkg/__init__.py` is itself "pkg" - a single leading dot there
        // means "pkg", not "pkg"'s parent.
        let names = resolve_package_init("from .helper import thing\n", "pkg");
        let StmtKind::ImportFrom { source_module, .. } = &names.top_level[0].kind else {
            panic!("expected ImportFrom");
        };
        assert_eq!(*source_module, Some(Fqn::new("pkg.helper")));
    }

    #[test]
    fn relative_import_inside_regular_module_resolves_against_parent() {
        let names = resolve("from .helper import thing\n", "pkg.mod");
        let StmtKind::ImportFrom { source_module, .. } = &names.top_level[0].kind else {
            panic!("expected ImportFrom");
        };
        assert_eq!(*source_module, Some(Fqn::new("pkg.helper")));
    }

    #[test]
    fn bare_safe_decorator_resolves_to_builtins_fqn() {
        // `staticmethod` has no binding in this module (no `import builtins`
        // - it never needs one), so the decorator's callee falls back to the
        // FQN the safe-decorator allowlist actually lists it under.
        let names = resolve("@staticmethod\ndef f():\n    pass\n", "app");
        let StmtKind::Definition { decorator_fqns, .. } = &names.top_level[0].kind else {
            panic!("expected function definition");
        };
        assert_eq!(decorator_fqns, &vec![Fqn::new("builtins.staticmethod")]);
    }

    #[test]
    fn unresolvable_decorator_gets_a_distinguishing_fallback() {
        let names = resolve("@unknown_decorator\ndef f():\n    pass\n", "app");
        let StmtKind::Definition { decorator_fqns, .. } = &names.top_level[0].kind else {
            panic!("expected function definition");
        };
        assert_eq!(decorator_fqns, &vec![Fqn::new("builtins.unknown_decorator")]);
    }

    #[test]
    fn dotted_unaliased_import_binds_root_not_full_path() {
        // Only `os` is bound here; the reference has to re-spell `path.join`
        // itself, so the source FQN must be `os` (not `os.path`) or the
        // usage below would double up on `path`.
        let names = resolve("import os.path\n\ndef use():\n    return os.path.join('a', 'b')\n", "app");
        let func = names
            .top_level
            .iter()
            .find(|s| matches!(s.kind, StmtKind::Definition { .. }))
            .expect("function present");
        assert!(func.references.contains(&Fqn::new("os.path.join")));
        assert!(!func.references.iter().any(|f| f.as_str().contains("path.path")));
    }

    #[test]
    fn aliased_dotted_import_binds_full_path() {
        let names = resolve("import os.path as p\n\ndef use():\n    return p.join('a', 'b')\n", "app");
        let func = names
            .top_level
            .iter()
            .find(|s| matches!(s.kind, StmtKind::Definition { .. }))
            .expect("function present");
        assert!(func.references.contains(&Fqn::new("os.path.join")));
    }

    #[test]
    fn lambda_parameter_does_not_leak_as_reference() {
        let names = resolve("f = lambda os: os\n", "app");
        let assign = &names.top_level[0];
        assert!(assign.references.is_empty());
    }
}
