//! Ecosystem defaults: the three concrete, swappable default sets spec §9's
//! Open Question leaves as "a policy input" (safe decorators, preserve
//! symbols, import aliases).
//!
//! Grounded in `flay.ecosystem.safe_decorators`, `flay.ecosystem.
//! preserve_symbols`, and `flay.ecosystem.import_aliases` - reimplemented as
//! plain data rather than `functools.cache`d module-level singletons, since
//! `bundleshake` threads these as caller-supplied parameters to
//! [`crate::treeshake::treeshake`] rather than reaching for a global.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::fqn::Fqn;

/// A declared equivalence between a visible FQN and the FQN it actually
/// refers to at runtime (spec §3 `ImportAliasMap`).
#[derive(Debug, Clone, Default)]
pub struct ImportAliasMap(FxHashMap<Fqn, Fqn>);

impl ImportAliasMap {
    /// An empty alias map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `visible` and `actual` as the same runtime object.
    pub fn insert(&mut self, visible: Fqn, actual: Fqn) {
        self.0.insert(visible, actual);
    }

    /// Iterate `(visible, actual)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Fqn, &Fqn)> {
        self.0.iter()
    }

    /// Whether the map declares no aliases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Close a preservation set under this alias map: resolves Open Question
    /// 2 (SPEC_FULL §9) by propagating membership in **both** directions,
    /// matching `flay.ecosystem.preserve_symbols.get_default_preserve_symbols`
    /// (`if k in res: res.add(v) elif v in res: res.add(k)`), generalized
    /// from a fixed ecosystem list to any caller-supplied alias map.
    #[must_use]
    pub fn close_preservation_set(&self, mut set: FxHashSet<Fqn>) -> FxHashSet<Fqn> {
        // Closure is a fixed-point too, but aliases are a flat edge set (no
        // chains in practice), so one forward+backward pass per entry over a
        // small map is sufficient and terminates.
        loop {
            let mut added = false;
            for (visible, actual) in &self.0 {
                if set.contains(visible) && !set.contains(actual) {
                    set.insert(actual.clone());
                    added = true;
                } else if set.contains(actual) && !set.contains(visible) {
                    set.insert(visible.clone());
                    added = true;
                }
            }
            if !added {
                return set;
            }
        }
    }
}

/// The decorators enumerated in `flay/ecosystem/safe_decorators.py`
/// (`_builtin_decorators`, `_stdlib_decorators`): decorators whose presence
/// on a definition does NOT, by itself, force that definition to be kept.
#[must_use]
pub fn default_safe_decorators() -> FxHashSet<Fqn> {
    [
        "builtins.classmethod",
        "builtins.staticmethod",
        "builtins.property",
        "abc.abstractmethod",
        "contextlib.contextmanager",
        "contextlib.asynccontextmanager",
        "dataclasses.dataclass",
        "functools.cache",
        "functools.cached_property",
        "functools.lru_cache",
        "functools.wraps",
        "typing.overload",
        "typing.no_type_check",
        "pydantic.v1.main.dataclass_transform",
    ]
    .into_iter()
    .map(Fqn::new)
    .collect()
}

/// An empty default preservation set with the documented extension point:
/// callers may add framework-specific lazy-export registries (spec's
/// `PreservationSet` clause (b)). `flay.ecosystem.preserve_symbols` seeds
/// this from `pydantic._dynamic_imports`; `bundleshake` does not hardcode
/// any particular third-party package's dynamic-import registry, leaving
/// that as a caller-supplied addition to this set.
#[must_use]
pub fn default_preserve_symbols() -> FxHashSet<Fqn> {
    FxHashSet::default()
}

/// An empty default import-alias map (see [`default_preserve_symbols`] for
/// why no particular ecosystem's registry is hardcoded here).
#[must_use]
pub fn default_import_aliases() -> ImportAliasMap {
    ImportAliasMap::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_decorators_include_staticmethod_and_dataclass() {
        let safe = default_safe_decorators();
        assert!(safe.contains(&Fqn::new("builtins.staticmethod")));
        assert!(safe.contains(&Fqn::new("dataclasses.dataclass")));
        assert!(safe.contains(&Fqn::new("pydantic.v1.main.dataclass_transform")));
        assert!(!safe.contains(&Fqn::new("app.unknown_decorator")));
    }

    #[test]
    fn alias_closure_propagates_both_directions() {
        let mut aliases = ImportAliasMap::new();
        aliases.insert(Fqn::new("pydantic.BaseModel"), Fqn::new("pydantic.main.BaseModel"));

        let mut preserved = FxHashSet::default();
        preserved.insert(Fqn::new("pydantic.BaseModel"));
        let closed = aliases.close_preservation_set(preserved);
        assert!(closed.contains(&Fqn::new("pydantic.main.BaseModel")));

        let mut preserved_reverse = FxHashSet::default();
        preserved_reverse.insert(Fqn::new("pydantic.main.BaseModel"));
        let closed_reverse = aliases.close_preservation_set(preserved_reverse);
        assert!(closed_reverse.contains(&Fqn::new("pydantic.BaseModel")));
    }
}
