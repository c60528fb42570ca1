//! Dotted-name newtypes shared by the name resolver, collector, rewriter and
//! reference counter.
//!
//! `Fqn` segments are stored inline via `CompactString` - most fully
//! qualified names (a handful of short identifiers) never touch the heap,
//! the same tradeoff the teacher makes for scope names in `visitor.rs`
//! (`ScopeType::Class(CompactString)`).

use compact_str::CompactString;
use smallvec::SmallVec;
use std::fmt;

/// A fully qualified, dotted name rooted at a top-level package.
///
/// Lookups are exact string equality (see spec's `ReferenceIndex`); there is
/// no hierarchical inheritance in count space. `Fqn` is also used to
/// represent a `ModuleSpec` (a dotted import spec) - the two data model
/// entities share representation, differing only in what they denote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fqn(CompactString);

impl Fqn {
    /// Construct an `Fqn` from an already-dotted string.
    #[must_use]
    pub fn new(dotted: impl Into<CompactString>) -> Self {
        Self(dotted.into())
    }

    /// The dotted segments of this name.
    #[must_use]
    pub fn segments(&self) -> SmallVec<[&str; 4]> {
        self.0.split('.').collect()
    }

    /// The first dotted segment (`a` in `a.b.c`).
    #[must_use]
    pub fn top_level(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// All but the last segment (`a.b` in `a.b.c`), or `None` for a bare name.
    #[must_use]
    pub fn parent(&self) -> Option<Fqn> {
        self.0.rsplit_once('.').map(|(head, _)| Fqn::new(head))
    }

    /// The last dotted segment (`c` in `a.b.c`).
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Whether `self` is `other` or a dotted descendant of it
    /// (`a.b.c`.`starts_with`(`a.b`) is true, `a.bc`.`starts_with`(`a.b`) is false).
    #[must_use]
    pub fn starts_with(&self, other: &Fqn) -> bool {
        self.0 == other.0.as_str()
            || self
                .0
                .strip_prefix(other.0.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Append a dotted suffix, producing `self.suffix`.
    #[must_use]
    pub fn join(&self, suffix: &str) -> Fqn {
        if self.0.is_empty() {
            Fqn::new(suffix)
        } else {
            Fqn::new(format!("{}.{suffix}", self.0))
        }
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Fqn {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Fqn {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A dotted import spec, carrying a relative-import `level` (number of
/// leading dots; 0 for an absolute spec).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleSpec {
    /// The dotted name, excluding any leading dots.
    pub fqn: Fqn,
    /// Number of leading dots in the original source (0 = absolute).
    pub level: u32,
}

impl ModuleSpec {
    /// Construct an absolute module spec (`level` 0).
    #[must_use]
    pub fn absolute(dotted: impl Into<CompactString>) -> Self {
        Self {
            fqn: Fqn::new(dotted),
            level: 0,
        }
    }

    /// Construct a relative module spec with the given dot-level.
    #[must_use]
    pub fn relative(dotted: impl Into<CompactString>, level: u32) -> Self {
        Self {
            fqn: Fqn::new(dotted),
            level,
        }
    }

    /// First dotted segment.
    #[must_use]
    pub fn top_level(&self) -> &str {
        self.fqn.top_level()
    }

    /// All but the last segment.
    #[must_use]
    pub fn parent(&self) -> Option<Fqn> {
        self.fqn.parent()
    }

    /// Last dotted segment.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.fqn.leaf()
    }

    /// Resolve a relative spec against the enclosing package of `current_module`.
    ///
    /// `from . import x` (`level` 1) resolves against `current_module`'s own
    /// package; `from .. import x` (`level` 2) walks one package further up,
    /// matching the target language's relative-import dot semantics.
    #[must_use]
    pub fn resolve_relative(&self, current_module: &Fqn) -> Fqn {
        if self.level == 0 {
            return self.fqn.clone();
        }

        let mut base = Some(current_module.clone());
        // level 1 means "my own package": walk up once to drop the leaf
        // (current_module itself), then level-1 more times for each extra dot.
        for _ in 0..self.level {
            base = base.and_then(|f| f.parent());
        }

        match base {
            Some(base) if !self.fqn.as_str().is_empty() => base.join(self.fqn.as_str()),
            Some(base) => base,
            None => self.fqn.clone(),
        }
    }
}

impl fmt::Display for ModuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ".".repeat(self.level as usize), self.fqn)
    }
}
