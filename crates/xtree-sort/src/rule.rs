//! Dependency rules: predicates deciding "must come before".
//!
//! A rule is evaluated on an ordered pair `(target, candidate)` and returns
//! `true` when `candidate` must be sequenced before `target`. Inside a
//! [`DependencySorter`](crate::DependencySorter) rules combine with logical
//! OR; a [`CompoundDependency`] combines its sub-rules with logical AND.

use std::sync::Arc;

use xtree_types::NodeRef;

/// A "must come before" predicate over pairs of items.
pub trait DependencyRule<T: ?Sized> {
    /// Returns `true` when `candidate` must be ordered before `target`.
    fn evaluate(&self, target: &T, candidate: &T) -> bool;
}

impl<T: ?Sized, F> DependencyRule<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    fn evaluate(&self, target: &T, candidate: &T) -> bool {
        self(target, candidate)
    }
}

/// A shared, type-erased rule as stored by sorters and compound rules.
pub type SharedRule<'r, T> = Arc<dyn DependencyRule<T> + 'r>;

/// Identity comparison of two shared rules.
pub(crate) fn same_rule<T: ?Sized>(
    a: &Arc<dyn DependencyRule<T> + '_>,
    b: &Arc<dyn DependencyRule<T> + '_>,
) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

// ---------------------------------------------------------------
// Item capabilities
// ---------------------------------------------------------------

/// Items with a position in a hierarchy.
pub trait Hierarchical {
    /// Whether `self` is a transitive ancestor of `other`.
    fn is_ancestor_of(&self, other: &Self) -> bool;
}

/// Items with a declared entity kind.
pub trait Classified {
    fn class(&self) -> &str;
}

impl Hierarchical for NodeRef<'_> {
    fn is_ancestor_of(&self, other: &Self) -> bool {
        NodeRef::is_ancestor_of(self, other)
    }
}

impl Classified for NodeRef<'_> {
    fn class(&self) -> &str {
        self.kind()
    }
}

// ---------------------------------------------------------------
// Rules
// ---------------------------------------------------------------

/// Logical AND of sub-rules. An empty compound is vacuously true.
pub struct CompoundDependency<'r, T: ?Sized> {
    rules: Vec<SharedRule<'r, T>>,
}

impl<'r, T: ?Sized> CompoundDependency<'r, T> {
    /// Create an empty compound rule.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Builder: add a sub-rule.
    pub fn with(mut self, rule: SharedRule<'r, T>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a sub-rule.
    pub fn push(&mut self, rule: SharedRule<'r, T>) {
        self.rules.push(rule);
    }

    /// Number of sub-rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if there are no sub-rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T: ?Sized> Default for CompoundDependency<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> DependencyRule<T> for CompoundDependency<'_, T> {
    fn evaluate(&self, target: &T, candidate: &T) -> bool {
        self.rules.iter().all(|r| r.evaluate(target, candidate))
    }
}

/// Ancestors come first: true when `candidate` is an ancestor of `target`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AncestorDependency;

impl<T: Hierarchical> DependencyRule<T> for AncestorDependency {
    fn evaluate(&self, target: &T, candidate: &T) -> bool {
        candidate.is_ancestor_of(target)
    }
}

/// Descendants come first: true when `candidate` is a descendant of `target`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DescendantDependency;

impl<T: Hierarchical> DependencyRule<T> for DescendantDependency {
    fn evaluate(&self, target: &T, candidate: &T) -> bool {
        target.is_ancestor_of(candidate)
    }
}

/// Kind ordering: items of class `dependent` come before items of class
/// `target`, regardless of tree position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDependency {
    target: String,
    dependent: String,
}

impl ClassDependency {
    /// Order every `dependent`-class item before every `target`-class item.
    pub fn new(target: impl Into<String>, dependent: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            dependent: dependent.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn dependent(&self) -> &str {
        &self.dependent
    }
}

impl<T: Classified> DependencyRule<T> for ClassDependency {
    fn evaluate(&self, target: &T, candidate: &T) -> bool {
        target.class() == self.target && candidate.class() == self.dependent
    }
}
