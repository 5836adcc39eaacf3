//! The dependency sorter: a stable, stack-based topological ordering.
//!
//! [`DependencySorter`] holds a set of [`DependencyRule`]s and orders any
//! collection so that, for every pair where some rule says `candidate` must
//! come before `target`, it does.
//!
//! # Algorithm
//!
//! Items are taken from a working list in input order. Each taken item is
//! pushed on a work stack; while the stack is non-empty the top item's
//! dependents are searched for in the remaining working list. A found
//! dependent is moved onto the stack and becomes the new top. When the top
//! has no dependents left it is popped and emitted. Items that no rule
//! relates keep their relative input order.
//!
//! The traversal is iterative, so deep dependency chains never grow the
//! call stack. A rule requiring an item that is already on the stack is a
//! cycle and fails with [`SortError::CyclicDependency`].

use tracing::{debug, trace};

use crate::error::{SortError, SortResult};
use crate::rule::{same_rule, SharedRule};

/// Orders items by a set of OR-combined dependency rules.
pub struct DependencySorter<'r, T: ?Sized> {
    rules: Vec<SharedRule<'r, T>>,
}

impl<'r, T: ?Sized> DependencySorter<'r, T> {
    /// Create a sorter with no rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register a rule. Returns `false` (and does nothing) if this exact
    /// rule instance is already registered.
    pub fn add(&mut self, rule: SharedRule<'r, T>) -> bool {
        if self.contains(&rule) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    /// Unregister a rule instance. Returns `true` if it was registered.
    pub fn remove(&mut self, rule: &SharedRule<'r, T>) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| !same_rule(r, rule));
        self.rules.len() != before
    }

    /// Whether this exact rule instance is registered.
    pub fn contains(&self, rule: &SharedRule<'r, T>) -> bool {
        self.rules.iter().any(|r| same_rule(r, rule))
    }

    /// Number of registered rules.
    pub fn count(&self) -> usize {
        self.rules.len()
    }

    /// Whether any rule orders `candidate` before `target`.
    pub fn depends(&self, target: &T, candidate: &T) -> bool {
        self.rules.iter().any(|r| r.evaluate(target, candidate))
    }
}

impl<'r, T> DependencySorter<'r, T> {
    /// Order `items` so that every dependent precedes its target.
    ///
    /// The output is a permutation of the input. With no rules registered
    /// it is the input order.
    pub fn sort<I>(&self, items: I) -> SortResult<Vec<T>>
    where
        I: IntoIterator<Item = T>,
    {
        let items: Vec<T> = items.into_iter().collect();
        let order = self.order(&items)?;

        let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
        Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
    }

    /// The sorted order as indices into `items`.
    pub fn order(&self, items: &[T]) -> SortResult<Vec<usize>> {
        let mut remaining: Vec<usize> = (0..items.len()).collect();
        let mut stack: Vec<usize> = Vec::new();
        let mut order = Vec::with_capacity(items.len());

        if self.rules.is_empty() {
            debug!(items = items.len(), "no dependency rules; keeping input order");
            return Ok(remaining);
        }

        while !remaining.is_empty() {
            let first = remaining.remove(0);
            self.push(items, &mut stack, first)?;

            while let Some(&top) = stack.last() {
                let target = &items[top];
                match remaining
                    .iter()
                    .position(|&c| self.depends(target, &items[c]))
                {
                    Some(pos) => {
                        let dependent = remaining.remove(pos);
                        trace!(target = top, dependent, "dependent found");
                        self.push(items, &mut stack, dependent)?;
                    }
                    None => {
                        stack.pop();
                        order.push(top);
                    }
                }
            }
        }

        debug!(items = items.len(), rules = self.rules.len(), "sorted by dependency");
        Ok(order)
    }

    /// Push `index` on the work stack, failing if it must follow an item
    /// that is already waiting on the stack.
    fn push(&self, items: &[T], stack: &mut Vec<usize>, index: usize) -> SortResult<()> {
        let target = &items[index];
        if let Some(&dependent) = stack.iter().find(|&&s| self.depends(target, &items[s])) {
            return Err(SortError::CyclicDependency {
                target: index,
                dependent,
            });
        }
        stack.push(index);
        Ok(())
    }
}

impl<T: ?Sized> Default for DependencySorter<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}
