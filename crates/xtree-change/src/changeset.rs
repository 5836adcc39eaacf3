use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use xtree_types::MutableTree;

use crate::error::{ChangeError, ChangeResult, LogError};
use crate::memento::Memento;
use crate::operation::Operation;

/// An ordered, reversible batch of tree edits.
///
/// Operations are queued with [`add`](Self::add) and executed by
/// [`apply_changes`](Self::apply_changes). Every executed operation leaves a
/// [`Memento`] behind; `mementos[i]` always belongs to `operations[i]`. The
/// cursor `applied` counts how many of those mementos are currently in
/// effect on the tree, so the set can be reverted and restored any number
/// of times.
///
/// A change set does not remember which tree it was applied to. Callers
/// must revert and restore against the same tree they applied to.
///
/// Deserialization checks the log against the operations and rejects a
/// set whose mementos or cursor do not fit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawChangeSet")]
pub struct ChangeSet {
    operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    mementos: Vec<Memento>,
    #[serde(default)]
    applied: usize,
}

/// Wire shape of a [`ChangeSet`], before validation.
#[derive(Deserialize)]
struct RawChangeSet {
    operations: Vec<Operation>,
    #[serde(default)]
    mementos: Vec<Memento>,
    #[serde(default)]
    applied: usize,
}

impl TryFrom<RawChangeSet> for ChangeSet {
    type Error = LogError;

    fn try_from(raw: RawChangeSet) -> Result<Self, LogError> {
        let RawChangeSet {
            operations,
            mementos,
            applied,
        } = raw;
        if mementos.len() > operations.len() {
            return Err(LogError::TooManyMementos {
                operations: operations.len(),
                mementos: mementos.len(),
            });
        }
        if applied > mementos.len() {
            return Err(LogError::CursorOutOfRange {
                mementos: mementos.len(),
                applied,
            });
        }
        let mismatch = mementos
            .iter()
            .zip(&operations)
            .position(|(m, op)| m.kind() != op.kind());
        if let Some(index) = mismatch {
            return Err(LogError::KindMismatch {
                index,
                memento: mementos[index].kind(),
                operation: operations[index].kind(),
            });
        }
        Ok(Self {
            operations,
            mementos,
            applied,
        })
    }
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an operation. Nothing touches the tree until the next apply.
    pub fn add(&mut self, operation: Operation) {
        trace!(index = self.operations.len(), kind = operation.kind(), "queue operation");
        self.operations.push(operation);
    }

    /// Number of operations in the set.
    pub fn size(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if no operation is queued.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// The queued operations, in application order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Undo records for every operation executed so far.
    pub fn mementos(&self) -> &[Memento] {
        &self.mementos
    }

    /// Number of executed operations whose effect is currently on the tree.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Returns `true` if every operation is executed and in effect.
    pub fn is_fully_applied(&self) -> bool {
        self.applied == self.operations.len()
    }

    /// Bring the tree to the state after the last operation.
    ///
    /// Reverted edits are restored first, then operations never executed
    /// before are executed in order. On failure the error names the failing
    /// operation; everything before it stays applied.
    pub fn apply_changes<T: MutableTree + ?Sized>(&mut self, tree: &mut T) -> ChangeResult<()> {
        self.restore(tree)?;

        let start = self.mementos.len();
        for (index, operation) in self.operations.iter().enumerate().skip(start) {
            let memento = operation.execute(tree).map_err(|source| ChangeError::Apply {
                index,
                kind: operation.kind(),
                source,
            })?;
            trace!(index, kind = operation.kind(), "applied");
            self.mementos.push(memento);
            self.applied += 1;
        }

        debug!(
            executed = self.operations.len() - start,
            total = self.operations.len(),
            "change set applied"
        );
        Ok(())
    }

    /// Undo every edit currently in effect, last first.
    ///
    /// Undo goes through the raw mutation API and re-derives nothing: each
    /// step replays the old state its memento captured.
    pub fn revert<T: MutableTree + ?Sized>(&mut self, tree: &mut T) -> ChangeResult<()> {
        let count = self.applied;
        while self.applied > 0 {
            let index = self.applied - 1;
            let memento = &self.mementos[index];
            memento.revert(tree).map_err(|source| ChangeError::Revert {
                index,
                kind: memento.kind(),
                source,
            })?;
            self.applied = index;
        }
        debug!(reverted = count, "change set reverted");
        Ok(())
    }

    /// Redo every previously reverted edit, first first.
    ///
    /// Operations that were never executed are left alone; use
    /// [`apply_changes`](Self::apply_changes) for those.
    pub fn restore<T: MutableTree + ?Sized>(&mut self, tree: &mut T) -> ChangeResult<()> {
        let count = self.mementos.len() - self.applied;
        while self.applied < self.mementos.len() {
            let index = self.applied;
            let memento = &self.mementos[index];
            memento.restore(tree).map_err(|source| ChangeError::Restore {
                index,
                kind: memento.kind(),
                source,
            })?;
            self.applied += 1;
        }
        if count > 0 {
            debug!(restored = count, "change set restored");
        }
        Ok(())
    }

    /// Forget all operations and mementos. The tree is not touched.
    pub fn clear_changes(&mut self) {
        debug!(discarded = self.operations.len(), "change set cleared");
        self.operations.clear();
        self.mementos.clear();
        self.applied = 0;
    }
}

impl Extend<Operation> for ChangeSet {
    fn extend<I: IntoIterator<Item = Operation>>(&mut self, iter: I) {
        for operation in iter {
            self.add(operation);
        }
    }
}

impl FromIterator<Operation> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, operation) in self.operations.iter().enumerate() {
            writeln!(f, "{index:>4}  {operation}")?;
        }
        Ok(())
    }
}
