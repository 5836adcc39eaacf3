//! Error types for change-set application.

use xtree_types::TreeError;

/// Errors raised while applying, reverting, or restoring a change set.
///
/// Each variant names the position of the failing operation in the change
/// set and its kind. Work done before the failure is left in place.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChangeError {
    /// An operation could not be executed against the tree.
    #[error("operation {index} ({kind}) could not be applied: {source}")]
    Apply {
        index: usize,
        kind: &'static str,
        source: TreeError,
    },

    /// A recorded edit could not be undone.
    #[error("operation {index} ({kind}) could not be reverted: {source}")]
    Revert {
        index: usize,
        kind: &'static str,
        source: TreeError,
    },

    /// A reverted edit could not be redone.
    #[error("operation {index} ({kind}) could not be restored: {source}")]
    Restore {
        index: usize,
        kind: &'static str,
        source: TreeError,
    },
}

impl ChangeError {
    /// Position of the failing operation within the change set.
    pub fn index(&self) -> usize {
        match self {
            Self::Apply { index, .. } | Self::Revert { index, .. } | Self::Restore { index, .. } => *index,
        }
    }

    /// Kind of the failing operation.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Apply { kind, .. } | Self::Revert { kind, .. } | Self::Restore { kind, .. } => kind,
        }
    }
}

/// A serialized change set whose undo log does not fit its operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("{mementos} undo records for only {operations} operations")]
    TooManyMementos { operations: usize, mementos: usize },

    #[error("{applied} edits marked as applied but only {mementos} recorded")]
    CursorOutOfRange { mementos: usize, applied: usize },

    #[error("undo record {index} is {memento} but operation {index} is {operation}")]
    KindMismatch {
        index: usize,
        memento: &'static str,
        operation: &'static str,
    },
}

/// Convenience alias for change-set results.
pub type ChangeResult<T> = Result<T, ChangeError>;
