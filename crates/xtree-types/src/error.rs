use thiserror::Error;

use crate::node::NodeId;

/// Errors produced by tree capability calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("child index {index} out of bounds for {parent} ({len} children)")]
    IndexOutOfBounds {
        parent: NodeId,
        index: usize,
        len: usize,
    },

    #[error("node {0} is already attached to a parent")]
    AlreadyAttached(NodeId),

    #[error("attaching {child} under {parent} would create a cycle")]
    WouldCycle { parent: NodeId, child: NodeId },

    #[error("expected {expected} at index {index} of {parent}, found {found:?}")]
    ChildMismatch {
        parent: NodeId,
        index: usize,
        expected: NodeId,
        found: Option<NodeId>,
    },

    #[error("attribute {name:?} not present on {node}")]
    AttributeMissing { node: NodeId, name: String },

    #[error("variable {name:?} not bound on {scope}")]
    VariableMissing { scope: NodeId, name: String },
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
