//! Error types for the diff crate.

use xtree_types::{NodeId, TreeError};

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A node was reached twice while walking a tree.
    #[error("malformed tree: node {0} is its own ancestor or has more than one parent")]
    MalformedTree(NodeId),

    /// The roots have different kinds, so no edit script can turn one into
    /// the other in place.
    #[error("incompatible roots: cannot patch <{lhs}> into <{rhs}>")]
    IncompatibleRoots { lhs: String, rhs: String },

    /// A root handed to the differ does not exist in its host.
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    /// Configuration text could not be parsed.
    #[error("invalid diff configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
