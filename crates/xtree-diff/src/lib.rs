//! Diff engine for XTree.
//!
//! Aligns ordered sequences, pairs nodes across trees, and compares whole
//! trees, emitting the differences as a reversible
//! [`ChangeSet`](xtree_change::ChangeSet).
//!
//! # Key Types
//!
//! - [`SequenceDiffer`] / [`Run`] / [`SequenceReceiver`] -- Sequence alignment as maximal equal/insert/remove runs
//! - [`NodeMatcher`] / [`KeyedMatcher`] / [`OrderedMatcher`] -- Cross-tree node identity
//! - [`TreeDiffer`] -- Recursive tree comparison and change-set construction
//! - [`DiffConfig`] -- Matching mode, key attribute, algorithm, move detection, ignored attributes

pub mod config;
pub mod error;
pub mod matcher;
pub mod sequence;
pub mod tree_diff;

pub use config::{DiffConfig, MatchMode, SequenceAlgorithm};
pub use error::{DiffError, DiffResult};
pub use matcher::{KeyedMatcher, NodeKey, NodeMatcher, OrderedMatcher};
pub use sequence::{Run, SequenceDiffer, SequenceReceiver};
pub use tree_diff::TreeDiffer;
