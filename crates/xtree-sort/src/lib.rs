//! Dependency-based ordering for XTree.
//!
//! Orders an arbitrary collection of items given pairwise "must come
//! before" predicates. Used ahead of a diff or serialization pass so that
//! dependent entities are processed before (or after) the entities they
//! refer to.

pub mod error;
pub mod rule;
pub mod sorter;

pub use error::{SortError, SortResult};
pub use rule::{
    AncestorDependency, ClassDependency, Classified, CompoundDependency, DependencyRule,
    DescendantDependency, Hierarchical, SharedRule,
};
pub use sorter::DependencySorter;
