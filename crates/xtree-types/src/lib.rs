//! Foundation types for XTree.
//!
//! This crate defines the node capability surface the diff, change-set, and
//! sorting engines consume, plus an in-memory host that implements it. Every
//! other XTree crate depends on `xtree-types`.
//!
//! # Key Types
//!
//! - [`NodeId`] -- Opaque node identity within a tree host
//! - [`TreeView`] / [`MutableTree`] -- Read and raw-mutation capabilities of a host
//! - [`NodeRef`] -- A (host, id) handle used by matchers and dependency rules
//! - [`Fragment`] -- Owned, detached subtree snapshot (also the JSON file format)
//! - [`Document`] -- Arena-backed in-memory host

pub mod document;
pub mod error;
pub mod fragment;
pub mod node;
pub mod tree;

pub use document::Document;
pub use error::{TreeError, TreeResult};
pub use fragment::Fragment;
pub use node::{value_text, NodeId, Value, VALUE_ATTRIBUTE};
pub use tree::{Ancestors, MutableTree, NodeRef, TreeView};
