//! Reversible change sets for XTree.
//!
//! A [`ChangeSet`] is an ordered batch of primitive tree edits
//! ([`Operation`]s). Applying it executes each edit through the host's raw
//! mutation API and keeps a [`Memento`] per edit, so the whole batch can be
//! reverted and restored without re-deriving any old state.
//!
//! ```
//! use serde_json::json;
//! use xtree_change::{ChangeSet, Operation};
//! use xtree_types::{Document, Fragment, TreeView};
//!
//! let (mut doc, root) = Document::from_fragment(&Fragment::new("book"));
//! let mut set = ChangeSet::new();
//! set.add(Operation::SetAttribute {
//!     node: root,
//!     name: "title".into(),
//!     new_value: json!("Dune"),
//!     old_value: None,
//! });
//! set.apply_changes(&mut doc).unwrap();
//! assert_eq!(doc.attribute(root, "title"), Some(&json!("Dune")));
//! set.revert(&mut doc).unwrap();
//! assert_eq!(doc.attribute(root, "title"), None);
//! ```

pub mod changeset;
pub mod error;
pub mod memento;
pub mod operation;

pub use changeset::ChangeSet;
pub use error::{ChangeError, ChangeResult, LogError};
pub use memento::Memento;
pub use operation::{NewChild, Operation};
