//! Primitive, reversible tree edits.
//!
//! An [`Operation`] names one edit and carries the prior state needed to
//! describe its reversal. Executing it against a live tree yields a
//! [`Memento`] recording what actually changed.

use std::fmt;

use serde::{Deserialize, Serialize};

use xtree_types::{Fragment, MutableTree, NodeId, TreeError, TreeResult, TreeView, Value};

use crate::memento::{expect_child, move_child, Memento};

/// The node an [`Operation::AddChild`] attaches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewChild {
    /// A detached node that already lives in the target tree.
    Existing(NodeId),
    /// Content to materialize as a new subtree on first application.
    Fragment(Fragment),
}

/// A single primitive tree edit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Create or overwrite an attribute.
    SetAttribute {
        node: NodeId,
        name: String,
        new_value: Value,
        old_value: Option<Value>,
    },
    /// Delete an attribute.
    RemoveAttribute {
        node: NodeId,
        name: String,
        old_value: Value,
    },
    /// Attach a child at `index` of `parent`.
    AddChild {
        parent: NodeId,
        child: NewChild,
        index: usize,
    },
    /// Detach `child`, found at `index` of `parent`.
    RemoveChild {
        parent: NodeId,
        child: NodeId,
        index: usize,
    },
    /// Move `child` from `old_parent[old_index]` to `new_parent[new_index]`.
    SetParent {
        child: NodeId,
        old_parent: NodeId,
        old_index: usize,
        new_parent: NodeId,
        new_index: usize,
    },
    /// Bind (`Some`) or unbind (`None`) a variable on a node scope.
    SetVariable {
        scope: NodeId,
        name: String,
        new_value: Option<Value>,
        old_value: Option<Value>,
    },
}

impl Operation {
    /// Stable snake_case name of the operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetAttribute { .. } => "set_attribute",
            Self::RemoveAttribute { .. } => "remove_attribute",
            Self::AddChild { .. } => "add_child",
            Self::RemoveChild { .. } => "remove_child",
            Self::SetParent { .. } => "set_parent",
            Self::SetVariable { .. } => "set_variable",
        }
    }

    /// The node the edit acts on (the parent for child-list edits).
    pub fn target(&self) -> NodeId {
        match self {
            Self::SetAttribute { node, .. } | Self::RemoveAttribute { node, .. } => *node,
            Self::AddChild { parent, .. } | Self::RemoveChild { parent, .. } => *parent,
            Self::SetParent { child, .. } => *child,
            Self::SetVariable { scope, .. } => *scope,
        }
    }

    /// Perform the edit and return the record needed to undo it.
    ///
    /// Old values in the memento come from the live tree at the moment of
    /// execution, not from the operation, so undo is exact even when the
    /// operation was built against a stale snapshot.
    pub fn execute<T: MutableTree + ?Sized>(&self, tree: &mut T) -> TreeResult<Memento> {
        match self {
            Self::SetAttribute {
                node,
                name,
                new_value,
                ..
            } => {
                let old = tree.set_attribute(*node, name, new_value.clone())?;
                Ok(Memento::SetAttribute {
                    node: *node,
                    name: name.clone(),
                    old,
                    new: new_value.clone(),
                })
            }
            Self::RemoveAttribute { node, name, .. } => {
                let old = tree
                    .remove_attribute(*node, name)?
                    .ok_or_else(|| TreeError::AttributeMissing {
                        node: *node,
                        name: name.clone(),
                    })?;
                Ok(Memento::RemoveAttribute {
                    node: *node,
                    name: name.clone(),
                    old,
                })
            }
            Self::AddChild {
                parent,
                child,
                index,
            } => {
                let child = match child {
                    NewChild::Existing(id) => *id,
                    NewChild::Fragment(fragment) => {
                        // Check the slot before materializing anything.
                        if !tree.contains(*parent) {
                            return Err(TreeError::NodeNotFound(*parent));
                        }
                        let len = tree.children(*parent).len();
                        if *index > len {
                            return Err(TreeError::IndexOutOfBounds {
                                parent: *parent,
                                index: *index,
                                len,
                            });
                        }
                        tree.insert_fragment(fragment)?
                    }
                };
                tree.add_child(*parent, child, *index)?;
                Ok(Memento::AddChild {
                    parent: *parent,
                    child,
                    index: *index,
                })
            }
            Self::RemoveChild {
                parent,
                child,
                index,
            } => {
                expect_child(tree, *parent, *index, *child)?;
                tree.remove_child(*parent, *index)?;
                Ok(Memento::RemoveChild {
                    parent: *parent,
                    child: *child,
                    index: *index,
                })
            }
            Self::SetParent {
                child,
                old_parent,
                old_index,
                new_parent,
                new_index,
            } => {
                move_child(tree, *child, (*old_parent, *old_index), (*new_parent, *new_index))?;
                Ok(Memento::SetParent {
                    child: *child,
                    old_parent: *old_parent,
                    old_index: *old_index,
                    new_parent: *new_parent,
                    new_index: *new_index,
                })
            }
            Self::SetVariable {
                scope,
                name,
                new_value,
                ..
            } => {
                let old = match new_value {
                    Some(value) => tree.set_variable(*scope, name, value.clone())?,
                    None => tree.remove_variable(*scope, name)?,
                };
                Ok(Memento::Variable {
                    scope: *scope,
                    name: name.clone(),
                    old,
                    new: new_value.clone(),
                })
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetAttribute {
                node,
                name,
                new_value,
                old_value: Some(old),
            } => write!(f, "set {node}@{name:?}: {old} -> {new_value}"),
            Self::SetAttribute {
                node,
                name,
                new_value,
                old_value: None,
            } => write!(f, "set {node}@{name:?} = {new_value}"),
            Self::RemoveAttribute {
                node,
                name,
                old_value,
            } => write!(f, "remove {node}@{name:?} (was {old_value})"),
            Self::AddChild {
                parent,
                child: NewChild::Existing(id),
                index,
            } => write!(f, "add {id} to {parent}[{index}]"),
            Self::AddChild {
                parent,
                child: NewChild::Fragment(fragment),
                index,
            } => write!(
                f,
                "add <{}> ({} nodes) to {parent}[{index}]",
                fragment.kind,
                fragment.node_count()
            ),
            Self::RemoveChild {
                parent,
                child,
                index,
            } => write!(f, "remove {child} from {parent}[{index}]"),
            Self::SetParent {
                child,
                old_parent,
                old_index,
                new_parent,
                new_index,
            } => write!(
                f,
                "move {child} from {old_parent}[{old_index}] to {new_parent}[{new_index}]"
            ),
            Self::SetVariable {
                scope,
                name,
                new_value: Some(value),
                ..
            } => write!(f, "bind ${name} = {value} on {scope}"),
            Self::SetVariable {
                scope,
                name,
                new_value: None,
                ..
            } => write!(f, "unbind ${name} on {scope}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use xtree_types::{Document, TreeView};

    #[test]
    fn kinds_and_targets() {
        let op = Operation::RemoveChild {
            parent: NodeId::new(1),
            child: NodeId::new(4),
            index: 0,
        };
        assert_eq!(op.kind(), "remove_child");
        assert_eq!(op.target(), NodeId::new(1));
    }

    #[test]
    fn json_is_internally_tagged() {
        let op = Operation::SetAttribute {
            node: NodeId::new(2),
            name: "title".into(),
            new_value: json!("Dune"),
            old_value: None,
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({ "op": "set_attribute", "node": 2, "name": "title", "new_value": "Dune", "old_value": null })
        );

        let add = Operation::AddChild {
            parent: NodeId::new(0),
            child: NewChild::Fragment(Fragment::new("leaf")),
            index: 3,
        };
        let back: Operation = serde_json::from_value(serde_json::to_value(&add).unwrap()).unwrap();
        assert_eq!(back, add);
    }

    #[test]
    fn display_is_readable() {
        let op = Operation::SetParent {
            child: NodeId::new(5),
            old_parent: NodeId::new(1),
            old_index: 0,
            new_parent: NodeId::new(2),
            new_index: 3,
        };
        assert_eq!(op.to_string(), "move #5 from #1[0] to #2[3]");
    }

    #[test]
    fn execute_records_live_old_value() {
        let mut doc = Document::new();
        let n = doc.create_node("n");
        doc.set_attribute(n, "x", json!("live")).unwrap();

        // The operation's own old value is stale; the memento must not be.
        let op = Operation::SetAttribute {
            node: n,
            name: "x".into(),
            new_value: json!("new"),
            old_value: Some(json!("stale")),
        };
        let memento = op.execute(&mut doc).unwrap();
        assert_eq!(
            memento,
            Memento::SetAttribute {
                node: n,
                name: "x".into(),
                old: Some(json!("live")),
                new: json!("new"),
            }
        );
        assert_eq!(doc.attribute(n, "x"), Some(&json!("new")));
    }

    #[test]
    fn remove_missing_attribute_fails() {
        let mut doc = Document::new();
        let n = doc.create_node("n");
        let op = Operation::RemoveAttribute {
            node: n,
            name: "gone".into(),
            old_value: json!(1),
        };
        assert_eq!(
            op.execute(&mut doc),
            Err(TreeError::AttributeMissing { node: n, name: "gone".into() })
        );
    }

    #[test]
    fn add_fragment_materializes_subtree() {
        let mut doc = Document::new();
        let root = doc.create_node("root");
        let op = Operation::AddChild {
            parent: root,
            child: NewChild::Fragment(Fragment::new("a").with_child(Fragment::new("b"))),
            index: 0,
        };
        let child = match op.execute(&mut doc).unwrap() {
            Memento::AddChild { child, .. } => child,
            other => panic!("expected AddChild memento, got {other:?}"),
        };
        assert_eq!(doc.children(root), &[child]);
        assert_eq!(doc.kind(child), Some("a"));
        assert_eq!(doc.children(child).len(), 1);
    }
}
