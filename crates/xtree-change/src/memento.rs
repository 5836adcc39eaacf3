//! Undo records for executed operations.
//!
//! One [`Memento`] variant per [`Operation`](crate::Operation) kind. Each
//! holds exactly the state needed to undo (`revert`) and redo (`restore`)
//! its edit. Child-list mementos hold the node ids that were actually
//! attached or detached, so redo re-attaches the very same nodes rather
//! than building new ones.

use serde::{Deserialize, Serialize};

use xtree_types::{MutableTree, NodeId, TreeError, TreeResult, TreeView, Value};

/// The recorded effect of one executed operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "memento", rename_all = "snake_case")]
pub enum Memento {
    SetAttribute {
        node: NodeId,
        name: String,
        old: Option<Value>,
        new: Value,
    },
    RemoveAttribute {
        node: NodeId,
        name: String,
        old: Value,
    },
    AddChild {
        parent: NodeId,
        child: NodeId,
        index: usize,
    },
    RemoveChild {
        parent: NodeId,
        child: NodeId,
        index: usize,
    },
    SetParent {
        child: NodeId,
        old_parent: NodeId,
        old_index: usize,
        new_parent: NodeId,
        new_index: usize,
    },
    /// Scope-variable binding; orthogonal to the node edits above.
    Variable {
        scope: NodeId,
        name: String,
        old: Option<Value>,
        new: Option<Value>,
    },
}

impl Memento {
    /// Stable snake_case name, matching the originating operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetAttribute { .. } => "set_attribute",
            Self::RemoveAttribute { .. } => "remove_attribute",
            Self::AddChild { .. } => "add_child",
            Self::RemoveChild { .. } => "remove_child",
            Self::SetParent { .. } => "set_parent",
            Self::Variable { .. } => "set_variable",
        }
    }

    /// Undo the edit. The tree must be in the state the edit left it in.
    pub fn revert<T: MutableTree + ?Sized>(&self, tree: &mut T) -> TreeResult<()> {
        match self {
            Self::SetAttribute { node, name, old, .. } => {
                put_attribute(tree, *node, name, old.as_ref())
            }
            Self::RemoveAttribute { node, name, old } => {
                tree.set_attribute(*node, name, old.clone()).map(drop)
            }
            Self::AddChild {
                parent,
                child,
                index,
            } => {
                expect_child(tree, *parent, *index, *child)?;
                tree.remove_child(*parent, *index).map(drop)
            }
            Self::RemoveChild {
                parent,
                child,
                index,
            } => tree.add_child(*parent, *child, *index),
            Self::SetParent {
                child,
                old_parent,
                old_index,
                new_parent,
                new_index,
            } => move_child(tree, *child, (*new_parent, *new_index), (*old_parent, *old_index)),
            Self::Variable {
                scope, name, old, ..
            } => put_variable(tree, *scope, name, old.as_ref()),
        }
    }

    /// Redo the edit. The tree must be in the state the edit started from.
    pub fn restore<T: MutableTree + ?Sized>(&self, tree: &mut T) -> TreeResult<()> {
        match self {
            Self::SetAttribute { node, name, new, .. } => {
                tree.set_attribute(*node, name, new.clone()).map(drop)
            }
            Self::RemoveAttribute { node, name, .. } => {
                tree.remove_attribute(*node, name).map(drop)
            }
            Self::AddChild {
                parent,
                child,
                index,
            } => tree.add_child(*parent, *child, *index),
            Self::RemoveChild {
                parent,
                child,
                index,
            } => {
                expect_child(tree, *parent, *index, *child)?;
                tree.remove_child(*parent, *index).map(drop)
            }
            Self::SetParent {
                child,
                old_parent,
                old_index,
                new_parent,
                new_index,
            } => move_child(tree, *child, (*old_parent, *old_index), (*new_parent, *new_index)),
            Self::Variable {
                scope, name, new, ..
            } => put_variable(tree, *scope, name, new.as_ref()),
        }
    }
}

/// Fail unless `child` sits at `parent[index]`.
pub(crate) fn expect_child<T: TreeView + ?Sized>(
    tree: &T,
    parent: NodeId,
    index: usize,
    child: NodeId,
) -> TreeResult<()> {
    if !tree.contains(parent) {
        return Err(TreeError::NodeNotFound(parent));
    }
    let found = tree.children(parent).get(index).copied();
    if found != Some(child) {
        return Err(TreeError::ChildMismatch {
            parent,
            index,
            expected: child,
            found,
        });
    }
    Ok(())
}

/// Detach `child` from `from` and attach it at `to`, as one edit.
///
/// If the attach fails the child is put back where it was, so a failed
/// move leaves the tree unchanged.
pub(crate) fn move_child<T: MutableTree + ?Sized>(
    tree: &mut T,
    child: NodeId,
    from: (NodeId, usize),
    to: (NodeId, usize),
) -> TreeResult<()> {
    expect_child(tree, from.0, from.1, child)?;
    tree.remove_child(from.0, from.1)?;
    if let Err(err) = tree.add_child(to.0, child, to.1) {
        tree.add_child(from.0, child, from.1)?;
        return Err(err);
    }
    Ok(())
}

fn put_attribute<T: MutableTree + ?Sized>(
    tree: &mut T,
    node: NodeId,
    name: &str,
    value: Option<&Value>,
) -> TreeResult<()> {
    match value {
        Some(v) => tree.set_attribute(node, name, v.clone()).map(drop),
        None => tree.remove_attribute(node, name).map(drop),
    }
}

fn put_variable<T: MutableTree + ?Sized>(
    tree: &mut T,
    scope: NodeId,
    name: &str,
    value: Option<&Value>,
) -> TreeResult<()> {
    match value {
        Some(v) => tree.set_variable(scope, name, v.clone()).map(drop),
        None => tree.remove_variable(scope, name).map(drop),
    }
}
