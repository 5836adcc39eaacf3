use std::collections::BTreeSet;
use std::fmt;

use crate::error::TreeResult;
use crate::fragment::Fragment;
use crate::node::{NodeId, Value, VALUE_ATTRIBUTE};

/// Read access to a node tree.
///
/// All implementations must satisfy these invariants:
/// - The tree is acyclic and a node has at most one parent at any time.
/// - `children(p)` lists exactly the nodes whose `parent` is `p`, in order.
/// - Attribute names are unique per node.
/// - Queries on an unknown node return `None` or an empty result, never panic.
pub trait TreeView {
    /// Whether the node exists in this host (attached or not).
    fn contains(&self, node: NodeId) -> bool;

    /// The node's type tag.
    fn kind(&self, node: NodeId) -> Option<&str>;

    /// The node's parent, or `None` for roots and detached nodes.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// The node's ordered children.
    fn children(&self, node: NodeId) -> &[NodeId];

    /// The node's attribute names in ascending order.
    fn attribute_names(&self, node: NodeId) -> Vec<&str>;

    /// A single attribute value.
    fn attribute(&self, node: NodeId, name: &str) -> Option<&Value>;

    /// A variable bound on the node's scope.
    fn variable(&self, scope: NodeId, name: &str) -> Option<&Value>;
}

/// Mutation access to a node tree.
///
/// These are the raw edits the change-set engine drives. They do not
/// notify observers; notification is the host's concern.
pub trait MutableTree: TreeView {
    /// Create a new detached node.
    fn create_node(&mut self, kind: &str) -> NodeId;

    /// Set an attribute, returning the previous value.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: Value) -> TreeResult<Option<Value>>;

    /// Remove an attribute, returning the removed value (`None` if absent).
    fn remove_attribute(&mut self, node: NodeId, name: &str) -> TreeResult<Option<Value>>;

    /// Attach a detached `child` under `parent` at `index` (`index <= len`).
    ///
    /// Fails if the child already has a parent or if the edit would make a
    /// node its own ancestor.
    fn add_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> TreeResult<()>;

    /// Detach and return the child at `index`. The node itself survives.
    fn remove_child(&mut self, parent: NodeId, index: usize) -> TreeResult<NodeId>;

    /// Bind a variable on a scope, returning the previous binding.
    fn set_variable(&mut self, scope: NodeId, name: &str, value: Value) -> TreeResult<Option<Value>>;

    /// Unbind a variable, returning the removed binding (`None` if unbound).
    fn remove_variable(&mut self, scope: NodeId, name: &str) -> TreeResult<Option<Value>>;

    /// Materialize a fragment as a new detached subtree and return its root.
    fn insert_fragment(&mut self, fragment: &Fragment) -> TreeResult<NodeId> {
        let id = self.create_node(&fragment.kind);
        for (name, value) in &fragment.attributes {
            self.set_attribute(id, name, value.clone())?;
        }
        for (index, child) in fragment.children.iter().enumerate() {
            let child_id = self.insert_fragment(child)?;
            self.add_child(id, child_id, index)?;
        }
        Ok(id)
    }
}

/// A node handle: a tree host plus a node id.
///
/// `NodeRef` is the currency of matchers and dependency rules, which need
/// to look at a node without knowing which host it lives in.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a dyn TreeView,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    /// Create a handle for `id` in `tree`.
    pub fn new(tree: &'a dyn TreeView, id: NodeId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a dyn TreeView {
        self.tree
    }

    /// The type tag, or the empty string for an unknown node.
    pub fn kind(&self) -> &'a str {
        self.tree.kind(self.id).unwrap_or("")
    }

    pub fn attribute(&self, name: &str) -> Option<&'a Value> {
        self.tree.attribute(self.id, name)
    }

    pub fn attribute_names(&self) -> Vec<&'a str> {
        self.tree.attribute_names(self.id)
    }

    /// The scalar value (the empty-name attribute).
    pub fn value(&self) -> Option<&'a Value> {
        self.attribute(VALUE_ATTRIBUTE)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree.parent(self.id).map(|p| NodeRef::new(self.tree, p))
    }

    pub fn child_count(&self) -> usize {
        self.tree.children(self.id).len()
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.children(self.id).iter().map(move |&c| NodeRef::new(tree, c))
    }

    /// Parent, grandparent, and so on up to the root.
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors { next: self.parent() }
    }

    /// Whether both handles name the same node of the same host.
    pub fn is_same(&self, other: &NodeRef<'_>) -> bool {
        self.id == other.id && std::ptr::addr_eq(self.tree, other.tree)
    }

    /// Whether `self` is a transitive ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &NodeRef<'_>) -> bool {
        other.ancestors().any(|a| a.is_same(self))
    }

    /// Whether `self` is a transitive descendant of `other`.
    pub fn is_descendant_of(&self, other: &NodeRef<'_>) -> bool {
        other.is_ancestor_of(self)
    }

    /// Snapshot this subtree as an owned fragment.
    pub fn to_fragment(&self) -> Fragment {
        let mut fragment = Fragment::new(self.kind());
        for name in self.attribute_names() {
            if let Some(value) = self.attribute(name) {
                fragment.attributes.insert(name.to_string(), value.clone());
            }
        }
        fragment.children = self.children().map(|c| c.to_fragment()).collect();
        fragment
    }

    /// Structural equality of two subtrees: kind, attributes, and children
    /// compared in order.
    pub fn deep_eq(&self, other: &NodeRef<'_>) -> bool {
        self.deep_eq_except(other, &BTreeSet::new())
    }

    /// Like [`deep_eq`](Self::deep_eq), skipping the named attributes.
    pub fn deep_eq_except(&self, other: &NodeRef<'_>, ignored: &BTreeSet<String>) -> bool {
        if self.kind() != other.kind() || self.child_count() != other.child_count() {
            return false;
        }
        let lhs_names: Vec<&str> = self
            .attribute_names()
            .into_iter()
            .filter(|n| !ignored.contains(*n))
            .collect();
        let rhs_names: Vec<&str> = other
            .attribute_names()
            .into_iter()
            .filter(|n| !ignored.contains(*n))
            .collect();
        if lhs_names != rhs_names {
            return false;
        }
        if lhs_names
            .iter()
            .any(|name| self.attribute(name) != other.attribute(name))
        {
            return false;
        }
        self.children()
            .zip(other.children())
            .all(|(l, r)| l.deep_eq_except(&r, ignored))
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}>", self.kind(), self.id)
    }
}

/// Iterator over a node's ancestors, nearest first.
pub struct Ancestors<'a> {
    next: Option<NodeRef<'a>>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}
