use std::collections::BTreeMap;

use crate::error::{TreeError, TreeResult};
use crate::fragment::Fragment;
use crate::node::{NodeId, Value, VALUE_ATTRIBUTE};
use crate::tree::{MutableTree, NodeRef, TreeView};

#[derive(Clone, Debug, Default)]
struct Slot {
    kind: String,
    attributes: BTreeMap<String, Value>,
    variables: BTreeMap<String, Value>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// In-memory, arena-backed node tree.
///
/// Intended for tests, tooling, and embedding. Nodes live in a `Vec` and
/// are addressed by [`NodeId`]; parent links are ids rather than
/// references, so detaching and reattaching never leaves anything dangling.
/// Slots are never freed: a removed child stays addressable, detached.
#[derive(Clone, Debug, Default)]
pub struct Document {
    slots: Vec<Slot>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document holding one tree and return it with the root id.
    pub fn from_fragment(fragment: &Fragment) -> (Self, NodeId) {
        let mut doc = Self::new();
        let root = doc.build(fragment);
        (doc, root)
    }

    /// Number of node slots, attached or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no node was ever created.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// A handle to `id` for matcher and rule APIs.
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef::new(self, id)
    }

    /// Snapshot the subtree rooted at `id`.
    pub fn to_fragment(&self, id: NodeId) -> Option<Fragment> {
        self.contains(id).then(|| self.node(id).to_fragment())
    }

    /// The scalar value of a node.
    pub fn value(&self, id: NodeId) -> Option<&Value> {
        self.attribute(id, VALUE_ATTRIBUTE)
    }

    /// All nodes of the subtree rooted at `id`, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Builds a fragment without any fallible checks: every node created
    /// here is fresh, so attachment can neither cycle nor double-parent.
    fn build(&mut self, fragment: &Fragment) -> NodeId {
        let id = self.create_node(&fragment.kind);
        self.slots[id.index()].attributes = fragment.attributes.clone();
        for child in &fragment.children {
            let child_id = self.build(child);
            self.slots[child_id.index()].parent = Some(id);
            self.slots[id.index()].children.push(child_id);
        }
        id
    }

    fn slot(&self, id: NodeId) -> TreeResult<&Slot> {
        self.slots.get(id.index()).ok_or(TreeError::NodeNotFound(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> TreeResult<&mut Slot> {
        self.slots
            .get_mut(id.index())
            .ok_or(TreeError::NodeNotFound(id))
    }
}

impl TreeView for Document {
    fn contains(&self, node: NodeId) -> bool {
        node.index() < self.slots.len()
    }

    fn kind(&self, node: NodeId) -> Option<&str> {
        self.slots.get(node.index()).map(|s| s.kind.as_str())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slots.get(node.index()).and_then(|s| s.parent)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.slots
            .get(node.index())
            .map(|s| s.children.as_slice())
            .unwrap_or(&[])
    }

    fn attribute_names(&self, node: NodeId) -> Vec<&str> {
        self.slots
            .get(node.index())
            .map(|s| s.attributes.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&Value> {
        self.slots.get(node.index())?.attributes.get(name)
    }

    fn variable(&self, scope: NodeId, name: &str) -> Option<&Value> {
        self.slots.get(scope.index())?.variables.get(name)
    }
}

impl MutableTree for Document {
    fn create_node(&mut self, kind: &str) -> NodeId {
        let id = NodeId::new(self.slots.len() as u32);
        self.slots.push(Slot {
            kind: kind.to_string(),
            ..Slot::default()
        });
        id
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: Value) -> TreeResult<Option<Value>> {
        Ok(self.slot_mut(node)?.attributes.insert(name.to_string(), value))
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> TreeResult<Option<Value>> {
        Ok(self.slot_mut(node)?.attributes.remove(name))
    }

    fn add_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> TreeResult<()> {
        let len = self.slot(parent)?.children.len();
        if self.slot(child)?.parent.is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        if index > len {
            return Err(TreeError::IndexOutOfBounds { parent, index, len });
        }
        // The child is detached, so it is a subtree root: a cycle exists
        // exactly when the child is the parent or one of its ancestors.
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(TreeError::WouldCycle { parent, child });
            }
            cursor = self.parent(current);
        }
        self.slot_mut(parent)?.children.insert(index, child);
        self.slot_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, index: usize) -> TreeResult<NodeId> {
        let slot = self.slot_mut(parent)?;
        let len = slot.children.len();
        if index >= len {
            return Err(TreeError::IndexOutOfBounds { parent, index, len });
        }
        let child = slot.children.remove(index);
        self.slot_mut(child)?.parent = None;
        Ok(child)
    }

    fn set_variable(&mut self, scope: NodeId, name: &str, value: Value) -> TreeResult<Option<Value>> {
        Ok(self.slot_mut(scope)?.variables.insert(name.to_string(), value))
    }

    fn remove_variable(&mut self, scope: NodeId, name: &str) -> TreeResult<Option<Value>> {
        Ok(self.slot_mut(scope)?.variables.remove(name))
    }
}
