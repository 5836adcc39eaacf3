//! Detached, owned subtree snapshots.
//!
//! A [`Fragment`] is how content crosses from one tree host to another: the
//! tree differ copies right-hand subtrees into fragments, and a
//! [`MutableTree`](crate::MutableTree) materializes them into live nodes.
//! Fragments are also the JSON file format used by the command-line tool.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::node::{Value, VALUE_ATTRIBUTE};

/// An owned node with its attributes and children, detached from any host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// The node's type tag.
    pub kind: String,
    /// Attribute name to value. The empty name holds the scalar value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    /// Ordered children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Fragment>,
}

impl Fragment {
    /// Create a childless fragment with no attributes.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder: set an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder: set the scalar value.
    pub fn with_value(self, value: impl Into<Value>) -> Self {
        self.with_attribute(VALUE_ATTRIBUTE, value)
    }

    /// Builder: append a child.
    pub fn with_child(mut self, child: Fragment) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: append several children.
    pub fn with_children(mut self, children: impl IntoIterator<Item = Fragment>) -> Self {
        self.children.extend(children);
        self
    }

    /// The scalar value, if set.
    pub fn value(&self) -> Option<&Value> {
        self.attributes.get(VALUE_ATTRIBUTE)
    }

    /// Total number of nodes in this fragment, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Fragment::node_count).sum::<usize>()
    }
}
