use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute and variable values.
///
/// Values are JSON values so that scalar text, numbers, and structured
/// payloads share one comparison and serialization story.
pub type Value = serde_json::Value;

/// Name of the attribute that carries a node's scalar value.
pub const VALUE_ATTRIBUTE: &str = "";

/// Opaque identity of a node within one tree host.
///
/// For [`Document`](crate::Document) this is an arena slot. Slots are never
/// reused, so an id stays valid for as long as the host lives, including
/// while the node is detached.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a node id from a raw slot index.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw slot index.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The slot index as a `usize`, for arena lookups.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<NodeId> for u32 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Render a value as plain text: strings unquoted, everything else as JSON.
///
/// Used wherever a value acts as a key (identity attributes, sort labels).
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_and_debug() {
        let id = NodeId::new(7);
        assert_eq!(id.to_string(), "#7");
        assert_eq!(format!("{:?}", id), "NodeId(7)");
    }

    #[test]
    fn raw_conversions() {
        let id: NodeId = 42u32.into();
        assert_eq!(u32::from(id), 42);
        assert_eq!(id.index(), 42);
    }

    #[test]
    fn serializes_transparently() {
        let id = NodeId::new(3);
        assert_eq!(serde_json::to_string(&id).unwrap(), "3");
    }

    #[test]
    fn value_text_unquotes_strings() {
        assert_eq!(value_text(&json!("chapter-1")), "chapter-1");
        assert_eq!(value_text(&json!(12)), "12");
        assert_eq!(value_text(&json!(true)), "true");
    }
}
