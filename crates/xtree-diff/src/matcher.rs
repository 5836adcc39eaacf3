//! Cross-tree node identity for pairing children.
//!
//! A matcher decides whether a left node and a right node are "the same"
//! logical entity, independent of whether their content is equal. Paired
//! nodes are diffed in place; unpaired ones become removals and insertions.

use std::collections::BTreeSet;
use std::fmt;

use xtree_types::{value_text, NodeRef};

/// Identity of a keyed node: its kind plus the text of its key attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub kind: String,
    pub key: String,
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.key)
    }
}

/// Decides node identity across two trees.
pub trait NodeMatcher {
    /// Whether `lhs` and `rhs` represent the same logical node.
    fn is_match(&self, lhs: NodeRef<'_>, rhs: NodeRef<'_>) -> bool;

    /// A position-independent identity, if the node has one.
    ///
    /// Nodes whose key is unique within both trees can be tracked across
    /// parents, which is what move detection relies on. The default says
    /// no node has such an identity.
    fn identity_key(&self, node: NodeRef<'_>) -> Option<NodeKey> {
        let _ = node;
        None
    }
}

impl<F> NodeMatcher for F
where
    F: Fn(NodeRef<'_>, NodeRef<'_>) -> bool,
{
    fn is_match(&self, lhs: NodeRef<'_>, rhs: NodeRef<'_>) -> bool {
        self(lhs, rhs)
    }
}

fn key_of(node: NodeRef<'_>, attribute: &str) -> Option<String> {
    node.attribute(attribute).map(value_text)
}

/// Positional pairing: same kind and same key (or both unkeyed).
///
/// Because child lists are aligned as sequences, unkeyed siblings of one
/// kind pair up in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderedMatcher {
    key_attribute: String,
}

impl OrderedMatcher {
    pub fn new(key_attribute: impl Into<String>) -> Self {
        Self {
            key_attribute: key_attribute.into(),
        }
    }
}

impl NodeMatcher for OrderedMatcher {
    fn is_match(&self, lhs: NodeRef<'_>, rhs: NodeRef<'_>) -> bool {
        lhs.kind() == rhs.kind()
            && key_of(lhs, &self.key_attribute) == key_of(rhs, &self.key_attribute)
    }
}

/// Key-based pairing.
///
/// Keyed nodes pair when kind and key agree, whatever their content.
/// Unkeyed nodes have no identity beyond their content, so they pair only
/// with a structurally equal node. A keyed node never pairs with an
/// unkeyed one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyedMatcher {
    key_attribute: String,
    ignored: BTreeSet<String>,
}

impl KeyedMatcher {
    pub fn new(key_attribute: impl Into<String>) -> Self {
        Self {
            key_attribute: key_attribute.into(),
            ignored: BTreeSet::new(),
        }
    }

    /// Skip these attributes when comparing unkeyed nodes by content.
    pub fn ignoring(mut self, ignored: BTreeSet<String>) -> Self {
        self.ignored = ignored;
        self
    }
}

impl NodeMatcher for KeyedMatcher {
    fn is_match(&self, lhs: NodeRef<'_>, rhs: NodeRef<'_>) -> bool {
        if lhs.kind() != rhs.kind() {
            return false;
        }
        match (
            key_of(lhs, &self.key_attribute),
            key_of(rhs, &self.key_attribute),
        ) {
            (Some(a), Some(b)) => a == b,
            (None, None) => lhs.deep_eq_except(&rhs, &self.ignored),
            _ => false,
        }
    }

    fn identity_key(&self, node: NodeRef<'_>) -> Option<NodeKey> {
        key_of(node, &self.key_attribute).map(|key| NodeKey {
            kind: node.kind().to_string(),
            key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtree_types::{Document, Fragment, NodeId, TreeView};

    fn pair(lhs: Fragment, rhs: Fragment) -> (Document, NodeId, Document, NodeId) {
        let (l, lr) = Document::from_fragment(&lhs);
        let (r, rr) = Document::from_fragment(&rhs);
        (l, lr, r, rr)
    }

    #[test]
    fn ordered_pairs_by_kind_and_key() {
        let m = OrderedMatcher::new("id");
        let (l, lr, r, rr) = pair(
            Fragment::new("book").with_attribute("title", "Dune"),
            Fragment::new("book").with_attribute("title", "Emma"),
        );
        assert!(m.is_match(l.node(lr), r.node(rr)));

        let (l, lr, r, rr) = pair(
            Fragment::new("book").with_attribute("id", 1),
            Fragment::new("book").with_attribute("id", 2),
        );
        assert!(!m.is_match(l.node(lr), r.node(rr)));

        let (l, lr, r, rr) = pair(Fragment::new("book"), Fragment::new("film"));
        assert!(!m.is_match(l.node(lr), r.node(rr)));
        assert_eq!(m.identity_key(l.node(lr)), None);
    }

    #[test]
    fn keyed_ignores_content_of_keyed_nodes() {
        let m = KeyedMatcher::new("id");
        let (l, lr, r, rr) = pair(
            Fragment::new("book").with_attribute("id", "a").with_attribute("title", "Dune"),
            Fragment::new("book").with_attribute("id", "a").with_attribute("title", "Emma"),
        );
        assert!(m.is_match(l.node(lr), r.node(rr)));
        assert_eq!(
            m.identity_key(l.node(lr)),
            Some(NodeKey {
                kind: "book".into(),
                key: "a".into()
            })
        );
    }

    #[test]
    fn keyed_numeric_and_text_keys_agree() {
        let m = KeyedMatcher::new("id");
        let (l, lr, r, rr) = pair(
            Fragment::new("row").with_attribute("id", 7),
            Fragment::new("row").with_attribute("id", "7"),
        );
        assert!(m.is_match(l.node(lr), r.node(rr)));
    }

    #[test]
    fn keyed_unkeyed_nodes_need_equal_content() {
        let m = KeyedMatcher::new("id");
        let (l, lr, r, rr) = pair(
            Fragment::new("note").with_value("x"),
            Fragment::new("note").with_value("y"),
        );
        assert!(!m.is_match(l.node(lr), r.node(rr)));

        let (l, lr, r, rr) = pair(
            Fragment::new("note").with_value("x").with_attribute("seen", 1),
            Fragment::new("note").with_value("x").with_attribute("seen", 2),
        );
        assert!(!m.is_match(l.node(lr), r.node(rr)));
        let lenient = KeyedMatcher::new("id").ignoring(["seen".to_string()].into());
        assert!(lenient.is_match(l.node(lr), r.node(rr)));
    }

    #[test]
    fn keyed_never_pairs_keyed_with_unkeyed() {
        let m = KeyedMatcher::new("id");
        let (l, lr, r, rr) = pair(Fragment::new("book").with_attribute("id", "a"), Fragment::new("book"));
        assert!(!m.is_match(l.node(lr), r.node(rr)));
    }

    fn same_kind(lhs: NodeRef<'_>, rhs: NodeRef<'_>) -> bool {
        lhs.kind() == rhs.kind()
    }

    #[test]
    fn functions_are_matchers() {
        let (l, lr, r, rr) = pair(
            Fragment::new("shelf").with_child(Fragment::new("book")),
            Fragment::new("shelf"),
        );
        assert!(same_kind.is_match(l.node(lr), r.node(rr)));
        assert_eq!(same_kind.identity_key(l.node(lr)), None);
        let book = l.children(lr)[0];
        assert!(!same_kind.is_match(l.node(book), r.node(rr)));
    }
}
