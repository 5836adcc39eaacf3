//! Recursive tree diff.
//!
//! Compares two node trees, possibly held by different hosts. Without a
//! change set the comparison is a pure equality test that stops at the
//! first difference. With one, every difference is appended as a primitive
//! [`Operation`] against the left tree, such that applying the set turns the
//! left tree into a copy of the right one.
//!
//! Emission order within one call:
//! 1. `SetParent` for every detected move (keyed mode with move detection).
//! 2. Per node pair, depth first: attribute edits in name order, then the
//!    repositioning of keyed children whose order changed, then the diff of
//!    each matched child pair, then this node's `RemoveChild` and `AddChild`
//!    edits in run order.
//!
//! In keyed mode a child whose key is unique among its siblings on both
//! sides is anchored to its counterpart: it keeps its node identity and is
//! patched in place wherever it moved to. Only the gaps between anchors go
//! through sequence alignment. Child positions in step 2 are read against
//! the child lists as they stand after the edits emitted before them.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use tracing::{debug, trace};

use xtree_change::{ChangeSet, NewChild, Operation};
use xtree_types::{NodeId, NodeRef, TreeError, TreeView};

use crate::config::{DiffConfig, MatchMode};
use crate::error::{DiffError, DiffResult};
use crate::matcher::{KeyedMatcher, NodeKey, NodeMatcher, OrderedMatcher};
use crate::sequence::{Run, SequenceDiffer, SequenceReceiver};

/// Compares node trees and produces change sets.
///
/// The differ holds configuration only; it keeps no state between calls.
pub struct TreeDiffer {
    matcher: Box<dyn NodeMatcher>,
    sequence: SequenceDiffer,
    detect_moves: bool,
    ignored: BTreeSet<String>,
}

impl TreeDiffer {
    /// A differ using a caller-supplied matcher. The config's `mode` and
    /// `key_attribute` are not consulted.
    pub fn new<M: NodeMatcher + 'static>(matcher: M, config: &DiffConfig) -> Self {
        Self {
            matcher: Box::new(matcher),
            sequence: SequenceDiffer::new(config.algorithm),
            detect_moves: config.detect_moves,
            ignored: config.ignored_attributes.clone(),
        }
    }

    /// A differ using the built-in matcher for the config's mode.
    pub fn from_config(config: &DiffConfig) -> Self {
        match config.mode {
            MatchMode::Keyed => Self::new(
                KeyedMatcher::new(config.key_attribute.as_str())
                    .ignoring(config.ignored_attributes.clone()),
                config,
            ),
            MatchMode::Ordered => Self::new(OrderedMatcher::new(config.key_attribute.as_str()), config),
        }
    }

    /// Compare `lhs_root` against `rhs_root`.
    ///
    /// With `changes` set to `None` this only answers whether the trees
    /// differ, stopping at the first difference. Otherwise the edits that
    /// turn the left tree into the right one are appended to `changes`, and
    /// the result says whether anything was appended.
    ///
    /// Both trees are checked for cycles before any comparison, so a
    /// malformed tree is rejected even when the roots already differ. The
    /// check visits every node once and keeps a visited set; in pure mode
    /// that is the only allocation, and the comparison proper stops at the
    /// first difference.
    pub fn diff(
        &self,
        lhs: &dyn TreeView,
        lhs_root: NodeId,
        rhs: &dyn TreeView,
        rhs_root: NodeId,
        changes: Option<&mut ChangeSet>,
    ) -> DiffResult<bool> {
        let Some(changes) = changes else {
            check_acyclic(lhs, lhs_root)?;
            check_acyclic(rhs, rhs_root)?;
            return Ok(self.differs_at(lhs, lhs_root, rhs, rhs_root));
        };

        let lhs_walk = walk(lhs, lhs_root)?;
        let rhs_walk = walk(rhs, rhs_root)?;

        let (lhs_kind, rhs_kind) = (NodeRef::new(lhs, lhs_root).kind(), NodeRef::new(rhs, rhs_root).kind());
        if lhs_kind != rhs_kind {
            return Err(DiffError::IncompatibleRoots {
                lhs: lhs_kind.to_string(),
                rhs: rhs_kind.to_string(),
            });
        }

        let before = changes.size();
        let mut pass = Pass {
            differ: self,
            lhs,
            rhs,
            overlay: Overlay::new(&lhs_walk),
            changes: &mut *changes,
        };
        let moves = if self.detect_moves {
            pass.detect_moves(&lhs_walk, &rhs_walk)
        } else {
            0
        };
        pass.emit(lhs_root, rhs_root);

        let added = changes.size() - before;
        debug!(
            lhs_nodes = lhs_walk.len(),
            rhs_nodes = rhs_walk.len(),
            operations = added,
            moves,
            "tree diff complete"
        );
        Ok(added > 0)
    }

    /// Whether the two trees differ.
    pub fn differs(
        &self,
        lhs: &dyn TreeView,
        lhs_root: NodeId,
        rhs: &dyn TreeView,
        rhs_root: NodeId,
    ) -> DiffResult<bool> {
        self.diff(lhs, lhs_root, rhs, rhs_root, None)
    }

    /// The edits that turn the left tree into the right one.
    pub fn changes(
        &self,
        lhs: &dyn TreeView,
        lhs_root: NodeId,
        rhs: &dyn TreeView,
        rhs_root: NodeId,
    ) -> DiffResult<ChangeSet> {
        let mut changes = ChangeSet::new();
        self.diff(lhs, lhs_root, rhs, rhs_root, Some(&mut changes))?;
        Ok(changes)
    }

    /// Child pairing predicate. Paired nodes always share a kind, so a
    /// pair can be patched in place.
    fn pairs(&self, lhs: &dyn TreeView, l: NodeId, rhs: &dyn TreeView, r: NodeId) -> bool {
        let (l, r) = (NodeRef::new(lhs, l), NodeRef::new(rhs, r));
        l.kind() == r.kind() && self.matcher.is_match(l, r)
    }

    fn compared_names<'t>(&self, tree: &'t dyn TreeView, node: NodeId) -> Vec<&'t str> {
        tree.attribute_names(node)
            .into_iter()
            .filter(|name| !self.ignored.contains(*name))
            .collect()
    }

    fn differs_at(&self, lhs: &dyn TreeView, l: NodeId, rhs: &dyn TreeView, r: NodeId) -> bool {
        if lhs.kind(l) != rhs.kind(r) {
            return true;
        }
        let names = self.compared_names(lhs, l);
        if names != self.compared_names(rhs, r)
            || names.iter().any(|name| lhs.attribute(l, name) != rhs.attribute(r, name))
        {
            return true;
        }

        let (lc, rc) = (lhs.children(l), rhs.children(r));
        let mut aligned = Aligned::default();
        if self
            .sequence
            .diff_by(lc, rc, |a, b| self.pairs(lhs, *a, rhs, *b), &mut aligned)
            .is_err()
        {
            return true;
        }
        aligned
            .pairs
            .into_iter()
            .any(|(i, j)| self.differs_at(lhs, lc[i], rhs, rc[j]))
    }
}

impl Default for TreeDiffer {
    fn default() -> Self {
        Self::from_config(&DiffConfig::default())
    }
}

impl fmt::Debug for TreeDiffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeDiffer")
            .field("sequence", &self.sequence)
            .field("detect_moves", &self.detect_moves)
            .field("ignored", &self.ignored)
            .finish_non_exhaustive()
    }
}

/// Fails on a node reached twice under `root`.
fn check_acyclic(tree: &dyn TreeView, root: NodeId) -> DiffResult<()> {
    if !tree.contains(root) {
        return Err(TreeError::NodeNotFound(root).into());
    }
    let mut seen = HashSet::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            return Err(DiffError::MalformedTree(node));
        }
        stack.extend_from_slice(tree.children(node));
    }
    Ok(())
}

/// Pre-order walk of the subtree at `root`, with each node's parent within
/// the walk. Fails on a node reached twice.
fn walk(tree: &dyn TreeView, root: NodeId) -> DiffResult<Vec<(NodeId, Option<NodeId>)>> {
    if !tree.contains(root) {
        return Err(TreeError::NodeNotFound(root).into());
    }
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![(root, None)];
    while let Some((node, parent)) = stack.pop() {
        if !seen.insert(node) {
            return Err(DiffError::MalformedTree(node));
        }
        out.push((node, parent));
        stack.extend(tree.children(node).iter().rev().map(|&c| (c, Some(node))));
    }
    Ok(out)
}

/// Collects aligned index pairs and stops at the first insert or remove.
#[derive(Default)]
struct Aligned {
    pairs: Vec<(usize, usize)>,
}

struct Changed;

impl SequenceReceiver for Aligned {
    type Error = Changed;

    fn equal(&mut self, l_index: usize, _: isize, r_index: usize, count: usize) -> Result<(), Changed> {
        self.pairs.extend((0..count).map(|k| (l_index + k, r_index + k)));
        Ok(())
    }

    fn insert(&mut self, _: usize, _: isize, _: usize, _: usize) -> Result<(), Changed> {
        Err(Changed)
    }

    fn remove(&mut self, _: usize, _: isize, _: usize) -> Result<(), Changed> {
        Err(Changed)
    }
}

/// The left tree's shape as seen after the moves emitted so far.
struct Overlay {
    parents: HashMap<NodeId, NodeId>,
    children: HashMap<NodeId, Vec<NodeId>>,
}

impl Overlay {
    fn new(walk: &[(NodeId, Option<NodeId>)]) -> Self {
        Self {
            parents: walk
                .iter()
                .filter_map(|&(node, parent)| parent.map(|p| (node, p)))
                .collect(),
            children: HashMap::new(),
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents.get(&node).copied()
    }

    fn children<'a>(&'a self, tree: &'a dyn TreeView, node: NodeId) -> &'a [NodeId] {
        match self.children.get(&node) {
            Some(children) => children,
            None => tree.children(node),
        }
    }

    /// Whether `node` is `ancestor` or lies below it.
    fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Move `child` from `from` to the end of `to`; returns the old and new
    /// positions.
    fn relocate(&mut self, tree: &dyn TreeView, child: NodeId, from: NodeId, to: NodeId) -> Option<(usize, usize)> {
        let siblings = self
            .children
            .entry(from)
            .or_insert_with(|| tree.children(from).to_vec());
        let old_index = siblings.iter().position(|&c| c == child)?;
        siblings.remove(old_index);

        let siblings = self
            .children
            .entry(to)
            .or_insert_with(|| tree.children(to).to_vec());
        let new_index = siblings.len();
        siblings.push(child);
        self.parents.insert(child, to);
        Some((old_index, new_index))
    }
}

/// Keys that occur exactly once in a walk, mapped to their node.
fn unique_keys(
    matcher: &dyn NodeMatcher,
    tree: &dyn TreeView,
    walk: &[(NodeId, Option<NodeId>)],
) -> HashMap<NodeKey, Option<NodeId>> {
    let mut keys: HashMap<NodeKey, Option<NodeId>> = HashMap::new();
    for &(node, _) in walk {
        if let Some(key) = matcher.identity_key(NodeRef::new(tree, node)) {
            keys.entry(key)
                .and_modify(|slot| *slot = None)
                .or_insert(Some(node));
        }
    }
    keys
}

/// Keys among one child list, mapped to their position when unique.
fn sibling_keys(
    matcher: &dyn NodeMatcher,
    tree: &dyn TreeView,
    children: &[NodeId],
) -> HashMap<NodeKey, Option<usize>> {
    let mut keys: HashMap<NodeKey, Option<usize>> = HashMap::new();
    for (at, &child) in children.iter().enumerate() {
        if let Some(key) = matcher.identity_key(NodeRef::new(tree, child)) {
            keys.entry(key)
                .and_modify(|slot| *slot = None)
                .or_insert(Some(at));
        }
    }
    keys
}

/// Indices of one longest strictly increasing subsequence of `seq`.
fn longest_increasing(seq: &[usize]) -> Vec<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (k, &value) in seq.iter().enumerate() {
        let at = tails.partition_point(|&t| seq[t] < value);
        if at > 0 {
            prev[k] = Some(tails[at - 1]);
        }
        if at == tails.len() {
            tails.push(k);
        } else {
            tails[at] = k;
        }
    }
    let mut out = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(k) = cursor {
        out.push(k);
        cursor = prev[k];
    }
    out.reverse();
    out
}

/// Rebase a run computed on `lhs[l_start..]` / `rhs[r_start..]` onto the
/// whole lists, given that everything before the slices already matches.
fn shift(run: Run, l_start: usize, r_start: usize) -> Run {
    let adjust = r_start as isize - l_start as isize;
    match run {
        Run::Equal {
            l_index,
            l_adjust,
            r_index,
            count,
        } => Run::Equal {
            l_index: l_index + l_start,
            l_adjust: l_adjust + adjust,
            r_index: r_index + r_start,
            count,
        },
        Run::Insert {
            l_index,
            l_adjust,
            r_index,
            count,
        } => Run::Insert {
            l_index: l_index + l_start,
            l_adjust: l_adjust + adjust,
            r_index: r_index + r_start,
            count,
        },
        Run::Remove {
            l_index,
            l_adjust,
            count,
        } => Run::Remove {
            l_index: l_index + l_start,
            l_adjust: l_adjust + adjust,
            count,
        },
    }
}

/// One change-producing diff call.
struct Pass<'d, 't, 'c> {
    differ: &'d TreeDiffer,
    lhs: &'t dyn TreeView,
    rhs: &'t dyn TreeView,
    overlay: Overlay,
    changes: &'c mut ChangeSet,
}

impl Pass<'_, '_, '_> {
    /// Relocate keyed nodes whose parent changed. Returns the move count.
    fn detect_moves(
        &mut self,
        lhs_walk: &[(NodeId, Option<NodeId>)],
        rhs_walk: &[(NodeId, Option<NodeId>)],
    ) -> usize {
        let (lhs, rhs, differ) = (self.lhs, self.rhs, self.differ);
        let matcher = differ.matcher.as_ref();
        let lhs_keys = unique_keys(matcher, lhs, lhs_walk);
        let rhs_keys = unique_keys(matcher, rhs, rhs_walk);
        let (Some(&(lhs_root, _)), Some(&(rhs_root, _))) = (lhs_walk.first(), rhs_walk.first()) else {
            return 0;
        };

        // The left node standing for `r`: the left root for the right root,
        // otherwise the node sharing its unique key.
        let counterpart = |r: NodeId| -> Option<NodeId> {
            if r == rhs_root {
                return Some(lhs_root);
            }
            let key = matcher.identity_key(NodeRef::new(rhs, r))?;
            match rhs_keys.get(&key) {
                Some(Some(only)) if *only == r => {}
                _ => return None,
            }
            lhs_keys.get(&key).copied().flatten()
        };

        let mut moves = 0;
        for &(r, r_parent) in rhs_walk.iter().skip(1) {
            let Some(child) = counterpart(r) else { continue };
            let Some(new_parent) = r_parent.and_then(&counterpart) else {
                continue;
            };
            if child == lhs_root {
                continue;
            }
            let Some(old_parent) = self.overlay.parent(child) else {
                continue;
            };
            if old_parent == new_parent {
                continue;
            }
            if self.overlay.is_within(new_parent, child) {
                trace!(%child, %new_parent, "move skipped: target inside moved subtree");
                continue;
            }
            let Some((old_index, new_index)) = self.overlay.relocate(lhs, child, old_parent, new_parent)
            else {
                continue;
            };
            trace!(%child, %old_parent, %new_parent, "move detected");
            self.changes.add(Operation::SetParent {
                child,
                old_parent,
                old_index,
                new_parent,
                new_index,
            });
            moves += 1;
        }
        moves
    }

    fn emit(&mut self, l: NodeId, r: NodeId) {
        self.emit_attributes(l, r);

        let (lhs, rhs) = (self.lhs, self.rhs);
        let anchors = self.reorder(l, r);
        let lc = self.overlay.children(lhs, l).to_vec();
        let rc = rhs.children(r);
        let runs = self.align(&lc, rc, &anchors);

        for run in &runs {
            if let Run::Equal {
                l_index,
                r_index,
                count,
                ..
            } = *run
            {
                for k in 0..count {
                    self.emit(lc[l_index + k], rc[r_index + k]);
                }
            }
        }

        for run in &runs {
            let at = run.position();
            match *run {
                Run::Equal { .. } => {}
                Run::Remove { l_index, count, .. } => {
                    for child in &lc[l_index..l_index + count] {
                        self.changes.add(Operation::RemoveChild {
                            parent: l,
                            child: *child,
                            index: at,
                        });
                    }
                }
                Run::Insert { r_index, count, .. } => {
                    for (k, child) in rc[r_index..r_index + count].iter().enumerate() {
                        self.changes.add(Operation::AddChild {
                            parent: l,
                            child: NewChild::Fragment(NodeRef::new(rhs, *child).to_fragment()),
                            index: at + k,
                        });
                    }
                }
            }
        }
    }

    /// Bring keyed children of `l` into the order their counterparts have
    /// under `r`, moving as few as possible.
    ///
    /// Returns the anchored pairs as `(lhs position, rhs position)`, read
    /// against the reordered child list. A child is anchored when its
    /// identity key occurs once under `l`, once under `r`, and the two nodes
    /// pair. Each relocation is a `RemoveChild` followed by an `AddChild` of
    /// the same, now detached, node.
    fn reorder(&mut self, l: NodeId, r: NodeId) -> Vec<(usize, usize)> {
        let (lhs, rhs, differ) = (self.lhs, self.rhs, self.differ);
        let matcher = differ.matcher.as_ref();
        let mut list = self.overlay.children(lhs, l).to_vec();
        let rc = rhs.children(r);

        let lhs_keys = sibling_keys(matcher, lhs, &list);
        let rhs_keys = sibling_keys(matcher, rhs, rc);
        // (lhs node, lhs position, rhs position), in rhs order.
        let pairs: Vec<(NodeId, usize, usize)> = rc
            .iter()
            .enumerate()
            .filter_map(|(j, &b)| {
                let key = matcher.identity_key(NodeRef::new(rhs, b))?;
                if rhs_keys.get(&key) != Some(&Some(j)) {
                    return None;
                }
                let i = lhs_keys.get(&key).copied().flatten()?;
                differ.pairs(lhs, list[i], rhs, b).then_some((list[i], i, j))
            })
            .collect();
        if pairs.is_empty() {
            return Vec::new();
        }

        let positions: Vec<usize> = pairs.iter().map(|&(_, i, _)| i).collect();
        let mut keep = vec![false; pairs.len()];
        for k in longest_increasing(&positions) {
            keep[k] = true;
        }

        if keep.iter().any(|kept| !kept) {
            let first_kept = keep
                .iter()
                .position(|&kept| kept)
                .map(|k| pairs[k].0);
            let mut prev: Option<NodeId> = None;
            for (&(node, _, _), &kept) in pairs.iter().zip(&keep) {
                if !kept {
                    let Some(old_index) = list.iter().position(|&c| c == node) else {
                        continue;
                    };
                    list.remove(old_index);
                    // After the previous pair, or ahead of the first kept one.
                    let new_index = match prev {
                        Some(p) => list.iter().position(|&c| c == p).map_or(0, |at| at + 1),
                        None => first_kept
                            .and_then(|k| list.iter().position(|&c| c == k))
                            .unwrap_or(0),
                    };
                    list.insert(new_index, node);
                    trace!(%node, parent = %l, old_index, new_index, "keyed child repositioned");
                    self.changes.add(Operation::RemoveChild {
                        parent: l,
                        child: node,
                        index: old_index,
                    });
                    self.changes.add(Operation::AddChild {
                        parent: l,
                        child: NewChild::Existing(node),
                        index: new_index,
                    });
                }
                prev = Some(node);
            }
        }

        let mut anchors: Vec<(usize, usize)> = Vec::with_capacity(pairs.len());
        for &(node, _, j) in &pairs {
            let Some(i) = list.iter().position(|&c| c == node) else {
                continue;
            };
            if anchors.last().map_or(true, |&(last, _)| last < i) {
                anchors.push((i, j));
            }
        }
        self.overlay.children.insert(l, list);
        anchors
    }

    /// Runs over whole child lists, with every anchor as its own `Equal`
    /// run and the gaps between anchors aligned by the sequence differ.
    fn align(&self, lc: &[NodeId], rc: &[NodeId], anchors: &[(usize, usize)]) -> Vec<Run> {
        let (lhs, rhs, differ) = (self.lhs, self.rhs, self.differ);
        let pairs = |a: &NodeId, b: &NodeId| differ.pairs(lhs, *a, rhs, *b);
        if anchors.is_empty() {
            return differ.sequence.runs_by(lc, rc, &pairs);
        }

        let mut runs = Vec::new();
        let (mut l_start, mut r_start) = (0, 0);
        let ends = anchors
            .iter()
            .map(|&(i, j)| Some((i, j)))
            .chain(std::iter::once(None));
        for end in ends {
            let (l_end, r_end) = end.unwrap_or((lc.len(), rc.len()));
            let gap = differ
                .sequence
                .runs_by(&lc[l_start..l_end], &rc[r_start..r_end], &pairs);
            runs.extend(gap.into_iter().map(|run| shift(run, l_start, r_start)));
            if let Some((i, j)) = end {
                runs.push(Run::Equal {
                    l_index: i,
                    l_adjust: j as isize - i as isize,
                    r_index: j,
                    count: 1,
                });
                (l_start, r_start) = (i + 1, j + 1);
            }
        }
        runs
    }

    fn emit_attributes(&mut self, l: NodeId, r: NodeId) {
        let (lhs, rhs) = (self.lhs, self.rhs);
        let names: BTreeSet<&str> = self
            .differ
            .compared_names(lhs, l)
            .into_iter()
            .chain(self.differ.compared_names(rhs, r))
            .collect();

        for name in names {
            match (lhs.attribute(l, name), rhs.attribute(r, name)) {
                (old, Some(new)) if old != Some(new) => self.changes.add(Operation::SetAttribute {
                    node: l,
                    name: name.to_string(),
                    new_value: new.clone(),
                    old_value: old.cloned(),
                }),
                (Some(old), None) => self.changes.add(Operation::RemoveAttribute {
                    node: l,
                    name: name.to_string(),
                    old_value: old.clone(),
                }),
                _ => {}
            }
        }
    }
}
