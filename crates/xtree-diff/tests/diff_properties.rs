//! Diff / patch / undo property tests
//!
//! Exercises the full pipeline across crates: a tree diff produces a change
//! set, applying it to the left tree must reproduce the right tree, a fresh
//! diff must then be empty, and reverting must give back the original.
//! Sequence-level fixtures check the splice bookkeeping on literal lists.

use proptest::prelude::*;

use xtree_change::ChangeSet;
use xtree_diff::{DiffConfig, MatchMode, Run, SequenceAlgorithm, SequenceDiffer, TreeDiffer};
use xtree_types::{Document, Fragment, NodeId};

fn replay(lhs: &[u32], rhs: &[u32], runs: &[Run]) -> Vec<u32> {
    let mut working = lhs.to_vec();
    for run in runs {
        run.apply_to(&mut working, rhs);
    }
    working
}

fn differs(lhs: &[u32], rhs: &[u32]) -> Vec<Run> {
    let runs = SequenceDiffer::default().runs(lhs, rhs);
    assert_eq!(replay(lhs, rhs, &runs), rhs, "lhs={lhs:?} rhs={rhs:?}");
    runs
}

fn edits(runs: &[Run]) -> Vec<Run> {
    runs.iter()
        .filter(|r| !matches!(r, Run::Equal { .. }))
        .copied()
        .collect()
}

#[test]
fn list_swap_first_and_last() {
    differs(&[0, 1, 2, 3, 4], &[4, 1, 2, 3, 0]);
}

#[test]
fn list_pure_append() {
    let runs = differs(&[0, 1, 2, 3], &[0, 1, 2, 3, 4]);
    assert_eq!(edits(&runs), vec![Run::Insert { l_index: 4, l_adjust: 0, r_index: 4, count: 1 }]);
}

#[test]
fn list_pure_truncate() {
    let runs = differs(&[0, 1, 2, 3, 4], &[0, 1, 2, 3]);
    assert_eq!(edits(&runs), vec![Run::Remove { l_index: 4, l_adjust: 0, count: 1 }]);
}

#[test]
fn list_identical_has_no_edits() {
    let runs = differs(&[0, 1, 2, 3, 4], &[0, 1, 2, 3, 4]);
    assert!(edits(&runs).is_empty());
    assert_eq!(runs.len(), 1);
}

#[test]
fn list_from_empty() {
    let runs = differs(&[], &[0, 1, 2, 3, 4]);
    assert_eq!(runs, vec![Run::Insert { l_index: 0, l_adjust: 0, r_index: 0, count: 5 }]);
}

#[test]
fn list_to_empty() {
    let runs = differs(&[0, 1, 2, 3, 4], &[]);
    assert_eq!(runs, vec![Run::Remove { l_index: 0, l_adjust: 0, count: 5 }]);
}

// ---------------------------------------------------------------
// Tree fixtures
// ---------------------------------------------------------------

/// Small alphabet so that generated trees share keys and content often.
fn arb_leaf() -> impl Strategy<Value = Fragment> {
    (
        prop_oneof![Just("item"), Just("note")],
        proptest::option::of(prop_oneof![Just("a"), Just("b"), Just("c"), Just("d"), Just("e")]),
        proptest::option::of(0i64..3),
    )
        .prop_map(|(kind, id, value)| {
            let mut fragment = Fragment::new(kind);
            if let Some(id) = id {
                fragment = fragment.with_attribute("id", id);
            }
            if let Some(value) = value {
                fragment = fragment.with_value(value);
            }
            fragment
        })
}

fn arb_node() -> impl Strategy<Value = Fragment> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        (arb_leaf(), proptest::collection::vec(inner, 0..4))
            .prop_map(|(node, children)| node.with_children(children))
    })
}

fn arb_tree() -> impl Strategy<Value = Fragment> {
    proptest::collection::vec(arb_node(), 0..5)
        .prop_map(|children| Fragment::new("root").with_children(children))
}

fn arb_config() -> impl Strategy<Value = DiffConfig> {
    (
        prop_oneof![Just(MatchMode::Keyed), Just(MatchMode::Ordered)],
        prop_oneof![Just(SequenceAlgorithm::Lcs), Just(SequenceAlgorithm::Myers)],
        any::<bool>(),
    )
        .prop_map(|(mode, algorithm, detect_moves)| DiffConfig {
            mode,
            algorithm,
            detect_moves,
            ..DiffConfig::default()
        })
}

fn load(fragment: &Fragment) -> (Document, NodeId) {
    Document::from_fragment(fragment)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(160))]

    #[test]
    fn permutation_of_25_is_reproduced(
        perm in Just((0..25).collect::<Vec<u32>>()).prop_shuffle(),
        myers in any::<bool>(),
    ) {
        let lhs: Vec<u32> = (0..25).collect();
        let algorithm = if myers { SequenceAlgorithm::Myers } else { SequenceAlgorithm::Lcs };
        let runs = SequenceDiffer::new(algorithm).runs(&lhs, &perm);
        prop_assert_eq!(replay(&lhs, &perm, &runs), perm);
    }

    #[test]
    fn apply_converges_and_rediff_is_empty(lhs in arb_tree(), rhs in arb_tree(), config in arb_config()) {
        let differ = TreeDiffer::from_config(&config);
        let (mut left, lr) = load(&lhs);
        let (right, rr) = load(&rhs);

        let mut changes = differ.changes(&left, lr, &right, rr)?;
        prop_assert_eq!(changes.is_empty(), lhs == rhs);
        changes.apply_changes(&mut left)?;
        prop_assert_eq!(left.to_fragment(lr), Some(rhs.clone()));

        let mut again = ChangeSet::new();
        prop_assert!(!differ.diff(&left, lr, &right, rr, Some(&mut again))?);
        prop_assert_eq!(again.size(), 0);
    }

    #[test]
    fn revert_restores_original(lhs in arb_tree(), rhs in arb_tree(), config in arb_config()) {
        let differ = TreeDiffer::from_config(&config);
        let (snapshot, sr) = load(&lhs);
        let (mut left, lr) = load(&lhs);
        let (right, rr) = load(&rhs);

        let mut changes = differ.changes(&left, lr, &right, rr)?;
        changes.apply_changes(&mut left)?;
        changes.revert(&mut left)?;
        prop_assert!(!differ.differs(&snapshot, sr, &left, lr)?);
        prop_assert_eq!(left.to_fragment(lr), Some(lhs.clone()));

        // Redo lands on the right tree again.
        changes.restore(&mut left)?;
        prop_assert!(!differ.differs(&left, lr, &right, rr)?);
    }

    #[test]
    fn permuted_keyed_children_keep_identity(
        order in Just((0..12).collect::<Vec<u32>>()).prop_shuffle(),
        edited in proptest::collection::vec(any::<bool>(), 12),
    ) {
        let shelf = |ids: &[u32], edit: &[bool]| {
            Fragment::new("shelf").with_children(ids.iter().map(|&id| {
                let book = Fragment::new("book").with_attribute("id", id);
                if edit.get(id as usize) == Some(&true) {
                    book.with_attribute("title", "revised")
                } else {
                    book
                }
            }))
        };
        let lhs = shelf(&(0..12).collect::<Vec<_>>(), &[]);
        let rhs = shelf(&order, &edited);
        let (mut left, lr) = load(&lhs);
        let (right, rr) = load(&rhs);
        let slots = left.len();

        let differ = TreeDiffer::default();
        let mut changes = differ.changes(&left, lr, &right, rr)?;
        changes.apply_changes(&mut left)?;
        prop_assert_eq!(left.to_fragment(lr), Some(rhs));
        // Every book was repositioned or patched, never rebuilt.
        prop_assert_eq!(left.len(), slots);
        changes.revert(&mut left)?;
        prop_assert_eq!(left.to_fragment(lr), Some(lhs));
    }

    #[test]
    fn pure_diff_agrees_with_change_set(lhs in arb_tree(), rhs in arb_tree(), config in arb_config()) {
        let differ = TreeDiffer::from_config(&config);
        let (left, lr) = load(&lhs);
        let (right, rr) = load(&rhs);
        let differs = differ.differs(&left, lr, &right, rr)?;
        let changes = differ.changes(&left, lr, &right, rr)?;
        prop_assert_eq!(differs, !changes.is_empty());
        prop_assert_eq!(differs, lhs != rhs);
    }
}
