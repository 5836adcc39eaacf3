//! Ordered-sequence alignment with in-place splice bookkeeping.
//!
//! [`SequenceDiffer`] aligns two sequences under a pluggable match
//! predicate and reports the result as maximal [`Run`]s, left to right.
//! Every run carries `l_index` (a position in the original left sequence)
//! and `l_adjust` (the net length change caused by the runs before it), so
//! a receiver editing a live copy of the left sequence splices at
//! `l_index + l_adjust` without tracking positions itself.
//!
//! Alignment is delegated to the `similar` crate; this module turns its
//! raw equal/delete/insert callbacks into coalesced runs. Within each gap
//! between two equal runs the removal is reported before the insertion.

use std::convert::Infallible;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use similar::algorithms::{lcs, myers, DiffHook};

use crate::config::SequenceAlgorithm;

/// One maximal run of an edit script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "run", rename_all = "snake_case")]
pub enum Run {
    /// `count` elements already aligned: `lhs[l_index..]` matches `rhs[r_index..]`.
    Equal {
        l_index: usize,
        l_adjust: isize,
        r_index: usize,
        count: usize,
    },
    /// Insert `rhs[r_index..r_index + count]` at `l_index + l_adjust`.
    Insert {
        l_index: usize,
        l_adjust: isize,
        r_index: usize,
        count: usize,
    },
    /// Delete `count` elements starting at `l_index + l_adjust`.
    Remove {
        l_index: usize,
        l_adjust: isize,
        count: usize,
    },
}

impl Run {
    pub fn l_index(&self) -> usize {
        match self {
            Self::Equal { l_index, .. } | Self::Insert { l_index, .. } | Self::Remove { l_index, .. } => {
                *l_index
            }
        }
    }

    pub fn l_adjust(&self) -> isize {
        match self {
            Self::Equal { l_adjust, .. }
            | Self::Insert { l_adjust, .. }
            | Self::Remove { l_adjust, .. } => *l_adjust,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Self::Equal { count, .. } | Self::Insert { count, .. } | Self::Remove { count, .. } => {
                *count
            }
        }
    }

    /// Position of this run in the working copy: `l_index + l_adjust`.
    pub fn position(&self) -> usize {
        self.l_index().saturating_add_signed(self.l_adjust())
    }

    /// Splice this run into `working`, a copy of the left sequence that has
    /// received every earlier run of the same pass.
    pub fn apply_to<T: Clone>(&self, working: &mut Vec<T>, rhs: &[T]) {
        let at = self.position();
        match *self {
            Self::Equal { .. } => {}
            Self::Insert { r_index, count, .. } => {
                working.splice(at..at, rhs[r_index..r_index + count].iter().cloned());
            }
            Self::Remove { count, .. } => {
                working.drain(at..at + count);
            }
        }
    }
}

/// Receives the runs of one diff pass.
///
/// Returning an error from any callback aborts the pass; the error comes
/// back out of [`SequenceDiffer::diff_by`]. Pure comparisons use this to
/// stop at the first difference.
pub trait SequenceReceiver {
    type Error;

    fn equal(
        &mut self,
        l_index: usize,
        l_adjust: isize,
        r_index: usize,
        count: usize,
    ) -> Result<(), Self::Error> {
        let _ = (l_index, l_adjust, r_index, count);
        Ok(())
    }

    fn insert(
        &mut self,
        l_index: usize,
        l_adjust: isize,
        r_index: usize,
        count: usize,
    ) -> Result<(), Self::Error>;

    fn remove(&mut self, l_index: usize, l_adjust: isize, count: usize) -> Result<(), Self::Error>;
}

impl SequenceReceiver for Vec<Run> {
    type Error = Infallible;

    fn equal(&mut self, l_index: usize, l_adjust: isize, r_index: usize, count: usize) -> Result<(), Infallible> {
        self.push(Run::Equal {
            l_index,
            l_adjust,
            r_index,
            count,
        });
        Ok(())
    }

    fn insert(&mut self, l_index: usize, l_adjust: isize, r_index: usize, count: usize) -> Result<(), Infallible> {
        self.push(Run::Insert {
            l_index,
            l_adjust,
            r_index,
            count,
        });
        Ok(())
    }

    fn remove(&mut self, l_index: usize, l_adjust: isize, count: usize) -> Result<(), Infallible> {
        self.push(Run::Remove {
            l_index,
            l_adjust,
            count,
        });
        Ok(())
    }
}

/// Aligns two ordered sequences.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceDiffer {
    algorithm: SequenceAlgorithm,
}

impl SequenceDiffer {
    pub fn new(algorithm: SequenceAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> SequenceAlgorithm {
        self.algorithm
    }

    /// Diff under value equality.
    pub fn diff<T, R>(&self, lhs: &[T], rhs: &[T], receiver: &mut R) -> Result<(), R::Error>
    where
        T: PartialEq,
        R: SequenceReceiver,
    {
        self.diff_by(lhs, rhs, |a, b| a == b, receiver)
    }

    /// Diff under an arbitrary match predicate. `matches` is always called
    /// as `matches(lhs_item, rhs_item)`.
    pub fn diff_by<L, Rt, F, R>(
        &self,
        lhs: &[L],
        rhs: &[Rt],
        matches: F,
        receiver: &mut R,
    ) -> Result<(), R::Error>
    where
        F: Fn(&L, &Rt) -> bool,
        R: SequenceReceiver,
    {
        let pred = |l: usize, r: usize| matches(&lhs[l], &rhs[r]);
        self.diff_indices(lhs.len(), rhs.len(), &pred, receiver)
    }

    /// Collect the runs of a value-equality diff.
    pub fn runs<T: PartialEq>(&self, lhs: &[T], rhs: &[T]) -> Vec<Run> {
        self.runs_by(lhs, rhs, |a, b| a == b)
    }

    /// Collect the runs of a predicate diff.
    pub fn runs_by<L, Rt, F>(&self, lhs: &[L], rhs: &[Rt], matches: F) -> Vec<Run>
    where
        F: Fn(&L, &Rt) -> bool,
    {
        let mut runs = Vec::new();
        match self.diff_by(lhs, rhs, matches, &mut runs) {
            Ok(()) => runs,
            Err(never) => match never {},
        }
    }

    fn diff_indices<R: SequenceReceiver>(
        &self,
        lhs_len: usize,
        rhs_len: usize,
        pred: &dyn Fn(usize, usize) -> bool,
        receiver: &mut R,
    ) -> Result<(), R::Error> {
        let old: Vec<Probe<'_>> = (0..lhs_len).map(|index| Probe::lhs(index, pred)).collect();
        let new: Vec<Probe<'_>> = (0..rhs_len).map(|index| Probe::rhs(index, pred)).collect();
        let mut hook = Coalesce::new(receiver);
        match self.algorithm {
            SequenceAlgorithm::Lcs => lcs::diff(&mut hook, &old, 0..lhs_len, &new, 0..rhs_len)?,
            SequenceAlgorithm::Myers => myers::diff(&mut hook, &old, 0..lhs_len, &new, 0..rhs_len)?,
        }
        // Both algorithms call `finish`, but flushing again is harmless.
        hook.flush()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Lhs,
    Rhs,
}

/// An index into one side, comparable against an index into the other
/// through the caller's predicate.
struct Probe<'p> {
    side: Side,
    index: usize,
    pred: &'p dyn Fn(usize, usize) -> bool,
}

impl<'p> Probe<'p> {
    fn lhs(index: usize, pred: &'p dyn Fn(usize, usize) -> bool) -> Self {
        Self {
            side: Side::Lhs,
            index,
            pred,
        }
    }

    fn rhs(index: usize, pred: &'p dyn Fn(usize, usize) -> bool) -> Self {
        Self {
            side: Side::Rhs,
            index,
            pred,
        }
    }
}

impl PartialEq for Probe<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self.side, other.side) {
            (Side::Lhs, Side::Rhs) => (self.pred)(self.index, other.index),
            (Side::Rhs, Side::Lhs) => (self.pred)(other.index, self.index),
            _ => self.index == other.index,
        }
    }
}

/// What the coalescer is holding back.
enum Pending {
    None,
    Equal {
        l_index: usize,
        r_index: usize,
        count: usize,
    },
    /// The gap between two equal runs: `lhs[old]` replaced by `rhs[new]`.
    Gap {
        old: Range<usize>,
        new: Range<usize>,
    },
}

/// Adapts `similar`'s callbacks to maximal runs with splice adjustment.
struct Coalesce<'r, R> {
    receiver: &'r mut R,
    pending: Pending,
    adjust: isize,
}

impl<'r, R: SequenceReceiver> Coalesce<'r, R> {
    fn new(receiver: &'r mut R) -> Self {
        Self {
            receiver,
            pending: Pending::None,
            adjust: 0,
        }
    }

    fn flush(&mut self) -> Result<(), R::Error> {
        match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::None => Ok(()),
            Pending::Equal {
                l_index,
                r_index,
                count,
            } => self.receiver.equal(l_index, self.adjust, r_index, count),
            Pending::Gap { old, new } => {
                if !old.is_empty() {
                    self.receiver.remove(old.start, self.adjust, old.len())?;
                    self.adjust -= old.len() as isize;
                }
                if !new.is_empty() {
                    self.receiver.insert(old.end, self.adjust, new.start, new.len())?;
                    self.adjust += new.len() as isize;
                }
                Ok(())
            }
        }
    }

    fn widen_gap(&mut self, old: Range<usize>, new: Range<usize>) -> Result<(), R::Error> {
        if let Pending::Gap {
            old: gap_old,
            new: gap_new,
        } = &mut self.pending
        {
            gap_old.end = gap_old.end.max(old.end);
            gap_new.end = gap_new.end.max(new.end);
            return Ok(());
        }
        self.flush()?;
        self.pending = Pending::Gap { old, new };
        Ok(())
    }
}

impl<R: SequenceReceiver> DiffHook for Coalesce<'_, R> {
    type Error = R::Error;

    fn equal(&mut self, old_index: usize, new_index: usize, len: usize) -> Result<(), R::Error> {
        if len == 0 {
            return Ok(());
        }
        if let Pending::Equal {
            l_index,
            r_index,
            count,
        } = &mut self.pending
        {
            if *l_index + *count == old_index && *r_index + *count == new_index {
                *count += len;
                return Ok(());
            }
        }
        self.flush()?;
        self.pending = Pending::Equal {
            l_index: old_index,
            r_index: new_index,
            count: len,
        };
        Ok(())
    }

    fn delete(&mut self, old_index: usize, old_len: usize, new_index: usize) -> Result<(), R::Error> {
        self.widen_gap(old_index..old_index + old_len, new_index..new_index)
    }

    fn insert(&mut self, old_index: usize, new_index: usize, new_len: usize) -> Result<(), R::Error> {
        self.widen_gap(old_index..old_index, new_index..new_index + new_len)
    }

    fn finish(&mut self) -> Result<(), R::Error> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay<T: Clone>(runs: &[Run], lhs: &[T], rhs: &[T]) -> Vec<T> {
        let mut working = lhs.to_vec();
        for run in runs {
            run.apply_to(&mut working, rhs);
        }
        working
    }

    fn both() -> [SequenceDiffer; 2] {
        [
            SequenceDiffer::new(SequenceAlgorithm::Lcs),
            SequenceDiffer::new(SequenceAlgorithm::Myers),
        ]
    }

    #[test]
    fn swap_ends() {
        for differ in both() {
            let (lhs, rhs) = ([0, 1, 2, 3, 4], [4, 1, 2, 3, 0]);
            let runs = differ.runs(&lhs, &rhs);
            assert_eq!(replay(&runs, &lhs, &rhs), rhs);
        }
    }

    #[test]
    fn pure_append() {
        let runs = SequenceDiffer::default().runs(&[0, 1, 2, 3], &[0, 1, 2, 3, 4]);
        assert_eq!(
            runs,
            vec![
                Run::Equal { l_index: 0, l_adjust: 0, r_index: 0, count: 4 },
                Run::Insert { l_index: 4, l_adjust: 0, r_index: 4, count: 1 },
            ]
        );
    }

    #[test]
    fn pure_truncate() {
        let runs = SequenceDiffer::default().runs(&[0, 1, 2, 3, 4], &[0, 1, 2, 3]);
        assert_eq!(
            runs,
            vec![
                Run::Equal { l_index: 0, l_adjust: 0, r_index: 0, count: 4 },
                Run::Remove { l_index: 4, l_adjust: 0, count: 1 },
            ]
        );
    }

    #[test]
    fn identical_is_one_equal_run() {
        for differ in both() {
            let runs = differ.runs(&[0, 1, 2, 3, 4], &[0, 1, 2, 3, 4]);
            assert_eq!(runs, vec![Run::Equal { l_index: 0, l_adjust: 0, r_index: 0, count: 5 }]);
        }
    }

    #[test]
    fn from_empty_is_one_insert() {
        for differ in both() {
            let runs = differ.runs(&[], &[0, 1, 2, 3, 4]);
            assert_eq!(runs, vec![Run::Insert { l_index: 0, l_adjust: 0, r_index: 0, count: 5 }]);
        }
    }

    #[test]
    fn to_empty_is_one_remove() {
        for differ in both() {
            let runs = differ.runs(&[0, 1, 2, 3, 4], &[]);
            assert_eq!(runs, vec![Run::Remove { l_index: 0, l_adjust: 0, count: 5 }]);
        }
    }

    #[test]
    fn both_empty_emits_nothing() {
        assert!(SequenceDiffer::default().runs::<u8>(&[], &[]).is_empty());
    }

    #[test]
    fn adjust_tracks_net_change() {
        let lhs = ['a', 'x', 'y', 'b', 'c'];
        let rhs = ['a', 'b', 'p', 'q', 'r', 'c'];
        let runs = SequenceDiffer::default().runs(&lhs, &rhs);
        assert_eq!(
            runs,
            vec![
                Run::Equal { l_index: 0, l_adjust: 0, r_index: 0, count: 1 },
                Run::Remove { l_index: 1, l_adjust: 0, count: 2 },
                Run::Equal { l_index: 3, l_adjust: -2, r_index: 1, count: 1 },
                Run::Insert { l_index: 4, l_adjust: -2, r_index: 2, count: 3 },
                Run::Equal { l_index: 4, l_adjust: 1, r_index: 5, count: 1 },
            ]
        );
        for run in &runs {
            if let Run::Insert { r_index, .. } | Run::Equal { r_index, .. } = run {
                assert_eq!(run.position(), *r_index);
            }
        }
        assert_eq!(replay(&runs, &lhs, &rhs), rhs);
    }

    #[test]
    fn runs_are_maximal() {
        for differ in both() {
            let runs = differ.runs(&[1, 2, 3, 4, 5, 6], &[7, 8, 9]);
            assert_eq!(
                runs,
                vec![
                    Run::Remove { l_index: 0, l_adjust: 0, count: 6 },
                    Run::Insert { l_index: 6, l_adjust: -6, r_index: 0, count: 3 },
                ]
            );
        }
    }

    #[test]
    fn predicate_sees_lhs_then_rhs() {
        let lhs = ["Alpha", "beta"];
        let rhs = [1usize, 5, 4];
        let runs = SequenceDiffer::default().runs_by(&lhs, &rhs, |l: &&str, r: &usize| l.len() == *r);
        assert_eq!(
            runs,
            vec![
                Run::Insert { l_index: 0, l_adjust: 0, r_index: 0, count: 1 },
                Run::Equal { l_index: 0, l_adjust: 1, r_index: 1, count: 2 },
            ]
        );
    }

    #[test]
    fn receiver_error_stops_the_pass() {
        struct FirstChange(usize);
        impl SequenceReceiver for FirstChange {
            type Error = &'static str;
            fn equal(&mut self, _: usize, _: isize, _: usize, _: usize) -> Result<(), Self::Error> {
                self.0 += 1;
                Ok(())
            }
            fn insert(&mut self, _: usize, _: isize, _: usize, _: usize) -> Result<(), Self::Error> {
                Err("changed")
            }
            fn remove(&mut self, _: usize, _: isize, _: usize) -> Result<(), Self::Error> {
                Err("changed")
            }
        }

        let mut first = FirstChange(0);
        assert_eq!(SequenceDiffer::default().diff(&[1, 2], &[1, 2], &mut first), Ok(()));
        assert_eq!(first.0, 1);

        let mut first = FirstChange(0);
        assert_eq!(
            SequenceDiffer::default().diff(&[1, 2, 3], &[1, 3], &mut first),
            Err("changed")
        );
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(128))]

            #[test]
            fn permutation_is_reproduced(perm in Just((0..25).collect::<Vec<u32>>()).prop_shuffle()) {
                let lhs: Vec<u32> = (0..25).collect();
                for differ in both() {
                    let runs = differ.runs(&lhs, &perm);
                    prop_assert_eq!(replay(&runs, &lhs, &perm), perm.clone());
                }
            }

            #[test]
            fn arbitrary_lists_converge(
                lhs in proptest::collection::vec(0u8..6, 0..20),
                rhs in proptest::collection::vec(0u8..6, 0..20),
            ) {
                for differ in both() {
                    let runs = differ.runs(&lhs, &rhs);
                    prop_assert_eq!(replay(&runs, &lhs, &rhs), rhs.clone());
                    for pair in runs.windows(2) {
                        prop_assert!(std::mem::discriminant(&pair[0]) != std::mem::discriminant(&pair[1]));
                    }
                }
            }
        }
    }
}
