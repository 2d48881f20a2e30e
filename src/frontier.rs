use std::fmt::{Debug, Formatter};
use std::ops::Deref;

use smallvec::SmallVec;

use crate::{LVRange, LV};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A version frontier: the set of local versions with no descendant inside
/// the set. The current time of a document view is always expressed as a
/// frontier.
///
/// Frontiers are kept sorted (smallest to largest) and deduplicated. The
/// empty frontier is the root version, before any operation.
#[derive(Clone, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frontier(pub SmallVec<[LV; 2]>);

impl Frontier {
    /// The root (empty) frontier.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new_1(lv: LV) -> Self {
        Self(smallvec::smallvec![lv])
    }

    /// Build a frontier from a slice which is already sorted and
    /// deduplicated.
    pub fn from_sorted(lvs: &[LV]) -> Self {
        let f = Self(lvs.into());
        f.debug_check_sorted();
        f
    }

    /// Build a frontier from arbitrary input, sorting and deduplicating.
    pub fn from_unsorted(lvs: &[LV]) -> Self {
        let mut v: SmallVec<[LV; 2]> = lvs.into();
        v.sort_unstable();
        v.dedup();
        Self(v)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_ref(&self) -> &[LV] {
        self.0.as_slice()
    }

    pub(crate) fn retain<F: FnMut(LV) -> bool>(&mut self, mut f: F) {
        self.0.retain(|v| f(*v));
    }

    /// Insert a new item, maintaining sort order. The item must not already
    /// be present.
    pub(crate) fn add(&mut self, new_item: LV) {
        let idx = self.0.binary_search(&new_item).unwrap_err();
        self.0.insert(idx, new_item);
        self.debug_check_sorted();
    }

    /// Advance this frontier by a run of new versions whose first element has
    /// the given parents. The new heads are `(self \ parents) + {span.last()}`.
    pub(crate) fn advance_by_known_run(&mut self, parents: &[LV], span: LVRange) {
        debug_assert!(!span.is_empty());

        // Short circuit the common case of time advancing linearly.
        if parents.len() == 1 && self.0.len() == 1 && parents[0] == self.0[0] {
            self.0[0] = span.last();
            return;
        }

        if self.as_ref() == parents {
            self.0.clear();
            self.0.push(span.last());
            return;
        }

        self.retain(|v| !parents.contains(&v));
        self.add(span.last());
    }

    pub(crate) fn debug_check_sorted(&self) {
        debug_assert!(frontier_is_sorted(self.as_ref()));
    }
}

/// Frontiers should always be sorted smallest to largest, with no duplicates.
pub(crate) fn frontier_is_sorted(frontier: &[LV]) -> bool {
    if frontier.len() >= 2 {
        let mut last = frontier[0];
        for &v in &frontier[1..] {
            if last >= v {
                return false;
            }
            last = v;
        }
    }
    true
}

impl Deref for Frontier {
    type Target = [LV];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl From<&[LV]> for Frontier {
    fn from(lvs: &[LV]) -> Self {
        Self::from_unsorted(lvs)
    }
}

impl FromIterator<LV> for Frontier {
    fn from_iter<T: IntoIterator<Item = LV>>(iter: T) -> Self {
        let mut v: SmallVec<[LV; 2]> = iter.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        Self(v)
    }
}

impl Debug for Frontier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frontier")?;
        f.debug_list().entries(self.0.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontier_movement_smoke_tests() {
        let mut f = Frontier::root();
        f.advance_by_known_run(&[], (0..10).into());
        assert_eq!(f.as_ref(), &[9]);

        f.advance_by_known_run(&[9], (10..11).into());
        assert_eq!(f.as_ref(), &[10]);
    }

    #[test]
    fn frontier_stays_sorted() {
        let mut f = Frontier::from_sorted(&[1, 10]);
        // A concurrent run whose parent is neither head.
        f.advance_by_known_run(&[0], (12..14).into());
        assert_eq!(f.as_ref(), &[1, 10, 13]);

        // A merge consuming two of the three heads.
        f.advance_by_known_run(&[1, 13], (14..15).into());
        assert_eq!(f.as_ref(), &[10, 14]);
    }

    #[test]
    fn from_unsorted_dedups() {
        let f = Frontier::from_unsorted(&[5, 1, 5, 3]);
        assert_eq!(f.as_ref(), &[1, 3, 5]);
        assert!(Frontier::root().is_root());
    }
}
