//! Minimal run-length span toolkit. Entries which implement these traits can
//! be stored compactly in an [`RleVec`] and split / merged as ranges flow
//! through the causal graph.

mod rle_vec;

pub use rle_vec::RleVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The number of child items inside a span entry.
pub trait HasLength {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A span which can be cut in two.
pub trait SplitableSpan: Clone {
    /// Split the entry, returning the tail. After `truncate(at)`,
    /// `self.len() == at` and the returned value holds the rest.
    ///
    /// `at` must obey `0 < at < self.len()`.
    fn truncate(&mut self, at: usize) -> Self;

    /// The inverse of truncate: keep items from `at..len` in self, returning
    /// the head `0..at`.
    #[inline(always)]
    fn truncate_keeping_right(&mut self, at: usize) -> Self {
        let mut other = self.clone();
        *self = other.truncate(at);
        other
    }
}

/// A span which can be glued to an adjacent span.
pub trait MergableSpan: Clone {
    /// Can `other` be appended to self? Always called immediately before
    /// `append`.
    fn can_append(&self, other: &Self) -> bool;

    /// self = self + other. `other` must be a valid append target per
    /// `can_append`.
    fn append(&mut self, other: Self);

    /// self = other + self. `other.can_append(self)` must hold.
    #[inline(always)]
    fn prepend(&mut self, mut other: Self) {
        other.append(self.clone());
        *self = other;
    }
}

/// Spans stored in a searchable list have a key (the offset of their first
/// item).
pub trait HasRleKey {
    fn rle_key(&self) -> usize;
}

pub trait RleSpanHelpers: HasRleKey + HasLength {
    /// Past-the-end key of this span.
    fn end(&self) -> usize {
        self.rle_key() + self.len()
    }

    fn last(&self) -> usize {
        self.end() - 1
    }
}

impl<V: HasRleKey + HasLength> RleSpanHelpers for V {}

/// Push items to a list-like container, merging into the last entry when
/// possible.
pub trait AppendRle<T: MergableSpan> {
    /// Returns true if the item was merged into the last entry.
    fn push_rle(&mut self, item: T) -> bool;

    /// Push onto a list sorted in reverse: merge the incoming item in front
    /// of the last entry when possible.
    fn push_reversed_rle(&mut self, item: T) -> bool;
}

impl<T: MergableSpan> AppendRle<T> for Vec<T> {
    fn push_rle(&mut self, item: T) -> bool {
        if let Some(v) = self.last_mut() {
            if v.can_append(&item) {
                v.append(item);
                return true;
            }
        }
        self.push(item);
        false
    }

    fn push_reversed_rle(&mut self, item: T) -> bool {
        if let Some(v) = self.last_mut() {
            if item.can_append(v) {
                v.prepend(item);
                return true;
            }
        }
        self.push(item);
        false
    }
}

impl<A: smallvec::Array> AppendRle<A::Item> for smallvec::SmallVec<A>
where
    A::Item: MergableSpan,
{
    fn push_rle(&mut self, item: A::Item) -> bool {
        if let Some(v) = self.last_mut() {
            if v.can_append(&item) {
                v.append(item);
                return true;
            }
        }
        self.push(item);
        false
    }

    fn push_reversed_rle(&mut self, item: A::Item) -> bool {
        if let Some(v) = self.last_mut() {
            if item.can_append(v) {
                v.prepend(item);
                return true;
            }
        }
        self.push(item);
        false
    }
}

/// A span keyed at some offset. Splitting shifts the key of the tail.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KVPair<V>(pub usize, pub V);

impl<V> HasRleKey for KVPair<V> {
    fn rle_key(&self) -> usize {
        self.0
    }
}

impl<V: HasLength> HasLength for KVPair<V> {
    fn len(&self) -> usize {
        self.1.len()
    }
}

impl<V: SplitableSpan + HasLength> SplitableSpan for KVPair<V> {
    fn truncate(&mut self, at: usize) -> Self {
        debug_assert!(at > 0 && at < self.1.len());
        let remainder = self.1.truncate(at);
        KVPair(self.0 + at, remainder)
    }

    fn truncate_keeping_right(&mut self, at: usize) -> Self {
        let old_key = self.0;
        self.0 += at;
        let trimmed = self.1.truncate_keeping_right(at);
        KVPair(old_key, trimmed)
    }
}

impl<V: MergableSpan + HasLength> MergableSpan for KVPair<V> {
    fn can_append(&self, other: &Self) -> bool {
        other.0 == self.0 + self.1.len() && self.1.can_append(&other.1)
    }

    fn append(&mut self, other: Self) {
        self.1.append(other.1);
    }

    fn prepend(&mut self, other: Self) {
        self.1.prepend(other.1);
        self.0 = other.0;
    }
}

impl<V: Default> Default for KVPair<V> {
    fn default() -> Self {
        KVPair(0, V::default())
    }
}

/// Verify an implementation of the span traits is self consistent. Use this
/// from tests with an entry of length >= 2.
pub fn test_splitable_methods_valid<E>(entry: E)
where
    E: SplitableSpan + MergableSpan + HasLength + std::fmt::Debug + Clone + Eq,
{
    assert!(entry.len() >= 2, "call this with a larger entry");
    for i in 1..entry.len() {
        let mut start = entry.clone();
        let end = start.truncate(i);

        assert_eq!(start.len(), i);
        assert_eq!(end.len(), entry.len() - i);
        assert!(start.can_append(&end));

        let mut merge_append = start.clone();
        merge_append.append(end.clone());
        assert_eq!(merge_append, entry);

        let mut merge_prepend = end.clone();
        merge_prepend.prepend(start.clone());
        assert_eq!(merge_prepend, entry);

        let mut end2 = entry.clone();
        let start2 = end2.truncate_keeping_right(i);
        assert_eq!(end2, end);
        assert_eq!(start2, start);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::LVRange;

    #[test]
    fn kvpair_valid() {
        test_splitable_methods_valid(KVPair(10, LVRange::new(20, 25)));
    }

    #[test]
    fn push_rle_merges() {
        let mut v: Vec<LVRange> = vec![];
        assert!(!v.push_rle((0..5).into()));
        assert!(v.push_rle((5..10).into()));
        assert!(!v.push_rle((12..15).into()));
        assert_eq!(v, vec![(0..10).into(), (12..15).into()]);
    }

    #[test]
    fn push_reversed_rle_merges() {
        let mut v: Vec<LVRange> = vec![];
        v.push_reversed_rle((5..10).into());
        v.push_reversed_rle((0..5).into());
        assert_eq!(v, vec![(0..10).into()]);
    }
}
