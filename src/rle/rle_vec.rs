use std::cmp::Ordering::*;

use crate::rle::{AppendRle, HasLength, HasRleKey, MergableSpan, RleSpanHelpers};

/// A list of run-length encoded entries, sorted by key and searchable by
/// binary search. Appending an entry will extend the last entry in the list
/// when the spans can merge.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RleVec<V: HasLength + MergableSpan>(pub Vec<V>);

impl<V: HasLength + MergableSpan> Default for RleVec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: HasLength + MergableSpan> RleVec<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a new value to the end of the list. O(1) average time.
    ///
    /// Returns true if the item was merged into the previous item.
    pub fn push(&mut self, val: V) -> bool {
        self.0.push_rle(val)
    }

    pub fn last_entry(&self) -> Option<&V> {
        self.0.last()
    }

    pub fn num_entries(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, V> {
        self.0.iter()
    }
}

impl<V: HasLength + MergableSpan + HasRleKey> RleVec<V> {
    /// Past the end of the last key.
    pub fn end(&self) -> usize {
        self.last_entry().map_or(0, |v| v.end())
    }

    /// Find the index of the entry containing the needle via binary search.
    pub fn find_index(&self, needle: usize) -> Result<usize, usize> {
        self.0.binary_search_by(|entry| {
            let key = entry.rle_key();
            if needle < key {
                Greater
            } else if needle >= key + entry.len() {
                Less
            } else {
                Equal
            }
        })
    }

    /// Find the entry containing the needle, if any.
    pub fn find(&self, needle: usize) -> Option<&V> {
        self.find_index(needle).ok().map(|idx| &self.0[idx])
    }

    /// Find the entry containing the needle in a list with no gaps.
    pub fn find_packed(&self, needle: usize) -> &V {
        self.find(needle).unwrap()
    }

    /// Find the entry containing the needle, returning the offset of the
    /// needle within it.
    pub fn find_with_offset(&self, needle: usize) -> Option<(&V, usize)> {
        self.find_index(needle).ok().map(|idx| {
            let entry = &self.0[idx];
            (entry, needle - entry.rle_key())
        })
    }

    pub fn contains_needle(&self, needle: usize) -> bool {
        !self.is_empty() && self.find_index(needle).is_ok()
    }
}

impl<V: HasLength + MergableSpan> FromIterator<V> for RleVec<V> {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        let mut rle = Self::new();
        for item in iter {
            rle.push(item);
        }
        rle
    }
}
