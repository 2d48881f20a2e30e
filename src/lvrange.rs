use std::fmt::{Debug, Formatter};
use std::ops::Range;

use crate::rle::{HasLength, HasRleKey, MergableSpan, SplitableSpan};
use crate::LV;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A half-open range `[start, end)` of local versions. This is a replacement
/// for `Range<usize>`, which regrettably doesn't implement Copy. Convert to
/// and from `Range` with `.into()`.
#[derive(Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LVRange {
    pub start: LV,
    pub end: LV,
}

impl LVRange {
    #[inline]
    pub fn new(start: LV, end: LV) -> Self {
        LVRange { start, end }
    }

    #[inline]
    pub fn new_from_len(start: LV, len: usize) -> Self {
        LVRange { start, end: start + len }
    }

    pub fn last(&self) -> LV {
        debug_assert!(!self.is_empty());
        self.end - 1
    }

    pub fn contains(&self, item: LV) -> bool {
        self.start <= item && item < self.end
    }

    pub fn is_empty(&self) -> bool {
        debug_assert!(self.start <= self.end);
        self.start == self.end
    }

    pub fn intersect(&self, other: &Self) -> Option<LVRange> {
        let result = LVRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        };
        if result.start <= result.end {
            Some(result)
        } else {
            None
        }
    }

    pub fn iter(&self) -> Range<LV> {
        (*self).into()
    }
}

impl From<LV> for LVRange {
    fn from(start: LV) -> Self {
        LVRange { start, end: start + 1 }
    }
}

impl From<Range<LV>> for LVRange {
    fn from(range: Range<LV>) -> Self {
        LVRange { start: range.start, end: range.end }
    }
}

impl From<LVRange> for Range<LV> {
    fn from(span: LVRange) -> Self {
        span.start..span.end
    }
}

impl HasLength for LVRange {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

impl SplitableSpan for LVRange {
    fn truncate(&mut self, at: usize) -> Self {
        let split = self.start + at;
        let other = LVRange { start: split, end: self.end };
        self.end = split;
        other
    }

    #[inline]
    fn truncate_keeping_right(&mut self, at: usize) -> Self {
        let split = self.start + at;
        let other = LVRange { start: self.start, end: split };
        self.start = split;
        other
    }
}

impl MergableSpan for LVRange {
    fn can_append(&self, other: &Self) -> bool {
        other.start == self.end
    }

    fn append(&mut self, other: Self) {
        self.end = other.end;
    }

    fn prepend(&mut self, other: Self) {
        self.start = other.start;
    }
}

impl HasRleKey for LVRange {
    fn rle_key(&self) -> usize {
        self.start
    }
}

impl Debug for LVRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "V {}..{}", self.start, self.end)
    }
}
