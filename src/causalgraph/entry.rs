use crate::causalgraph::agent_span::AgentSpan;
use crate::rle::{HasLength, HasRleKey, MergableSpan};
use crate::{Frontier, LVRange, LV};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A run of versions in the causal graph: a contiguous block of LVs created
/// by one agent with consecutive sequence numbers. `parents` names the
/// parents of the first version in the run; every subsequent version's
/// implicit parent is its predecessor.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CGEntry {
    pub start: LV,
    pub parents: Frontier,
    pub span: AgentSpan,
}

impl CGEntry {
    pub fn end(&self) -> LV {
        self.start + self.len()
    }

    pub fn lv_span(&self) -> LVRange {
        (self.start..self.end()).into()
    }

    pub fn contains(&self, lv: LV) -> bool {
        self.lv_span().contains(lv)
    }

    /// True when this run directly extends the previous version: exactly one
    /// parent, which is `start - 1`.
    pub fn parents_are_trivial(&self) -> bool {
        self.parents.len() == 1 && self.parents[0] == self.start - 1
    }

    /// The parents of a specific version within this run. For offsets past
    /// the start, the implicit parent is the preceding version.
    pub fn clone_parents_at_version(&self, v: LV) -> Frontier {
        debug_assert!(self.contains(v));
        if v > self.start {
            Frontier::new_1(v - 1)
        } else {
            self.parents.clone()
        }
    }
}

impl HasLength for CGEntry {
    fn len(&self) -> usize {
        self.span.len()
    }
}

impl HasRleKey for CGEntry {
    fn rle_key(&self) -> usize {
        self.start
    }
}

impl MergableSpan for CGEntry {
    fn can_append(&self, other: &Self) -> bool {
        self.end() == other.start
            && other.parents_are_trivial()
            && self.span.can_append(&other.span)
    }

    fn append(&mut self, other: Self) {
        self.span.append(other.span);
        // The other entry's parents are trivial; they don't matter.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_appends() {
        let mut a = CGEntry {
            start: 10,
            parents: Frontier::new_1(3),
            span: AgentSpan { agent: 0, seq_range: (0..5).into() },
        };
        let b = CGEntry {
            start: 15,
            parents: Frontier::new_1(14),
            span: AgentSpan { agent: 0, seq_range: (5..8).into() },
        };
        assert!(a.can_append(&b));
        a.append(b);
        assert_eq!(a.lv_span(), (10..18).into());
        assert_eq!(a.span.seq_range, (0..8).into());

        // A different agent breaks the run.
        let c = CGEntry {
            start: 18,
            parents: Frontier::new_1(17),
            span: AgentSpan { agent: 1, seq_range: (0..1).into() },
        };
        assert!(!a.can_append(&c));
    }

    #[test]
    fn parents_within_run() {
        let e = CGEntry {
            start: 5,
            parents: Frontier::from_sorted(&[1, 3]),
            span: AgentSpan { agent: 0, seq_range: (0..4).into() },
        };
        assert_eq!(e.clone_parents_at_version(5).as_ref(), &[1, 3]);
        assert_eq!(e.clone_parents_at_version(7).as_ref(), &[6]);
        assert!(!e.parents_are_trivial());
    }
}
