use crate::rle::{HasLength, MergableSpan, SplitableSpan};
use crate::{AgentId, LVRange};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A sequential span of `(agent, seq)` versions.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgentSpan {
    pub agent: AgentId,
    pub seq_range: LVRange,
}

impl AgentSpan {
    /// The seq at the given offset into the span.
    pub fn seq_at_offset(&self, offset: usize) -> usize {
        debug_assert!(offset < self.len());
        self.seq_range.start + offset
    }
}

impl From<(AgentId, LVRange)> for AgentSpan {
    fn from((agent, seq_range): (AgentId, LVRange)) -> Self {
        AgentSpan { agent, seq_range }
    }
}

impl HasLength for AgentSpan {
    fn len(&self) -> usize {
        self.seq_range.len()
    }
}

impl SplitableSpan for AgentSpan {
    fn truncate(&mut self, at: usize) -> Self {
        AgentSpan {
            agent: self.agent,
            seq_range: self.seq_range.truncate(at),
        }
    }

    fn truncate_keeping_right(&mut self, at: usize) -> Self {
        AgentSpan {
            agent: self.agent,
            seq_range: self.seq_range.truncate_keeping_right(at),
        }
    }
}

impl MergableSpan for AgentSpan {
    fn can_append(&self, other: &Self) -> bool {
        self.agent == other.agent && self.seq_range.end == other.seq_range.start
    }

    fn append(&mut self, other: Self) {
        self.seq_range.end = other.seq_range.end;
    }

    fn prepend(&mut self, other: Self) {
        self.seq_range.start = other.seq_range.start;
    }
}
