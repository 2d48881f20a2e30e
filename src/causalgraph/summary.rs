//! Version summaries: a per-agent description of which sequence numbers a
//! version's history covers. Summaries are what peers exchange to work out
//! which operations the other side is missing.

use std::collections::BinaryHeap;

use smallvec::SmallVec;
use smartstring::alias::String as SmartString;

use crate::causalgraph::agent_span::AgentSpan;
use crate::causalgraph::entry::CGEntry;
use crate::rle::AppendRle;
use crate::{CausalGraph, CGError, Frontier, LVRange, LV};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VSEntry {
    pub name: SmartString,
    /// Sorted, merged `[seq_start, seq_end)` ranges.
    pub seq_ranges: SmallVec<[LVRange; 2]>,
}

/// A map from agent name to the sorted set of sequence numbers covered by
/// some version's history.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VersionSummary(pub Vec<VSEntry>);

impl VersionSummary {
    pub fn iter(&self) -> std::slice::Iter<'_, VSEntry> {
        self.0.iter()
    }

    pub fn for_agent(&self, name: &str) -> Option<&[LVRange]> {
        self.0
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.seq_ranges.as_slice())
    }

    /// Does the summary cover this `(agent, seq)` pair?
    pub fn contains(&self, name: &str, seq: usize) -> bool {
        self.for_agent(name)
            .is_some_and(|ranges| ranges.iter().any(|r| r.contains(seq)))
    }

    /// The sub-ranges of `seq_range` which this summary does not cover for
    /// the named agent, in ascending order.
    pub(crate) fn uncovered_in(&self, name: &str, seq_range: LVRange) -> SmallVec<[LVRange; 2]> {
        let mut result = SmallVec::new();
        let mut cursor = seq_range.start;

        if let Some(ranges) = self.for_agent(name) {
            for r in ranges {
                if r.end <= cursor {
                    continue;
                }
                if r.start >= seq_range.end {
                    break;
                }
                if r.start > cursor {
                    result.push(LVRange::new(cursor, r.start.min(seq_range.end)));
                }
                cursor = cursor.max(r.end);
                if cursor >= seq_range.end {
                    break;
                }
            }
        }

        if cursor < seq_range.end {
            result.push(LVRange::new(cursor, seq_range.end));
        }
        result
    }
}

impl CausalGraph {
    /// Summarize the full history of a frontier: for each agent, the sorted
    /// merged ranges of sequence numbers its history covers.
    pub fn summarize_version(&self, frontier: &[LV]) -> Result<VersionSummary, CGError> {
        self.check_frontier(frontier)?;

        // Collected seq ranges, indexed by AgentId.
        let mut per_agent: Vec<Vec<LVRange>> =
            vec![Vec::new(); self.agent_assignment.client_data.len()];

        let mut queue: BinaryHeap<LV> = frontier.iter().copied().collect();
        let mut done = std::collections::HashSet::new();

        while let Some(v) = queue.pop() {
            let (entry, offset) = self.entry_at(v).unwrap();

            while let Some(&peek) = queue.peek() {
                if peek >= entry.start {
                    queue.pop();
                } else {
                    break;
                }
            }

            if !done.insert(entry.start) {
                continue;
            }

            let seq_lo = entry.span.seq_range.start;
            per_agent[entry.span.agent as usize].push(LVRange::new(seq_lo, seq_lo + offset + 1));

            for &p in entry.parents.iter() {
                queue.push(p);
            }
        }

        let mut result = Vec::new();
        for (agent, mut ranges) in per_agent.into_iter().enumerate() {
            if ranges.is_empty() {
                continue;
            }
            ranges.sort_unstable_by_key(|r| r.start);
            let mut merged: SmallVec<[LVRange; 2]> = SmallVec::new();
            for r in ranges {
                merged.push_rle(r);
            }
            result.push(VSEntry {
                name: self.agent_assignment.client_data[agent].name.clone(),
                seq_ranges: merged,
            });
        }
        Ok(VersionSummary(result))
    }

    /// The runs in this graph which the summary does not cover. Run
    /// boundaries and parent pointers are reconstructed for each uncovered
    /// slice: a slice starting mid-run gets `[lv - 1]` as its parents.
    pub fn intersect_with_summary_full(&self, summary: &VersionSummary) -> Vec<CGEntry> {
        let mut result = Vec::new();

        // Every version in the graph is an ancestor of the heads, so a
        // linear scan over the entries visits the entire history.
        for entry in self.entries.iter() {
            let name = self.agent_assignment.get_agent_name(entry.span.agent);
            for uncovered in summary.uncovered_in(name, entry.span.seq_range) {
                let offset = uncovered.start - entry.span.seq_range.start;
                let start = entry.start + offset;
                let parents = if offset == 0 {
                    entry.parents.clone()
                } else {
                    Frontier::new_1(start - 1)
                };
                result.push(CGEntry {
                    start,
                    parents,
                    span: AgentSpan {
                        agent: entry.span.agent,
                        seq_range: uncovered,
                    },
                });
            }
        }
        result
    }

    /// The LVs in this graph which the summary does not cover, ascending.
    pub fn intersect_with_summary(&self, summary: &VersionSummary) -> Vec<LV> {
        self.intersect_with_summary_full(summary)
            .iter()
            .flat_map(|e| e.lv_span().iter())
            .collect()
    }
}
