//! The causal graph: a compact, append-only representation of operation
//! identities, their parent relationships and the mapping between global
//! `(agent, seq)` identities and dense local versions.

use std::error::Error;
use std::fmt::{Display, Formatter};

use smartstring::alias::String as SmartString;

use crate::causalgraph::agent_assignment::AgentAssignment;
use crate::causalgraph::agent_span::AgentSpan;
use crate::causalgraph::entry::CGEntry;
use crate::causalgraph::raw_ids::RawVersion;
use crate::rle::{KVPair, RleVec};
use crate::{Frontier, LVRange, LV};

pub mod entry;
pub mod agent_span;
pub mod agent_assignment;
pub mod raw_ids;
pub mod summary;
mod tools;
mod check;

pub use tools::VersionRelation;

#[derive(Clone, Debug, Default)]
pub struct CausalGraph {
    /// Maps agent names to IDs, and each agent's sequence numbers to LVs.
    pub(crate) agent_assignment: AgentAssignment,

    /// Parent and identity metadata for every operation, stored as runs and
    /// sorted by starting LV. This is the core data set: it compactly stores
    /// the list of parents for every operation.
    pub(crate) entries: RleVec<CGEntry>,

    /// The heads of the graph: the version you get when every known
    /// operation is merged. Kept sorted and deduplicated.
    pub version: Frontier,
}

/// The outcome of a successful [`CausalGraph::add_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddRawResult {
    /// The span of LVs assigned to the new run.
    Assigned(LVRange),
    /// The run's identity is already known. The graph was not modified. The
    /// LV of the (first) existing version is returned.
    Duplicate(LV),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CGError {
    /// An LV or frontier member is outside `[0, next_lv)`.
    InvalidVersion(LV),
    /// A raw parent was referenced which is not in the graph.
    UnknownParent(RawVersion),
    /// The sequence number of a new run is below the agent's next sequence.
    SeqOutOfOrder { agent: SmartString, expected: usize, actual: usize },
    /// The sequence number of a new run would leave a gap.
    SeqGap { agent: SmartString, expected: usize, actual: usize },
    /// Runs must contain at least one version.
    InvalidLength,
}

impl Display for CGError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CGError::InvalidVersion(lv) => write!(f, "Local version {lv} is not in the causal graph"),
            CGError::UnknownParent(rv) => {
                write!(f, "Parent version {}:{} is not in the causal graph", rv.agent(), rv.seq())
            }
            CGError::SeqOutOfOrder { agent, expected, actual } => {
                write!(f, "Sequence {actual} for agent {agent} is out of order (next is {expected})")
            }
            CGError::SeqGap { agent, expected, actual } => {
                write!(f, "Sequence {actual} for agent {agent} leaves a gap (next is {expected})")
            }
            CGError::InvalidLength => write!(f, "Run length must be at least 1"),
        }
    }
}

impl Error for CGError {}

impl CausalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next local version to be assigned; also the number of versions in
    /// the graph.
    pub fn next_lv(&self) -> LV {
        self.entries.end()
    }

    pub fn len(&self) -> usize {
        self.entries.end()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The current heads of the graph, sorted ascending.
    pub fn heads(&self) -> &[LV] {
        self.version.as_ref()
    }

    pub fn get_agent_name(&self, agent: crate::AgentId) -> &str {
        self.agent_assignment.get_agent_name(agent)
    }

    /// The next sequence number for the given agent (0 for unknown agents).
    pub fn next_seq_for(&self, agent: &str) -> usize {
        match self.agent_assignment.get_agent_id(agent) {
            Some(id) => self.agent_assignment.client_data[id as usize].get_next_seq(),
            None => 0,
        }
    }

    /// Iterate over the graph's runs, sorted by starting LV. This is the
    /// surface a persistence layer reads to write the graph out.
    pub fn iter(&self) -> std::slice::Iter<'_, CGEntry> {
        self.entries.iter()
    }

    pub(crate) fn entry_at(&self, lv: LV) -> Result<(&CGEntry, usize), CGError> {
        self.entries
            .find_with_offset(lv)
            .ok_or(CGError::InvalidVersion(lv))
    }

    /// The parents of a single version.
    pub fn parents_at(&self, lv: LV) -> Result<Frontier, CGError> {
        let (entry, _offset) = self.entry_at(lv)?;
        Ok(entry.clone_parents_at_version(lv))
    }

    pub(crate) fn check_lv(&self, lv: LV) -> Result<(), CGError> {
        if lv < self.next_lv() {
            Ok(())
        } else {
            Err(CGError::InvalidVersion(lv))
        }
    }

    pub(crate) fn check_frontier(&self, frontier: &[LV]) -> Result<(), CGError> {
        for &v in frontier {
            self.check_lv(v)?;
        }
        Ok(())
    }

    /// Add a run of versions to the graph.
    ///
    /// `id` names the first version of the run; the run covers sequence
    /// numbers `id.seq .. id.seq + len` for that agent. `raw_parents` are the
    /// parents of the first version; `None` (distinct from `Some(&[])`, the
    /// root) defaults to the current graph heads.
    ///
    /// Adding a run whose identity is already known is a no-op, reported as
    /// [`AddRawResult::Duplicate`]. This is what makes replayed / reordered
    /// delivery of the same operations safe.
    pub fn add_raw(
        &mut self,
        id: &RawVersion,
        len: usize,
        raw_parents: Option<&[RawVersion]>,
    ) -> Result<AddRawResult, CGError> {
        if len == 0 {
            return Err(CGError::InvalidLength);
        }

        if let Some(lv) = self.try_raw_to_lv(id.agent(), id.seq()) {
            return Ok(AddRawResult::Duplicate(lv));
        }

        let parents: Frontier = match raw_parents {
            None => self.version.clone(),
            Some(raw) => self.try_raw_to_local_frontier(raw)?,
        };

        let agent = self.agent_assignment.get_or_create_agent_id(id.agent());
        let next_seq = self.agent_assignment.client_data[agent as usize].get_next_seq();
        match id.seq().cmp(&next_seq) {
            std::cmp::Ordering::Less => {
                return Err(CGError::SeqOutOfOrder {
                    agent: id.0.clone(),
                    expected: next_seq,
                    actual: id.seq(),
                });
            }
            std::cmp::Ordering::Greater => {
                return Err(CGError::SeqGap {
                    agent: id.0.clone(),
                    expected: next_seq,
                    actual: id.seq(),
                });
            }
            std::cmp::Ordering::Equal => {}
        }

        let start = self.next_lv();
        let span = LVRange::new_from_len(start, len);

        self.agent_assignment.client_data[agent as usize]
            .item_times
            .push(KVPair(id.seq(), span));

        self.entries.push(CGEntry {
            start,
            parents: parents.clone(),
            span: AgentSpan {
                agent,
                seq_range: LVRange::new_from_len(id.seq(), len),
            },
        });

        self.version.advance_by_known_run(parents.as_ref(), span);

        Ok(AddRawResult::Assigned(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rv(agent: &str, seq: usize) -> RawVersion {
        RawVersion::new(agent, seq)
    }

    #[test]
    fn empty_graph() {
        let cg = CausalGraph::new();
        assert_eq!(cg.next_lv(), 0);
        assert!(cg.is_empty());
        assert!(cg.heads().is_empty());
        assert_eq!(cg.next_seq_for("seph"), 0);
    }

    #[test]
    fn add_raw_basics() {
        let mut cg = CausalGraph::new();
        let r = cg.add_raw(&rv("seph", 0), 3, Some(&[])).unwrap();
        assert_eq!(r, AddRawResult::Assigned((0..3).into()));
        assert_eq!(cg.next_lv(), 3);
        assert_eq!(cg.heads(), &[2]);
        assert_eq!(cg.next_seq_for("seph"), 3);

        // Default parents are the graph heads.
        let r = cg.add_raw(&rv("mike", 0), 1, None).unwrap();
        assert_eq!(r, AddRawResult::Assigned((3..4).into()));
        assert_eq!(cg.heads(), &[3]);
        assert_eq!(cg.parents_at(3).unwrap().as_ref(), &[2]);
    }

    #[test]
    fn add_raw_concurrent_heads() {
        let mut cg = CausalGraph::new();
        cg.add_raw(&rv("a", 0), 1, Some(&[])).unwrap();
        cg.add_raw(&rv("b", 0), 1, Some(&[])).unwrap();
        assert_eq!(cg.heads(), &[0, 1]);

        // A merge of both heads.
        cg.add_raw(&rv("a", 1), 1, Some(&[rv("a", 0), rv("b", 0)])).unwrap();
        assert_eq!(cg.heads(), &[2]);
        assert_eq!(cg.parents_at(2).unwrap().as_ref(), &[0, 1]);
    }

    #[test]
    fn add_raw_extends_runs() {
        let mut cg = CausalGraph::new();
        cg.add_raw(&rv("seph", 0), 1, Some(&[])).unwrap();
        cg.add_raw(&rv("seph", 1), 1, None).unwrap();
        cg.add_raw(&rv("seph", 2), 2, None).unwrap();

        // All four versions collapse into a single run.
        assert_eq!(cg.entries.num_entries(), 1);
        assert_eq!(cg.next_lv(), 4);
        assert_eq!(cg.lv_to_raw(3).unwrap(), rv("seph", 3));
    }

    #[test]
    fn add_raw_duplicate() {
        let mut cg = CausalGraph::new();
        cg.add_raw(&rv("seph", 0), 2, Some(&[])).unwrap();
        let before = cg.next_lv();

        assert_eq!(cg.add_raw(&rv("seph", 0), 2, Some(&[])).unwrap(),
                   AddRawResult::Duplicate(0));
        assert_eq!(cg.add_raw(&rv("seph", 1), 1, Some(&[])).unwrap(),
                   AddRawResult::Duplicate(1));
        assert_eq!(cg.next_lv(), before);
    }

    #[test]
    fn add_raw_errors() {
        let mut cg = CausalGraph::new();
        assert_eq!(cg.add_raw(&rv("seph", 0), 0, Some(&[])),
                   Err(CGError::InvalidLength));

        // A gap in the sequence numbers.
        assert!(matches!(
            cg.add_raw(&rv("seph", 5), 1, Some(&[])),
            Err(CGError::SeqGap { expected: 0, actual: 5, .. })
        ));

        // Unknown parents are rejected before any state changes.
        let err = cg.add_raw(&rv("seph", 0), 1, Some(&[rv("ghost", 0)]));
        assert_eq!(err, Err(CGError::UnknownParent(rv("ghost", 0))));
        assert_eq!(cg.next_lv(), 0);
        assert_eq!(cg.next_seq_for("seph"), 0);
    }
}
