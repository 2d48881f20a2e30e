//! Raw version IDs: the `(agent, seq)` pairs which identify operations
//! across replicas, and conversions between them and local versions.

use smartstring::alias::String as SmartString;

use crate::{CausalGraph, CGError, Frontier, LV};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A globally unique operation identity: `(agent, seq)`. These are the IDs
/// you can pass to a remote peer.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawVersion(pub SmartString, pub usize);

impl RawVersion {
    pub fn new(agent: &str, seq: usize) -> Self {
        RawVersion(SmartString::from(agent), seq)
    }

    pub fn agent(&self) -> &str {
        self.0.as_str()
    }

    pub fn seq(&self) -> usize {
        self.1
    }
}

impl<S: Into<SmartString>> From<(S, usize)> for RawVersion {
    fn from((agent, seq): (S, usize)) -> Self {
        RawVersion(agent.into(), seq)
    }
}

impl CausalGraph {
    /// Look up the LV assigned to a raw version, if it is known.
    pub fn try_raw_to_lv(&self, agent: &str, seq: usize) -> Option<LV> {
        let agent = self.agent_assignment.get_agent_id(agent)?;
        self.agent_assignment.try_agent_version_to_lv(agent, seq)
    }

    /// Convert an LV to its raw `(agent, seq)` identity.
    pub fn lv_to_raw(&self, lv: LV) -> Result<RawVersion, CGError> {
        let (entry, offset) = self.entry_at(lv)?;
        let name = self.agent_assignment.get_agent_name(entry.span.agent);
        Ok(RawVersion::new(name, entry.span.seq_at_offset(offset)))
    }

    /// Convert an LV to its raw identity and the parents of that version.
    /// Within a run, parents are implicitly the preceding LV.
    pub fn lv_to_raw_with_parents(&self, lv: LV) -> Result<(RawVersion, Frontier), CGError> {
        let (entry, offset) = self.entry_at(lv)?;
        let name = self.agent_assignment.get_agent_name(entry.span.agent);
        let raw = RawVersion::new(name, entry.span.seq_at_offset(offset));
        Ok((raw, entry.clone_parents_at_version(lv)))
    }

    /// Convert a list of LVs (eg a frontier) to raw versions.
    pub fn lv_list_to_raw(&self, lvs: &[LV]) -> Result<Vec<RawVersion>, CGError> {
        lvs.iter().map(|&lv| self.lv_to_raw(lv)).collect()
    }

    /// Convert raw versions to a local frontier. Fails with *unknown-parent*
    /// if any of the versions is not in the graph.
    pub fn try_raw_to_local_frontier<'a, I>(&self, raw: I) -> Result<Frontier, CGError>
    where
        I: IntoIterator<Item = &'a RawVersion>,
    {
        raw.into_iter()
            .map(|rv| {
                self.try_raw_to_lv(rv.agent(), rv.seq())
                    .ok_or_else(|| CGError::UnknownParent(rv.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::CausalGraph;
    use crate::causalgraph::AddRawResult;
    use super::RawVersion;

    #[test]
    fn id_smoke_test() {
        let mut cg = CausalGraph::new();
        cg.add_raw(&RawVersion::new("seph", 0), 2, Some(&[])).unwrap();
        cg.add_raw(&RawVersion::new("mike", 0), 4, Some(&[])).unwrap();

        assert_eq!(cg.try_raw_to_lv("seph", 0), Some(0));
        assert_eq!(cg.try_raw_to_lv("seph", 1), Some(1));
        assert_eq!(cg.try_raw_to_lv("mike", 0), Some(2));
        assert_eq!(cg.try_raw_to_lv("mike", 5), None);
        assert_eq!(cg.try_raw_to_lv("unknown", 0), None);

        for lv in 0..cg.len() {
            let rv = cg.lv_to_raw(lv).unwrap();
            assert_eq!(cg.try_raw_to_lv(rv.agent(), rv.seq()), Some(lv));
        }
    }

    #[test]
    fn raw_frontier_conversion() {
        let mut cg = CausalGraph::new();
        cg.add_raw(&RawVersion::new("seph", 0), 3, Some(&[])).unwrap();
        let r = cg.add_raw(
            &RawVersion::new("mike", 0),
            1,
            Some(&[RawVersion::new("seph", 2)]),
        );
        assert_eq!(r.unwrap(), AddRawResult::Assigned((3..4).into()));

        let raws = cg.lv_list_to_raw(&[3]).unwrap();
        assert_eq!(raws, vec![RawVersion::new("mike", 0)]);

        let f = cg.try_raw_to_local_frontier(raws.iter()).unwrap();
        assert_eq!(f.as_ref(), &[3]);

        assert!(cg
            .try_raw_to_local_frontier([RawVersion::new("nope", 0)].iter())
            .is_err());
    }
}
