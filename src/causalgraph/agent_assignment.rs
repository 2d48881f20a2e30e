use smartstring::alias::String as SmartString;

use crate::rle::{KVPair, RleSpanHelpers, RleVec};
use crate::{AgentId, LVRange, LV};

/// Per-agent version bookkeeping.
#[derive(Clone, Debug)]
pub(crate) struct ClientData {
    /// The agent's name. Names map to numerical agent IDs by position in
    /// `AgentAssignment::client_data`.
    pub(crate) name: SmartString,

    /// A packed, in-order list of runs from this agent, mapping the agent's
    /// sequence numbers to spans of local versions. Because a single agent ID
    /// may commit to concurrent branches, consecutive runs don't always
    /// merge - but sequence numbers are always contiguous and gapless.
    pub(crate) item_times: RleVec<KVPair<LVRange>>,
}

impl ClientData {
    pub fn get_next_seq(&self) -> usize {
        self.item_times.last_entry().map_or(0, |e| e.end())
    }

    #[inline]
    pub(crate) fn try_seq_to_lv(&self, seq: usize) -> Option<LV> {
        let (entry, offset) = self.item_times.find_with_offset(seq)?;
        Some(entry.1.start + offset)
    }
}

/// Maps external agent names to dense local agent IDs and tracks the versions
/// assigned to each agent.
#[derive(Clone, Debug, Default)]
pub struct AgentAssignment {
    /// Indexed by AgentId.
    pub(crate) client_data: Vec<ClientData>,
}

impl AgentAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_agent_id(&self, name: &str) -> Option<AgentId> {
        self.client_data
            .iter()
            .position(|client_data| client_data.name == name)
            .map(|id| id as AgentId)
    }

    pub fn get_or_create_agent_id(&mut self, name: &str) -> AgentId {
        if let Some(id) = self.get_agent_id(name) {
            id
        } else {
            self.client_data.push(ClientData {
                name: SmartString::from(name),
                item_times: RleVec::new(),
            });
            (self.client_data.len() - 1) as AgentId
        }
    }

    pub fn get_agent_name(&self, agent: AgentId) -> &str {
        self.client_data[agent as usize].name.as_str()
    }

    pub(crate) fn try_agent_version_to_lv(&self, agent: AgentId, seq: usize) -> Option<LV> {
        self.client_data
            .get(agent as usize)
            .and_then(|c| c.try_seq_to_lv(seq))
    }

    /// Record that the span of local versions belongs to the given agent,
    /// continuing its sequence numbers.
    pub(crate) fn assign_next_seq_to_agent(&mut self, agent: AgentId, span: LVRange) {
        let client_data = &mut self.client_data[agent as usize];
        let next_seq = client_data.get_next_seq();
        client_data.item_times.push(KVPair(next_seq, span));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_interning() {
        let mut aa = AgentAssignment::new();
        assert_eq!(aa.get_agent_id("seph"), None);
        let a = aa.get_or_create_agent_id("seph");
        let b = aa.get_or_create_agent_id("mike");
        assert_ne!(a, b);
        assert_eq!(aa.get_or_create_agent_id("seph"), a);
        assert_eq!(aa.get_agent_name(b), "mike");
    }

    #[test]
    fn seq_assignment_roundtrip() {
        let mut aa = AgentAssignment::new();
        let a = aa.get_or_create_agent_id("seph");
        aa.assign_next_seq_to_agent(a, (0..2).into());
        aa.assign_next_seq_to_agent(a, (5..8).into());

        assert_eq!(aa.client_data[a as usize].get_next_seq(), 5);
        assert_eq!(aa.try_agent_version_to_lv(a, 0), Some(0));
        assert_eq!(aa.try_agent_version_to_lv(a, 3), Some(6));
        assert_eq!(aa.try_agent_version_to_lv(a, 5), None);
    }
}
