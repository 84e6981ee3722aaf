//! Lineage registry: one record per agent ever created, kept after death.

use forage_core::{AgentId, Sex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::agent::Agent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageRecord {
    pub id: AgentId,
    pub parents: Option<(AgentId, AgentId)>,
    pub sex: Sex,
    pub genome: String,
    pub birth_tick: u64,
    pub death_tick: Option<u64>,
}

impl LineageRecord {
    pub fn of(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            parents: agent.parents,
            sex: agent.sex,
            genome: agent.genome.to_string(),
            birth_tick: agent.birth_tick,
            death_tick: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.death_tick.is_none()
    }
}

/// Ancestry tree rooted at one agent; parent A first, then parent B
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageNode {
    pub record: LineageRecord,
    pub parents: Vec<LineageNode>,
}

impl LineageNode {
    /// Number of nodes in the tree, including the root
    pub fn size(&self) -> usize {
        1 + self.parents.iter().map(LineageNode::size).sum::<usize>()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineageRegistry {
    records: HashMap<AgentId, LineageRecord>,
}

impl LineageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, agent: &Agent) {
        self.records.insert(agent.id, LineageRecord::of(agent));
    }

    /// Stamp the death tick; later stamps for the same agent are ignored
    pub fn mark_dead(&mut self, id: AgentId, tick: u64) {
        if let Some(record) = self.records.get_mut(&id) {
            record.death_tick.get_or_insert(tick);
        }
    }

    pub fn get(&self, id: AgentId) -> Option<&LineageRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ancestry of `id` down to `depth` parent generations
    pub fn lineage(&self, id: AgentId, depth: usize) -> Option<LineageNode> {
        let record = self.records.get(&id)?.clone();
        let mut parents = Vec::new();
        if depth > 0 {
            if let Some((a, b)) = record.parents {
                parents.extend(self.lineage(a, depth - 1));
                parents.extend(self.lineage(b, depth - 1));
            }
        }
        Some(LineageNode { record, parents })
    }

    /// 0 for root agents, otherwise one more than the deeper parent
    pub fn generation(&self, id: AgentId) -> Option<u32> {
        let mut memo = HashMap::new();
        self.generation_memo(id, &mut memo)
    }

    fn generation_memo(&self, id: AgentId, memo: &mut HashMap<AgentId, u32>) -> Option<u32> {
        if let Some(&g) = memo.get(&id) {
            return Some(g);
        }
        let record = self.records.get(&id)?;
        let generation = match record.parents {
            None => 0,
            Some((a, b)) => {
                let ga = self.generation_memo(a, memo).unwrap_or(0);
                let gb = self.generation_memo(b, memo).unwrap_or(0);
                ga.max(gb) + 1
            }
        };
        memo.insert(id, generation);
        Some(generation)
    }

    /// Records of agents that are still alive
    pub fn living(&self) -> impl Iterator<Item = &LineageRecord> {
        self.records.values().filter(|r| r.is_alive())
    }
}
