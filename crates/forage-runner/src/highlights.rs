//! Fading highlight marks for freshly born agents, kept outside the engine.

use forage_core::AgentId;
use std::collections::HashMap;
use std::sync::mpsc::Receiver;

pub const DEFAULT_HIGHLIGHT_TICKS: u32 = 25;

/// `AgentId -> ticks left` for every recently born agent
#[derive(Debug, Clone)]
pub struct MutationHighlights {
    duration: u32,
    remaining: HashMap<AgentId, u32>,
}

impl MutationHighlights {
    pub fn new(duration: u32) -> Self {
        Self {
            duration,
            remaining: HashMap::new(),
        }
    }

    pub fn mark(&mut self, id: AgentId) {
        if self.duration > 0 {
            self.remaining.insert(id, self.duration);
        }
    }

    /// Mark every id waiting on `births`; returns how many arrived
    pub fn receive(&mut self, births: &Receiver<AgentId>) -> usize {
        let mut count = 0;
        for id in births.try_iter() {
            self.mark(id);
            count += 1;
        }
        count
    }

    /// Count every mark down by one tick and drop the expired ones
    pub fn tick(&mut self) {
        self.remaining.retain(|_, left| {
            *left -= 1;
            *left > 0
        });
    }

    /// 1.0 right after birth, fading to 0.0
    pub fn intensity(&self, id: AgentId) -> f64 {
        match self.remaining.get(&id) {
            Some(&left) => left as f64 / self.duration as f64,
            None => 0.0,
        }
    }

    pub fn is_highlighted(&self, id: AgentId) -> bool {
        self.remaining.contains_key(&id)
    }

    /// Forget marks for agents no longer alive
    pub fn retain_living(&mut self, living: impl Fn(AgentId) -> bool) {
        self.remaining.retain(|id, _| living(*id));
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}

impl Default for MutationHighlights {
    fn default() -> Self {
        Self::new(DEFAULT_HIGHLIGHT_TICKS)
    }
}
