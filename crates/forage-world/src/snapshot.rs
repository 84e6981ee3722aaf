//! Owned, serializable views of the world for external consumers.

use forage_core::{AgentId, Result, Season, Sex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub genome: String,
    pub sex: Sex,
    pub age: u32,
    pub hunger: u32,
    pub x: i32,
    pub y: i32,
    pub biome: String,
    pub fitness: f64,
    pub parents: Option<(AgentId, AgentId)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub season: Season,
    pub event: String,
    pub population: usize,
    pub average_fitness: f64,
    pub agents: Vec<AgentSnapshot>,
}

impl WorldSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
