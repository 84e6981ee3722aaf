//! World simulation engine.
//!
//! Agents forage and move on a procedurally generated landscape split into
//! seasonal biomes, learn from how their surroundings change, and breed
//! offspring whose genomes and controllers mix both parents.

pub mod agent;
pub mod biome;
pub mod events;
pub mod genome;
pub mod habitat;
pub mod lineage;
pub mod neural;
pub mod simulation;
pub mod snapshot;
pub mod stats;
pub mod terrain;

pub use agent::{ActContext, ActOutcome, Agent, Others};
pub use biome::{Biome, BiomeRegistry};
pub use events::{EventDirector, EventTransition};
pub use genome::Genome;
pub use habitat::{Environment, Habitat};
pub use lineage::{LineageNode, LineageRecord, LineageRegistry};
pub use neural::NeuralController;
pub use simulation::{MutationListener, Simulation};
pub use snapshot::{AgentSnapshot, WorldSnapshot};
pub use stats::{DeathCause, SimulationStats};
pub use terrain::{ElevationField, GradientNoise};
