//! Agent state, per-tick behavior and mating.

use crate::genome::Genome;
use crate::habitat::Habitat;
use crate::neural::NeuralController;
use forage_core::{AgentConfig, AgentId, FitnessBreakdown, FitnessInputs, Position, Result, Sex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f64::consts::PI;
use std::fmt;
use tracing::trace;

/// Controller inputs: pack dx, pack dy, density, survival dx, survival dy
pub const SENSOR_INPUTS: usize = 5;
pub const MOTOR_OUTPUTS: usize = 2;

const SURVIVAL_DX_INPUT: usize = 3;
const SURVIVAL_DY_INPUT: usize = 4;

pub type SensorSnapshot = [f64; SENSOR_INPUTS];

/// An agent in the simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub genome: Genome,
    pub sex: Sex,
    pub age: u32,
    pub alive: bool,
    pub position: Position,
    pub hunger: u32,
    pub brain: NeuralController,
    /// Most recent sensor inputs, oldest first
    pub memory: VecDeque<SensorSnapshot>,
    pub parents: Option<(AgentId, AgentId)>,
    pub birth_tick: u64,
}

/// The other agents of the population, as seen by one agent
#[derive(Debug, Clone, Copy)]
pub struct Others<'a> {
    before: &'a [Agent],
    after: &'a [Agent],
}

impl<'a> Others<'a> {
    /// Everyone in `population` except the agent at `index`
    pub fn around(population: &'a [Agent], index: usize) -> Self {
        let (before, rest) = population.split_at(index.min(population.len()));
        let after = rest.get(1..).unwrap_or(&[]);
        Self { before, after }
    }

    /// Split views, for callers that hold the agent itself mutably
    pub fn split(before: &'a [Agent], after: &'a [Agent]) -> Self {
        Self { before, after }
    }

    pub fn none() -> Self {
        Self {
            before: &[],
            after: &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Agent> {
        self.before.iter().chain(self.after.iter())
    }

    /// Live agents within `radius` of `center`
    pub fn within(&self, center: Position, radius: i32) -> impl Iterator<Item = &'a Agent> {
        let radius_sq = radius as i64 * radius as i64;
        self.iter()
            .filter(move |a| a.alive && a.position.distance_squared(&center) <= radius_sq)
    }
}

/// Everything `Agent::act` reads
pub struct ActContext<'a, H: Habitat> {
    pub habitat: &'a H,
    pub others: Others<'a>,
    pub config: &'a AgentConfig,
}

/// What happened during one `act` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActOutcome {
    /// Hunger exceeded the maximum; the agent is dead
    Starved,
    Moved {
        from: Position,
        to: Position,
        foraged: bool,
        reward: f64,
    },
}

impl Agent {
    pub fn new(
        id: AgentId,
        genome: Genome,
        sex: Sex,
        position: Position,
        brain: NeuralController,
        birth_tick: u64,
    ) -> Self {
        Self {
            id,
            genome,
            sex,
            age: 0,
            alive: true,
            position,
            hunger: 0,
            brain,
            memory: VecDeque::new(),
            parents: None,
            birth_tick,
        }
    }

    /// Root agent with a random genome, sex and position, and a controller
    /// pre-biased toward the survival-direction inputs.
    pub fn random(
        id: AgentId,
        genome_length: usize,
        dimensions: (i32, i32),
        config: &AgentConfig,
        birth_tick: u64,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        let genome = Genome::random(genome_length, rng);
        let sex = Sex::from_bool(rng.gen());
        let (width, height) = dimensions;
        let position = Position::new(rng.gen_range(0..width.max(1)), rng.gen_range(0..height.max(1)));
        let brain = Self::root_brain(config, rng)?;
        Ok(Self::new(id, genome, sex, position, brain, birth_tick))
    }

    /// Fresh `[5, hidden, 2]` controller with the survival bias applied
    pub fn root_brain(config: &AgentConfig, rng: &mut impl Rng) -> Result<NeuralController> {
        let mut brain =
            NeuralController::new(&[SENSOR_INPUTS, config.hidden_neurons, MOTOR_OUTPUTS], rng)?;
        brain.add_input_bias(SURVIVAL_DX_INPUT, config.survival_bias);
        brain.add_input_bias(SURVIVAL_DY_INPUT, config.survival_bias);
        Ok(brain)
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn die(&mut self) {
        self.alive = false;
    }

    pub fn step_age(&mut self) {
        if self.alive {
            self.age += 1;
        }
    }

    /// Move to `pos`, clamped to the world
    pub fn place_at(&mut self, pos: Position, width: i32, height: i32) {
        self.position = pos.clamp(width, height);
    }

    pub fn neighbor_count(&self, others: &Others<'_>, radius: i32) -> usize {
        others.within(self.position, radius).count()
    }

    pub fn fitness_breakdown<H: Habitat>(
        &self,
        habitat: &H,
        others: &Others<'_>,
        config: &AgentConfig,
    ) -> FitnessBreakdown {
        FitnessInputs {
            hunger: self.hunger,
            max_hunger: config.max_hunger,
            age: self.age,
            max_age: config.max_age,
            forage_modifier: habitat.biome_at(self.position).forage_modifier,
            max_forage_modifier: config.max_forage_modifier,
            neighbors: self.neighbor_count(others, config.pack_radius),
        }
        .score()
    }

    /// Wellness score in [1, 100]
    pub fn fitness<H: Habitat>(&self, habitat: &H, others: &Others<'_>, config: &AgentConfig) -> f64 {
        self.fitness_breakdown(habitat, others, config).score
    }

    /// One tick of foraging, sensing, moving and learning.
    pub fn act<H: Habitat>(&mut self, ctx: &ActContext<'_, H>, rng: &mut impl Rng) -> Result<ActOutcome> {
        let config = ctx.config;
        let habitat = ctx.habitat;
        let (width, height) = habitat.dimensions();
        let start = self.position;

        // Forage
        let current = habitat.biome_at(start);
        let old_score = current.survival_score();
        let p_forage = config.forage_probability * current.forage_modifier * habitat.elevation(start);
        let foraged = rng.gen::<f64>() < p_forage;
        if foraged {
            self.hunger = 0;
        } else {
            self.hunger += 1;
            if self.hunger > config.max_hunger {
                self.die();
                trace!(agent = %self.id, x = start.x, y = start.y, "Agent starved");
                return Ok(ActOutcome::Starved);
            }
        }

        // Pack sensing
        let mut count = 0usize;
        let (mut sum_x, mut sum_y) = (0.0, 0.0);
        for neighbor in ctx.others.within(start, config.pack_radius) {
            count += 1;
            sum_x += neighbor.position.x as f64;
            sum_y += neighbor.position.y as f64;
        }
        let (dx_pack, dy_pack, density) = if count > 0 {
            let n = count as f64;
            let radius = config.pack_radius as f64;
            (
                (sum_x / n - start.x as f64) / width as f64,
                (sum_y / n - start.y as f64) / height as f64,
                n / (PI * radius * radius),
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        // Survival-direction sensing
        let (center_x, center_y) = habitat.best_survival_biome().rect.center();
        let dx_survival = (center_x - start.x as f64) / width as f64;
        let dy_survival = (center_y - start.y as f64) / height as f64;

        let inputs: SensorSnapshot = [dx_pack, dy_pack, density, dx_survival, dy_survival];
        self.remember(inputs, config.memory_size);
        let output = self.brain.forward(&inputs)?;

        // Movement, scaled by slope toward the intended cell
        let dir_x = direction(output[0]);
        let dir_y = direction(output[1]);
        let speed = config.move_speed;
        let target = start.add(dir_x * speed, dir_y * speed).clamp(width, height);
        let slope = habitat.elevation(target) - habitat.elevation(start);
        let factor = (1.0 - slope).clamp(0.5, 1.5);
        let magnitude = ((speed.abs() as f64 * factor).round() as i32).max(1);

        let end = start
            .add(dir_x * magnitude, dir_y * magnitude)
            .clamp(width, height);
        self.position = end;

        // Reward movement toward better biomes
        let reward = habitat.biome_at(end).survival_score() - old_score;
        self.brain.reward(config.learning_rate, reward);

        trace!(
            agent = %self.id,
            from_x = start.x,
            from_y = start.y,
            to_x = end.x,
            to_y = end.y,
            foraged,
            hunger = self.hunger,
            reward,
            "Agent acted"
        );

        Ok(ActOutcome::Moved {
            from: start,
            to: end,
            foraged,
            reward,
        })
    }

    fn remember(&mut self, snapshot: SensorSnapshot, capacity: usize) {
        if capacity == 0 {
            return;
        }
        while self.memory.len() >= capacity {
            self.memory.pop_front();
        }
        self.memory.push_back(snapshot);
    }

    /// Offspring of `self` and `other`. The child starts at `self`'s
    /// position; the caller places it.
    pub fn mate_with(
        &self,
        other: &Agent,
        id: AgentId,
        birth_tick: u64,
        config: &AgentConfig,
        rng: &mut impl Rng,
    ) -> Result<Agent> {
        let genome = self
            .genome
            .crossover(&other.genome, config.genome_mutation_rate, rng)?;
        let sex = Sex::from_bool(rng.gen());

        let mut brain = self.brain.crossover(&other.brain, rng)?;
        brain.mutate(config.brain_mutation_rate, config.brain_mutation_magnitude, rng);

        let capacity = config.memory_size;
        let mut memory: VecDeque<SensorSnapshot> = self
            .memory
            .iter()
            .take(capacity / 2)
            .copied()
            .collect();
        for snapshot in &other.memory {
            if memory.len() >= capacity {
                break;
            }
            memory.push_back(*snapshot);
        }

        let mut child = Agent::new(id, genome, sex, self.position, brain, birth_tick);
        child.memory = memory;
        child.parents = Some((self.id, other.id));
        Ok(child)
    }
}

/// -1, 0 or 1; zero and NaN give no movement
fn direction(value: f64) -> i32 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Age:{:>2}\tSex:{:<6} Genome:{} Hunger:{}",
            self.age, self.sex, self.genome, self.hunger
        )
    }
}
