//! Simulation engine: owns the world and the population and runs the tick
//! pipeline.

use crate::agent::{ActContext, ActOutcome, Agent, Others};
use crate::biome::Biome;
use crate::events::{EventDirector, EventTransition};
use crate::habitat::{Environment, Habitat};
use crate::lineage::LineageRegistry;
use crate::snapshot::{AgentSnapshot, WorldSnapshot};
use crate::stats::{DeathCause, SimulationStats};
use forage_core::{
    birth_scale, death_scale, AgentId, Position, Result, Season, SimulationConfig, Sex,
};
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt::Write as _;
use tracing::{debug, event, info, instrument, Level};

/// Called with every newborn, after it has joined the population
pub type MutationListener = Box<dyn FnMut(&Agent) + Send>;

/// Biome whose forage multiplier must exceed this for the breeding bonus
const FOOD_BREED_THRESHOLD: f64 = 1.0;

pub struct Simulation {
    config: SimulationConfig,
    rng: ChaCha8Rng,
    environment: Environment,
    population: Vec<Agent>,
    events: EventDirector,
    lineage: LineageRegistry,
    listeners: Vec<MutationListener>,
    stats: SimulationStats,
    tick: u64,
    season: Season,
    ticks_into_season: u32,
    next_id: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let mut environment = Environment::from_config(&config.world)?;
        environment
            .biomes
            .apply_season(Season::Spring, &config.world.season_table);

        let events = EventDirector::new(config.events.clone());

        let dimensions = environment.dimensions();
        let mut population = Vec::with_capacity(config.initial_population);
        let mut lineage = LineageRegistry::new();
        for i in 0..config.initial_population {
            let agent = Agent::random(
                AgentId(i as u64),
                config.genome_length,
                dimensions,
                &config.agent,
                0,
                &mut rng,
            )?;
            lineage.record(&agent);
            population.push(agent);
        }

        let mut stats = SimulationStats::default();
        stats.observe_population(population.len());
        let next_id = population.len() as u64;

        let sim = Self {
            config,
            rng,
            environment,
            population,
            events,
            lineage,
            listeners: Vec::new(),
            stats,
            tick: 0,
            season: Season::Spring,
            ticks_into_season: 0,
            next_id,
        };

        info!(
            seed = sim.config.seed,
            width = dimensions.0,
            height = dimensions.1,
            population = sim.population.len(),
            genome_length = sim.config.genome_length,
            "Simulation created"
        );

        Ok(sim)
    }

    /// Run `ticks` steps
    #[instrument(skip(self), fields(start_tick = self.tick))]
    pub fn run(&mut self, ticks: u64) -> Result<()> {
        info!("Starting simulation for {} ticks", ticks);

        for _ in 0..ticks {
            self.step()?;
        }

        info!(
            tick = self.tick,
            population = self.population.len(),
            births = self.stats.births,
            deaths = self.stats.total_deaths(),
            peak_population = self.stats.peak_population,
            "Simulation run finished"
        );
        Ok(())
    }

    /// Advance one tick: season, events, agent behavior, death, birth, aging
    pub fn step(&mut self) -> Result<()> {
        self.advance_season();

        if let Some(EventTransition::Started { name, duration }) = self.events.update(&mut self.rng) {
            debug!(tick = self.tick, event = %name, duration, "Event active");
        }

        self.act_all()?;
        self.death_sweep();
        self.birth_sweep()?;

        for agent in &mut self.population {
            agent.step_age();
        }

        self.stats.observe_population(self.population.len());
        self.tick += 1;

        let interval = self.config.metrics_interval;
        if interval > 0 && self.tick % interval == 0 {
            self.emit_population_metrics();
        }

        Ok(())
    }

    fn advance_season(&mut self) {
        self.ticks_into_season += 1;
        if self.ticks_into_season < self.config.world.season_length {
            return;
        }
        self.ticks_into_season = 0;
        self.season = self.season.next();
        self.environment
            .biomes
            .apply_season(self.season, &self.config.world.season_table);
        info!(tick = self.tick, season = %self.season, "Season changed");
    }

    /// Every agent acts in population order; starved agents leave at once.
    fn act_all(&mut self) -> Result<()> {
        let mut index = 0;
        while index < self.population.len() {
            let (before, rest) = self.population.split_at_mut(index);
            let Some((agent, after)) = rest.split_first_mut() else {
                break;
            };
            let ctx = ActContext {
                habitat: &self.environment,
                others: Others::split(before, after),
                config: &self.config.agent,
            };

            let outcome = agent.act(&ctx, &mut self.rng)?;
            match outcome {
                ActOutcome::Starved => {
                    let dead = self.population.remove(index);
                    self.bury(dead, DeathCause::Starvation);
                }
                ActOutcome::Moved { .. } => index += 1,
            }
        }
        Ok(())
    }

    /// Decide every death against the pre-sweep population, then remove.
    fn death_sweep(&mut self) {
        let agent_config = &self.config.agent;
        let max_age = agent_config.max_age;
        let event_death = self.events.death_multiplier();

        let mut causes = Vec::with_capacity(self.population.len());
        for (index, agent) in self.population.iter().enumerate() {
            let others = Others::around(&self.population, index);
            let fitness = agent.fitness(&self.environment, &others, agent_config);
            let biome_death = self.environment.biome_at(agent.position).death_modifier;
            let age_ratio = agent.age as f64 / max_age as f64;

            let p_death = self.config.base_death_rate
                * event_death
                * biome_death
                * (1.0 + self.config.age_death_factor * age_ratio)
                * death_scale(fitness);

            let roll = self.rng.gen::<f64>();
            let cause = if agent.age > max_age {
                Some(DeathCause::OldAge)
            } else if roll < p_death {
                Some(DeathCause::Random)
            } else {
                None
            };
            causes.push(cause);
        }

        let population = std::mem::take(&mut self.population);
        for (mut agent, cause) in population.into_iter().zip(causes) {
            match cause {
                Some(cause) => {
                    agent.die();
                    self.bury(agent, cause);
                }
                None => self.population.push(agent),
            }
        }
    }

    /// Pair survivors by age with a little jitter and let opposite-sex pairs
    /// breed.
    fn birth_sweep(&mut self) -> Result<()> {
        let mut order: Vec<usize> = (0..self.population.len()).collect();
        order.sort_by_key(|&i| self.population[i].age);
        for window in order.chunks_mut(self.config.jitter_window) {
            window.shuffle(&mut self.rng);
        }

        let (width, height) = self.environment.dimensions();
        for pair in order.chunks_exact(2) {
            let (first, second) = (pair[0], pair[1]);
            if self.population[first].sex == self.population[second].sex {
                continue;
            }

            let average = (self.fitness_at(first) + self.fitness_at(second)) / 2.0;
            let mut p_birth =
                self.config.base_birth_rate * self.events.birth_multiplier() * birth_scale(average);

            let first_pos = self.population[first].position;
            let second_pos = self.population[second].position;
            let well_fed = |pos: Position| {
                self.environment.biome_at(pos).forage_modifier > FOOD_BREED_THRESHOLD
            };
            if well_fed(first_pos) && well_fed(second_pos) {
                p_birth *= self.config.food_breed_bonus;
            }

            if self.rng.gen::<f64>() >= p_birth {
                continue;
            }

            let id = self.next_agent_id();
            let mut child = self.population[first].mate_with(
                &self.population[second],
                id,
                self.tick,
                &self.config.agent,
                &mut self.rng,
            )?;
            child.place_at(first_pos.midpoint(&second_pos), width, height);

            debug!(
                tick = self.tick,
                child = %child.id,
                parent_a = %self.population[first].id,
                parent_b = %self.population[second].id,
                genome = %child.genome,
                x = child.position.x,
                y = child.position.y,
                "Agent born"
            );

            self.population.push(child);
            self.stats.record_birth();
            let child = &self.population[self.population.len() - 1];
            self.lineage.record(child);
            for listener in &mut self.listeners {
                listener(child);
            }
        }
        Ok(())
    }

    fn bury(&mut self, agent: Agent, cause: DeathCause) {
        self.lineage.mark_dead(agent.id, self.tick);
        self.stats.record_death(cause);
        debug!(
            tick = self.tick,
            agent = %agent.id,
            age = agent.age,
            hunger = agent.hunger,
            cause = %cause,
            "Agent died"
        );
    }

    fn fitness_at(&self, index: usize) -> f64 {
        let others = Others::around(&self.population, index);
        self.population[index].fitness(&self.environment, &others, &self.config.agent)
    }

    fn emit_population_metrics(&self) {
        let total_pop = self.population.len();
        let avg_fitness = self.average_fitness();
        let avg_age = if total_pop > 0 {
            self.population.iter().map(|a| a.age as f64).sum::<f64>() / total_pop as f64
        } else {
            0.0
        };

        info!(
            event = "population_metrics",
            tick = self.tick,
            season = %self.season,
            active_event = self.events.current_event_name(),
            total_population = total_pop,
            avg_fitness = avg_fitness,
            avg_age = avg_age,
            births = self.stats.births,
            starvation_deaths = self.stats.starvation_deaths,
            old_age_deaths = self.stats.old_age_deaths,
            random_deaths = self.stats.random_deaths,
            "Population metrics snapshot"
        );

        event!(
            Level::INFO,
            gauge_name = "population_total",
            gauge_value = total_pop,
            tick = self.tick,
            "Population gauge"
        );

        event!(
            Level::INFO,
            gauge_name = "average_fitness",
            gauge_value = avg_fitness,
            tick = self.tick,
            "Average fitness"
        );
    }

    /// Register a callback invoked with each newborn
    pub fn add_mutation_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&Agent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Allocate a fresh agent id
    pub fn next_agent_id(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a hand-built agent. Its position is clamped to the world and id
    /// allocation continues past its id.
    pub fn insert_agent(&mut self, mut agent: Agent) {
        let (width, height) = self.environment.dimensions();
        agent.place_at(agent.position, width, height);
        self.next_id = self.next_id.max(agent.id.0 + 1);
        self.lineage.record(&agent);
        self.population.push(agent);
        self.stats.observe_population(self.population.len());
    }

    /// Create a root agent of the given sex at `position`
    pub fn spawn_agent(&mut self, position: Position, sex: Sex) -> Result<AgentId> {
        let id = self.next_agent_id();
        let mut agent = Agent::random(
            id,
            self.config.genome_length,
            self.environment.dimensions(),
            &self.config.agent,
            self.tick,
            &mut self.rng,
        )?;
        agent.position = position;
        agent.sex = sex;
        self.insert_agent(agent);
        Ok(id)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.population
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.population.iter().find(|a| a.id == id)
    }

    pub fn population_size(&self) -> usize {
        self.population.len()
    }

    pub fn biomes(&self) -> &[Biome] {
        self.environment.biomes.biomes()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Elevation in [0, 1]; coordinates are clamped
    pub fn elevation(&self, x: i32, y: i32) -> f64 {
        self.environment.elevation(Position::new(x, y))
    }

    pub fn biome_at(&self, x: i32, y: i32) -> &Biome {
        self.environment.biome_at(Position::new(x, y))
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn ticks_into_season(&self) -> u32 {
        self.ticks_into_season
    }

    pub fn current_event_name(&self) -> &str {
        self.events.current_event_name()
    }

    pub fn event_director(&self) -> &EventDirector {
        &self.events
    }

    pub fn lineage(&self) -> &LineageRegistry {
        &self.lineage
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Fitness of a live agent against the current population
    pub fn fitness_of(&self, id: AgentId) -> Option<f64> {
        let index = self.population.iter().position(|a| a.id == id)?;
        Some(self.fitness_at(index))
    }

    /// Mean fitness of the live population, 0 when it is empty
    pub fn average_fitness(&self) -> f64 {
        if self.population.is_empty() {
            return 0.0;
        }
        let total: f64 = (0..self.population.len()).map(|i| self.fitness_at(i)).sum();
        total / self.population.len() as f64
    }

    /// Live agents per biome, in registry order
    pub fn biome_census(&self) -> Vec<(String, usize)> {
        let (width, height) = self.environment.dimensions();
        let mut counts = vec![0usize; self.environment.biomes.len()];
        for agent in &self.population {
            let index = self
                .environment
                .biomes
                .index_at(agent.position.clamp(width, height));
            counts[index] += 1;
        }
        self.biomes()
            .iter()
            .zip(counts)
            .map(|(biome, count)| (biome.name.clone(), count))
            .collect()
    }

    /// Plain-text table of the live population
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Tick {} | {} | Event: {} | Population: {}",
            self.tick,
            self.season,
            self.current_event_name(),
            self.population.len()
        );
        for (index, agent) in self.population.iter().enumerate() {
            let biome = self.environment.biome_at(agent.position);
            let _ = writeln!(
                out,
                "{:>6} {}\tFitness:{:>5.1}\tBiome:{}",
                agent.id.to_string(),
                agent,
                self.fitness_at(index),
                biome.name
            );
        }
        out
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let agents: Vec<AgentSnapshot> = self
            .population
            .iter()
            .enumerate()
            .map(|(index, agent)| AgentSnapshot {
                id: agent.id,
                genome: agent.genome.to_string(),
                sex: agent.sex,
                age: agent.age,
                hunger: agent.hunger,
                x: agent.position.x,
                y: agent.position.y,
                biome: self.environment.biome_at(agent.position).name.clone(),
                fitness: self.fitness_at(index),
                parents: agent.parents,
            })
            .collect();

        let average_fitness = if agents.is_empty() {
            0.0
        } else {
            agents.iter().map(|a| a.fitness).sum::<f64>() / agents.len() as f64
        };

        WorldSnapshot {
            tick: self.tick,
            season: self.season,
            event: self.current_event_name().to_string(),
            population: agents.len(),
            average_fitness,
            agents,
        }
    }
}
