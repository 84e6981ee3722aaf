//! Headless batch driver for the forager simulation.

mod highlights;
mod telemetry;

use anyhow::{Context, Result};
use forage_core::SimulationConfig;
use forage_world::Simulation;
use highlights::MutationHighlights;
use std::sync::mpsc;
use tracing::{debug, info};

const DEFAULT_TICKS: u64 = 1000;

fn main() -> Result<()> {
    telemetry::init_telemetry()?;

    let config = load_config()?;
    let ticks = load_ticks()?;

    info!("Starting forage-runner");
    info!(seed = config.seed, population = config.initial_population, ticks, "Configuration loaded");

    let mut sim = Simulation::new(config)?;
    for event in sim.event_director().catalog() {
        debug!(
            event = %event.name,
            probability = event.trigger_probability,
            duration = event.duration,
            "Event registered"
        );
    }

    let (births_tx, births_rx) = mpsc::channel();
    sim.add_mutation_listener(move |child| {
        // Receiver gone means the run is over
        let _ = births_tx.send(child.id);
    });
    let mut highlights = MutationHighlights::default();

    for _ in 0..ticks {
        sim.step()?;

        highlights.tick();
        highlights.receive(&births_rx);
        highlights.retain_living(|id| sim.agent(id).is_some());

        if sim.agents().is_empty() {
            info!(tick = sim.tick(), "Population extinct");
            break;
        }
    }

    let stats = sim.stats();
    info!(
        tick = sim.tick(),
        season = %sim.season(),
        population = sim.agents().len(),
        average_fitness = sim.average_fitness(),
        births = stats.births,
        starvation_deaths = stats.starvation_deaths,
        old_age_deaths = stats.old_age_deaths,
        random_deaths = stats.random_deaths,
        peak_population = stats.peak_population,
        highlighted = highlights.len(),
        "Run complete"
    );
    for (biome, count) in sim.biome_census() {
        info!(biome = %biome, agents = count, "Biome census");
    }

    print!("{}", sim.report());
    Ok(())
}

/// Config from the JSON file named by `FORAGE_CONFIG`, or the defaults
fn load_config() -> Result<SimulationConfig> {
    match std::env::var("FORAGE_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            let config = SimulationConfig::from_json(&json)
                .with_context(|| format!("Invalid config in {}", path))?;
            info!(path = %path, "Loaded configuration file");
            Ok(config)
        }
        Err(_) => Ok(SimulationConfig::default()),
    }
}

fn load_ticks() -> Result<u64> {
    match std::env::var("FORAGE_TICKS") {
        Ok(value) => value
            .parse()
            .with_context(|| format!("FORAGE_TICKS must be a tick count, got '{}'", value)),
        Err(_) => Ok(DEFAULT_TICKS),
    }
}
