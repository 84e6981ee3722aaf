//! Configuration types for the simulation.

use crate::{Error, Rect, Result, Season};
use serde::{Deserialize, Serialize};

/// Terrain generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Number of fractal noise layers
    pub octaves: u32,
    /// Amplitude falloff per octave, in (0, 1)
    pub persistence: f64,
    /// Sampling scale; smaller values give larger, smoother hills
    pub scale: f64,
    /// Permutation seed. `None` keeps the fixed reference table, so every
    /// run produces identical terrain.
    pub seed: Option<u64>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            octaves: 5,
            persistence: 0.5,
            scale: 0.005,
            seed: None,
        }
    }
}

/// Forage and death multipliers of a biome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiomeModifiers {
    pub forage: f64,
    pub death: f64,
}

impl BiomeModifiers {
    pub const fn new(forage: f64, death: f64) -> Self {
        Self { forage, death }
    }
}

/// A biome as registered at world setup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomeConfig {
    pub name: String,
    pub rect: Rect,
    pub modifiers: BiomeModifiers,
}

/// Per-season multipliers for one named biome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalModifiers {
    pub biome: String,
    pub spring: BiomeModifiers,
    pub summer: BiomeModifiers,
    pub fall: BiomeModifiers,
    pub winter: BiomeModifiers,
}

impl SeasonalModifiers {
    pub fn for_season(&self, season: Season) -> BiomeModifiers {
        match season {
            Season::Spring => self.spring,
            Season::Summer => self.summer,
            Season::Fall => self.fall,
            Season::Winter => self.winter,
        }
    }
}

/// World configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Width of the world
    pub width: i32,
    /// Height of the world
    pub height: i32,
    /// Ticks per season
    pub season_length: u32,
    pub terrain: TerrainConfig,
    /// Biomes in lookup order. The last entry must cover the whole world.
    /// Empty means the Desert/Oasis/Plains layout derived from the world size.
    pub biomes: Vec<BiomeConfig>,
    /// Season table; biomes missing from it keep their current multipliers
    pub season_table: Vec<SeasonalModifiers>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            season_length: 25,
            terrain: TerrainConfig::default(),
            biomes: Vec::new(),
            season_table: default_season_table(),
        }
    }
}

impl WorldConfig {
    /// Biome layout to register, falling back to the default layout
    pub fn resolved_biomes(&self) -> Vec<BiomeConfig> {
        if self.biomes.is_empty() {
            default_biomes(self.width, self.height)
        } else {
            self.biomes.clone()
        }
    }
}

/// Desert in the top-left quadrant, Oasis in the center, Plains everywhere else.
pub fn default_biomes(width: i32, height: i32) -> Vec<BiomeConfig> {
    vec![
        BiomeConfig {
            name: "Desert".to_string(),
            rect: Rect::new(0, 0, width / 2, height / 2),
            modifiers: BiomeModifiers::new(0.2, 1.5),
        },
        BiomeConfig {
            name: "Oasis".to_string(),
            rect: Rect::new(width / 4, height / 4, width / 2, height / 2),
            modifiers: BiomeModifiers::new(3.0, 0.9),
        },
        BiomeConfig {
            name: "Plains".to_string(),
            rect: Rect::new(0, 0, width, height),
            modifiers: BiomeModifiers::new(1.0, 1.0),
        },
    ]
}

pub fn default_season_table() -> Vec<SeasonalModifiers> {
    vec![
        SeasonalModifiers {
            biome: "Desert".to_string(),
            spring: BiomeModifiers::new(0.3, 1.1),
            summer: BiomeModifiers::new(0.1, 1.5),
            fall: BiomeModifiers::new(0.2, 1.2),
            winter: BiomeModifiers::new(0.05, 1.8),
        },
        SeasonalModifiers {
            biome: "Oasis".to_string(),
            spring: BiomeModifiers::new(2.0, 0.9),
            summer: BiomeModifiers::new(3.0, 0.7),
            fall: BiomeModifiers::new(1.75, 1.0),
            winter: BiomeModifiers::new(1.5, 1.2),
        },
        SeasonalModifiers {
            biome: "Plains".to_string(),
            spring: BiomeModifiers::new(1.2, 0.8),
            summer: BiomeModifiers::new(1.0, 1.0),
            fall: BiomeModifiers::new(1.0, 0.9),
            winter: BiomeModifiers::new(0.8, 1.3),
        },
    ]
}

/// Per-agent behavior constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub max_hunger: u32,
    pub max_age: u32,
    /// Cells moved per tick on flat ground
    pub move_speed: i32,
    /// Sensing distance for pack centroid, density and fitness
    pub pack_radius: i32,
    /// Base per-tick forage success probability
    pub forage_probability: f64,
    /// Capacity of the sensor recency buffer
    pub memory_size: usize,
    pub hidden_neurons: usize,
    /// Added to the outgoing weights of the two survival-direction inputs
    pub survival_bias: f64,
    pub learning_rate: f64,
    pub genome_mutation_rate: f64,
    pub brain_mutation_rate: f64,
    pub brain_mutation_magnitude: f64,
    /// Highest forage multiplier in the biome catalog, used to normalize fitness
    pub max_forage_modifier: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_hunger: 25,
            max_age: 100,
            move_speed: 6,
            pack_radius: 30,
            forage_probability: 0.10,
            memory_size: 5,
            hidden_neurons: 8,
            survival_bias: 0.2,
            learning_rate: 0.05,
            genome_mutation_rate: 0.01,
            brain_mutation_rate: 0.05,
            brain_mutation_magnitude: 0.2,
            max_forage_modifier: 3.0,
        }
    }
}

/// A global event catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    pub name: String,
    pub birth_multiplier: f64,
    pub death_multiplier: f64,
    /// Ticks the event stays active once started
    pub duration: u32,
    /// Independent per-tick chance of starting while idle
    pub trigger_probability: f64,
}

impl EventConfig {
    pub fn new(
        name: &str,
        birth_multiplier: f64,
        death_multiplier: f64,
        duration: u32,
        trigger_probability: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            birth_multiplier,
            death_multiplier,
            duration,
            trigger_probability,
        }
    }
}

pub fn default_events() -> Vec<EventConfig> {
    vec![
        EventConfig::new("Harvest Season", 1.6, 0.8, 5, 0.05),
        EventConfig::new("Drought", 0.8, 1.2, 5, 0.05),
        EventConfig::new("Migration Boom", 2.0, 1.0, 4, 0.03),
        EventConfig::new("Predator Invasion", 0.75, 3.0, 3, 0.02),
        EventConfig::new("Plague", 0.5, 6.0, 6, 0.005),
    ]
}

/// Top-level simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for the single randomness source threaded through every component
    pub seed: u64,
    pub initial_population: usize,
    pub genome_length: usize,
    /// Base per-tick death probability
    pub base_death_rate: f64,
    /// Base per-pair birth probability
    pub base_birth_rate: f64,
    /// Window size for the age-sorted shuffle before pairing
    pub jitter_window: usize,
    /// Birth chance multiplier when both parents stand in a high-forage biome
    pub food_breed_bonus: f64,
    /// Weight of age in the death probability
    pub age_death_factor: f64,
    /// Ticks between population metric snapshots; 0 disables them
    pub metrics_interval: u64,
    pub world: WorldConfig,
    pub agent: AgentConfig,
    pub events: Vec<EventConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            initial_population: 100,
            genome_length: 10,
            base_death_rate: 0.006,
            base_birth_rate: 0.025,
            jitter_window: 4,
            food_breed_bonus: 3.5,
            age_death_factor: 1.0,
            metrics_interval: 100,
            world: WorldConfig::default(),
            agent: AgentConfig::default(),
            events: default_events(),
        }
    }
}

impl SimulationConfig {
    /// Defaults with the four classic world parameters overridden
    pub fn with_population(
        initial_population: usize,
        genome_length: usize,
        base_death_rate: f64,
        base_birth_rate: f64,
    ) -> Self {
        Self {
            initial_population,
            genome_length,
            base_death_rate,
            base_birth_rate,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let world = &self.world;
        if world.width <= 0 || world.height <= 0 {
            return Err(Error::Validation(format!(
                "World size must be positive, got {}x{}",
                world.width, world.height
            )));
        }
        if world.season_length == 0 {
            return Err(Error::Validation("Season length must be at least 1".to_string()));
        }
        if world.terrain.octaves == 0 {
            return Err(Error::Validation("Terrain needs at least one octave".to_string()));
        }
        if !(world.terrain.persistence > 0.0 && world.terrain.persistence < 1.0) {
            return Err(Error::Validation(format!(
                "Terrain persistence must be in (0, 1), got {}",
                world.terrain.persistence
            )));
        }
        if self.genome_length == 0 {
            return Err(Error::Validation("Genome length must be at least 1".to_string()));
        }
        if self.jitter_window == 0 {
            return Err(Error::Validation("Jitter window must be at least 1".to_string()));
        }

        check_probability("base_death_rate", self.base_death_rate)?;
        check_probability("base_birth_rate", self.base_birth_rate)?;
        check_probability("forage_probability", self.agent.forage_probability)?;
        check_probability("genome_mutation_rate", self.agent.genome_mutation_rate)?;
        check_probability("brain_mutation_rate", self.agent.brain_mutation_rate)?;

        let agent = &self.agent;
        if agent.max_hunger == 0 || agent.max_age == 0 {
            return Err(Error::Validation(
                "max_hunger and max_age must be at least 1".to_string(),
            ));
        }
        if agent.pack_radius <= 0 || agent.hidden_neurons == 0 {
            return Err(Error::Validation(
                "pack_radius and hidden_neurons must be positive".to_string(),
            ));
        }
        if agent.max_forage_modifier <= 0.0 {
            return Err(Error::Validation(
                "max_forage_modifier must be positive".to_string(),
            ));
        }

        let biomes = world.resolved_biomes();
        match biomes.last() {
            None => return Err(Error::Validation("At least one biome is required".to_string())),
            Some(last) => {
                let full = last.rect.x <= 0
                    && last.rect.y <= 0
                    && last.rect.x + last.rect.width >= world.width
                    && last.rect.y + last.rect.height >= world.height;
                if !full {
                    return Err(Error::Validation(format!(
                        "Last biome '{}' must cover the whole world",
                        last.name
                    )));
                }
            }
        }
        for biome in &biomes {
            if biome.modifiers.death <= 0.0 {
                return Err(Error::Validation(format!(
                    "Biome '{}' needs a positive death multiplier",
                    biome.name
                )));
            }
        }

        for event in &self.events {
            if event.duration == 0 {
                return Err(Error::Validation(format!(
                    "Event '{}' must last at least one tick",
                    event.name
                )));
            }
            check_probability(&event.name, event.trigger_probability)?;
        }

        Ok(())
    }
}

fn check_probability(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} must be a probability in [0, 1], got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let config = SimulationConfig::default();
        assert_eq!(config.world.width, 800);
        assert_eq!(config.world.height, 600);
        assert_eq!(config.world.season_length, 25);
        assert_eq!(config.agent.max_hunger, 25);
        assert_eq!(config.agent.max_age, 100);
        assert_eq!(config.events.len(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_population() {
        let config = SimulationConfig::with_population(50, 12, 0.01, 0.05);
        assert_eq!(config.initial_population, 50);
        assert_eq!(config.genome_length, 12);
        assert_eq!(config.base_death_rate, 0.01);
        assert_eq!(config.base_birth_rate, 0.05);
        assert_eq!(config.jitter_window, 4);
    }

    #[test]
    fn test_default_biome_layout() {
        let biomes = default_biomes(800, 600);
        assert_eq!(biomes.len(), 3);
        assert_eq!(biomes[0].rect, Rect::new(0, 0, 400, 300));
        assert_eq!(biomes[1].rect, Rect::new(200, 150, 400, 300));
        assert_eq!(biomes[2].rect, Rect::new(0, 0, 800, 600));
    }

    #[test]
    fn test_season_table_lookup() {
        let table = default_season_table();
        let oasis = table.iter().find(|s| s.biome == "Oasis").unwrap();
        assert_eq!(oasis.for_season(Season::Summer), BiomeModifiers::new(3.0, 0.7));
        assert_eq!(oasis.for_season(Season::Winter), BiomeModifiers::new(1.5, 1.2));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = SimulationConfig::default();
        config.genome_length = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.base_birth_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.events[0].duration = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.world.biomes = vec![BiomeConfig {
            name: "Pond".to_string(),
            rect: Rect::new(0, 0, 10, 10),
            modifiers: BiomeModifiers::new(1.0, 1.0),
        }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = SimulationConfig::with_population(20, 8, 0.0, 1.0);
        let json = serde_json::to_string(&config).unwrap();
        let parsed = SimulationConfig::from_json(&json).unwrap();
        assert_eq!(parsed.initial_population, 20);
        assert_eq!(parsed.world.season_table.len(), 3);
        assert_eq!(parsed.events[4].name, "Plague");
    }
}
