//! Rectangular biomes and the ordered registry used for lookups.

use forage_core::{BiomeConfig, Error, Position, Rect, Result, Season, SeasonalModifiers};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A rectangular zone with its own forage and death multipliers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biome {
    pub name: String,
    pub rect: Rect,
    /// Multiplies the base forage probability
    pub forage_modifier: f64,
    /// Multiplies the base death probability
    pub death_modifier: f64,
}

impl Biome {
    pub fn new(name: &str, rect: Rect, forage_modifier: f64, death_modifier: f64) -> Self {
        Self {
            name: name.to_string(),
            rect,
            forage_modifier,
            death_modifier,
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.rect.contains(pos)
    }

    /// Forage-to-death ratio; higher is a better place to live
    pub fn survival_score(&self) -> f64 {
        self.forage_modifier / self.death_modifier
    }
}

impl From<&BiomeConfig> for Biome {
    fn from(config: &BiomeConfig) -> Self {
        Self {
            name: config.name.clone(),
            rect: config.rect,
            forage_modifier: config.modifiers.forage,
            death_modifier: config.modifiers.death,
        }
    }
}

/// Biomes in registration order. The last entry is the catch-all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomeRegistry {
    biomes: Vec<Biome>,
}

impl BiomeRegistry {
    pub fn new(biomes: Vec<Biome>) -> Result<Self> {
        if biomes.is_empty() {
            return Err(Error::Validation(
                "Biome registry needs at least one biome".to_string(),
            ));
        }
        Ok(Self { biomes })
    }

    pub fn from_configs(configs: &[BiomeConfig]) -> Result<Self> {
        Self::new(configs.iter().map(Biome::from).collect())
    }

    pub fn biomes(&self) -> &[Biome] {
        &self.biomes
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    /// Index of the first biome containing `pos`, or the catch-all
    pub fn index_at(&self, pos: Position) -> usize {
        self.biomes
            .iter()
            .position(|b| b.contains(pos))
            .unwrap_or(self.biomes.len() - 1)
    }

    pub fn biome_at(&self, pos: Position) -> &Biome {
        &self.biomes[self.index_at(pos)]
    }

    pub fn get(&self, name: &str) -> Option<&Biome> {
        self.biomes.iter().find(|b| b.name == name)
    }

    /// Overwrite multipliers from `table`; biomes it does not name are left alone
    pub fn apply_season(&mut self, season: Season, table: &[SeasonalModifiers]) {
        for biome in &mut self.biomes {
            if let Some(entry) = table.iter().find(|e| e.biome == biome.name) {
                let modifiers = entry.for_season(season);
                biome.forage_modifier = modifiers.forage;
                biome.death_modifier = modifiers.death;
                debug!(
                    biome = %biome.name,
                    season = %season,
                    forage = modifiers.forage,
                    death = modifiers.death,
                    "Applied seasonal modifiers"
                );
            }
        }
    }

    /// Biome with the highest survival score; the earliest wins ties
    pub fn best_survival(&self) -> &Biome {
        let mut best = &self.biomes[0];
        for biome in &self.biomes[1..] {
            if biome.survival_score() > best.survival_score() {
                best = biome;
            }
        }
        best
    }
}
