//! Read-only world queries used by agents while sensing and moving.

use crate::biome::{Biome, BiomeRegistry};
use crate::terrain::ElevationField;
use forage_core::{Position, Result, WorldConfig};

/// What an agent can ask about the world around it
pub trait Habitat {
    /// World width and height
    fn dimensions(&self) -> (i32, i32);

    /// Elevation in [0, 1]; out-of-range coordinates are clamped
    fn elevation(&self, pos: Position) -> f64;

    /// First biome containing `pos`, or the catch-all
    fn biome_at(&self, pos: Position) -> &Biome;

    /// Biome with the highest forage-to-death ratio
    fn best_survival_biome(&self) -> &Biome;
}

/// Terrain and biomes of one world
#[derive(Debug, Clone)]
pub struct Environment {
    pub terrain: ElevationField,
    pub biomes: BiomeRegistry,
}

impl Environment {
    pub fn new(terrain: ElevationField, biomes: BiomeRegistry) -> Self {
        Self { terrain, biomes }
    }

    pub fn from_config(config: &WorldConfig) -> Result<Self> {
        let biomes = BiomeRegistry::from_configs(&config.resolved_biomes())?;
        let terrain = ElevationField::generate(config.width, config.height, &config.terrain);
        Ok(Self::new(terrain, biomes))
    }
}

impl Habitat for Environment {
    fn dimensions(&self) -> (i32, i32) {
        (self.terrain.width, self.terrain.height)
    }

    fn elevation(&self, pos: Position) -> f64 {
        self.terrain.get(pos)
    }

    fn biome_at(&self, pos: Position) -> &Biome {
        let (width, height) = self.dimensions();
        self.biomes.biome_at(pos.clamp(width, height))
    }

    fn best_survival_biome(&self) -> &Biome {
        self.biomes.best_survival()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forage_core::{default_biomes, TerrainConfig};

    #[test]
    fn test_environment_from_config() {
        let config = WorldConfig {
            width: 40,
            height: 30,
            terrain: TerrainConfig {
                scale: 0.05,
                ..Default::default()
            },
            ..Default::default()
        };
        let env = Environment::from_config(&config).unwrap();
        assert_eq!(env.dimensions(), (40, 30));
        assert_eq!(env.biomes.len(), 3);
        let e = env.elevation(Position::new(10, 10));
        assert!((0.0..=1.0).contains(&e));
    }

    #[test]
    fn test_biome_lookup_clamps_coordinates() {
        let env = Environment::new(
            ElevationField::flat(40, 30, 0.5),
            BiomeRegistry::from_configs(&default_biomes(40, 30)).unwrap(),
        );
        // Clamped to (0, 0), which lies in the Desert
        assert_eq!(env.biome_at(Position::new(-10, -10)).name, "Desert");
        // Clamped to (39, 29), Plains
        assert_eq!(env.biome_at(Position::new(500, 500)).name, "Plains");
    }
}
