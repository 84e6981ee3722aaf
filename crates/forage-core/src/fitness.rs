//! Fitness scoring for agents.

use serde::{Deserialize, Serialize};

pub const MIN_FITNESS: f64 = 1.0;
pub const MAX_FITNESS: f64 = 100.0;

const HUNGER_WEIGHT: f64 = 0.4;
const AGE_WEIGHT: f64 = 0.3;
const BIOME_WEIGHT: f64 = 0.2;
const PACK_WEIGHT: f64 = 0.1;

/// Neighbor count at which the pack sub-score saturates
const IDEAL_PACK_SIZE: f64 = 10.0;

/// Everything the fitness score depends on
#[derive(Debug, Clone, Copy)]
pub struct FitnessInputs {
    pub hunger: u32,
    pub max_hunger: u32,
    pub age: u32,
    pub max_age: u32,
    pub forage_modifier: f64,
    pub max_forage_modifier: f64,
    pub neighbors: usize,
}

/// Sub-scores in [0, 1] and the combined score in [1, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessBreakdown {
    pub hunger: f64,
    pub age: f64,
    pub biome: f64,
    pub pack: f64,
    pub score: f64,
}

impl FitnessInputs {
    pub fn score(&self) -> FitnessBreakdown {
        let hunger = (1.0 - self.hunger as f64 / self.max_hunger as f64).clamp(0.0, 1.0);

        // Gaussian bump peaking at mid-life
        let mid = self.max_age as f64 / 2.0;
        let sigma = mid / 2.0;
        let diff = self.age as f64 - mid;
        let age = (-(diff * diff) / (2.0 * sigma * sigma)).exp();

        let biome = (self.forage_modifier / self.max_forage_modifier).clamp(0.0, 1.0);
        let pack = (self.neighbors as f64 / IDEAL_PACK_SIZE).min(1.0);

        let raw = hunger * HUNGER_WEIGHT + age * AGE_WEIGHT + biome * BIOME_WEIGHT + pack * PACK_WEIGHT;
        let score = (MIN_FITNESS + raw * (MAX_FITNESS - MIN_FITNESS)).clamp(MIN_FITNESS, MAX_FITNESS);

        FitnessBreakdown {
            hunger,
            age,
            biome,
            pack,
            score,
        }
    }
}

/// Death probability scale: fitter agents are less likely to die
pub fn death_scale(fitness: f64) -> f64 {
    1.0 - 0.5 * (fitness / MAX_FITNESS)
}

/// Birth probability scale from the average fitness of a pair
pub fn birth_scale(pair_average_fitness: f64) -> f64 {
    1.0 + 0.5 * (pair_average_fitness / MAX_FITNESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn inputs(hunger: u32, age: u32, forage: f64, neighbors: usize) -> FitnessInputs {
        FitnessInputs {
            hunger,
            max_hunger: 25,
            age,
            max_age: 100,
            forage_modifier: forage,
            max_forage_modifier: 3.0,
            neighbors,
        }
    }

    #[test]
    fn test_boundary_cases_stay_in_range() {
        for hunger in [0, 25] {
            for age in [0, 50, 100] {
                for neighbors in [0, 10, 50] {
                    let score = inputs(hunger, age, 1.0, neighbors).score().score;
                    assert!((MIN_FITNESS..=MAX_FITNESS).contains(&score), "{}", score);
                }
            }
        }
    }

    #[test]
    fn test_peak_fitness() {
        let best = inputs(0, 50, 3.0, 10).score();
        assert_eq!(best.hunger, 1.0);
        assert_eq!(best.age, 1.0);
        assert_eq!(best.biome, 1.0);
        assert_eq!(best.pack, 1.0);
        assert!((best.score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_starving_loner_scores_low() {
        let worst = inputs(25, 0, 0.0, 0).score();
        assert_eq!(worst.hunger, 0.0);
        assert_eq!(worst.biome, 0.0);
        assert_eq!(worst.pack, 0.0);
        // Only the age tail contributes: exp(-2) at age 0
        let expected = 1.0 + 99.0 * 0.3 * (-2.0f64).exp();
        assert!((worst.score - expected).abs() < 1e-9, "{}", worst.score);
    }

    #[test]
    fn test_scales() {
        assert_eq!(death_scale(100.0), 0.5);
        assert_eq!(death_scale(0.0), 1.0);
        assert_eq!(birth_scale(100.0), 1.5);
        assert_eq!(birth_scale(0.0), 1.0);
    }

    proptest! {
        #[test]
        fn prop_fitness_in_range(
            hunger in 0u32..=25,
            age in 0u32..=200,
            forage in 0.0f64..10.0,
            neighbors in 0usize..100,
        ) {
            let score = inputs(hunger, age, forage, neighbors).score().score;
            prop_assert!(score >= MIN_FITNESS && score <= MAX_FITNESS);
        }
    }
}
