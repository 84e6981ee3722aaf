//! Running counters kept by the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathCause {
    Starvation,
    OldAge,
    /// Lost the per-tick death roll
    Random,
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeathCause::Starvation => write!(f, "starvation"),
            DeathCause::OldAge => write!(f, "old_age"),
            DeathCause::Random => write!(f, "random"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub births: u64,
    pub starvation_deaths: u64,
    pub old_age_deaths: u64,
    pub random_deaths: u64,
    pub peak_population: usize,
}

impl SimulationStats {
    pub fn record_death(&mut self, cause: DeathCause) {
        match cause {
            DeathCause::Starvation => self.starvation_deaths += 1,
            DeathCause::OldAge => self.old_age_deaths += 1,
            DeathCause::Random => self.random_deaths += 1,
        }
    }

    pub fn record_birth(&mut self) {
        self.births += 1;
    }

    pub fn observe_population(&mut self, size: usize) {
        self.peak_population = self.peak_population.max(size);
    }

    pub fn total_deaths(&self) -> u64 {
        self.starvation_deaths + self.old_age_deaths + self.random_deaths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut stats = SimulationStats::default();
        stats.record_death(DeathCause::Starvation);
        stats.record_death(DeathCause::OldAge);
        stats.record_death(DeathCause::OldAge);
        stats.record_birth();
        stats.observe_population(12);
        stats.observe_population(7);

        assert_eq!(stats.total_deaths(), 3);
        assert_eq!(stats.old_age_deaths, 2);
        assert_eq!(stats.births, 1);
        assert_eq!(stats.peak_population, 12);
        assert_eq!(DeathCause::OldAge.to_string(), "old_age");
    }
}
