//! Global events: a catalog of temporary birth/death multipliers with at most
//! one active at a time.

use forage_core::EventConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

const IDLE_NAME: &str = "None";

/// Change in the active event during one update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTransition {
    Started { name: String, duration: u32 },
    Ended { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct ActiveEvent {
    index: usize,
    remaining: u32,
}

/// Single-active-event state machine over an ordered catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDirector {
    catalog: Vec<EventConfig>,
    active: Option<ActiveEvent>,
}

impl EventDirector {
    pub fn new(catalog: Vec<EventConfig>) -> Self {
        Self {
            catalog,
            active: None,
        }
    }

    pub fn catalog(&self) -> &[EventConfig] {
        &self.catalog
    }

    /// Advance one tick.
    ///
    /// While idle, the catalog is scanned in order and the first event whose
    /// trial succeeds starts with its full duration. While active, the
    /// remaining count drops by one and the director goes idle at zero; no
    /// event starts on the tick another one ends.
    pub fn update(&mut self, rng: &mut impl Rng) -> Option<EventTransition> {
        match self.active {
            Some(mut active) => {
                active.remaining = active.remaining.saturating_sub(1);
                if active.remaining == 0 {
                    self.active = None;
                    let name = self.catalog[active.index].name.clone();
                    info!(event = %name, "Event ended");
                    Some(EventTransition::Ended { name })
                } else {
                    self.active = Some(active);
                    None
                }
            }
            None => {
                let index = self
                    .catalog
                    .iter()
                    .position(|e| rng.gen::<f64>() < e.trigger_probability)?;
                let event = &self.catalog[index];
                self.active = Some(ActiveEvent {
                    index,
                    remaining: event.duration,
                });
                info!(
                    event = %event.name,
                    duration = event.duration,
                    birth_multiplier = event.birth_multiplier,
                    death_multiplier = event.death_multiplier,
                    "Event started"
                );
                Some(EventTransition::Started {
                    name: event.name.clone(),
                    duration: event.duration,
                })
            }
        }
    }

    fn current(&self) -> Option<&EventConfig> {
        self.active.map(|a| &self.catalog[a.index])
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Ticks left on the active event, 0 when idle
    pub fn remaining(&self) -> u32 {
        self.active.map(|a| a.remaining).unwrap_or(0)
    }

    pub fn birth_multiplier(&self) -> f64 {
        self.current().map(|e| e.birth_multiplier).unwrap_or(1.0)
    }

    pub fn death_multiplier(&self) -> f64 {
        self.current().map(|e| e.death_multiplier).unwrap_or(1.0)
    }

    pub fn current_event_name(&self) -> &str {
        self.current().map(|e| e.name.as_str()).unwrap_or(IDLE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forage_core::default_events;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_idle_defaults() {
        let director = EventDirector::new(default_events());
        assert!(!director.is_active());
        assert_eq!(director.birth_multiplier(), 1.0);
        assert_eq!(director.death_multiplier(), 1.0);
        assert_eq!(director.current_event_name(), "None");
        assert_eq!(director.remaining(), 0);
        assert_eq!(director.catalog().len(), 5);
        assert_eq!(director.catalog()[0].name, "Harvest Season");
    }

    #[test]
    fn test_certain_event_runs_its_duration() {
        let mut director = EventDirector::new(vec![
            EventConfig::new("Flood", 0.5, 2.0, 3, 1.0),
            EventConfig::new("Never", 9.0, 9.0, 1, 1.0),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let started = director.update(&mut rng);
        assert_eq!(
            started,
            Some(EventTransition::Started {
                name: "Flood".to_string(),
                duration: 3
            })
        );
        assert_eq!(director.current_event_name(), "Flood");
        assert_eq!(director.birth_multiplier(), 0.5);
        assert_eq!(director.death_multiplier(), 2.0);

        assert_eq!(director.update(&mut rng), None);
        assert_eq!(director.remaining(), 2);
        assert_eq!(director.update(&mut rng), None);
        assert_eq!(director.remaining(), 1);

        let ended = director.update(&mut rng);
        assert_eq!(ended, Some(EventTransition::Ended { name: "Flood".to_string() }));
        assert!(!director.is_active());
        assert_eq!(director.death_multiplier(), 1.0);

        // Idle again: the next update may start a new one
        assert!(matches!(
            director.update(&mut rng),
            Some(EventTransition::Started { .. })
        ));
    }

    #[test]
    fn test_zero_probability_never_starts() {
        let mut director = EventDirector::new(vec![EventConfig::new("Never", 1.0, 1.0, 5, 0.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..100 {
            assert_eq!(director.update(&mut rng), None);
        }
        assert!(!director.is_active());
    }

    #[test]
    fn test_empty_catalog() {
        let mut director = EventDirector::new(Vec::new());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(director.update(&mut rng), None);
        assert_eq!(director.current_event_name(), "None");
    }

    #[test]
    fn test_remaining_strictly_decreases() {
        let mut director = EventDirector::new(default_events());
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut previous: Option<u32> = None;

        for _ in 0..2000 {
            let transition = director.update(&mut rng);
            match (previous, director.is_active()) {
                (Some(prev), true) if !matches!(transition, Some(EventTransition::Started { .. })) => {
                    assert_eq!(director.remaining(), prev - 1);
                }
                _ => {}
            }
            previous = director.is_active().then(|| director.remaining());
        }
    }
}
