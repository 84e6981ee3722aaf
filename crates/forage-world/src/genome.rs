//! Fixed-length letter genomes with single-point crossover.

use forage_core::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const ALPHABET_SIZE: u8 = 26;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genome(Vec<u8>);

impl Genome {
    /// Build from a string of `A..=Z` letters
    pub fn from_letters(letters: &str) -> Result<Self> {
        if let Some(bad) = letters.chars().find(|c| !c.is_ascii_uppercase()) {
            return Err(Error::Validation(format!("Invalid genome symbol '{}'", bad)));
        }
        Ok(Self(letters.bytes().collect()))
    }

    pub fn random(len: usize, rng: &mut impl Rng) -> Self {
        Self((0..len).map(|_| random_symbol(rng)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Single-point crossover at a uniform cut, then per-symbol re-roll with
    /// probability `mutation_rate`.
    pub fn crossover(&self, other: &Genome, mutation_rate: f64, rng: &mut impl Rng) -> Result<Genome> {
        if self.len() != other.len() {
            return Err(Error::GenomeLengthMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        if self.is_empty() {
            return Ok(self.clone());
        }

        let cut = rng.gen_range(0..self.len());
        let mut child = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            let mut symbol = if i < cut { self.0[i] } else { other.0[i] };
            if rng.gen::<f64>() < mutation_rate {
                symbol = random_symbol(rng);
            }
            child.push(symbol);
        }
        Ok(Genome(child))
    }

    /// Number of positions where two equal-length genomes differ
    pub fn hamming_distance(&self, other: &Genome) -> Option<usize> {
        if self.len() != other.len() {
            return None;
        }
        Some(self.0.iter().zip(&other.0).filter(|(a, b)| a != b).count())
    }
}

fn random_symbol(rng: &mut impl Rng) -> u8 {
    b'A' + rng.gen_range(0..ALPHABET_SIZE)
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &symbol in &self.0 {
            write!(f, "{}", symbol as char)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_genome() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let genome = Genome::random(10, &mut rng);
        assert_eq!(genome.len(), 10);
        assert!(genome.to_string().chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_from_letters() {
        let genome = Genome::from_letters("ABCZ").unwrap();
        assert_eq!(genome.to_string(), "ABCZ");
        assert!(Genome::from_letters("AbC").is_err());
    }

    #[test]
    fn test_crossover_is_prefix_suffix_without_mutation() {
        let a = Genome::from_letters("AAAAAAAAAA").unwrap();
        let b = Genome::from_letters("BBBBBBBBBB").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        for _ in 0..20 {
            let child = a.crossover(&b, 0.0, &mut rng).unwrap().to_string();
            assert_eq!(child.len(), 10);
            let cut = child.find('B').unwrap_or(10);
            assert!(child[..cut].chars().all(|c| c == 'A'));
            assert!(child[cut..].chars().all(|c| c == 'B'));
        }
    }

    #[test]
    fn test_full_mutation_rerolls_symbols() {
        let a = Genome::from_letters(&"A".repeat(200)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let child = a.crossover(&a, 1.0, &mut rng).unwrap();
        assert!(child.hamming_distance(&a).unwrap() > 100);
    }

    #[test]
    fn test_length_mismatch_fails_fast() {
        let a = Genome::from_letters("ABC").unwrap();
        let b = Genome::from_letters("ABCD").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        assert!(matches!(
            a.crossover(&b, 0.01, &mut rng),
            Err(Error::GenomeLengthMismatch { left: 3, right: 4 })
        ));
        assert_eq!(a.hamming_distance(&b), None);
    }
}
