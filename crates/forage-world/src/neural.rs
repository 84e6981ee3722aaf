//! Small feed-forward controller with per-weight crossover, Gaussian mutation
//! and a reward-modulated Hebbian update.
//!
//! Hidden layers use `tanh`; the output layer is linear. Every forward pass
//! caches the activation vector of each layer so that a following
//! [`NeuralController::reward`] call can correlate the pre- and
//! post-activations of that same pass.

use forage_core::{Error, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Standard deviation of freshly initialized weights
const INIT_STD_DEV: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralController {
    layer_sizes: Vec<usize>,
    /// `weights[layer][input][output]`
    weights: Vec<Vec<Vec<f64>>>,
    /// Activations of the last forward pass, one vector per layer
    #[serde(skip)]
    activations: Vec<Vec<f64>>,
}

impl NeuralController {
    pub fn new(layer_sizes: &[usize], rng: &mut impl Rng) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(Error::Validation(format!(
                "Controller needs an input and an output layer, got {:?}",
                layer_sizes
            )));
        }
        if layer_sizes.iter().any(|&n| n == 0) {
            return Err(Error::Validation(format!(
                "Controller layers must be non-empty, got {:?}",
                layer_sizes
            )));
        }

        let normal = Normal::new(0.0, INIT_STD_DEV)
            .map_err(|e| Error::InvalidState(format!("Bad weight distribution: {}", e)))?;

        let mut weights = Vec::with_capacity(layer_sizes.len() - 1);
        for pair in layer_sizes.windows(2) {
            let mut matrix = Vec::with_capacity(pair[0]);
            for _ in 0..pair[0] {
                let row: Vec<f64> = (0..pair[1]).map(|_| normal.sample(&mut *rng)).collect();
                matrix.push(row);
            }
            weights.push(matrix);
        }

        Ok(Self {
            layer_sizes: layer_sizes.to_vec(),
            weights,
            activations: Vec::new(),
        })
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn input_size(&self) -> usize {
        self.layer_sizes[0]
    }

    pub fn output_size(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    pub fn weight(&self, layer: usize, input: usize, output: usize) -> Option<f64> {
        self.weights
            .get(layer)
            .and_then(|l| l.get(input))
            .and_then(|row| row.get(output))
            .copied()
    }

    pub fn weight_count(&self) -> usize {
        self.layer_sizes.windows(2).map(|pair| pair[0] * pair[1]).sum()
    }

    /// Cached activations of the last forward pass (empty before the first)
    pub fn activations(&self) -> &[Vec<f64>] {
        &self.activations
    }

    fn weights_iter(&self) -> impl Iterator<Item = &f64> {
        self.weights.iter().flatten().flatten()
    }

    fn weights_iter_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.weights.iter_mut().flatten().flatten()
    }

    /// Propagate `input` through the network and return the output layer.
    pub fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_size() {
            return Err(Error::InputLengthMismatch {
                expected: self.input_size(),
                actual: input.len(),
            });
        }

        let last = self.weights.len() - 1;
        let mut activations = Vec::with_capacity(self.layer_sizes.len());
        activations.push(input.to_vec());

        for (layer, matrix) in self.weights.iter().enumerate() {
            let prev = &activations[layer];
            let outputs = self.layer_sizes[layer + 1];
            let next: Vec<f64> = (0..outputs)
                .map(|j| {
                    let sum: f64 = prev.iter().zip(matrix).map(|(a, row)| a * row[j]).sum();
                    if layer < last {
                        sum.tanh()
                    } else {
                        sum
                    }
                })
                .collect();
            activations.push(next);
        }

        let output = activations[activations.len() - 1].clone();
        self.activations = activations;
        Ok(output)
    }

    /// Add `delta` to every outgoing weight of one input neuron
    pub fn add_input_bias(&mut self, input_index: usize, delta: f64) {
        if let Some(row) = self.weights[0].get_mut(input_index) {
            for w in row.iter_mut() {
                *w += delta;
            }
        }
    }

    /// Child whose every weight is taken from `self` or `other` with equal odds
    pub fn crossover(&self, other: &NeuralController, rng: &mut impl Rng) -> Result<Self> {
        if self.layer_sizes != other.layer_sizes {
            return Err(Error::ArchitectureMismatch {
                left: self.layer_sizes.clone(),
                right: other.layer_sizes.clone(),
            });
        }

        let mut child = self.clone();
        child.activations.clear();
        for (w, theirs) in child.weights_iter_mut().zip(other.weights_iter()) {
            if rng.gen::<bool>() {
                *w = *theirs;
            }
        }
        Ok(child)
    }

    /// Perturb each weight with probability `rate` by N(0, magnitude^2) noise
    pub fn mutate(&mut self, rate: f64, magnitude: f64, rng: &mut impl Rng) {
        let normal = match Normal::new(0.0, magnitude) {
            Ok(normal) => normal,
            Err(_) => return,
        };
        for w in self.weights_iter_mut() {
            if rng.gen::<f64>() < rate {
                *w += normal.sample(rng);
            }
        }
    }

    /// Hebbian update `w += rate * signal * pre * post` over the activations
    /// of the last forward pass. Does nothing before the first pass.
    pub fn reward(&mut self, rate: f64, signal: f64) {
        if self.activations.len() != self.layer_sizes.len() {
            return;
        }
        for (layer, matrix) in self.weights.iter_mut().enumerate() {
            let pre = &self.activations[layer];
            let post = &self.activations[layer + 1];
            for (row, &a) in matrix.iter_mut().zip(pre) {
                for (w, &b) in row.iter_mut().zip(post) {
                    *w += rate * signal * a * b;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn controller(seed: u64) -> NeuralController {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        NeuralController::new(&[5, 8, 2], &mut rng).unwrap()
    }

    fn all_weights(net: &NeuralController) -> Vec<f64> {
        net.weights_iter().copied().collect()
    }

    #[test]
    fn test_shape() {
        let net = controller(1);
        assert_eq!(net.layer_sizes(), &[5, 8, 2]);
        assert_eq!(net.weight_count(), 5 * 8 + 8 * 2);
        assert_eq!(all_weights(&net).len(), net.weight_count());
        assert!(net.activations().is_empty());
    }

    #[test]
    fn test_invalid_architectures() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(NeuralController::new(&[5], &mut rng).is_err());
        assert!(NeuralController::new(&[5, 0, 2], &mut rng).is_err());
    }

    #[test]
    fn test_forward_is_deterministic_and_pure() {
        let mut net = controller(2);
        let before = all_weights(&net);
        let input = [0.1, -0.2, 0.05, 0.3, -0.4];

        let first = net.forward(&input).unwrap();
        let second = net.forward(&input).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(all_weights(&net), before);
        assert_eq!(net.activations().len(), 3);
        assert_eq!(net.activations()[0], input.to_vec());
        // Hidden layer goes through tanh
        assert!(net.activations()[1].iter().all(|a| a.abs() <= 1.0));
    }

    #[test]
    fn test_forward_rejects_wrong_input_length() {
        let mut net = controller(3);
        let err = net.forward(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::InputLengthMismatch { expected: 5, actual: 2 }));
    }

    #[test]
    fn test_add_input_bias() {
        let mut net = controller(4);
        let before: Vec<f64> = (0..8).map(|j| net.weight(0, 3, j).unwrap()).collect();
        let untouched = net.weight(0, 2, 0).unwrap();

        net.add_input_bias(3, 0.2);

        for (j, old) in before.iter().enumerate() {
            assert!((net.weight(0, 3, j).unwrap() - (old + 0.2)).abs() < 1e-12);
        }
        assert_eq!(net.weight(0, 2, 0).unwrap(), untouched);
    }

    #[test]
    fn test_crossover_picks_parent_weights() {
        let a = controller(5);
        let b = controller(6);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let child = a.crossover(&b, &mut rng).unwrap();
        let (wa, wb, wc) = (all_weights(&a), all_weights(&b), all_weights(&child));

        assert!(wc
            .iter()
            .zip(wa.iter().zip(&wb))
            .all(|(c, (x, y))| c == x || c == y));
        // Both parents should contribute across 56 weights
        assert!(wc.iter().zip(&wa).any(|(c, x)| c != x));
        assert!(wc.iter().zip(&wb).any(|(c, y)| c != y));
    }

    #[test]
    fn test_crossover_then_zero_rate_mutation_is_noop() {
        let a = controller(8);
        let b = controller(9);
        let mut rng = ChaCha8Rng::seed_from_u64(10);

        let mut child = a.crossover(&b, &mut rng).unwrap();
        let crossed = all_weights(&child);
        child.mutate(0.0, 0.2, &mut rng);
        assert_eq!(all_weights(&child), crossed);
    }

    #[test]
    fn test_crossover_rejects_mismatched_architecture() {
        let a = controller(11);
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let b = NeuralController::new(&[5, 4, 2], &mut rng).unwrap();
        assert!(matches!(
            a.crossover(&b, &mut rng),
            Err(Error::ArchitectureMismatch { .. })
        ));
    }

    #[test]
    fn test_full_rate_mutation_changes_weights() {
        let mut net = controller(13);
        let before = all_weights(&net);
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        net.mutate(1.0, 0.2, &mut rng);
        assert!(all_weights(&net).iter().zip(&before).all(|(a, b)| a != b));
    }

    #[test]
    fn test_reward_uses_last_activations() {
        let mut net = controller(15);
        let input = [0.5, -0.5, 0.25, 1.0, -1.0];
        net.forward(&input).unwrap();

        let pre = net.activations()[0].clone();
        let post = net.activations()[1].clone();
        let old = net.weight(0, 3, 1).unwrap();

        net.reward(0.05, 2.0);

        let expected = old + 0.05 * 2.0 * pre[3] * post[1];
        assert!((net.weight(0, 3, 1).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_reward_before_forward_is_noop() {
        let mut net = controller(16);
        let before = all_weights(&net);
        net.reward(0.05, 1.0);
        assert_eq!(all_weights(&net), before);
    }
}
