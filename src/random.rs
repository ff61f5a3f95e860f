//! Random facility.
//!
//! Every component that needs randomness draws from the calling thread's RNG
//! (`rand::rng()`), so the rayon workers never contend on shared generator
//! state. This module adds the distributions the model needs beyond plain
//! `random_range`: random unit headings, gamma distributions parameterized by
//! a mean/sd pair, and the mutable discrete distribution that backs state
//! transitions.

use crate::vector::Vec2;
use rand::Rng;
use rand_distr::Gamma;

/// A random unit heading, uniform in angle.
pub fn unit_vec<R: Rng>(rng: &mut R) -> Vec2 {
    let a = rng.random_range(0.0..std::f32::consts::TAU);
    Vec2::new(a.cos(), a.sin())
}

/// Builds a gamma distribution from a mean/standard-deviation pair:
/// shape `α = (μ/σ)²`, scale `β = σ²/μ`.
pub fn gamma_from_mean_sd(mean: f32, sd: f32) -> Result<Gamma<f32>, rand_distr::GammaError> {
    let alpha = (mean / sd) * (mean / sd);
    let beta = (sd * sd) / mean;
    Gamma::new(alpha, beta)
}

/// A discrete distribution over `0..n` that can be re-parameterized in place
/// from a weight row.
///
/// When every weight is zero (or negative weights cancel the total) the
/// distribution silently degrades to uniform instead of failing; the state
/// machines rely on this for transition rows of all zeros.
#[derive(Debug, Clone, Default)]
pub struct MutableDiscrete {
    cum: Vec<f32>,
}

impl MutableDiscrete {
    pub fn new() -> Self {
        MutableDiscrete { cum: Vec::new() }
    }

    /// Replaces the weights. Reuses the internal buffer, so a thread-local
    /// instance never reallocates after the first row of a given length.
    pub fn mutate(&mut self, weights: &[f32]) {
        self.cum.clear();
        let mut total = 0.0f32;
        for &w in weights {
            total += w.max(0.0);
            self.cum.push(total);
        }
        if total <= 0.0 {
            // all-zero row: fall back to uniform
            for (i, c) in self.cum.iter_mut().enumerate() {
                *c = (i + 1) as f32;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cum.is_empty()
    }

    /// Samples an index proportional to the current weights.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        debug_assert!(!self.cum.is_empty());
        let total = *self.cum.last().unwrap();
        let x = rng.random_range(0.0..total);
        self.cum
            .iter()
            .position(|&c| x < c)
            .unwrap_or(self.cum.len() - 1)
    }
}
