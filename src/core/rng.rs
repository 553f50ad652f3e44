//! Deterministic random number generation for self-play episodes.
//!
//! One `GameRng` is created per episode from its seed and threaded through
//! every call that needs randomness: initial-state creation, chance
//! sampling, root noise, playout-cap draws and action sampling. Nothing in
//! the crate touches a global generator, so an episode is reproducible
//! from its seed alone.
//!
//! ```
//! use rust_azero::core::GameRng;
//!
//! let mut a = GameRng::new(7);
//! let mut b = GameRng::new(7);
//! assert_eq!(a.gen_range_usize(0..100), b.gen_range_usize(0..100));
//! assert_eq!(a.choose_weighted(&[0.2, 0.8]), b.choose_weighted(&[0.2, 0.8]));
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Gamma};

/// Seeded ChaCha8 generator.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
}

impl GameRng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform draw from `[0, 1)`.
    pub fn gen_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    pub fn gen_range_usize(&mut self, range: std::ops::Range<usize>) -> usize {
        self.inner.gen_range(range)
    }

    /// `true` with the given probability (clamped to `[0, 1]`).
    pub fn gen_bool(&mut self, probability: f64) -> bool {
        self.inner.gen_bool(probability.clamp(0.0, 1.0))
    }

    /// Sample an index with probability proportional to its weight.
    ///
    /// Weights need not sum to 1. Negative and non-finite weights count as
    /// zero. Returns `None` when no weight is positive.
    pub fn choose_weighted(&mut self, weights: &[f64]) -> Option<usize> {
        let usable = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let total: f64 = weights.iter().map(|&w| usable(w)).sum();
        if total <= 0.0 {
            return None;
        }

        let mut threshold = self.gen_f64() * total;
        let mut last_positive = None;
        for (i, &weight) in weights.iter().enumerate() {
            let weight = usable(weight);
            if weight <= 0.0 {
                continue;
            }
            last_positive = Some(i);
            if threshold < weight {
                return Some(i);
            }
            threshold -= weight;
        }

        // Rounding left a sliver of mass past the last bucket.
        last_positive
    }

    /// Draw a sample from a symmetric Dirichlet distribution of size `n`.
    ///
    /// Built from normalized Gamma(alpha, 1) variates, which stays usable
    /// for the small alphas common in root noise. Returns `None` when
    /// `alpha` is not positive or `n` is zero.
    pub fn dirichlet(&mut self, alpha: f64, n: usize) -> Option<Vec<f64>> {
        if n == 0 {
            return None;
        }
        let gamma = Gamma::new(alpha, 1.0).ok()?;
        let mut samples: Vec<f64> = (0..n).map(|_| gamma.sample(&mut self.inner)).collect();
        let sum: f64 = samples.iter().sum();
        if sum > 0.0 && sum.is_finite() {
            for s in &mut samples {
                *s /= sum;
            }
        } else {
            // Every variate underflowed to zero.
            let uniform = 1.0 / n as f64;
            samples.iter_mut().for_each(|s| *s = uniform);
        }
        Some(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut rng1 = GameRng::new(42);
        let mut rng2 = GameRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.gen_range_usize(0..1000), rng2.gen_range_usize(0..1000));
        }
    }

    #[test]
    fn test_different_seeds() {
        let mut rng1 = GameRng::new(1);
        let mut rng2 = GameRng::new(2);

        let seq1: Vec<_> = (0..10).map(|_| rng1.gen_range_usize(0..1000)).collect();
        let seq2: Vec<_> = (0..10).map(|_| rng2.gen_range_usize(0..1000)).collect();

        assert_ne!(seq1, seq2);
    }

    #[test]
    fn test_choose_weighted_degenerate() {
        let mut rng = GameRng::new(42);

        for _ in 0..10 {
            assert_eq!(rng.choose_weighted(&[0.0, 3.0, 0.0]), Some(1));
        }
        assert_eq!(rng.choose_weighted(&[]), None);
        assert_eq!(rng.choose_weighted(&[0.0, 0.0]), None);
        assert_eq!(rng.choose_weighted(&[f64::NAN, -1.0]), None);
    }

    #[test]
    fn test_choose_weighted_chi_square() {
        let weights = [0.5, 0.3, 0.15, 0.05];
        let draws = 20_000;
        let mut rng = GameRng::new(2024);
        let mut counts = [0usize; 4];
        for _ in 0..draws {
            counts[rng.choose_weighted(&weights).unwrap()] += 1;
        }

        let chi_square: f64 = weights
            .iter()
            .zip(counts.iter())
            .map(|(&p, &observed)| {
                let expected = p * draws as f64;
                (observed as f64 - expected).powi(2) / expected
            })
            .sum();

        // Critical value for 3 degrees of freedom at p = 0.001.
        assert!(chi_square < 16.27, "chi-square {chi_square} counts {counts:?}");
    }

    #[test]
    fn test_dirichlet_is_distribution() {
        let mut rng = GameRng::new(3);
        for alpha in [0.03, 0.3, 1.0, 10.0] {
            let noise = rng.dirichlet(alpha, 6).unwrap();
            assert_eq!(noise.len(), 6);
            assert!(noise.iter().all(|&x| (0.0..=1.0).contains(&x)));
            assert!((noise.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        assert!(rng.dirichlet(0.0, 3).is_none());
        assert!(rng.dirichlet(0.3, 0).is_none());
    }

    #[test]
    fn test_gen_bool_clamps_probability() {
        let mut rng = GameRng::new(42);
        assert!((0..20).all(|_| rng.gen_bool(1.5)));
        assert!((0..20).all(|_| !rng.gen_bool(-0.5)));
    }
}
