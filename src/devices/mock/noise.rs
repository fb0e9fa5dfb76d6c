//! Gaussian noise for the bag simulator

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Seedable noise source; seed 0 draws from entropy
pub struct NoiseGenerator {
    rng: SmallRng,
}

impl NoiseGenerator {
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    /// Gaussian sample with the given standard deviation
    #[inline]
    pub fn gaussian(&mut self, stddev: f32) -> f32 {
        if stddev == 0.0 {
            return 0.0;
        }
        let n: f32 = self.rng.sample(StandardNormal);
        n * stddev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_deterministic() {
        let mut a = NoiseGenerator::new(7);
        let mut b = NoiseGenerator::new(7);
        for _ in 0..50 {
            assert_eq!(a.gaussian(1.0), b.gaussian(1.0));
        }
    }

    #[test]
    fn test_zero_stddev_is_silent() {
        let mut n = NoiseGenerator::new(7);
        assert_eq!(n.gaussian(0.0), 0.0);
    }
}
