//! Slice-sampled conditional for a beta distribution's mean.

use rand::Rng;

use crate::pdf::beta;
use crate::shredder::Shredder;

/// Conditional for the mean `gamma = alpha / (alpha + beta)` of a beta
/// distribution with fixed precision, under a beta prior on the mean.
#[derive(Debug, Clone)]
pub struct BetaDistributionSampler {
    shredder: Shredder,
}

impl Default for BetaDistributionSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl BetaDistributionSampler {
    /// Create with the canonical mean bounds.
    pub fn new() -> Self {
        Self {
            shredder: Shredder::new(1e-16, 1.0, 1e-5),
        }
    }

    /// Forward tuning parameters to the slice sampler.
    pub fn tune(&mut self, max_newton_steps: usize, zero_eps: f64) {
        self.shredder.tune(max_newton_steps, zero_eps);
    }

    /// Draw the mean given `data` observed under `Beta(gamma * prec,
    /// (1 - gamma) * prec)`, starting from `a0 / (a0 + b0)`.
    #[allow(clippy::too_many_arguments)]
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        a0: f64,
        b0: f64,
        prec: f64,
        a_prior: f64,
        b_prior: f64,
        data: &[f32],
    ) -> f64 {
        let mut target = |x: f64| {
            let mut lp = beta::logpdf(a_prior, b_prior, x);
            let mut d = beta::dx(a_prior, b_prior, x);

            for &obs in data {
                let obs = f64::from(obs);
                lp += beta::logpdf(x * prec, (1.0 - x) * prec, obs);
                d += beta::dgamma(x, prec, obs);
            }

            (lp, d)
        };

        let gamma = self.shredder.sample(rng, a0 / (a0 + b0), &mut target);
        gamma.clamp(self.shredder.lower(), self.shredder.upper())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn mean_tracks_concentrated_data() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(31);
        let sampler = BetaDistributionSampler::new();
        let data: Vec<f32> = vec![0.7; 64];
        let mut sum = 0.0;
        let n = 400;
        for _ in 0..n {
            let g = sampler.sample(&mut rng, 2.0, 2.0, 20.0, 1.0, 1.0, &data);
            assert!((0.0..=1.0).contains(&g));
            sum += g;
        }
        let mean = sum / f64::from(n);
        assert!((mean - 0.7).abs() < 0.05, "beta mean posterior {mean}");
    }
}
