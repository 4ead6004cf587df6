//! Slice-sampled conditionals for scale parameters.

use rand::Rng;

use crate::pdf::{gamma, inv_gamma, log_normal, normal, sq_inv_gamma};
use crate::shredder::Shredder;

/// Conditional for the sigma of a zero-mean normal likelihood under a gamma
/// prior.
#[derive(Debug, Clone)]
pub struct GammaNormalSigmaSampler {
    shredder: Shredder,
}

impl Default for GammaNormalSigmaSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl GammaNormalSigmaSampler {
    /// Create with the canonical sigma bounds.
    pub fn new() -> Self {
        Self {
            shredder: Shredder::new(1e-8, 1e5, 1e-5),
        }
    }

    /// Forward tuning parameters to the slice sampler.
    pub fn tune(&mut self, max_newton_steps: usize, zero_eps: f64) {
        self.shredder.tune(max_newton_steps, zero_eps);
    }

    /// Draw `sigma | xs` with prior `Gamma(prior_alpha, prior_beta)`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        sigma0: f64,
        xs: &[f32],
        prior_alpha: f64,
        prior_beta: f64,
    ) -> f64 {
        let mut target = |sigma: f64| {
            let mut lp = normal::logpdf_sum(0.0, sigma, xs);
            let mut d = normal::dsigma_sum(0.0, sigma, xs);

            lp += gamma::logpdf(prior_alpha, prior_beta, sigma);
            d += gamma::dx(prior_alpha, prior_beta, sigma);

            (lp, d)
        };

        let sigma = self.shredder.sample(rng, sigma0, &mut target);
        sigma.clamp(self.shredder.lower(), self.shredder.upper())
    }
}

/// Conditional for the sigma of a log-normal likelihood with per-observation
/// locations, under a gamma prior.
#[derive(Debug, Clone)]
pub struct GammaLogNormalSigmaSampler {
    shredder: Shredder,
}

impl Default for GammaLogNormalSigmaSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl GammaLogNormalSigmaSampler {
    /// Create with the canonical sigma bounds.
    pub fn new() -> Self {
        Self {
            shredder: Shredder::new(1e-8, 1e5, 1e-5),
        }
    }

    /// Forward tuning parameters to the slice sampler.
    pub fn tune(&mut self, max_newton_steps: usize, zero_eps: f64) {
        self.shredder.tune(max_newton_steps, zero_eps);
    }

    /// Draw `sigma | xs, mus` with prior `Gamma(prior_alpha, prior_beta)`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        mus: &[f32],
        sigma0: f64,
        xs: &[f32],
        prior_alpha: f64,
        prior_beta: f64,
    ) -> f64 {
        let mut target = |sigma: f64| {
            let mut lp = 0.0;
            let mut d = 0.0;
            for (&mu, &x) in mus.iter().zip(xs) {
                lp += log_normal::logpdf(f64::from(mu), sigma, f64::from(x));
                d += log_normal::dsigma(f64::from(mu), sigma, f64::from(x));
            }

            lp += gamma::logpdf(prior_alpha, prior_beta, sigma);
            d += gamma::dx(prior_alpha, prior_beta, sigma);

            (lp, d)
        };

        let sigma = self.shredder.sample(rng, sigma0, &mut target);
        sigma.clamp(self.shredder.lower(), self.shredder.upper())
    }
}

/// Conditional for the rate of an inverse-gamma distribution over squared
/// scales, under an inverse-gamma prior on the rate itself.
#[derive(Debug, Clone)]
pub struct BetaSampler {
    shredder: Shredder,
}

impl Default for BetaSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl BetaSampler {
    /// Create with the canonical rate bounds.
    pub fn new() -> Self {
        Self {
            shredder: Shredder::new(1e-16, 1e5, 1e-5),
        }
    }

    /// Forward tuning parameters to the slice sampler.
    pub fn tune(&mut self, max_newton_steps: usize, zero_eps: f64) {
        self.shredder.tune(max_newton_steps, zero_eps);
    }

    /// Draw `beta | sigmas, alpha` with prior `InvGamma(alpha_beta,
    /// beta_beta)`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        beta0: f64,
        alpha: f64,
        alpha_beta: f64,
        beta_beta: f64,
        sigmas: &[f32],
    ) -> f64 {
        let mut target = |beta: f64| {
            let mut lp = inv_gamma::logpdf(alpha_beta, beta_beta, beta);
            let mut d = inv_gamma::dx(alpha_beta, beta_beta, beta);

            lp += sq_inv_gamma::logpdf_sum(alpha, beta, sigmas);
            d += sq_inv_gamma::dbeta_sum(alpha, beta, sigmas);

            (lp, d)
        };

        let beta = self.shredder.sample(rng, beta0, &mut target);
        beta.clamp(self.shredder.lower(), self.shredder.upper())
    }
}
