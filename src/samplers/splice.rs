//! Slice-sampled conditionals for splicing proportion parameters.

use rand::Rng;

use crate::pdf::{gamma, normal, student_t};
use crate::shredder::Shredder;

/// Conditional for a normal likelihood's mean under a Student-t prior.
#[derive(Debug, Clone)]
pub struct NormalTMuSampler {
    shredder: Shredder,
}

impl NormalTMuSampler {
    /// Create with the given mean bounds.
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            shredder: Shredder::new(lower, upper, 1e-5),
        }
    }

    /// Forward tuning parameters to the slice sampler.
    pub fn tune(&mut self, max_newton_steps: usize, zero_eps: f64) {
        self.shredder.tune(max_newton_steps, zero_eps);
    }

    /// Draw `mu | xs, sigma` with prior `StudentsT(prior_nu, prior_mu,
    /// prior_sigma)`.
    #[allow(clippy::too_many_arguments)]
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        mu0: f64,
        sigma: f64,
        xs: &[f32],
        prior_nu: f64,
        prior_mu: f64,
        prior_sigma: f64,
    ) -> f64 {
        let mut target = |mu: f64| {
            let mut lp = student_t::logpdf(prior_nu, prior_mu, prior_sigma, mu);
            let mut d = student_t::dx(prior_nu, prior_mu, prior_sigma, mu);

            lp += normal::logpdf_sum(mu, sigma, xs);
            d += normal::dmu_sum(mu, sigma, xs);

            (lp, d)
        };

        let mu = self.shredder.sample(rng, mu0, &mut target);
        mu.clamp(self.shredder.lower(), self.shredder.upper())
    }
}

/// Conditional for a Student-t likelihood's location under a normal prior.
#[derive(Debug, Clone)]
pub struct StudentTMuSampler {
    shredder: Shredder,
}

impl StudentTMuSampler {
    /// Create with the given location bounds.
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            shredder: Shredder::new(lower, upper, 1e-5),
        }
    }

    /// Forward tuning parameters to the slice sampler.
    pub fn tune(&mut self, max_newton_steps: usize, zero_eps: f64) {
        self.shredder.tune(max_newton_steps, zero_eps);
    }

    /// Draw `mu | xs, nu, sigma` with prior `N(prior_mu, prior_sigma)`.
    #[allow(clippy::too_many_arguments)]
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        mu0: f64,
        nu: f64,
        sigma: f64,
        xs: &[f32],
        prior_mu: f64,
        prior_sigma: f64,
    ) -> f64 {
        let mut target = |mu: f64| {
            let mut lp = normal::logpdf(prior_mu, prior_sigma, mu);
            let mut d = normal::dx(prior_mu, prior_sigma, mu);

            lp += student_t::logpdf_sum(nu, mu, sigma, xs);
            d += student_t::dmu_sum(nu, mu, sigma, xs);

            (lp, d)
        };

        let mu = self.shredder.sample(rng, mu0, &mut target);
        mu.clamp(self.shredder.lower(), self.shredder.upper())
    }
}

/// Conditional for the affine rescaling factor eta of a spliced tgroup
/// member.
///
/// Given the unadjusted condition means and sigma, the posterior in eta
/// combines a Student-t term on each rescaled condition mean, the normal
/// observation likelihood with sigma = |eta| * unadj_sigma, and a gamma
/// prior on that sigma. Marginalizing the scale this way at every sweep
/// decouples the mean and sigma updates; the caller rescales the stored
/// parameters by the drawn eta and resets eta to one.
///
/// The target is evaluated without a gradient: the edge finder falls back to
/// pure bisection, which is robust across the sign change at eta = 0.
#[derive(Debug, Clone)]
pub struct ConditionSpliceEtaSampler {
    shredder: Shredder,
}

impl Default for ConditionSpliceEtaSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionSpliceEtaSampler {
    /// Create with the canonical eta bounds.
    pub fn new() -> Self {
        Self {
            shredder: Shredder::new(-10.0, 10.0, 1e-5),
        }
    }

    /// Forward tuning parameters to the slice sampler.
    pub fn tune(&mut self, max_newton_steps: usize, zero_eps: f64) {
        self.shredder.tune(max_newton_steps, zero_eps);
    }

    /// Draw eta.
    ///
    /// `splice_data` holds the per-sample proportions of one tgroup member;
    /// `condition_samples[i]` indexes the samples of condition `i` into it.
    #[allow(clippy::too_many_arguments)]
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        eta0: f64,
        unadj_mu: &[f32],
        unadj_sigma: f64,
        splice_data: &[f32],
        sample_mu: &[f32],
        condition_samples: &[Vec<usize>],
        prior_nu: f64,
        prior_mu: f64,
        sigma_alpha: f64,
        sigma_beta: f64,
    ) -> f64 {
        let mut target = |eta: f64| {
            let sigma = eta.abs() * unadj_sigma;
            let mut lp = 0.0;

            for (i, samples) in condition_samples.iter().enumerate() {
                let mu = eta * f64::from(unadj_mu[i]) + f64::from(sample_mu[i]);
                lp += student_t::logpdf(prior_nu, prior_mu, sigma, mu);
                for &sample_idx in samples {
                    lp += normal::logpdf(mu, sigma, f64::from(splice_data[sample_idx]));
                }
            }

            lp += gamma::logpdf(sigma_alpha, sigma_beta, sigma);

            (lp, 0.0)
        };

        let eta = self.shredder.sample(rng, eta0, &mut target);
        eta.clamp(self.shredder.lower(), self.shredder.upper())
    }
}
