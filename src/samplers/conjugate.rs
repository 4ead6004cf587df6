//! Conjugate normal conditionals: direct draws, no slice sampling.

use rand::Rng;
use rand_distr::{Distribution, Gamma, StandardNormal};

use crate::math::sq;

/// Posterior draw of a normal mean with known sigma under a normal prior.
#[derive(Debug, Default, Clone)]
pub struct NormalMuSampler;

impl NormalMuSampler {
    /// Draw `mu | xs, sigma` with prior `N(prior_mu, prior_sigma)`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        sigma: f64,
        xs: &[f32],
        prior_mu: f64,
        prior_sigma: f64,
    ) -> f64 {
        let prior_var = sq(prior_sigma);
        let var = sq(sigma);
        let n = xs.len() as f64;
        let sum: f64 = xs.iter().map(|&x| f64::from(x)).sum();

        let part = 1.0 / prior_var + n / var;
        let posterior_mu = (prior_mu / prior_var + sum / var) / part;
        let posterior_sigma = (1.0 / part).sqrt();

        let z: f64 = StandardNormal.sample(rng);
        posterior_mu + z * posterior_sigma
    }
}

/// Posterior draw of a normal sigma (zero mean) under a gamma prior on the
/// precision.
#[derive(Debug, Default, Clone)]
pub struct NormalSigmaSampler;

impl NormalSigmaSampler {
    /// Draw `sigma | xs` with prior `Gamma(prior_alpha, prior_beta)` on the
    /// precision `1/sigma²`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        xs: &[f32],
        prior_alpha: f64,
        prior_beta: f64,
    ) -> f64 {
        let posterior_alpha = prior_alpha + xs.len() as f64 / 2.0;
        let mut part = 0.0;
        for &x in xs {
            part += sq(f64::from(x));
        }
        let posterior_beta = prior_beta + part / 2.0;

        let tau = Gamma::new(posterior_alpha, 1.0 / posterior_beta)
            .unwrap()
            .sample(rng);
        (1.0 / tau).sqrt()
    }
}
