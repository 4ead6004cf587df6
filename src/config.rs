//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SEED, MAX_NEWTON_STEPS, ZERO_EPS};
use crate::error::{Error, Result};

/// Configuration options for a sampler run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Burn-in ticks before any posterior sample is recorded (default: 100).
    pub burnin: usize,

    /// Number of output rows. Row 0 holds the maximum-posterior state from
    /// the optimization rounds; rows `1..num_samples` are posterior samples
    /// (default: 250).
    pub num_samples: usize,

    /// Optimization rounds run before burn-in (default: 10).
    pub num_opt_rounds: usize,

    /// Worker pool width per worker kind. `0` resolves to the machine's
    /// available parallelism (default: 0).
    pub num_threads: usize,

    /// Seed for the RNG pools: one RNG per transcript and per spliced
    /// tgroup, seeded as `rng_seed + offset`.
    pub rng_seed: u64,

    /// Skip the `engage_priors` transition after optimization.
    pub nopriors: bool,

    /// Validate inputs and allocate state, then return without starting
    /// quantifiers or running any ticks.
    pub dryrun: bool,

    /// Draw progress bars for the optimize and sampling phases.
    pub show_progress: bool,

    /// Value at which the experiment-level shape is held.
    pub experiment_shape: f64,

    /// Prior shape for the experiment-level shape. Accepted for
    /// compatibility; the experiment shape is currently held fixed at
    /// `experiment_shape`.
    pub experiment_shape_alpha: f64,

    /// Prior rate for the experiment-level shape. Accepted for
    /// compatibility, see `experiment_shape_alpha`.
    pub experiment_shape_beta: f64,

    /// Gamma prior shape on the experiment splice sigma.
    pub experiment_splice_sigma_alpha: f64,

    /// Gamma prior rate on the experiment splice sigma.
    pub experiment_splice_sigma_beta: f64,

    /// Gamma prior shape on per-transcript condition shapes.
    pub condition_shape_alpha: f64,

    /// Gamma hyperprior shape on the condition-shape rate.
    pub condition_shape_beta_a: f64,

    /// Gamma hyperprior rate on the condition-shape rate.
    pub condition_shape_beta_b: f64,

    /// Gamma prior shape on condition splice sigmas.
    pub condition_splice_alpha: f64,

    /// Gamma hyperprior shape on the condition-splice rate.
    pub condition_splice_beta_a: f64,

    /// Gamma hyperprior rate on the condition-splice rate.
    pub condition_splice_beta_b: f64,

    /// Prior mean for the experiment-level mean draws.
    pub experiment_mean0: f64,

    /// Prior shape for the experiment-level mean draws.
    pub experiment_shape0: f64,

    /// Prior location for the experiment splice means.
    pub experiment_splice_mu0: f64,

    /// Prior scale for the experiment splice means.
    pub experiment_splice_sigma0: f64,

    /// Degrees of freedom of the Student-t terms in the splice hierarchy.
    pub experiment_splice_nu: f64,

    /// Number of top abundances considered by scaling normalization.
    pub sample_scaling_truncation: usize,

    /// Quantile within the truncated tail used as the per-sample scale.
    pub sample_scaling_quantile: f64,

    /// Floor on condition splice sigmas outside burn-in.
    pub analyze_min_splice_sigma: f64,

    /// Newton iterations allowed in slice-edge finding before bisection
    /// takes over.
    pub max_newton_steps: usize,

    /// Floor for logarithm arguments and initial mean values.
    pub zero_eps: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            burnin: 100,
            num_samples: 250,
            num_opt_rounds: 10,
            num_threads: 0,
            rng_seed: DEFAULT_SEED,
            nopriors: false,
            dryrun: false,
            show_progress: false,
            experiment_shape: 2.0,
            experiment_shape_alpha: 1.0,
            experiment_shape_beta: 1.0,
            experiment_splice_sigma_alpha: 1.0,
            experiment_splice_sigma_beta: 1.0,
            condition_shape_alpha: 1.0,
            condition_shape_beta_a: 1.0,
            condition_shape_beta_b: 1.0,
            condition_splice_alpha: 1.0,
            condition_splice_beta_a: 1.0,
            condition_splice_beta_b: 1.0,
            experiment_mean0: 0.01,
            experiment_shape0: 1.0,
            experiment_splice_mu0: 0.5,
            experiment_splice_sigma0: 0.5,
            experiment_splice_nu: 4.0,
            sample_scaling_truncation: 10_000,
            sample_scaling_quantile: 0.9,
            analyze_min_splice_sigma: 0.01,
            max_newton_steps: MAX_NEWTON_STEPS,
            zero_eps: ZERO_EPS,
        }
    }
}

impl Config {
    /// Check the configuration for values the sampler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_samples == 0 {
            return Err(Error::InvalidConfig("num_samples must be at least 1".into()));
        }
        if !(0.0 < self.sample_scaling_quantile && self.sample_scaling_quantile <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "sample_scaling_quantile must be in (0, 1], got {}",
                self.sample_scaling_quantile
            )));
        }
        if self.sample_scaling_truncation == 0 {
            return Err(Error::InvalidConfig(
                "sample_scaling_truncation must be at least 1".into(),
            ));
        }
        if self.zero_eps <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "zero_eps must be positive, got {}",
                self.zero_eps
            )));
        }
        if self.analyze_min_splice_sigma < 0.0 {
            return Err(Error::InvalidConfig(
                "analyze_min_splice_sigma must be non-negative".into(),
            ));
        }
        if self.experiment_splice_nu <= 0.0 {
            return Err(Error::InvalidConfig(
                "experiment_splice_nu must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Worker pool width per kind, resolving `0` to the machine parallelism.
    pub fn resolve_num_threads(&self) -> usize {
        if self.num_threads > 0 {
            self.num_threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_samples() {
        let config = Config {
            num_samples: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_quantile() {
        let config = Config {
            sample_scaling_quantile: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolves_explicit_thread_count() {
        let config = Config {
            num_threads: 3,
            ..Config::default()
        };
        assert_eq!(config.resolve_num_threads(), 3);
        assert!(Config::default().resolve_num_threads() >= 1);
    }
}
