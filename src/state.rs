//! The coordinator-owned parameter block.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::config::Config;
use crate::design::Design;
use crate::shared::{ScalarCell, SharedMatrix, SharedVec};

/// All mutable sampler state.
///
/// Allocated at `run()` entry once K and C are known, mutated every tick,
/// and dropped at shutdown. Workers receive an `Arc` of this block and write
/// only the index ranges they pop; the scalar hyperparameters are updated
/// only by the coordinator thread between fan-outs.
pub struct ParamState {
    /// Abundance matrix, K x N. Row k holds the current abundances of
    /// sample k.
    pub q: SharedMatrix,
    /// Per-sample scaling factors; `scale[0] == 1` after normalization.
    pub scale: SharedVec<f32>,
    /// Condition means, C x N.
    pub condition_mean: SharedMatrix,
    /// Per-transcript condition shapes.
    pub condition_shape: SharedVec<f32>,
    /// Per-transcript experiment means.
    pub experiment_mean: SharedVec<f32>,
    /// Experiment-level shape (held at its configured value).
    pub experiment_shape: ScalarCell,
    /// Rate of the gamma prior on condition shapes.
    pub condition_shape_beta: ScalarCell,
    /// Rate of the gamma prior on condition splice sigmas.
    pub condition_splice_beta: ScalarCell,
    /// Scale of the Student-t tie between condition and experiment splice
    /// means.
    pub experiment_splice_sigma: ScalarCell,
    /// Condition splice means, flat over `(condition, spliced tgroup,
    /// member)`.
    pub condition_splice_mu: SharedVec<f32>,
    /// Condition splice sigmas, flat over `(spliced tgroup, member)`.
    pub condition_splice_sigma: SharedVec<f32>,
    /// Condition splice rescaling factors; one at every tick boundary.
    pub condition_splice_eta: SharedVec<f32>,
    /// Experiment splice means, flat over `(spliced tgroup, member)`.
    pub experiment_splice_mu: SharedVec<f32>,
    /// One RNG per transcript, seeded `rng_seed + J + n`.
    pub transcript_rngs: SharedVec<Xoshiro256PlusPlus>,
    /// One RNG per spliced tgroup, seeded `rng_seed + j`.
    pub splice_rngs: SharedVec<Xoshiro256PlusPlus>,

    splice_total: usize,
}

impl ParamState {
    /// Allocate and set the initial flat values.
    pub fn new(design: &Design, config: &Config) -> Self {
        let k = design.num_samples();
        let c = design.num_conditions();
        let n = design.num_transcripts();
        let j = design.num_spliced();
        let total = design.splice_total();
        let zero_eps = config.zero_eps as f32;

        let splice_rngs: Vec<Xoshiro256PlusPlus> = (0..j as u64)
            .map(|i| Xoshiro256PlusPlus::seed_from_u64(config.rng_seed + i))
            .collect();
        let transcript_rngs: Vec<Xoshiro256PlusPlus> = (0..n as u64)
            .map(|i| Xoshiro256PlusPlus::seed_from_u64(config.rng_seed + j as u64 + i))
            .collect();

        Self {
            q: SharedMatrix::zeros(k, n),
            scale: SharedVec::new(vec![1.0; k]),
            condition_mean: SharedMatrix::filled(c, n, zero_eps),
            condition_shape: SharedVec::new(vec![1.0; n]),
            experiment_mean: SharedVec::new(vec![zero_eps; n]),
            experiment_shape: ScalarCell::new(2.0),
            condition_shape_beta: ScalarCell::new(1.0),
            condition_splice_beta: ScalarCell::new(1.0),
            experiment_splice_sigma: ScalarCell::new(0.5),
            condition_splice_mu: SharedVec::new(vec![0.5; c * total]),
            condition_splice_sigma: SharedVec::new(vec![0.1; total]),
            condition_splice_eta: SharedVec::new(vec![1.0; total]),
            experiment_splice_mu: SharedVec::new(vec![0.5; total]),
            transcript_rngs: SharedVec::new(transcript_rngs),
            splice_rngs: SharedVec::new(splice_rngs),
            splice_total: total,
        }
    }

    /// Index of `(condition c, flat splice index)` into
    /// [`ParamState::condition_splice_mu`].
    #[inline]
    pub fn csplice_idx(&self, c: usize, flat: usize) -> usize {
        c * self.splice_total + flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_values_are_flat() {
        let design = Design::new(vec![0, 1], vec![vec![0], vec![1, 2]]).unwrap();
        let config = Config::default();
        let state = ParamState::new(&design, &config);

        unsafe {
            assert_eq!(state.scale.get(0), 1.0);
            assert_eq!(state.condition_shape.get(2), 1.0);
            assert_eq!(state.condition_splice_eta.get(1), 1.0);
            assert_eq!(state.condition_splice_sigma.get(0), 0.1);
            assert_eq!(state.condition_splice_mu.get(state.csplice_idx(1, 1)), 0.5);
            assert!(state.experiment_mean.get(0) > 0.0);
        }
        assert_eq!(state.experiment_shape.get(), 2.0);
        assert_eq!(state.experiment_splice_sigma.get(), 0.5);
        assert_eq!(state.transcript_rngs.len(), 3);
        assert_eq!(state.splice_rngs.len(), 1);
    }
}
