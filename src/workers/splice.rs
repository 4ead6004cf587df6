//! Splice parameter workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use ndarray::Array2;

use crate::config::Config;
use crate::design::Design;
use crate::queue::{Queue, Task};
use crate::samplers::{
    ConditionSpliceEtaSampler, GammaNormalSigmaSampler, NormalTMuSampler, StudentTMuSampler,
};
use crate::state::ParamState;

/// Per spliced tgroup: builds the within-group proportion matrix from Q,
/// then for every member draws the rescaling factor eta, the per-condition
/// splice means, and the splice sigma.
///
/// The eta draw rescales mean and sigma together and is reset to one
/// afterwards; marginalizing the scale at each sweep keeps the mean and
/// sigma chains from sticking. Sigmas are pinned at one during burn-in and
/// floored at the configured minimum afterwards.
pub struct ConditionSpliceWorker {
    /// Shared parameter block.
    pub state: Arc<ParamState>,
    /// Experiment design tables.
    pub design: Arc<Design>,
    /// Run configuration (prior constants, tuning).
    pub config: Arc<Config>,
    /// Incoming spliced-tgroup index ranges.
    pub tasks: Arc<Queue<Task>>,
    /// One notification per processed range.
    pub notify: Arc<Queue<()>>,
    /// Burn-in flag, flipped by the coordinator between ticks.
    pub burnin: Arc<AtomicBool>,
}

impl ConditionSpliceWorker {
    /// Start the worker thread.
    pub fn spawn(self) -> JoinHandle<()> {
        std::thread::spawn(move || self.run())
    }

    fn run(self) {
        let num_samples = self.design.num_samples();
        let num_conditions = self.design.num_conditions();
        let max_members = self.design.max_splice_members();

        let mut mu_sampler = NormalTMuSampler::new(-1.0, 2.0);
        mu_sampler.tune(self.config.max_newton_steps, self.config.zero_eps);
        let mut sigma_sampler = GammaNormalSigmaSampler::new();
        sigma_sampler.tune(self.config.max_newton_steps, self.config.zero_eps);
        let mut eta_sampler = ConditionSpliceEtaSampler::new();
        eta_sampler.tune(self.config.max_newton_steps, self.config.zero_eps);

        // Per-tgroup proportion matrix and gather buffers.
        let mut proportions = Array2::<f32>::zeros((num_samples, max_members.max(1)));
        let mut column = vec![0.0f32; num_samples];
        let mut data = vec![0.0f32; num_samples];
        let mut unadj_mu = vec![0.0f32; num_conditions];
        let mut sample_mu = vec![0.0f32; num_conditions];

        loop {
            let (first, last) = match self.tasks.pop() {
                Task::Shutdown => break,
                Task::Range(first, last) => (first, last),
            };

            for j in first..last {
                // SAFETY: spliced tgroup j belongs to exactly one popped
                // range per fan-out; its RNG and its slices of the splice
                // buffers are this worker's alone until the barrier. Q and
                // the experiment splice parameters are read-only here.
                let rng = unsafe { self.state.splice_rngs.get_mut(j) };
                let members = self.design.splice_members(j);
                let offset = self.design.splice_offset(j);

                for i in 0..num_samples {
                    let mut datasum = 0.0f32;
                    for (k, &tid) in members.iter().enumerate() {
                        let x = unsafe { self.state.q.get(i, tid) };
                        proportions[[i, k]] = x;
                        datasum += x;
                    }
                    for k in 0..members.len() {
                        proportions[[i, k]] /= datasum;
                    }
                }

                for k in 0..members.len() {
                    let flat = offset + k;
                    self.resample_eta(
                        rng,
                        &proportions,
                        k,
                        flat,
                        &mut column,
                        &mut unadj_mu,
                        &mut sample_mu,
                        &eta_sampler,
                    );
                }

                for c in 0..num_conditions {
                    let samples = self.design.condition_samples(c);
                    for k in 0..members.len() {
                        let flat = offset + k;
                        for (l, &s) in samples.iter().enumerate() {
                            data[l] = proportions[[s, k]];
                        }
                        let mu0 = unsafe {
                            self.state
                                .condition_splice_mu
                                .get(self.state.csplice_idx(c, flat))
                        };
                        let sigma = unsafe { self.state.condition_splice_sigma.get(flat) };
                        let mu = mu_sampler.sample(
                            rng,
                            f64::from(mu0),
                            f64::from(sigma),
                            &data[..samples.len()],
                            self.config.experiment_splice_nu,
                            f64::from(unsafe { self.state.experiment_splice_mu.get(flat) }),
                            self.state.experiment_splice_sigma.get(),
                        );
                        unsafe {
                            self.state
                                .condition_splice_mu
                                .set(self.state.csplice_idx(c, flat), mu as f32)
                        };
                    }
                }

                for k in 0..members.len() {
                    let flat = offset + k;
                    if self.burnin.load(Ordering::Relaxed) {
                        unsafe { self.state.condition_splice_sigma.set(flat, 1.0) };
                        continue;
                    }

                    for s in 0..num_samples {
                        let mu = unsafe {
                            self.state
                                .condition_splice_mu
                                .get(self.state.csplice_idx(self.design.condition(s), flat))
                        };
                        data[s] = proportions[[s, k]] - mu;
                    }
                    let sigma0 = unsafe { self.state.condition_splice_sigma.get(flat) };
                    let sigma = sigma_sampler.sample(
                        rng,
                        f64::from(sigma0),
                        &data[..num_samples],
                        self.config.condition_splice_alpha,
                        self.state.condition_splice_beta.get(),
                    );
                    let sigma = sigma.max(self.config.analyze_min_splice_sigma);
                    unsafe { self.state.condition_splice_sigma.set(flat, sigma as f32) };
                }
            }

            self.notify.push(());
        }
    }

    /// Draw eta for one tgroup member, rescale its mean and sigma, and reset
    /// eta to one.
    #[allow(clippy::too_many_arguments)]
    fn resample_eta(
        &self,
        rng: &mut rand_xoshiro::Xoshiro256PlusPlus,
        proportions: &Array2<f32>,
        k: usize,
        flat: usize,
        column: &mut [f32],
        unadj_mu: &mut [f32],
        sample_mu: &mut [f32],
        eta_sampler: &ConditionSpliceEtaSampler,
    ) {
        let num_conditions = self.design.num_conditions();

        // SAFETY: same ownership argument as in `run`; this is called from
        // the range loop that owns tgroup j.
        let eta0 = f64::from(unsafe { self.state.condition_splice_eta.get(flat) });
        let unadj_sigma =
            f64::from(unsafe { self.state.condition_splice_sigma.get(flat) }) / eta0.abs();

        for c in 0..num_conditions {
            let samples = self.design.condition_samples(c);
            let mut mean = 0.0f32;
            for &s in samples {
                mean += proportions[[s, k]];
            }
            mean /= samples.len() as f32;
            sample_mu[c] = mean;

            let mu = unsafe {
                self.state
                    .condition_splice_mu
                    .get(self.state.csplice_idx(c, flat))
            };
            unadj_mu[c] = (mu - mean) / eta0 as f32;
        }

        for (s, col) in column.iter_mut().enumerate() {
            *col = proportions[[s, k]];
        }

        let eta = eta_sampler.sample(
            rng,
            eta0,
            unadj_mu,
            unadj_sigma,
            column,
            sample_mu,
            self.design.all_condition_samples(),
            self.config.experiment_splice_nu,
            f64::from(unsafe { self.state.experiment_splice_mu.get(flat) }),
            self.config.condition_splice_alpha,
            self.state.condition_splice_beta.get(),
        );

        unsafe {
            self.state
                .condition_splice_sigma
                .set(flat, (unadj_sigma * eta.abs()) as f32);
            for c in 0..num_conditions {
                self.state.condition_splice_mu.set(
                    self.state.csplice_idx(c, flat),
                    (f64::from(unadj_mu[c]) * eta + f64::from(sample_mu[c])) as f32,
                );
            }
            // Reset after each draw to keep later rescalings away from very
            // large or small factors.
            self.state.condition_splice_eta.set(flat, 1.0);
        }
    }
}

/// Per spliced tgroup: draws the experiment-level splice mean of every
/// member from the per-condition means via the Student-t location
/// conditional.
pub struct ExperimentSpliceWorker {
    /// Shared parameter block.
    pub state: Arc<ParamState>,
    /// Experiment design tables.
    pub design: Arc<Design>,
    /// Run configuration (prior constants, tuning).
    pub config: Arc<Config>,
    /// Incoming spliced-tgroup index ranges.
    pub tasks: Arc<Queue<Task>>,
    /// One notification per processed range.
    pub notify: Arc<Queue<()>>,
}

impl ExperimentSpliceWorker {
    /// Start the worker thread.
    pub fn spawn(self) -> JoinHandle<()> {
        std::thread::spawn(move || self.run())
    }

    fn run(self) {
        let num_conditions = self.design.num_conditions();

        let mut mu_sampler = StudentTMuSampler::new(-1.0, 2.0);
        mu_sampler.tune(self.config.max_newton_steps, self.config.zero_eps);

        let mut data = vec![0.0f32; num_conditions];

        loop {
            let (first, last) = match self.tasks.pop() {
                Task::Shutdown => break,
                Task::Range(first, last) => (first, last),
            };

            for j in first..last {
                // SAFETY: spliced tgroup j belongs to exactly one popped
                // range per fan-out; its RNG and experiment_splice_mu slice
                // are this worker's alone. condition_splice_mu is read-only
                // in this phase.
                let rng = unsafe { self.state.splice_rngs.get_mut(j) };
                let members = self.design.splice_members(j);
                let offset = self.design.splice_offset(j);

                for k in 0..members.len() {
                    let flat = offset + k;
                    for c in 0..num_conditions {
                        data[c] = unsafe {
                            self.state
                                .condition_splice_mu
                                .get(self.state.csplice_idx(c, flat))
                        };
                    }

                    let mu0 = unsafe { self.state.experiment_splice_mu.get(flat) };
                    let mu = mu_sampler.sample(
                        rng,
                        f64::from(mu0),
                        self.config.experiment_splice_nu,
                        self.state.experiment_splice_sigma.get(),
                        &data,
                        self.config.experiment_splice_mu0,
                        self.config.experiment_splice_sigma0,
                    );
                    unsafe { self.state.experiment_splice_mu.set(flat, mu as f32) };
                }
            }

            self.notify.push(());
        }
    }
}
