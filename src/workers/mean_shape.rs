//! Condition-level mean and shape worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::Config;
use crate::design::Design;
use crate::error::assert_finite;
use crate::math::fastln;
use crate::queue::{Queue, Task};
use crate::samplers::{GammaMeanSampler, GammaShapeSampler};
use crate::state::ParamState;

/// Per transcript: draws `condition_mean[c, n]` for every condition via the
/// gamma-mean conditional with the experiment level as prior, then the
/// per-transcript shape via the gamma-shape conditional.
///
/// During burn-in the shape is pinned at one; a transcript initialized in a
/// very low probability state is otherwise slow to move anywhere reasonable.
pub struct ConditionMeanShapeWorker {
    /// Shared parameter block.
    pub state: Arc<ParamState>,
    /// Experiment design tables.
    pub design: Arc<Design>,
    /// Run configuration (prior constants, tuning).
    pub config: Arc<Config>,
    /// Incoming transcript index ranges.
    pub tasks: Arc<Queue<Task>>,
    /// One notification per processed range.
    pub notify: Arc<Queue<()>>,
    /// Burn-in flag, flipped by the coordinator between ticks.
    pub burnin: Arc<AtomicBool>,
}

impl ConditionMeanShapeWorker {
    /// Start the worker thread.
    pub fn spawn(self) -> JoinHandle<()> {
        std::thread::spawn(move || self.run())
    }

    fn run(self) {
        let num_samples = self.design.num_samples();
        let num_conditions = self.design.num_conditions();

        let mut mu_sampler = GammaMeanSampler::new(1e-12, 1.0);
        mu_sampler.tune(self.config.max_newton_steps, self.config.zero_eps);
        let mut shape_sampler = GammaShapeSampler::new(0.1, 5.0);
        shape_sampler.tune(self.config.max_newton_steps, self.config.zero_eps);

        let mut xs = vec![0.0f32; num_samples];
        let mut log_xs = vec![0.0f32; num_samples];
        let mut xs_mu = vec![0.0f32; num_samples];

        loop {
            let (first, last) = match self.tasks.pop() {
                Task::Shutdown => break,
                Task::Range(first, last) => (first, last),
            };

            for tid in first..last {
                // SAFETY: transcript tid belongs to exactly one popped range
                // per fan-out; its RNG, condition_mean column, and
                // condition_shape entry are this worker's alone until the
                // barrier. Q and experiment_mean are read-only in this phase.
                let rng = unsafe { self.state.transcript_rngs.get_mut(tid) };

                let experiment_mean = unsafe { self.state.experiment_mean.get(tid) };
                let experiment_shape = self.state.experiment_shape.get();

                for c in 0..num_conditions {
                    let samples = self.design.condition_samples(c);
                    for (l, &s) in samples.iter().enumerate() {
                        let x = unsafe { self.state.q.get(s, tid) };
                        xs[l] = x;
                        log_xs[l] = fastln(f64::from(x)) as f32;
                    }
                    let n = samples.len();

                    let mean0 = unsafe { self.state.condition_mean.get(c, tid) };
                    let shape = unsafe { self.state.condition_shape.get(tid) };
                    let mean = mu_sampler.sample(
                        rng,
                        f64::from(mean0),
                        f64::from(shape),
                        &xs[..n],
                        &log_xs[..n],
                        f64::from(experiment_mean),
                        experiment_shape,
                    );
                    assert_finite(mean);
                    unsafe { self.state.condition_mean.set(c, tid, mean as f32) };
                }

                for s in 0..num_samples {
                    xs_mu[s] =
                        unsafe { self.state.condition_mean.get(self.design.condition(s), tid) };
                    xs[s] = unsafe { self.state.q.get(s, tid) };
                }

                if self.burnin.load(Ordering::Relaxed) {
                    unsafe { self.state.condition_shape.set(tid, 1.0) };
                } else {
                    let shape0 = unsafe { self.state.condition_shape.get(tid) };
                    let shape = shape_sampler.sample(
                        rng,
                        &xs_mu,
                        f64::from(shape0),
                        &xs,
                        self.config.condition_shape_alpha,
                        self.state.condition_shape_beta.get(),
                    );
                    assert_finite(shape);
                    unsafe { self.state.condition_shape.set(tid, shape as f32) };
                }
            }

            self.notify.push(());
        }
    }
}
