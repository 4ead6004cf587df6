//! Experiment-level mean worker.

use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::Config;
use crate::design::Design;
use crate::error::assert_finite;
use crate::math::fastln;
use crate::queue::{Queue, Task};
use crate::samplers::GammaMeanSampler;
use crate::state::ParamState;

/// Per transcript: draws `experiment_mean[n]` from the condition means via
/// the gamma-mean conditional under the configured experiment prior.
pub struct ExperimentMeanWorker {
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
}

impl ExperimentMeanWorker {
    /// Start the worker thread.
    pub fn spawn(self) -> JoinHandle<()> {
        std::thread::spawn(move || self.run())
    }

    fn run(self) {
        let num_conditions = self.design.num_conditions();

        let mut mu_sampler = GammaMeanSampler::new(1e-12, 1.0);
        mu_sampler.tune(self.config.max_newton_steps, self.config.zero_eps);

        let mut xs = vec![0.0f32; num_conditions];
        let mut log_xs = vec![0.0f32; num_conditions];

        loop {
            let (first, last) = match self.tasks.pop() {
                Task::Shutdown => break,
                Task::Range(first, last) => (first, last),
            };

            for tid in first..last {
                // SAFETY: transcript tid belongs to exactly one popped range
                // per fan-out; its RNG and experiment_mean entry are this
                // worker's alone. condition_mean is read-only in this phase.
                let rng = unsafe { self.state.transcript_rngs.get_mut(tid) };

                for c in 0..num_conditions {
                    let x = unsafe { self.state.condition_mean.get(c, tid) };
                    xs[c] = x;
                    log_xs[c] = fastln(f64::from(x)) as f32;
                }

                let mean0 = unsafe { self.state.experiment_mean.get(tid) };
                let mean = mu_sampler.sample(
                    rng,
                    f64::from(mean0),
                    self.state.experiment_shape.get(),
                    &xs,
                    &log_xs,
                    self.config.experiment_mean0,
                    self.config.experiment_shape0,
                );
                assert_finite(mean);
                unsafe { self.state.experiment_mean.set(tid, mean as f32) };
            }

            self.notify.push(());
        }
    }
}
