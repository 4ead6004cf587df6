//! The Gibbs coordinator.
//!
//! Owns all sampler state and sequences each tick: hyperparameters are
//! pushed into the per-sample quantifiers, K quantification ticks fan out,
//! process-global scalars are drawn on the coordinator thread while the pool
//! runs, then condition-level and experiment-level fan-outs follow behind
//! counting barriers. A run is optimize rounds, burn-in, an end-burn-in flag
//! flip, then sampling rounds that each write one output row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use indicatif::ProgressBar;
use log::{debug, info};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::Config;
use crate::constants::WORK_BLOCK_SIZE;
use crate::design::{Design, TranscriptInfo};
use crate::error::{assert_finite, Error, Result};
use crate::output::{OutputStore, OutputWriter};
use crate::quantifier::Quantifier;
use crate::queue::{Queue, Task};
use crate::samplers::{GammaBetaSampler, GammaNormalSigmaSampler};
use crate::state::ParamState;
use crate::workers::{
    ConditionMeanShapeWorker, ConditionSpliceWorker, ExperimentMeanWorker, ExperimentSpliceWorker,
    QuantWorker,
};

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    /// Total fragments across all samples.
    pub total_frags: u64,
    /// Gibbs ticks executed (all phases).
    pub ticks: usize,
    /// Output rows written.
    pub samples_written: usize,
}

/// The hierarchical Gibbs sampler.
pub struct Analyze<Q: Quantifier> {
    config: Arc<Config>,
    design: Arc<Design>,
    info: TranscriptInfo,
    quantifiers: Arc<Vec<Mutex<Q>>>,
    rng: Xoshiro256PlusPlus,

    gamma_beta_sampler: GammaBetaSampler,
    gamma_normal_sigma_sampler: GammaNormalSigmaSampler,

    // Reused per-tick scratch.
    scale_work: Vec<f32>,
    splice_sigma_work: Vec<f32>,
    splice_resid_work: Vec<f32>,
}

impl<Q: Quantifier + 'static> Analyze<Q> {
    /// Validate inputs and assemble a coordinator.
    ///
    /// `quantifiers` must hold one handle per sample, in sample order.
    pub fn new(
        config: Config,
        design: Design,
        info: TranscriptInfo,
        quantifiers: Vec<Q>,
    ) -> Result<Self> {
        config.validate()?;
        info.validate(design.num_transcripts())?;
        if quantifiers.len() != design.num_samples() {
            return Err(Error::InvalidDesign(format!(
                "{} quantifiers for {} samples",
                quantifiers.len(),
                design.num_samples()
            )));
        }

        debug!("number of transcription groups: {}", design.num_tgroups());
        debug!(
            "number of tgroups with multiple isoforms: {}",
            design.num_spliced()
        );

        let mut gamma_beta_sampler = GammaBetaSampler::new();
        gamma_beta_sampler.tune(config.max_newton_steps, config.zero_eps);
        let mut gamma_normal_sigma_sampler = GammaNormalSigmaSampler::new();
        gamma_normal_sigma_sampler.tune(config.max_newton_steps, config.zero_eps);

        // Seeded past the per-tgroup and per-transcript pools so the
        // coordinator's scalar draws never share a stream with a worker.
        let pool_size = (design.num_spliced() + design.num_transcripts()) as u64;
        let rng = Xoshiro256PlusPlus::seed_from_u64(config.rng_seed.wrapping_add(pool_size));
        let scale_work = vec![0.0; design.num_transcripts()];
        let splice_sigma_work = vec![0.0; design.splice_total()];
        let splice_resid_work = vec![0.0; design.num_conditions() * design.splice_total()];

        Ok(Self {
            config: Arc::new(config),
            design: Arc::new(design),
            info,
            quantifiers: Arc::new(quantifiers.into_iter().map(Mutex::new).collect()),
            rng,
            gamma_beta_sampler,
            gamma_normal_sigma_sampler,
            scale_work,
            splice_sigma_work,
            splice_resid_work,
        })
    }

    /// Run the full state machine and stream output rows into `store`.
    pub fn run(&mut self, store: &mut dyn OutputStore) -> Result<RunStats> {
        let state = Arc::new(ParamState::new(&self.design, &self.config));

        if self.config.dryrun {
            return Ok(RunStats {
                total_frags: 0,
                ticks: 0,
                samples_written: 0,
            });
        }

        self.quantifiers
            .par_iter()
            .try_for_each(|q| q.lock().unwrap().start())?;

        let total_frags: u64 = self
            .quantifiers
            .iter()
            .map(|q| q.lock().unwrap().num_frags())
            .sum();
        info!(
            "estimating expression of {} transcripts in {} samples with {} fragments",
            self.design.num_transcripts(),
            self.design.num_samples(),
            total_frags
        );

        let writer = OutputWriter::setup(store, &self.design, &self.info, self.config.num_samples)?;

        let pool = self.spawn_pool(&state);
        let phases = self.run_phases(store, &writer, &state, &pool);
        pool.shutdown();

        let mut stop_result = Ok(());
        for q in self.quantifiers.iter() {
            if let Err(err) = q.lock().unwrap().stop() {
                if stop_result.is_ok() {
                    stop_result = Err(err);
                }
            }
        }

        let ticks = phases?;
        stop_result?;

        Ok(RunStats {
            total_frags,
            ticks,
            samples_written: self.config.num_samples,
        })
    }

    fn run_phases(
        &mut self,
        store: &mut dyn OutputStore,
        writer: &OutputWriter,
        state: &Arc<ParamState>,
        pool: &Pool,
    ) -> Result<usize> {
        let num_opt_rounds = self.config.num_opt_rounds;
        let burnin = self.config.burnin;
        let num_samples = self.config.num_samples;

        let progress = if self.config.show_progress {
            ProgressBar::new((num_opt_rounds + burnin + num_samples - 1) as u64)
        } else {
            ProgressBar::hidden()
        };

        let mut ticks = 0;

        for _ in 0..num_opt_rounds {
            self.tick(state, pool, true)?;
            ticks += 1;
            progress.inc(1);
        }

        if !self.config.nopriors {
            for q in self.quantifiers.iter() {
                q.lock().unwrap().engage_priors()?;
            }
        }

        // The maximum-posterior state goes out as sample 0.
        writer.write_row(store, 0, state, &self.design)?;

        for _ in 0..burnin {
            self.tick(state, pool, false)?;
            ticks += 1;
            progress.inc(1);
        }

        pool.burnin.store(false, Ordering::Relaxed);

        for row in 1..num_samples {
            self.tick(state, pool, false)?;
            ticks += 1;
            writer.write_row(store, row, state, &self.design)?;
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(ticks)
    }

    /// One Gibbs sweep.
    fn tick(&mut self, state: &Arc<ParamState>, pool: &Pool, optimize: bool) -> Result<()> {
        let num_samples = self.design.num_samples();
        let num_transcripts = self.design.num_transcripts();
        let num_spliced = self.design.num_spliced();

        self.update_quantifier_hyperparams(state);

        pool.optimize_mode.store(optimize, Ordering::Relaxed);
        for k in 0..num_samples {
            pool.quant_tasks.push(Task::Range(k, k + 1));
        }

        // The process-global scalars can't fan out, so they are drawn here
        // while the quantification workers run; none of them touches Q.
        self.draw_global_scalars(state);

        let mut quant_failure = None;
        for _ in 0..num_samples {
            if let Err(err) = pool.quant_notify.pop() {
                quant_failure.get_or_insert(err);
            }
        }
        if let Some(err) = quant_failure {
            return Err(err);
        }

        compute_scaling(
            state,
            self.config.sample_scaling_truncation,
            self.config.sample_scaling_quantile,
            &mut self.scale_work,
        );

        let cond_ranges = push_ranges(&pool.cond_tasks, num_transcripts);
        let csplice_ranges = push_ranges(&pool.csplice_tasks, num_spliced);
        for _ in 0..cond_ranges {
            pool.cond_notify.pop();
        }
        for _ in 0..csplice_ranges {
            pool.csplice_notify.pop();
        }

        let exp_ranges = push_ranges(&pool.exp_tasks, num_transcripts);
        let esplice_ranges = push_ranges(&pool.esplice_tasks, num_spliced);
        for _ in 0..exp_ranges {
            pool.exp_notify.pop();
        }
        for _ in 0..esplice_ranges {
            pool.esplice_notify.pop();
        }

        Ok(())
    }

    /// Draw the scalar hyperparameters owned by the coordinator thread.
    fn draw_global_scalars(&mut self, state: &ParamState) {
        let num_conditions = self.design.num_conditions();
        let total = self.design.splice_total();

        // SAFETY: the quantification fan-out only writes Q; every array read
        // here is quiescent until the next barrier.
        let condition_shape = unsafe { state.condition_shape.to_vec() };

        let condition_shape_beta = self.gamma_beta_sampler.sample(
            &mut self.rng,
            state.condition_shape_beta.get(),
            self.config.condition_shape_alpha,
            self.config.condition_shape_beta_a,
            self.config.condition_shape_beta_b,
            &condition_shape,
        );
        assert_finite(condition_shape_beta);
        state.condition_shape_beta.set(condition_shape_beta);

        for flat in 0..total {
            self.splice_sigma_work[flat] = unsafe { state.condition_splice_sigma.get(flat) };
        }
        let condition_splice_beta = self.gamma_beta_sampler.sample(
            &mut self.rng,
            state.condition_splice_beta.get(),
            self.config.condition_splice_alpha,
            self.config.condition_splice_beta_a,
            self.config.condition_splice_beta_b,
            &self.splice_sigma_work,
        );
        assert_finite(condition_splice_beta);
        state.condition_splice_beta.set(condition_splice_beta);

        let mut i = 0;
        for c in 0..num_conditions {
            for flat in 0..total {
                let mu = unsafe { state.condition_splice_mu.get(state.csplice_idx(c, flat)) };
                let experiment_mu = unsafe { state.experiment_splice_mu.get(flat) };
                self.splice_resid_work[i] = mu - experiment_mu;
                i += 1;
            }
        }
        let experiment_splice_sigma = self.gamma_normal_sigma_sampler.sample(
            &mut self.rng,
            state.experiment_splice_sigma.get(),
            &self.splice_resid_work,
            self.config.experiment_splice_sigma_alpha,
            self.config.experiment_splice_sigma_beta,
        );
        assert_finite(experiment_splice_sigma);
        state.experiment_splice_sigma.set(experiment_splice_sigma);

        state.experiment_shape.set(self.config.experiment_shape);
    }

    /// Copy the current hyperparameters into every quantifier's block.
    ///
    /// Runs between ticks, on the coordinator thread; the blocks are
    /// read-only while the quantifiers tick.
    fn update_quantifier_hyperparams(&self, state: &ParamState) {
        let num_transcripts = self.design.num_transcripts();

        for (k, quantifier) in self.quantifiers.iter().enumerate() {
            let mut quantifier = quantifier.lock().unwrap();
            let condition = self.design.condition(k);
            let hp = quantifier.hyperparams_mut();

            // SAFETY: coordinator-only phase; no fan-out is in flight.
            unsafe {
                hp.scale = f64::from(state.scale.get(k));
                for tid in 0..num_transcripts {
                    hp.mean[tid] = state.condition_mean.get(condition, tid);
                    hp.shape[tid] = state.condition_shape.get(tid);
                }

                hp.splice_mu.fill(0.0);
                hp.splice_sigma.fill(0.1);
                for j in 0..self.design.num_spliced() {
                    let offset = self.design.splice_offset(j);
                    for (member, &tid) in self.design.splice_members(j).iter().enumerate() {
                        let flat = offset + member;
                        hp.splice_mu[tid] =
                            state.condition_splice_mu.get(state.csplice_idx(condition, flat));
                        hp.splice_sigma[tid] = state.condition_splice_sigma.get(flat);
                    }
                }
            }
        }
    }

    fn spawn_pool(&self, state: &Arc<ParamState>) -> Pool {
        let num_threads = self.config.resolve_num_threads();
        let pool = Pool::new(num_threads);

        for _ in 0..num_threads {
            pool.register(
                QuantWorker {
                    quantifiers: Arc::clone(&self.quantifiers),
                    state: Arc::clone(state),
                    tasks: Arc::clone(&pool.quant_tasks),
                    notify: Arc::clone(&pool.quant_notify),
                    optimize_mode: Arc::clone(&pool.optimize_mode),
                }
                .spawn(),
            );
            pool.register(
                ConditionMeanShapeWorker {
                    state: Arc::clone(state),
                    design: Arc::clone(&self.design),
                    config: Arc::clone(&self.config),
                    tasks: Arc::clone(&pool.cond_tasks),
                    notify: Arc::clone(&pool.cond_notify),
                    burnin: Arc::clone(&pool.burnin),
                }
                .spawn(),
            );
            pool.register(
                ExperimentMeanWorker {
                    state: Arc::clone(state),
                    design: Arc::clone(&self.design),
                    config: Arc::clone(&self.config),
                    tasks: Arc::clone(&pool.exp_tasks),
                    notify: Arc::clone(&pool.exp_notify),
                }
                .spawn(),
            );
            pool.register(
                ConditionSpliceWorker {
                    state: Arc::clone(state),
                    design: Arc::clone(&self.design),
                    config: Arc::clone(&self.config),
                    tasks: Arc::clone(&pool.csplice_tasks),
                    notify: Arc::clone(&pool.csplice_notify),
                    burnin: Arc::clone(&pool.burnin),
                }
                .spawn(),
            );
            pool.register(
                ExperimentSpliceWorker {
                    state: Arc::clone(state),
                    design: Arc::clone(&self.design),
                    config: Arc::clone(&self.config),
                    tasks: Arc::clone(&pool.esplice_tasks),
                    notify: Arc::clone(&pool.esplice_notify),
                }
                .spawn(),
            );
        }

        pool
    }
}

/// Queues, flags, and join handles of the five worker pools.
struct Pool {
    num_threads: usize,

    quant_tasks: Arc<Queue<Task>>,
    quant_notify: Arc<Queue<Result<()>>>,
    cond_tasks: Arc<Queue<Task>>,
    cond_notify: Arc<Queue<()>>,
    exp_tasks: Arc<Queue<Task>>,
    exp_notify: Arc<Queue<()>>,
    csplice_tasks: Arc<Queue<Task>>,
    csplice_notify: Arc<Queue<()>>,
    esplice_tasks: Arc<Queue<Task>>,
    esplice_notify: Arc<Queue<()>>,

    optimize_mode: Arc<AtomicBool>,
    burnin: Arc<AtomicBool>,

    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    fn new(num_threads: usize) -> Self {
        Self {
            num_threads,
            quant_tasks: Arc::new(Queue::new()),
            quant_notify: Arc::new(Queue::new()),
            cond_tasks: Arc::new(Queue::new()),
            cond_notify: Arc::new(Queue::new()),
            exp_tasks: Arc::new(Queue::new()),
            exp_notify: Arc::new(Queue::new()),
            csplice_tasks: Arc::new(Queue::new()),
            csplice_notify: Arc::new(Queue::new()),
            esplice_tasks: Arc::new(Queue::new()),
            esplice_notify: Arc::new(Queue::new()),
            optimize_mode: Arc::new(AtomicBool::new(false)),
            burnin: Arc::new(AtomicBool::new(true)),
            handles: Mutex::new(Vec::new()),
        }
    }

    fn register(&self, handle: JoinHandle<()>) {
        self.handles.lock().unwrap().push(handle);
    }

    /// Cooperative shutdown: one terminator per worker, then join.
    fn shutdown(self) {
        for _ in 0..self.num_threads {
            self.quant_tasks.push(Task::Shutdown);
            self.cond_tasks.push(Task::Shutdown);
            self.exp_tasks.push(Task::Shutdown);
            self.csplice_tasks.push(Task::Shutdown);
            self.esplice_tasks.push(Task::Shutdown);
        }
        for handle in self.handles.lock().unwrap().drain(..) {
            if handle.join().is_err() {
                panic!("worker thread panicked");
            }
        }
    }
}

/// Push `len` indices as block-sized ranges; returns the number of ranges.
fn push_ranges(queue: &Queue<Task>, len: usize) -> usize {
    let mut count = 0;
    let mut first = 0;
    while first < len {
        let last = (first + WORK_BLOCK_SIZE).min(len);
        queue.push(Task::Range(first, last));
        first = last;
        count += 1;
    }
    count
}

/// Robust upper-quantile cross-sample normalization.
///
/// Each row of Q is unscaled, sorted, and read at the configured quantile of
/// its top `truncation` values; scales are then renormalized against sample
/// zero and multiplied back through, leaving `scale[0] == 1`.
pub(crate) fn compute_scaling(
    state: &ParamState,
    truncation: usize,
    quantile: f64,
    work: &mut [f32],
) {
    let num_rows = state.q.nrows();
    let num_cols = state.q.ncols();
    let effective = num_cols.min(truncation);
    let point = (num_cols - effective + (quantile * effective as f64) as usize).min(num_cols - 1);

    let mut raw = vec![0.0f32; num_rows];
    for i in 0..num_rows {
        // SAFETY: coordinator-only phase; no fan-out is in flight.
        unsafe {
            let old = state.scale.get(i);
            state.q.scale_row(i, 1.0 / old);
            state.q.copy_row_into(i, work);
        }
        work.sort_unstable_by(|a, b| a.total_cmp(b));
        raw[i] = work[point];
    }

    let anchor = raw[0];
    for i in 0..num_rows {
        let scale = anchor / raw[i];
        // SAFETY: as above.
        unsafe {
            state.scale.set(i, scale);
            state.q.scale_row(i, scale);
        }
    }
}
