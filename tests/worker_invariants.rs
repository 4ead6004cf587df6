//! Invariants of individual worker kinds, driven directly through their
//! queues.

mod common;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use isogibbs::workers::{ConditionMeanShapeWorker, ConditionSpliceWorker, ExperimentSpliceWorker};
use isogibbs::{Config, Design, ParamState, Queue, Task};

struct SpliceRig {
    state: Arc<ParamState>,
    design: Arc<Design>,
    config: Arc<Config>,
}

fn splice_rig() -> SpliceRig {
    // Three transcripts, one spliced tgroup with two members.
    let design = Arc::new(Design::new(vec![0, 0, 1, 1], vec![vec![0], vec![1, 2]]).unwrap());
    let config = Arc::new(Config {
        num_threads: 1,
        ..Config::default()
    });
    let state = Arc::new(ParamState::new(&design, &config));

    let rows: [[f32; 3]; 4] = [
        [0.50, 0.30, 0.20],
        [0.45, 0.35, 0.20],
        [0.55, 0.25, 0.20],
        [0.40, 0.35, 0.25],
    ];
    for (i, row) in rows.iter().enumerate() {
        // SAFETY: no workers are running yet.
        unsafe { state.q.set_row(i, row) };
    }

    SpliceRig {
        state,
        design,
        config,
    }
}

fn run_one_range(worker_spawn: impl FnOnce() -> std::thread::JoinHandle<()>, tasks: &Queue<Task>, notify: &Queue<()>) {
    let handle = worker_spawn();
    tasks.push(Task::Range(0, 1));
    notify.pop();
    tasks.push(Task::Shutdown);
    handle.join().unwrap();
}

#[test]
fn eta_is_reset_after_condition_splice_updates() {
    common::init_logging();
    let rig = splice_rig();
    let tasks = Arc::new(Queue::new());
    let notify = Arc::new(Queue::new());
    let burnin = Arc::new(AtomicBool::new(false));

    let worker = ConditionSpliceWorker {
        state: Arc::clone(&rig.state),
        design: Arc::clone(&rig.design),
        config: Arc::clone(&rig.config),
        tasks: Arc::clone(&tasks),
        notify: Arc::clone(&notify),
        burnin: Arc::clone(&burnin),
    };
    run_one_range(move || worker.spawn(), &tasks, &notify);

    let min_sigma = rig.config.analyze_min_splice_sigma as f32;
    // SAFETY: the worker has shut down.
    unsafe {
        for flat in 0..rig.design.splice_total() {
            assert_eq!(rig.state.condition_splice_eta.get(flat), 1.0);
            let sigma = rig.state.condition_splice_sigma.get(flat);
            assert!(sigma >= min_sigma, "sigma {sigma} under floor");
            for c in 0..rig.design.num_conditions() {
                let mu = rig
                    .state
                    .condition_splice_mu
                    .get(rig.state.csplice_idx(c, flat));
                assert!((-1.0..=2.0).contains(&mu), "splice mu {mu}");
                assert!(mu.is_finite());
            }
        }
    }
}

#[test]
fn burnin_forces_splice_sigma_to_one() {
    common::init_logging();
    let rig = splice_rig();
    let tasks = Arc::new(Queue::new());
    let notify = Arc::new(Queue::new());
    let burnin = Arc::new(AtomicBool::new(true));

    let worker = ConditionSpliceWorker {
        state: Arc::clone(&rig.state),
        design: Arc::clone(&rig.design),
        config: Arc::clone(&rig.config),
        tasks: Arc::clone(&tasks),
        notify: Arc::clone(&notify),
        burnin: Arc::clone(&burnin),
    };
    run_one_range(move || worker.spawn(), &tasks, &notify);

    // SAFETY: the worker has shut down.
    unsafe {
        for flat in 0..rig.design.splice_total() {
            assert_eq!(rig.state.condition_splice_sigma.get(flat), 1.0);
            assert_eq!(rig.state.condition_splice_eta.get(flat), 1.0);
        }
    }
}

#[test]
fn burnin_forces_condition_shape_to_one() {
    common::init_logging();
    let rig = splice_rig();
    let tasks = Arc::new(Queue::new());
    let notify = Arc::new(Queue::new());
    let burnin = Arc::new(AtomicBool::new(true));

    let worker = ConditionMeanShapeWorker {
        state: Arc::clone(&rig.state),
        design: Arc::clone(&rig.design),
        config: Arc::clone(&rig.config),
        tasks: Arc::clone(&tasks),
        notify: Arc::clone(&notify),
        burnin: Arc::clone(&burnin),
    };
    let handle = worker.spawn();
    tasks.push(Task::Range(0, rig.design.num_transcripts()));
    notify.pop();
    tasks.push(Task::Shutdown);
    handle.join().unwrap();

    // SAFETY: the worker has shut down.
    unsafe {
        for tid in 0..rig.design.num_transcripts() {
            assert_eq!(rig.state.condition_shape.get(tid), 1.0);
            for c in 0..rig.design.num_conditions() {
                let mean = rig.state.condition_mean.get(c, tid);
                assert!(mean > 0.0 && mean <= 1.0, "condition mean {mean}");
            }
        }
    }
}

#[test]
fn experiment_splice_mu_stays_in_bounds() {
    common::init_logging();
    let rig = splice_rig();
    let tasks = Arc::new(Queue::new());
    let notify = Arc::new(Queue::new());

    let worker = ExperimentSpliceWorker {
        state: Arc::clone(&rig.state),
        design: Arc::clone(&rig.design),
        config: Arc::clone(&rig.config),
        tasks: Arc::clone(&tasks),
        notify: Arc::clone(&notify),
    };
    run_one_range(move || worker.spawn(), &tasks, &notify);

    // SAFETY: the worker has shut down.
    unsafe {
        for flat in 0..rig.design.splice_total() {
            let mu = rig.state.experiment_splice_mu.get(flat);
            assert!((-1.0..=2.0).contains(&mu), "experiment splice mu {mu}");
        }
    }
}
