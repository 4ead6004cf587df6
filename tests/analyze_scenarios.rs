//! End-to-end scenarios for the Gibbs coordinator.

mod common;

use common::{FailingQuantifier, StubQuantifier};

use isogibbs::{Analyze, Config, Design, Error, MemStore, TranscriptInfo};

fn singleton_tgroups(n: usize) -> Vec<Vec<usize>> {
    (0..n).map(|t| vec![t]).collect()
}

fn run_to_store<Q: isogibbs::Quantifier + 'static>(
    config: Config,
    design: Design,
    quantifiers: Vec<Q>,
) -> (MemStore, isogibbs::RunStats) {
    let info = TranscriptInfo::unnamed(design.num_transcripts());
    let mut analyze = Analyze::new(config, design, info, quantifiers).unwrap();
    let mut store = MemStore::new();
    let stats = analyze.run(&mut store).unwrap();
    (store, stats)
}

#[test]
fn single_sample_single_transcript() {
    common::init_logging();

    let config = Config {
        burnin: 100,
        num_samples: 100,
        num_opt_rounds: 2,
        num_threads: 1,
        rng_seed: 42,
        experiment_shape: 200.0,
        experiment_shape0: 200.0,
        experiment_mean0: 0.5,
        ..Config::default()
    };
    let design = Design::new(vec![0], vec![vec![0]]).unwrap();
    let quantifiers = vec![StubQuantifier::constant(vec![0.5])];

    let (store, stats) = run_to_store(config, design, quantifiers);
    assert_eq!(stats.ticks, 2 + 100 + 99);
    assert_eq!(stats.samples_written, 100);

    // Documented groups are all present.
    for path in [
        "/transcript_id",
        "/gene_id",
        "/gene_name",
        "/tgroup",
        "/transcript_quantification",
        "/sample_scaling",
        "/experiment/mean",
        "/experiment/splice_mu",
        "/experiment/splice_sigma",
        "/condition/mean",
        "/condition/shape",
        "/condition/splice_mu",
        "/condition/splice_sigma",
    ] {
        assert!(store.paths().contains(&path), "missing {path}");
    }

    // No spliced tgroups: the splice datasets are empty per row.
    let (dims, rows) = store.vlen("/experiment/splice_mu").unwrap();
    assert_eq!(dims, &[100, 0]);
    assert!(rows.iter().all(Vec::is_empty));

    // The condition mean tracks the quantifier's reported state.
    let (_, rows) = store.fixed("/condition/mean").unwrap();
    let mean: f64 = rows[1..]
        .iter()
        .map(|row| f64::from(row[0]))
        .sum::<f64>()
        / (rows.len() - 1) as f64;
    assert!(
        (mean - 0.5).abs() < 0.025,
        "condition mean {mean} drifted from the quantifier state 0.5"
    );

    // Scaling leaves sample zero at one.
    let (_, scaling) = store.fixed("/sample_scaling").unwrap();
    for row in scaling {
        assert_eq!(row[0], 1.0);
    }
}

#[test]
fn two_conditions_identical_data_agree() {
    common::init_logging();

    let n = 10;
    let config = Config {
        burnin: 50,
        num_samples: 100,
        num_opt_rounds: 2,
        num_threads: 2,
        rng_seed: 7,
        experiment_shape: 400.0,
        experiment_shape0: 2.0,
        experiment_mean0: 0.1,
        ..Config::default()
    };
    let design = Design::new(vec![0, 0, 1, 1], singleton_tgroups(n)).unwrap();

    let values: Vec<f32> = (0..n).map(|i| 0.02 * (i + 1) as f32).collect();
    let quantifiers: Vec<StubQuantifier> = (0..4)
        .map(|_| StubQuantifier::constant(values.clone()))
        .collect();

    let (store, _) = run_to_store(config, design, quantifiers);

    let (dims, rows) = store.fixed("/condition/mean").unwrap();
    assert_eq!(dims, &[100, 2, n]);

    for tid in 0..n {
        let mut diff_sum = 0.0f64;
        let mut value_sum = 0.0f64;
        for row in &rows[1..] {
            let c0 = f64::from(row[tid]);
            let c1 = f64::from(row[n + tid]);
            diff_sum += (c0 - c1).abs();
            value_sum += (c0 + c1) / 2.0;
        }
        let mean_diff = diff_sum / (rows.len() - 1) as f64;
        let mean_value = value_sum / (rows.len() - 1) as f64;
        assert!(
            mean_diff < 0.1 * mean_value,
            "transcript {tid}: |c0 - c1| averages {mean_diff} against level {mean_value}"
        );
    }
}

fn spliced_fixture() -> (Design, Vec<StubQuantifier>) {
    // Four transcripts; tgroup 1 has three isoforms, so J = 1 with three
    // members.
    let design = Design::new(vec![0, 0, 1, 1], vec![vec![0], vec![1, 2, 3]]).unwrap();
    let states = [
        vec![0.40f32, 0.30, 0.20, 0.10],
        vec![0.38, 0.32, 0.18, 0.12],
        vec![0.42, 0.28, 0.22, 0.08],
        vec![0.36, 0.34, 0.16, 0.14],
    ];
    let quantifiers = states
        .into_iter()
        .map(|s| StubQuantifier::constant(s))
        .collect();
    (design, quantifiers)
}

#[test]
fn deterministic_seeding_reproduces_output() {
    common::init_logging();

    let config = Config {
        burnin: 5,
        num_samples: 6,
        num_opt_rounds: 2,
        num_threads: 1,
        rng_seed: 1234,
        ..Config::default()
    };

    let (design_a, quant_a) = spliced_fixture();
    let (design_b, quant_b) = spliced_fixture();
    let (store_a, _) = run_to_store(config.clone(), design_a, quant_a);
    let (store_b, _) = run_to_store(config, design_b, quant_b);

    assert_eq!(store_a.to_json().unwrap(), store_b.to_json().unwrap());
}

#[test]
fn spliced_run_respects_parameter_bounds() {
    common::init_logging();

    let config = Config {
        burnin: 20,
        num_samples: 20,
        num_opt_rounds: 2,
        num_threads: 2,
        rng_seed: 99,
        ..Config::default()
    };
    let min_sigma = config.analyze_min_splice_sigma as f32;

    let (design, quantifiers) = spliced_fixture();
    let (store, _) = run_to_store(config, design, quantifiers);

    let (_, mean_rows) = store.fixed("/condition/mean").unwrap();
    for row in mean_rows {
        for &m in row {
            assert!(m > 0.0 && m <= 1.0, "condition mean {m} out of (0, 1]");
        }
    }

    let (_, shape_rows) = store.fixed("/condition/shape").unwrap();
    for row in shape_rows {
        for &s in row {
            assert!((0.1..=5.0).contains(&s), "condition shape {s}");
        }
    }

    let (_, esplice_rows) = store.vlen("/experiment/splice_mu").unwrap();
    for row in esplice_rows {
        for group in row {
            for &mu in group {
                assert!((-1.0..=2.0).contains(&mu), "experiment splice mu {mu}");
            }
        }
    }

    // Row 0 is the optimization state with burn-in forcing; sampling rows
    // respect the sigma floor.
    let (_, sigma_rows) = store.vlen("/condition/splice_sigma").unwrap();
    for group in &sigma_rows[0] {
        assert!(group.iter().all(|&s| s == 1.0));
    }
    for row in &sigma_rows[1..] {
        for group in row {
            for &s in group {
                assert!(s >= min_sigma, "condition splice sigma {s} under floor");
            }
        }
    }

    let (_, scaling_rows) = store.fixed("/sample_scaling").unwrap();
    for row in scaling_rows {
        assert_eq!(row[0], 1.0);
        assert!(row.iter().all(|&s| s > 0.0));
    }
}

#[test]
fn quantifier_error_aborts_the_run() {
    common::init_logging();

    let config = Config {
        burnin: 5,
        num_samples: 5,
        num_opt_rounds: 1,
        num_threads: 1,
        ..Config::default()
    };
    let design = Design::new(vec![0, 0], singleton_tgroups(3)).unwrap();
    let quantifiers = vec![FailingQuantifier::new(3, 0), FailingQuantifier::new(3, 1)];
    let info = TranscriptInfo::unnamed(3);

    let mut analyze = Analyze::new(config, design, info, quantifiers).unwrap();
    let mut store = MemStore::new();
    match analyze.run(&mut store) {
        Err(Error::Quantifier { .. }) => {}
        other => panic!("expected a quantifier error, got {other:?}"),
    }
}

#[test]
fn dryrun_produces_no_output() {
    let config = Config {
        dryrun: true,
        ..Config::default()
    };
    let design = Design::new(vec![0], singleton_tgroups(2)).unwrap();
    let quantifiers = vec![StubQuantifier::constant(vec![0.5, 0.5])];

    let (store, stats) = run_to_store(config, design, quantifiers);
    assert_eq!(stats.ticks, 0);
    assert_eq!(stats.samples_written, 0);
    assert!(store.paths().is_empty());
}

#[test]
fn priors_are_engaged_after_optimization() {
    let config = Config {
        burnin: 2,
        num_samples: 2,
        num_opt_rounds: 1,
        num_threads: 1,
        ..Config::default()
    };
    let design = Design::new(vec![0], singleton_tgroups(2)).unwrap();
    let quantifier = StubQuantifier::constant(vec![0.6, 0.4]);
    let engaged = quantifier.engaged_flag();

    let (_, stats) = run_to_store(config, design, vec![quantifier]);
    assert!(engaged.load(std::sync::atomic::Ordering::Relaxed));
    assert_eq!(stats.total_frags, 1000);

    // With nopriors set the transition is skipped.
    let config = Config {
        burnin: 2,
        num_samples: 2,
        num_opt_rounds: 1,
        num_threads: 1,
        nopriors: true,
        ..Config::default()
    };
    let design = Design::new(vec![0], singleton_tgroups(2)).unwrap();
    let quantifier = StubQuantifier::constant(vec![0.6, 0.4]);
    let engaged = quantifier.engaged_flag();
    run_to_store(config, design, vec![quantifier]);
    assert!(!engaged.load(std::sync::atomic::Ordering::Relaxed));
}
