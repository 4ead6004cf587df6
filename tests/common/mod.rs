//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use isogibbs::{Error, HyperParams, Quantifier, Result};

/// Initialize test logging once.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A quantifier that reports a fixed abundance vector every tick.
pub struct StubQuantifier {
    state: Vec<f32>,
    frags: u64,
    hp: HyperParams,
    engaged: Arc<AtomicBool>,
}

impl StubQuantifier {
    /// Always report `state`.
    pub fn constant(state: Vec<f32>) -> Self {
        let n = state.len();
        Self {
            state,
            frags: 1000,
            hp: HyperParams::new(n),
            engaged: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle that observes the `engage_priors` transition.
    pub fn engaged_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.engaged)
    }
}

impl Quantifier for StubQuantifier {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn optimize(&mut self) -> Result<()> {
        Ok(())
    }

    fn sample(&mut self) -> Result<()> {
        Ok(())
    }

    fn state(&self) -> &[f32] {
        &self.state
    }

    fn num_frags(&self) -> u64 {
        self.frags
    }

    fn engage_priors(&mut self) -> Result<()> {
        self.engaged.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn hyperparams_mut(&mut self) -> &mut HyperParams {
        &mut self.hp
    }
}

/// A quantifier whose ticks always fail.
pub struct FailingQuantifier {
    state: Vec<f32>,
    hp: HyperParams,
    sample_index: usize,
}

impl FailingQuantifier {
    pub fn new(num_transcripts: usize, sample_index: usize) -> Self {
        Self {
            state: vec![0.5; num_transcripts],
            hp: HyperParams::new(num_transcripts),
            sample_index,
        }
    }

    fn fail(&self) -> Result<()> {
        Err(Error::Quantifier {
            sample: self.sample_index,
            message: "bam record stream ended early".into(),
        })
    }
}

impl Quantifier for FailingQuantifier {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn optimize(&mut self) -> Result<()> {
        self.fail()
    }

    fn sample(&mut self) -> Result<()> {
        self.fail()
    }

    fn state(&self) -> &[f32] {
        &self.state
    }

    fn num_frags(&self) -> u64 {
        0
    }

    fn engage_priors(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn hyperparams_mut(&mut self) -> &mut HyperParams {
        &mut self.hp
    }
}
