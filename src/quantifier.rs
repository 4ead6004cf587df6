//! Interface to the external per-sample quantification sampler.
//!
//! The coordinator treats quantification as a black box: per tick it reads
//! the hyperparameter block and produces an N-vector of transcript
//! abundances. The block is read-only while the quantifier is ticking and is
//! mutated only between ticks, by the coordinator thread.

use crate::error::Result;

/// Hyperparameter block the coordinator pushes into each quantifier before
/// every tick.
#[derive(Debug, Clone)]
pub struct HyperParams {
    /// Sample scaling factor.
    pub scale: f64,
    /// Per-transcript condition means.
    pub mean: Vec<f32>,
    /// Per-transcript condition shapes.
    pub shape: Vec<f32>,
    /// Per-transcript splice means (zero for unspliced transcripts).
    pub splice_mu: Vec<f32>,
    /// Per-transcript splice sigmas.
    pub splice_sigma: Vec<f32>,
}

impl HyperParams {
    /// Flat block for `num_transcripts` transcripts.
    pub fn new(num_transcripts: usize) -> Self {
        Self {
            scale: 1.0,
            mean: vec![0.0; num_transcripts],
            shape: vec![0.0; num_transcripts],
            splice_mu: vec![0.0; num_transcripts],
            splice_sigma: vec![0.1; num_transcripts],
        }
    }
}

/// One per-sample quantification sampler.
///
/// Implementations own whatever fragment data and bias models they need;
/// the coordinator only drives the tick protocol below.
pub trait Quantifier: Send {
    /// Prepare for ticking. Called once before the first tick.
    fn start(&mut self) -> Result<()>;

    /// Run one maximum-posterior tick.
    fn optimize(&mut self) -> Result<()>;

    /// Run one posterior-sampling tick.
    fn sample(&mut self) -> Result<()>;

    /// Current per-transcript abundance estimate, length N.
    fn state(&self) -> &[f32];

    /// Number of fragments backing this sample.
    fn num_frags(&self) -> u64;

    /// Switch from likelihood-only operation to the full posterior. Called
    /// once, after the optimization rounds.
    fn engage_priors(&mut self) -> Result<()>;

    /// Release resources. Called once at shutdown.
    fn stop(&mut self) -> Result<()>;

    /// The hyperparameter block, mutated by the coordinator between ticks.
    fn hyperparams_mut(&mut self) -> &mut HyperParams;
}
