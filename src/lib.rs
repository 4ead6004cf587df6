//! # isogibbs
//!
//! Hierarchical Bayesian inference for cross-sample gene-expression and
//! alternative-splicing analysis. Given K RNA-seq samples partitioned into C
//! conditions and N transcripts grouped into transcription groups, the crate
//! produces posterior samples of per-sample transcript abundances,
//! per-condition abundance means and shapes, within-tgroup splicing
//! proportion parameters, and experiment-wide hyperparameters.
//!
//! The crate is the Gibbs machinery only: per-sample quantification is an
//! external collaborator behind the [`Quantifier`] trait, and the on-disk
//! layer is behind [`OutputStore`]. Each tick pushes hyperparameters into
//! the quantifiers, fans K quantification draws out over a worker pool,
//! draws the process-global scalars, normalizes cross-sample scales, then
//! runs the condition-level and experiment-level updates behind counting
//! barriers.
//!
//! ## Example
//!
//! ```ignore
//! use isogibbs::{Analyze, Config, Design, MemStore, TranscriptInfo};
//!
//! let design = Design::new(condition_labels, tgroup_tids)?;
//! let info = TranscriptInfo::unnamed(design.num_transcripts());
//! let mut analyze = Analyze::new(Config::default(), design, info, quantifiers)?;
//! let mut store = MemStore::new();
//! let stats = analyze.run(&mut store)?;
//! ```
//!
//! Chains are deterministic for a fixed `rng_seed`: every transcript and
//! every spliced tgroup draws from its own seeded RNG, so the thread count
//! changes scheduling but not results.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod analyze;
mod config;
mod constants;
mod design;
mod error;
mod math;
mod output;
mod quantifier;
mod queue;
mod shared;
mod state;

pub mod pdf;
pub mod samplers;
pub mod shredder;
pub mod workers;

pub use analyze::{Analyze, RunStats};
pub use config::Config;
pub use constants::DEFAULT_SEED;
pub use design::{Design, TranscriptInfo};
pub use error::{assert_finite, Error, Result};
pub use output::{MemStore, OutputStore, OutputWriter};
pub use quantifier::{HyperParams, Quantifier};
pub use queue::{Queue, Task};
pub use shared::{ScalarCell, SharedMatrix, SharedVec};
pub use state::ParamState;
