//! Long-lived worker threads driven by the coordinator's work queues.
//!
//! Five kinds, one pool of `num_threads` threads each. A worker blocks on
//! its task queue, processes the index range it pops, pushes one
//! notification per range, and exits on [`crate::queue::Task::Shutdown`].
//! Each transcript or spliced tgroup draws from its own pooled RNG, so
//! chains are reproducible for a fixed seed regardless of which thread
//! processes which range.

mod experiment;
mod mean_shape;
mod quant;
mod splice;

pub use experiment::ExperimentMeanWorker;
pub use mean_shape::ConditionMeanShapeWorker;
pub use quant::QuantWorker;
pub use splice::{ConditionSpliceWorker, ExperimentSpliceWorker};
