//! Numeric constants used throughout the crate.

/// Default deterministic seed for the sampler RNG pools.
///
/// The value `0x69736F67` is "isog" encoded in ASCII. Same seed + same
/// design + same thread-count-independent work partitioning = same chains.
pub const DEFAULT_SEED: u64 = 0x69736F67;

/// Width of the index ranges handed to hyperparameter workers.
///
/// Small enough to balance load across the pool, large enough that queue
/// traffic is negligible next to the per-transcript sampling work.
pub const WORK_BLOCK_SIZE: usize = 250;

/// Floor applied to arguments of logarithms and to initial mean values.
pub const ZERO_EPS: f64 = 1e-12;

/// Newton iterations allowed in slice-edge finding before falling back to
/// bisection for the remainder of the search.
pub const MAX_NEWTON_STEPS: usize = 10;

/// Retry bound for the inner bisection loop of slice-edge finding. Exceeding
/// it means the target density is returning non-finite values over a wide
/// interval, which is fatal.
pub const MAX_EDGE_BISECTIONS: usize = 50;

/// Convergence threshold on `|log-density - slice height|` in edge finding.
pub const EDGE_LP_EPS: f64 = 1e-2;

/// Gradient magnitude below which Newton steps are considered unreliable.
pub const EDGE_D_EPS: f64 = 1e-3;

/// Gradient cap applied inside `Shredder::optimize`.
pub const OPT_GRADIENT_CAP: f64 = 1e4;

/// Objective-evaluation budget for `Shredder::optimize`.
pub const OPT_MAX_EVALS: usize = 20;

/// Absolute objective tolerance for `Shredder::optimize`.
pub const OPT_FTOL: f64 = 1e-7;

/// Natural log of 2*pi, used in normal-family log-pdf computation.
pub const LOG_2PI: f64 = 1.8378770664093453;
