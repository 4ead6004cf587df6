//! Error types for the sampler.
//!
//! Two failure classes exist. Recoverable failures (a quantifier that cannot
//! tick, invalid configuration or design tables, output-store rejections)
//! propagate as [`Error`] values. Invariant violations — a non-finite value
//! where a finite one is required — abort the process immediately via
//! [`assert_finite`]: every downstream draw depends on every upstream draw
//! being finite, so there is no local recovery policy.

use thiserror::Error;

/// Result type alias for sampler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all sampler operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The external quantifier failed; the run is aborted.
    #[error("quantifier error in sample {sample}: {message}")]
    Quantifier {
        /// Sample index whose quantifier failed.
        sample: usize,
        /// Quantifier-reported failure description.
        message: String,
    },

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Experiment design tables rejected by validation.
    #[error("invalid design: {0}")]
    InvalidDesign(String),

    /// The output store rejected a dataset operation.
    #[error("output store: {0}")]
    Output(String),
}

/// Abort with a diagnostic if `x` is not finite.
///
/// Callers of the log-pdf primitives and the slice sampler are contractually
/// permitted to assume finite values; any deviation is surfaced immediately.
#[inline]
pub fn assert_finite(x: f64) {
    if !x.is_finite() {
        panic!("{x} found where finite value expected");
    }
}

/// `f32` variant of [`assert_finite`], used on values leaving for the
/// output store.
#[inline]
pub fn assert_finite32(x: f32) {
    if !x.is_finite() {
        panic!("{x} found where finite value expected");
    }
}
