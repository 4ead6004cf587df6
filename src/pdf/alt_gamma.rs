//! Gamma log-density in the (mean, shape) parameterization.
//!
//! The per-transcript abundance likelihoods live in this parameterization:
//! sampling a condition mean with fixed shape, or a shape with per-observation
//! means, falls out of the same density with a different free parameter. The
//! implied scale is `mean / shape`.

use crate::math::{fastln, lgamma, digamma, sq};

/// Log-density of a single observation.
#[inline]
pub fn logpdf(mean: f64, shape: f64, x: f64) -> f64 {
    let scale = mean / shape;
    -(lgamma(shape) + shape * fastln(scale)) + (shape - 1.0) * fastln(x) - x / scale
}

/// Summed log-density over observations with precomputed logs.
///
/// `lgamma_shape` is `lgamma(shape)`, hoisted by the caller out of the inner
/// loop over transcripts sharing a shape.
pub fn logpdf_sum_prelogged(
    mean: f64,
    shape: f64,
    lgamma_shape: f64,
    xs: &[f32],
    log_xs: &[f32],
) -> f64 {
    let scale = mean / shape;
    let norm = -(lgamma_shape + shape * fastln(scale));
    let mut lp = 0.0;
    for (&x, &logx) in xs.iter().zip(log_xs) {
        lp += norm + (shape - 1.0) * f64::from(logx) - f64::from(x) / scale;
    }
    lp
}

/// Derivative with respect to the observation.
#[inline]
pub fn dx(mean: f64, shape: f64, x: f64) -> f64 {
    (shape - 1.0) / x - shape / mean
}

/// Derivative with respect to the mean.
#[inline]
pub fn dmean(mean: f64, shape: f64, x: f64) -> f64 {
    shape * x / sq(mean) - shape / mean
}

/// Derivative with respect to the shape.
#[inline]
pub fn dshape(mean: f64, shape: f64, x: f64) -> f64 {
    let scale = mean / shape;
    -digamma(shape) - fastln(scale) + 1.0 + fastln(x) - x / mean
}
