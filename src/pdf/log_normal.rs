//! Log-normal log-density and partials.

use crate::constants::LOG_2PI;
use crate::math::{cb, fastln, sq};

/// Log-density of a single observation.
#[inline]
pub fn logpdf(mu: f64, sigma: f64, x: f64) -> f64 {
    let logx = fastln(x);
    -LOG_2PI / 2.0 - fastln(sigma) - sq(logx - mu) / (2.0 * sq(sigma)) - logx
}

/// Derivative with respect to `sigma` for a single observation.
#[inline]
pub fn dsigma(mu: f64, sigma: f64, x: f64) -> f64 {
    sq(fastln(x) - mu) / cb(sigma) - 1.0 / sigma
}
