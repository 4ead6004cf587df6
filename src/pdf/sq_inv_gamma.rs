//! Inverse-gamma log-density over squared observations.
//!
//! Used when a hyperprior is placed on the rate of squared scale parameters:
//! the observation enters as `x²`, so the derivative chain picks up an extra
//! factor of `2x`.

use crate::math::{cb, fastln, lgamma};

/// Summed log-density of `xs` (each observation squared before evaluation).
pub fn logpdf_sum(alpha: f64, beta: f64, xs: &[f32]) -> f64 {
    let mut part = 0.0;
    for &x in xs {
        let x2 = f64::from(x) * f64::from(x);
        part += (alpha + 1.0) * fastln(x2) + beta / x2;
    }
    xs.len() as f64 * (alpha * fastln(beta) - lgamma(alpha)) - part
}

/// Derivative with respect to the observation.
#[inline]
pub fn dx(alpha: f64, beta: f64, x: f64) -> f64 {
    2.0 * beta / cb(x) - (2.0 * alpha + 2.0) / x
}

/// Derivative with respect to `beta`, summed over `xs`.
pub fn dbeta_sum(alpha: f64, beta: f64, xs: &[f32]) -> f64 {
    let mut part = 0.0;
    for &x in xs {
        part += 1.0 / (f64::from(x) * f64::from(x));
    }
    xs.len() as f64 * (alpha / beta) - part
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testutil::{assert_close, numdiff};

    const XS: [f32; 3] = [0.6, 1.4, 0.95];

    #[test]
    fn dbeta_matches_finite_difference() {
        assert_close(
            dbeta_sum(2.2, 0.8, &XS),
            numdiff(|b| logpdf_sum(2.2, b, &XS), 0.8),
            "sq_inv_gamma dbeta",
        );
    }

    #[test]
    fn dx_matches_finite_difference() {
        let f = |x: f64| logpdf_sum(2.2, 0.8, &[x as f32]);
        assert_close(dx(2.2, 0.8, 0.9), numdiff(f, 0.9), "sq_inv_gamma dx");
    }
}
