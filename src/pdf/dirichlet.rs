//! Dirichlet log-density over rows of a proportion matrix.
//!
//! The concentration splits as `alpha * mean[i, j]`, so each row of `mean`
//! carries the expected proportions and `alpha` the overall precision.
//! Reserved for within-group splicing proportions.

use ndarray::ArrayView2;

use crate::math::{digamma, fastln, lgamma};

/// Summed log-density of the rows of `data` under row-wise Dirichlet
/// distributions with concentrations `alpha * mean`.
pub fn logpdf(alpha: f64, mean: ArrayView2<f32>, data: ArrayView2<f32>) -> f64 {
    let mut part = 0.0;
    for (m, x) in mean.iter().zip(data.iter()) {
        let am = alpha * f64::from(*m);
        part += (am - 1.0) * fastln(f64::from(*x)) - lgamma(am);
    }
    mean.nrows() as f64 * lgamma(alpha) + part
}

/// Derivative with respect to `alpha`.
pub fn dalpha(alpha: f64, mean: ArrayView2<f32>, data: ArrayView2<f32>) -> f64 {
    let mut part = 0.0;
    for (m, x) in mean.iter().zip(data.iter()) {
        let m = f64::from(*m);
        part += m * (fastln(f64::from(*x)) - digamma(alpha * m));
    }
    mean.nrows() as f64 * digamma(alpha) + part
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testutil::{assert_close, numdiff};
    use ndarray::array;

    #[test]
    fn dalpha_matches_finite_difference() {
        let mean = array![[0.3f32, 0.7], [0.5, 0.5]];
        let data = array![[0.25f32, 0.75], [0.6, 0.4]];
        assert_close(
            dalpha(4.0, mean.view(), data.view()),
            numdiff(|a| logpdf(a, mean.view(), data.view()), 4.0),
            "dirichlet dalpha",
        );
    }
}
