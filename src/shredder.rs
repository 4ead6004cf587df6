//! Bounded univariate slice sampler with gradient-aided edge finding.
//!
//! The conditional samplers all share the same control flow: evaluate the
//! target log-density and its derivative, pick a slice height under the
//! current point, locate the two edges of the slice by a Newton/bisection
//! hybrid, then shrink uniformly until a point lands inside the slice. What
//! differs per conditional is only the target, so the target is a capability:
//! anything that can evaluate `x -> (log-density, derivative)`.

use log::warn;
use rand::Rng;

use crate::constants::{
    EDGE_D_EPS, EDGE_LP_EPS, MAX_EDGE_BISECTIONS, MAX_NEWTON_STEPS, OPT_FTOL, OPT_GRADIENT_CAP,
    OPT_MAX_EVALS, ZERO_EPS,
};
use crate::error::assert_finite;
use crate::math::fastln;

/// A target log-density with analytic derivative.
///
/// `eval(x)` returns `(log-density, d log-density / dx)` up to an additive
/// constant. Implemented for any `FnMut(f64) -> (f64, f64)`.
pub trait SliceTarget {
    /// Evaluate the target at `x`.
    fn eval(&mut self, x: f64) -> (f64, f64);
}

impl<F: FnMut(f64) -> (f64, f64)> SliceTarget for F {
    #[inline]
    fn eval(&mut self, x: f64) -> (f64, f64) {
        self(x)
    }
}

/// Univariate slice sampler on a bounded interval.
#[derive(Debug, Clone)]
pub struct Shredder {
    lower: f64,
    upper: f64,
    tolerance: f64,
    max_newton_steps: usize,
    zero_eps: f64,
}

impl Shredder {
    /// Create a sampler on `[lower, upper]` with the given shrink tolerance.
    pub fn new(lower: f64, upper: f64, tolerance: f64) -> Self {
        Self {
            lower,
            upper,
            tolerance,
            max_newton_steps: MAX_NEWTON_STEPS,
            zero_eps: ZERO_EPS,
        }
    }

    /// Override the Newton-step budget and log floor from run configuration.
    pub fn tune(&mut self, max_newton_steps: usize, zero_eps: f64) {
        self.max_newton_steps = max_newton_steps;
        self.zero_eps = zero_eps;
    }

    /// Lower bound of the sampling interval.
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Upper bound of the sampling interval.
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Draw one value from the target density restricted to the interval.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        x0: f64,
        target: &mut impl SliceTarget,
    ) -> f64 {
        let (lp0, d0) = target.eval(x0);
        assert_finite(lp0);

        let slice_height = fastln(self.zero_eps.max(rng.random::<f64>())) + lp0;
        assert_finite(slice_height);

        let x_min = self.find_slice_edge(target, x0, slice_height, lp0, d0, -1);
        let x_max = self.find_slice_edge(target, x0, slice_height, lp0, d0, 1);

        let mut x = (x_max + x_min) / 2.0;
        let (mut lo, mut hi) = (x_min, x_max);
        while hi - lo > self.tolerance {
            x = lo + (hi - lo) * rng.random::<f64>();
            let (lp, _) = target.eval(x);
            if lp >= slice_height {
                break;
            } else if x > x0 {
                hi = x;
            } else {
                lo = x;
            }
        }

        x
    }

    /// Mode-finding on the same target: bounded gradient ascent with the
    /// derivative capped at 1e4, at most 20 objective evaluations, absolute
    /// objective tolerance 1e-7, and step tolerance equal to the sampler's
    /// shrink tolerance. A non-finite objective at the start point is logged
    /// as a warning and the clamped start point returned unchanged.
    pub fn optimize(&self, x0: f64, target: &mut impl SliceTarget) -> f64 {
        let mut x = x0.clamp(self.lower, self.upper);
        let (mut lp, mut d) = target.eval(x);
        if !lp.is_finite() {
            warn!("optimization failed: non-finite objective at {x}");
            return x;
        }

        let mut evals = 1;
        let mut step = (self.upper - self.lower) / 8.0;
        while evals < OPT_MAX_EVALS && step > self.tolerance {
            let g = d.clamp(-OPT_GRADIENT_CAP, OPT_GRADIENT_CAP);
            if g == 0.0 || !g.is_finite() {
                break;
            }
            let x1 = (x + step * g.signum()).clamp(self.lower, self.upper);
            if x1 == x {
                step /= 2.0;
                continue;
            }
            let (lp1, d1) = target.eval(x1);
            evals += 1;
            if lp1.is_finite() && lp1 > lp {
                let gain = lp1 - lp;
                x = x1;
                lp = lp1;
                d = d1;
                if gain < OPT_FTOL {
                    break;
                }
            } else {
                step /= 2.0;
            }
        }

        x.clamp(self.lower, self.upper)
    }

    /// Locate the point where the target crosses `slice_height` on the side
    /// given by `direction` (-1 below `x0`, +1 above).
    ///
    /// Newton steps off the derivative are preferred; bisection takes over
    /// when the derivative is unusable, the step escapes the bracket, or the
    /// Newton budget is exhausted. The inner bisection retries until the
    /// log-density becomes finite, aborting after 50 attempts.
    fn find_slice_edge(
        &self,
        target: &mut impl SliceTarget,
        x0: f64,
        slice_height: f64,
        lp0: f64,
        d0: f64,
        direction: i32,
    ) -> f64 {
        let mut newton_count = 0usize;

        let mut lp = lp0 - slice_height;
        let mut d = d0;
        let mut x = x0;
        let mut bound_lower;
        let mut bound_upper;

        // The slice may touch the interval limit.
        if direction < 0 {
            bound_lower = self.lower;
            bound_upper = x0;
            let (fx, _) = target.eval(self.lower);
            if fx.is_finite() && fx >= slice_height {
                return self.lower;
            }
        } else {
            bound_lower = x0;
            bound_upper = self.upper;
            let (fx, _) = target.eval(self.upper);
            if fx.is_finite() && fx >= slice_height {
                return self.upper;
            }
        }

        while lp.abs() > EDGE_LP_EPS && (bound_upper - bound_lower).abs() > self.tolerance {
            let mut x1 = x - lp / d;
            if d.is_nan() || d == 0.0 || d.abs() < EDGE_D_EPS || !x1.is_finite() {
                x1 = (bound_lower + bound_upper) / 2.0;
            }

            // Very close to the boundary and still moving past it: give up.
            if direction < 0 && (x - self.lower).abs() <= self.tolerance && (x1 < x || lp > 0.0) {
                break;
            }
            if direction > 0 && (x - self.upper).abs() <= self.tolerance && (x1 > x || lp > 0.0) {
                break;
            }

            // Tighten the bracket from the sign of the previous evaluation,
            // correcting course if a step headed toward the other root.
            if direction < 0 {
                if lp > 0.0 {
                    bound_upper = x;
                } else {
                    bound_lower = x;
                }
            } else if lp > 0.0 {
                bound_lower = x;
            } else {
                bound_upper = x;
            }

            let mut bisect = newton_count >= self.max_newton_steps
                || x1 < bound_lower + self.tolerance
                || x1 > bound_upper - self.tolerance;

            if !bisect {
                x = x1;
                let (fx, dx) = target.eval(x);
                lp = fx - slice_height;
                d = dx;
                bisect = !lp.is_finite() || !d.is_finite();
            }

            if bisect {
                let mut iteration_count = 0usize;
                loop {
                    x = (bound_lower + bound_upper) / 2.0;
                    let (fx, dx) = target.eval(x);
                    lp = fx - slice_height;
                    d = dx;

                    if lp.is_finite() {
                        break;
                    }
                    if direction < 0 {
                        bound_lower = x;
                    } else {
                        bound_upper = x;
                    }

                    iteration_count += 1;
                    if iteration_count > MAX_EDGE_BISECTIONS {
                        panic!("slice sampler edge finding is not making progress");
                    }
                }
            } else {
                newton_count += 1;
            }

            assert_finite(lp);
        }

        assert_finite(x);
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use crate::pdf::normal;

    fn std_normal(x: f64) -> (f64, f64) {
        (normal::logpdf(0.0, 1.0, x), normal::dx(0.0, 1.0, x))
    }

    #[test]
    fn edge_at_boundary_when_slice_touches_limit() {
        // Constant target: any negative slice height covers the whole
        // interval, so both edges are the interval limits.
        let shredder = Shredder::new(-2.0, 3.0, 1e-5);
        let mut flat = |_x: f64| (0.0, 0.0);
        assert_eq!(shredder.find_slice_edge(&mut flat, 0.5, -0.5, 0.0, 0.0, -1), -2.0);
        assert_eq!(shredder.find_slice_edge(&mut flat, 0.5, -0.5, 0.0, 0.0, 1), 3.0);
        // A height exactly equal to the boundary density also touches it.
        assert_eq!(shredder.find_slice_edge(&mut flat, 0.5, 0.0, 0.0, 0.0, -1), -2.0);
    }

    #[test]
    fn edge_finds_interior_crossing() {
        let shredder = Shredder::new(-10.0, 10.0, 1e-8);
        // Height of the standard normal at +/-1.5.
        let h = normal::logpdf(0.0, 1.0, 1.5);
        let left = shredder.find_slice_edge(&mut std_normal, 0.0, h, std_normal(0.0).0, 0.0, -1);
        let right = shredder.find_slice_edge(&mut std_normal, 0.0, h, std_normal(0.0).0, 0.0, 1);
        assert!((left + 1.5).abs() < 0.1, "left edge {left}");
        assert!((right - 1.5).abs() < 0.1, "right edge {right}");
    }

    #[test]
    fn draws_stay_inside_interval() {
        let shredder = Shredder::new(-1.0, 1.0, 1e-5);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut x = 0.0;
        for _ in 0..200 {
            x = shredder.sample(&mut rng, x, &mut std_normal);
            assert!((-1.0..=1.0).contains(&x));
        }
    }

    #[test]
    fn optimize_climbs_to_the_mode() {
        let shredder = Shredder::new(-10.0, 10.0, 1e-5);
        let mut target = |x: f64| (normal::logpdf(0.3, 1.0, x), normal::dx(0.3, 1.0, x));
        let x = shredder.optimize(2.0, &mut target);
        assert!((x - 0.3).abs() < 0.2, "optimize landed at {x}");
    }

    #[test]
    fn optimize_respects_bounds() {
        let shredder = Shredder::new(0.5, 2.0, 1e-5);
        // Mode outside the interval: should end up pinned near the bound.
        let mut target = |x: f64| (normal::logpdf(-3.0, 1.0, x), normal::dx(-3.0, 1.0, x));
        let x = shredder.optimize(1.5, &mut target);
        assert!((0.5..=2.0).contains(&x));
        assert!(x < 0.6, "expected to approach the lower bound, got {x}");
    }
}
