/*
    Asteria, numerical astronomy toolkit
    Copyright (C) 2025 Asteria contributors

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::errors::MathError;
use crate::math::iterate::IterationCounters;
use crate::math::minimize::{bracket_from_points, BrentMinimizer};
use crate::math::specfun::{bell_polynomials_triangular_array, factorial};

/// Bisection root finder over a sign-changing bracket.
///
/// Evaluated as an inverse function: `run(y)` finds x in the domain with
/// `f(x) = y`. Tolerances are negative decimal logs, the iteration cap a
/// decimal log.
pub struct Bisection<F> {
    f: F,
    first: f64,
    last: f64,
    /// Default 11.7 (~ 2e-12).
    pub abs_tol_nlog: f64,
    /// Default 15.
    pub rel_tol_nlog: f64,
    /// Default 2 (100 iterations).
    pub max_iter_log: f64,
}

impl<F: Fn(f64) -> f64> Bisection<F> {
    /// The domain endpoints are reordered if needed.
    pub fn new(f: F, domain: (f64, f64)) -> Self {
        Self {
            f,
            first: domain.0.min(domain.1),
            last: domain.0.max(domain.1),
            abs_tol_nlog: 11.7,
            rel_tol_nlog: 15.0,
            max_iter_log: 2.0,
        }
    }

    /// Finds x with f(x) = y by halving the bracket.
    pub fn run(&self, y: f64) -> Result<f64, MathError> {
        self.run_counted(y).map(|(x, _)| x)
    }

    pub fn run_counted(&self, y: f64) -> Result<(f64, IterationCounters), MathError> {
        let atol = 10_f64.powf(-self.abs_tol_nlog);
        let rtol = 10_f64.powf(-self.rel_tol_nlog);
        let max_iterations = 10_f64.powf(self.max_iter_log).floor().max(1.0) as u64;

        let g = |x: f64| (self.f)(x) - y;
        let mut a = self.first;
        let mut b = self.last;
        let mut ga = g(a);
        let gb = g(b);
        let mut counters = IterationCounters {
            iterations: 0,
            evaluations: 2,
        };

        if ga == 0.0 {
            return Ok((a, counters));
        }
        if gb == 0.0 {
            return Ok((b, counters));
        }
        if ga * gb > 0.0 {
            return Err(MathError::DomainError {
                what: format!(
                    "no sign change over [{}, {}]: f(a) - y and f(b) - y have the same sign",
                    a, b
                ),
            });
        }

        let mut mid = 0.5 * (a + b);
        while counters.iterations < max_iterations {
            mid = 0.5 * (a + b);
            let gm = g(mid);
            counters.iterations += 1;
            counters.evaluations += 1;
            if gm == 0.0 || b - a < atol + rtol * mid.abs() {
                return Ok((mid, counters));
            }
            if ga * gm < 0.0 {
                b = mid;
            } else {
                a = mid;
                ga = gm;
            }
        }
        Err(MathError::ConvergenceFailed {
            iterations: counters.iterations,
            residual: g(mid),
        })
    }
}

/// A callable stored by the Householder iterator: the function or one of
/// its derivatives.
pub type ScalarFn = Box<dyn Fn(f64) -> f64>;

/// The Householder iteration family: order 1 is Newton, order 2 is Halley,
/// order d converges at order d + 1.
///
/// The update is `x <- x + d * (1/f)^(d-1)(x) / (1/f)^(d)(x)`, where the
/// high-order derivatives of 1/f come from the Faa di Bruno expansion over
/// incomplete Bell polynomials of the supplied derivatives:
/// `(1/f)^(n) = sum_{k=1..n} (-1)^k k! / f^(k+1) * B_{n,k}(f', ..., f^(n-k+1))`.
pub struct HouseholderIterator {
    f: ScalarFn,
    derivatives: Vec<ScalarFn>,
    /// Default 7.83 (~ 1.48e-8).
    pub abs_tol_nlog: f64,
    /// Default +inf (relative test disabled).
    pub rel_tol_nlog: f64,
    /// Default 1.7 (50 iterations).
    pub max_iter_log: f64,
}

impl HouseholderIterator {
    /// `functions[0]` is f itself, the rest its successive derivatives; at
    /// least f and f' are required.
    pub fn new(mut functions: Vec<ScalarFn>) -> Result<Self, MathError> {
        if functions.len() < 2 {
            return Err(MathError::InsufficientDerivatives {
                supplied: functions.len(),
                required: 2,
            });
        }
        let derivatives = functions.split_off(1);
        Ok(Self {
            f: functions.pop().unwrap(),
            derivatives,
            abs_tol_nlog: 7.83,
            rel_tol_nlog: f64::INFINITY,
            max_iter_log: 1.7,
        })
    }

    /// The iteration order d (number of derivatives supplied).
    pub fn order(&self) -> usize {
        self.derivatives.len()
    }

    /// `(1/f)^(n)` at x, given f(x) and the Bell triangle of the
    /// derivative values.
    fn reciprocal_derivative(
        &self,
        n: usize,
        fx: f64,
        triangle: &crate::math::matrix::DenseMatrix,
    ) -> f64 {
        if n == 0 {
            return 1.0 / fx;
        }
        let mut acc = 0.0;
        for k in 1..=n {
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            acc += sign * factorial(k as f64) / fx.powi(k as i32 + 1) * triangle.at(n, k);
        }
        acc
    }

    /// Runs the iteration from the initial guess `x`.
    pub fn run(&self, x: f64) -> Result<f64, MathError> {
        self.run_counted(x).map(|(x, _)| x)
    }

    pub fn run_counted(&self, mut x: f64) -> Result<(f64, IterationCounters), MathError> {
        let d = self.order();
        let atol = 10_f64.powf(-self.abs_tol_nlog);
        let rtol = 10_f64.powf(-self.rel_tol_nlog);
        let max_iterations = 10_f64.powf(self.max_iter_log).floor().max(1.0) as u64;
        let mut counters = IterationCounters::default();

        let mut step = f64::INFINITY;
        while counters.iterations < max_iterations {
            let fx = (self.f)(x);
            let deriv_values: Vec<f64> = self.derivatives.iter().map(|df| df(x)).collect();
            counters.evaluations += 1 + deriv_values.len() as u64;
            let triangle = bell_polynomials_triangular_array(&deriv_values);

            let g_low = self.reciprocal_derivative(d - 1, fx, &triangle);
            let g_high = self.reciprocal_derivative(d, fx, &triangle);
            if g_high == 0.0 {
                return Err(MathError::DomainError {
                    what: format!("vanishing (1/f)^({}) at x = {}", d, x),
                });
            }
            step = d as f64 * g_low / g_high;
            x += step;
            counters.iterations += 1;
            if step.abs() < atol + rtol * x.abs() {
                return Ok((x, counters));
            }
        }
        Err(MathError::ConvergenceFailed {
            iterations: counters.iterations,
            residual: step,
        })
    }
}

/// Newton's iteration, the order-1 member of the Householder family.
pub fn newton<F, D>(
    f: F,
    df: D,
    mut x: f64,
    max_iter_log: f64,
    abs_tol_nlog: f64,
    rel_tol_nlog: f64,
) -> Result<f64, MathError>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    let atol = 10_f64.powf(-abs_tol_nlog);
    let rtol = 10_f64.powf(-rel_tol_nlog);
    let max_iterations = 10_f64.powf(max_iter_log).floor().max(1.0) as u64;
    let mut step = f64::INFINITY;
    for iteration in 0..max_iterations {
        let slope = df(x);
        if slope == 0.0 {
            return Err(MathError::DomainError {
                what: format!("vanishing derivative at x = {}", x),
            });
        }
        step = -f(x) / slope;
        x += step;
        if step.abs() < atol + rtol * x.abs() {
            trace!("Newton converged in {} iterations", iteration + 1);
            return Ok(x);
        }
    }
    Err(MathError::ConvergenceFailed {
        iterations: max_iterations,
        residual: step,
    })
}

/// Halley's iteration, the order-2 member of the Householder family.
pub fn halley<F, D, D2>(
    f: F,
    df: D,
    d2f: D2,
    mut x: f64,
    max_iter_log: f64,
    abs_tol_nlog: f64,
    rel_tol_nlog: f64,
) -> Result<f64, MathError>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
    D2: Fn(f64) -> f64,
{
    let atol = 10_f64.powf(-abs_tol_nlog);
    let rtol = 10_f64.powf(-rel_tol_nlog);
    let max_iterations = 10_f64.powf(max_iter_log).floor().max(1.0) as u64;
    let mut step = f64::INFINITY;
    for _ in 0..max_iterations {
        let fx = f(x);
        let fp = df(x);
        let fpp = d2f(x);
        let denom = 2.0 * fp * fp - fx * fpp;
        if denom == 0.0 {
            return Err(MathError::DomainError {
                what: format!("vanishing Halley denominator at x = {}", x),
            });
        }
        step = -2.0 * fx * fp / denom;
        x += step;
        if step.abs() < atol + rtol * x.abs() {
            return Ok(x);
        }
    }
    Err(MathError::ConvergenceFailed {
        iterations: max_iterations,
        residual: step,
    })
}

/// Inversion of a monotonic scalar function by loss minimization.
///
/// `eval(y)` finds the x minimizing `(f(x) - y)^2` over the stated domain
/// with Brent's method. Monotonicity is probed at two reference points; the
/// probe failing means the function is not invertible over the domain. Open
/// endpoints are pushed inward by a relative epsilon before the minimizer
/// sees them.
pub struct BrentInverse<F> {
    f: F,
    domain: (f64, f64),
    open: (bool, bool),
    range: (f64, f64),
    minimizer: BrentMinimizer,
}

impl<F: Fn(f64) -> f64> BrentInverse<F> {
    /// An inverse over the whole real line.
    pub fn new(f: F) -> Self {
        Self {
            f,
            domain: (f64::NEG_INFINITY, f64::INFINITY),
            open: (false, false),
            range: (f64::NEG_INFINITY, f64::INFINITY),
            minimizer: BrentMinimizer::default(),
        }
    }

    /// An inverse with explicit domain (per-endpoint open flags) and range.
    pub fn with_bounds(
        f: F,
        domain: (f64, f64),
        open: (bool, bool),
        range: (f64, f64),
    ) -> Result<Self, MathError> {
        if domain.0 >= domain.1 {
            return Err(MathError::InvalidArgument {
                what: format!("mis-ordered domain [{}, {}]", domain.0, domain.1),
            });
        }
        Ok(Self {
            f,
            domain,
            open,
            range,
            minimizer: BrentMinimizer::default(),
        })
    }

    /// The working domain after pushing open endpoints inward.
    fn effective_domain(&self) -> (f64, f64) {
        let mut lo = self.domain.0;
        let mut hi = self.domain.1;
        if self.open.0 && lo.is_finite() {
            lo += f64::EPSILON.sqrt() * (1.0 + lo.abs());
        }
        if self.open.1 && hi.is_finite() {
            hi -= f64::EPSILON.sqrt() * (1.0 + hi.abs());
        }
        (lo, hi)
    }

    /// Two probe abscissae inside the domain, used for the trend check and
    /// as minimizer seeds.
    fn reference_points(&self) -> (f64, f64) {
        let (lo, hi) = self.effective_domain();
        match (lo.is_finite(), hi.is_finite()) {
            (true, true) => (lo + (hi - lo) / 4.0, hi - (hi - lo) / 4.0),
            (true, false) => (lo + 1.0, lo + 2.0),
            (false, true) => (hi - 2.0, hi - 1.0),
            (false, false) => (-1.0, 1.0),
        }
    }

    /// Evaluates the inverse at y.
    pub fn eval(&self, y: f64) -> Result<f64, MathError> {
        if y < self.range.0 || y > self.range.1 {
            return Err(MathError::DomainError {
                what: format!(
                    "{} outside the stated range [{}, {}]",
                    y, self.range.0, self.range.1
                ),
            });
        }
        let (r1, r2) = self.reference_points();
        let f1 = (self.f)(r1);
        let f2 = (self.f)(r2);
        if f1 == f2 {
            return Err(MathError::DomainError {
                what: "function is not monotonic over the probe points".to_string(),
            });
        }

        let (lo, hi) = self.effective_domain();
        let loss = |x: f64| {
            let clamped = x.clamp(lo, hi);
            let diff = (self.f)(clamped) - y;
            // Distance-to-domain penalty keeps the minimizer inside.
            diff * diff + (x - clamped).abs()
        };

        let mut seeds = vec![r1, r2];
        if lo.is_finite() {
            seeds.insert(0, lo);
        }
        if hi.is_finite() {
            seeds.push(hi);
        }
        let br = bracket_from_points(&loss, &seeds)?;
        let (x, residual) = self.minimizer.minimize(&loss, &br)?;
        let x = x.clamp(lo, hi);

        // The loss at a genuine inverse is ~ squared tolerance.
        let tol = 10_f64.powf(-self.minimizer.tolerance_nlog);
        if residual.sqrt() > tol.sqrt() * (1.0 + y.abs()) {
            return Err(MathError::DomainError {
                what: format!("no x in the domain maps to {} (residual {:.3e})", y, residual),
            });
        }
        Ok(x)
    }
}

#[cfg(test)]
mod ut_root_finding {
    use super::*;

    #[test]
    fn bisection_inverts_cubic() {
        let solver = Bisection::new(|x: f64| x.powi(3), (-4.0, 4.0));
        let x = solver.run(8.0).unwrap();
        assert!((x - 2.0).abs() < 1e-10);
    }

    #[test]
    fn bisection_rejects_unsigned_bracket() {
        let solver = Bisection::new(|x: f64| x * x + 1.0, (-1.0, 1.0));
        assert!(matches!(
            solver.run(0.0),
            Err(MathError::DomainError { .. })
        ));
    }

    #[test]
    fn newton_sqrt2() {
        let x = newton(
            |x| x * x - 2.0,
            |x| 2.0 * x,
            1.0,
            1.7,
            12.0,
            f64::INFINITY,
        )
        .unwrap();
        assert!((x - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn halley_matches_newton() {
        let x = halley(
            |x| x * x * x - 8.0,
            |x| 3.0 * x * x,
            |x| 6.0 * x,
            3.0,
            1.7,
            12.0,
            f64::INFINITY,
        )
        .unwrap();
        assert!((x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn householder_order_one_is_newton() {
        let solver = HouseholderIterator::new(vec![
            Box::new(|x: f64| x * x - 2.0),
            Box::new(|x: f64| 2.0 * x),
        ])
        .unwrap();
        assert_eq!(solver.order(), 1);
        let x = solver.run(1.0).unwrap();
        assert!((x - 2.0_f64.sqrt()).abs() < 1e-7);
    }

    #[test]
    fn householder_order_three() {
        // exp(x) - 10 with three derivatives (all exp).
        let solver = HouseholderIterator::new(vec![
            Box::new(|x: f64| x.exp() - 10.0),
            Box::new(|x: f64| x.exp()),
            Box::new(|x: f64| x.exp()),
            Box::new(|x: f64| x.exp()),
        ])
        .unwrap();
        assert_eq!(solver.order(), 3);
        let x = solver.run(2.0).unwrap();
        assert!((x - 10.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn householder_requires_a_derivative() {
        let got = HouseholderIterator::new(vec![Box::new(|x: f64| x)]);
        assert!(matches!(
            got,
            Err(MathError::InsufficientDerivatives {
                supplied: 1,
                required: 2
            })
        ));
    }

    #[test]
    fn brent_inverse_exponential() {
        let inv = BrentInverse::new(|x: f64| x.exp());
        let x = inv.eval(10.0).unwrap();
        assert!((x - 10.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn brent_inverse_bounded_domain() {
        // sqrt on [0, inf), open at 0.
        let inv = BrentInverse::with_bounds(
            |x: f64| x.sqrt(),
            (0.0, f64::INFINITY),
            (true, false),
            (0.0, f64::INFINITY),
        )
        .unwrap();
        let x = inv.eval(3.0).unwrap();
        assert!((x - 9.0).abs() < 1e-6);
    }

    #[test]
    fn brent_inverse_round_trip() {
        let f = |x: f64| x.tanh();
        let inv = BrentInverse::with_bounds(f, (-5.0, 5.0), (false, false), (-1.0, 1.0)).unwrap();
        for y in [-0.9, -0.5, 0.0, 0.3, 0.8] {
            let x = inv.eval(y).unwrap();
            assert!((f(x) - y).abs() < 1e-7, "f(inv({})) off by {:e}", y, (f(x) - y).abs());
        }
    }
}
