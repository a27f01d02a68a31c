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
use crate::math::iterate::{drive, IterationState, RefinementStep};
use crate::math::matrix::DenseMatrix;
use crate::math::quadrature::DefiniteIntegrator;
use crate::math::specfun::{binomial_f, inverse_vandermonde};
use statrs::function::gamma::gamma;
use std::sync::Arc;

/// Finite-difference direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FdDirection {
    Center,
    Forward,
    Backward,
}

/// First-derivative engine by adaptive finite differences.
///
/// The stencil has `fdm_order` + 1 nodes (central stencils skip the zero
/// node, whose first-derivative weight vanishes) and its weights come from
/// one Vandermonde inversion per call. The step is repeatedly divided by
/// `step_factor`; iteration stops when the successive-estimate error drops
/// below tolerance or starts increasing, in which case the best recorded
/// estimate is returned.
#[derive(Copy, Clone, Debug)]
pub struct AdaptiveDerivative {
    pub direction: FdDirection,
    /// Stencil accuracy order; must be even. Default 8.
    pub fdm_order: usize,
    /// Default 0.5.
    pub initial_step: f64,
    /// Step shrink factor per iteration, > 1. Default 2.
    pub step_factor: f64,
    /// Absolute tolerance, negative log. Default 300 (practically off).
    pub abs_tol_nlog: f64,
    /// Relative tolerance, negative log. Default 7.5.
    pub rel_tol_nlog: f64,
    /// Iteration cap, log. Default 1 (10 iterations).
    pub max_iter_log: f64,
}

impl Default for AdaptiveDerivative {
    fn default() -> Self {
        Self {
            direction: FdDirection::Center,
            fdm_order: 8,
            initial_step: 0.5,
            step_factor: 2.0,
            abs_tol_nlog: 300.0,
            rel_tol_nlog: 7.5,
            max_iter_log: 1.0,
        }
    }
}

/// Transient state of one adaptive finite-difference evaluation.
struct FdIteration {
    input: f64,
    offsets: Vec<f64>,
    weights: Vec<f64>,
    step: f64,
    step_factor: f64,
    abs_tol: f64,
    rel_tol: f64,
    output: f64,
    error: f64,
    last_output: f64,
    last_error: f64,
    best_output: f64,
    best_error: f64,
    state: IterationState,
}

impl FdIteration {
    fn new(engine: &AdaptiveDerivative, x: f64) -> Result<Self, MathError> {
        if engine.fdm_order == 0 || engine.fdm_order % 2 != 0 {
            return Err(MathError::InvalidArgument {
                what: format!("finite-difference order {} is not even", engine.fdm_order),
            });
        }
        if engine.step_factor <= 1.0 {
            return Err(MathError::InvalidArgument {
                what: format!("step factor {} must exceed 1", engine.step_factor),
            });
        }
        let n = engine.fdm_order;
        let half = (n / 2) as i64;
        // Offsets are normalized so the widest node sits at one step from
        // the evaluation point.
        let offsets: Vec<f64> = match engine.direction {
            FdDirection::Center => (-half..=half)
                .filter(|o| *o != 0)
                .map(|o| o as f64 / half as f64)
                .collect(),
            FdDirection::Forward => (0..=n as i64).map(|o| o as f64 / n as f64).collect(),
            FdDirection::Backward => (0..=n as i64).map(|o| -o as f64 / n as f64).collect(),
        };
        let weights = first_derivative_weights(&offsets)?;
        Ok(Self {
            input: x,
            offsets,
            weights,
            step: engine.initial_step,
            step_factor: engine.step_factor,
            abs_tol: 10_f64.powf(-engine.abs_tol_nlog),
            rel_tol: 10_f64.powf(-engine.rel_tol_nlog),
            output: f64::NAN,
            error: f64::NAN,
            last_output: f64::NAN,
            last_error: f64::NAN,
            best_output: f64::NAN,
            best_error: f64::INFINITY,
            state: IterationState::InProgress,
        })
    }
}

impl RefinementStep for FdIteration {
    fn pre_evaluate(&mut self) -> DenseMatrix {
        DenseMatrix::from_vec(
            self.offsets
                .iter()
                .map(|o| self.input + o * self.step)
                .collect(),
        )
    }

    fn post_evaluate(&mut self, _x: &DenseMatrix, fx: &DenseMatrix) {
        let mut acc = 0.0;
        for (w, f) in self.weights.iter().zip(fx.iter()) {
            acc += w * f;
        }
        let estimate = acc / self.step;
        if !estimate.is_finite() {
            self.state = IterationState::ValueError;
            return;
        }
        self.last_output = self.output;
        self.last_error = self.error;
        self.output = estimate;
        self.error = (estimate - self.last_output).abs();
        if self.error < self.best_error {
            self.best_error = self.error;
            self.best_output = estimate;
        }
        self.step /= self.step_factor;
    }

    fn check_terminate(&mut self) -> bool {
        match self.state {
            IterationState::ValueError => true,
            _ => {
                if self.error.is_nan() {
                    // Only one estimate so far.
                    return false;
                }
                if self.error < self.abs_tol.max(self.rel_tol * self.output.abs()) {
                    self.state = IterationState::Finished;
                    true
                } else if !self.last_error.is_nan() && self.error > self.last_error {
                    self.state = IterationState::ErrorIncrease;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn state(&self) -> IterationState {
        self.state
    }
}

/// First-derivative stencil weights on the given offsets: the solution of
/// the Vandermonde system reproducing the derivative of each monomial.
fn first_derivative_weights(offsets: &[f64]) -> Result<Vec<f64>, MathError> {
    let inv = inverse_vandermonde(offsets)?;
    let mut rhs = vec![0.0; offsets.len()];
    if rhs.len() > 1 {
        rhs[1] = 1.0;
    }
    inv.try_mul_vec(&rhs)
}

impl AdaptiveDerivative {
    /// Numerically differentiates `f` at `x`.
    pub fn eval<F: Fn(f64) -> f64>(&self, f: F, x: f64) -> Result<f64, MathError> {
        let mut iteration = FdIteration::new(self, x)?;
        let counters = drive(&mut iteration, f, self.max_iter_log);
        match iteration.state() {
            IterationState::ValueError => Err(MathError::DomainError {
                what: format!("non-finite finite-difference sample near x = {}", x),
            }),
            IterationState::Finished | IterationState::ErrorIncrease => Ok(iteration.best_output),
            IterationState::InProgress => {
                // Iteration cap: soft by default, return the best estimate.
                debug!(
                    "finite-difference cap of {} iterations hit (error {:.3e})",
                    counters.iterations, iteration.best_error
                );
                Ok(iteration.best_output)
            }
        }
    }
}

/// Fractional-order derivative engine bundling three evaluation modes:
/// integer-order Grünwald-Letnikov binomial differences, and the
/// Riemann-Liouville and Caputo extensions to non-integer order.
///
/// The definite-integration engine is shared by handle, so one configured
/// integrator may serve several derivative instances. The integration base
/// point `c` is always explicit.
pub struct FractionalDerivative {
    f: Arc<dyn Fn(f64) -> f64>,
    order: f64,
    base_point: f64,
    engine: Arc<dyn DefiniteIntegrator>,
    /// Initial step as a negative log. Default 3 (h = 1e-3).
    pub init_step_nlog: f64,
    /// Step shrink factor. Default 10.
    pub step_factor: f64,
    /// Absolute tolerance, negative log. Default 300 (practically off).
    pub abs_tol_nlog: f64,
    /// Relative tolerance, negative log. Default 7.5.
    pub rel_tol_nlog: f64,
    /// Iteration cap, log. Default 3.
    pub max_iter_log: f64,
}

impl FractionalDerivative {
    pub fn new(
        f: Arc<dyn Fn(f64) -> f64>,
        order: f64,
        base_point: f64,
        engine: Arc<dyn DefiniteIntegrator>,
    ) -> Result<Self, MathError> {
        if order < 0.0 {
            return Err(MathError::InvalidArgument {
                what: format!("derivative order {} is negative", order),
            });
        }
        Ok(Self {
            f,
            order,
            base_point,
            engine,
            init_step_nlog: 3.0,
            step_factor: 10.0,
            abs_tol_nlog: 300.0,
            rel_tol_nlog: 7.5,
            max_iter_log: 3.0,
        })
    }

    pub fn order(&self) -> f64 {
        self.order
    }

    /// Integer-order derivative by the Grünwald-Letnikov limit
    /// `f^(n)(x) = lim h^-n sum_j (-1)^j C(n,j) f(x - j h)`, with adaptive
    /// step shrinking and error-increase tracking.
    pub fn binomial(&self, x: f64) -> Result<f64, MathError> {
        let n = self.order.round() as u64;
        self.binomial_of(&*self.f, x, n)
    }

    fn binomial_of<F: Fn(f64) -> f64 + ?Sized>(
        &self,
        f: &F,
        x: f64,
        n: u64,
    ) -> Result<f64, MathError> {
        if n == 0 {
            return Ok(f(x));
        }
        let abs_tol = 10_f64.powf(-self.abs_tol_nlog);
        let rel_tol = 10_f64.powf(-self.rel_tol_nlog);
        let max_iterations = 10_f64.powf(self.max_iter_log).floor().max(1.0) as u64;

        let weights: Vec<f64> = (0..=n)
            .map(|j| {
                let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
                sign * binomial_f(n, j)
            })
            .collect();

        let mut h = 10_f64.powf(-self.init_step_nlog);
        let mut output = f64::NAN;
        let mut error = f64::NAN;
        let mut best = (f64::NAN, f64::INFINITY);
        for _ in 0..max_iterations {
            let mut acc = 0.0;
            for (j, w) in weights.iter().enumerate() {
                acc += w * f(x - j as f64 * h);
            }
            let estimate = acc / h.powi(n as i32);
            if !estimate.is_finite() {
                return Err(MathError::DomainError {
                    what: format!("non-finite binomial-difference sample near x = {}", x),
                });
            }
            let last_output = output;
            let last_error = error;
            output = estimate;
            error = (estimate - last_output).abs();
            if error < best.1 {
                best = (estimate, error);
            }
            if !error.is_nan() {
                if error < abs_tol.max(rel_tol * output.abs()) {
                    return Ok(best.0);
                }
                if !last_error.is_nan() && error > last_error {
                    return Ok(best.0);
                }
            }
            h /= self.step_factor;
        }
        Ok(best.0)
    }

    /// The ceiling order n and the kernel exponent n - alpha - 1.
    fn kernel_parts(&self) -> (u64, f64) {
        let n = self.order.ceil().max(1.0) as u64;
        (n, n as f64 - self.order - 1.0)
    }

    /// Riemann-Liouville derivative: integrate first, then take the n-th
    /// integer derivative of the integral map.
    pub fn riemann_liouville(&self, x: f64) -> Result<f64, MathError> {
        let (n, exponent) = self.kernel_parts();
        let c = self.base_point;
        let f = Arc::clone(&self.f);
        let engine = Arc::clone(&self.engine);
        let inner = move |upper: f64| -> f64 {
            let integrand = |t: f64| (upper - t).max(0.0).powf(exponent) * f(t);
            engine.integrate(&integrand, c, upper).unwrap_or(f64::NAN)
        };
        let outer = self.binomial_of(&inner, x, n)?;
        Ok(outer / gamma(n as f64 - self.order))
    }

    /// Caputo derivative: differentiate first, then integrate; the same
    /// kernel with the operation order swapped.
    pub fn caputo(&self, x: f64) -> Result<f64, MathError> {
        let (n, exponent) = self.kernel_parts();
        let failure = std::cell::Cell::new(None);
        let integrand = |t: f64| match self.binomial_of(&*self.f, t, n) {
            Ok(d) => (x - t).max(0.0).powf(exponent) * d,
            Err(_) => {
                failure.set(Some(t));
                f64::NAN
            }
        };
        let result = self.engine.integrate(&integrand, self.base_point, x)?;
        if let Some(t) = failure.get() {
            return Err(MathError::DomainError {
                what: format!("inner derivative failed at t = {} from Caputo integration", t),
            });
        }
        Ok(result / gamma(n as f64 - self.order))
    }

    /// Dispatching evaluation: integer order goes to the binomial
    /// difference; fractional order with base point 0 prefers Caputo (the
    /// initial value survives the operator), anything else goes through
    /// Riemann-Liouville.
    pub fn eval(&self, x: f64) -> Result<f64, MathError> {
        if (self.order - self.order.round()).abs() < f64::EPSILON {
            return self.binomial(x);
        }
        warn!(
            "fractional derivative of order {} is a high-latency path (nested quadrature)",
            self.order
        );
        if self.base_point == 0.0 {
            self.caputo(x)
        } else {
            self.riemann_liouville(x)
        }
    }
}
