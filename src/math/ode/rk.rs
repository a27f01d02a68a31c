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

use super::tableaux::{ButcherTableau, RK23, RK45};
use super::{OdeRhs, OdeState};
use crate::errors::MathError;
use crate::math::matrix::DenseMatrix;

const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
const FACTOR_SAFE: f64 = 0.9;

/// One frozen interpolant: the dense output of a single accepted step.
#[derive(Clone, Debug)]
struct DenseSegment {
    order: usize,
    t_start: f64,
    t_end: f64,
    y_start: Vec<f64>,
    /// dim x order interpolation matrix, `Q = K^T * P`.
    q: DenseMatrix,
}

impl DenseSegment {
    fn eval(&self, t: f64) -> Vec<f64> {
        let h = self.t_end - self.t_start;
        let s = (t - self.t_start) / h;
        // Power vector [s, s^2, ..., s^order].
        let mut powers = Vec::with_capacity(self.order);
        let mut acc = 1.0;
        for _ in 0..self.order {
            acc *= s;
            powers.push(acc);
        }
        let correction = self.q.try_mul_vec(&powers).expect("Q shape is fixed");
        self.y_start
            .iter()
            .zip(correction.iter())
            .map(|(y0, dy)| y0 + h * dy)
            .collect()
    }
}

/// Embedded explicit Runge-Kutta integrator with adaptive step control and
/// dense output.
///
/// The state machine follows `init` -> repeated `step` (each appending one
/// accepted state) with `save_dense_output` freezing the interpolant of
/// the step just taken -> `Succeeded` once the endpoint is hit. `eval`
/// answers y(t) anywhere inside the integrated span from the stored
/// interpolants.
pub struct RungeKutta {
    rhs: OdeRhs,
    tableau: &'static ButcherTableau,
    dim: usize,
    state: OdeState,
    direction: f64,
    t: f64,
    t_prev: f64,
    t_end: f64,
    y: Vec<f64>,
    y_prev: Vec<f64>,
    f_current: Vec<f64>,
    h_abs: f64,
    /// Stage derivatives of the last accepted step, (stages + 1) x dim.
    k: Vec<Vec<f64>>,
    history: Vec<(f64, Vec<f64>)>,
    segments: Vec<DenseSegment>,
    /// Absolute tolerance, negative log. Default 6.
    pub abs_tol_nlog: f64,
    /// Relative tolerance, negative log. Default 3.
    pub rel_tol_nlog: f64,
    /// Largest admissible |h|. Default unbounded.
    pub max_step: f64,
}

impl RungeKutta {
    /// A Bogacki-Shampine 2(3) engine for a system of `dim` equations.
    pub fn rk23(rhs: OdeRhs, dim: usize) -> Self {
        Self::with_tableau(rhs, dim, &RK23)
    }

    /// A Dormand-Prince 4(5) engine, the default choice.
    pub fn rk45(rhs: OdeRhs, dim: usize) -> Self {
        Self::with_tableau(rhs, dim, &RK45)
    }

    pub fn with_tableau(rhs: OdeRhs, dim: usize, tableau: &'static ButcherTableau) -> Self {
        Self {
            rhs,
            tableau,
            dim,
            state: OdeState::Failed,
            direction: 1.0,
            t: 0.0,
            t_prev: 0.0,
            t_end: 0.0,
            y: vec![0.0; dim],
            y_prev: vec![0.0; dim],
            f_current: vec![0.0; dim],
            h_abs: f64::NAN,
            k: vec![vec![0.0; dim]; tableau.stages + 1],
            history: Vec::new(),
            segments: Vec::new(),
            abs_tol_nlog: 6.0,
            rel_tol_nlog: 3.0,
            max_step: f64::INFINITY,
        }
    }

    /// Initializes the integration from `y0` at `first` towards `last`,
    /// selecting the initial step automatically.
    pub fn init(&mut self, y0: &[f64], first: f64, last: f64) -> Result<(), MathError> {
        self.init_with_step(y0, first, last, f64::NAN)
    }

    /// Initializes with an explicit initial step; NaN selects it
    /// automatically from the local derivative scale.
    pub fn init_with_step(
        &mut self,
        y0: &[f64],
        first: f64,
        last: f64,
        init_step: f64,
    ) -> Result<(), MathError> {
        if y0.len() != self.dim {
            return Err(MathError::IncompatibleShape {
                cols: 1,
                rows: y0.len(),
                expected_cols: 1,
                expected_rows: self.dim,
            });
        }
        if first == last || !first.is_finite() || !last.is_finite() {
            return Err(MathError::InvalidArgument {
                what: format!("degenerate integration span [{}, {}]", first, last),
            });
        }
        self.clear();
        self.t = first;
        self.t_prev = first;
        self.t_end = last;
        self.direction = (last - first).signum();
        self.y = y0.to_vec();
        self.y_prev = y0.to_vec();
        self.f_current = (self.rhs)(first, y0);
        if self.f_current.len() != self.dim {
            return Err(MathError::IncompatibleShape {
                cols: 1,
                rows: self.f_current.len(),
                expected_cols: 1,
                expected_rows: self.dim,
            });
        }
        self.h_abs = if init_step.is_nan() {
            self.select_initial_step()
        } else {
            init_step.abs()
        };
        self.history.push((first, y0.to_vec()));
        self.state = OdeState::Processing;
        Ok(())
    }

    /// Resets all buffers; `init` must be called again before stepping.
    pub fn clear(&mut self) {
        self.history.clear();
        self.segments.clear();
        self.state = OdeState::Failed;
        self.h_abs = f64::NAN;
    }

    pub fn state(&self) -> OdeState {
        self.state
    }

    pub fn current_point(&self) -> f64 {
        self.t
    }

    pub fn prev_point(&self) -> f64 {
        self.t_prev
    }

    /// The absolute length of the last accepted step.
    pub fn size(&self) -> f64 {
        (self.t - self.t_prev).abs()
    }

    /// The ordered (time, state) buffer accumulated so far.
    pub fn solutions(&self) -> &[(f64, Vec<f64>)] {
        &self.history
    }

    fn atol(&self) -> f64 {
        10_f64.powf(-self.abs_tol_nlog)
    }

    fn rtol(&self) -> f64 {
        10_f64.powf(-self.rel_tol_nlog)
    }

    /// Automatic initial step: balances the local derivative magnitude
    /// against the tolerance scale, refined by one Euler probe.
    fn select_initial_step(&self) -> f64 {
        let atol = self.atol();
        let rtol = self.rtol();
        let scale: Vec<f64> = self.y.iter().map(|y| atol + rtol * y.abs()).collect();
        let d0 = rms_ratio(&self.y, &scale);
        let d1 = rms_ratio(&self.f_current, &scale);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };

        let y1: Vec<f64> = self
            .y
            .iter()
            .zip(self.f_current.iter())
            .map(|(y, f)| y + h0 * self.direction * f)
            .collect();
        let f1 = (self.rhs)(self.t + h0 * self.direction, &y1);
        let diff: Vec<f64> = f1
            .iter()
            .zip(self.f_current.iter())
            .map(|(a, b)| a - b)
            .collect();
        let d2 = rms_ratio(&diff, &scale) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / (self.tableau.error_order as f64 + 1.0))
        };
        (100.0 * h0)
            .min(h1)
            .min(self.max_step)
            .min((self.t_end - self.t).abs())
    }

    /// Advances one accepted step, retrying with contracted steps while
    /// the scaled error norm exceeds one.
    pub fn step(&mut self) -> Result<(), MathError> {
        match self.state {
            OdeState::Processing => {}
            _ => {
                return Err(MathError::InvalidArgument {
                    what: "step called on a finished or uninitialized engine".to_string(),
                })
            }
        }
        let atol = self.atol();
        let rtol = self.rtol();
        let min_step = 10.0 * f64::EPSILON * self.t.abs().max(1.0);
        let mut h_abs = self.h_abs.min(self.max_step);
        let err_exponent = -1.0 / (self.tableau.error_order as f64 + 1.0);

        loop {
            if h_abs < min_step {
                self.state = OdeState::Failed;
                return Err(MathError::ConvergenceFailed {
                    iterations: 0,
                    residual: h_abs,
                });
            }
            let mut h = h_abs * self.direction;
            let mut t_new = self.t + h;
            // The final step lands exactly on the endpoint.
            if self.direction * (t_new - self.t_end) > 0.0 {
                t_new = self.t_end;
                h = t_new - self.t;
                h_abs = h.abs();
            }

            // Stage cascade.
            self.k[0].clone_from(&self.f_current);
            let mut a_idx = 0;
            for i in 1..self.tableau.stages {
                let mut yi = self.y.clone();
                for (j, kj) in self.k[0..i].iter().enumerate() {
                    let aij = self.tableau.a[a_idx + j];
                    if aij != 0.0 {
                        for (y, k) in yi.iter_mut().zip(kj.iter()) {
                            *y += h * aij * k;
                        }
                    }
                }
                a_idx += i;
                self.k[i] = (self.rhs)(self.t + self.tableau.c[i] * h, &yi);
            }

            let mut y_new = self.y.clone();
            for (i, b) in self.tableau.b.iter().enumerate() {
                if *b != 0.0 {
                    for (y, k) in y_new.iter_mut().zip(self.k[i].iter()) {
                        *y += h * b * k;
                    }
                }
            }
            let f_new = (self.rhs)(t_new, &y_new);
            self.k[self.tableau.stages].clone_from(&f_new);

            let mut error = vec![0.0; self.dim];
            for (i, e) in self.tableau.e.iter().enumerate() {
                if *e != 0.0 {
                    for (err, k) in error.iter_mut().zip(self.k[i].iter()) {
                        *err += h * e * k;
                    }
                }
            }
            let scale: Vec<f64> = self
                .y
                .iter()
                .zip(y_new.iter())
                .map(|(a, b)| atol + rtol * a.abs().max(b.abs()))
                .collect();
            let norm = rms_ratio(&error, &scale);

            let factor = if norm == 0.0 {
                MAX_FACTOR
            } else {
                MAX_FACTOR.min(MIN_FACTOR.max(FACTOR_SAFE * norm.powf(err_exponent)))
            };
            if norm <= 1.0 {
                // Accept.
                self.t_prev = self.t;
                self.y_prev = std::mem::replace(&mut self.y, y_new);
                self.t = t_new;
                self.f_current = f_new;
                self.h_abs = (h_abs * factor).min(self.max_step);
                self.history.push((self.t, self.y.clone()));
                if self.t == self.t_end {
                    self.state = OdeState::Succeeded;
                }
                return Ok(());
            }
            // Reject: contract and retry.
            h_abs *= factor;
        }
    }

    /// Freezes the dense-output interpolant of the step just taken.
    pub fn save_dense_output(&mut self) {
        if self.t == self.t_prev {
            return;
        }
        // K as a (stages + 1)-column matrix of dim-row stage derivatives,
        // so K^T * P has one interpolation row per equation.
        let k_matrix = DenseMatrix::from_columns(&self.k);
        let p = DenseMatrix::from_row_major(
            self.tableau.dense_order,
            self.tableau.stages + 1,
            self.tableau.p,
        )
        .expect("tableau dense matrix is well-formed");
        let q = k_matrix.try_mul(&p).expect("K and P shapes are fixed");
        self.segments.push(DenseSegment {
            order: self.tableau.dense_order,
            t_start: self.t_prev,
            t_end: self.t,
            y_start: self.y_prev.clone(),
            q,
        });
    }

    /// Interpolates the solution at `t` from the stored dense segments.
    pub fn eval(&self, t: f64) -> Result<Vec<f64>, MathError> {
        let last = self.segments.last().ok_or_else(|| MathError::DomainError {
            what: "no dense output saved yet".to_string(),
        })?;
        let first = &self.segments[0];
        let inside = self.direction * (t - first.t_start) >= 0.0
            && self.direction * (last.t_end - t) >= 0.0;
        if !inside {
            return Err(MathError::DomainError {
                what: format!(
                    "{} outside the integrated span [{}, {}]",
                    t, first.t_start, last.t_end
                ),
            });
        }
        // Binary search for the bracketing segment.
        let mut lo = 0usize;
        let mut hi = self.segments.len() - 1;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.direction * (t - self.segments[mid].t_end) > 0.0 {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(self.segments[lo].eval(t))
    }

    /// Drives a fresh engine from `(y0, first)` to `last`, saving dense
    /// output each step.
    pub fn solve(
        rhs: OdeRhs,
        y0: &[f64],
        first: f64,
        last: f64,
    ) -> Result<Self, MathError> {
        let mut engine = Self::rk45(rhs, y0.len());
        engine.init(y0, first, last)?;
        while engine.state() == OdeState::Processing {
            engine.step()?;
            engine.save_dense_output();
        }
        Ok(engine)
    }
}

/// RMS of the elementwise ratio a / scale.
fn rms_ratio(a: &[f64], scale: &[f64]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let sum: f64 = a
        .iter()
        .zip(scale.iter())
        .map(|(x, s)| (x / s) * (x / s))
        .sum();
    (sum / a.len() as f64).sqrt()
}

#[cfg(test)]
mod ut_rk {
    use super::*;

    #[test]
    fn exponential_growth_to_e() {
        // Default tolerances (atol 1e-6, rtol 1e-3).
        let engine = RungeKutta::solve(
            Box::new(|_t, y: &[f64]| vec![y[0]]),
            &[1.0],
            0.0,
            1.0,
        )
        .unwrap();
        assert_eq!(engine.state(), OdeState::Succeeded);
        let y_end = engine.solutions().last().unwrap().1[0];
        assert!(
            (y_end - std::f64::consts::E).abs() < 1e-4,
            "y(1) = {}",
            y_end
        );

        // Tightened tolerances reach 1e-8.
        let mut engine = RungeKutta::rk45(Box::new(|_t, y: &[f64]| vec![y[0]]), 1);
        engine.abs_tol_nlog = 12.0;
        engine.rel_tol_nlog = 12.0;
        engine.init(&[1.0], 0.0, 1.0).unwrap();
        while engine.state() == OdeState::Processing {
            engine.step().unwrap();
        }
        let y_end = engine.solutions().last().unwrap().1[0];
        assert!(
            (y_end - std::f64::consts::E).abs() < 1e-8,
            "tight y(1) = {}",
            y_end
        );
    }

    #[test]
    fn rk23_also_converges() {
        let mut engine = RungeKutta::rk23(Box::new(|_t, y: &[f64]| vec![y[0]]), 1);
        engine.init(&[1.0], 0.0, 1.0).unwrap();
        while engine.state() == OdeState::Processing {
            engine.step().unwrap();
            engine.save_dense_output();
        }
        let y_end = engine.solutions().last().unwrap().1[0];
        assert!((y_end - std::f64::consts::E).abs() < 1e-3, "y(1) = {}", y_end);
    }

    #[test]
    fn dense_output_matches_closed_form() {
        let mut engine = RungeKutta::rk45(Box::new(|t: f64, _y: &[f64]| vec![t.cos()]), 1);
        engine.abs_tol_nlog = 10.0;
        engine.rel_tol_nlog = 10.0;
        engine.init(&[0.0], 0.0, 6.0).unwrap();
        while engine.state() == OdeState::Processing {
            engine.step().unwrap();
            engine.save_dense_output();
        }
        for i in 0..=60 {
            let t = 0.1 * i as f64;
            let y = engine.eval(t).unwrap()[0];
            assert!(
                (y - t.sin()).abs() < 1e-7,
                "y({}) = {} vs {}",
                t,
                y,
                t.sin()
            );
        }
    }

    #[test]
    fn backward_integration() {
        let mut engine = RungeKutta::rk45(Box::new(|_t, y: &[f64]| vec![y[0]]), 1);
        engine.init(&[1.0], 0.0, -1.0).unwrap();
        while engine.state() == OdeState::Processing {
            engine.step().unwrap();
            engine.save_dense_output();
        }
        let y_end = engine.solutions().last().unwrap().1[0];
        assert!(
            (y_end - (-1.0_f64).exp()).abs() < 1e-7,
            "y(-1) = {}",
            y_end
        );
        // Dense query inside the backward span.
        let y_mid = engine.eval(-0.5).unwrap()[0];
        assert!((y_mid - (-0.5_f64).exp()).abs() < 1e-6);
    }

    #[test]
    fn eval_outside_span_is_rejected() {
        let engine = RungeKutta::solve(
            Box::new(|_t, y: &[f64]| vec![-y[0]]),
            &[1.0],
            0.0,
            2.0,
        )
        .unwrap();
        assert!(engine.eval(2.5).is_err());
        assert!(engine.eval(-0.1).is_err());
        assert!(engine.eval(1.0).is_ok());
    }

    #[test]
    fn harmonic_oscillator_energy() {
        // y'' = -y as a 2-system; the energy y^2 + v^2 stays near 1.
        let mut engine =
            RungeKutta::rk45(Box::new(|_t, y: &[f64]| vec![y[1], -y[0]]), 2);
        engine.abs_tol_nlog = 9.0;
        engine.rel_tol_nlog = 9.0;
        engine.init(&[1.0, 0.0], 0.0, 20.0 * std::f64::consts::PI).unwrap();
        while engine.state() == OdeState::Processing {
            engine.step().unwrap();
        }
        let last = &engine.solutions().last().unwrap().1;
        let energy = last[0] * last[0] + last[1] * last[1];
        assert!((energy - 1.0).abs() < 1e-5, "energy drift {}", energy);
    }

    #[test]
    fn init_validates_dimensions() {
        let mut engine = RungeKutta::rk45(Box::new(|_t, y: &[f64]| vec![y[0]]), 1);
        assert!(engine.init(&[1.0, 2.0], 0.0, 1.0).is_err());
        assert!(engine.init(&[1.0], 0.0, 0.0).is_err());
    }

    #[test]
    fn fixed_initial_step_is_honored() {
        let mut engine = RungeKutta::rk45(Box::new(|_t, y: &[f64]| vec![y[0]]), 1);
        engine.init_with_step(&[1.0], 0.0, 1.0, 0.25).unwrap();
        engine.step().unwrap();
        // First step cannot exceed the requested size.
        assert!(engine.size() <= 0.25 + 1e-12);
    }
}
