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

//! Izzo's solution of Lambert's problem, multi-revolution included.
//!
//! The transfer is non-dimensionalized to a single variable x (ellipse
//! |x| < 1, parabola x = 1, hyperbola x > 1); the time of flight T(x) is
//! evaluated by the Battin series near the parabola, the Lancaster
//! formulation away from it, and the Lagrange closed form otherwise; the
//! root of T(x) = T_requested is found by third-order Householder
//! iteration per revolution branch.

use crate::astro::orbit::{state_to_elements, KeplerianOrbitElems, OrbitStateVectors};
use crate::errors::AstroError;
use crate::time::Epoch;
use crate::linalg::Vector3;
use std::f64::consts::PI;

/// A Lambert boundary-value problem: two position vectors, a time of
/// flight, and the transfer sense.
#[derive(Clone, Debug)]
pub struct LambertProblem {
    /// Gravitational parameter, consistent units with the radii and time.
    pub mu: f64,
    pub r_init: Vector3<f64>,
    pub r_final: Vector3<f64>,
    /// Time of flight, positive.
    pub tof: f64,
    /// Retrograde transfer sense.
    pub retrograde: bool,
    /// Highest revolution count to enumerate.
    pub max_revs: u32,
    /// Convergence of the x iteration, negative log. Default 11.
    pub tolerance_nlog: f64,
    /// Householder iteration cap per branch. Default 15.
    pub max_iterations: usize,
}

impl LambertProblem {
    pub fn new(mu: f64, r_init: Vector3<f64>, r_final: Vector3<f64>, tof: f64) -> Self {
        Self {
            mu,
            r_init,
            r_final,
            tof,
            retrograde: false,
            max_revs: 0,
            tolerance_nlog: 11.0,
            max_iterations: 15,
        }
    }

    /// Solves the problem, returning every solution up to the configured
    /// revolution count: the zero-revolution transfer first, then the
    /// left/right branch pair per revolution (2 N + 1 total).
    pub fn solve(&self) -> Result<Vec<LambertSolution>, AstroError> {
        if self.mu <= 0.0 || self.tof <= 0.0 {
            return Err(AstroError::InvalidElements {
                what: format!(
                    "Lambert needs positive mu and time of flight (mu = {}, tof = {})",
                    self.mu, self.tof
                ),
            });
        }
        let r1_norm = self.r_init.norm();
        let r2_norm = self.r_final.norm();
        let chord = self.r_final - self.r_init;
        let c_norm = chord.norm();
        if r1_norm == 0.0 || r2_norm == 0.0 || c_norm < 1e-14 * r1_norm.max(r2_norm) {
            return Err(AstroError::TargetsTooClose);
        }

        let s = 0.5 * (r1_norm + r2_norm + c_norm);
        let i_r1 = self.r_init / r1_norm;
        let i_r2 = self.r_final / r2_norm;
        let mut i_h = i_r1.cross(&i_r2);
        if i_h.norm() < 1e-14 {
            return Err(AstroError::TargetsTooClose);
        }
        i_h /= i_h.norm();

        let mut lambda = (1.0 - c_norm / s).sqrt();
        // Transfer angle above 180 degrees flips the geometry; an
        // explicitly retrograde request flips it again. The flag actually
        // applied is recorded on every solution.
        let geometry_flip = i_h.z < 0.0;
        let effective_retrograde = geometry_flip ^ self.retrograde;
        let (mut i_t1, mut i_t2) = if effective_retrograde {
            lambda = -lambda;
            (i_r1.cross(&i_h), i_r2.cross(&i_h))
        } else {
            (i_h.cross(&i_r1), i_h.cross(&i_r2))
        };
        i_t1 /= i_t1.norm();
        i_t2 /= i_t2.norm();

        let t = (2.0 * self.mu / s.powi(3)).sqrt() * self.tof;
        let atol = 10_f64.powf(-self.tolerance_nlog);

        // Cap the revolution count by the minimum time of flight at the
        // highest multiplicity.
        let mut m_max = (t / PI).floor() as u32;
        let t_00 = lambda.acos() + lambda * (1.0 - lambda * lambda).sqrt();
        if m_max > 0 && t < t_00 + (m_max as f64) * PI {
            let (_, t_min) = compute_t_min(lambda, m_max, self.max_iterations, atol)?;
            if t < t_min {
                m_max -= 1;
            }
        }
        if self.max_revs > m_max {
            warn!(
                "{} revolutions requested but the time of flight only admits {}",
                self.max_revs, m_max
            );
        }
        let m_max = m_max.min(self.max_revs);

        let gamma = (self.mu * s / 2.0).sqrt();
        let rho = (r1_norm - r2_norm) / c_norm;
        let sigma = (1.0 - rho * rho).sqrt();

        let mut branches = vec![(0u32, true)];
        for m in 1..=m_max {
            branches.push((m, true));
            branches.push((m, false));
        }

        let mut solutions = Vec::with_capacity(branches.len());
        for (m, low_path) in branches {
            let x0 = initial_guess(t, lambda, m, low_path);
            let (x, iterations) =
                householder(x0, t, lambda, m, atol, self.max_iterations)?;
            let y = compute_y(x, lambda);

            let v_r1 = gamma * ((lambda * y - x) - rho * (lambda * y + x)) / r1_norm;
            let v_r2 = -gamma * ((lambda * y - x) + rho * (lambda * y + x)) / r2_norm;
            let v_t1 = gamma * sigma * (y + lambda * x) / r1_norm;
            let v_t2 = gamma * sigma * (y + lambda * x) / r2_norm;

            solutions.push(LambertSolution {
                v_init: v_r1 * i_r1 + v_t1 * i_t1,
                v_final: v_r2 * i_r2 + v_t2 * i_t2,
                x,
                iterations,
                revolutions: m,
                retrograde: effective_retrograde,
            });
        }
        Ok(solutions)
    }

    /// Solves for exactly `m` revolutions, failing with
    /// [`AstroError::MultiRevNotFeasible`] when the time of flight does
    /// not admit them. Returns the left/right branch pair (one solution
    /// for m = 0).
    pub fn solve_for_revolutions(&self, m: u32) -> Result<Vec<LambertSolution>, AstroError> {
        let all = Self {
            max_revs: m,
            ..self.clone()
        }
        .solve()?;
        let matching: Vec<LambertSolution> = all
            .into_iter()
            .filter(|sol| sol.revolutions == m)
            .collect();
        if matching.is_empty() {
            let m_max = ((2.0 * self.mu / {
                let c = (self.r_final - self.r_init).norm();
                let s = 0.5 * (self.r_init.norm() + self.r_final.norm() + c);
                s.powi(3)
            })
            .sqrt()
                * self.tof
                / PI)
                .floor() as u32;
            return Err(AstroError::MultiRevNotFeasible { m, m_max });
        }
        Ok(matching)
    }
}

/// One Lambert solution: the velocity pair plus solver diagnostics.
#[derive(Clone, Debug)]
pub struct LambertSolution {
    pub v_init: Vector3<f64>,
    pub v_final: Vector3<f64>,
    /// The non-dimensional transfer variable at convergence.
    pub x: f64,
    pub iterations: u64,
    pub revolutions: u32,
    /// The transfer sense actually applied (a transfer angle above 180
    /// degrees flips the requested sense).
    pub retrograde: bool,
}

impl LambertSolution {
    /// The departure state vectors of this transfer.
    pub fn departure_state(&self, problem: &LambertProblem, epoch: Epoch) -> OrbitStateVectors {
        OrbitStateVectors {
            ref_plane: None,
            grav_param: problem.mu,
            epoch,
            position: problem.r_init,
            velocity: self.v_init,
        }
    }

    /// The arrival state vectors of this transfer.
    pub fn arrival_state(&self, problem: &LambertProblem, epoch: Epoch) -> OrbitStateVectors {
        OrbitStateVectors {
            ref_plane: None,
            grav_param: problem.mu,
            epoch,
            position: problem.r_final,
            velocity: self.v_final,
        }
    }

    /// The Keplerian elements of the transfer orbit at departure.
    pub fn departure_elements(
        &self,
        problem: &LambertProblem,
        epoch: Epoch,
    ) -> Result<KeplerianOrbitElems, AstroError> {
        state_to_elements(&self.departure_state(problem, epoch))
    }
}

fn compute_y(x: f64, lambda: f64) -> f64 {
    (1.0 - lambda * lambda * (1.0 - x * x)).sqrt()
}

/// Hypergeometric 2F1(3, 1; 5/2; x), the Battin series kernel.
fn hyp2f1b(x: f64) -> f64 {
    if x >= 1.0 {
        return f64::INFINITY;
    }
    let mut res = 1.0;
    let mut term = 1.0;
    let mut ii = 0.0_f64;
    loop {
        term *= (3.0 + ii) * (1.0 + ii) / (2.5 + ii) * x / (ii + 1.0);
        let res_old = res;
        res += term;
        if res == res_old {
            return res;
        }
        ii += 1.0;
    }
}

/// Non-dimensional time of flight at x, piecewise by conditioning: the
/// Battin series hugs the parabola, Lancaster covers the well-separated
/// prograde region, Lagrange handles the rest.
fn time_of_flight(x: f64, lambda: f64, m: u32) -> f64 {
    let k = lambda * lambda;
    let e = x * x - 1.0;

    if (x - 1.0).abs() < 0.01 {
        // Battin hypergeometric series.
        let y = compute_y(x, lambda);
        let eta = y - lambda * x;
        let s_1 = 0.5 * (1.0 - lambda - x * eta);
        let q = 4.0 / 3.0 * hyp2f1b(s_1);
        let mut t = 0.5 * (eta.powi(3) * q + 4.0 * lambda * eta);
        if m > 0 {
            t += m as f64 * PI / e.abs().powf(1.5);
        }
        return t;
    }

    if k > 0.2 && x > 0.0 {
        // Lancaster formulation.
        let z = (1.0 + k * e).sqrt();
        let g = x * z - lambda * e;
        let d = if e < 0.0 {
            m as f64 * PI + g.clamp(-1.0, 1.0).acos()
        } else {
            let f = e.abs().sqrt() * (z - lambda * x);
            (f + g).ln()
        };
        return (x - lambda * z - d / e.abs().sqrt()) / e;
    }

    // Lagrange closed form.
    let a = 1.0 / (1.0 - x * x);
    if a > 0.0 {
        let alfa = 2.0 * x.clamp(-1.0, 1.0).acos();
        let mut beta = 2.0 * (k / a).sqrt().clamp(-1.0, 1.0).asin();
        if lambda < 0.0 {
            beta = -beta;
        }
        (a * a.sqrt() * ((alfa - alfa.sin()) - (beta - beta.sin()) + 2.0 * PI * m as f64)) / 2.0
    } else {
        let alfa = 2.0 * x.acosh();
        let mut beta = 2.0 * (-k / a).sqrt().asinh();
        if lambda < 0.0 {
            beta = -beta;
        }
        -(a * (-a).sqrt() * ((beta - beta.sinh()) - (alfa - alfa.sinh()))) / 2.0
    }
}

/// First derivative of T at (x, y).
fn tof_derivative(x: f64, y: f64, t: f64, lambda: f64) -> f64 {
    (3.0 * t * x - 2.0 + 2.0 * lambda.powi(3) * x / y) / (1.0 - x * x)
}

fn tof_derivative2(x: f64, y: f64, t: f64, dt: f64, lambda: f64) -> f64 {
    (3.0 * t + 5.0 * x * dt + 2.0 * (1.0 - lambda * lambda) * lambda.powi(3) / y.powi(3))
        / (1.0 - x * x)
}

fn tof_derivative3(x: f64, y: f64, dt: f64, ddt: f64, lambda: f64) -> f64 {
    (7.0 * x * ddt + 8.0 * dt - 6.0 * (1.0 - lambda * lambda) * lambda.powi(5) * x / y.powi(5))
        / (1.0 - x * x)
}

/// Minimum-T point of the m-revolution branch by Halley iteration on
/// dT/dx = 0. Returns `(x_T_min, T_min)`.
fn compute_t_min(
    lambda: f64,
    m: u32,
    maxiter: usize,
    atol: f64,
) -> Result<(f64, f64), AstroError> {
    if (lambda - 1.0).abs() < 1e-9 {
        let t_min = time_of_flight(0.0, lambda, m);
        return Ok((0.0, t_min));
    }
    if m == 0 {
        return Ok((f64::INFINITY, 0.0));
    }
    // Start right of zero to dodge the lambda = -1 pole.
    let mut x = 0.1;
    let t_i = time_of_flight(x, lambda, m);
    let mut t = t_i;
    for _ in 0..maxiter {
        let y = compute_y(x, lambda);
        let dt = tof_derivative(x, y, t, lambda);
        let ddt = tof_derivative2(x, y, t, dt, lambda);
        if ddt.abs() < 1e-14 {
            return Err(AstroError::TargetsTooClose);
        }
        let dddt = tof_derivative3(x, y, dt, ddt, lambda);
        // Halley step on the derivative.
        let x_new = x - 2.0 * dt * ddt / (2.0 * ddt * ddt - dt * dddt);
        if (x_new - x).abs() < atol {
            let t_min = time_of_flight(x_new, lambda, m);
            return Ok((x_new, t_min));
        }
        x = x_new;
        t = time_of_flight(x, lambda, m);
    }
    Err(AstroError::SolverMaxIter { maxiter })
}

/// Branch-dependent starting point of the Householder iteration.
fn initial_guess(t: f64, lambda: f64, m: u32, low_path: bool) -> f64 {
    if m == 0 {
        let t_0 = lambda.acos() + lambda * (1.0 - lambda * lambda).sqrt();
        let t_1 = 2.0 * (1.0 - lambda.powi(3)) / 3.0;
        if t >= t_0 {
            (t_0 / t).powf(2.0 / 3.0) - 1.0
        } else if t < t_1 {
            5.0 / 2.0 * t_1 / t * (t_1 - t) / (1.0 - lambda.powi(5)) + 1.0
        } else {
            (2_f64.ln() * (t / t_0).ln() / (t_1 / t_0).ln()).exp() - 1.0
        }
    } else {
        let m_pi = m as f64 * PI;
        let term_l = ((m_pi + PI) / (8.0 * t)).powf(2.0 / 3.0);
        let x_0l = (term_l - 1.0) / (term_l + 1.0);
        let term_r = (8.0 * t / m_pi).powf(2.0 / 3.0);
        let x_0r = (term_r - 1.0) / (term_r + 1.0);
        if low_path {
            x_0l.max(x_0r)
        } else {
            x_0l.min(x_0r)
        }
    }
}

/// Third-order Householder iteration on T(x) - T_target.
fn householder(
    mut x: f64,
    t_target: f64,
    lambda: f64,
    m: u32,
    atol: f64,
    maxiter: usize,
) -> Result<(f64, u64), AstroError> {
    for iteration in 1..=maxiter {
        let y = compute_y(x, lambda);
        let fval = time_of_flight(x, lambda, m) - t_target;
        let t = fval + t_target;
        let dt = tof_derivative(x, y, t, lambda);
        let ddt = tof_derivative2(x, y, t, dt, lambda);
        let dddt = tof_derivative3(x, y, dt, ddt, lambda);

        let num = dt * dt - fval * ddt / 2.0;
        let den = dt * (dt * dt - fval * ddt) + dddt * fval * fval / 6.0;
        if den.abs() < 1e-300 {
            return Err(AstroError::TargetsTooClose);
        }
        let x_new = x - fval * (num / den);
        let delta = (x_new - x).abs();
        x = x_new;
        if delta < atol {
            return Ok((x, iteration as u64));
        }
    }
    Err(AstroError::SolverMaxIter { maxiter })
}
