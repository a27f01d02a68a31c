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

//! Kepler's equation relates the mean anomaly M to the eccentric anomaly E
//! along a conic orbit. The forward direction is closed form; the inverse
//! is transcendental for the elliptic and hyperbolic regimes and is served
//! here by several interchangeable solvers:
//!
//! - elliptic: Newton with a table-driven seed, Markley's cubic estimate
//!   with one high-order correction, or a piecewise-quintic fit of E(M);
//!   all three fall back to bisection in the ill-conditioned
//!   near-parabolic pericenter corner.
//! - parabolic: the cubic closed form (Barker's equation).
//! - hyperbolic: segmented polynomial seeds polished by Newton.

use crate::angle::Angle;
use crate::errors::{AstroError, MathError};
use crate::math::matrix::DenseMatrix;
use crate::math::root_finding::Bisection;
use crate::math::specfun::inverse_vandermonde;
use crate::math::polynomial::solve_cubic;
use std::f64::consts::PI;

/// Absolute tolerance of the elliptic solvers, as a negative decimal log
/// (3e-15).
pub const ELLIPTIC_ABS_TOL_NLOG: f64 = 14.522878745280337;
/// Relative tolerance of the elliptic solvers (2.2e-16).
pub const ELLIPTIC_REL_TOL_NLOG: f64 = 15.657577319177794;

/// Eccentricity above which the pericenter neighborhood switches to
/// bisection.
const E_BOUNDARY: f64 = 0.99;
/// Mean-anomaly radius (radians) of that neighborhood.
const M_BOUNDARY: f64 = 0.0045;

/// Elliptic Kepler equation, `M = E - e sin E`.
pub fn elliptic_kepler(eccentricity: f64, eccentric_anomaly: Angle) -> Angle {
    let e_rad = eccentric_anomaly.to_radians();
    Angle::from_radians(e_rad - eccentricity * e_rad.sin())
}

/// Parabolic Kepler (Barker) equation, `M = E/2 + E^3/6`.
pub fn parabolic_kepler(eccentric_anomaly: Angle) -> Angle {
    let e_rad = eccentric_anomaly.to_radians();
    Angle::from_radians(0.5 * e_rad + e_rad.powi(3) / 6.0)
}

/// Hyperbolic Kepler equation, `M = e sinh H - H`.
pub fn hyperbolic_kepler(eccentricity: f64, eccentric_anomaly: Angle) -> Angle {
    let h = eccentric_anomaly.to_radians();
    Angle::from_radians(eccentricity * h.sinh() - h)
}

/// An inverse Kepler solver: mean anomaly in, eccentric anomaly out.
pub trait InverseKeplerEquation {
    fn eccentric_anomaly(&self, mean_anomaly: Angle) -> Result<Angle, AstroError>;
}

fn check_elliptic(eccentricity: f64) -> Result<(), AstroError> {
    if !(0.0..1.0).contains(&eccentricity) {
        return Err(AstroError::InvalidElements {
            what: format!("elliptic solver requires 0 <= e < 1, got {}", eccentricity),
        });
    }
    Ok(())
}

/// Bisection fallback on [0, pi]: `E - e sin E - M` brackets there for any
/// M in [0, pi].
fn elliptic_bisection(
    eccentricity: f64,
    m_rad: f64,
    abs_tol_nlog: f64,
    rel_tol_nlog: f64,
) -> Result<f64, AstroError> {
    let mut solver = Bisection::new(move |x: f64| x - eccentricity * x.sin(), (0.0, PI));
    solver.abs_tol_nlog = abs_tol_nlog;
    solver.rel_tol_nlog = rel_tol_nlog;
    solver.max_iter_log = 1.755; // 56 halvings saturate an f64 on [0, pi]
    solver.run(m_rad).map_err(|source| AstroError::AstroMath {
        action: "bisecting the elliptic Kepler equation",
        source,
    })
}

/// Reduces M to [0, pi] (odd symmetry and 2 pi periodicity), solves, and
/// maps the result back.
fn run_reduced<S>(m: Angle, solve: S) -> Result<Angle, AstroError>
where
    S: Fn(f64) -> Result<f64, AstroError>,
{
    let m_rad = m.to_radians();
    let turns = (m_rad / (2.0 * PI)).round();
    let reduced = m_rad - 2.0 * PI * turns;
    let sign = if reduced < 0.0 { -1.0 } else { 1.0 };
    let e_rad = solve(reduced.abs())?;
    Ok(Angle::from_radians(sign * e_rad + 2.0 * PI * turns))
}

/// Newton's iteration on a construction-time seed table.
///
/// The table holds (M, E) knots of the forward map on a uniform E grid
/// over [0, pi]; a query interpolates the bracketing knots linearly and
/// then runs Newton to tolerance.
pub struct NewtonElliptic {
    eccentricity: f64,
    seed_table: Vec<(f64, f64)>,
    pub abs_tol_nlog: f64,
    pub rel_tol_nlog: f64,
}

impl NewtonElliptic {
    const SEED_COUNT: usize = 33;

    pub fn new(eccentricity: f64) -> Result<Self, AstroError> {
        check_elliptic(eccentricity)?;
        let seed_table = (0..Self::SEED_COUNT)
            .map(|i| {
                let e_knot = PI * i as f64 / (Self::SEED_COUNT - 1) as f64;
                (e_knot - eccentricity * e_knot.sin(), e_knot)
            })
            .collect();
        Ok(Self {
            eccentricity,
            seed_table,
            abs_tol_nlog: ELLIPTIC_ABS_TOL_NLOG,
            rel_tol_nlog: ELLIPTIC_REL_TOL_NLOG,
        })
    }

    fn solve_core(&self, m_rad: f64) -> Result<f64, AstroError> {
        let e = self.eccentricity;
        if e > E_BOUNDARY && m_rad < M_BOUNDARY {
            return elliptic_bisection(e, m_rad, self.abs_tol_nlog, self.rel_tol_nlog);
        }
        // Seed from the bracketing table knots.
        let idx = self
            .seed_table
            .partition_point(|(m_knot, _)| *m_knot < m_rad)
            .clamp(1, Self::SEED_COUNT - 1);
        let (m0, e0) = self.seed_table[idx - 1];
        let (m1, e1) = self.seed_table[idx];
        let mut x = e0 + (e1 - e0) * (m_rad - m0) / (m1 - m0);

        let atol = 10_f64.powf(-self.abs_tol_nlog);
        let rtol = 10_f64.powf(-self.rel_tol_nlog);
        for _ in 0..50 {
            let f = x - e * x.sin() - m_rad;
            let fp = 1.0 - e * x.cos();
            let delta = f / fp;
            x -= delta;
            if delta.abs() < atol + rtol * x.abs() {
                return Ok(x);
            }
        }
        Err(AstroError::AstroMath {
            action: "iterating the elliptic Kepler equation",
            source: MathError::ConvergenceFailed {
                iterations: 50,
                residual: x - e * x.sin() - m_rad,
            },
        })
    }
}

impl InverseKeplerEquation for NewtonElliptic {
    fn eccentric_anomaly(&self, mean_anomaly: Angle) -> Result<Angle, AstroError> {
        run_reduced(mean_anomaly, |m| self.solve_core(m))
    }
}

/// Markley's 1995 non-iterative solver: a cubic Pade estimate followed by
/// one fifth-order correction, accurate to a few ULP over the whole
/// (e, M) plane away from the pericenter corner.
pub struct MarkleyElliptic {
    eccentricity: f64,
    pub abs_tol_nlog: f64,
    pub rel_tol_nlog: f64,
}

impl MarkleyElliptic {
    pub fn new(eccentricity: f64) -> Result<Self, AstroError> {
        check_elliptic(eccentricity)?;
        Ok(Self {
            eccentricity,
            abs_tol_nlog: ELLIPTIC_ABS_TOL_NLOG,
            rel_tol_nlog: ELLIPTIC_REL_TOL_NLOG,
        })
    }

    fn solve_core(&self, m_rad: f64) -> Result<f64, AstroError> {
        let e = self.eccentricity;
        if e > E_BOUNDARY && m_rad < M_BOUNDARY {
            return elliptic_bisection(e, m_rad, self.abs_tol_nlog, self.rel_tol_nlog);
        }
        let m = m_rad;
        // Cubic estimate.
        let alpha = (3.0 * PI * PI + 1.6 * PI * (PI - m.abs()) / (1.0 + e)) / (PI * PI - 6.0);
        let d = 3.0 * (1.0 - e) + alpha * e;
        let q = 2.0 * alpha * d * (1.0 - e) - m * m;
        let r = 3.0 * alpha * d * (d - 1.0 + e) * m + m.powi(3);
        let w = (r.abs() + (q.powi(3) + r * r).sqrt()).powf(2.0 / 3.0);
        let e1 = (2.0 * r * w / (w * w + w * q + q * q) + m) / d;

        // One fifth-order correction.
        let f0 = e1 - e * e1.sin() - m;
        let f1 = 1.0 - e * e1.cos();
        let f2 = e * e1.sin();
        let f3 = e * e1.cos();
        let f4 = -f2;
        let d3 = -f0 / (f1 - 0.5 * f0 * f2 / f1);
        let d4 = -f0 / (f1 + 0.5 * d3 * f2 + d3 * d3 * f3 / 6.0);
        let d5 = -f0 / (f1 + 0.5 * d4 * f2 + d4 * d4 * f3 / 6.0 + d4.powi(3) * f4 / 24.0);
        Ok(e1 + d5)
    }
}

impl InverseKeplerEquation for MarkleyElliptic {
    fn eccentric_anomaly(&self, mean_anomaly: Angle) -> Result<Angle, AstroError> {
        run_reduced(mean_anomaly, |m| self.solve_core(m))
    }
}

/// Fits a quintic through the forward map over [e_lo, e_hi] in E, scaled
/// to [-1, 1] in M. Returns (m_lo, m_hi, ascending coefficients).
fn fit_quintic(
    forward: impl Fn(f64) -> f64,
    e_lo: f64,
    e_hi: f64,
) -> Result<(f64, f64, Vec<f64>), AstroError> {
    let m_lo = forward(e_lo);
    let m_hi = forward(e_hi);
    let mut u_nodes = Vec::with_capacity(6);
    let mut e_nodes = Vec::with_capacity(6);
    for j in 0..6 {
        // Chebyshev placement in E keeps the fit stable near the ends.
        let theta = PI * (2.0 * j as f64 + 1.0) / 12.0;
        let e_node = 0.5 * (e_lo + e_hi) + 0.5 * (e_hi - e_lo) * theta.cos();
        let m_node = forward(e_node);
        u_nodes.push(2.0 * (m_node - m_lo) / (m_hi - m_lo) - 1.0);
        e_nodes.push(e_node);
    }
    let coeffs = interpolation_coefficients(&u_nodes, &e_nodes).map_err(|source| {
        AstroError::AstroMath {
            action: "fitting a quintic Kepler segment",
            source,
        }
    })?;
    Ok((m_lo, m_hi, coeffs))
}

/// Ascending coefficients of the polynomial through `(nodes, values)`.
fn interpolation_coefficients(nodes: &[f64], values: &[f64]) -> Result<Vec<f64>, MathError> {
    // p(x_j) = sum_k c_k x_j^k is the transposed Vandermonde system.
    let inv = inverse_vandermonde(nodes)?;
    inv.transpose().try_mul_vec(values)
}

fn eval_ascending(coeffs: &[f64], u: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * u + c)
}

/// Piecewise-quintic inverse: an adaptive set of breakpoints over [0, pi]
/// with one quintic fit of E(M) per interval, built at construction by
/// bisecting every interval whose fit residual exceeds tolerance.
/// Evaluation is a binary search plus one Horner pass.
pub struct PiecewiseQuinticElliptic {
    eccentricity: f64,
    /// Mean-anomaly breakpoints, ascending over [0, pi].
    breakpoints: Vec<Angle>,
    /// One ascending-coefficient column per interval.
    coefficients: DenseMatrix,
    pub abs_tol_nlog: f64,
    pub rel_tol_nlog: f64,
}

impl PiecewiseQuinticElliptic {
    const MAX_BLOCKS: usize = 4096;

    pub fn new(eccentricity: f64) -> Result<Self, AstroError> {
        check_elliptic(eccentricity)?;
        // The requested 3e-15 sits below the double-precision floor of a
        // scaled quintic fit; 2e-14 is the achievable per-block bound.
        let tolerance = 10_f64.powf(-ELLIPTIC_ABS_TOL_NLOG).max(2e-14);
        let (breakpoints, coefficients) = Self::build_blocks(eccentricity, tolerance)?;
        Ok(Self {
            eccentricity,
            breakpoints,
            coefficients,
            abs_tol_nlog: ELLIPTIC_ABS_TOL_NLOG,
            rel_tol_nlog: ELLIPTIC_REL_TOL_NLOG,
        })
    }

    /// The adaptive breakpoint/coefficient generator: bisect every E
    /// interval whose quintic fit misses the forward map by more than
    /// `tolerance` at the check points.
    fn build_blocks(
        eccentricity: f64,
        tolerance: f64,
    ) -> Result<(Vec<Angle>, DenseMatrix), AstroError> {
        let forward = |x: f64| x - eccentricity * x.sin();
        let mut grid: Vec<f64> = (0..=16).map(|i| PI * i as f64 / 16.0).collect();

        loop {
            let mut refined = Vec::with_capacity(grid.len());
            let mut all_pass = true;
            for w in grid.windows(2) {
                refined.push(w[0]);
                if Self::fit_residual(eccentricity, w[0], w[1])? > tolerance {
                    refined.push(0.5 * (w[0] + w[1]));
                    all_pass = false;
                }
            }
            refined.push(PI);
            if all_pass {
                grid = refined;
                break;
            }
            if refined.len() > Self::MAX_BLOCKS {
                warn!(
                    "piecewise quintic grid capped at {} blocks (e = {})",
                    refined.len(),
                    eccentricity
                );
                grid = refined;
                break;
            }
            grid = refined;
        }

        let mut breakpoints = Vec::with_capacity(grid.len());
        let mut coefficients = DenseMatrix::zeros(grid.len() - 1, 6);
        for (i, w) in grid.windows(2).enumerate() {
            let (m_lo, _m_hi, coeffs) = fit_quintic(forward, w[0], w[1])?;
            breakpoints.push(Angle::from_radians(m_lo));
            coefficients.set_column(i, &coeffs).map_err(|source| {
                AstroError::AstroMath {
                    action: "storing quintic Kepler coefficients",
                    source,
                }
            })?;
        }
        breakpoints.push(Angle::from_radians(PI));
        Ok((breakpoints, coefficients))
    }

    /// Worst deviation of the quintic fit from the true inverse over the
    /// interval, measured at off-node check points.
    fn fit_residual(eccentricity: f64, e_lo: f64, e_hi: f64) -> Result<f64, AstroError> {
        let forward = |x: f64| x - eccentricity * x.sin();
        let (m_lo, m_hi, coeffs) = fit_quintic(forward, e_lo, e_hi)?;
        let mut worst: f64 = 0.0;
        for j in 1..=7 {
            let e_check = e_lo + (e_hi - e_lo) * j as f64 / 8.0;
            let m_check = forward(e_check);
            let u = 2.0 * (m_check - m_lo) / (m_hi - m_lo) - 1.0;
            worst = worst.max((eval_ascending(&coeffs, u) - e_check).abs());
        }
        Ok(worst)
    }

    fn solve_core(&self, m_rad: f64) -> Result<f64, AstroError> {
        let e = self.eccentricity;
        // The pericenter block of a near-parabolic orbit is too stiff for
        // a polynomial fit.
        if e > E_BOUNDARY && m_rad < M_BOUNDARY {
            return elliptic_bisection(e, m_rad, self.abs_tol_nlog, self.rel_tol_nlog);
        }
        let idx = self
            .breakpoints
            .partition_point(|bp| bp.to_radians() < m_rad)
            .clamp(1, self.breakpoints.len() - 1)
            - 1;
        let m_lo = self.breakpoints[idx].to_radians();
        let m_hi = self.breakpoints[idx + 1].to_radians();
        let u = 2.0 * (m_rad - m_lo) / (m_hi - m_lo) - 1.0;
        let coeffs = self.coefficients.column(idx).map_err(|source| {
            AstroError::AstroMath {
                action: "loading quintic Kepler coefficients",
                source,
            }
        })?;
        Ok(eval_ascending(&coeffs, u))
    }

    /// Number of generated blocks (diagnostics).
    pub fn block_count(&self) -> usize {
        self.breakpoints.len() - 1
    }
}

impl InverseKeplerEquation for PiecewiseQuinticElliptic {
    fn eccentric_anomaly(&self, mean_anomaly: Angle) -> Result<Angle, AstroError> {
        run_reduced(mean_anomaly, |m| self.solve_core(m))
    }
}

/// Barker's equation solved in closed form: the unique real root of the
/// cubic `E^3/6 + E/2 - M = 0`.
#[derive(Default)]
pub struct ParabolicInverse;

impl InverseKeplerEquation for ParabolicInverse {
    fn eccentric_anomaly(&self, mean_anomaly: Angle) -> Result<Angle, AstroError> {
        let m = mean_anomaly.to_radians();
        let roots = solve_cubic(&[1.0 / 6.0, 0.0, 0.5, -m], 10.0);
        let real = roots
            .iter()
            .min_by(|a, b| a.im.abs().partial_cmp(&b.im.abs()).unwrap())
            .expect("cubic always has three roots");
        Ok(Angle::from_radians(real.re))
    }
}

/// Residual quartet of the hyperbolic Kepler equation at H: the value and
/// its first three derivatives, sharing one sinh/cosh evaluation.
pub fn vectorized_hke(eccentricity: f64, m_rad: f64, h: f64) -> [f64; 4] {
    let sh = h.sinh();
    let ch = h.cosh();
    [
        eccentricity * sh - h - m_rad,
        eccentricity * ch - 1.0,
        eccentricity * sh,
        eccentricity * ch,
    ]
}

/// Entry count of the hyperbolic mean-anomaly segment table.
pub const SEGMENT_TABLE_SIZE: usize = 51;
/// Seed polynomials in the bank, one per segment.
pub const POLYNOM_TABLE_SIZE: usize = 50;
/// Index separating the dense corner knots from the geometric tail.
const SEGMENT_TABLE_BOUND: usize = 26;

/// The segmented-seed hyperbolic solver (HKE-SDG scheme).
///
/// Construction precomputes a 51-entry segmentation of the mean-anomaly
/// axis (eccentricity dependent) and a bank of 50 quintic seed
/// polynomials interpolating H(M) on each segment from the exact forward
/// map. Evaluation locates the segment, evaluates its seed, and polishes
/// with Newton; two to three iterations usually suffice. The singular
/// corner (small M) uses a cubic-series seed, and queries beyond the last
/// segment fall back to the asinh asymptote.
pub struct HyperbolicSdg {
    eccentricity: f64,
    /// Mean-anomaly segment boundaries, ascending, segments[0] = 0.
    segments: [f64; SEGMENT_TABLE_SIZE],
    /// Ascending quintic coefficients, one column per segment.
    seeds: DenseMatrix,
    pub abs_tol_nlog: f64,
    pub rel_tol_nlog: f64,
    /// Iteration cap (log), about 50.
    pub max_iter_log: f64,
}

impl HyperbolicSdg {
    pub fn new(eccentricity: f64) -> Result<Self, AstroError> {
        if eccentricity <= 1.0 {
            return Err(AstroError::InvalidElements {
                what: format!("hyperbolic solver requires e > 1, got {}", eccentricity),
            });
        }
        let mut segments = [0.0; SEGMENT_TABLE_SIZE];
        Self::get_segments(eccentricity, &mut segments);

        let forward = |h: f64| eccentricity * h.sinh() - h;
        let mut seeds = DenseMatrix::zeros(POLYNOM_TABLE_SIZE, 6);
        for k in 0..POLYNOM_TABLE_SIZE {
            let h_lo = Self::knot(k);
            let h_hi = Self::knot(k + 1);
            let (_, _, coeffs) = fit_quintic(forward, h_lo, h_hi)?;
            seeds
                .set_column(k, &coeffs)
                .map_err(|source| AstroError::AstroMath {
                    action: "storing hyperbolic seed coefficients",
                    source,
                })?;
        }
        Ok(Self {
            eccentricity,
            segments,
            seeds,
            abs_tol_nlog: 15.65,
            rel_tol_nlog: 15.65,
            max_iter_log: 1.698_97,
        })
    }

    /// The fixed H knots behind the segmentation: linear through the
    /// corner region, geometric beyond.
    fn knot(k: usize) -> f64 {
        if k < SEGMENT_TABLE_BOUND {
            0.2 * k as f64
        } else {
            5.0 * 6_f64.powf((k - SEGMENT_TABLE_BOUND + 1) as f64 / 25.0)
        }
    }

    /// Fills the mean-anomaly segment table for the given eccentricity.
    pub fn get_segments(eccentricity: f64, table: &mut [f64; SEGMENT_TABLE_SIZE]) {
        for (k, slot) in table.iter_mut().enumerate() {
            let h = Self::knot(k);
            *slot = eccentricity * h.sinh() - h;
        }
    }

    /// Series seed in the singular corner: the real root of
    /// `(e - 1) H + e H^3 / 6 = M`.
    fn singular_corner_estimate(&self, m_rad: f64) -> f64 {
        let roots = solve_cubic(
            &[self.eccentricity / 6.0, 0.0, self.eccentricity - 1.0, -m_rad],
            10.0,
        );
        roots
            .iter()
            .filter(|z| z.im.abs() < 1e-9 && z.re >= 0.0)
            .map(|z| z.re)
            .next()
            .unwrap_or_else(|| (6.0 * m_rad / self.eccentricity).cbrt())
    }

    /// Initial H for the Newton polish.
    fn seed(&self, m_rad: f64) -> f64 {
        if m_rad < self.segments[1] {
            return self.singular_corner_estimate(m_rad);
        }
        if m_rad >= self.segments[SEGMENT_TABLE_SIZE - 1] {
            // Asymptote: sinh dominates, H ~ asinh((M + H)/e).
            let h0 = ((m_rad) / self.eccentricity).asinh();
            return ((m_rad + h0) / self.eccentricity).asinh();
        }
        let k = self
            .segments
            .partition_point(|edge| *edge <= m_rad)
            .clamp(1, SEGMENT_TABLE_SIZE - 1)
            - 1;
        let m_lo = self.segments[k];
        let m_hi = self.segments[k + 1];
        let u = 2.0 * (m_rad - m_lo) / (m_hi - m_lo) - 1.0;
        let coeffs = self.seeds.column(k).expect("seed bank is fully populated");
        eval_ascending(&coeffs, u)
    }

    fn solve_core(&self, m_rad: f64) -> Result<f64, AstroError> {
        let atol = 10_f64.powf(-self.abs_tol_nlog);
        let rtol = 10_f64.powf(-self.rel_tol_nlog);
        let max_iterations = 10_f64.powf(self.max_iter_log).floor() as u64;

        let mut h = self.seed(m_rad);
        let mut residual = f64::NAN;
        for _ in 0..max_iterations {
            let quartet = vectorized_hke(self.eccentricity, m_rad, h);
            residual = quartet[0];
            let delta = quartet[0] / quartet[1];
            h -= delta;
            if delta.abs() < atol + rtol * h.abs() {
                return Ok(h);
            }
        }
        Err(AstroError::AstroMath {
            action: "iterating the hyperbolic Kepler equation",
            source: MathError::ConvergenceFailed {
                iterations: max_iterations,
                residual,
            },
        })
    }
}

impl InverseKeplerEquation for HyperbolicSdg {
    fn eccentric_anomaly(&self, mean_anomaly: Angle) -> Result<Angle, AstroError> {
        // Odd symmetry; the hyperbolic equation is aperiodic.
        let m_rad = mean_anomaly.to_radians();
        let sign = if m_rad < 0.0 { -1.0 } else { 1.0 };
        let h = self.solve_core(m_rad.abs())?;
        Ok(Angle::from_radians(sign * h))
    }
}

#[cfg(test)]
mod ut_kepler {
    use super::*;

    fn elliptic_round_trip(solver: &dyn InverseKeplerEquation, e: f64, m_rad: f64, tol: f64) {
        let m = Angle::from_radians(m_rad);
        let big_e = solver.eccentric_anomaly(m).unwrap();
        let back = elliptic_kepler(e, big_e).to_radians();
        assert!(
            (back - m_rad).abs() < tol,
            "e = {}, M = {}: round trip off by {:e}",
            e,
            m_rad,
            (back - m_rad).abs()
        );
    }

    #[test]
    fn newton_round_trips() {
        let solver = NewtonElliptic::new(0.5).unwrap();
        for m in [-3.0, -1.0, 0.0, 0.3, 1.0, 2.5, 3.1] {
            elliptic_round_trip(&solver, 0.5, m, 1e-13);
        }
    }

    #[test]
    fn markley_round_trips() {
        for e in [0.01, 0.3, 0.7, 0.95] {
            let solver = MarkleyElliptic::new(e).unwrap();
            for m in [0.05, 0.5, 1.5, 3.0] {
                elliptic_round_trip(&solver, e, m, 1e-13);
            }
        }
    }

    #[test]
    fn piecewise_quintic_round_trips() {
        let solver = PiecewiseQuinticElliptic::new(0.5).unwrap();
        assert!(solver.block_count() >= 16);
        for m in [0.01, 0.4, 1.0, 2.0, 3.0] {
            elliptic_round_trip(&solver, 0.5, m, 1e-12);
        }
    }

    #[test]
    fn strategies_agree_with_each_other() {
        let e = 0.5;
        let m = Angle::from_radians(1.0);
        let newton = NewtonElliptic::new(e).unwrap().eccentric_anomaly(m).unwrap();
        let markley = MarkleyElliptic::new(e).unwrap().eccentric_anomaly(m).unwrap();
        let quintic = PiecewiseQuinticElliptic::new(e)
            .unwrap()
            .eccentric_anomaly(m)
            .unwrap();
        // Reference value for (e = 0.5, M = 1 rad).
        assert!((newton.to_radians() - 1.498_701_924).abs() < 1e-8);
        assert!((newton.to_radians() - markley.to_radians()).abs() < 1e-12);
        assert!((newton.to_radians() - quintic.to_radians()).abs() < 1e-11);
    }

    #[test]
    fn near_parabolic_pericenter_uses_bisection() {
        let solver = NewtonElliptic::new(0.999).unwrap();
        let m = Angle::from_radians(0.001);
        let big_e = solver.eccentric_anomaly(m).unwrap();
        let back = elliptic_kepler(0.999, big_e).to_radians();
        assert!((back - 0.001).abs() < 1e-12, "off by {:e}", (back - 0.001).abs());
    }

    #[test]
    fn periodicity_is_preserved() {
        let solver = NewtonElliptic::new(0.3).unwrap();
        let m = Angle::from_radians(1.0 + 4.0 * PI);
        let big_e = solver.eccentric_anomaly(m).unwrap();
        let base = solver
            .eccentric_anomaly(Angle::from_radians(1.0))
            .unwrap();
        assert!((big_e.to_radians() - base.to_radians() - 4.0 * PI).abs() < 1e-10);
    }

    #[test]
    fn parabolic_closed_form() {
        let solver = ParabolicInverse;
        for m in [-2.0, -0.1, 0.0, 0.5, 3.0] {
            let big_e = solver
                .eccentric_anomaly(Angle::from_radians(m))
                .unwrap();
            let back = parabolic_kepler(big_e).to_radians();
            assert!((back - m).abs() < 1e-12, "M = {}: off by {:e}", m, (back - m).abs());
        }
    }

    #[test]
    fn hyperbolic_round_trips() {
        for e in [1.001, 1.1, 2.0, 10.0, 50.0] {
            let solver = HyperbolicSdg::new(e).unwrap();
            for m in [-20.0, -0.001, 0.0, 0.01, 0.5, 3.0, 100.0, 1e6] {
                let big_h = solver
                    .eccentric_anomaly(Angle::from_radians(m))
                    .unwrap();
                let back = hyperbolic_kepler(e, big_h).to_radians();
                let tol = 1e-11 * m.abs().max(1.0);
                assert!(
                    (back - m).abs() < tol,
                    "e = {}, M = {}: off by {:e}",
                    e,
                    m,
                    (back - m).abs()
                );
            }
        }
    }

    #[test]
    fn invalid_eccentricities() {
        assert!(NewtonElliptic::new(1.2).is_err());
        assert!(MarkleyElliptic::new(-0.1).is_err());
        assert!(HyperbolicSdg::new(0.8).is_err());
    }

    #[test]
    fn segment_table_is_monotonic() {
        let mut table = [0.0; SEGMENT_TABLE_SIZE];
        HyperbolicSdg::get_segments(2.5, &mut table);
        assert_eq!(table[0], 0.0);
        for w in table.windows(2) {
            assert!(w[1] > w[0]);
        }
    }
}
