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

use super::tables;
use super::DefiniteIntegrator;
use crate::errors::MathError;
use crate::math::polynomial::{solve_poly, Polynomial};
use crate::math::root_finding::newton;
use crate::math::specfun::{legendre_polynomial_coefficients, stieltjes_polynomial_coefficients};

/// Adaptive Gauss-Kronrod quadrature.
///
/// A Kronrod rule of `order` points nests the Gauss rule of
/// `(order - 1) / 2` points so both estimates share the same function
/// samples; their difference drives the error estimate and the recursive
/// interval bisection. Rules 15, 21 and 31 come from the bundled QUADPACK
/// tables; any other odd order is computed at construction from the roots
/// of the Legendre and Stieltjes polynomials.
///
/// Infinite endpoints are folded onto a finite image interval before
/// integration.
pub struct GaussKronrod {
    order: usize,
    /// Error tolerance per unit length, negative log. Default 14.
    pub tolerance_nlog: f64,
    /// Recursion depth bound of the adaptive bisection. Default 15.
    pub max_levels: u32,
    /// Skip the Kronrod refinement and return the plain Gauss estimate.
    pub gauss_only: bool,
    /// Positive-half `(node, weight)` pairs, descending, center last.
    gauss: Vec<(f64, f64)>,
    kronrod: Vec<(f64, f64)>,
}

impl Default for GaussKronrod {
    /// The 21-point rule.
    fn default() -> Self {
        Self::new(21).unwrap()
    }
}

impl DefiniteIntegrator for GaussKronrod {
    fn integrate(&self, f: &dyn Fn(f64) -> f64, a: f64, b: f64) -> Result<f64, MathError> {
        self.run(f, a, b)
    }
}

impl GaussKronrod {
    /// Builds the rule with `order` Kronrod points (odd, >= 3).
    pub fn new(order: usize) -> Result<Self, MathError> {
        let (gauss, kronrod) = match order {
            15 => (tables::GAUSS_7.to_vec(), tables::KRONROD_15.to_vec()),
            21 => (tables::GAUSS_10.to_vec(), tables::KRONROD_21.to_vec()),
            31 => (tables::GAUSS_15.to_vec(), tables::KRONROD_31.to_vec()),
            _ => compute_nodes_and_weights(order)?,
        };
        Ok(Self {
            order,
            tolerance_nlog: 14.0,
            max_levels: 15,
            gauss_only: false,
            gauss,
            kronrod,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// The non-adaptive Kronrod and Gauss estimates over [a, b], the error
    /// estimate, and the L1 accumulation.
    fn gk_non_adaptive<F: Fn(f64) -> f64 + ?Sized>(
        &self,
        f: &F,
        a: f64,
        b: f64,
    ) -> (f64, f64, f64, f64) {
        let center = 0.5 * (a + b);
        let half = 0.5 * (b - a);

        let mut kronrod = 0.0;
        let mut gauss = 0.0;
        let mut l1 = 0.0;
        for (i, (node, weight)) in self.kronrod.iter().enumerate() {
            let sample = if *node == 0.0 {
                f(center)
            } else {
                f(center - half * node) + f(center + half * node)
            };
            kronrod += weight * sample;
            l1 += weight * sample.abs();
            // Gauss nodes sit at the odd Kronrod indices.
            if i % 2 == 1 {
                gauss += self.gauss[i / 2].1 * sample;
            }
        }
        kronrod *= half;
        gauss *= half;
        l1 *= half.abs();

        let scaled = 200.0 * (kronrod - gauss).abs() / kronrod.abs().max(1.0);
        let error = scaled.powf(1.5) * (b - a).abs();
        (kronrod, gauss, error, l1)
    }

    /// Plain Gauss estimate over [a, b] (no error estimate).
    pub fn gauss_integrate<F: Fn(f64) -> f64 + ?Sized>(&self, f: &F, a: f64, b: f64) -> f64 {
        let center = 0.5 * (a + b);
        let half = 0.5 * (b - a);
        let mut acc = 0.0;
        for (node, weight) in &self.gauss {
            let sample = if *node == 0.0 {
                f(center)
            } else {
                f(center - half * node) + f(center + half * node)
            };
            acc += weight * sample;
        }
        acc * half
    }

    /// Recursive adaptive bisection: splits every interval whose local
    /// error exceeds the tolerance density times its length, down to
    /// `max_levels`.
    fn gk_adaptive<F: Fn(f64) -> f64 + ?Sized>(
        &self,
        f: &F,
        a: f64,
        b: f64,
        level: u32,
        tol_density: f64,
        last_error: &mut f64,
        l1: &mut f64,
    ) -> f64 {
        let (estimate, _, error, local_l1) = self.gk_non_adaptive(f, a, b);
        if error <= tol_density * (b - a).abs() || level >= self.max_levels {
            if level >= self.max_levels && error > tol_density * (b - a).abs() {
                debug!(
                    "Gauss-Kronrod bisection floor at level {} over [{}, {}] (error {:.3e})",
                    level, a, b, error
                );
            }
            *last_error += error;
            *l1 += local_l1;
            return estimate;
        }
        let mid = 0.5 * (a + b);
        self.gk_adaptive(f, a, mid, level + 1, tol_density, last_error, l1)
            + self.gk_adaptive(f, mid, b, level + 1, tol_density, last_error, l1)
    }

    /// Integrates f over [a, b], handling infinite endpoints and interval
    /// orientation. The error estimate accumulated by the adaptive pass is
    /// returned alongside the value by [`Self::run_with_error`].
    pub fn run<F: Fn(f64) -> f64 + ?Sized>(&self, f: &F, a: f64, b: f64) -> Result<f64, MathError> {
        self.run_with_error(f, a, b).map(|(value, _)| value)
    }

    pub fn run_with_error<F: Fn(f64) -> f64 + ?Sized>(
        &self,
        f: &F,
        a: f64,
        b: f64,
    ) -> Result<(f64, f64), MathError> {
        if a.is_nan() || b.is_nan() {
            return Err(MathError::DomainError {
                what: "NaN integration endpoint".to_string(),
            });
        }
        if a == b {
            return Ok((0.0, 0.0));
        }
        if a > b {
            let (value, error) = self.run_with_error(f, b, a)?;
            return Ok((-value, error));
        }

        // Fold infinite endpoints onto a finite image interval.
        match (a.is_infinite(), b.is_infinite()) {
            (true, true) => {
                // t = x / (1 - x^2) maps (-1, 1) onto the whole line.
                let g = |x: f64| {
                    let den = 1.0 - x * x;
                    f(x / den) * (1.0 + x * x) / (den * den)
                };
                self.run_finite(&g, -1.0, 1.0)
            }
            (false, true) => {
                // t = a + x / (1 - x) maps [0, 1) onto [a, inf).
                let g = |x: f64| {
                    let den = 1.0 - x;
                    f(a + x / den) / (den * den)
                };
                self.run_finite(&g, 0.0, 1.0)
            }
            (true, false) => {
                // Mirror of the semi-infinite case.
                let g = |x: f64| {
                    let den = 1.0 - x;
                    f(b - x / den) / (den * den)
                };
                self.run_finite(&g, 0.0, 1.0)
            }
            (false, false) => self.run_finite(f, a, b),
        }
    }

    fn run_finite<F: Fn(f64) -> f64 + ?Sized>(
        &self,
        f: &F,
        a: f64,
        b: f64,
    ) -> Result<(f64, f64), MathError> {
        if self.gauss_only {
            return Ok((self.gauss_integrate(f, a, b), f64::NAN));
        }
        let tol_density = 10_f64.powf(-self.tolerance_nlog);
        let mut error = 0.0;
        let mut l1 = 0.0;
        let value = self.gk_adaptive(f, a, b, 0, tol_density, &mut error, &mut l1);
        if !value.is_finite() {
            return Err(MathError::DomainError {
                what: format!("non-finite integrand over [{}, {}]", a, b),
            });
        }
        Ok((value, error))
    }
}

/// Computes the `(gauss, kronrod)` positive-half tables for an arbitrary
/// odd rule size from Legendre and Stieltjes roots.
fn compute_nodes_and_weights(
    order: usize,
) -> Result<(Vec<(f64, f64)>, Vec<(f64, f64)>), MathError> {
    if order < 3 || order % 2 == 0 {
        return Err(MathError::InvalidArgument {
            what: format!("Kronrod rule size {} is not an odd number >= 3", order),
        });
    }
    let g = (order - 1) / 2;

    let legendre = Polynomial::new(legendre_polynomial_coefficients(g as u64));
    let d_legendre = legendre.derivative();
    let gauss_nodes = refined_real_roots(&legendre, &d_legendre)?;

    // Gauss weights: w = 2 / ((1 - x^2) P'(x)^2); finite at every interior
    // root.
    let mut gauss: Vec<(f64, f64)> = gauss_nodes
        .iter()
        .filter(|x| **x > -1e-14)
        .map(|x| {
            let x = if x.abs() < 1e-14 { 0.0 } else { *x };
            let dp = d_legendre.eval(x);
            (x, 2.0 / ((1.0 - x * x) * dp * dp))
        })
        .collect();
    gauss.sort_by(|p, q| q.0.partial_cmp(&p.0).unwrap());

    let stieltjes = Polynomial::new(stieltjes_polynomial_coefficients(g as u64 + 1)?);
    let d_stieltjes = stieltjes.derivative();
    let stieltjes_nodes = refined_real_roots(&stieltjes, &d_stieltjes)?;

    // Merge the node families over the positive half, descending; the
    // Stieltjes roots interlace the Gauss roots so they occupy the even
    // positions of the merged table.
    let mut kronrod: Vec<(f64, bool, f64)> = Vec::with_capacity(g + 1);
    for (x, w) in &gauss {
        kronrod.push((*x, true, *w));
    }
    for x in stieltjes_nodes.iter().filter(|x| **x > -1e-14) {
        let x = if x.abs() < 1e-14 { 0.0 } else { *x };
        kronrod.push((x, false, 0.0));
    }
    kronrod.sort_by(|p, q| q.0.partial_cmp(&p.0).unwrap());

    // Patterson's weight formulas, distinguishing Gauss from
    // Stieltjes-only nodes.
    let np1 = (g + 1) as f64;
    let kronrod: Vec<(f64, f64)> = kronrod
        .into_iter()
        .map(|(x, is_gauss, gauss_weight)| {
            let weight = if is_gauss {
                gauss_weight + 2.0 / (np1 * d_legendre.eval(x) * stieltjes.eval(x))
            } else {
                2.0 / (np1 * legendre.eval(x) * d_stieltjes.eval(x))
            };
            (x, weight)
        })
        .collect();

    // The full rule must reproduce the measure of [-1, 1].
    let total: f64 = kronrod
        .iter()
        .map(|(x, w)| if *x == 0.0 { *w } else { 2.0 * w })
        .sum();
    if (total - 2.0).abs() > 1e-8 {
        return Err(MathError::SingularSolve {
            what: format!(
                "computed {}-point Kronrod weights sum to {} instead of 2",
                order, total
            ),
        });
    }
    Ok((gauss, kronrod))
}

/// All real roots of p, polished by Newton iteration, ascending.
fn refined_real_roots(p: &Polynomial, dp: &Polynomial) -> Result<Vec<f64>, MathError> {
    let raw = solve_poly(p.coefficients())?;
    let mut roots: Vec<f64> = raw
        .into_iter()
        .filter(|z| z.im.abs() < 1e-8)
        .map(|z| {
            newton(
                |x| p.eval(x),
                |x| dp.eval(x),
                z.re,
                1.7,
                15.0,
                f64::INFINITY,
            )
            .unwrap_or(z.re)
        })
        .collect();
    roots.sort_by(|a, b| a.partial_cmp(b).unwrap());
    roots.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
    Ok(roots)
}
