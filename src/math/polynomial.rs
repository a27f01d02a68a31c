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
use crate::linalg::Complex;
use std::f64::consts::PI;

type C64 = Complex<f64>;

/// A polynomial over f64 with coefficients stored in descending power
/// order, `[a_n, a_{n-1}, ..., a_0]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// The highest power, n for a length n+1 coefficient vector.
    pub fn max_power(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Horner evaluation.
    pub fn eval(&self, x: f64) -> f64 {
        self.coefficients.iter().fold(0.0, |acc, c| acc * x + c)
    }

    /// Horner evaluation over the complex plane.
    pub fn eval_complex(&self, z: C64) -> C64 {
        self.coefficients
            .iter()
            .fold(C64::new(0.0, 0.0), |acc, c| acc * z + c)
    }

    /// The derivative polynomial.
    pub fn derivative(&self) -> Polynomial {
        let n = self.max_power();
        if n == 0 {
            return Polynomial::new(vec![0.0]);
        }
        let coefficients = self
            .coefficients
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, c)| c * (n - i) as f64)
            .collect();
        Polynomial::new(coefficients)
    }
}

/// Initial-guess strategy for the Durand-Kerner simultaneous iteration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DurandKernerSeed {
    /// Powers of 0.4 + 0.9i, the classic non-symmetric seed.
    Power,
    /// Guesses evenly placed on a circle whose radius bounds the roots.
    Circular,
    /// Continuation from the roots of z^n - 1 through the blended
    /// polynomial (1 - alpha) * (z^n - 1) + alpha * p(z).
    Homotopic(f64),
}

/// Tunables for [`solve_poly_with`]. All tolerances are negative decimal
/// logs, iteration caps are decimal logs.
#[derive(Copy, Clone, Debug)]
pub struct SolvePolyOptions {
    /// Zero-discriminant threshold for the cubic branch selection.
    pub discriminant_tol: f64,
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_iter_log: f64,
    pub seed: DurandKernerSeed,
}

impl Default for SolvePolyOptions {
    fn default() -> Self {
        Self {
            discriminant_tol: 10.0,
            abs_tol: 14.0,
            rel_tol: 14.0,
            max_iter_log: 3.0,
            seed: DurandKernerSeed::Power,
        }
    }
}

/// Solves a polynomial of any degree >= 1 given descending coefficients.
///
/// Degrees 1-4 use closed forms (quadratic formula, the corrected
/// Fan-Shengjin cubic scheme, the resolvent-cubic quartic decomposition);
/// degree 5 and higher run the Durand-Kerner simultaneous iteration. The
/// returned vector holds exactly `degree` roots; the ordering of roots that
/// coincide within tolerance is unspecified.
pub fn solve_poly(coeffs: &[f64]) -> Result<Vec<C64>, MathError> {
    solve_poly_with(coeffs, &SolvePolyOptions::default())
}

/// [`solve_poly`] with explicit tunables.
pub fn solve_poly_with(coeffs: &[f64], opts: &SolvePolyOptions) -> Result<Vec<C64>, MathError> {
    validate(coeffs)?;
    let n = coeffs.len() - 1;
    match n {
        1 => Ok(solve_linear(coeffs)),
        2 => Ok(solve_quadratic(coeffs)),
        3 => Ok(solve_cubic(coeffs, opts.discriminant_tol)),
        4 => Ok(solve_quartic(coeffs, opts.discriminant_tol)),
        _ => durand_kerner(coeffs, opts),
    }
}

/// Solves into a caller-provided buffer whose length must match the degree.
pub fn solve_poly_into(coeffs: &[f64], out: &mut [C64]) -> Result<(), MathError> {
    validate(coeffs)?;
    if out.len() != coeffs.len() - 1 {
        return Err(MathError::InvalidArgument {
            what: format!(
                "output buffer of {} roots for a degree {} polynomial",
                out.len(),
                coeffs.len() - 1
            ),
        });
    }
    let roots = solve_poly(coeffs)?;
    out.copy_from_slice(&roots);
    Ok(())
}

fn validate(coeffs: &[f64]) -> Result<(), MathError> {
    if coeffs.len() < 2 {
        return Err(MathError::InvalidArgument {
            what: "at least a linear polynomial is required".to_string(),
        });
    }
    if coeffs[0] == 0.0 {
        return Err(MathError::InvalidArgument {
            what: "leading coefficient must be non-zero".to_string(),
        });
    }
    Ok(())
}

fn solve_linear(coeffs: &[f64]) -> Vec<C64> {
    vec![C64::new(-coeffs[1] / coeffs[0], 0.0)]
}

fn solve_quadratic(coeffs: &[f64]) -> Vec<C64> {
    let (a, b, c) = (coeffs[0], coeffs[1], coeffs[2]);
    let disc = C64::new(b * b - 4.0 * a * c, 0.0).sqrt();
    let b = C64::new(b, 0.0);
    let den = 2.0 * a;
    vec![(-b + disc) / den, (-b - disc) / den]
}

/// Degree-3 closed form, the corrected Fan-Shengjin scheme.
///
/// Discriminants `A = b^2 - 3ac`, `B = bc - 9ad`, `C = c^2 - 3bd`,
/// `delta = B^2 - 4AC`; `tol` is the negative decimal log below which a
/// discriminant counts as zero.
pub fn solve_cubic(coeffs: &[f64], tol: f64) -> Vec<C64> {
    let (a, b, c, d) = (coeffs[0], coeffs[1], coeffs[2], coeffs[3]);
    let eps = 10_f64.powf(-tol);

    let big_a = b * b - 3.0 * a * c;
    let big_b = b * c - 9.0 * a * d;
    let big_c = c * c - 3.0 * b * d;
    let delta = big_b * big_b - 4.0 * big_a * big_c;

    if big_a.abs() < eps && big_b.abs() < eps {
        // One triple root.
        let x = C64::new(-b / (3.0 * a), 0.0);
        return vec![x, x, x];
    }

    if delta.abs() < eps {
        // Two distinct real roots, one of them double.
        let k = big_b / big_a;
        let x1 = C64::new(-b / a + k, 0.0);
        let x2 = C64::new(-k / 2.0, 0.0);
        return vec![x1, x2, x2];
    }

    if delta > 0.0 {
        // One real root and a conjugate complex pair.
        let sq = delta.sqrt();
        let y1 = big_a * b + 1.5 * a * (-big_b + sq);
        let y2 = big_a * b + 1.5 * a * (-big_b - sq);
        let cb1 = y1.cbrt();
        let cb2 = y2.cbrt();
        let x1 = C64::new((-b - (cb1 + cb2)) / (3.0 * a), 0.0);
        let re = (-2.0 * b + (cb1 + cb2)) / (6.0 * a);
        let im = 3_f64.sqrt() * (cb1 - cb2) / (6.0 * a);
        return vec![x1, C64::new(re, im), C64::new(re, -im)];
    }

    // delta < 0 with A > 0: three distinct real roots, trigonometric form.
    let sqrt_a = big_a.sqrt();
    let t = (2.0 * big_a * b - 3.0 * a * big_b) / (2.0 * big_a * sqrt_a);
    let theta = t.clamp(-1.0, 1.0).acos();
    let (s3, c3) = (theta / 3.0).sin_cos();
    let x1 = (-b - 2.0 * sqrt_a * c3) / (3.0 * a);
    let x2 = (-b + sqrt_a * (c3 + 3_f64.sqrt() * s3)) / (3.0 * a);
    let x3 = (-b + sqrt_a * (c3 - 3_f64.sqrt() * s3)) / (3.0 * a);
    vec![C64::new(x1, 0.0), C64::new(x2, 0.0), C64::new(x3, 0.0)]
}

/// Degree-4 closed form via the resolvent cubic and a pair of quadratics.
pub fn solve_quartic(coeffs: &[f64], tol: f64) -> Vec<C64> {
    // Normalize to monic x^4 + b x^3 + c x^2 + d x + e, then depress with
    // x = t - b/4 to t^4 + p t^2 + q t + r.
    let b = coeffs[1] / coeffs[0];
    let c = coeffs[2] / coeffs[0];
    let d = coeffs[3] / coeffs[0];
    let e = coeffs[4] / coeffs[0];

    let p = c - 3.0 * b * b / 8.0;
    let q = d - b * c / 2.0 + b * b * b / 8.0;
    let r = e - b * d / 4.0 + b * b * c / 16.0 - 3.0 * b.powi(4) / 256.0;
    let shift = C64::new(-b / 4.0, 0.0);

    let scale = 1_f64.max(p.abs()).max(r.abs());
    if q.abs() < 1e-12 * scale {
        // Biquadratic: t^2 solves a quadratic.
        let mut roots = Vec::with_capacity(4);
        for z in solve_quadratic(&[1.0, p, r]) {
            let t = z.sqrt();
            roots.push(t + shift);
            roots.push(-t + shift);
        }
        return roots;
    }

    // Resolvent cubic m^3 + p m^2 + (p^2/4 - r) m - q^2/8 = 0; any root m
    // with 2m != 0 factors the depressed quartic into two quadratics
    // t^2 +- s t + (p/2 + m -+ q/(2s)) with s = sqrt(2m).
    let resolvent = solve_cubic(&[1.0, p, p * p / 4.0 - r, -q * q / 8.0], tol);
    // Any resolvent root factors the quartic; a real one with the largest
    // magnitude keeps sqrt(2m) away from zero.
    let reals: Vec<C64> = resolvent
        .iter()
        .filter(|z| z.im.abs() <= 1e-10 * (1.0 + z.norm()))
        .copied()
        .collect();
    let pool = if reals.is_empty() { resolvent } else { reals };
    let m = pool
        .into_iter()
        .max_by(|x, y| x.norm().partial_cmp(&y.norm()).unwrap())
        .unwrap();
    let s = (2.0 * m).sqrt();
    let u = (C64::new(p, 0.0) + 2.0 * m - q / s) / 2.0;
    let w = (C64::new(p, 0.0) + 2.0 * m + q / s) / 2.0;

    let mut roots = Vec::with_capacity(4);
    for (lin, cst) in [(s, u), (-s, w)] {
        let disc = (lin * lin - 4.0 * cst).sqrt();
        roots.push((-lin + disc) / 2.0 + shift);
        roots.push((-lin - disc) / 2.0 + shift);
    }
    roots
}

fn seed_guesses(coeffs: &[f64], seed: DurandKernerSeed, opts: &SolvePolyOptions) -> Vec<C64> {
    let n = coeffs.len() - 1;
    match seed {
        DurandKernerSeed::Power => {
            let c = C64::new(0.4, 0.9);
            let mut z = Vec::with_capacity(n);
            let mut acc = C64::new(1.0, 0.0);
            for _ in 0..n {
                z.push(acc);
                acc *= c;
            }
            z
        }
        DurandKernerSeed::Circular => {
            // Cauchy-style bound on the root magnitudes.
            let a0 = coeffs[0].abs();
            let radius = 1.0
                + coeffs[1..]
                    .iter()
                    .map(|c| (c.abs() / a0))
                    .fold(0.0, f64::max);
            (0..n)
                .map(|k| {
                    let phi = 2.0 * PI * k as f64 / n as f64 + PI / (2.0 * n as f64);
                    C64::from_polar(radius, phi)
                })
                .collect()
        }
        DurandKernerSeed::Homotopic(alpha) => {
            // Blend towards z^n - 1, whose roots are exact seeds, then use
            // the blended roots to start on the full polynomial.
            let alpha = alpha.clamp(0.0, 1.0);
            let mut simple = vec![0.0; n + 1];
            simple[0] = 1.0;
            simple[n] = -1.0;
            let blended: Vec<f64> = coeffs
                .iter()
                .zip(simple.iter())
                .map(|(full, smp)| alpha * full + (1.0 - alpha) * smp)
                .collect();
            let unit_roots: Vec<C64> = (0..n)
                .map(|k| C64::from_polar(1.0, 2.0 * PI * k as f64 / n as f64))
                .collect();
            let mut inner = *opts;
            inner.max_iter_log = (opts.max_iter_log - 1.0).max(1.0);
            match durand_kerner_from(&blended, unit_roots.clone(), &inner) {
                Ok(z) => z,
                Err(_) => unit_roots,
            }
        }
    }
}

fn durand_kerner(coeffs: &[f64], opts: &SolvePolyOptions) -> Result<Vec<C64>, MathError> {
    let guesses = seed_guesses(coeffs, opts.seed, opts);
    durand_kerner_from(coeffs, guesses, opts)
}

/// The simultaneous iteration `z_i <- z_i - p(z_i) / prod_{j != i}(z_i - z_j)`
/// from the given starting guesses.
fn durand_kerner_from(
    coeffs: &[f64],
    mut z: Vec<C64>,
    opts: &SolvePolyOptions,
) -> Result<Vec<C64>, MathError> {
    let n = z.len();
    // Monic scaling keeps p(z_i) and the denominator products commensurate.
    let monic: Vec<f64> = coeffs.iter().map(|c| c / coeffs[0]).collect();
    let p = Polynomial::new(monic);

    let atol = 10_f64.powf(-opts.abs_tol);
    let rtol = 10_f64.powf(-opts.rel_tol);
    let max_iterations = 10_f64.powf(opts.max_iter_log).floor().max(1.0) as u64;

    let mut worst_residual = f64::INFINITY;
    for iteration in 0..max_iterations {
        let mut converged = true;
        let mut max_delta = 0.0_f64;
        for i in 0..n {
            let mut denom = C64::new(1.0, 0.0);
            for j in 0..n {
                if j != i {
                    denom *= z[i] - z[j];
                }
            }
            if denom.norm() == 0.0 {
                // Coincident guesses: nudge and retry next sweep.
                z[i] += C64::new(1e-8, 1e-8);
                converged = false;
                continue;
            }
            let delta = p.eval_complex(z[i]) / denom;
            z[i] -= delta;
            max_delta = max_delta.max(delta.norm());
            if delta.norm() >= atol + rtol * z[i].norm() {
                converged = false;
            }
        }
        worst_residual = max_delta;
        if converged {
            trace!(
                "Durand-Kerner converged in {} iterations (last delta {:.3e})",
                iteration + 1,
                max_delta
            );
            return Ok(z);
        }
    }
    Err(MathError::ConvergenceFailed {
        iterations: max_iterations,
        residual: worst_residual,
    })
}

#[cfg(test)]
mod ut_polynomial {
    use super::*;

    fn assert_root_set(roots: &[C64], expected: &[C64], tol: f64) {
        assert_eq!(roots.len(), expected.len());
        let mut used = vec![false; roots.len()];
        for e in expected {
            let found = roots.iter().enumerate().any(|(i, r)| {
                if !used[i] && (r - e).norm() < tol {
                    used[i] = true;
                    true
                } else {
                    false
                }
            });
            assert!(found, "no root matched {} among {:?}", e, roots);
        }
    }

    #[test]
    fn eval_and_derivative() {
        let p = Polynomial::new(vec![2.0, -3.0, 1.0]); // 2x^2 - 3x + 1
        assert_eq!(p.eval(2.0), 3.0);
        assert_eq!(p.derivative().coefficients(), &[4.0, -3.0]);
        assert_eq!(p.max_power(), 2);
    }

    #[test]
    fn linear_and_quadratic() {
        let r = solve_poly(&[2.0, -4.0]).unwrap();
        assert!((r[0].re - 2.0).abs() < 1e-15);

        let r = solve_poly(&[1.0, 0.0, -4.0]).unwrap();
        assert_root_set(&r, &[C64::new(2.0, 0.0), C64::new(-2.0, 0.0)], 1e-14);

        // Complex pair.
        let r = solve_poly(&[1.0, 0.0, 1.0]).unwrap();
        assert_root_set(&r, &[C64::new(0.0, 1.0), C64::new(0.0, -1.0)], 1e-14);
    }

    #[test]
    fn cubic_three_real() {
        // (x-1)(x-2)(x-3)
        let r = solve_poly(&[1.0, -6.0, 11.0, -6.0]).unwrap();
        assert_root_set(
            &r,
            &[C64::new(1.0, 0.0), C64::new(2.0, 0.0), C64::new(3.0, 0.0)],
            1e-12,
        );
    }

    #[test]
    fn cubic_special_cases() {
        // Triple root (x-2)^3 = x^3 - 6x^2 + 12x - 8
        let r = solve_poly(&[1.0, -6.0, 12.0, -8.0]).unwrap();
        assert_root_set(&r, &[C64::new(2.0, 0.0); 3], 1e-6);

        // Double root (x-1)^2 (x-4) = x^3 - 6x^2 + 9x - 4
        let r = solve_poly(&[1.0, -6.0, 9.0, -4.0]).unwrap();
        assert_root_set(
            &r,
            &[C64::new(1.0, 0.0), C64::new(1.0, 0.0), C64::new(4.0, 0.0)],
            1e-6,
        );

        // One real, two complex: x^3 - 1 has roots at the cube roots of 1.
        let r = solve_poly(&[1.0, 0.0, 0.0, -1.0]).unwrap();
        let half_sqrt3 = 3_f64.sqrt() / 2.0;
        assert_root_set(
            &r,
            &[
                C64::new(1.0, 0.0),
                C64::new(-0.5, half_sqrt3),
                C64::new(-0.5, -half_sqrt3),
            ],
            1e-12,
        );
    }

    #[test]
    fn quartic_roots() {
        // (x-1)(x+1)(x-2)(x+2) = x^4 - 5x^2 + 4
        let r = solve_poly(&[1.0, 0.0, -5.0, 0.0, 4.0]).unwrap();
        assert_root_set(
            &r,
            &[
                C64::new(1.0, 0.0),
                C64::new(-1.0, 0.0),
                C64::new(2.0, 0.0),
                C64::new(-2.0, 0.0),
            ],
            1e-10,
        );

        // General quartic with a complex pair: (x^2+1)(x-3)(x+5)
        // = x^4 + 2x^3 - 14x^2 + 2x - 15
        let r = solve_poly(&[1.0, 2.0, -14.0, 2.0, -15.0]).unwrap();
        assert_root_set(
            &r,
            &[
                C64::new(3.0, 0.0),
                C64::new(-5.0, 0.0),
                C64::new(0.0, 1.0),
                C64::new(0.0, -1.0),
            ],
            1e-9,
        );
    }

    #[test]
    fn durand_kerner_quintic() {
        // (x-1)(x-2)(x-3)(x-4)(x-5)
        let coeffs = [1.0, -15.0, 85.0, -225.0, 274.0, -120.0];
        for seed in [
            DurandKernerSeed::Power,
            DurandKernerSeed::Circular,
            DurandKernerSeed::Homotopic(0.5),
        ] {
            let opts = SolvePolyOptions {
                seed,
                ..Default::default()
            };
            let r = solve_poly_with(&coeffs, &opts).unwrap();
            let expected: Vec<C64> = (1..=5).map(|k| C64::new(k as f64, 0.0)).collect();
            assert_root_set(&r, &expected, 1e-8);
        }
    }

    #[test]
    fn residuals_stay_small_across_degrees() {
        // Wilkinson-lite sweep: residual |p(x_i)| bounded relative to the
        // coefficient magnitude and root powers.
        for n in 5..=12usize {
            let mut coeffs = vec![1.0];
            // p(x) = prod (x - k/n), built by convolution.
            for k in 1..=n {
                let root = k as f64 / n as f64;
                let mut next = vec![0.0; coeffs.len() + 1];
                for (i, c) in coeffs.iter().enumerate() {
                    next[i] += c;
                    next[i + 1] -= c * root;
                }
                coeffs = next;
            }
            let p = Polynomial::new(coeffs.clone());
            let roots = solve_poly(&coeffs).unwrap();
            let coeff_inf = coeffs.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
            for root in roots {
                let res = p.eval_complex(root).norm();
                assert!(
                    res < 1e-9 * coeff_inf.max(1.0),
                    "degree {}: residual {:e} at {}",
                    n,
                    res,
                    root
                );
            }
        }
    }

    #[test]
    fn validation_errors() {
        assert!(solve_poly(&[1.0]).is_err());
        assert!(solve_poly(&[0.0, 1.0, 2.0]).is_err());
        let mut out = vec![C64::new(0.0, 0.0); 3];
        assert!(solve_poly_into(&[1.0, -1.0], &mut out).is_err());
    }
}
