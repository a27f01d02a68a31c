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
use crate::math::matrix::DenseMatrix;

/// Factorial of a non-negative value.
pub fn factorial(num: f64) -> f64 {
    if num <= f64::EPSILON || (num - 1.0).abs() <= f64::EPSILON {
        1.0
    } else {
        num * factorial(num - 1.0)
    }
}

/// Binomial coefficient C(n, k) in exact integer arithmetic.
///
/// Multiplicative form, dividing at every step so intermediates stay within
/// u64 for every representable result.
pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u64 = 1;
    for i in 0..k {
        acc = acc * (n - i) / (i + 1);
    }
    acc
}

/// Binomial coefficient as a float, for the triangular recurrences where n
/// can exceed what u64 holds.
pub fn binomial_f(n: u64, k: u64) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut acc = 1.0;
    for i in 0..k {
        acc *= (n - i) as f64 / (i + 1) as f64;
    }
    acc
}

/// Values of all elementary symmetric polynomials of the input.
///
/// Returns `[e_0 = 1, e_1, ..., e_n]` via the O(n^2) dynamic-programming
/// recurrence: inserting x_j updates e_k += x_j * e_{k-1} from high k down.
pub fn elementary_symmetric_polynomial(v: &[f64]) -> Vec<f64> {
    let mut e = vec![0.0; v.len() + 1];
    e[0] = 1.0;
    for (j, x) in v.iter().enumerate() {
        for k in (1..=j + 1).rev() {
            e[k] += x * e[k - 1];
        }
    }
    e
}

/// The Vandermonde matrix of the nodes: element `(col j, row i)` is
/// `v[j]^i`, so each column holds the ascending powers of one node.
pub fn vandermonde(v: &[f64]) -> DenseMatrix {
    let n = v.len();
    let mut m = DenseMatrix::zeros(n, n);
    for (j, x) in v.iter().enumerate() {
        let mut p = 1.0;
        for i in 0..n {
            *m.at_mut(j, i) = p;
            p *= x;
        }
    }
    m
}

/// Closed-form inverse of the Vandermonde matrix of the nodes.
///
/// Row p, column q of the inverse is
/// `(-1)^(n-1-q) * e_{n-1-q}(nodes without v[p]) / prod_{i != p}(v[p] - v[i])`,
/// with e_k the elementary symmetric polynomials of the reduced node set.
/// O(n^2) overall. Coincident nodes make the denominator vanish and are
/// reported as [`MathError::SingularSolve`].
pub fn inverse_vandermonde(v: &[f64]) -> Result<DenseMatrix, MathError> {
    let n = v.len();
    if n == 0 {
        return Err(MathError::InvalidArgument {
            what: "cannot invert an empty Vandermonde matrix".to_string(),
        });
    }
    let mut inv = DenseMatrix::zeros(n, n);
    for p in 0..n {
        let reduced: Vec<f64> = v
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != p)
            .map(|(_, x)| *x)
            .collect();
        let e = elementary_symmetric_polynomial(&reduced);
        let mut denom = 1.0;
        for x in &reduced {
            denom *= v[p] - x;
        }
        if denom == 0.0 {
            return Err(MathError::SingularSolve {
                what: format!("coincident Vandermonde nodes at value {}", v[p]),
            });
        }
        for q in 0..n {
            let sign = if (n - 1 - q) % 2 == 0 { 1.0 } else { -1.0 };
            *inv.at_mut(q, p) = sign * e[n - 1 - q] / denom;
        }
    }
    Ok(inv)
}

/// Coefficients of the degree-n Legendre polynomial of the first kind, in
/// descending power order with zeros for the missing parity.
///
/// The leading coefficient is C(2n, n)/2^n and successive even/odd terms
/// follow from the ratio
/// `c_{k+1}/c_k = -(n-2k)(n-2k-1) / (2(k+1)(2n-2k-1))`,
/// which sidesteps the factorial overflow of the closed form.
pub fn legendre_polynomial_coefficients(n: u64) -> Vec<f64> {
    let mut coeffs = vec![0.0; n as usize + 1];
    let mut c = binomial_f(2 * n, n) / 2_f64.powi(n as i32);
    let mut k = 0u64;
    loop {
        // Power n - 2k sits at index 2k of the descending vector.
        coeffs[(2 * k) as usize] = c;
        if n < 2 * (k + 1) {
            break;
        }
        let num = (n - 2 * k) as f64 * (n - 2 * k - 1) as f64;
        let den = 2.0 * (k + 1) as f64 * (2 * n - 2 * k - 1) as f64;
        c *= -num / den;
        k += 1;
    }
    coeffs
}

/// Integral over [-1, 1] of the polynomial with the given descending
/// coefficients: odd powers vanish, even power m contributes 2/(m+1).
fn symmetric_moment_integral(desc: &[f64]) -> f64 {
    let deg = desc.len() - 1;
    let mut acc = 0.0;
    for (i, c) in desc.iter().enumerate() {
        let power = deg - i;
        if power % 2 == 0 {
            acc += c * 2.0 / (power as f64 + 1.0);
        }
    }
    acc
}

/// Product of two descending coefficient vectors.
fn poly_product(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, ca) in a.iter().enumerate() {
        if *ca == 0.0 {
            continue;
        }
        for (j, cb) in b.iter().enumerate() {
            out[i + j] += ca * cb;
        }
    }
    out
}

/// `I(a, k) = integral of P_a(x) * P_ref(x) * x^k over [-1, 1]`, with both
/// polynomials given by descending coefficients.
fn legendre_product_moment(p_a: &[f64], p_ref: &[f64], k: usize) -> f64 {
    let mut prod = poly_product(p_a, p_ref);
    // Multiplying by x^k appends k zero coefficients in descending order.
    prod.extend(std::iter::repeat(0.0).take(k));
    symmetric_moment_integral(&prod)
}

/// Coefficients of the degree-N Stieltjes polynomial E_N, descending order,
/// zeros for the missing parity.
///
/// E_N is the monic-in-P_N combination `P_N + sum_i a_i P_{N-2i}` that is
/// orthogonal to `P_{N-1} x^k` for all k < N. Parity kills half of those
/// conditions; the floor(N/2) surviving ones (odd k) form a small linear
/// system in the a_i, solved directly. The product-moment integrals are
/// evaluated exactly from the monomial expansions.
pub fn stieltjes_polynomial_coefficients(n: u64) -> Result<Vec<f64>, MathError> {
    if n == 0 {
        return Err(MathError::InvalidArgument {
            what: "Stieltjes polynomials start at degree 1".to_string(),
        });
    }
    let p_ref = legendre_polynomial_coefficients(n - 1);
    let p_n = legendre_polynomial_coefficients(n);
    let r = (n / 2) as usize;
    if r == 0 {
        // E_1 = P_1.
        return Ok(p_n);
    }

    let lower: Vec<Vec<f64>> = (1..=r)
        .map(|i| legendre_polynomial_coefficients(n - 2 * i as u64))
        .collect();

    let mut system = DenseMatrix::zeros(r, r);
    let mut rhs = vec![0.0; r];
    for row in 0..r {
        let k = 2 * row + 1;
        for (i, p_low) in lower.iter().enumerate() {
            *system.at_mut(i, row) = legendre_product_moment(p_low, &p_ref, k);
        }
        rhs[row] = -legendre_product_moment(&p_n, &p_ref, k);
    }
    let a = system.solve(&rhs)?;

    let mut coeffs = p_n;
    for (i, p_low) in lower.iter().enumerate() {
        let offset = coeffs.len() - p_low.len();
        for (j, c) in p_low.iter().enumerate() {
            coeffs[offset + j] += a[i] * c;
        }
    }
    Ok(coeffs)
}

/// The triangular array of incomplete Bell polynomial values B_{n,k} for
/// the argument sequence x.
///
/// The result is an (m+1)x(m+1) matrix with `at(n, k) = B_{n,k}(x_1..)`;
/// cells outside the triangle (k > n) are NaN. Filled by the recurrence
/// `B_{n+1,k+1} = sum_{i=0}^{n-k} C(n,i) x_{i+1} B_{n-i,k}`.
pub fn bell_polynomials_triangular_array(x: &[f64]) -> DenseMatrix {
    let m = x.len();
    let mut tri = DenseMatrix::filled(m + 1, m + 1, f64::NAN);
    *tri.at_mut(0, 0) = 1.0;
    for n in 1..=m {
        *tri.at_mut(n, 0) = 0.0;
    }
    for k in 0..m {
        for n in k..m {
            // Target B_{n+1, k+1}.
            let mut acc = 0.0;
            for i in 0..=(n - k) {
                let b = tri.at(n - i, k);
                if b.is_nan() {
                    continue;
                }
                acc += binomial_f(n as u64, i as u64) * x[i] * b;
            }
            *tri.at_mut(n + 1, k + 1) = acc;
        }
    }
    tri
}

#[cfg(test)]
mod ut_specfun {
    use super::*;

    #[test]
    fn elementary_symmetric_small() {
        let e = elementary_symmetric_polynomial(&[2.0, 3.0, 4.0]);
        assert_eq!(e, vec![1.0, 9.0, 26.0, 24.0]);
        // e_0 = 1 and e_n = product of the inputs, always.
        let v = [1.5, -2.0, 0.25, 8.0];
        let e = elementary_symmetric_polynomial(&v);
        assert_eq!(e[0], 1.0);
        let prod: f64 = v.iter().product();
        assert!((e[4] - prod).abs() < 1e-12);
    }

    #[test]
    fn vandermonde_inverse_is_inverse() {
        let nodes = [2.0, 3.0, 4.0, 5.0];
        let v = vandermonde(&nodes);
        let inv = inverse_vandermonde(&nodes).unwrap();
        // Documented value check on the first row.
        assert!((inv.at(0, 0) - 10.0).abs() < 1e-12);
        assert!((inv.at(1, 0) + 47.0 / 6.0).abs() < 1e-12);
        let prod = inv.try_mul(&v).unwrap();
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((prod.at(i, j) - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn vandermonde_inverse_larger_sets() {
        for n in [8usize, 14, 20] {
            let nodes: Vec<f64> = (0..n).map(|i| -1.0 + 2.0 * i as f64 / (n - 1) as f64).collect();
            let v = vandermonde(&nodes);
            let inv = inverse_vandermonde(&nodes).unwrap();
            let prod = inv.try_mul(&v).unwrap();
            for i in 0..n {
                for j in 0..n {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert!(
                        (prod.at(i, j) - expected).abs() < 1e-12 * (n * n) as f64,
                        "n = {}: ({}, {}) off by {:e}",
                        n,
                        i,
                        j,
                        (prod.at(i, j) - expected).abs()
                    );
                }
            }
        }
    }

    #[test]
    fn duplicate_nodes_are_singular() {
        assert!(matches!(
            inverse_vandermonde(&[1.0, 1.0, 2.0]),
            Err(MathError::SingularSolve { .. })
        ));
    }

    #[test]
    fn legendre_known_coefficients() {
        fn assert_close(got: &[f64], expected: &[f64]) {
            assert_eq!(got.len(), expected.len());
            for (g, e) in got.iter().zip(expected.iter()) {
                assert!((g - e).abs() < 1e-12, "{:?} vs {:?}", got, expected);
            }
        }
        assert_close(&legendre_polynomial_coefficients(0), &[1.0]);
        assert_close(&legendre_polynomial_coefficients(1), &[1.0, 0.0]);
        assert_close(&legendre_polynomial_coefficients(2), &[1.5, 0.0, -0.5]);
        assert_close(
            &legendre_polynomial_coefficients(4),
            &[4.375, 0.0, -3.75, 0.0, 0.375],
        );
        let p10 = legendre_polynomial_coefficients(10);
        assert!((p10[0] - 180.42578125).abs() < 1e-12);
        assert!((p10[10] + 0.24609375).abs() < 1e-12);
    }

    #[test]
    fn legendre_orthogonality() {
        for n in 1..=6u64 {
            for m in 0..n {
                let i = legendre_product_moment(
                    &legendre_polynomial_coefficients(n),
                    &legendre_polynomial_coefficients(m),
                    0,
                );
                assert!(i.abs() < 1e-12, "<P{}, P{}> = {:e}", n, m, i);
            }
        }
    }

    #[test]
    fn stieltjes_low_degrees() {
        // E_2 = P_2 - (2/5) P_0 = 1.5 x^2 - 0.9
        let e2 = stieltjes_polynomial_coefficients(2).unwrap();
        assert!((e2[0] - 1.5).abs() < 1e-12);
        assert!((e2[2] - (-0.5 - 0.4)).abs() < 1e-12);
        // E_3 = P_3 - (9/14) P_1
        let e3 = stieltjes_polynomial_coefficients(3).unwrap();
        assert!((e3[0] - 2.5).abs() < 1e-12);
        assert!((e3[2] - (-1.5 - 9.0 / 14.0)).abs() < 1e-12);
        // E_4 = P_4 - (20/27) P_2 + (14/891) P_0
        let e4 = stieltjes_polynomial_coefficients(4).unwrap();
        assert!((e4[0] - 4.375).abs() < 1e-12);
        assert!((e4[2] - (-3.75 - 20.0 / 27.0 * 1.5)).abs() < 1e-12);
        assert!((e4[4] - (0.375 + 20.0 / 27.0 * 0.5 + 14.0 / 891.0)).abs() < 1e-12);
    }

    #[test]
    fn bell_triangle_documented_values() {
        let tri = bell_polynomials_triangular_array(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(tri.at(0, 0), 1.0);
        assert_eq!(tri.at(3, 1), 3.0);
        assert_eq!(tri.at(3, 2), 6.0);
        assert_eq!(tri.at(4, 2), 24.0);
        assert_eq!(tri.at(5, 2), 80.0);
        assert_eq!(tri.at(6, 3), 540.0);
        assert_eq!(tri.at(6, 6), 1.0);
        assert!(tri.at(1, 2).is_nan());
        assert!(tri.at(0, 6).is_nan());
    }

    #[test]
    fn binomial_values() {
        assert_eq!(binomial(10, 3), 120);
        assert_eq!(binomial(52, 5), 2_598_960);
        assert_eq!(binomial(3, 9), 0);
        assert_eq!(factorial(5.0), 120.0);
    }
}
