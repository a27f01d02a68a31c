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

use super::{evenly_spaced_samples, DefiniteIntegrator, SampleBasedIntegrator};
use crate::errors::MathError;
use crate::math::matrix::DenseMatrix;
use crate::math::specfun::inverse_vandermonde;

/// Closed Newton-Cotes weight numerators for the classical degrees. The
/// common scale is recovered from the constant moment (the weights of the
/// degree-n rule on nodes 0..n sum to n).
const CLOSED_RULES: [&[i64]; 10] = [
    &[1, 1],
    &[1, 4, 1],
    &[1, 3, 3, 1],
    &[7, 32, 12, 32, 7],
    &[19, 75, 50, 50, 75, 19],
    &[41, 216, 27, 272, 27, 216, 41],
    &[751, 3577, 1323, 2989, 2989, 1323, 3577, 751],
    &[989, 5888, -928, 10496, -4540, 10496, -928, 5888, 989],
    &[2857, 15741, 1080, 19344, 5778, 5778, 19344, 1080, 15741, 2857],
    &[16067, 106300, -48525, 272400, -260550, 427368, -260550, 272400, -48525, 106300, 16067],
];

/// One integration block: sampled ordinates, the (even) step, the weight
/// vector and the leading error coefficient.
#[derive(Clone, Debug)]
pub struct Block {
    pub samples: Vec<f64>,
    pub step: f64,
    pub weights: Vec<f64>,
    pub error_coeff: f64,
}

impl Block {
    /// `step * sum(w_i * y_i)`.
    pub fn integrate(&self) -> f64 {
        self.step
            * self
                .weights
                .iter()
                .zip(self.samples.iter())
                .map(|(w, y)| w * y)
                .sum::<f64>()
    }
}

/// The Newton-Cotes quadrature family over sampled data.
///
/// The level selects the method: 0 is Romberg, 1 the trapezoid rule, 2
/// Simpson's rule, and level >= 3 the composite closed rule of that degree.
/// Evenly spaced samples slice into stride-`level` blocks; uneven samples
/// go through the per-block Vandermonde weight solve.
pub struct NewtonCotes {
    level: usize,
    /// Sample count for the function-driven path (level-dependent default).
    pub sample_count: Option<usize>,
}

impl Default for NewtonCotes {
    /// The trapezoid rule.
    fn default() -> Self {
        Self::new(1)
    }
}

impl DefiniteIntegrator for NewtonCotes {
    fn integrate(&self, f: &dyn Fn(f64) -> f64, a: f64, b: f64) -> Result<f64, MathError> {
        let samples = evenly_spaced_samples(f, a, b, self.default_sample_count());
        self.run_sampled(&samples)
    }
}

impl SampleBasedIntegrator for NewtonCotes {
    /// Dispatches on the level: 0 Romberg, 1 trapezoid, 2 Simpson, >= 3
    /// composite (or discrete when the abscissae are uneven).
    fn run_sampled(&self, samples: &[(f64, f64)]) -> Result<f64, MathError> {
        match self.level {
            0 => Self::romberg(samples, None),
            1 => Self::trapezoidal(samples),
            2 => Self::simpson(samples),
            _ => {
                if Self::is_evenly_sized(samples) {
                    self.composite_integrate(samples)
                } else {
                    self.discrete_integrate(samples)
                }
            }
        }
    }

    fn default_sample_count(&self) -> usize {
        if let Some(count) = self.sample_count {
            return count;
        }
        match self.level {
            0 => 1025, // 2^10 + 1 for the Richardson table
            1 | 2 => 1001,
            n => (1000 / n) * n + 1,
        }
    }
}

impl NewtonCotes {
    pub fn new(level: usize) -> Self {
        Self {
            level,
            sample_count: None,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Weights and error coefficient of the degree-n closed rule on the
    /// unit-step nodes 0..n: table lookup for the classical degrees,
    /// Vandermonde moment solve (`b_k = n^(k+1)/(k+1)`) beyond.
    pub fn evenly_sized_parameters(n: usize) -> Result<(Vec<f64>, f64), MathError> {
        if n == 0 {
            return Err(MathError::InvalidArgument {
                what: "Newton-Cotes degree 0 has no closed rule".to_string(),
            });
        }
        let nodes: Vec<f64> = (0..=n).map(|i| i as f64).collect();
        let weights = if n <= CLOSED_RULES.len() {
            let numerators = CLOSED_RULES[n - 1];
            let total: i64 = numerators.iter().sum();
            numerators
                .iter()
                .map(|w| *w as f64 * n as f64 / total as f64)
                .collect()
        } else {
            let moments: Vec<f64> = (0..=n)
                .map(|k| (n as f64).powi(k as i32 + 1) / (k as f64 + 1.0))
                .collect();
            inverse_vandermonde(&nodes)?.try_mul_vec(&moments)?
        };
        let error = Self::moment_defect(&nodes, &weights, 0.0, n as f64);
        Ok((weights, error))
    }

    /// Weights and error coefficient from arbitrary abscissae: the
    /// Vandermonde system reproducing every monomial moment over the
    /// sampled span.
    pub fn parameters_from_samples(positions: &[f64]) -> Result<(Vec<f64>, f64), MathError> {
        if positions.len() < 2 {
            return Err(MathError::InvalidArgument {
                what: "at least two samples are required".to_string(),
            });
        }
        Self::parameters_over_span(positions, positions[0], positions[positions.len() - 1])
    }

    /// Weights reproducing every monomial moment over an explicit span,
    /// which may cover only part of the node range (used for tail blocks).
    fn parameters_over_span(
        positions: &[f64],
        a: f64,
        b: f64,
    ) -> Result<(Vec<f64>, f64), MathError> {
        let n = positions.len() - 1;
        let moments: Vec<f64> = (0..=n)
            .map(|k| {
                let p = k as i32 + 1;
                (b.powi(p) - a.powi(p)) / p as f64
            })
            .collect();
        let weights = inverse_vandermonde(positions)?.try_mul_vec(&moments)?;
        let error = Self::moment_defect(positions, &weights, a, b);
        Ok((weights, error))
    }

    /// Leading error coefficient: the first monomial moment the rule fails
    /// to reproduce (even-degree rules gain one extra exact degree).
    fn moment_defect(positions: &[f64], weights: &[f64], a: f64, b: f64) -> f64 {
        let n = positions.len() - 1;
        for k in [n + 1, n + 2] {
            let p = k as i32 + 1;
            let exact = (b.powi(p) - a.powi(p)) / p as f64;
            let quadrature: f64 = positions
                .iter()
                .zip(weights.iter())
                .map(|(x, w)| w * x.powi(k as i32))
                .sum();
            let defect = exact - quadrature;
            if defect.abs() > 1e-9 * exact.abs().max(1.0) {
                return defect;
            }
        }
        0.0
    }

    /// True when the abscissae are evenly spaced (to a relative 1e-10).
    pub fn is_evenly_sized(samples: &[(f64, f64)]) -> bool {
        if samples.len() < 3 {
            return samples.len() == 2;
        }
        let h = samples[1].0 - samples[0].0;
        samples
            .windows(2)
            .all(|w| ((w[1].0 - w[0].0) - h).abs() <= 1e-10 * h.abs().max(1.0))
    }

    /// The trapezoid rule, valid for any spacing.
    pub fn trapezoidal(samples: &[(f64, f64)]) -> Result<f64, MathError> {
        if samples.len() < 2 {
            return Err(MathError::InvalidArgument {
                what: "trapezoid rule needs at least two samples".to_string(),
            });
        }
        Ok(samples
            .windows(2)
            .map(|w| 0.5 * (w[0].1 + w[1].1) * (w[1].0 - w[0].0))
            .sum())
    }

    /// Simpson's rule over any spacing, with the closed-form correction of
    /// the final segment when the sample count is even.
    pub fn simpson(samples: &[(f64, f64)]) -> Result<f64, MathError> {
        let n = samples.len();
        if n < 3 {
            return Err(MathError::InvalidArgument {
                what: "Simpson's rule needs at least three samples".to_string(),
            });
        }

        // Pairs of intervals handled by the generalized formula; an even
        // sample count leaves one trailing interval for the correction.
        let paired_end = if n % 2 == 1 { n - 1 } else { n - 2 };
        let mut acc = 0.0;
        let mut i = 0;
        while i < paired_end {
            let (x0, f0) = samples[i];
            let (x1, f1) = samples[i + 1];
            let (x2, f2) = samples[i + 2];
            let h0 = x1 - x0;
            let h1 = x2 - x1;
            acc += (h0 + h1) / 6.0
                * ((2.0 - h1 / h0) * f0 + (h0 + h1).powi(2) / (h0 * h1) * f1
                    + (2.0 - h0 / h1) * f2);
            i += 2;
        }

        if n % 2 == 0 {
            // alpha f_N + beta f_{N-1} - eta f_{N-2} over the last
            // interval, exact for parabolas through the last three points.
            let (x3, f3) = samples[n - 1];
            let (x2, f2) = samples[n - 2];
            let (x1, f1) = samples[n - 3];
            let h1 = x3 - x2;
            let h2 = x2 - x1;
            let alpha = (2.0 * h1 * h1 + 3.0 * h1 * h2) / (6.0 * (h2 + h1));
            let beta = (h1 * h1 + 3.0 * h1 * h2) / (6.0 * h2);
            let eta = h1.powi(3) / (6.0 * h2 * (h2 + h1));
            acc += alpha * f3 + beta * f2 - eta * f1;
        }
        Ok(acc)
    }

    /// Romberg integration over an even grid of 2^k + 1 samples. The
    /// Richardson extrapolation table is written to `table` when provided.
    pub fn romberg(
        samples: &[(f64, f64)],
        table: Option<&mut DenseMatrix>,
    ) -> Result<f64, MathError> {
        let n = samples.len();
        if n < 2 || !(n - 1).is_power_of_two() {
            return Err(MathError::InvalidArgument {
                what: format!("Romberg needs 2^k + 1 evenly spaced samples, got {}", n),
            });
        }
        if !Self::is_evenly_sized(samples) {
            return Err(MathError::InvalidArgument {
                what: "Romberg needs evenly spaced samples".to_string(),
            });
        }
        let k = (n - 1).trailing_zeros() as usize;
        let mut t = DenseMatrix::zeros(k + 1, k + 1);

        for i in 0..=k {
            // Trapezoid over 2^i intervals: stride through the samples.
            let stride = (n - 1) >> i;
            let sub: Vec<(f64, f64)> = samples.iter().step_by(stride).copied().collect();
            *t.at_mut(0, i) = Self::trapezoidal(&sub)?;
        }
        for j in 1..=k {
            let factor = 4_f64.powi(j as i32);
            for i in j..=k {
                let refined = (factor * t.at(j - 1, i) - t.at(j - 1, i - 1)) / (factor - 1.0);
                *t.at_mut(j, i) = refined;
            }
        }
        let result = t.at(k, k);
        if let Some(out) = table {
            *out = t;
        }
        Ok(result)
    }

    /// Builds the evenly spaced block of the configured degree.
    fn create_block(&self, samples: &[(f64, f64)]) -> Result<Block, MathError> {
        let (weights, error_coeff) = Self::evenly_sized_parameters(self.level)?;
        Ok(Block {
            samples: samples.iter().map(|s| s.1).collect(),
            step: samples[1].0 - samples[0].0,
            weights,
            error_coeff,
        })
    }

    /// Builds a block over arbitrary abscissae; the weights absorb the
    /// spacing, so the block step is one.
    fn create_block_uneven(&self, samples: &[(f64, f64)]) -> Result<Block, MathError> {
        let positions: Vec<f64> = samples.iter().map(|s| s.0).collect();
        let (weights, error_coeff) = Self::parameters_from_samples(&positions)?;
        Ok(Block {
            samples: samples.iter().map(|s| s.1).collect(),
            step: 1.0,
            weights,
            error_coeff,
        })
    }

    /// One application of the degree-`level` rule; the sample count must
    /// be exactly level + 1.
    pub fn single_integrate(&self, samples: &[(f64, f64)]) -> Result<f64, MathError> {
        if samples.len() != self.level + 1 {
            return Err(MathError::InvalidArgument {
                what: format!(
                    "{} samples for a degree {} rule (need {})",
                    samples.len(),
                    self.level,
                    self.level + 1
                ),
            });
        }
        let block = if Self::is_evenly_sized(samples) {
            self.create_block(samples)?
        } else {
            self.create_block_uneven(samples)?
        };
        Ok(block.integrate())
    }

    /// Composite rule over an even grid: stride-`level` blocks sharing
    /// endpoints, with a lower-degree uneven tail when the sample count
    /// does not divide.
    pub fn composite_integrate(&self, samples: &[(f64, f64)]) -> Result<f64, MathError> {
        if !Self::is_evenly_sized(samples) {
            return Err(MathError::InvalidArgument {
                what: "composite integration needs evenly spaced samples".to_string(),
            });
        }
        if samples.len() < self.level + 1 {
            return self.discrete_integrate(samples);
        }
        let (weights, error_coeff) = Self::evenly_sized_parameters(self.level)?;
        let step = samples[1].0 - samples[0].0;
        let mut acc = 0.0;
        let mut start = 0;
        while start + self.level < samples.len() {
            let block = Block {
                samples: samples[start..=start + self.level]
                    .iter()
                    .map(|s| s.1)
                    .collect(),
                step,
                weights: weights.clone(),
                error_coeff,
            };
            acc += block.integrate();
            start += self.level;
        }
        if start < samples.len() - 1 {
            // Tail shorter than a full block: reuse the last level + 1
            // nodes with weights solved over the remaining span only, so
            // the degree of exactness is preserved.
            let tail_nodes = &samples[samples.len() - 1 - self.level..];
            let positions: Vec<f64> = tail_nodes.iter().map(|s| s.0).collect();
            let (weights, error_coeff) = Self::parameters_over_span(
                &positions,
                samples[start].0,
                samples[samples.len() - 1].0,
            )?;
            let block = Block {
                samples: tail_nodes.iter().map(|s| s.1).collect(),
                step: 1.0,
                weights,
                error_coeff,
            };
            acc += block.integrate();
        }
        Ok(acc)
    }

    /// Degree-`level` blocks of consecutive samples for uneven grids.
    pub fn discrete_integrate(&self, samples: &[(f64, f64)]) -> Result<f64, MathError> {
        if samples.len() < 2 {
            return Err(MathError::InvalidArgument {
                what: "at least two samples are required".to_string(),
            });
        }
        let mut acc = 0.0;
        let mut start = 0;
        while start < samples.len() - 1 {
            let end = (start + self.level.max(1)).min(samples.len() - 1);
            acc += self.create_block_uneven(&samples[start..=end])?.integrate();
            start = end;
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod ut_newton_cotes {
    use super::*;
    use crate::math::quadrature::parametric_curve_samples;

    fn sample_fn<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, count: usize) -> Vec<(f64, f64)> {
        evenly_spaced_samples(f, a, b, count)
    }

    #[test]
    fn closed_rule_weights_sum_to_degree() {
        for n in 1..=14usize {
            let (weights, _) = NewtonCotes::evenly_sized_parameters(n).unwrap();
            let total: f64 = weights.iter().sum();
            assert!(
                (total - n as f64).abs() < 1e-9,
                "degree {}: weights sum to {}",
                n,
                total
            );
        }
    }

    #[test]
    fn classic_weight_values() {
        let (w, _) = NewtonCotes::evenly_sized_parameters(2).unwrap();
        assert!((w[0] - 1.0 / 3.0).abs() < 1e-14);
        assert!((w[1] - 4.0 / 3.0).abs() < 1e-14);
        let (w, _) = NewtonCotes::evenly_sized_parameters(4).unwrap();
        assert!((w[0] - 14.0 / 45.0).abs() < 1e-13);
        assert!((w[1] - 64.0 / 45.0).abs() < 1e-13);
        assert!((w[2] - 24.0 / 45.0).abs() < 1e-13);
    }

    #[test]
    fn trapezoid_linear_exact() {
        let samples = sample_fn(|x| 3.0 * x + 1.0, 0.0, 2.0, 11);
        let got = NewtonCotes::trapezoidal(&samples).unwrap();
        assert!((got - 8.0).abs() < 1e-13);
    }

    #[test]
    fn simpson_cubic_exact() {
        // Simpson is exact for cubics on an even grid.
        let samples = sample_fn(|x| x.powi(3) - 2.0 * x, 0.0, 2.0, 21);
        let got = NewtonCotes::simpson(&samples).unwrap();
        assert!((got - 0.0).abs() < 1e-12);
    }

    #[test]
    fn simpson_even_sample_count() {
        let samples = sample_fn(|x| x * x, 0.0, 1.0, 10);
        let got = NewtonCotes::simpson(&samples).unwrap();
        assert!((got - 1.0 / 3.0).abs() < 1e-12, "got {}", got);
    }

    #[test]
    fn simpson_uneven_grid() {
        // Quadratic integrand on a deliberately warped grid.
        let positions: Vec<f64> = (0..=10).map(|i| (i as f64 / 10.0).powi(2)).collect();
        let samples: Vec<(f64, f64)> = positions.iter().map(|x| (*x, x * x)).collect();
        let got = NewtonCotes::simpson(&samples).unwrap();
        assert!((got - 1.0 / 3.0).abs() < 1e-10, "got {}", got);
    }

    #[test]
    fn simpson_fourth_order_convergence() {
        // Halving the step must shrink the error by about 2^4.
        let f = |x: f64| (2.0 * x).sin().exp();
        let exact_err = |count: usize| {
            let fine = NewtonCotes::simpson(&sample_fn(f, 0.0, 1.0, 4097)).unwrap();
            let got = NewtonCotes::simpson(&sample_fn(f, 0.0, 1.0, count)).unwrap();
            (got - fine).abs()
        };
        let e1 = exact_err(33);
        let e2 = exact_err(65);
        let ratio = e1 / e2;
        assert!(
            ratio > 10.0 && ratio < 24.0,
            "convergence ratio {} outside O(h^4) band",
            ratio
        );
    }

    #[test]
    fn romberg_power_of_two_grid() {
        let samples = sample_fn(|x: f64| x.exp(), 0.0, 1.0, 65);
        let got = NewtonCotes::romberg(&samples, None).unwrap();
        assert!((got - (std::f64::consts::E - 1.0)).abs() < 1e-12);

        let bad = sample_fn(|x: f64| x.exp(), 0.0, 1.0, 60);
        assert!(NewtonCotes::romberg(&bad, None).is_err());
    }

    #[test]
    fn romberg_table_output() {
        let samples = sample_fn(|x: f64| x * x, 0.0, 1.0, 9);
        let mut table = DenseMatrix::new();
        let got = NewtonCotes::romberg(&samples, Some(&mut table)).unwrap();
        assert_eq!(table.size(), (4, 4));
        // The diagonal converges to the result.
        assert!((table.at(3, 3) - got).abs() < 1e-15);
        assert!((got - 1.0 / 3.0).abs() < 1e-13);
    }

    #[test]
    fn level_dispatch() {
        let samples = sample_fn(|x: f64| x.sin(), 0.0, 1.0, 1025);
        let romberg = NewtonCotes::new(0).run_sampled(&samples).unwrap();
        let trapezoid = NewtonCotes::new(1).run_sampled(&samples).unwrap();
        let simpson = NewtonCotes::new(2).run_sampled(&samples).unwrap();
        let degree6 = NewtonCotes::new(6)
            .run_sampled(&sample_fn(|x: f64| x.sin(), 0.0, 1.0, 1021))
            .unwrap();
        let exact = 1.0 - 1.0_f64.cos();
        assert!((romberg - exact).abs() < 1e-13);
        assert!((trapezoid - exact).abs() < 1e-6);
        assert!((simpson - exact).abs() < 1e-12);
        assert!((degree6 - exact).abs() < 1e-13, "degree6 {}", degree6);
    }

    #[test]
    fn composite_with_tail_block() {
        // 12 samples with a degree-5 rule: two full blocks and a tail.
        let samples = sample_fn(|x: f64| x.powi(3), 0.0, 1.0, 12);
        let got = NewtonCotes::new(5).composite_integrate(&samples).unwrap();
        assert!((got - 0.25).abs() < 1e-12, "got {}", got);
    }

    #[test]
    fn discrete_integrate_uneven() {
        let positions: Vec<f64> = (0..=30).map(|i| (i as f64 / 30.0).sqrt()).collect();
        let samples: Vec<(f64, f64)> = positions.iter().map(|x| (*x, x.powi(4))).collect();
        let got = NewtonCotes::new(3).discrete_integrate(&samples).unwrap();
        assert!((got - 0.2).abs() < 1e-6, "got {}", got);
    }

    #[test]
    fn parametric_curve_sampling() {
        // The curve (t, t^2) sampled parametrically integrates like x^2.
        let samples = parametric_curve_samples(|t| t, |t| t * t, 0.0, 1.0, 101);
        let got = NewtonCotes::default().run_sampled(&samples).unwrap();
        assert!((got - 1.0 / 3.0).abs() < 1e-4);
    }

    #[test]
    fn single_integrate_size_check() {
        let nc = NewtonCotes::new(4);
        let samples = sample_fn(|x: f64| x, 0.0, 1.0, 4);
        assert!(nc.single_integrate(&samples).is_err());
        let samples = sample_fn(|x: f64| x, 0.0, 1.0, 5);
        assert!((nc.single_integrate(&samples).unwrap() - 0.5).abs() < 1e-13);
    }
}
