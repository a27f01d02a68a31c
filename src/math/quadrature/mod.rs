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

mod fractional;
mod gauss_kronrod;
mod newton_cotes;
pub mod tables;

pub use fractional::RiemannLiouvilleIntegral;
pub use gauss_kronrod::GaussKronrod;
pub use newton_cotes::{Block, NewtonCotes};

/// A definite-integration engine: `(f, a, b) -> integral`.
///
/// Object safe so compound engines (fractional calculus) can share one
/// configured integrator by handle.
pub trait DefiniteIntegrator {
    fn integrate(&self, f: &dyn Fn(f64) -> f64, a: f64, b: f64) -> Result<f64, MathError>;
}

/// A definite integrator that works from `(x, f(x))` samples.
pub trait SampleBasedIntegrator: DefiniteIntegrator {
    /// Integrates the sampled curve.
    fn run_sampled(&self, samples: &[(f64, f64)]) -> Result<f64, MathError>;

    /// How many evenly spaced samples the function-driven path takes.
    fn default_sample_count(&self) -> usize;
}

/// An indefinite integral (antiderivative): evaluated at the upper limit.
pub trait Antiderivative {
    fn eval(&self, x: f64) -> Result<f64, MathError>;
}

/// Evenly spaced samples of f over [a, b], endpoints included.
pub fn evenly_spaced_samples<F: Fn(f64) -> f64>(
    f: F,
    a: f64,
    b: f64,
    count: usize,
) -> Vec<(f64, f64)> {
    if count < 2 {
        return vec![(a, f(a))];
    }
    let h = (b - a) / (count - 1) as f64;
    (0..count)
        .map(|i| {
            let x = a + i as f64 * h;
            (x, f(x))
        })
        .collect()
}

/// Samples of the parametric curve `(x(t), y(t))` at evenly spaced t.
pub fn parametric_curve_samples<Fx, Fy>(x: Fx, y: Fy, a: f64, b: f64, count: usize) -> Vec<(f64, f64)>
where
    Fx: Fn(f64) -> f64,
    Fy: Fn(f64) -> f64,
{
    if count < 2 {
        return vec![(x(a), y(a))];
    }
    let h = (b - a) / (count - 1) as f64;
    (0..count)
        .map(|i| {
            let t = a + i as f64 * h;
            (x(t), y(t))
        })
        .collect()
}
