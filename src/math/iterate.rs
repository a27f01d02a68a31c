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

use crate::math::matrix::DenseMatrix;

/// Where an elementwise refinement currently stands.
///
/// `ErrorIncrease` is the auxiliary code used by the adaptive derivative
/// engines: the truncation/roundoff trade-off has tipped and further step
/// refinement makes the estimate worse.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IterationState {
    InProgress,
    Finished,
    ErrorIncrease,
    ValueError,
}

/// Iteration and function-evaluation counters shared by every refinement.
#[derive(Copy, Clone, Debug, Default)]
pub struct IterationCounters {
    pub iterations: u64,
    pub evaluations: u64,
}

/// One scalar refinement problem driven by [`drive`].
///
/// The four hooks replace the virtual-dispatch iterator of classic designs:
/// `pre_evaluate` emits the matrix of abscissae the user function must be
/// sampled at, `post_evaluate` consumes the samples and updates the
/// internal state, `check_terminate` reports convergence or divergence, and
/// `finalize` (optional) cleans up once the loop exits.
pub trait RefinementStep {
    /// The points at which the user function must be evaluated next.
    fn pre_evaluate(&mut self) -> DenseMatrix;

    /// Consumes `(x, f(x))` and updates the refinement state.
    fn post_evaluate(&mut self, x: &DenseMatrix, fx: &DenseMatrix);

    /// Returns true when the iteration must stop (converged or diverged).
    fn check_terminate(&mut self) -> bool;

    fn finalize(&mut self) {}

    fn state(&self) -> IterationState;
}

/// Runs `problem` against `f` for at most `10^max_iter_log` iterations.
///
/// Each loop samples `f` at all points requested by `pre_evaluate`, hands
/// the samples to `post_evaluate`, bumps the counters and tests
/// `check_terminate`. The final state is left on the problem itself.
pub fn drive<P, F>(problem: &mut P, f: F, max_iter_log: f64) -> IterationCounters
where
    P: RefinementStep + ?Sized,
    F: Fn(f64) -> f64,
{
    let mut counters = IterationCounters::default();
    let max_iterations = 10_f64.powf(max_iter_log).floor().max(1.0) as u64;

    while counters.iterations < max_iterations {
        let x = problem.pre_evaluate();
        let fx = x.map(&f);
        problem.post_evaluate(&x, &fx);
        counters.iterations += 1;
        counters.evaluations += x.len() as u64;
        if problem.check_terminate() {
            break;
        }
    }

    problem.finalize();
    counters
}
