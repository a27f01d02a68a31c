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

mod rk;
mod tableaux;

pub use rk::RungeKutta;
pub use tableaux::{ButcherTableau, RK23, RK45};

/// Solver status of an ODE engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OdeState {
    /// Stepping is still possible.
    Processing,
    /// The endpoint has been reached.
    Succeeded,
    /// The step size underflowed before reaching the endpoint.
    Failed,
}

/// The right-hand side of a first-order system: `(t, y) -> y'`, with the
/// output length matching the input length.
pub type OdeRhs = Box<dyn Fn(f64, &[f64]) -> Vec<f64>>;
