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

use snafu::prelude::*;

/// Errors raised by the numerical core.
///
/// Engines detect failure at the boundary of their iteration loop and report
/// it synchronously; no engine mutates caller state on failure.
#[derive(Clone, Debug, Snafu, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum MathError {
    /// A wrong-sized buffer, a zero leading coefficient, a negative
    /// tolerance, a mis-ordered bracket, or a similar caller mistake.
    #[snafu(display("invalid argument: {what}"))]
    InvalidArgument { what: String },

    /// The iteration cap was reached without meeting the tolerance. The
    /// residual is that of the last iterate.
    #[snafu(display(
        "failed to converge after {iterations} iterations (last residual {residual:.3e})"
    ))]
    ConvergenceFailed { iterations: u64, residual: f64 },

    /// A function was evaluated outside its stated domain, or a bracketing
    /// method was handed an unsigned bracket.
    #[snafu(display("math domain error: {what}"))]
    DomainError { what: String },

    /// Matrix arithmetic against mismatched dimensions.
    #[snafu(display(
        "incompatible shape: got {cols}x{rows} (cols x rows), expected {expected_cols}x{expected_rows}"
    ))]
    IncompatibleShape {
        cols: usize,
        rows: usize,
        expected_cols: usize,
        expected_rows: usize,
    },

    /// The Householder family needs the original function plus at least
    /// `order` derivatives.
    #[snafu(display("{supplied} callables supplied but {required} required"))]
    InsufficientDerivatives { supplied: usize, required: usize },

    /// A singular matrix was passed to inversion, or a solve produced a
    /// contradiction (e.g. coincident interpolation nodes).
    #[snafu(display("singular solve: {what}"))]
    SingularSolve { what: String },
}

/// Errors raised by the astrodynamics layer.
#[derive(Clone, Debug, Snafu, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum AstroError {
    /// A numerical-core error surfaced through an astrodynamics engine.
    #[snafu(display("math error {source} when {action}"))]
    AstroMath {
        action: &'static str,
        source: MathError,
    },

    /// The requested revolution count exceeds what the time of flight allows.
    #[snafu(display("{m} revolutions requested but at most {m_max} are feasible"))]
    MultiRevNotFeasible { m: u32, m_max: u32 },

    /// The transfer angle is so small that the transfer plane is undefined.
    #[snafu(display("Lambert targets too close: the transfer plane is undefined"))]
    TargetsTooClose,

    /// The Lambert iteration exceeded its cap.
    #[snafu(display("Lambert solver exceeded {maxiter} iterations"))]
    SolverMaxIter { maxiter: usize },

    /// An orbital element set misses fields that cannot be derived from the
    /// ones present.
    #[snafu(display("element set incomplete: {what}"))]
    ElementSetIncomplete { what: String },

    /// Physically inconsistent orbital elements (negative eccentricity,
    /// non-positive gravitational parameter, ...).
    #[snafu(display("invalid orbital elements: {what}"))]
    InvalidElements { what: String },

    /// A two-line element record that does not parse.
    #[snafu(display("malformed TLE: {what}"))]
    TleFormat { what: String },
}

impl From<MathError> for AstroError {
    fn from(source: MathError) -> Self {
        AstroError::AstroMath {
            action: "solving",
            source,
        }
    }
}
