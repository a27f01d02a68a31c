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

/*! # asteria

Asteria is an astronomy-oriented scientific computing library. Its heart is a
numerical mathematics core — adaptive quadrature, embedded Runge-Kutta
integration with dense output, polynomial root finding, numerical
differentiation (integer and fractional order), scalar minimization and root
finding — together with the astrodynamics solvers built on top of it:
Kepler's equation for all three conic regimes, Izzo's multi-revolution
Lambert solver, and Keplerian orbit state propagation.

All scalars are IEEE 754 doubles. Angles are measured in degrees at the API
boundary unless a function name says otherwise; see [`angle::Angle`].
*/

/// Provides the numerical mathematics core: matrices, special functions,
/// polynomial roots, derivatives, quadrature, ODEs, minimization and root
/// finding.
pub mod math;

/// Provides the astrodynamics layer: Keplerian elements and state vectors,
/// Kepler-equation solvers, the Lambert solver, and TLE parsing.
pub mod astro;

/// Angle values tagged with their unit of measure.
pub mod angle;

mod errors;
/// Asteria will (almost) never panic and functions which may fail will return an error.
pub use self::errors::{AstroError, MathError};

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
    pub use na::Complex;
}

/// Re-export some useful things
pub use self::angle::Angle;
pub use self::astro::orbit::{KeplerianOrbitElems, OrbitStateVectors};
pub use self::math::matrix::DenseMatrix;
