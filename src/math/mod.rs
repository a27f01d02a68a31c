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

/// Column-major dynamic matrix facility.
pub mod matrix;

/// Generic driver for elementwise adaptive-refinement iterations.
pub mod iterate;

/// Special functions: elementary symmetric polynomials, Vandermonde
/// inversion, Legendre and Stieltjes coefficients, Bell polynomials.
pub mod specfun;

/// Polynomials and the unified degree-1..N root solver.
pub mod polynomial;

/// First-order adaptive finite differences and fractional-order derivatives.
pub mod derivative;

/// Definite and indefinite integration engines.
pub mod quadrature;

/// Embedded Runge-Kutta ordinary differential equation engines.
pub mod ode;

/// Inverse functions: bisection, the Householder family, Brent inversion.
pub mod root_finding;

/// Scalar minimization.
pub mod minimize;

pub use self::matrix::DenseMatrix;
pub use self::polynomial::Polynomial;
pub use self::quadrature::DefiniteIntegrator;
