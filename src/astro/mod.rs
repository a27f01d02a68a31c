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

/// Keplerian orbital elements, state vectors, their conversions, and the
/// orbit tracker.
pub mod orbit;

/// Kepler's equation: forward evaluation and inverse solvers for the
/// elliptic, parabolic and hyperbolic regimes.
pub mod kepler;

/// Izzo's multi-revolution Lambert solver.
pub mod lambert;

/// Two-line element set parsing.
pub mod tle;
