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

use std::f64::consts::PI;
use std::fmt;
use std::ops;

/// Degrees per turn.
pub const DEG_PER_TURN: f64 = 360.0;
/// Gradians per turn.
pub const GON_PER_TURN: f64 = 400.0;

/// An angle endowed with a unit of measure.
///
/// The library convention is degrees-first: every API that takes or returns a
/// bare `f64` angle means degrees. `Angle` carries the value in degrees
/// internally, and the four constructors/accessors convert by exact rational
/// factors (radians via the `PI` constant).
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Angle {
    deg: f64,
}

impl Angle {
    /// An angle of zero in any unit.
    pub const ZERO: Angle = Angle { deg: 0.0 };

    pub fn from_degrees(deg: f64) -> Self {
        Self { deg }
    }

    pub fn from_radians(rad: f64) -> Self {
        Self {
            deg: rad * DEG_PER_TURN / (2.0 * PI),
        }
    }

    /// One turn is a full revolution.
    pub fn from_turns(turns: f64) -> Self {
        Self {
            deg: turns * DEG_PER_TURN,
        }
    }

    /// Gradians: 400 per turn.
    pub fn from_gradians(gon: f64) -> Self {
        Self {
            deg: gon * DEG_PER_TURN / GON_PER_TURN,
        }
    }

    pub fn to_degrees(self) -> f64 {
        self.deg
    }

    pub fn to_radians(self) -> f64 {
        self.deg * (2.0 * PI) / DEG_PER_TURN
    }

    pub fn to_turns(self) -> f64 {
        self.deg / DEG_PER_TURN
    }

    pub fn to_gradians(self) -> f64 {
        self.deg * GON_PER_TURN / DEG_PER_TURN
    }

    pub fn sin(self) -> f64 {
        self.to_radians().sin()
    }

    pub fn cos(self) -> f64 {
        self.to_radians().cos()
    }

    pub fn tan(self) -> f64 {
        self.to_radians().tan()
    }

    pub fn abs(self) -> Self {
        Self {
            deg: self.deg.abs(),
        }
    }

    pub fn is_nan(self) -> bool {
        self.deg.is_nan()
    }

    /// Returns this angle bounded between 0 and 360 degrees.
    pub fn between_0_360(self) -> Self {
        let mut bounded = self.deg % 360.0;
        if bounded < 0.0 {
            bounded += 360.0;
        }
        Self { deg: bounded }
    }

    /// Returns this angle bounded between -180 and +180 degrees.
    pub fn between_pm_180(self) -> Self {
        let bounded = self.between_0_360().deg;
        Self {
            deg: if bounded > 180.0 {
                bounded - 360.0
            } else {
                bounded
            },
        }
    }
}

impl ops::Add for Angle {
    type Output = Angle;
    fn add(self, rhs: Angle) -> Angle {
        Angle {
            deg: self.deg + rhs.deg,
        }
    }
}

impl ops::Sub for Angle {
    type Output = Angle;
    fn sub(self, rhs: Angle) -> Angle {
        Angle {
            deg: self.deg - rhs.deg,
        }
    }
}

impl ops::Neg for Angle {
    type Output = Angle;
    fn neg(self) -> Angle {
        Angle { deg: -self.deg }
    }
}

impl ops::Mul<f64> for Angle {
    type Output = Angle;
    fn mul(self, rhs: f64) -> Angle {
        Angle {
            deg: self.deg * rhs,
        }
    }
}

impl ops::Mul<Angle> for f64 {
    type Output = Angle;
    fn mul(self, rhs: Angle) -> Angle {
        Angle {
            deg: self * rhs.deg,
        }
    }
}

impl ops::Div<f64> for Angle {
    type Output = Angle;
    fn div(self, rhs: f64) -> Angle {
        Angle {
            deg: self.deg / rhs,
        }
    }
}

impl ops::AddAssign for Angle {
    fn add_assign(&mut self, rhs: Angle) {
        self.deg += rhs.deg;
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} deg", self.deg)
    }
}

#[test]
fn angle_unit_round_trips() {
    let a = Angle::from_degrees(90.0);
    assert!((a.to_radians() - PI / 2.0).abs() < 1e-15);
    assert!((a.to_turns() - 0.25).abs() < 1e-15);
    assert!((a.to_gradians() - 100.0).abs() < 1e-15);
    assert_eq!(Angle::from_turns(1.5).to_degrees(), 540.0);
    assert_eq!(Angle::from_gradians(200.0).to_degrees(), 180.0);
}

#[test]
fn angle_bounding() {
    assert_eq!(Angle::from_degrees(540.0).between_0_360().to_degrees(), 180.0);
    assert_eq!(Angle::from_degrees(-90.0).between_0_360().to_degrees(), 270.0);
    assert_eq!(
        Angle::from_degrees(270.0).between_pm_180().to_degrees(),
        -90.0
    );
}
