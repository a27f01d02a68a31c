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

use crate::angle::Angle;
use crate::astro::orbit::KeplerianOrbitElems;
use crate::errors::AstroError;
use crate::time::{Epoch, Unit};
use std::f64::consts::PI;
use std::fmt;

/// Standard gravitational parameter of the Earth, m^3/s^2 (EGM2008).
pub const EARTH_GRAV_PARAM: f64 = 3.986_004_418e14;

/// Length of the two data lines.
pub const DATA_LENGTH: usize = 69;
/// Length of the title line (NORAD SATCAT convention).
pub const TITLE_LENGTH: usize = 24;

/// Security classification marker of a TLE record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    Unclassified,
    Classified,
    Secret,
}

/// A two-line element set: a satellite name plus two fixed-width 69-column
/// data lines, parsed field-wise on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct Tle {
    title: String,
    line1: String,
    line2: String,
}

fn field(line: &str, start: usize, end: usize) -> &str {
    line[start..end].trim()
}

fn parse_f64(line: &str, start: usize, end: usize, what: &str) -> Result<f64, AstroError> {
    let raw = field(line, start, end);
    raw.parse::<f64>().map_err(|_| AstroError::TleFormat {
        what: format!("{} field {:?} is not a number", what, raw),
    })
}

fn parse_u32(line: &str, start: usize, end: usize, what: &str) -> Result<u32, AstroError> {
    let raw = field(line, start, end);
    raw.parse::<u32>().map_err(|_| AstroError::TleFormat {
        what: format!("{} field {:?} is not an integer", what, raw),
    })
}

/// Parses the `+XXXXX-E` implied-decimal exponent notation used by the
/// drag and second-derivative fields: `-11606-4` means `-0.11606e-4`.
fn parse_implied_exponent(raw: &str) -> Result<f64, AstroError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    let (mantissa_sign, rest) = match raw.as_bytes()[0] {
        b'-' => (-1.0, &raw[1..]),
        b'+' => (1.0, &raw[1..]),
        _ => (1.0, raw),
    };
    let split = rest
        .rfind(|c| c == '-' || c == '+')
        .ok_or_else(|| AstroError::TleFormat {
            what: format!("missing exponent in field {:?}", raw),
        })?;
    let mantissa: f64 = rest[..split]
        .trim()
        .parse()
        .map_err(|_| AstroError::TleFormat {
            what: format!("bad mantissa in field {:?}", raw),
        })?;
    let exponent: i32 = rest[split..].parse().map_err(|_| AstroError::TleFormat {
        what: format!("bad exponent in field {:?}", raw),
    })?;
    let digits = rest[..split].trim().len() as i32;
    Ok(mantissa_sign * mantissa * 10_f64.powi(exponent - digits))
}

impl Tle {
    /// Builds a record from its three lines, validating lengths, line
    /// numbers, catalog consistency and both checksums.
    pub fn from_lines(title: &str, line1: &str, line2: &str) -> Result<Self, AstroError> {
        if line1.len() != DATA_LENGTH || line2.len() != DATA_LENGTH {
            return Err(AstroError::TleFormat {
                what: format!(
                    "data lines must be {} columns (got {} and {})",
                    DATA_LENGTH,
                    line1.len(),
                    line2.len()
                ),
            });
        }
        if !line1.starts_with("1 ") || !line2.starts_with("2 ") {
            return Err(AstroError::TleFormat {
                what: "line numbers must be 1 and 2".to_string(),
            });
        }
        Self::verify_line(line1)?;
        Self::verify_line(line2)?;
        if field(line1, 2, 7) != field(line2, 2, 7) {
            return Err(AstroError::TleFormat {
                what: "catalog numbers of the two lines disagree".to_string(),
            });
        }
        Ok(Self {
            title: title.trim_end().chars().take(TITLE_LENGTH).collect(),
            line1: line1.to_string(),
            line2: line2.to_string(),
        })
    }

    /// Parses a delimited three-line block.
    pub fn from_string(data: &str) -> Result<Self, AstroError> {
        let mut lines = data.lines().map(str::trim_end);
        let title = lines.next().unwrap_or("");
        let l1 = lines.next().ok_or_else(|| AstroError::TleFormat {
            what: "missing line 1".to_string(),
        })?;
        let l2 = lines.next().ok_or_else(|| AstroError::TleFormat {
            what: "missing line 2".to_string(),
        })?;
        Self::from_lines(title, l1, l2)
    }

    /// Modulo-10 checksum over a data line: digits count as themselves,
    /// minus signs as one, everything else as zero.
    pub fn verify_line(line: &str) -> Result<(), AstroError> {
        let expected = line.as_bytes()[DATA_LENGTH - 1]
            .checked_sub(b'0')
            .filter(|d| *d <= 9)
            .ok_or_else(|| AstroError::TleFormat {
                what: "checksum column is not a digit".to_string(),
            })?;
        let sum: u32 = line.bytes().take(DATA_LENGTH - 1).fold(0, |acc, b| {
            acc + match b {
                b'0'..=b'9' => (b - b'0') as u32,
                b'-' => 1,
                _ => 0,
            }
        });
        if sum % 10 != expected as u32 {
            return Err(AstroError::TleFormat {
                what: format!("checksum mismatch: computed {}, stored {}", sum % 10, expected),
            });
        }
        Ok(())
    }

    pub fn satellite_name(&self) -> &str {
        &self.title
    }

    pub fn catalog_number(&self) -> Result<u32, AstroError> {
        parse_u32(&self.line1, 2, 7, "catalog number")
    }

    pub fn classification(&self) -> Result<Classification, AstroError> {
        match self.line1.as_bytes()[7] {
            b'U' => Ok(Classification::Unclassified),
            b'C' => Ok(Classification::Classified),
            b'S' => Ok(Classification::Secret),
            other => Err(AstroError::TleFormat {
                what: format!("unknown classification {:?}", other as char),
            }),
        }
    }

    /// International designator: (launch year, launch number, piece).
    pub fn international_designator(&self) -> Result<(i32, u32, String), AstroError> {
        let year_2d = parse_u32(&self.line1, 9, 11, "launch year")? as i32;
        let year = if year_2d < 57 { 2000 + year_2d } else { 1900 + year_2d };
        let number = parse_u32(&self.line1, 11, 14, "launch number")?;
        let piece = field(&self.line1, 14, 17).to_string();
        Ok((year, number, piece))
    }

    /// The epoch: a two-digit year (1957-2056 window) plus a fractional
    /// day of year.
    pub fn epoch(&self) -> Result<Epoch, AstroError> {
        let year_2d = parse_u32(&self.line1, 18, 20, "epoch year")? as i32;
        let year = if year_2d < 57 { 2000 + year_2d } else { 1900 + year_2d };
        let day_of_year = parse_f64(&self.line1, 20, 32, "epoch day")?;
        if !(1.0..367.0).contains(&day_of_year) {
            return Err(AstroError::TleFormat {
                what: format!("epoch day {} out of range", day_of_year),
            });
        }
        Ok(Epoch::from_gregorian_utc_at_midnight(year, 1, 1) + (day_of_year - 1.0) * Unit::Day)
    }

    /// First derivative of the mean motion, rev/day^2 (ballistic term,
    /// stored halved in the record).
    pub fn d1_mean_motion(&self) -> Result<f64, AstroError> {
        Ok(2.0 * parse_f64(&self.line1, 33, 43, "mean motion derivative")?)
    }

    /// Second derivative of the mean motion, rev/day^3.
    pub fn d2_mean_motion(&self) -> Result<f64, AstroError> {
        Ok(6.0 * parse_implied_exponent(field(&self.line1, 44, 52))?)
    }

    /// B* drag term, 1/Earth radii.
    pub fn bstar(&self) -> Result<f64, AstroError> {
        parse_implied_exponent(field(&self.line1, 53, 61))
    }

    pub fn ephemeris_type(&self) -> Result<u32, AstroError> {
        let raw = field(&self.line1, 62, 63);
        if raw.is_empty() {
            return Ok(0);
        }
        raw.parse().map_err(|_| AstroError::TleFormat {
            what: format!("ephemeris type {:?}", raw),
        })
    }

    pub fn element_set_number(&self) -> Result<u32, AstroError> {
        parse_u32(&self.line1, 64, 68, "element set number")
    }

    pub fn inclination(&self) -> Result<Angle, AstroError> {
        Ok(Angle::from_degrees(parse_f64(
            &self.line2,
            8,
            16,
            "inclination",
        )?))
    }

    pub fn ascending_node(&self) -> Result<Angle, AstroError> {
        Ok(Angle::from_degrees(parse_f64(
            &self.line2,
            17,
            25,
            "ascending node",
        )?))
    }

    /// Eccentricity with its implied leading decimal point.
    pub fn eccentricity(&self) -> Result<f64, AstroError> {
        let raw = field(&self.line2, 26, 33);
        format!("0.{}", raw).parse().map_err(|_| AstroError::TleFormat {
            what: format!("eccentricity field {:?}", raw),
        })
    }

    pub fn arg_of_pericenter(&self) -> Result<Angle, AstroError> {
        Ok(Angle::from_degrees(parse_f64(
            &self.line2,
            34,
            42,
            "argument of perigee",
        )?))
    }

    pub fn mean_anomaly(&self) -> Result<Angle, AstroError> {
        Ok(Angle::from_degrees(parse_f64(
            &self.line2,
            43,
            51,
            "mean anomaly",
        )?))
    }

    /// Mean motion in revolutions per day.
    pub fn mean_motion(&self) -> Result<f64, AstroError> {
        parse_f64(&self.line2, 52, 63, "mean motion")
    }

    pub fn revolution_number(&self) -> Result<u32, AstroError> {
        parse_u32(&self.line2, 63, 68, "revolution number")
    }

    /// Converts the record to a Keplerian element set about the Earth:
    /// mean motion to period to semi-major axis, pericenter from the
    /// eccentricity.
    pub fn orbit_elems(&self) -> Result<KeplerianOrbitElems, AstroError> {
        let revs_per_day = self.mean_motion()?;
        if revs_per_day <= 0.0 {
            return Err(AstroError::TleFormat {
                what: format!("mean motion {} is not positive", revs_per_day),
            });
        }
        let e = self.eccentricity()?;
        let period = 86_400.0 / revs_per_day;
        let a = (EARTH_GRAV_PARAM * (period / (2.0 * PI)).powi(2)).cbrt();
        Ok(KeplerianOrbitElems {
            ref_plane: Some("Equator".to_string()),
            epoch: Some(self.epoch()?),
            grav_param: Some(EARTH_GRAV_PARAM),
            pericenter_dist: Some(a * (1.0 - e)),
            period: Some(period),
            eccentricity: Some(e),
            inclination: Some(self.inclination()?),
            ascending_node: Some(self.ascending_node()?),
            arg_of_pericenter: Some(self.arg_of_pericenter()?),
            mean_anomaly: Some(self.mean_anomaly()?),
        })
    }
}

impl fmt::Display for Tle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", self.line1)?;
        write!(f, "{}", self.line2)
    }
}
