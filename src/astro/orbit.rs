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
use crate::astro::kepler::{
    elliptic_kepler, hyperbolic_kepler, parabolic_kepler, HyperbolicSdg, InverseKeplerEquation,
    NewtonElliptic, ParabolicInverse,
};
use crate::errors::AstroError;
use crate::linalg::{Matrix3, Vector3};
use crate::time::{Duration, Epoch, Unit};
use approx::abs_diff_eq;
use std::f64::consts::PI;

/// Eccentricity half-width of the band treated as parabolic.
const PARABOLIC_BAND: f64 = 1e-10;
/// Below this the orbit counts as circular / equatorial for the angle
/// conventions.
const SINGULARITY_TOL: f64 = 1e-12;

/// A Keplerian orbital element set. SI units: meters, seconds, m^3/s^2;
/// angles are degree-tagged [`Angle`] values.
///
/// Unset fields are `None`; [`KeplerianOrbitElems::complete`] derives the
/// mutually-derivable subset (pericenter distance, period, gravitational
/// parameter) from the ones present. The pericenter distance is the stored
/// size parameter so parabolic orbits stay finite.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeplerianOrbitElems {
    pub ref_plane: Option<String>,
    pub epoch: Option<Epoch>,
    /// G * M of the central body, m^3/s^2.
    pub grav_param: Option<f64>,
    /// Pericenter distance, m.
    pub pericenter_dist: Option<f64>,
    /// Orbital period, s. Undefined for parabolic and hyperbolic orbits.
    pub period: Option<f64>,
    pub eccentricity: Option<f64>,
    pub inclination: Option<Angle>,
    pub ascending_node: Option<Angle>,
    pub arg_of_pericenter: Option<Angle>,
    pub mean_anomaly: Option<Angle>,
}

impl KeplerianOrbitElems {
    /// Semi-major axis `q / (1 - e)`; `None` for parabolic orbits (and
    /// negative for hyperbolic ones).
    pub fn semi_major_axis(&self) -> Option<f64> {
        let e = self.eccentricity?;
        let q = self.pericenter_dist?;
        if abs_diff_eq!(e, 1.0, epsilon = PARABOLIC_BAND) {
            None
        } else {
            Some(q / (1.0 - e))
        }
    }

    /// Semi-latus rectum: `a (1 - e^2)`, or `2q` at e = 1.
    pub fn semi_latus_rectum(&self) -> Option<f64> {
        let e = self.eccentricity?;
        let q = self.pericenter_dist?;
        Some(q * (1.0 + e))
    }

    /// Mean motion in radians per second.
    pub fn mean_motion(&self) -> Option<f64> {
        let e = self.eccentricity?;
        let mu = self.grav_param?;
        if abs_diff_eq!(e, 1.0, epsilon = PARABOLIC_BAND) {
            let p = self.semi_latus_rectum()?;
            Some((mu / p.powi(3)).sqrt())
        } else {
            let a = self.semi_major_axis()?;
            Some((mu / a.abs().powi(3)).sqrt())
        }
    }

    /// Fills the derivable members from the ones present and validates the
    /// physical constraints. Fields are only read after a presence check;
    /// already-set fields are never overwritten.
    pub fn complete(&mut self) -> Result<(), AstroError> {
        let e = self.eccentricity.ok_or_else(|| AstroError::ElementSetIncomplete {
            what: "eccentricity is required".to_string(),
        })?;
        if e < 0.0 {
            return Err(AstroError::InvalidElements {
                what: format!("eccentricity {} is negative", e),
            });
        }
        if let Some(mu) = self.grav_param {
            if mu <= 0.0 {
                return Err(AstroError::InvalidElements {
                    what: format!("gravitational parameter {} is not positive", mu),
                });
            }
        }
        if let Some(q) = self.pericenter_dist {
            if q < 0.0 {
                return Err(AstroError::InvalidElements {
                    what: format!("pericenter distance {} is negative", q),
                });
            }
        }

        let parabolic = abs_diff_eq!(e, 1.0, epsilon = PARABOLIC_BAND);
        if parabolic {
            // The period is undefined on a parabola.
            if self.period.is_some() {
                return Err(AstroError::InvalidElements {
                    what: "a parabolic orbit has no period".to_string(),
                });
            }
        } else {
            let two_pi = 2.0 * PI;
            match (self.pericenter_dist, self.grav_param, self.period) {
                (Some(q), Some(mu), None) => {
                    if e < 1.0 {
                        let a = q / (1.0 - e);
                        self.period = Some(two_pi * (a.powi(3) / mu).sqrt());
                    }
                }
                (Some(q), None, Some(t)) => {
                    if e < 1.0 {
                        let a = q / (1.0 - e);
                        self.grav_param = Some(a.powi(3) * (two_pi / t).powi(2));
                    }
                }
                (None, Some(mu), Some(t)) => {
                    if e < 1.0 {
                        let a = (mu * (t / two_pi).powi(2)).cbrt();
                        self.pericenter_dist = Some(a * (1.0 - e));
                    }
                }
                _ => {}
            }
        }

        if self.pericenter_dist.is_none() || self.grav_param.is_none() {
            return Err(AstroError::ElementSetIncomplete {
                what: "pericenter distance and gravitational parameter are underivable"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Cartesian orbit state: position and velocity about the central body.
/// SI units, epoch tagged.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitStateVectors {
    pub ref_plane: Option<String>,
    /// G * M of the central body, m^3/s^2.
    pub grav_param: f64,
    pub epoch: Epoch,
    /// Position, m.
    pub position: Vector3<f64>,
    /// Velocity, m/s.
    pub velocity: Vector3<f64>,
}

/// The true anomaly matching the solved eccentric anomaly, plus the radius.
fn anomaly_to_position(e: f64, q: f64, ecc_anomaly_rad: f64) -> (f64, f64) {
    if abs_diff_eq!(e, 1.0, epsilon = PARABOLIC_BAND) {
        // Barker variable D = tan(nu / 2).
        let d = ecc_anomaly_rad;
        let nu = 2.0 * d.atan();
        let r = q * (1.0 + d * d);
        (nu, r)
    } else if e < 1.0 {
        let big_e = ecc_anomaly_rad;
        let nu = ((1.0 - e * e).sqrt() * big_e.sin()).atan2(big_e.cos() - e);
        let a = q / (1.0 - e);
        (nu, a * (1.0 - e * big_e.cos()))
    } else {
        let h = ecc_anomaly_rad;
        let nu = 2.0 * (((e + 1.0) / (e - 1.0)).sqrt() * (h / 2.0).tanh()).atan();
        let a = q / (1.0 - e); // negative
        (nu, a * (1.0 - e * h.cosh()))
    }
}

/// Solves the appropriate Kepler equation branch for the element set.
fn solve_anomaly(e: f64, mean_anomaly: Angle) -> Result<f64, AstroError> {
    if abs_diff_eq!(e, 1.0, epsilon = PARABOLIC_BAND) {
        Ok(ParabolicInverse.eccentric_anomaly(mean_anomaly)?.to_radians())
    } else if e < 1.0 {
        Ok(NewtonElliptic::new(e)?
            .eccentric_anomaly(mean_anomaly)?
            .to_radians())
    } else {
        Ok(HyperbolicSdg::new(e)?
            .eccentric_anomaly(mean_anomaly)?
            .to_radians())
    }
}

/// Converts an element set to Cartesian state vectors at its epoch.
///
/// The set must be complete (see [`KeplerianOrbitElems::complete`]); the
/// angular elements default to zero when unset, the mean anomaly is
/// required.
pub fn elements_to_state(elems: &KeplerianOrbitElems) -> Result<OrbitStateVectors, AstroError> {
    let e = elems.eccentricity.ok_or_else(|| AstroError::ElementSetIncomplete {
        what: "eccentricity is required".to_string(),
    })?;
    let q = elems
        .pericenter_dist
        .ok_or_else(|| AstroError::ElementSetIncomplete {
            what: "pericenter distance is required".to_string(),
        })?;
    let mu = elems.grav_param.ok_or_else(|| AstroError::ElementSetIncomplete {
        what: "gravitational parameter is required".to_string(),
    })?;
    let mean_anomaly = elems
        .mean_anomaly
        .ok_or_else(|| AstroError::ElementSetIncomplete {
            what: "mean anomaly is required".to_string(),
        })?;
    let epoch = elems.epoch.ok_or_else(|| AstroError::ElementSetIncomplete {
        what: "epoch is required".to_string(),
    })?;

    let inc = elems.inclination.unwrap_or(Angle::ZERO).to_radians();
    let raan = elems.ascending_node.unwrap_or(Angle::ZERO).to_radians();
    let aop = elems.arg_of_pericenter.unwrap_or(Angle::ZERO).to_radians();

    let ecc_anomaly = solve_anomaly(e, mean_anomaly)?;
    let (nu, r) = anomaly_to_position(e, q, ecc_anomaly);
    let p = q * (1.0 + e);

    // Perifocal position and velocity, then the classical rotation into
    // the reference plane.
    let (sin_nu, cos_nu) = nu.sin_cos();
    let sqrt_mu_p = (mu / p).sqrt();
    let r_pf = Vector3::new(r * cos_nu, r * sin_nu, 0.0);
    let v_pf = Vector3::new(-sqrt_mu_p * sin_nu, sqrt_mu_p * (e + cos_nu), 0.0);

    let (sin_inc, cos_inc) = inc.sin_cos();
    let (sin_raan, cos_raan) = raan.sin_cos();
    let (sin_aop, cos_aop) = aop.sin_cos();
    let rot = Matrix3::new(
        cos_raan * cos_aop - sin_raan * sin_aop * cos_inc,
        -cos_raan * sin_aop - sin_raan * cos_aop * cos_inc,
        sin_raan * sin_inc,
        sin_raan * cos_aop + cos_raan * sin_aop * cos_inc,
        -sin_raan * sin_aop + cos_raan * cos_aop * cos_inc,
        -cos_raan * sin_inc,
        sin_aop * sin_inc,
        cos_aop * sin_inc,
        cos_inc,
    );

    Ok(OrbitStateVectors {
        ref_plane: elems.ref_plane.clone(),
        grav_param: mu,
        epoch,
        position: rot * r_pf,
        velocity: rot * v_pf,
    })
}

/// Converts Cartesian state vectors to a Keplerian element set via the
/// angular-momentum, node and eccentricity vectors.
pub fn state_to_elements(state: &OrbitStateVectors) -> Result<KeplerianOrbitElems, AstroError> {
    let mu = state.grav_param;
    if mu <= 0.0 {
        return Err(AstroError::InvalidElements {
            what: format!("gravitational parameter {} is not positive", mu),
        });
    }
    let r = state.position;
    let v = state.velocity;
    let r_norm = r.norm();
    let v_norm = v.norm();
    if r_norm == 0.0 {
        return Err(AstroError::InvalidElements {
            what: "position vector is zero".to_string(),
        });
    }

    let h = r.cross(&v);
    let h_norm = h.norm();
    if h_norm < SINGULARITY_TOL {
        return Err(AstroError::InvalidElements {
            what: "rectilinear motion has no orbital plane".to_string(),
        });
    }
    let node = Vector3::new(-h.y, h.x, 0.0);
    let node_norm = node.norm();

    let e_vec = ((v_norm * v_norm - mu / r_norm) * r - r.dot(&v) * v) / mu;
    let e = e_vec.norm();
    let energy = v_norm * v_norm / 2.0 - mu / r_norm;

    let parabolic = abs_diff_eq!(e, 1.0, epsilon = PARABOLIC_BAND);
    let (q, period) = if parabolic {
        (h_norm * h_norm / mu / 2.0, None)
    } else {
        let a = -mu / (2.0 * energy);
        let q = a * (1.0 - e);
        let period = if e < 1.0 {
            Some(2.0 * PI * (a.powi(3) / mu).sqrt())
        } else {
            None
        };
        (q, period)
    };

    let inc = (h.z / h_norm).clamp(-1.0, 1.0).acos();
    let equatorial = node_norm < SINGULARITY_TOL * h_norm;
    let circular = e < SINGULARITY_TOL;

    let raan = if equatorial {
        0.0
    } else {
        let mut raan = (node.x / node_norm).clamp(-1.0, 1.0).acos();
        if node.y < 0.0 {
            raan = 2.0 * PI - raan;
        }
        raan
    };

    let aop = if circular {
        0.0
    } else if equatorial {
        // Measured from the x axis in the orbit plane.
        let mut aop = e_vec.y.atan2(e_vec.x);
        if h.z < 0.0 {
            aop = -aop;
        }
        if aop < 0.0 {
            aop += 2.0 * PI;
        }
        aop
    } else {
        let mut aop = (node.dot(&e_vec) / (node_norm * e)).clamp(-1.0, 1.0).acos();
        if e_vec.z < 0.0 {
            aop = 2.0 * PI - aop;
        }
        aop
    };

    // True anomaly, then back through the eccentric anomaly to the mean.
    let nu = if circular {
        let reference = if equatorial {
            Vector3::new(1.0, 0.0, 0.0)
        } else {
            node / node_norm
        };
        let mut nu = (reference.dot(&r) / r_norm).clamp(-1.0, 1.0).acos();
        if r.dot(&v) < 0.0 {
            nu = 2.0 * PI - nu;
        }
        nu
    } else {
        let mut nu = (e_vec.dot(&r) / (e * r_norm)).clamp(-1.0, 1.0).acos();
        if r.dot(&v) < 0.0 {
            nu = 2.0 * PI - nu;
        }
        nu
    };

    let mean_anomaly = if parabolic {
        let d = (nu / 2.0).tan();
        parabolic_kepler(Angle::from_radians(d))
    } else if e < 1.0 {
        let big_e = 2.0 * (((1.0 - e) / (1.0 + e)).sqrt() * (nu / 2.0).tan()).atan();
        elliptic_kepler(e, Angle::from_radians(big_e))
    } else {
        let tanh_half = ((e - 1.0) / (e + 1.0)).sqrt() * (nu / 2.0).tan();
        if tanh_half.abs() >= 1.0 {
            return Err(AstroError::InvalidElements {
                what: format!("true anomaly {} is unreachable on this hyperbola", nu),
            });
        }
        let big_h = 2.0 * tanh_half.atanh();
        hyperbolic_kepler(e, Angle::from_radians(big_h))
    };

    Ok(KeplerianOrbitElems {
        ref_plane: state.ref_plane.clone(),
        epoch: Some(state.epoch),
        grav_param: Some(mu),
        pericenter_dist: Some(q),
        period,
        eccentricity: Some(e),
        inclination: Some(Angle::from_radians(inc)),
        ascending_node: Some(Angle::from_radians(raan)),
        arg_of_pericenter: Some(Angle::from_radians(aop)),
        mean_anomaly: Some(mean_anomaly.between_0_360()),
    })
}

/// An orbit tracker: owns an element set and answers state queries at any
/// epoch by advancing the mean anomaly at the mean motion.
pub struct KeplerianTracker {
    initial: KeplerianOrbitElems,
    current: KeplerianOrbitElems,
    /// rad/s
    mean_motion: f64,
}

impl KeplerianTracker {
    /// Builds the tracker from an element set, completing it first.
    pub fn new(elems: &KeplerianOrbitElems) -> Result<Self, AstroError> {
        let mut completed = elems.clone();
        completed.complete()?;
        if completed.epoch.is_none() || completed.mean_anomaly.is_none() {
            return Err(AstroError::ElementSetIncomplete {
                what: "tracking needs an epoch and a mean anomaly".to_string(),
            });
        }
        let mean_motion = completed.mean_motion().ok_or_else(|| {
            AstroError::ElementSetIncomplete {
                what: "mean motion is underivable".to_string(),
            }
        })?;
        Ok(Self {
            initial: completed.clone(),
            current: completed,
            mean_motion,
        })
    }

    /// Builds the tracker from Cartesian state vectors.
    pub fn from_state(state: &OrbitStateVectors) -> Result<Self, AstroError> {
        Self::new(&state_to_elements(state)?)
    }

    pub fn elements(&self) -> &KeplerianOrbitElems {
        &self.current
    }

    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    /// Advances the tracked state by a signed duration.
    pub fn advance(&mut self, dt: Duration) {
        let seconds = dt.to_seconds();
        let dm = Angle::from_radians(self.mean_motion * seconds);
        if let (Some(m), Some(epoch)) = (self.current.mean_anomaly, self.current.epoch) {
            self.current.mean_anomaly = Some(m + dm);
            self.current.epoch = Some(epoch + dt);
        }
    }

    /// Moves the tracked state to the given epoch.
    pub fn set_epoch(&mut self, epoch: Epoch) {
        if let Some(current) = self.current.epoch {
            self.advance(epoch - current);
        }
    }

    /// Shifts the state by a mean-anomaly offset, moving the epoch along.
    pub fn shift(&mut self, offset: Angle) {
        if let (Some(m), Some(epoch)) = (self.current.mean_anomaly, self.current.epoch) {
            self.current.mean_anomaly = Some(m + offset);
            self.current.epoch =
                Some(epoch + offset.to_radians() / self.mean_motion * Unit::Second);
        }
    }

    /// Restores the construction-time state.
    pub fn reset(&mut self) {
        self.current = self.initial.clone();
    }

    /// The Cartesian state at the tracked epoch.
    pub fn state_vectors(&self) -> Result<OrbitStateVectors, AstroError> {
        elements_to_state(&self.current)
    }
}
