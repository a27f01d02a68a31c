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

use super::{Antiderivative, DefiniteIntegrator};
use crate::errors::MathError;
use statrs::function::gamma::gamma;
use std::sync::Arc;

/// The Riemann-Liouville integral: an order-alpha antiderivative, alpha
/// not necessarily an integer.
///
/// `eval(x) = F(c) + (1/Gamma(alpha)) * int_c^x (x - t)^(alpha - 1) f(t) dt`
///
/// The pair `(c, F(c))` pins the integration constant, making this the
/// unique order-alpha antiderivative taking value `F(c)` at `c`. Order and
/// initial condition are immutable after construction; every evaluation
/// costs one definite integral on the shared engine.
pub struct RiemannLiouvilleIntegral {
    f: Arc<dyn Fn(f64) -> f64>,
    order: f64,
    base_point: f64,
    base_value: f64,
    engine: Arc<dyn DefiniteIntegrator>,
}

impl RiemannLiouvilleIntegral {
    pub fn new(
        f: Arc<dyn Fn(f64) -> f64>,
        order: f64,
        base: (f64, f64),
        engine: Arc<dyn DefiniteIntegrator>,
    ) -> Result<Self, MathError> {
        if order <= 0.0 {
            return Err(MathError::InvalidArgument {
                what: format!("integration order {} must be positive", order),
            });
        }
        Ok(Self {
            f,
            order,
            base_point: base.0,
            base_value: base.1,
            engine,
        })
    }

    pub fn order(&self) -> f64 {
        self.order
    }
}

impl Antiderivative for RiemannLiouvilleIntegral {
    fn eval(&self, x: f64) -> Result<f64, MathError> {
        let exponent = self.order - 1.0;
        // Integer orders keep the signed kernel so evaluation below the
        // base point remains valid; fractional kernels are one-sided.
        let integer_order = (self.order - self.order.round()).abs() < f64::EPSILON;
        let f = &self.f;
        let integrand = move |t: f64| {
            let kernel = if integer_order {
                (x - t).powi(exponent as i32)
            } else {
                (x - t).max(0.0).powf(exponent)
            };
            kernel * f(t)
        };
        let integral = self
            .engine
            .integrate(&integrand, self.base_point, x)
            .map_err(|e| match e {
                MathError::DomainError { what } => MathError::DomainError {
                    what: format!("{} from Riemann-Liouville integration", what),
                },
                other => other,
            })?;
        Ok(integral / gamma(self.order) + self.base_value)
    }
}
