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

use crate::errors::MathError;

/// The golden ratio conjugate, (sqrt(5) - 1) / 2.
pub const GOLDEN_RATIO: f64 = 0.618_033_988_749_894_8;
/// Bracket extension factor, 1 + phi.
const GOLD_EXTEND: f64 = 1.0 + GOLDEN_RATIO;
/// Golden-section interior fraction, 1 - phi.
const GOLD_SECTION: f64 = 1.0 - GOLDEN_RATIO;

/// A downhill bracket: three ordered abscissae with the centre strictly
/// below both ends, each paired with its function value.
#[derive(Copy, Clone, Debug)]
pub struct Bracket {
    pub first: (f64, f64),
    pub centre: (f64, f64),
    pub last: (f64, f64),
}

/// Constructs a bracket around a local minimum by walking downhill from
/// `(xa, xb)` with golden-ratio extension and parabolic acceleration.
///
/// The parabolic trial step is capped at `grow_limit` times the current
/// interval; the walk is capped at `10^max_iter_log` total iterations.
pub fn bracket<F: Fn(f64) -> f64>(
    f: F,
    xa: f64,
    xb: f64,
    max_iter_log: f64,
    abs_tol_nlog: f64,
    grow_limit: f64,
) -> Result<Bracket, MathError> {
    let tiny = 10_f64.powf(-abs_tol_nlog);
    let max_iterations = 10_f64.powf(max_iter_log).floor().max(1.0) as u64;

    let (mut xa, mut xb) = (xa, xb);
    let mut fa = f(xa);
    let mut fb = f(xb);
    if fa < fb {
        std::mem::swap(&mut xa, &mut xb);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut xc = xb + GOLD_EXTEND * (xb - xa);
    let mut fc = f(xc);

    let mut iterations = 0u64;
    while fc < fb {
        if iterations >= max_iterations {
            return Err(MathError::ConvergenceFailed {
                iterations,
                residual: fc - fb,
            });
        }
        iterations += 1;

        // Parabolic estimate of the minimum from the current triple.
        let tmp1 = (xb - xa) * (fb - fc);
        let tmp2 = (xb - xc) * (fb - fa);
        let val = tmp2 - tmp1;
        let denom = if val.abs() < tiny {
            2.0 * tiny.copysign(val)
        } else {
            2.0 * val
        };
        let mut w = xb - ((xb - xc) * tmp2 - (xb - xa) * tmp1) / denom;
        let wlim = xb + grow_limit * (xc - xb);
        let mut fw;

        if (w - xc) * (xb - w) > 0.0 {
            // Parabolic minimum between xb and xc.
            fw = f(w);
            if fw < fc {
                xa = xb;
                xb = w;
                fb = fw;
                break;
            } else if fw > fb {
                xc = w;
                fc = fw;
                break;
            }
            w = xc + GOLD_EXTEND * (xc - xb);
            fw = f(w);
        } else if (w - wlim) * (wlim - xc) >= 0.0 {
            // Past the growth limit: clamp.
            w = wlim;
            fw = f(w);
        } else if (w - wlim) * (xc - w) > 0.0 {
            fw = f(w);
            if fw < fc {
                xb = xc;
                xc = w;
                w = xc + GOLD_EXTEND * (xc - xb);
                fb = fc;
                fc = fw;
                fw = f(w);
            }
        } else {
            // Uniform golden extension.
            w = xc + GOLD_EXTEND * (xc - xb);
            fw = f(w);
        }
        xa = xb;
        xb = xc;
        xc = w;
        fa = fb;
        fb = fc;
        fc = fw;
    }

    // Return in ascending abscissa order.
    let (lo, mid, hi) = if xa < xc {
        ((xa, fa), (xb, fb), (xc, fc))
    } else {
        ((xc, fc), (xb, fb), (xa, fa))
    };
    Ok(Bracket {
        first: lo,
        centre: mid,
        last: hi,
    })
}

/// Builds a bracket from a predefined point set: the interior minimum of
/// the sorted samples and its two neighbours, falling back to the walking
/// construction when the minimum sits on the boundary.
pub fn bracket_from_points<F: Fn(f64) -> f64>(
    f: F,
    points: &[f64],
) -> Result<Bracket, MathError> {
    if points.len() < 2 {
        return bracket(f, 0.0, 1.0, 3.0, 21.0, 110.0);
    }
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let values: Vec<f64> = pts.iter().map(|x| f(*x)).collect();
    let (imin, _) = values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
        .unwrap();
    if imin > 0 && imin + 1 < pts.len() {
        return Ok(Bracket {
            first: (pts[imin - 1], values[imin - 1]),
            centre: (pts[imin], values[imin]),
            last: (pts[imin + 1], values[imin + 1]),
        });
    }
    // Downhill direction starts from the boundary minimum.
    let (xa, xb) = if imin == 0 {
        (pts[1], pts[0])
    } else {
        (pts[imin - 1], pts[imin])
    };
    bracket(f, xa, xb, 3.0, 21.0, 110.0)
}

/// Brent's unbounded scalar minimizer: golden-section steps interleaved
/// with inverse parabolic interpolation on a guaranteed bracket.
///
/// Tolerances are negative decimal logs; the iteration cap is a decimal
/// log. Converged when the bracket width shrinks below
/// `rtol * |x| + atol`.
#[derive(Copy, Clone, Debug)]
pub struct BrentMinimizer {
    /// Relative tolerance (negative log), default 7.83 (~ sqrt(eps)).
    pub tolerance_nlog: f64,
    /// Absolute floor tolerance (negative log), default 11.
    pub min_tolerance_nlog: f64,
    /// Iteration cap (log), default 2.7 (500 iterations).
    pub max_iter_log: f64,
}

impl Default for BrentMinimizer {
    fn default() -> Self {
        Self {
            tolerance_nlog: 7.83,
            min_tolerance_nlog: 11.0,
            max_iter_log: 2.7,
        }
    }
}

impl BrentMinimizer {
    /// Minimizes `f`, bracketing from `(0, 1)` first.
    pub fn run<F: Fn(f64) -> f64>(&self, f: F) -> Result<(f64, f64), MathError> {
        let br = bracket(&f, 0.0, 1.0, 3.0, 21.0, 110.0)?;
        self.minimize(f, &br)
    }

    /// Minimizes `f`, bracketing from the given points.
    pub fn run_with_points<F: Fn(f64) -> f64>(
        &self,
        f: F,
        points: &[f64],
    ) -> Result<(f64, f64), MathError> {
        let br = bracket_from_points(&f, points)?;
        self.minimize(f, &br)
    }

    /// Minimizes `f` inside the given bracket. Returns `(x_min, f(x_min))`.
    pub fn minimize<F: Fn(f64) -> f64>(
        &self,
        f: F,
        br: &Bracket,
    ) -> Result<(f64, f64), MathError> {
        let rtol = 10_f64.powf(-self.tolerance_nlog);
        let mintol = 10_f64.powf(-self.min_tolerance_nlog);
        let max_iterations = 10_f64.powf(self.max_iter_log).floor().max(1.0) as u64;

        let (xa, xb, xc) = (br.first.0, br.centre.0, br.last.0);
        let mut x = xb;
        let mut w = xb;
        let mut v = xb;
        let mut fx = br.centre.1;
        let mut fw = fx;
        let mut fv = fx;
        let mut a = xa.min(xc);
        let mut b = xa.max(xc);
        let mut deltax: f64 = 0.0;
        let mut rat: f64 = 0.0;

        for _ in 0..max_iterations {
            let tol1 = rtol * x.abs() + mintol;
            let tol2 = 2.0 * tol1;
            let xmid = 0.5 * (a + b);
            if (x - xmid).abs() < tol2 - 0.5 * (b - a) {
                return Ok((x, fx));
            }

            if deltax.abs() <= tol1 {
                // Golden-section step into the larger half.
                deltax = if x >= xmid { a - x } else { b - x };
                rat = GOLD_SECTION * deltax;
            } else {
                // Inverse parabolic trial through (v, w, x).
                let tmp1 = (x - w) * (fx - fv);
                let mut tmp2 = (x - v) * (fx - fw);
                let mut p = (x - v) * tmp2 - (x - w) * tmp1;
                tmp2 = 2.0 * (tmp2 - tmp1);
                if tmp2 > 0.0 {
                    p = -p;
                }
                tmp2 = tmp2.abs();
                let deltax_prev = deltax;
                deltax = rat;
                if p > tmp2 * (a - x)
                    && p < tmp2 * (b - x)
                    && p.abs() < (0.5 * tmp2 * deltax_prev).abs()
                {
                    rat = p / tmp2;
                    let u = x + rat;
                    if (u - a) < tol2 || (b - u) < tol2 {
                        rat = tol1.copysign(xmid - x);
                    }
                } else {
                    deltax = if x >= xmid { a - x } else { b - x };
                    rat = GOLD_SECTION * deltax;
                }
            }

            let u = if rat.abs() >= tol1 {
                x + rat
            } else {
                x + tol1.copysign(rat)
            };
            let fu = f(u);

            if fu > fx {
                if u < x {
                    a = u;
                } else {
                    b = u;
                }
                if fu <= fw || w == x {
                    v = w;
                    w = u;
                    fv = fw;
                    fw = fu;
                } else if fu <= fv || v == x || v == w {
                    v = u;
                    fv = fu;
                }
            } else {
                if u >= x {
                    a = x;
                } else {
                    b = x;
                }
                v = w;
                w = x;
                x = u;
                fv = fw;
                fw = fx;
                fx = fu;
            }
        }
        Err(MathError::ConvergenceFailed {
            iterations: max_iterations,
            residual: b - a,
        })
    }
}

#[cfg(test)]
mod ut_minimize {
    use super::*;

    #[test]
    fn bracket_surrounds_minimum() {
        let f = |x: f64| (x - 3.0).powi(2);
        let br = bracket(f, 0.0, 1.0, 3.0, 21.0, 110.0).unwrap();
        assert!(br.first.0 < br.centre.0 && br.centre.0 < br.last.0);
        assert!(br.centre.1 < br.first.1 && br.centre.1 < br.last.1);
        assert!(br.first.0 <= 3.0 && 3.0 <= br.last.0);
    }

    #[test]
    fn brent_finds_quadratic_minimum() {
        let f = |x: f64| (x - 2.5).powi(2) + 1.0;
        let (x, fx) = BrentMinimizer::default().run(f).unwrap();
        assert!((x - 2.5).abs() < 1e-7);
        assert!((fx - 1.0).abs() < 1e-12);
    }

    #[test]
    fn brent_nonpolynomial() {
        // min of x - ln x at x = 1.
        let f = |x: f64| x - x.max(1e-300).ln();
        let (x, _) = BrentMinimizer::default()
            .run_with_points(f, &[0.1, 0.5, 2.0, 4.0])
            .unwrap();
        assert!((x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn bracket_from_interior_points() {
        let f = |x: f64| x * x;
        let br = bracket_from_points(f, &[-2.0, -0.5, 1.0, 3.0]).unwrap();
        assert!(br.centre.1 < br.first.1);
        assert!(br.centre.1 < br.last.1);
    }
}
