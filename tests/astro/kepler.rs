use asteria::angle::Angle;
use asteria::astro::kepler::{
    elliptic_kepler, hyperbolic_kepler, HyperbolicSdg, InverseKeplerEquation, MarkleyElliptic,
    NewtonElliptic, PiecewiseQuinticElliptic,
};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_pcg::Pcg64Mcg;
use std::f64::consts::PI;

/// A Latin-hypercube sample over the unit square: one point per stratum
/// in each dimension, strata paired by a random permutation.
fn latin_hypercube(rng: &mut Pcg64Mcg, n: usize) -> Vec<(f64, f64)> {
    let mut strata: Vec<usize> = (0..n).collect();
    strata.shuffle(rng);
    (0..n)
        .map(|i| {
            let u = (i as f64 + rng.gen_range(0.0..1.0)) / n as f64;
            let v = (strata[i] as f64 + rng.gen_range(0.0..1.0)) / n as f64;
            (u, v)
        })
        .collect()
}

/// Elliptic inversion residual sweep: e in [0, 0.999], M in [-pi, pi],
/// every strategy, residual measured back through the forward equation.
#[test]
fn elliptic_inversion_sweep() {
    let mut rng = Pcg64Mcg::new(42);
    for (u, v) in latin_hypercube(&mut rng, 60) {
        let e = 0.999 * u;
        let m_rad = -PI + 2.0 * PI * v;
        let m = Angle::from_radians(m_rad);

        let newton = NewtonElliptic::new(e).unwrap();
        let markley = MarkleyElliptic::new(e).unwrap();
        for solver in [&newton as &dyn InverseKeplerEquation, &markley] {
            let big_e = solver.eccentric_anomaly(m).unwrap();
            let back = elliptic_kepler(e, big_e).to_radians();
            // A few ULP of the mean anomaly, with headroom for the
            // ill-conditioned near-parabolic band.
            let tol = if e > 0.9 { 5e-13 } else { 5e-14 };
            assert!(
                (back - m_rad).abs() <= tol,
                "e = {}, M = {}: residual {:e}",
                e,
                m_rad,
                (back - m_rad).abs()
            );
        }
    }
}

/// The piecewise-quintic strategy sweeps a coarser grid (construction is
/// the expensive part) but must hit the same residual class.
#[test]
fn piecewise_quintic_sweep() {
    let mut rng = Pcg64Mcg::new(7);
    for e in [0.05, 0.35, 0.65, 0.9] {
        let solver = PiecewiseQuinticElliptic::new(e).unwrap();
        for _ in 0..25 {
            let m_rad = rng.gen_range(-PI..PI);
            let big_e = solver
                .eccentric_anomaly(Angle::from_radians(m_rad))
                .unwrap();
            let back = elliptic_kepler(e, big_e).to_radians();
            assert!(
                (back - m_rad).abs() < 1e-12,
                "e = {}, M = {}: residual {:e}",
                e,
                m_rad,
                (back - m_rad).abs()
            );
        }
    }
}

/// Hyperbolic inversion sweep across e in [1.001, 50] and a wide
/// mean-anomaly span.
#[test]
fn hyperbolic_inversion_sweep() {
    let mut rng = Pcg64Mcg::new(1234);
    for (u, v) in latin_hypercube(&mut rng, 50) {
        let e = 1.001 + 48.999 * u;
        // Log-spaced magnitudes from 1e-3 to 1e3, either sign.
        let magnitude = 10_f64.powf(-3.0 + 6.0 * v);
        let m_rad = if rng.gen_bool(0.5) { magnitude } else { -magnitude };

        let solver = HyperbolicSdg::new(e).unwrap();
        let big_h = solver
            .eccentric_anomaly(Angle::from_radians(m_rad))
            .unwrap();
        let back = hyperbolic_kepler(e, big_h).to_radians();
        let tol = 5e-13 * m_rad.abs().max(1.0);
        assert!(
            (back - m_rad).abs() <= tol,
            "e = {}, M = {}: residual {:e}",
            e,
            m_rad,
            (back - m_rad).abs()
        );
    }
}

/// The documented reference point: (e, M) = (0.5, 1 rad).
#[test]
fn reference_point_all_strategies() {
    let e = 0.5;
    let m = Angle::from_radians(1.0);
    let solvers: Vec<Box<dyn InverseKeplerEquation>> = vec![
        Box::new(NewtonElliptic::new(e).unwrap()),
        Box::new(MarkleyElliptic::new(e).unwrap()),
        Box::new(PiecewiseQuinticElliptic::new(e).unwrap()),
    ];
    for solver in &solvers {
        let big_e = solver.eccentric_anomaly(m).unwrap().to_radians();
        assert!(
            (big_e - 1.498_701_924).abs() < 1e-8,
            "E = {:.9}",
            big_e
        );
        let residual = (1.0 - (big_e - e * big_e.sin())).abs();
        assert!(residual < 1e-13, "residual {:e}", residual);
    }
}
