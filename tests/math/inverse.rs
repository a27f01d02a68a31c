use asteria::linalg::Complex;
use asteria::math::minimize::BrentMinimizer;
use asteria::math::polynomial::{
    solve_poly, solve_poly_with, DurandKernerSeed, Polynomial, SolvePolyOptions,
};
use asteria::math::root_finding::{newton, Bisection, BrentInverse};
use rand::Rng;
use rand_pcg::Pcg64Mcg;

/// The pynverse showcase: inverting exp at 10 recovers ln 10.
#[test]
fn brent_inverse_of_exp() {
    let inverse = BrentInverse::new(|x: f64| x.exp());
    let got = inverse.eval(10.0).unwrap();
    let expected = 2.302_585_092_994_046;
    assert!(
        (got - expected).abs() < 1e-10,
        "got {:.15} expected {:.15}",
        got,
        expected
    );
}

/// Round trips f^-1(f(x)) = x for a mix of solvers and functions.
#[test]
fn inverse_round_trips() {
    // Bisection against a monotonic quintic.
    let f = |x: f64| x.powi(5) + x + 1.0;
    let solver = Bisection::new(f, (-3.0, 3.0));
    for x in [-2.0, -0.5, 0.0, 1.0, 2.5] {
        let back = solver.run(f(x)).unwrap();
        assert!((back - x).abs() < 1e-9, "bisection at {}: {}", x, back);
    }

    // Newton against the same function.
    let df = |x: f64| 5.0 * x.powi(4) + 1.0;
    for x in [-1.5, 0.3, 2.0] {
        let back = newton(
            |t| f(t) - f(x),
            df,
            x + 0.4,
            1.7,
            12.0,
            f64::INFINITY,
        )
        .unwrap();
        assert!((back - x).abs() < 1e-10, "newton at {}: {}", x, back);
    }

    // Brent inversion of a bounded, decreasing function.
    let g = |x: f64| 1.0 / (1.0 + x);
    let inverse =
        BrentInverse::with_bounds(g, (0.0, 50.0), (false, false), (0.0, 1.0)).unwrap();
    for x in [0.5, 3.0, 20.0] {
        let back = inverse.eval(g(x)).unwrap();
        assert!((back - x).abs() < 1e-5, "brent at {}: {}", x, back);
    }
}

/// Residual bound for the unified polynomial solver over random
/// coefficient vectors spanning degrees 1 through 20.
#[test]
fn solve_poly_residual_sweep() {
    let mut rng = Pcg64Mcg::new(0xcafe_f00d_d15e_a5e5);
    let opts = SolvePolyOptions {
        // The circular seed scales its radius to the coefficient spread.
        seed: DurandKernerSeed::Circular,
        max_iter_log: 3.5,
        ..Default::default()
    };
    for degree in 1..=20usize {
        for _ in 0..5 {
            let coeffs: Vec<f64> = (0..=degree)
                .map(|_| {
                    let magnitude = 10_f64.powf(rng.gen_range(-3.0..3.0));
                    let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                    sign * magnitude
                })
                .collect();
            let roots = match solve_poly_with(&coeffs, &opts) {
                Ok(roots) => roots,
                Err(e) => panic!("degree {} failed: {:?} ({:?})", degree, e, coeffs),
            };
            assert_eq!(roots.len(), degree);

            let p = Polynomial::new(coeffs.clone());
            let coeff_inf = coeffs.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
            let scale: f64 = roots
                .iter()
                .map(|r| r.norm().powi(degree.saturating_sub(1) as i32))
                .sum();
            for root in &roots {
                let residual = p.eval_complex(*root).norm();
                assert!(
                    residual <= 1e-9 * coeff_inf * scale.max(1.0),
                    "degree {}: residual {:e} at {} (coeffs {:?})",
                    degree,
                    residual,
                    root,
                    coeffs
                );
            }
        }
    }
}

/// Root multisets are matched order-agnostically: conjugate pairs from a
/// real polynomial must pair up.
#[test]
fn complex_roots_come_in_conjugate_pairs() {
    let coeffs = [1.0, -2.0, 5.0, -8.0, 10.0, -4.0, 2.0];
    let roots = solve_poly(&coeffs).unwrap();
    for root in &roots {
        if root.im.abs() > 1e-8 {
            let conj = Complex::new(root.re, -root.im);
            let found = roots.iter().any(|r| (r - conj).norm() < 1e-6);
            assert!(found, "conjugate of {} missing", root);
        }
    }
}

/// The minimizer and the inverse agree: minimizing (exp(x) - 10)^2 is
/// inverting exp at 10.
#[test]
fn minimizer_inverse_consistency() {
    let (x_min, _) = BrentMinimizer::default()
        .run(|x: f64| (x.exp() - 10.0).powi(2))
        .unwrap();
    let inverse = BrentInverse::new(|x: f64| x.exp()).eval(10.0).unwrap();
    assert!((x_min - inverse).abs() < 1e-6);
}
