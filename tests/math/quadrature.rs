use asteria::math::quadrature::{
    evenly_spaced_samples, DefiniteIntegrator, GaussKronrod, NewtonCotes, SampleBasedIntegrator,
};

/// A Kronrod rule of n points integrates polynomials of degree below
/// 3(n-1)/2 + 2 exactly; sweep every bundled and one computed rule over a
/// basis of monomials on a shifted interval.
#[test]
fn gauss_kronrod_polynomial_exactness() {
    for order in [15usize, 21, 31] {
        let quad = GaussKronrod::new(order).unwrap();
        let max_exact_degree = 3 * (order - 1) / 2;
        for degree in (0..=max_exact_degree.min(25)).step_by(5) {
            let (a, b): (f64, f64) = (-0.5, 1.75);
            let exact = (b.powi(degree as i32 + 1) - a.powi(degree as i32 + 1))
                / (degree as f64 + 1.0);
            let got = quad.run(&|x: f64| x.powi(degree as i32), a, b).unwrap();
            assert!(
                (got - exact).abs() <= 1e-12 * exact.abs().max(1.0),
                "order {}, degree {}: {} vs {}",
                order,
                degree,
                got,
                exact
            );
        }
    }
}

/// The showcase integral: exp(-t^2) over the half line is sqrt(pi)/2.
#[test]
fn gaussian_tail_to_machine_precision() {
    let quad = GaussKronrod::default();
    let got = quad
        .integrate(&|t: f64| (-t * t).exp(), 0.0, f64::INFINITY)
        .unwrap();
    let expected = 0.886_226_925_452_758;
    assert!(
        (got - expected).abs() < 1e-14,
        "got {:.15} expected {:.15}",
        got,
        expected
    );
}

#[test]
fn adaptive_handles_oscillatory_integrands() {
    let quad = GaussKronrod::default();
    // int_0^10 sin(20 x) dx = (1 - cos(200)) / 20
    let exact = (1.0 - (200.0_f64).cos()) / 20.0;
    let got = quad.run(&|x: f64| (20.0 * x).sin(), 0.0, 10.0).unwrap();
    assert!((got - exact).abs() < 1e-12, "got {} exact {}", got, exact);
}

/// Composite Simpson converges at fourth order on a smooth integrand.
#[test]
fn simpson_convergence_order() {
    let f = |x: f64| (x.sin() + 2.0).ln();
    let reference = GaussKronrod::default().run(&f, 0.0, 2.0).unwrap();
    let error_at = |count: usize| {
        let samples = evenly_spaced_samples(f, 0.0, 2.0, count);
        (NewtonCotes::simpson(&samples).unwrap() - reference).abs()
    };
    let e_coarse = error_at(17);
    let e_fine = error_at(33);
    let order = (e_coarse / e_fine).log2();
    assert!(
        order > 3.5 && order < 4.6,
        "observed order {} (errors {:e} / {:e})",
        order,
        e_coarse,
        e_fine
    );
}

/// Every Newton-Cotes level agrees with the Gauss-Kronrod reference on a
/// generic smooth function.
#[test]
fn newton_cotes_levels_cross_check() {
    let f = |x: f64| x.exp() * (3.0 * x).cos();
    let reference = GaussKronrod::default().run(&f, 0.0, 1.5).unwrap();
    for level in [0usize, 1, 2, 4, 7] {
        let nc = NewtonCotes::new(level);
        let got = nc.integrate(&f, 0.0, 1.5).unwrap();
        let tol = if level == 1 { 2e-5 } else { 1e-9 };
        assert!(
            (got - reference).abs() < tol,
            "level {}: {} vs {}",
            level,
            got,
            reference
        );
    }
}

/// Pre-sampled data paths: both the evenly spaced and the warped grid
/// reach the same area.
#[test]
fn sampled_curve_agreement() {
    let f = |x: f64| 1.0 / (1.0 + x * x);
    let exact = 1.0_f64.atan(); // over [0, 1]
    let even = evenly_spaced_samples(f, 0.0, 1.0, 201);
    let warped: Vec<(f64, f64)> = (0..=200)
        .map(|i| {
            let x = ((i as f64 / 200.0) * std::f64::consts::PI / 2.0).sin().powi(2);
            (x, f(x))
        })
        .collect();
    let nc = NewtonCotes::new(2);
    assert!((nc.run_sampled(&even).unwrap() - exact).abs() < 1e-10);
    assert!((nc.run_sampled(&warped).unwrap() - exact).abs() < 1e-7);
}
