use asteria::math::ode::{OdeState, RungeKutta};

/// Lotka-Volterra with (alpha, beta, gamma, delta) = (1.5, 1, 3, 1) from
/// (10, 5): the trajectory is periodic and the first integral
/// `delta x - gamma ln x + beta y - alpha ln y` must stay put.
#[test]
fn lotka_volterra_invariant() {
    let (alpha, beta, gamma, delta) = (1.5, 1.0, 3.0, 1.0);
    let rhs = move |_t: f64, z: &[f64]| {
        let (x, y) = (z[0], z[1]);
        vec![alpha * x - beta * x * y, -gamma * y + delta * x * y]
    };
    let invariant = move |z: &[f64]| delta * z[0] - gamma * z[0].ln() + beta * z[1] - alpha * z[1].ln();

    let mut engine = RungeKutta::rk45(Box::new(rhs), 2);
    engine.abs_tol_nlog = 10.0;
    engine.rel_tol_nlog = 10.0;
    engine.init(&[10.0, 5.0], 0.0, 15.0).unwrap();
    while engine.state() == OdeState::Processing {
        engine.step().unwrap();
        engine.save_dense_output();
    }

    let h0 = invariant(&[10.0, 5.0]);
    for i in 0..=300 {
        let t = 15.0 * i as f64 / 300.0;
        let z = engine.eval(t).unwrap();
        let drift = (invariant(&z) - h0).abs();
        assert!(drift < 1e-4, "invariant drift {:e} at t = {}", drift, t);
    }

    // The period is about 4.88: the state must echo itself one period on.
    let z0 = engine.eval(1.0).unwrap();
    let z1 = engine.eval(1.0 + 4.88).unwrap();
    assert!((z0[0] - z1[0]).abs() < 0.15 && (z0[1] - z1[1]).abs() < 0.15);
}

/// Dense output agrees with a fresh re-integration stopping at the query
/// time, within one order more than the integration tolerance.
#[test]
fn dense_output_matches_reintegration() {
    let rhs = |t: f64, y: &[f64]| vec![y[1], -y[0] * (1.0 + 0.1 * t.sin())];
    let y0 = [1.0, 0.0];

    let mut engine = RungeKutta::rk45(Box::new(rhs), 2);
    engine.abs_tol_nlog = 9.0;
    engine.rel_tol_nlog = 9.0;
    engine.init(&y0, 0.0, 10.0).unwrap();
    while engine.state() == OdeState::Processing {
        engine.step().unwrap();
        engine.save_dense_output();
    }

    for t_query in [1.3, 4.7, 8.1] {
        let interpolated = engine.eval(t_query).unwrap();
        let mut fresh = RungeKutta::rk45(Box::new(rhs), 2);
        fresh.abs_tol_nlog = 11.0;
        fresh.rel_tol_nlog = 11.0;
        fresh.init(&y0, 0.0, t_query).unwrap();
        while fresh.state() == OdeState::Processing {
            fresh.step().unwrap();
        }
        let direct = &fresh.solutions().last().unwrap().1;
        for (a, b) in interpolated.iter().zip(direct.iter()) {
            assert!(
                (a - b).abs() < 1e-7,
                "t = {}: {} vs {}",
                t_query,
                a,
                b
            );
        }
    }
}

/// The solution buffer is ordered in the integration direction and the
/// endpoint lands exactly.
#[test]
fn state_buffer_ordering() {
    let engine = RungeKutta::solve(Box::new(|_t, y: &[f64]| vec![-0.5 * y[0]]), &[2.0], 0.0, 3.0)
        .unwrap();
    let times: Vec<f64> = engine.solutions().iter().map(|(t, _)| *t).collect();
    assert!(times.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(*times.last().unwrap(), 3.0);
    assert_eq!(engine.state(), OdeState::Succeeded);
}
