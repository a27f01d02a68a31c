use asteria::astro::lambert::LambertProblem;
use asteria::linalg::Vector3;
use rand::Rng;
use rand_pcg::Pcg64Mcg;
use std::f64::consts::PI;

/// Positions and velocities along a circular orbit of radius r at phase
/// angle theta (mu = 1 units).
fn circular_state(r: f64, theta: f64) -> (Vector3<f64>, Vector3<f64>) {
    let v = (1.0 / r).sqrt();
    (
        Vector3::new(r * theta.cos(), r * theta.sin(), 0.0),
        Vector3::new(-v * theta.sin(), v * theta.cos(), 0.0),
    )
}

/// Along a known circular orbit, the Lambert solution must recover the
/// orbit's own velocities at both endpoints.
#[test]
fn recovers_circular_orbit_velocities() {
    let mut rng = Pcg64Mcg::new(2024);
    for _ in 0..20 {
        let r = rng.gen_range(0.5..4.0);
        let theta0 = rng.gen_range(0.0..2.0 * PI);
        // Keep the transfer angle inside (0, pi) so the short way is the
        // circular arc itself.
        let dtheta = rng.gen_range(0.2..2.9);
        let (r1, v1) = circular_state(r, theta0);
        let (r2, v2) = circular_state(r, theta0 + dtheta);
        // Circular arc time: angle / mean motion.
        let tof = dtheta * (r.powi(3)).sqrt();

        let problem = LambertProblem::new(1.0, r1, r2, tof);
        let solutions = problem.solve().unwrap();
        let sol = &solutions[0];
        assert!(
            (sol.v_init - v1).norm() < 1e-8,
            "r = {}, dtheta = {}: v1 error {:e}",
            r,
            dtheta,
            (sol.v_init - v1).norm()
        );
        assert!(
            (sol.v_final - v2).norm() < 1e-8,
            "r = {}, dtheta = {}: v2 error {:e}",
            r,
            dtheta,
            (sol.v_final - v2).norm()
        );
    }
}

/// Same along a moderately eccentric orbit, using the forward Kepler
/// machinery to place the boundary states.
#[test]
fn recovers_elliptic_orbit_velocities() {
    use asteria::angle::Angle;
    use asteria::astro::orbit::{elements_to_state, KeplerianOrbitElems};
    use asteria::time::Epoch;

    let epoch = Epoch::from_gregorian_utc_at_midnight(2025, 1, 1);
    let elems = |mean_anomaly_deg: f64| KeplerianOrbitElems {
        ref_plane: None,
        epoch: Some(epoch),
        grav_param: Some(1.0),
        pericenter_dist: Some(0.8),
        period: None,
        eccentricity: Some(0.3),
        inclination: Some(Angle::from_degrees(20.0)),
        ascending_node: Some(Angle::from_degrees(15.0)),
        arg_of_pericenter: Some(Angle::from_degrees(40.0)),
        mean_anomaly: Some(Angle::from_degrees(mean_anomaly_deg)),
    };

    let mut start = elems(10.0);
    start.complete().unwrap();
    let mut end = elems(130.0);
    end.complete().unwrap();

    let s0 = elements_to_state(&start).unwrap();
    let s1 = elements_to_state(&end).unwrap();
    // Time between the anomalies: delta M over the mean motion.
    let n = start.mean_motion().unwrap();
    let tof = (130.0 - 10.0_f64).to_radians() / n;

    let problem = LambertProblem::new(1.0, s0.position, s1.position, tof);
    let solutions = problem.solve().unwrap();
    let sol = &solutions[0];
    assert!(
        (sol.v_init - s0.velocity).norm() < 1e-8,
        "v1 error {:e}",
        (sol.v_init - s0.velocity).norm()
    );
    assert!(
        (sol.v_final - s1.velocity).norm() < 1e-8,
        "v2 error {:e}",
        (sol.v_final - s1.velocity).norm()
    );
}

/// Multi-revolution solutions propagate back to the same boundary radii
/// and transfer time: verified through the transfer orbit's elements.
#[test]
fn multi_rev_solutions_are_physical() {
    use asteria::time::Epoch;

    let (r1, _) = circular_state(1.0, 0.0);
    let (r2, _) = circular_state(1.0, 0.5 * PI);
    let mut problem = LambertProblem::new(1.0, r1, r2, 2.0 * PI * 1.75);
    problem.max_revs = 1;
    let solutions = problem.solve().unwrap();
    assert_eq!(solutions.len(), 3);

    let epoch = Epoch::from_gregorian_utc_at_midnight(2025, 1, 1);
    for sol in &solutions {
        // Conservation across the transfer: both endpoint states must
        // describe the same orbit (same energy and angular momentum).
        let dep = sol.departure_state(&problem, epoch);
        let arr = sol.arrival_state(&problem, epoch);
        let energy_dep = dep.velocity.norm_squared() / 2.0 - 1.0 / dep.position.norm();
        let energy_arr = arr.velocity.norm_squared() / 2.0 - 1.0 / arr.position.norm();
        assert!(
            (energy_dep - energy_arr).abs() < 1e-9,
            "rev {}: energy mismatch {:e}",
            sol.revolutions,
            (energy_dep - energy_arr).abs()
        );
        let h_dep = dep.position.cross(&dep.velocity).norm();
        let h_arr = arr.position.cross(&arr.velocity).norm();
        assert!((h_dep - h_arr).abs() < 1e-9);
        // Multi-rev transfers must be closed (elliptic).
        if sol.revolutions > 0 {
            assert!(energy_dep < 0.0, "rev {} not elliptic", sol.revolutions);
        }
    }
}
