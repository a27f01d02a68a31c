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

/// The coefficient set of an embedded explicit Runge-Kutta scheme.
///
/// `a` stores the strictly lower triangle row by row (row i holds i
/// entries). `e` holds the error-estimate weights over the stages plus the
/// first-same-as-last evaluation. `p` is the dense-output interpolation
/// matrix, `(stages + 1) x dense_order`, row-major.
#[derive(Debug)]
pub struct ButcherTableau {
    pub c: &'static [f64],
    pub a: &'static [f64],
    pub b: &'static [f64],
    pub e: &'static [f64],
    pub p: &'static [f64],
    /// Order of the error estimator (q).
    pub error_order: u32,
    /// Order of the step actually taken (p).
    pub step_order: u32,
    pub stages: usize,
    pub dense_order: usize,
}

/// Bogacki-Shampine 2(3): 3 stages, dense output of order 3.
pub static RK23: ButcherTableau = ButcherTableau {
    c: &[0.0, 1.0 / 2.0, 3.0 / 4.0],
    a: &[
        1.0 / 2.0, //
        0.0,
        3.0 / 4.0,
    ],
    b: &[2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0],
    e: &[5.0 / 72.0, -1.0 / 12.0, -1.0 / 9.0, 1.0 / 8.0],
    p: &[
        1.0,
        -4.0 / 3.0,
        5.0 / 9.0, //
        0.0,
        1.0,
        -2.0 / 3.0, //
        0.0,
        4.0 / 3.0,
        -8.0 / 9.0, //
        0.0,
        -1.0,
        1.0,
    ],
    error_order: 2,
    step_order: 3,
    stages: 3,
    dense_order: 3,
};

/// Dormand-Prince 4(5): 6 stages, dense output of order 4. The default
/// engine.
pub static RK45: ButcherTableau = ButcherTableau {
    c: &[0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0],
    a: &[
        1.0 / 5.0, //
        3.0 / 40.0,
        9.0 / 40.0, //
        44.0 / 45.0,
        -56.0 / 15.0,
        32.0 / 9.0, //
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0, //
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ],
    b: &[
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
    e: &[
        71.0 / 57600.0,
        0.0,
        -71.0 / 16695.0,
        71.0 / 1920.0,
        -17253.0 / 339200.0,
        22.0 / 525.0,
        -1.0 / 40.0,
    ],
    p: &[
        1.0,
        -8048581381.0 / 2820520608.0,
        8663915743.0 / 2820520608.0,
        -12715105075.0 / 11282082432.0, //
        0.0,
        0.0,
        0.0,
        0.0, //
        0.0,
        131558114200.0 / 32700410799.0,
        -68118460800.0 / 10900136933.0,
        87487479700.0 / 32700410799.0, //
        0.0,
        -1754552775.0 / 470086768.0,
        14199869525.0 / 1410260304.0,
        -10690763975.0 / 1880347072.0, //
        0.0,
        127303824393.0 / 49829197408.0,
        -318862633887.0 / 49829197408.0,
        701980252875.0 / 199316789632.0, //
        0.0,
        -282668133.0 / 205662961.0,
        2019193451.0 / 616988883.0,
        -1453857185.0 / 822651844.0, //
        0.0,
        40617522.0 / 29380423.0,
        -110615467.0 / 29380423.0,
        69997945.0 / 29380423.0,
    ],
    error_order: 4,
    step_order: 5,
    stages: 6,
    dense_order: 4,
};

#[cfg(test)]
mod ut_tableaux {
    use super::*;

    /// Row sums of A must reproduce the stage abscissae.
    fn check_consistency(tableau: &ButcherTableau) {
        let mut idx = 0;
        for i in 1..tableau.stages {
            let row_sum: f64 = tableau.a[idx..idx + i].iter().sum();
            assert!(
                (row_sum - tableau.c[i]).abs() < 1e-14,
                "stage {}: row sum {} vs c {}",
                i,
                row_sum,
                tableau.c[i]
            );
            idx += i;
        }
        let b_sum: f64 = tableau.b.iter().sum();
        assert!((b_sum - 1.0).abs() < 1e-14);
        // The embedded error weights cancel on exact solutions.
        let e_sum: f64 = tableau.e.iter().sum();
        assert!(e_sum.abs() < 1e-14);
    }

    /// Dense output at the step end must agree with the step itself: the
    /// row sums of P are the b weights (and zero for the trailing stage).
    fn check_dense_rows(tableau: &ButcherTableau) {
        for i in 0..=tableau.stages {
            let row_sum: f64 = tableau.p
                [i * tableau.dense_order..(i + 1) * tableau.dense_order]
                .iter()
                .sum();
            let expected = if i < tableau.stages { tableau.b[i] } else { 0.0 };
            assert!(
                (row_sum - expected).abs() < 1e-12,
                "P row {}: {} vs {}",
                i,
                row_sum,
                expected
            );
        }
    }

    #[test]
    fn rk23_is_consistent() {
        check_dense_rows(&RK23);
        check_consistency(&RK23);
        assert_eq!(RK23.a.len(), RK23.stages * (RK23.stages - 1) / 2);
        assert_eq!(RK23.p.len(), (RK23.stages + 1) * RK23.dense_order);
    }

    #[test]
    fn rk45_is_consistent() {
        check_consistency(&RK45);
        check_dense_rows(&RK45);
        assert_eq!(RK45.a.len(), RK45.stages * (RK45.stages - 1) / 2);
        assert_eq!(RK45.p.len(), (RK45.stages + 1) * RK45.dense_order);
    }
}
