//! End-to-end integration tests for the qform-core solver.
//!
//! Small LP, SOCP and SDP instances with known optima, the two
//! infeasibility certificates, and a seeded least-squares distance program
//! mixing 100 second-order cones with a PSD block.

use nalgebra::{DMatrix, DVector};
use qform_core::linalg::sparse;
use qform_core::{
    solve, svec_index, svec_to_mat, ConeSpec, ProblemData, SolveStatus, SolverError, SolverSettings,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

fn settings() -> SolverSettings {
    SolverSettings {
        max_iter: 100,
        ..Default::default()
    }
}

#[test]
fn test_simple_lp() {
    // min -x1 - x2
    // s.t. x1 + x2 <= 1
    //      x1, x2 >= 0
    let prob = ProblemData {
        q: vec![-1.0, -1.0],
        A: sparse::from_triplets(
            3,
            2,
            vec![
                (0, 0, 1.0),
                (0, 1, 1.0),
                (1, 0, -1.0),
                (2, 1, -1.0),
            ],
        ),
        b: vec![1.0, 0.0, 0.0],
        cones: vec![ConeSpec::NonNeg { dim: 3 }],
    };

    let result = solve(&prob, &settings()).expect("solve failed");
    assert_eq!(result.status, SolveStatus::Optimal);
    assert!((result.obj_val + 1.0).abs() < 1e-6, "obj = {}", result.obj_val);
    assert!((result.x[0] + result.x[1] - 1.0).abs() < 1e-6);
    assert!(result.x.iter().all(|&v| v > -1e-7));
}

#[test]
fn test_socp_unit_disk() {
    // min -x1 - x2  s.t.  ||(x1, x2)|| <= 1
    // s = (1, x1, x2) ∈ SOC(3)
    let prob = ProblemData {
        q: vec![-1.0, -1.0],
        A: sparse::from_triplets(3, 2, vec![(1, 0, -1.0), (2, 1, -1.0)]),
        b: vec![1.0, 0.0, 0.0],
        cones: vec![ConeSpec::Soc { dim: 3 }],
    };

    let result = solve(&prob, &settings()).expect("solve failed");
    assert_eq!(result.status, SolveStatus::Optimal);
    let expected = -std::f64::consts::SQRT_2;
    assert!((result.obj_val - expected).abs() < 1e-6, "obj = {}", result.obj_val);
    let half = std::f64::consts::FRAC_1_SQRT_2;
    assert!((result.x[0] - half).abs() < 1e-5);
    assert!((result.x[1] - half).abs() < 1e-5);
}

#[test]
fn test_socp_with_bounds() {
    // min t  s.t.  ||(x - 3, y - 4)|| <= t, x, y <= 0
    // nearest point of the third quadrant to (3, 4) is the origin, t = 5
    let prob = ProblemData {
        q: vec![1.0, 0.0, 0.0],
        A: sparse::from_triplets(
            5,
            3,
            vec![(0, 1, 1.0), (1, 2, 1.0), (2, 0, -1.0), (3, 1, -1.0), (4, 2, -1.0)],
        ),
        b: vec![0.0, 0.0, 0.0, -3.0, -4.0],
        cones: vec![ConeSpec::NonNeg { dim: 2 }, ConeSpec::Soc { dim: 3 }],
    };

    let result = solve(&prob, &settings()).expect("solve failed");
    assert_eq!(result.status, SolveStatus::Optimal);
    assert!((result.obj_val - 5.0).abs() < 1e-6, "obj = {}", result.obj_val);
}

#[test]
fn test_sdp_schur_complement() {
    // min x  s.t.  [[x, 1], [1, 1]] ⪰ 0   (x >= 1)
    let sqrt2 = std::f64::consts::SQRT_2;
    let prob = ProblemData {
        q: vec![1.0],
        A: sparse::from_triplets(3, 1, vec![(0, 0, -1.0)]),
        b: vec![0.0, sqrt2, 1.0],
        cones: vec![ConeSpec::Psd { n: 2 }],
    };

    let result = solve(&prob, &settings()).expect("solve failed");
    assert_eq!(result.status, SolveStatus::Optimal);
    assert!((result.obj_val - 1.0).abs() < 1e-6, "obj = {}", result.obj_val);

    let slack = svec_to_mat(&result.s, 2);
    assert!((slack[(0, 1)] - 1.0).abs() < 1e-6);
    assert!(slack.symmetric_eigenvalues().min() > -1e-7);
}

#[test]
fn test_sdp_max_eigenvalue() {
    // min t  s.t.  t I - C ⪰ 0  with C = [[2, 1], [1, 2]]  ->  t = λmax(C) = 3
    let sqrt2 = std::f64::consts::SQRT_2;
    let prob = ProblemData {
        q: vec![1.0],
        A: sparse::from_triplets(3, 1, vec![(0, 0, -1.0), (2, 0, -1.0)]),
        b: vec![-2.0, -sqrt2, -2.0],
        cones: vec![ConeSpec::Psd { n: 2 }],
    };

    let result = solve(&prob, &settings()).expect("solve failed");
    assert_eq!(result.status, SolveStatus::Optimal);
    assert!((result.obj_val - 3.0).abs() < 1e-6, "obj = {}", result.obj_val);
}

#[test]
fn test_primal_infeasible() {
    // x >= 1 and x <= 0
    let prob = ProblemData {
        q: vec![1.0],
        A: sparse::from_triplets(2, 1, vec![(0, 0, -1.0), (1, 0, 1.0)]),
        b: vec![-1.0, 0.0],
        cones: vec![ConeSpec::NonNeg { dim: 2 }],
    };

    let result = solve(&prob, &settings()).expect("solve failed");
    assert_eq!(result.status, SolveStatus::PrimalInfeasible);
    assert!(!result.status.is_solved());
}

#[test]
fn test_dual_infeasible() {
    // min -x  s.t.  x >= 0
    let prob = ProblemData {
        q: vec![-1.0],
        A: sparse::from_triplets(1, 1, vec![(0, 0, -1.0)]),
        b: vec![0.0],
        cones: vec![ConeSpec::NonNeg { dim: 1 }],
    };

    let result = solve(&prob, &settings()).expect("solve failed");
    assert_eq!(result.status, SolveStatus::DualInfeasible);
}

#[test]
fn test_invalid_problem_is_rejected() {
    // cone dimensions do not cover the rows of A
    let prob = ProblemData {
        q: vec![1.0],
        A: sparse::from_triplets(2, 1, vec![(0, 0, 1.0)]),
        b: vec![0.0, 0.0],
        cones: vec![ConeSpec::NonNeg { dim: 1 }],
    };

    match solve(&prob, &settings()) {
        Err(SolverError::InvalidProblem(msg)) => assert!(!msg.is_empty()),
        other => panic!("expected InvalidProblem, got {:?}", other.map(|r| r.status)),
    }
}

/// Coefficients of z^T M z in svec(M).
fn lift(z: &[f64]) -> Vec<(usize, f64)> {
    let mut g = Vec::new();
    for j in 0..z.len() {
        for i in 0..=j {
            let v = if i == j { z[i] * z[i] } else { std::f64::consts::SQRT_2 * z[i] * z[j] };
            g.push((svec_index(i, j), v));
        }
    }
    g
}

/// Least-squares fit of a PSD matrix M to noisy distances d_i ≈ sqrt(z_i^T P z_i).
///
/// Variables x = [svec(M), t, e]; minimize Σ e_i with e_i ≥ (d_i - t_i)²
/// linearized through t_i² ≤ z_i^T M z_i.
fn least_squares_distance_program(n: usize, samples: usize, noise: f64, seed: u64) -> ProblemData {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut normal = || -> f64 { StandardNormal.sample(&mut rng) };

    let b_mat = DMatrix::from_fn(n, n, |_, _| normal());
    let p = &b_mat * b_mat.transpose() + DMatrix::identity(n, n);

    let k = n * (n + 1) / 2;
    let t_col = k;
    let e_col = k + samples;
    let num_vars = k + 2 * samples;
    let num_rows = 5 * samples + k;

    let mut q = vec![0.0; num_vars];
    q[e_col..].fill(1.0);
    let mut b = vec![0.0; num_rows];
    let mut triplets = Vec::new();

    for i in 0..samples {
        let z = DVector::from_fn(n, |_, _| normal()) - DVector::from_fn(n, |_, _| normal());
        let d = ((z.transpose() * &p * &z)[(0, 0)].sqrt() + noise * normal()).max(0.0);
        let g = lift(z.as_slice());

        // e_i ≥ d_i² - 2 d_i t_i + g_i·svec(M)
        for &(col, v) in &g {
            triplets.push((i, col, v));
        }
        triplets.push((i, t_col + i, -2.0 * d));
        triplets.push((i, e_col + i, -1.0));
        b[i] = -d * d;

        // e_i ≥ 0
        triplets.push((samples + i, e_col + i, -1.0));

        // (l_i + 1, l_i - 1, 2 t_i) ∈ SOC
        let row = 2 * samples + 3 * i;
        for &(col, v) in &g {
            triplets.push((row, col, -v));
            triplets.push((row + 1, col, -v));
        }
        triplets.push((row + 2, t_col + i, -2.0));
        b[row] = 1.0;
        b[row + 1] = -1.0;
    }

    for j in 0..k {
        triplets.push((5 * samples + j, j, -1.0));
    }

    let mut cones = vec![ConeSpec::NonNeg { dim: 2 * samples }];
    cones.extend((0..samples).map(|_| ConeSpec::Soc { dim: 3 }));
    cones.push(ConeSpec::Psd { n });

    ProblemData {
        q,
        A: sparse::from_triplets(num_rows, num_vars, triplets),
        b,
        cones,
    }
}

#[test]
fn test_least_squares_distance_program() {
    let prob = least_squares_distance_program(5, 100, 1.0, 1);
    assert_eq!(prob.num_vars(), 215);
    assert_eq!(prob.cones.iter().filter(|c| matches!(c, ConeSpec::Soc { .. })).count(), 100);

    let result = solve(&prob, &settings()).expect("solve failed");
    assert_eq!(result.status, SolveStatus::Optimal, "info = {:?}", result.info);
    assert!(result.obj_val > -1e-6, "obj = {}", result.obj_val);
    // σ = 1 noise puts the mean squared residual near 1
    assert!(result.obj_val / 100.0 < 2.0, "obj = {}", result.obj_val);

    let m = svec_to_mat(&result.x[..15], 5);
    let min_eig = m.symmetric_eigenvalues().min();
    assert!(min_eig > -1e-6, "min eigenvalue {}", min_eig);
}
