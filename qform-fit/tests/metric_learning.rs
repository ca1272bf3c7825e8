//! End-to-end tests for metric learning.

use nalgebra::{DMatrix, DVector};
use qform_core::SolveStatus;
use qform_fit::{
    fit_metric, generate_dataset, mean_squared_error, predicted_distances, random_ground_truth,
    run_experiment, run_seeded, DataConfig, ExperimentConfig, FitError, FitSettings, InteriorPointSolver,
    QuadraticMetric, Sample, SampleGenerator, SampleSet,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn settings() -> FitSettings {
    FitSettings::default().with_reduced_accuracy(true)
}

#[test]
fn test_noiseless_recovery() {
    for seed in 1..=5 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let p = random_ground_truth(5, &mut rng).unwrap();
        let train = SampleGenerator::new(&p, 0.0)
            .unwrap()
            .generate(100, &mut rng)
            .unwrap();

        let fit = fit_metric(&train, &InteriorPointSolver::default(), &settings()).unwrap();
        assert_eq!(fit.status, SolveStatus::Optimal, "seed {}", seed);

        let err = fit.metric.relative_error(&p).unwrap();
        assert!(err < 1e-2, "seed {}: relative recovery error {}", seed, err);
        assert!(fit.train_mse < 1e-4, "seed {}: training MSE {}", seed, fit.train_mse);
    }
}

#[test]
fn test_fitted_matrix_is_symmetric_psd() {
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let config = DataConfig {
        dim: 3,
        train_samples: 40,
        test_samples: 5,
        noise_std: 0.5,
    };
    let data = generate_dataset(&config, &mut rng).unwrap();
    let fit = fit_metric(&data.train, &InteriorPointSolver::default(), &settings()).unwrap();

    let m = fit.metric.matrix();
    assert!((m - m.transpose()).amax() < 1e-12);
    assert!(fit.metric.eigenvalues().min() >= -1e-9);
    assert!(fit.train_mse >= 0.0);
    assert!((fit.objective / 40.0 - fit.train_mse).abs() < 1e-3 * fit.train_mse.max(1.0));
}

#[test]
fn test_reference_scenario() {
    let config = ExperimentConfig {
        fit: settings(),
        ..Default::default()
    };
    let report = run_seeded(&config, &InteriorPointSolver::default()).unwrap();

    assert_eq!(report.status, SolveStatus::Optimal.to_string());
    assert_eq!(report.fitted.len(), 5);
    assert!(report.fitted.iter().all(|row| row.len() == 5));
    // unit-variance noise: training MSE near the noise variance
    assert!(
        report.train_mse > 0.3 && report.train_mse < 1.5,
        "training MSE {}",
        report.train_mse
    );
    assert!(
        report.test_mse.is_finite() && report.test_mse > 0.02 && report.test_mse < 5.0,
        "held-out MSE {}",
        report.test_mse
    );
}

#[test]
fn test_reference_scenario_falls_back_to_best_iterate() {
    // Full accuracy is unreachable, so the run ends on a stall or the
    // iteration cap and must hand back its best reduced-accuracy iterate.
    let mut fit = settings();
    fit.solver.tol_feas = 1e-300;
    fit.solver.tol_gap = 1e-300;
    fit.solver.tol_gap_rel = 1e-300;
    fit.solver.max_iter = 60;
    let solver = InteriorPointSolver::new(fit.solver.clone());
    let config = ExperimentConfig { fit, ..Default::default() };
    assert_eq!(config.seed, 1);

    let report = run_seeded(&config, &solver).unwrap();
    assert_eq!(report.status, SolveStatus::AlmostOptimal.to_string());
    assert!(
        report.train_mse > 0.3 && report.train_mse < 1.5,
        "training MSE {}",
        report.train_mse
    );
    assert!(report.recovery_error.is_finite());
}

#[test]
fn test_predicted_distances_nonnegative() {
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    for n in 1..5 {
        // random PSD, possibly rank deficient
        let b: DMatrix<f64> = DMatrix::from_fn(n, n.saturating_sub(1).max(1), |_, _| rng.gen_range(-1.0..1.0));
        let metric = QuadraticMetric::project_psd(&b * b.transpose()).unwrap();
        let mut set = SampleSet::new(n);
        for _ in 0..10 {
            let a = DVector::from_fn(n, |_, _| rng.gen_range(-3.0..3.0));
            let c = DVector::from_fn(n, |_, _| rng.gen_range(-3.0..3.0));
            set.push(Sample::new(a, c, 1.0).unwrap()).unwrap();
        }
        let predicted = predicted_distances(&metric, &set).unwrap();
        assert!(predicted.iter().all(|d| d.is_finite() && *d >= 0.0));
        assert!(mean_squared_error(&metric, &set).unwrap() >= 0.0);
    }
}

#[test]
fn test_dimension_mismatch_is_an_error() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let metric = random_ground_truth(5, &mut rng).unwrap();
    let other = random_ground_truth(3, &mut rng).unwrap();
    let held_out = SampleGenerator::new(&other, 1.0)
        .unwrap()
        .generate(10, &mut rng)
        .unwrap();

    let err = mean_squared_error(&metric, &held_out).unwrap_err();
    assert!(matches!(err, FitError::DimensionMismatch { expected: 5, actual: 3 }));
}

#[test]
fn test_empty_training_set_is_an_error() {
    let err = fit_metric(&SampleSet::new(5), &InteriorPointSolver::default(), &settings()).unwrap_err();
    assert!(matches!(err, FitError::EmptyTrainingSet));

    let config = ExperimentConfig {
        data: DataConfig {
            train_samples: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let err = run_experiment(&config, &mut rng, &InteriorPointSolver::default()).unwrap_err();
    assert!(matches!(err, FitError::EmptyTrainingSet));
}
