//! Metric fitting driver: build the program, solve it, read back M.

use qform_core::SolveStatus;

use crate::backend::ConicSolver;
use crate::error::{FitError, FitResult};
use crate::evaluate::mean_squared_error;
use crate::metric::QuadraticMetric;
use crate::program::build_program;
use crate::sample::SampleSet;
use crate::settings::FitSettings;

/// A fitted metric with solver diagnostics.
#[derive(Debug, Clone)]
pub struct MetricFit {
    /// Fitted PSD matrix.
    pub metric: QuadraticMetric,

    /// Final solver status (`Optimal`, or `AlmostOptimal` when accepted).
    pub status: SolveStatus,

    /// Program objective Σ e_i.
    pub objective: f64,

    /// Mean squared error of the fitted metric on the training set.
    pub train_mse: f64,

    /// Interior point iterations.
    pub iterations: usize,

    /// Wall-clock solve time in milliseconds.
    pub solve_time_ms: u64,
}

/// Fit a PSD quadratic metric to training distances.
///
/// Fails with [`FitError::EmptyTrainingSet`] for N = 0 and with
/// [`FitError::Unsolved`] when the solver does not reach an accepted status.
pub fn fit_metric<S>(train: &SampleSet, solver: &S, settings: &FitSettings) -> FitResult<MetricFit>
where
    S: ConicSolver + ?Sized,
{
    settings.validate()?;
    let program = build_program(train)?;
    let layout = program.layout();
    log::info!(
        "fitting {}x{} metric to {} samples with {} ({} variables, {} constraints)",
        layout.dim,
        layout.dim,
        layout.samples,
        solver.name(),
        layout.num_vars(),
        layout.num_constraints()
    );

    let solution = solver.solve(program.problem())?;
    match solution.status {
        SolveStatus::Optimal => {}
        SolveStatus::AlmostOptimal if settings.accept_reduced_accuracy => {
            log::warn!("accepting reduced-accuracy solution");
        }
        status => return Err(FitError::Unsolved { status }),
    }

    let metric = program.extract_metric(&solution.x, settings.psd_tolerance)?;
    let train_mse = mean_squared_error(&metric, train)?;
    log::info!(
        "{} after {} iterations: objective {:.6e}, training MSE {:.6e}",
        solution.status,
        solution.iterations,
        solution.objective,
        train_mse
    );

    Ok(MetricFit {
        metric,
        status: solution.status,
        objective: solution.objective,
        train_mse,
        iterations: solution.iterations,
        solve_time_ms: solution.solve_time_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ConicSolution, InteriorPointSolver};
    use crate::generator::{random_ground_truth, SampleGenerator};
    use qform_core::ProblemData;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Backend that always reports a fixed status.
    struct FixedStatus(SolveStatus);

    impl ConicSolver for FixedStatus {
        fn name(&self) -> &str {
            "fixed"
        }

        fn solve(&self, problem: &ProblemData) -> FitResult<ConicSolution> {
            Ok(ConicSolution {
                status: self.0,
                x: vec![0.0; problem.num_vars()],
                objective: 0.0,
                iterations: 0,
                solve_time_ms: 0,
            })
        }
    }

    fn train_set(seed: u64, n: usize, count: usize, noise: f64) -> (QuadraticMetric, SampleSet) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let p = random_ground_truth(n, &mut rng).unwrap();
        let train = SampleGenerator::new(&p, noise)
            .unwrap()
            .generate(count, &mut rng)
            .unwrap();
        (p, train)
    }

    #[test]
    fn test_unsolved_status_is_surfaced() {
        let (_, train) = train_set(1, 2, 5, 0.1);
        for status in [
            SolveStatus::PrimalInfeasible,
            SolveStatus::DualInfeasible,
            SolveStatus::MaxIters,
            SolveStatus::NumericalError,
        ] {
            let err = fit_metric(&train, &FixedStatus(status), &FitSettings::default()).unwrap_err();
            assert!(matches!(err, FitError::Unsolved { status: s } if s == status));
        }
    }

    #[test]
    fn test_reduced_accuracy_gate() {
        let (_, train) = train_set(2, 2, 5, 0.1);
        let solver = FixedStatus(SolveStatus::AlmostOptimal);
        assert!(matches!(
            fit_metric(&train, &solver, &FitSettings::default()),
            Err(FitError::Unsolved { status: SolveStatus::AlmostOptimal })
        ));
        let settings = FitSettings::default().with_reduced_accuracy(true);
        let fit = fit_metric(&train, &solver, &settings).unwrap();
        assert_eq!(fit.status, SolveStatus::AlmostOptimal);
        assert_eq!(fit.metric.matrix().amax(), 0.0);
    }

    #[test]
    fn test_empty_training_set() {
        let err = fit_metric(&SampleSet::new(3), &InteriorPointSolver::default(), &FitSettings::default())
            .unwrap_err();
        assert!(matches!(err, FitError::EmptyTrainingSet));
    }

    #[test]
    fn test_small_noiseless_fit() {
        let (p, train) = train_set(4, 2, 12, 0.0);
        let settings = FitSettings::default().with_reduced_accuracy(true);
        let fit = fit_metric(&train, &InteriorPointSolver::default(), &settings).unwrap();
        assert!(fit.metric.relative_error(&p).unwrap() < 1e-2);
        assert!(fit.train_mse < 1e-4);
        assert!(fit.metric.eigenvalues().min() >= 0.0);
    }
}
