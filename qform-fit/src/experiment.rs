//! One-shot experiment: generate, formulate, solve, evaluate.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::backend::ConicSolver;
use crate::error::{FitError, FitResult};
use crate::evaluate::mean_squared_error;
use crate::fit::fit_metric;
use crate::generator::{generate_dataset, DataConfig};
use crate::settings::FitSettings;

/// Experiment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Dataset shape and noise.
    pub data: DataConfig,

    /// Seed for the `ChaCha8Rng` built by [`run_seeded`]. [`run_experiment`]
    /// takes the caller's RNG instead and only records this value.
    pub seed: u64,

    /// Fitting settings (not serialized).
    #[serde(skip)]
    pub fit: FitSettings,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            seed: 1,
            fit: FitSettings::default(),
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Configuration the run used.
    pub config: ExperimentConfig,

    /// Solver status as text.
    pub status: String,

    /// Interior point iterations.
    pub iterations: usize,

    /// Wall-clock solve time in milliseconds.
    pub solve_time_ms: u64,

    /// Program objective Σ e_i.
    pub objective: f64,

    /// MSE on the training samples.
    pub train_mse: f64,

    /// MSE on the held-out samples.
    pub test_mse: f64,

    /// ||M - P||_F / ||P||_F
    pub recovery_error: f64,

    /// Fitted matrix, row-major.
    pub fitted: Vec<Vec<f64>>,

    /// Ground-truth matrix, row-major.
    pub ground_truth: Vec<Vec<f64>>,
}

/// Run the pipeline with a `ChaCha8Rng` seeded from `config.seed`.
///
/// Equal configurations give equal datasets and fits.
pub fn run_seeded<S: ConicSolver + ?Sized>(config: &ExperimentConfig, solver: &S) -> FitResult<ExperimentReport> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    run_experiment(config, &mut rng, solver)
}

/// Run the full pipeline once with the caller's RNG and solver.
pub fn run_experiment<R, S>(
    config: &ExperimentConfig,
    rng: &mut R,
    solver: &S,
) -> FitResult<ExperimentReport>
where
    R: Rng + ?Sized,
    S: ConicSolver + ?Sized,
{
    if config.data.test_samples == 0 {
        return Err(FitError::EmptyEvaluationSet);
    }
    let dataset = generate_dataset(&config.data, rng)?;
    let fit = fit_metric(&dataset.train, solver, &config.fit)?;
    let test_mse = mean_squared_error(&fit.metric, &dataset.test)?;
    let recovery_error = fit.metric.relative_error(&dataset.ground_truth)?;
    log::info!(
        "held-out MSE {:.6} on {} samples, recovery error {:.3e}",
        test_mse,
        dataset.test.len(),
        recovery_error
    );

    Ok(ExperimentReport {
        config: config.clone(),
        status: fit.status.to_string(),
        iterations: fit.iterations,
        solve_time_ms: fit.solve_time_ms,
        objective: fit.objective,
        train_mse: fit.train_mse,
        test_mse,
        recovery_error,
        fitted: fit.metric.to_rows(),
        ground_truth: dataset.ground_truth.to_rows(),
    })
}
