use std::path::PathBuf;

use clap::Parser;
use qform_core::SolverSettings;
use qform_fit::{DataConfig, ExperimentConfig, FitSettings};

#[derive(Parser, Debug)]
#[command(
    name = "qform-bench",
    about = "Fit a quadratic pseudo-metric to noisy distances and report held-out MSE"
)]
pub struct Args {
    /// Point dimension n
    #[arg(long, default_value_t = 5)]
    pub dim: usize,

    /// Number of training samples
    #[arg(long, default_value_t = 100)]
    pub train: usize,

    /// Number of held-out samples
    #[arg(long, default_value_t = 10)]
    pub test: usize,

    /// Standard deviation of the distance noise
    #[arg(long, default_value_t = 1.0)]
    pub noise: f64,

    /// RNG seed
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Interior point iteration limit (defaults to QFORM_MAX_ITER or 100)
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Solver wall-clock limit in milliseconds
    #[arg(long)]
    pub time_limit_ms: Option<u64>,

    /// Accept reduced-accuracy solutions
    #[arg(long)]
    pub reduced_ok: bool,

    /// Write the experiment report as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Log every solver iteration
    #[arg(long, short)]
    pub verbose: bool,
}

impl Args {
    pub fn experiment_config(&self) -> ExperimentConfig {
        let mut solver = SolverSettings::default();
        if let Some(max_iter) = self.max_iter {
            solver.max_iter = max_iter;
        }
        solver.time_limit_ms = self.time_limit_ms;
        solver.verbose |= self.verbose;

        ExperimentConfig {
            data: DataConfig {
                dim: self.dim,
                train_samples: self.train,
                test_samples: self.test,
                noise_std: self.noise,
            },
            seed: self.seed,
            fit: FitSettings {
                solver,
                accept_reduced_accuracy: self.reduced_ok,
                ..Default::default()
            },
        }
    }
}
