//! Quadratic pseudo-metric learning on top of the qform-core conic solver.
//!
//! Given noisy distances between pairs of points, this crate fits a PSD
//! matrix M such that sqrt((x - y)^T M (x - y)) approximates the observed
//! distances in mean squared error. The fit is a conic program with one
//! second-order cone per sample and a PSD cone on M.
//!
//! The pipeline is generate → formulate → solve → evaluate:
//!
//! ```no_run
//! use qform_fit::{run_experiment, ExperimentConfig, InteriorPointSolver};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let config = ExperimentConfig::default();
//! let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
//! let report = run_experiment(&config, &mut rng, &InteriorPointSolver::default())?;
//! println!("held-out MSE: {}", report.test_mse);
//! # Ok::<(), qform_fit::FitError>(())
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod evaluate;
pub mod experiment;
pub mod fit;
pub mod generator;
pub mod metric;
pub mod program;
pub mod sample;
pub mod settings;

pub use backend::{ConicSolution, ConicSolver, InteriorPointSolver};
pub use error::{FitError, FitResult};
pub use evaluate::{mean_squared_error, predicted_distances};
pub use experiment::{run_experiment, run_seeded, ExperimentConfig, ExperimentReport};
pub use fit::{fit_metric, MetricFit};
pub use generator::{generate_dataset, random_ground_truth, DataConfig, Dataset, SampleGenerator};
pub use metric::QuadraticMetric;
pub use program::{build_program, MetricProgram, VariableLayout};
pub use sample::{Sample, SampleSet};
pub use settings::FitSettings;
