//! Error types for metric fitting.

use qform_core::{SolveStatus, SolverError};
use thiserror::Error;

/// Errors that can occur while generating data, fitting or evaluating a metric.
#[derive(Error, Debug)]
pub enum FitError {
    /// No training samples were supplied
    #[error("Training set is empty")]
    EmptyTrainingSet,

    /// No samples to evaluate against
    #[error("Evaluation set is empty")]
    EmptyEvaluationSet,

    /// Metric and points disagree on dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension required by the metric or sample set
        expected: usize,
        /// Dimension that was supplied
        actual: usize,
    },

    /// Sample failed validation
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    /// Matrix is not a valid PSD quadratic form
    #[error("Invalid metric: {0}")]
    InvalidMetric(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Solver stopped without a usable optimum
    #[error("Solver did not reach an optimal point: {status}")]
    Unsolved {
        /// Status reported by the solver
        status: SolveStatus,
    },

    /// Solver rejected the program
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}

/// Result type for fitting operations.
pub type FitResult<T> = Result<T, FitError>;
