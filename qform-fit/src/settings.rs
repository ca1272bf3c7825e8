//! Configuration settings for metric fitting.

use qform_core::SolverSettings;

use crate::error::{FitError, FitResult};

/// Metric fitting settings.
#[derive(Debug, Clone)]
pub struct FitSettings {
    /// Settings for the built-in interior point backend.
    pub solver: SolverSettings,

    /// Accept `AlmostOptimal` solver results.
    ///
    /// Off by default: only a full-accuracy optimum counts as a fit.
    pub accept_reduced_accuracy: bool,

    /// Eigenvalue tolerance for the fitted matrix, relative to its largest
    /// eigenvalue (floored at 1). Eigenvalues below `-psd_tolerance * scale`
    /// are an error; smaller negative round-off is projected away.
    pub psd_tolerance: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            solver: SolverSettings::default(),
            accept_reduced_accuracy: false,
            psd_tolerance: 1e-6,
        }
    }
}

impl FitSettings {
    /// Create settings with verbose solver output enabled.
    pub fn verbose() -> Self {
        let mut s = Self::default();
        s.solver.verbose = true;
        s
    }

    /// Set the solver time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.solver.time_limit_ms = Some((seconds * 1000.0) as u64);
        self
    }

    /// Set the interior point iteration limit.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.solver.max_iter = max_iter;
        self
    }

    /// Accept reduced-accuracy solutions.
    pub fn with_reduced_accuracy(mut self, accept: bool) -> Self {
        self.accept_reduced_accuracy = accept;
        self
    }

    /// Validate the fitting and solver settings.
    pub fn validate(&self) -> FitResult<()> {
        if !(self.psd_tolerance.is_finite() && self.psd_tolerance >= 0.0) {
            return Err(FitError::InvalidConfig(format!(
                "psd_tolerance must be nonnegative, got {}",
                self.psd_tolerance
            )));
        }
        self.solver.validate().map_err(FitError::InvalidConfig)
    }
}
