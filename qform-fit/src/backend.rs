//! Conic solver backend trait and the built-in interior point backend.

use qform_core::{solve, ProblemData, SolveStatus, SolverSettings};

use crate::error::FitResult;

/// Result of one conic solve.
#[derive(Debug, Clone)]
pub struct ConicSolution {
    /// Solve status.
    pub status: SolveStatus,

    /// Primal solution x.
    pub x: Vec<f64>,

    /// Objective value q^T x.
    pub objective: f64,

    /// Interior point iterations.
    pub iterations: usize,

    /// Wall-clock solve time in milliseconds.
    pub solve_time_ms: u64,
}

/// Anything that can solve `minimize q^T x s.t. A x + s = b, s ∈ K`.
///
/// Malformed problems are errors. A solver that runs but fails to reach an
/// optimum reports that through [`ConicSolution::status`].
pub trait ConicSolver {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Solve the problem.
    fn solve(&self, problem: &ProblemData) -> FitResult<ConicSolution>;
}

/// Backend using the qform-core interior point method.
#[derive(Debug, Clone, Default)]
pub struct InteriorPointSolver {
    settings: SolverSettings,
}

impl InteriorPointSolver {
    /// Create a backend with the given solver settings.
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    /// Solver settings in use.
    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }
}

impl ConicSolver for InteriorPointSolver {
    fn name(&self) -> &str {
        "qform-ipm"
    }

    fn solve(&self, problem: &ProblemData) -> FitResult<ConicSolution> {
        let result = solve(problem, &self.settings)?;
        log::debug!(
            "{}: {} in {} iterations ({} ms), pres {:.2e}, dres {:.2e}, gap {:.2e}",
            self.name(),
            result.status,
            result.info.iters,
            result.info.solve_time_ms,
            result.info.primal_res,
            result.info.dual_res,
            result.info.gap
        );
        Ok(ConicSolution {
            status: result.status,
            x: result.x,
            objective: result.obj_val,
            iterations: result.info.iters,
            solve_time_ms: result.info.solve_time_ms,
        })
    }
}
