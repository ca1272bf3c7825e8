//! Termination criteria for the IPM solver.
//!
//! Checks for:
//! - Optimality: primal/dual feasibility + small duality gap, or μ below the
//!   gap tolerance with residuals within 10× the feasibility tolerance
//! - Primal infeasibility: b^T z < 0 with A^T z ≈ 0
//! - Dual infeasibility: q^T x < 0 with A x + s ≈ 0
//!
//! Iteration and time limits are handled by the main loop.

use super::hsde::{compute_mu, HsdeResiduals, HsdeState};
use crate::linalg::sparse::{spmv, spmv_transpose};
use crate::linalg::{dot, norm2};
use crate::problem::{ProblemData, SolveStatus, SolverSettings};

fn norm_inf(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

/// Convergence measures of the unhomogenized iterate (x, s, z) / τ.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvergenceMetrics {
    /// ||A x + s - b τ||∞ / (τ max(1, ||b||∞))
    pub primal_res: f64,

    /// ||A^T z + q τ||∞ / (τ max(1, ||q||∞))
    pub dual_res: f64,

    /// q^T x / τ
    pub primal_obj: f64,

    /// -b^T z / τ
    pub dual_obj: f64,

    /// |primal_obj - dual_obj|
    pub gap_abs: f64,

    /// gap_abs / max(1, |primal_obj|, |dual_obj|)
    pub gap_rel: f64,

    /// (s^T z + τ κ) / (ν + 1)
    pub mu: f64,
}

impl ConvergenceMetrics {
    /// Evaluate the metrics from the current residuals.
    pub fn compute(prob: &ProblemData, state: &HsdeState, res: &HsdeResiduals, barrier_degree: usize) -> Self {
        let tau = state.tau;
        let b_scale = norm_inf(&prob.b).max(1.0);
        let q_scale = norm_inf(&prob.q).max(1.0);

        let primal_obj = dot(&prob.q, &state.x) / tau;
        let dual_obj = -dot(&prob.b, &state.z) / tau;
        let gap_abs = (primal_obj - dual_obj).abs();
        let gap_rel = gap_abs / primal_obj.abs().max(dual_obj.abs()).max(1.0);

        Self {
            primal_res: norm_inf(&res.r_z) / (tau * b_scale),
            dual_res: norm_inf(&res.r_x) / (tau * q_scale),
            primal_obj,
            dual_obj,
            gap_abs,
            gap_rel,
            mu: compute_mu(state, barrier_degree),
        }
    }

    /// Feasible with a small gap, or μ has collapsed while the residuals
    /// sit within ten times the feasibility tolerance.
    fn meets(&self, tol_feas: f64, tol_gap: f64, tol_gap_rel: f64) -> bool {
        let feasible = self.primal_res <= tol_feas && self.dual_res <= tol_feas;
        if feasible && (self.gap_abs <= tol_gap || self.gap_rel <= tol_gap_rel) {
            return true;
        }
        self.mu < tol_gap && self.primal_res <= 10.0 * tol_feas && self.dual_res <= 10.0 * tol_feas
    }

    /// Full-accuracy optimality.
    pub fn is_optimal(&self, settings: &SolverSettings) -> bool {
        self.meets(settings.tol_feas, settings.tol_gap, settings.tol_gap_rel)
    }

    /// Reduced-accuracy optimality.
    pub fn is_almost_optimal(&self, settings: &SolverSettings) -> bool {
        self.meets(settings.reduced_tol_feas, settings.reduced_tol_gap, settings.reduced_tol_gap)
    }

    /// Distance from optimality used to rank iterates: the worst of the two
    /// residuals and the better of the two gaps.
    pub fn score(&self) -> f64 {
        self.primal_res.max(self.dual_res).max(self.gap_abs.min(self.gap_rel))
    }
}

/// Check termination conditions.
///
/// Returns `Some(status)` if the solver should stop, `None` otherwise.
pub fn check_termination(
    prob: &ProblemData,
    state: &HsdeState,
    metrics: &ConvergenceMetrics,
    settings: &SolverSettings,
) -> Option<SolveStatus> {
    if !metrics.primal_res.is_finite() || !metrics.dual_res.is_finite() || !metrics.gap_abs.is_finite() {
        return Some(SolveStatus::NumericalError);
    }

    if metrics.is_optimal(settings) {
        return Some(SolveStatus::Optimal);
    }

    // Certificates only make sense once τ has collapsed relative to κ.
    if state.tau >= state.kappa {
        return None;
    }

    // Primal infeasibility: y = z / (-b^T z) satisfies A^T y ≈ 0, b^T y = -1
    let btz = dot(&prob.b, &state.z);
    if btz < 0.0 {
        let mut atz = vec![0.0; prob.num_vars()];
        spmv_transpose(&prob.A, &state.z, &mut atz, 1.0, 0.0);
        if norm2(&atz) <= settings.tol_infeas * (-btz) {
            return Some(SolveStatus::PrimalInfeasible);
        }
    }

    // Dual infeasibility: d = x / (-q^T x) satisfies A d + s ≈ 0, q^T d = -1
    let qtx = dot(&prob.q, &state.x);
    if qtx < 0.0 {
        let mut ax_s = state.s.clone();
        spmv(&prob.A, &state.x, &mut ax_s, 1.0, 1.0);
        if norm2(&ax_s) <= settings.tol_infeas * (-qtx) {
            return Some(SolveStatus::DualInfeasible);
        }
    }

    None
}
