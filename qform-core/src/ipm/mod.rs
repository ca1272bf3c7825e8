//! Interior point method solver.
//!
//! HSDE formulation, predictor-corrector algorithm, and termination criteria.

pub mod hsde;
pub mod predcorr;
pub mod termination;

use crate::cones::ConeProduct;
use crate::linalg::dot;
use crate::linalg::normal_eqns::NormalEqnsSolver;
use crate::problem::{ProblemData, SolveInfo, SolveResult, SolveStatus, SolverError, SolverSettings};
use hsde::{compute_mu, compute_residuals, HsdeResiduals, HsdeState};
use predcorr::predictor_corrector_step;
use std::time::Instant;
use termination::{check_termination, ConvergenceMetrics};

/// Steps shorter than this count as a stall.
const MIN_STEP: f64 = 1e-10;

/// Main IPM solver.
///
/// Solves a conic program with the HSDE interior point method and
/// Mehrotra predictor-corrector steps. Numerical trouble is reported through
/// the returned status; only malformed input is an `Err`.
pub fn solve_ipm(prob: &ProblemData, settings: &SolverSettings) -> Result<SolveResult, SolverError> {
    prob.validate().map_err(SolverError::InvalidProblem)?;
    settings.validate().map_err(SolverError::InvalidSettings)?;

    let start = Instant::now();
    let n = prob.num_vars();
    let m = prob.num_constraints();
    let cones = ConeProduct::new(&prob.cones);
    let nu = cones.barrier_degree();
    let level = if settings.verbose { log::Level::Info } else { log::Level::Debug };

    let mut kkt = NormalEqnsSolver::new(
        &prob.A,
        &cones.identity_scaling(),
        settings.static_reg,
        settings.kkt_refine_iters,
    );

    let mut state = HsdeState::new(n, m);
    let mut residuals = HsdeResiduals::new(n, m);
    let mut metrics = ConvergenceMetrics::default();

    if let Err(e) = state.initialize(prob, &cones, &mut kkt) {
        log::warn!("initialization failed: {}", e);
        return Ok(finish(prob, &state, SolveStatus::NumericalError, &metrics, 0, 0.0, &kkt, start));
    }

    log::log!(level, "qform IPM: n = {}, m = {}, cones = {}, barrier degree = {}", n, m, prob.cones.len(), nu);
    log::log!(
        level,
        "{:>4} {:>13} {:>13} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>6}",
        "iter", "pcost", "dcost", "pres", "dres", "gap", "mu", "tau", "kappa", "step"
    );

    let mut mu = compute_mu(&state, nu);
    let mut iter = 0usize;
    let mut last_alpha = 0.0;
    let mut stalled = false;
    let mut best: Option<BestIterate> = None;

    let status = loop {
        compute_residuals(prob, &state, &mut residuals);
        metrics = ConvergenceMetrics::compute(prob, &state, &residuals, nu);

        log::log!(
            level,
            "{:>4} {:>+13.6e} {:>+13.6e} {:>9.2e} {:>9.2e} {:>9.2e} {:>9.2e} {:>9.2e} {:>9.2e} {:>6.3}",
            iter,
            metrics.primal_obj,
            metrics.dual_obj,
            metrics.primal_res,
            metrics.dual_res,
            metrics.gap_abs,
            mu,
            state.tau,
            state.kappa,
            last_alpha
        );

        if let Some(status) = check_termination(prob, &state, &metrics, settings) {
            break status;
        }

        if metrics.is_almost_optimal(settings)
            && best.as_ref().map_or(true, |b| metrics.score() < b.metrics.score())
        {
            best = Some(BestIterate { state: state.clone(), metrics, mu, iter });
        }

        if stalled {
            log::warn!("step size below {:.0e}, stopping at iteration {}", MIN_STEP, iter);
            break SolveStatus::NumericalError;
        }
        if iter >= settings.max_iter {
            break SolveStatus::MaxIters;
        }
        if let Some(limit) = settings.time_limit_ms {
            if start.elapsed().as_millis() as u64 >= limit {
                break SolveStatus::TimeLimit;
            }
        }

        let scaling = match cones.nt_scaling(&state.s, &state.z) {
            Ok(scaling) => scaling,
            Err(e) => {
                log::warn!("NT scaling failed at iteration {}: {}", iter, e);
                break SolveStatus::NumericalError;
            }
        };
        if let Err(e) = kkt.factor(&scaling) {
            log::warn!("KKT factorization failed at iteration {}: {}", iter, e);
            break SolveStatus::NumericalError;
        }

        match predictor_corrector_step(
            &kkt,
            prob,
            &mut state,
            &residuals,
            &cones,
            &scaling,
            mu,
            settings.step_fraction,
        ) {
            Ok(step) => {
                mu = step.mu_new;
                last_alpha = step.alpha;
                stalled = step.alpha < MIN_STEP;
            }
            Err(e) => {
                log::warn!("IPM step failed at iteration {}: {}", iter, e);
                break SolveStatus::NumericalError;
            }
        }
        iter += 1;
    };

    // Stalls and the iteration cap fall back to the best reduced-accuracy
    // iterate seen, which is often earlier than the last one.
    if matches!(status, SolveStatus::NumericalError | SolveStatus::MaxIters) {
        if let Some(b) = best {
            log::warn!(
                "{} after {} iterations, returning reduced-accuracy iterate {} (pres {:.2e}, dres {:.2e}, gap {:.2e})",
                status,
                iter,
                b.iter,
                b.metrics.primal_res,
                b.metrics.dual_res,
                b.metrics.gap_abs
            );
            return Ok(finish(prob, &b.state, SolveStatus::AlmostOptimal, &b.metrics, iter, b.mu, &kkt, start));
        }
    }

    log::log!(level, "status: {} after {} iterations", status, iter);
    Ok(finish(prob, &state, status, &metrics, iter, mu, &kkt, start))
}

/// Iterate kept for the reduced-accuracy fallback.
struct BestIterate {
    state: HsdeState,
    metrics: ConvergenceMetrics,
    mu: f64,
    iter: usize,
}

/// Convert the homogeneous iterate into a `SolveResult`.
///
/// Solved and inconclusive runs report (x, s, z)/τ. Infeasible runs report
/// the normalized certificate: z / (-b^T z) or (x, s) / (-q^T x).
fn finish(
    prob: &ProblemData,
    state: &HsdeState,
    status: SolveStatus,
    metrics: &ConvergenceMetrics,
    iters: usize,
    mu: f64,
    kkt: &NormalEqnsSolver,
    start: Instant,
) -> SolveResult {
    let scale_all = |v: &[f64], by: f64| v.iter().map(|x| x / by).collect::<Vec<f64>>();
    let (x, s, z, obj_val) = match status {
        SolveStatus::PrimalInfeasible => {
            let by = -dot(&prob.b, &state.z);
            (vec![0.0; state.x.len()], vec![0.0; state.s.len()], scale_all(&state.z, by), f64::INFINITY)
        }
        SolveStatus::DualInfeasible => {
            let by = -dot(&prob.q, &state.x);
            (scale_all(&state.x, by), scale_all(&state.s, by), vec![0.0; state.z.len()], f64::NEG_INFINITY)
        }
        _ => {
            let x = scale_all(&state.x, state.tau);
            let obj = dot(&prob.q, &x);
            (x, scale_all(&state.s, state.tau), scale_all(&state.z, state.tau), obj)
        }
    };

    SolveResult {
        status,
        x,
        s,
        z,
        obj_val,
        info: SolveInfo {
            iters,
            solve_time_ms: start.elapsed().as_millis() as u64,
            primal_res: metrics.primal_res,
            dual_res: metrics.dual_res,
            gap: metrics.gap_abs,
            mu,
            reg_static: kkt.regularization(),
            reg_dynamic_bumps: kkt.dynamic_bumps(),
        },
    }
}
