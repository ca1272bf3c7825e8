//! Predictor-corrector steps for the HSDE interior point method.
//!
//! Each iteration solves the scaled Newton system twice with one
//! factorization:
//! 1. **Affine step**: σ = 0, pure Newton direction
//! 2. **Combined step**: centering σμ plus the Mehrotra second-order term
//!
//! With W the NT scaling and λ = W z, the linearized complementarity is
//! `λ ∘ (W⁻¹ ds + W dz) = rhs_c`, which the KKT solver sees as
//! `A dx - H dz = r_z-part - W (λ \ rhs_c)`.
//!
//! After the solve, ds is read off the linearized primal row
//! `A dx + ds - b dτ = -η r_z` rather than from the complementarity row, so
//! the primal residual contracts by (1 - α η) even when W is badly
//! conditioned.

use super::hsde::{compute_mu, HsdeResiduals, HsdeState};
use crate::cones::ConeProduct;
use crate::linalg::normal_eqns::{KktError, NormalEqnsSolver};
use crate::linalg::sparse::spmv;
use crate::linalg::{axpy, dot};
use crate::problem::ProblemData;
use crate::scaling::nt::NtScalingError;
use crate::scaling::{apply_blocks, apply_inv_blocks, ScalingBlock};
use thiserror::Error;

/// Failures inside one IPM iteration.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("KKT solve failed: {0}")]
    Kkt(#[from] KktError),

    #[error("NT scaling failed: {0}")]
    Scaling(#[from] NtScalingError),

    #[error("search direction is not finite")]
    NonFinite,
}

/// Predictor-corrector step result.
#[derive(Debug)]
pub struct StepResult {
    /// Step size taken
    pub alpha: f64,

    /// Step size of the affine predictor
    pub alpha_aff: f64,

    /// Centering parameter used
    pub sigma: f64,

    /// New barrier parameter after step
    pub mu_new: f64,
}

/// Search direction in HSDE space.
#[derive(Debug, Clone)]
pub struct Direction {
    pub dx: Vec<f64>,
    pub ds: Vec<f64>,
    pub dz: Vec<f64>,
    pub dtau: f64,
    pub dkappa: f64,
}

/// Quantities shared by the affine and combined solves.
struct NewtonSystem<'a> {
    prob: &'a ProblemData,
    state: &'a HsdeState,
    residuals: &'a HsdeResiduals,
    cones: &'a ConeProduct,
    scaling: &'a [ScalingBlock],
    kkt: &'a NormalEqnsSolver,
    lambda: Vec<f64>,
    /// Solution of K [x₂; z₂] = [-q; b]
    x2: Vec<f64>,
    z2: Vec<f64>,
    /// q·x₂ + b·z₂ - κ/τ, evaluated as -(||W z₂||² + κ/τ) so it stays negative
    tau_denom: f64,
}

impl NewtonSystem<'_> {
    /// Solve for the direction with feasibility weight η and right-hand
    /// sides rhs_c (cone complementarity) and rhs_tk (τκ complementarity).
    fn direction(&self, eta: f64, rhs_c: &[f64], rhs_tk: f64) -> Result<Direction, StepError> {
        let n = self.prob.num_vars();
        let m = self.prob.num_constraints();
        let state = self.state;

        // u = λ \ rhs_c,  W u enters the second block row
        let mut u = vec![0.0; m];
        self.cones.jordan_div(&self.lambda, rhs_c, &mut u);
        let mut wu = vec![0.0; m];
        apply_blocks(self.scaling, &u, &mut wu);

        let r1: Vec<f64> = self.residuals.r_x.iter().map(|r| -eta * r).collect();
        let r2: Vec<f64> = self
            .residuals
            .r_z
            .iter()
            .zip(&wu)
            .map(|(r, w)| -eta * r - w)
            .collect();

        let mut dx = vec![0.0; n];
        let mut dz = vec![0.0; m];
        self.kkt.solve(self.scaling, &r1, &r2, &mut dx, &mut dz)?;

        // τ from the third block row after eliminating κ
        let numer = -eta * self.residuals.r_tau
            - dot(&self.prob.q, &dx)
            - dot(&self.prob.b, &dz)
            - rhs_tk / state.tau;
        let dtau = numer / self.tau_denom;
        axpy(dtau, &self.x2, &mut dx);
        axpy(dtau, &self.z2, &mut dz);

        // ds = -η r_z - A dx + b dτ
        let mut ds: Vec<f64> = self
            .residuals
            .r_z
            .iter()
            .zip(&self.prob.b)
            .map(|(r, b)| -eta * r + b * dtau)
            .collect();
        spmv(&self.prob.A, &dx, &mut ds, -1.0, 1.0);

        let dkappa = (rhs_tk - state.kappa * dtau) / state.tau;

        let finite = dtau.is_finite()
            && dkappa.is_finite()
            && dx.iter().chain(&ds).chain(&dz).all(|v| v.is_finite());
        if !finite {
            return Err(StepError::NonFinite);
        }

        Ok(Direction { dx, ds, dz, dtau, dkappa })
    }
}

/// Take a predictor-corrector step.
///
/// The KKT solver must already be factored for `scaling`.
pub fn predictor_corrector_step(
    kkt: &NormalEqnsSolver,
    prob: &ProblemData,
    state: &mut HsdeState,
    residuals: &HsdeResiduals,
    cones: &ConeProduct,
    scaling: &[ScalingBlock],
    mu: f64,
    step_fraction: f64,
) -> Result<StepResult, StepError> {
    let n = prob.num_vars();
    let m = prob.num_constraints();
    let nu = cones.barrier_degree();

    let mut lambda = vec![0.0; m];
    apply_blocks(scaling, &state.z, &mut lambda);

    let neg_q: Vec<f64> = prob.q.iter().map(|v| -v).collect();
    let mut x2 = vec![0.0; n];
    let mut z2 = vec![0.0; m];
    kkt.solve(scaling, &neg_q, &prob.b, &mut x2, &mut z2)?;

    let mut wz2 = vec![0.0; m];
    apply_blocks(scaling, &z2, &mut wz2);
    let tau_denom = -(dot(&wz2, &wz2) + state.kappa / state.tau);

    let mut lambda_sq = vec![0.0; m];
    cones.jordan_product(&lambda, &lambda, &mut lambda_sq);

    let system = NewtonSystem {
        prob,
        state: &*state,
        residuals,
        cones,
        scaling,
        kkt,
        lambda,
        x2,
        z2,
        tau_denom,
    };

    // ======================================================================
    // Affine step
    // ======================================================================
    let rhs_c_aff: Vec<f64> = lambda_sq.iter().map(|v| -v).collect();
    let rhs_tk_aff = -state.tau * state.kappa;
    let aff = system.direction(1.0, &rhs_c_aff, rhs_tk_aff)?;
    let alpha_aff = max_step(state, &aff, cones).min(1.0);

    let mu_aff = {
        let s_z: f64 = (0..m)
            .map(|i| (state.s[i] + alpha_aff * aff.ds[i]) * (state.z[i] + alpha_aff * aff.dz[i]))
            .sum();
        let tk = (state.tau + alpha_aff * aff.dtau) * (state.kappa + alpha_aff * aff.dkappa);
        (s_z + tk) / (nu as f64 + 1.0)
    };
    let sigma = (mu_aff / mu).max(0.0).powi(3).min(1.0);

    // ======================================================================
    // Combined step
    // ======================================================================
    // Mehrotra term (W⁻¹ ds_aff) ∘ (W dz_aff)
    let mut ds_scaled = vec![0.0; m];
    let mut dz_scaled = vec![0.0; m];
    apply_inv_blocks(scaling, &aff.ds, &mut ds_scaled);
    apply_blocks(scaling, &aff.dz, &mut dz_scaled);
    let mut corr = vec![0.0; m];
    cones.jordan_product(&ds_scaled, &dz_scaled, &mut corr);

    let mut e = vec![0.0; m];
    cones.identity(&mut e);
    let rhs_c: Vec<f64> = (0..m)
        .map(|i| -lambda_sq[i] - corr[i] + sigma * mu * e[i])
        .collect();
    let rhs_tk = -state.tau * state.kappa - aff.dtau * aff.dkappa + sigma * mu;

    let dir = system.direction(1.0 - sigma, &rhs_c, rhs_tk)?;
    let alpha = (step_fraction * max_step(state, &dir, cones)).min(1.0);

    // ======================================================================
    // Update
    // ======================================================================
    axpy(alpha, &dir.dx, &mut state.x);
    axpy(alpha, &dir.ds, &mut state.s);
    axpy(alpha, &dir.dz, &mut state.z);
    state.tau += alpha * dir.dtau;
    state.kappa += alpha * dir.dkappa;

    Ok(StepResult {
        alpha,
        alpha_aff,
        sigma,
        mu_new: compute_mu(state, nu),
    })
}

/// Largest step keeping s, z in K and τ, κ nonnegative.
pub fn max_step(state: &HsdeState, dir: &Direction, cones: &ConeProduct) -> f64 {
    let mut alpha = cones
        .step_to_boundary(&state.s, &dir.ds)
        .min(cones.step_to_boundary(&state.z, &dir.dz));
    if dir.dtau < 0.0 {
        alpha = alpha.min(-state.tau / dir.dtau);
    }
    if dir.dkappa < 0.0 {
        alpha = alpha.min(-state.kappa / dir.dkappa);
    }
    alpha
}
