//! Homogeneous Self-Dual Embedding (HSDE) formulation.
//!
//! The HSDE embeds the primal-dual pair into one self-dual system whose
//! solutions either give an optimal pair (τ > 0) or an infeasibility
//! certificate (κ > 0). The variables are (x, s, z, τ, κ):
//!
//!   A^T z + q τ = 0
//!   A x + s - b τ = 0
//!   -q^T x - b^T z - κ = 0
//!   s ∈ K, z ∈ K*, <s, z> = 0
//!   τ ≥ 0, κ ≥ 0, τ κ = 0

use crate::cones::ConeProduct;
use crate::linalg::normal_eqns::{KktError, NormalEqnsSolver};
use crate::linalg::sparse::{spmv, spmv_transpose};
use crate::linalg::{dot, norm2};
use crate::problem::ProblemData;

/// HSDE state variables.
#[derive(Debug, Clone)]
pub struct HsdeState {
    /// Primal variables (n-dimensional)
    pub x: Vec<f64>,

    /// Cone slack variables (m-dimensional)
    pub s: Vec<f64>,

    /// Dual variables (m-dimensional)
    pub z: Vec<f64>,

    /// Homogenization variable
    pub tau: f64,

    /// Dual homogenization variable
    pub kappa: f64,
}

impl HsdeState {
    /// Create a new HSDE state with given dimensions.
    pub fn new(n: usize, m: usize) -> Self {
        Self {
            x: vec![0.0; n],
            s: vec![0.0; m],
            z: vec![0.0; m],
            tau: 1.0,
            kappa: 1.0,
        }
    }

    /// Least-squares starting point.
    ///
    /// With W = I the KKT solver gives
    /// - x₀ = argmin ||A x - b||, s₀ = b - A x₀
    /// - z₀ = argmin ||z|| subject to A^T z + q = 0
    ///
    /// and s₀, z₀ are then shifted along the identity e until they are
    /// interior. τ = κ = 1.
    pub fn initialize(
        &mut self,
        prob: &ProblemData,
        cones: &ConeProduct,
        kkt: &mut NormalEqnsSolver,
    ) -> Result<(), KktError> {
        let n = prob.num_vars();
        let m = prob.num_constraints();
        let identity = cones.identity_scaling();
        kkt.factor(&identity)?;

        // [0 A^T; A -I][x; v] = [0; b]  =>  v = A x - b = -s
        let mut v = vec![0.0; m];
        kkt.solve(&identity, &vec![0.0; n], &prob.b, &mut self.x, &mut v)?;
        for i in 0..m {
            self.s[i] = -v[i];
        }

        // [0 A^T; A -I][y; z] = [-q; 0]  =>  A^T z = -q, z = A y
        let neg_q: Vec<f64> = prob.q.iter().map(|v| -v).collect();
        let mut y = vec![0.0; n];
        kkt.solve(&identity, &neg_q, &vec![0.0; m], &mut y, &mut self.z)?;

        shift_into_cone(cones, &mut self.s);
        shift_into_cone(cones, &mut self.z);

        self.tau = 1.0;
        self.kappa = 1.0;
        Ok(())
    }
}

/// v ← v + (1 + α) e when the smallest Jordan eigenvalue -α is not positive.
fn shift_into_cone(cones: &ConeProduct, v: &mut [f64]) {
    let alpha = -cones.min_eigenvalue(v);
    let norm = norm2(v);
    let shift = if alpha >= -1e-8 * norm.max(1.0) { 1.0 + alpha } else { 0.0 };
    if shift != 0.0 {
        let mut e = vec![0.0; v.len()];
        cones.identity(&mut e);
        for (vi, ei) in v.iter_mut().zip(&e) {
            *vi += shift * ei;
        }
    }
}

/// HSDE residuals.
#[derive(Debug, Clone)]
pub struct HsdeResiduals {
    /// Dual residual: r_x = A^T z + q τ (n-dimensional)
    pub r_x: Vec<f64>,

    /// Primal residual: r_z = A x + s - b τ (m-dimensional)
    pub r_z: Vec<f64>,

    /// Gap residual: r_τ = q^T x + b^T z + κ
    pub r_tau: f64,
}

impl HsdeResiduals {
    /// Create zero residuals.
    pub fn new(n: usize, m: usize) -> Self {
        Self {
            r_x: vec![0.0; n],
            r_z: vec![0.0; m],
            r_tau: 0.0,
        }
    }
}

/// Compute HSDE residuals for the current state.
pub fn compute_residuals(prob: &ProblemData, state: &HsdeState, res: &mut HsdeResiduals) {
    // r_x = A^T z + q τ
    for (ri, qi) in res.r_x.iter_mut().zip(&prob.q) {
        *ri = qi * state.tau;
    }
    spmv_transpose(&prob.A, &state.z, &mut res.r_x, 1.0, 1.0);

    // r_z = A x + s - b τ
    for i in 0..res.r_z.len() {
        res.r_z[i] = state.s[i] - prob.b[i] * state.tau;
    }
    spmv(&prob.A, &state.x, &mut res.r_z, 1.0, 1.0);

    res.r_tau = dot(&prob.q, &state.x) + dot(&prob.b, &state.z) + state.kappa;
}

/// Barrier parameter μ = (s^T z + τ κ) / (ν + 1).
pub fn compute_mu(state: &HsdeState, barrier_degree: usize) -> f64 {
    (dot(&state.s, &state.z) + state.tau * state.kappa) / (barrier_degree as f64 + 1.0)
}
