//! Problem data structures and validation.
//!
//! This module defines the canonical conic program representation
//! and all associated types.

use std::fmt;
use thiserror::Error;

/// Sparse matrix in CSC format.
pub type SparseCsc = sprs::CsMatI<f64, usize>;

/// Conic program in canonical form.
///
/// ```text
/// minimize    q^T x
/// subject to  A x + s = b
///             s ∈ K
/// ```
///
/// where K is a Cartesian product of cones.
///
/// # Dimensions
///
/// - `n`: number of primal variables (length of x)
/// - `m`: number of constraints (length of b, number of rows in A)
/// - q: n
/// - A: m × n
/// - b: m
/// - s, z: m (partitioned by cones)
#[derive(Debug, Clone)]
#[allow(non_snake_case)] // A is standard mathematical notation
pub struct ProblemData {
    /// Linear cost vector q (length n)
    pub q: Vec<f64>,

    /// Constraint matrix A (m × n, CSC format)
    pub A: SparseCsc,

    /// Constraint right-hand side b (length m)
    pub b: Vec<f64>,

    /// Cone specifications partitioning the m-dimensional slack/dual space
    pub cones: Vec<ConeSpec>,
}

/// Cone specification.
///
/// Each cone type corresponds to a block in the Cartesian product K = K₁ × K₂ × ... × Kₙ.
/// All supported cones are symmetric (self-dual).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ConeSpec {
    /// Nonnegative orthant: ℝ₊^dim
    NonNeg { dim: usize },

    /// Second-order (Lorentz) cone: {(t, x) : t ≥ ||x||₂}
    /// Dimension must be at least 2.
    Soc { dim: usize },

    /// Positive semidefinite cone: S₊^n (n × n symmetric matrices)
    /// Stored in svec format: dimension = n(n+1)/2
    Psd { n: usize },
}

/// Errors raised before the interior point iteration starts.
#[derive(Error, Debug)]
pub enum SolverError {
    /// Dimensions or cone partition are inconsistent
    #[error("invalid problem: {0}")]
    InvalidProblem(String),

    /// Settings are out of range
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Solver settings and parameters.
#[derive(Debug, Clone)]
pub struct SolverSettings {
    /// Maximum number of IPM iterations
    pub max_iter: usize,

    /// Time limit in milliseconds (None = no limit)
    pub time_limit_ms: Option<u64>,

    /// Log one line per iteration at info level
    pub verbose: bool,

    /// Primal/dual feasibility tolerance
    pub tol_feas: f64,

    /// Absolute duality gap tolerance
    pub tol_gap: f64,

    /// Relative duality gap tolerance (gap / max(1, |pobj|, |dobj|))
    pub tol_gap_rel: f64,

    /// Infeasibility detection tolerance
    pub tol_infeas: f64,

    /// Feasibility tolerance accepted for `AlmostOptimal`
    pub reduced_tol_feas: f64,

    /// Gap tolerance accepted for `AlmostOptimal`
    pub reduced_tol_gap: f64,

    /// Static regularization for the normal equations (added to diagonal)
    pub static_reg: f64,

    /// Iterative refinement steps for KKT solves
    pub kkt_refine_iters: usize,

    /// Fraction of the step to the cone boundary taken by the combined step
    pub step_fraction: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        let kkt_refine_iters = std::env::var("QFORM_REFINE_ITERS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(2);

        let max_iter = std::env::var("QFORM_MAX_ITER")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(100);

        Self {
            max_iter,
            time_limit_ms: None,
            verbose: std::env::var("QFORM_VERBOSE")
                .ok()
                .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            tol_feas: 1e-8,
            tol_gap: 1e-8,
            tol_gap_rel: 1e-8,
            tol_infeas: 1e-8,
            reduced_tol_feas: 1e-4,
            reduced_tol_gap: 5e-5,
            static_reg: 1e-8,
            kkt_refine_iters,
            step_fraction: 0.99,
        }
    }
}

impl SolverSettings {
    /// Check that tolerances and step parameters are usable.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("tol_feas", self.tol_feas),
            ("tol_gap", self.tol_gap),
            ("tol_gap_rel", self.tol_gap_rel),
            ("tol_infeas", self.tol_infeas),
            ("reduced_tol_feas", self.reduced_tol_feas),
            ("reduced_tol_gap", self.reduced_tol_gap),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("{} must be positive and finite, got {}", name, value));
            }
        }
        if !(self.static_reg.is_finite() && self.static_reg >= 0.0) {
            return Err(format!("static_reg must be nonnegative, got {}", self.static_reg));
        }
        if !(self.step_fraction > 0.0 && self.step_fraction < 1.0) {
            return Err(format!(
                "step_fraction must be in (0, 1), got {}",
                self.step_fraction
            ));
        }
        Ok(())
    }
}

/// Solution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found
    Optimal,

    /// Meets the reduced accuracy thresholds (`reduced_tol_feas`, `reduced_tol_gap`)
    AlmostOptimal,

    /// Primal problem is infeasible (certificate available in z)
    PrimalInfeasible,

    /// Dual problem is infeasible, primal unbounded (certificate available in x)
    DualInfeasible,

    /// Maximum iterations reached
    MaxIters,

    /// Time limit reached
    TimeLimit,

    /// Numerical error encountered
    NumericalError,
}

impl SolveStatus {
    /// True for `Optimal` and `AlmostOptimal`.
    pub fn is_solved(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::AlmostOptimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "Optimal"),
            SolveStatus::AlmostOptimal => write!(f, "AlmostOptimal"),
            SolveStatus::PrimalInfeasible => write!(f, "Primal Infeasible"),
            SolveStatus::DualInfeasible => write!(f, "Dual Infeasible"),
            SolveStatus::MaxIters => write!(f, "MaxIters"),
            SolveStatus::TimeLimit => write!(f, "Time Limit"),
            SolveStatus::NumericalError => write!(f, "Numerical Error"),
        }
    }
}

/// Solve result with solution and diagnostics.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// Solution status
    pub status: SolveStatus,

    /// Primal solution x (length n)
    pub x: Vec<f64>,

    /// Slack variables s (length m)
    pub s: Vec<f64>,

    /// Dual variables z (length m)
    pub z: Vec<f64>,

    /// Objective value q^T x at solution
    pub obj_val: f64,

    /// Detailed solve information and diagnostics
    pub info: SolveInfo,
}

/// Detailed solve information and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SolveInfo {
    /// Number of IPM iterations completed
    pub iters: usize,

    /// Total solve time (milliseconds)
    pub solve_time_ms: u64,

    /// Final relative primal residual
    pub primal_res: f64,

    /// Final relative dual residual
    pub dual_res: f64,

    /// Final duality gap
    pub gap: f64,

    /// Final barrier parameter μ
    pub mu: f64,

    /// Static regularization used
    pub reg_static: f64,

    /// Number of dynamic regularization bumps applied
    pub reg_dynamic_bumps: u64,
}

impl ProblemData {
    /// Get the number of primal variables (n)
    pub fn num_vars(&self) -> usize {
        self.q.len()
    }

    /// Get the number of constraints (m)
    pub fn num_constraints(&self) -> usize {
        self.b.len()
    }

    /// Total barrier degree ν of the cone product
    pub fn barrier_degree(&self) -> usize {
        self.cones.iter().map(|c| c.barrier_degree()).sum()
    }

    /// Validate problem dimensions and cone partitioning
    pub fn validate(&self) -> Result<(), String> {
        let n = self.num_vars();
        let m = self.num_constraints();

        if n == 0 {
            return Err("problem has no variables".to_string());
        }

        if self.A.rows() != m {
            return Err(format!("A has {} rows, expected {}", self.A.rows(), m));
        }
        if self.A.cols() != n {
            return Err(format!("A has {} cols, expected {}", self.A.cols(), n));
        }

        if self.q.iter().chain(self.b.iter()).any(|v| !v.is_finite()) {
            return Err("q and b must be finite".to_string());
        }
        if self.A.iter().any(|(v, _)| !v.is_finite()) {
            return Err("A must be finite".to_string());
        }

        let cone_total_dim: usize = self.cones.iter().map(|c| c.dim()).sum();
        if cone_total_dim != m {
            return Err(format!(
                "Cone dimensions sum to {}, expected {}",
                cone_total_dim, m
            ));
        }

        for cone in &self.cones {
            cone.validate()?;
        }

        Ok(())
    }
}

impl ConeSpec {
    /// Get the dimension of this cone in the m-dimensional space
    pub fn dim(&self) -> usize {
        match self {
            ConeSpec::NonNeg { dim } => *dim,
            ConeSpec::Soc { dim } => *dim,
            ConeSpec::Psd { n } => n * (n + 1) / 2, // svec dimension
        }
    }

    /// Get the barrier degree ν of this cone
    pub fn barrier_degree(&self) -> usize {
        match self {
            ConeSpec::NonNeg { dim } => *dim,
            ConeSpec::Soc { .. } => 2, // SOC always has degree 2
            ConeSpec::Psd { n } => *n,
        }
    }

    /// Validate this cone specification
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ConeSpec::NonNeg { dim } => {
                if *dim == 0 {
                    return Err("NonNeg cone must have positive dimension".to_string());
                }
            }
            ConeSpec::Soc { dim } => {
                if *dim < 2 {
                    return Err(format!("SOC cone must have dimension >= 2, got {}", dim));
                }
            }
            ConeSpec::Psd { n } => {
                if *n == 0 {
                    return Err("PSD cone must have positive size".to_string());
                }
            }
        }
        Ok(())
    }
}
