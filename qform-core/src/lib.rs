//! qform-core: a small interior point solver for symmetric cone programs.
//!
//! Problems have the standard conic form
//!
//! ```text
//! minimize    q^T x
//! subject to  A x + s = b,  s ∈ K
//! ```
//!
//! where K is a product of:
//!
//! - **Nonnegative orthants** (linear inequalities)
//! - **Second-order cones** (Lorentz cones)
//! - **PSD cones** in scaled-vector (svec) form
//!
//! # Algorithm
//!
//! The solver uses a **homogeneous self-dual embedding (HSDE)** interior point method
//! with Mehrotra predictor-corrector steps. Key features:
//!
//! - **Nesterov-Todd scaling** for all three cone types
//! - **Normal equations** assembled block-sparse and factored with a dense Cholesky
//! - **Static and dynamic regularization** with iterative refinement
//! - **Infeasibility certificates** for ill-posed problems
//!
//! # Example
//!
//! ```
//! use qform_core::{solve, ConeSpec, ProblemData, SolveStatus, SolverSettings};
//! use qform_core::linalg::sparse;
//!
//! // min -x1 - x2  s.t.  x1 + x2 <= 1, x >= 0
//! let prob = ProblemData {
//!     q: vec![-1.0, -1.0],
//!     A: sparse::from_triplets(
//!         3,
//!         2,
//!         vec![(0, 0, 1.0), (0, 1, 1.0), (1, 0, -1.0), (2, 1, -1.0)],
//!     ),
//!     b: vec![1.0, 0.0, 0.0],
//!     cones: vec![ConeSpec::NonNeg { dim: 3 }],
//! };
//!
//! let result = solve(&prob, &SolverSettings::default()).unwrap();
//! assert_eq!(result.status, SolveStatus::Optimal);
//! assert!((result.obj_val + 1.0).abs() < 1e-6);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)] // IPM kernels thread a lot of state

pub mod cones;
pub mod ipm;
pub mod linalg;
pub mod problem;
pub mod scaling;

pub use cones::psd::{mat_to_svec, svec_index, svec_to_mat};
pub use problem::{
    ConeSpec, ProblemData, SolveInfo, SolveResult, SolveStatus, SolverError, SolverSettings,
};

/// Main solve entry point.
///
/// Returns `Err` only for malformed problems or settings. Solver outcomes,
/// including infeasibility and numerical failure, are reported through
/// [`SolveResult::status`].
pub fn solve(problem: &ProblemData, settings: &SolverSettings) -> Result<SolveResult, SolverError> {
    ipm::solve_ipm(problem, settings)
}
