//! Normal equations solver for the reduced KKT system.
//!
//! Each Newton step of the IPM solves the quasi-definite system
//! ```text
//! [0    A^T] [dx]   [rhs_x]
//! [A    -H ] [dz] = [rhs_z]
//! ```
//! with H = W² block diagonal over the cones. Eliminating dz gives the
//! n × n normal equations:
//! ```text
//! S = A^T * H^{-1} * A + εI
//! S * dx = rhs_x + A^T * H^{-1} * rhs_z
//! dz = H^{-1} * (A * dx - rhs_z)
//! ```
//!
//! S is assembled cone by cone from the sparse rows of A: diagonal blocks
//! add one sparse outer product per row, structured (SOC/PSD) blocks form
//! B = W⁻¹ A_blk on the block's column support and add BᵀB.

use super::sparse::{row_entries, spmv, spmv_transpose, SparseCsc};
use super::{axpy, dot};
use crate::scaling::ScalingBlock;
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use thiserror::Error;

/// Largest number of diagonal bumps tried before giving up.
const MAX_REG_BUMPS: usize = 8;

/// KKT solve failures.
#[derive(Error, Debug)]
pub enum KktError {
    /// Cholesky failed even after regularization bumps
    #[error("normal equations not positive definite after {bumps} regularization bumps")]
    FactorizationFailed { bumps: usize },

    /// `solve` called before a successful `factor`
    #[error("normal equations have not been factored")]
    NotFactored,

    /// Scaling blocks do not match the cone layout used at construction
    #[error("scaling block {index} does not match the KKT sparsity pattern")]
    ScalingMismatch { index: usize },
}

/// Sparsity of one cone block of rows of A.
#[derive(Debug, Clone)]
enum BlockPattern {
    /// Rows with diagonal scaling; uses the row lists directly.
    Diagonal { offset: usize, dim: usize },

    /// Rows with dense scaling; `columns[c]` is column `cols[c]` of A restricted
    /// to the block's rows.
    Dense {
        offset: usize,
        dim: usize,
        cols: Vec<usize>,
        columns: Vec<Vec<f64>>,
    },
}

impl BlockPattern {
    fn range(&self) -> std::ops::Range<usize> {
        match *self {
            BlockPattern::Diagonal { offset, dim } | BlockPattern::Dense { offset, dim, .. } => {
                offset..offset + dim
            }
        }
    }
}

/// Normal equations KKT solver.
pub struct NormalEqnsSolver {
    n: usize,
    static_reg: f64,
    refine_iters: usize,

    /// Constraint matrix A (m × n)
    a: SparseCsc,

    /// Row-wise copy of A
    rows: Vec<Vec<(usize, f64)>>,

    blocks: Vec<BlockPattern>,

    /// A^T H^{-1} A without regularization
    schur: DMatrix<f64>,

    /// Cholesky factorization of S
    chol: Option<Cholesky<f64, Dyn>>,

    /// Regularization used by the current factorization
    reg: f64,

    dynamic_bumps: u64,
}

impl NormalEqnsSolver {
    /// Create a solver for A with the block layout of `scaling`.
    pub fn new(a: &SparseCsc, scaling: &[ScalingBlock], static_reg: f64, refine_iters: usize) -> Self {
        let n = a.cols();
        let rows = row_entries(a);

        let mut blocks = Vec::with_capacity(scaling.len());
        let mut offset = 0;
        for block in scaling {
            let dim = block.dim();
            match block {
                ScalingBlock::Diagonal { .. } => {
                    blocks.push(BlockPattern::Diagonal { offset, dim });
                }
                _ => {
                    let mut cols: Vec<usize> = rows[offset..offset + dim]
                        .iter()
                        .flat_map(|row| row.iter().map(|&(c, _)| c))
                        .collect();
                    cols.sort_unstable();
                    cols.dedup();

                    let mut columns = vec![vec![0.0; dim]; cols.len()];
                    for (local_row, row) in rows[offset..offset + dim].iter().enumerate() {
                        for &(c, v) in row {
                            // cols is sorted, so binary search is exact
                            if let Ok(k) = cols.binary_search(&c) {
                                columns[k][local_row] = v;
                            }
                        }
                    }
                    blocks.push(BlockPattern::Dense { offset, dim, cols, columns });
                }
            }
            offset += dim;
        }

        Self {
            n,
            static_reg,
            refine_iters,
            a: a.clone(),
            rows,
            blocks,
            schur: DMatrix::zeros(n, n),
            chol: None,
            reg: static_reg,
            dynamic_bumps: 0,
        }
    }

    /// Total number of dynamic regularization bumps so far.
    pub fn dynamic_bumps(&self) -> u64 {
        self.dynamic_bumps
    }

    /// Regularization used by the current factorization.
    pub fn regularization(&self) -> f64 {
        self.reg
    }

    /// Assemble S for the given scaling and factor it.
    ///
    /// If Cholesky fails, the diagonal shift is increased and the
    /// factorization retried.
    pub fn factor(&mut self, scaling: &[ScalingBlock]) -> Result<(), KktError> {
        self.assemble(scaling)?;
        self.chol = None;

        let diag_scale = (0..self.n)
            .map(|i| self.schur[(i, i)].abs())
            .fold(0.0f64, f64::max)
            .max(1.0);
        let mut reg = self.static_reg;

        for bump in 0..=MAX_REG_BUMPS {
            let mut shifted = self.schur.clone();
            for i in 0..self.n {
                shifted[(i, i)] += reg;
            }
            if let Some(chol) = Cholesky::new(shifted) {
                self.chol = Some(chol);
                self.reg = reg;
                return Ok(());
            }

            self.dynamic_bumps += 1;
            let next = (reg * 100.0).max(1e-14 * diag_scale);
            log::warn!(
                "normal equations factorization failed (bump {}), regularization {:.2e} -> {:.2e}",
                bump + 1,
                reg,
                next
            );
            reg = next;
        }

        Err(KktError::FactorizationFailed { bumps: MAX_REG_BUMPS })
    }

    /// Solve the KKT system for one right-hand side.
    ///
    /// ```text
    /// S * dx = rhs_x + A^T * H^{-1} * rhs_z
    /// dz = H^{-1} * (A * dx - rhs_z)
    /// ```
    /// Iterative refinement runs on the residual of the full KKT system with
    /// H applied as W·W, so corrections also absorb the mismatch between the
    /// factored H⁻¹ and the scaling used by the step.
    pub fn solve(
        &self,
        scaling: &[ScalingBlock],
        rhs_x: &[f64],
        rhs_z: &[f64],
        sol_x: &mut [f64],
        sol_z: &mut [f64],
    ) -> Result<(), KktError> {
        self.solve_once(scaling, rhs_x, rhs_z, sol_x, sol_z)?;
        if self.refine_iters == 0 {
            return Ok(());
        }

        let m = rhs_z.len();
        let rhs_norm = (dot(rhs_x, rhs_x) + dot(rhs_z, rhs_z)).sqrt();
        let mut r_x = vec![0.0; self.n];
        let mut r_z = vec![0.0; m];
        let mut h_dz = vec![0.0; m];
        let mut corr_x = vec![0.0; self.n];
        let mut corr_z = vec![0.0; m];

        for _ in 0..self.refine_iters {
            // r_x = rhs_x - A^T dz
            r_x.copy_from_slice(rhs_x);
            spmv_transpose(&self.a, sol_z, &mut r_x, -1.0, 1.0);

            // r_z = rhs_z - A dx + H dz
            self.apply_h(scaling, sol_z, &mut h_dz)?;
            for i in 0..m {
                r_z[i] = rhs_z[i] + h_dz[i];
            }
            spmv(&self.a, sol_x, &mut r_z, -1.0, 1.0);

            let res_norm = (dot(&r_x, &r_x) + dot(&r_z, &r_z)).sqrt();
            if !res_norm.is_finite() || res_norm <= 1e-14 * (1.0 + rhs_norm) {
                break;
            }

            self.solve_once(scaling, &r_x, &r_z, &mut corr_x, &mut corr_z)?;
            axpy(1.0, &corr_x, sol_x);
            axpy(1.0, &corr_z, sol_z);
        }
        Ok(())
    }

    /// One pass through the factored normal equations.
    fn solve_once(
        &self,
        scaling: &[ScalingBlock],
        rhs_x: &[f64],
        rhs_z: &[f64],
        sol_x: &mut [f64],
        sol_z: &mut [f64],
    ) -> Result<(), KktError> {
        let chol = self.chol.as_ref().ok_or(KktError::NotFactored)?;

        let mut h_inv_rz = vec![0.0; rhs_z.len()];
        self.apply_h_inv(scaling, rhs_z, &mut h_inv_rz)?;

        let mut rhs = rhs_x.to_vec();
        spmv_transpose(&self.a, &h_inv_rz, &mut rhs, 1.0, 1.0);
        let dx = chol.solve(&DVector::from_vec(rhs));
        sol_x.copy_from_slice(dx.as_slice());

        let mut adx: Vec<f64> = rhs_z.iter().map(|v| -v).collect();
        spmv(&self.a, sol_x, &mut adx, 1.0, 1.0);
        self.apply_h_inv(scaling, &adx, sol_z)
    }

    fn check_layout(&self, scaling: &[ScalingBlock]) -> Result<(), KktError> {
        if scaling.len() != self.blocks.len() {
            return Err(KktError::ScalingMismatch { index: scaling.len().min(self.blocks.len()) });
        }
        for (index, (block, pattern)) in scaling.iter().zip(&self.blocks).enumerate() {
            if block.dim() != pattern.range().len() {
                return Err(KktError::ScalingMismatch { index });
            }
        }
        Ok(())
    }

    /// out = H⁻¹ v, block by block.
    fn apply_h_inv(&self, scaling: &[ScalingBlock], v: &[f64], out: &mut [f64]) -> Result<(), KktError> {
        self.check_layout(scaling)?;
        for (block, pattern) in scaling.iter().zip(&self.blocks) {
            let range = pattern.range();
            block.apply_h_inv(&v[range.clone()], &mut out[range]);
        }
        Ok(())
    }

    /// out = H v = W W v, block by block.
    fn apply_h(&self, scaling: &[ScalingBlock], v: &[f64], out: &mut [f64]) -> Result<(), KktError> {
        self.check_layout(scaling)?;
        for (block, pattern) in scaling.iter().zip(&self.blocks) {
            let range = pattern.range();
            let mut tmp = vec![0.0; range.len()];
            block.apply(&v[range.clone()], &mut tmp);
            block.apply(&tmp, &mut out[range]);
        }
        Ok(())
    }

    fn assemble(&mut self, scaling: &[ScalingBlock]) -> Result<(), KktError> {
        if scaling.len() != self.blocks.len() {
            return Err(KktError::ScalingMismatch { index: scaling.len().min(self.blocks.len()) });
        }
        self.schur.fill(0.0);

        for (index, (block, pattern)) in scaling.iter().zip(&self.blocks).enumerate() {
            match (block, pattern) {
                (ScalingBlock::Diagonal { d }, BlockPattern::Diagonal { offset, dim }) => {
                    if d.len() != *dim {
                        return Err(KktError::ScalingMismatch { index });
                    }
                    for (k, row) in self.rows[*offset..offset + dim].iter().enumerate() {
                        let h_inv = 1.0 / (d[k] * d[k]);
                        for &(i, ai) in row {
                            for &(j, aj) in row {
                                self.schur[(i, j)] += h_inv * ai * aj;
                            }
                        }
                    }
                }
                (ScalingBlock::Diagonal { .. }, _) | (_, BlockPattern::Diagonal { .. }) => {
                    return Err(KktError::ScalingMismatch { index });
                }
                (_, BlockPattern::Dense { dim, cols, columns, .. }) => {
                    if block.dim() != *dim {
                        return Err(KktError::ScalingMismatch { index });
                    }
                    // B = W⁻¹ A_blk, then S += BᵀB on the column support
                    let b_cols: Vec<Vec<f64>> = columns
                        .iter()
                        .map(|col| {
                            let mut out = vec![0.0; *dim];
                            block.apply_inv(col, &mut out);
                            out
                        })
                        .collect();
                    for (p, bp) in b_cols.iter().enumerate() {
                        for (q, bq) in b_cols.iter().enumerate().skip(p) {
                            let val: f64 = bp.iter().zip(bq).map(|(x, y)| x * y).sum();
                            self.schur[(cols[p], cols[q])] += val;
                            if p != q {
                                self.schur[(cols[q], cols[p])] += val;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
