//! Positive semidefinite cone.
//!
//! Stored in svec format with sqrt(2) scaling on off-diagonals, so that
//! svec(X)·svec(Y) = tr(XY).

use super::traits::ConeKernel;
use crate::scaling::nt::{self, NtScalingError};
use crate::scaling::ScalingBlock;
use nalgebra::linalg::SymmetricEigen;
use nalgebra::DMatrix;

/// Cone of n×n positive semidefinite matrices.
#[derive(Debug, Clone)]
pub struct PsdCone {
    n: usize,
}

impl PsdCone {
    /// Create a new PSD cone for n×n matrices
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "PSD cone must have positive size");
        Self { n }
    }

    /// Interior tolerance relative to ||X||.
    const INTERIOR_TOL: f64 = 1e-12;

    /// Matrix order n.
    pub fn size(&self) -> usize {
        self.n
    }
}

impl ConeKernel for PsdCone {
    fn dim(&self) -> usize {
        self.n * (self.n + 1) / 2
    }

    fn barrier_degree(&self) -> usize {
        self.n
    }

    fn is_interior(&self, s: &[f64]) -> bool {
        assert_eq!(s.len(), self.dim());
        if s.iter().any(|&v| !v.is_finite()) {
            return false;
        }

        let x = svec_to_mat(s, self.n);
        let scale = x.iter().map(|v| v.abs()).fold(0.0_f64, f64::max).max(1.0);
        let tol = Self::INTERIOR_TOL * scale;

        let min_eig = min_eigenvalue(&x);
        min_eig.is_finite() && min_eig > tol
    }

    fn step_to_boundary(&self, s: &[f64], ds: &[f64]) -> f64 {
        assert_eq!(s.len(), self.dim());
        assert_eq!(ds.len(), self.dim());
        if ds.iter().all(|&v| v == 0.0) {
            return f64::INFINITY;
        }

        let x = svec_to_mat(s, self.n);
        let dx = svec_to_mat(ds, self.n);
        let eig_x = SymmetricEigen::new(x);
        let min_eig_x = eig_x.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
        if !min_eig_x.is_finite() || min_eig_x <= 0.0 {
            return 0.0;
        }

        // X + α dX ⪰ 0  ⇔  I + α X^{-1/2} dX X^{-1/2} ⪰ 0
        let x_inv_sqrt = reconstruct(&eig_x, |v| 1.0 / v.sqrt());
        let m = symmetrize(&(&x_inv_sqrt * dx * &x_inv_sqrt));

        let min_eig = min_eigenvalue(&m);
        if !min_eig.is_finite() {
            return 0.0;
        }
        if min_eig >= 0.0 {
            f64::INFINITY
        } else {
            -1.0 / min_eig
        }
    }

    fn min_eigenvalue(&self, s: &[f64]) -> f64 {
        min_eigenvalue(&svec_to_mat(s, self.n))
    }

    fn identity(&self, out: &mut [f64]) {
        mat_to_svec(&DMatrix::identity(self.n, self.n), out);
    }

    fn jordan_product(&self, a: &[f64], b: &[f64], out: &mut [f64]) {
        let am = svec_to_mat(a, self.n);
        let bm = svec_to_mat(b, self.n);
        let prod = &am * &bm;
        mat_to_svec(&symmetrize(&prod), out);
    }

    fn jordan_div(&self, lambda: &[f64], v: &[f64], out: &mut [f64]) {
        // Solve (ΛU + UΛ)/2 = V in the eigenbasis of Λ = Q D Qᵀ:
        //   Ũ_ij = 2 Ṽ_ij / (d_i + d_j),  Ṽ = Qᵀ V Q
        let eig = SymmetricEigen::new(svec_to_mat(lambda, self.n));
        let q = &eig.eigenvectors;
        let mut vt = q.transpose() * svec_to_mat(v, self.n) * q;
        for j in 0..self.n {
            for i in 0..self.n {
                let denom = eig.eigenvalues[i] + eig.eigenvalues[j];
                vt[(i, j)] *= 2.0 / denom;
            }
        }
        let u = q * vt * q.transpose();
        mat_to_svec(&symmetrize(&u), out);
    }

    fn nt_scaling(&self, s: &[f64], z: &[f64]) -> Result<ScalingBlock, NtScalingError> {
        nt::nt_scaling_psd(self, s, z)
    }

    fn identity_scaling(&self) -> ScalingBlock {
        ScalingBlock::PsdStructured {
            g: DMatrix::identity(self.n, self.n),
            g_inv: DMatrix::identity(self.n, self.n),
        }
    }
}

/// Unpack svec storage (upper triangle, column-major, √2 off-diagonals).
pub fn svec_to_mat(s: &[f64], n: usize) -> DMatrix<f64> {
    assert_eq!(s.len(), n * (n + 1) / 2);
    let mut out = DMatrix::<f64>::zeros(n, n);
    let mut idx = 0usize;
    let sqrt2 = std::f64::consts::SQRT_2;

    for j in 0..n {
        for i in 0..=j {
            let val = s[idx];
            if i == j {
                out[(i, j)] = val;
            } else {
                let scaled = val / sqrt2;
                out[(i, j)] = scaled;
                out[(j, i)] = scaled;
            }
            idx += 1;
        }
    }

    out
}

/// Pack the upper triangle of a symmetric matrix into svec storage.
pub fn mat_to_svec(m: &DMatrix<f64>, out: &mut [f64]) {
    let n = m.nrows();
    assert_eq!(m.ncols(), n);
    assert_eq!(out.len(), n * (n + 1) / 2);
    let sqrt2 = std::f64::consts::SQRT_2;
    let mut idx = 0usize;
    for j in 0..n {
        for i in 0..=j {
            out[idx] = if i == j { m[(i, j)] } else { m[(i, j)] * sqrt2 };
            idx += 1;
        }
    }
}

/// Position of entry (i, j), i ≤ j, in svec storage.
#[inline]
pub fn svec_index(i: usize, j: usize) -> usize {
    debug_assert!(i <= j);
    j * (j + 1) / 2 + i
}

/// (M + Mᵀ) / 2
pub(crate) fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    (m + m.transpose()) * 0.5
}

pub(crate) fn min_eigenvalue(m: &DMatrix<f64>) -> f64 {
    SymmetricEigen::new(m.clone())
        .eigenvalues
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min)
}

/// Q f(D) Qᵀ for a symmetric eigendecomposition.
pub(crate) fn reconstruct(eig: &SymmetricEigen<f64, nalgebra::Dyn>, f: impl Fn(f64) -> f64) -> DMatrix<f64> {
    let vals = eig.eigenvalues.map(f);
    let q = &eig.eigenvectors;
    symmetrize(&(q * DMatrix::from_diagonal(&vals) * q.transpose()))
}
