//! Quadratic pseudo-metrics.
//!
//! A PSD matrix M defines d(x, y) = sqrt((x - y)^T M (x - y)). Distinct points
//! can be at distance zero when M is singular.

use nalgebra::{DMatrix, DVector};

use crate::error::{FitError, FitResult};

/// Relative tolerance for the symmetry check.
const SYMMETRY_TOL: f64 = 1e-9;

/// Symmetric positive semidefinite matrix used as a distance.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticMetric {
    matrix: DMatrix<f64>,
}

impl QuadraticMetric {
    /// Wrap a matrix after checking it is square, symmetric and PSD.
    ///
    /// Eigenvalues down to `-psd_tolerance * max(1, |λ|max)` are accepted; the
    /// stored matrix is the exact symmetric part.
    pub fn new(matrix: DMatrix<f64>, psd_tolerance: f64) -> FitResult<Self> {
        let matrix = check_symmetric(matrix)?;
        let eigenvalues = matrix.symmetric_eigenvalues();
        let scale = eigenvalues.amax().max(1.0);
        let min_eig = eigenvalues.min();
        if min_eig < -psd_tolerance * scale {
            return Err(FitError::InvalidMetric(format!(
                "matrix is not PSD: smallest eigenvalue {:.3e}",
                min_eig
            )));
        }
        Ok(Self { matrix })
    }

    /// Nearest PSD matrix in Frobenius norm: symmetrize, then clip negative
    /// eigenvalues to zero.
    pub fn project_psd(matrix: DMatrix<f64>) -> FitResult<Self> {
        let matrix = check_symmetric(matrix)?;
        let eig = matrix.clone().symmetric_eigen();
        if eig.eigenvalues.iter().all(|&l| l >= 0.0) {
            return Ok(Self { matrix });
        }
        let clipped = eig.eigenvalues.map(|l| l.max(0.0));
        let q = &eig.eigenvectors;
        let projected = q * DMatrix::from_diagonal(&clipped) * q.transpose();
        Ok(Self {
            matrix: (&projected + projected.transpose()) * 0.5,
        })
    }

    /// Euclidean distance on `dim` coordinates.
    pub fn identity(dim: usize) -> Self {
        Self {
            matrix: DMatrix::identity(dim, dim),
        }
    }

    /// Matrix order n.
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// Underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Eigenvalues in no particular order.
    pub fn eigenvalues(&self) -> DVector<f64> {
        self.matrix.symmetric_eigenvalues()
    }

    /// z^T M z, floored at zero.
    pub fn quadratic_form(&self, z: &DVector<f64>) -> FitResult<f64> {
        if z.len() != self.dim() {
            return Err(FitError::DimensionMismatch {
                expected: self.dim(),
                actual: z.len(),
            });
        }
        Ok(z.dot(&(&self.matrix * z)).max(0.0))
    }

    /// sqrt((a - b)^T M (a - b))
    pub fn distance(&self, a: &DVector<f64>, b: &DVector<f64>) -> FitResult<f64> {
        if a.len() != b.len() {
            return Err(FitError::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        Ok(self.quadratic_form(&(a - b))?.sqrt())
    }

    /// ||self - other||_F / ||other||_F
    pub fn relative_error(&self, other: &QuadraticMetric) -> FitResult<f64> {
        if self.dim() != other.dim() {
            return Err(FitError::DimensionMismatch {
                expected: other.dim(),
                actual: self.dim(),
            });
        }
        let denom = other.matrix.norm();
        let diff = (&self.matrix - &other.matrix).norm();
        Ok(if denom > 0.0 { diff / denom } else { diff })
    }

    /// Row-major copy, for reports.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.matrix
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }
}

fn check_symmetric(matrix: DMatrix<f64>) -> FitResult<DMatrix<f64>> {
    if !matrix.is_square() {
        return Err(FitError::InvalidMetric(format!(
            "matrix must be square, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    if matrix.is_empty() {
        return Err(FitError::InvalidMetric("matrix must be non-empty".to_string()));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(FitError::InvalidMetric("non-finite entry".to_string()));
    }
    let scale = matrix.amax().max(1.0);
    let asym = (&matrix - matrix.transpose()).amax();
    if asym > SYMMETRY_TOL * scale {
        return Err(FitError::InvalidMetric(format!(
            "matrix is not symmetric (max asymmetry {:.3e})",
            asym
        )));
    }
    Ok((&matrix + matrix.transpose()) * 0.5)
}
