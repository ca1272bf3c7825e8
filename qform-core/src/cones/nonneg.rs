//! Nonnegative orthant cone.
//!
//! The nonnegative cone K = ℝ₊^n = {s : s_i ≥ 0 for all i}. Its Jordan
//! algebra is the componentwise one, so every operation is diagonal.

use super::traits::ConeKernel;
use crate::scaling::nt::{self, NtScalingError};
use crate::scaling::ScalingBlock;

/// Nonnegative orthant cone ℝ₊^n.
#[derive(Debug, Clone)]
pub struct NonNegCone {
    dim: usize,
}

impl NonNegCone {
    /// Create a new nonnegative cone of the given dimension.
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "NonNeg cone must have positive dimension");
        Self { dim }
    }

    /// Interior tolerance: s_i > tol * max(1, ||s||_∞)
    const INTERIOR_TOL: f64 = 1e-12;
}

impl ConeKernel for NonNegCone {
    fn dim(&self) -> usize {
        self.dim
    }

    fn barrier_degree(&self) -> usize {
        self.dim
    }

    fn is_interior(&self, s: &[f64]) -> bool {
        assert_eq!(s.len(), self.dim);

        if s.iter().any(|&x| x.is_nan()) {
            return false;
        }

        let s_max = s.iter().map(|x| x.abs()).fold(0.0f64, f64::max);
        let tol = Self::INTERIOR_TOL * s_max.max(1.0);

        s.iter().all(|&x| x > tol)
    }

    fn step_to_boundary(&self, s: &[f64], ds: &[f64]) -> f64 {
        assert_eq!(s.len(), self.dim);
        assert_eq!(ds.len(), self.dim);

        let mut alpha_max = f64::INFINITY;
        for (&si, &dsi) in s.iter().zip(ds) {
            if si <= 0.0 {
                return 0.0;
            }
            if dsi < 0.0 {
                // s_i + α ds_i > 0  ⇔  α < -s_i / ds_i
                alpha_max = alpha_max.min(-si / dsi);
            }
        }
        alpha_max
    }

    fn min_eigenvalue(&self, s: &[f64]) -> f64 {
        s.iter().copied().fold(f64::INFINITY, f64::min)
    }

    fn identity(&self, out: &mut [f64]) {
        out.fill(1.0);
    }

    fn jordan_product(&self, a: &[f64], b: &[f64], out: &mut [f64]) {
        for i in 0..self.dim {
            out[i] = a[i] * b[i];
        }
    }

    fn jordan_div(&self, lambda: &[f64], v: &[f64], out: &mut [f64]) {
        for i in 0..self.dim {
            out[i] = v[i] / lambda[i];
        }
    }

    fn nt_scaling(&self, s: &[f64], z: &[f64]) -> Result<ScalingBlock, NtScalingError> {
        nt::nt_scaling_nonneg(self, s, z)
    }

    fn identity_scaling(&self) -> ScalingBlock {
        ScalingBlock::Diagonal { d: vec![1.0; self.dim] }
    }
}
