//! Second-order cone (Lorentz cone).
//!
//! K = {(t, x) ∈ ℝ × ℝ^{n-1} : t ≥ ||x||₂}
//!
//! Every element has the spectral decomposition (t, x) = λ₁ e₁ + λ₂ e₂ with
//! λ₁,₂ = t ± ||x||, so interior tests and the minimum eigenvalue reduce to
//! t - ||x||.

use super::traits::ConeKernel;
use crate::scaling::nt::{self, NtScalingError};
use crate::scaling::ScalingBlock;

/// Second-order (Lorentz) cone.
///
/// Represents the constraint t ≥ ||x||₂ where the first component is t
/// and the remaining components form the vector x.
#[derive(Debug, Clone)]
pub struct SocCone {
    /// Total dimension (d = 1 + length of x vector)
    dim: usize,
}

impl SocCone {
    /// Create a new second-order cone of the given dimension.
    ///
    /// # Arguments
    ///
    /// * `dim` - Total dimension (must be at least 2: one for t, at least one for x)
    pub fn new(dim: usize) -> Self {
        assert!(dim >= 2, "SOC cone must have dimension >= 2");
        Self { dim }
    }

    /// Interior tolerance
    const INTERIOR_TOL: f64 = 1e-12;
}

/// t² - ||x||², factored as (t - ||x||)(t + ||x||) to keep precision near
/// the boundary.
#[inline]
pub(crate) fn discriminant(s: &[f64]) -> f64 {
    let t = s[0];
    let xn = x_norm(s);
    (t - xn) * (t + xn)
}

/// ||x||₂
#[inline]
pub(crate) fn x_norm(s: &[f64]) -> f64 {
    s[1..].iter().map(|&xi| xi * xi).sum::<f64>().sqrt()
}

/// Jordan product: (t,x) ∘ (u,v) = (tu + x^T v, tv + ux)
pub(crate) fn jordan_product(a: &[f64], b: &[f64], out: &mut [f64]) {
    let t = a[0];
    let u = b[0];
    out[0] = t * u + a[1..].iter().zip(&b[1..]).map(|(x, v)| x * v).sum::<f64>();
    for i in 1..a.len() {
        out[i] = t * b[i] + u * a[i];
    }
}

/// Solve λ ∘ u = v using the arrow structure of L(λ).
///
/// u₀ = (λ₀ v₀ - λ₁·v₁) / det(λ),  u₁ = (v₁ - u₀ λ₁) / λ₀
pub(crate) fn jordan_div(lambda: &[f64], v: &[f64], out: &mut [f64]) {
    let l0 = lambda[0];
    let det = discriminant(lambda);
    let l1_dot_v1: f64 = lambda[1..].iter().zip(&v[1..]).map(|(l, vi)| l * vi).sum();
    let u0 = (l0 * v[0] - l1_dot_v1) / det;
    out[0] = u0;
    for i in 1..lambda.len() {
        out[i] = (v[i] - u0 * lambda[i]) / l0;
    }
}

impl ConeKernel for SocCone {
    fn dim(&self) -> usize {
        self.dim
    }

    fn barrier_degree(&self) -> usize {
        2
    }

    fn is_interior(&self, s: &[f64]) -> bool {
        assert_eq!(s.len(), self.dim);

        if s.iter().any(|&x| x.is_nan()) {
            return false;
        }

        let u = discriminant(s);
        let s_norm = s.iter().map(|x| x.abs()).fold(0.0f64, f64::max);
        let tol = Self::INTERIOR_TOL * s_norm.max(1.0);

        s[0] > tol && u > tol * tol
    }

    fn step_to_boundary(&self, s: &[f64], ds: &[f64]) -> f64 {
        assert_eq!(s.len(), self.dim);
        assert_eq!(ds.len(), self.dim);

        // Largest α with (t + α Δt)² - ||x + α Δx||² ≥ 0, i.e. aα² + bα + c ≥ 0:
        //   a = (Δt)² - ||Δx||²
        //   b = 2(t Δt - x^T Δx)
        //   c = t² - ||x||² > 0
        let t = s[0];
        let dt = ds[0];

        let dx_norm_sq: f64 = ds[1..].iter().map(|&dxi| dxi * dxi).sum();
        let x_dot_dx: f64 = s[1..].iter().zip(&ds[1..]).map(|(&xi, &dxi)| xi * dxi).sum();

        let a = dt * dt - dx_norm_sq;
        let b = 2.0 * (t * dt - x_dot_dx);
        let c = discriminant(s);

        if c <= 0.0 || t <= 0.0 || !c.is_finite() {
            return 0.0;
        }

        let mut alpha_max = f64::INFINITY;

        let coef_scale = a.abs().max(b.abs()).max(c.abs()).max(1.0);
        if a.abs() < 1e-12 * coef_scale {
            // aα² is negligible: bα + c = 0
            if b < 0.0 {
                alpha_max = -c / b;
            }
        } else {
            let disc = b * b - 4.0 * a * c;
            let disc_scale = (b * b).abs().max((4.0 * a * c).abs()).max(1e-300);

            if disc >= -1e-12 * disc_scale {
                let sqrt_disc = disc.max(0.0).sqrt();

                // Citardauq form: one root from q/a, the other from c/q,
                // so neither suffers cancellation.
                let q = if b >= 0.0 {
                    -0.5 * (b + sqrt_disc)
                } else {
                    -0.5 * (b - sqrt_disc)
                };
                if q.abs() > 1e-300 {
                    for root in [q / a, c / q] {
                        if root > 0.0 {
                            alpha_max = alpha_max.min(root);
                        }
                    }
                }
            }
        }

        // Also need t + α Δt > 0
        if dt < 0.0 {
            alpha_max = alpha_max.min(-t / dt);
        }

        alpha_max
    }

    fn min_eigenvalue(&self, s: &[f64]) -> f64 {
        s[0] - x_norm(s)
    }

    fn identity(&self, out: &mut [f64]) {
        out.fill(0.0);
        out[0] = 1.0;
    }

    fn jordan_product(&self, a: &[f64], b: &[f64], out: &mut [f64]) {
        jordan_product(a, b, out);
    }

    fn jordan_div(&self, lambda: &[f64], v: &[f64], out: &mut [f64]) {
        jordan_div(lambda, v, out);
    }

    fn nt_scaling(&self, s: &[f64], z: &[f64]) -> Result<ScalingBlock, NtScalingError> {
        nt::nt_scaling_soc(self, s, z)
    }

    fn identity_scaling(&self) -> ScalingBlock {
        let mut w = vec![0.0; self.dim];
        w[0] = 1.0;
        ScalingBlock::SocStructured { w, eta: 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soc_basic() {
        let cone = SocCone::new(3);
        assert_eq!(cone.dim(), 3);
        assert_eq!(cone.barrier_degree(), 2);
    }

    #[test]
    fn test_soc_interior() {
        let cone = SocCone::new(3);

        // t = 2, ||x|| = 1
        assert!(cone.is_interior(&[2.0, 1.0, 0.0]));
        // t = 5, ||x|| = 5: boundary
        assert!(!cone.is_interior(&[5.0, 3.0, 4.0]));
        assert!(cone.is_interior(&[5.1, 3.0, 4.0]));
        // ||x|| = 2 > t = 1
        assert!(!cone.is_interior(&[1.0, 2.0, 0.0]));
        assert!(!cone.is_interior(&[-1.0, 0.0, 0.0]));
        assert!(!cone.is_interior(&[f64::NAN, 0.0, 0.0]));
    }

    #[test]
    fn test_soc_discriminant() {
        // t=3, x=(1,2), ||x||² = 5, u = 9 - 5 = 4
        assert!((discriminant(&[3.0, 1.0, 2.0]) - 4.0).abs() < 1e-10);
        assert!((SocCone::new(3).min_eigenvalue(&[3.0, 0.0, 2.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_soc_discriminant_near_boundary() {
        // t² and ||x||² agree in their leading 9 digits; squaring first loses the difference
        let d = discriminant(&[1e9 + 1.0, 1e9, 0.0]);
        assert_eq!(d, 2e9 + 1.0);
    }

    #[test]
    fn test_soc_step_to_boundary() {
        let cone = SocCone::new(3);

        // Moving along the axis never leaves the cone
        let s = vec![2.0, 0.0, 0.0];
        let ds = vec![1.0, 0.0, 0.0];
        assert_eq!(cone.step_to_boundary(&s, &ds), f64::INFINITY);

        // (2-α)² ≥ α²  ⇔  α ≤ 1; boundary at (1, 1, 0)
        let ds = vec![-1.0, 1.0, 0.0];
        let alpha = cone.step_to_boundary(&s, &ds);
        assert!((alpha - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_soc_step_linear_case() {
        let cone = SocCone::new(2);
        // a = 1 - 1 = 0, b = 2(2·(-1) - 0) = -4, c = 4  =>  α = 1
        let alpha = cone.step_to_boundary(&[2.0, 0.0], &[-1.0, 1.0]);
        assert!((alpha - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_soc_jordan_product() {
        // (2, [1,0]) ∘ (3, [0,1]) = (6, [3, 2])
        let mut out = vec![0.0; 3];
        jordan_product(&[2.0, 1.0, 0.0], &[3.0, 0.0, 1.0], &mut out);
        assert_eq!(out, vec![6.0, 3.0, 2.0]);
    }

    #[test]
    fn test_soc_jordan_div_inverts_product() {
        let cone = SocCone::new(4);
        let lambda = vec![3.0, 1.0, -0.5, 2.0];
        let v = vec![0.7, -1.2, 2.0, 0.1];
        let mut u = vec![0.0; 4];
        let mut back = vec![0.0; 4];

        cone.jordan_div(&lambda, &v, &mut u);
        cone.jordan_product(&lambda, &u, &mut back);
        for i in 0..4 {
            assert!((back[i] - v[i]).abs() < 1e-12, "component {}: {} vs {}", i, back[i], v[i]);
        }
    }
}
