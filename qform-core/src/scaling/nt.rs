//! Nesterov-Todd scaling for symmetric cones.
//!
//! The NT scaling W is the unique symmetric positive definite operator,
//! compatible with the cone, such that
//!   W z = W⁻¹ s = λ
//!
//! For different cone types:
//! - NonNeg: W = diag(sqrt(s ./ z)), λ = sqrt(s ∘ z)
//! - SOC: normalized arrow form built from s̄ = s/√det(s), z̄ = z/√det(z)
//! - PSD: W(X) = G X G with G² = S^{1/2} (S^{1/2} Z S^{1/2})^{-1/2} S^{1/2}

use super::ScalingBlock;
use crate::cones::psd::{reconstruct, svec_to_mat, symmetrize};
use crate::cones::soc::discriminant;
use crate::cones::{ConeKernel, NonNegCone, PsdCone, SocCone};
use nalgebra::linalg::SymmetricEigen;
use thiserror::Error;

/// NT scaling errors
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum NtScalingError {
    /// Point not in interior
    #[error("Point not in cone interior")]
    NotInterior,

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

fn check_dims(dim: usize, s: &[f64], z: &[f64]) -> Result<(), NtScalingError> {
    for len in [s.len(), z.len()] {
        if len != dim {
            return Err(NtScalingError::DimensionMismatch { expected: dim, actual: len });
        }
    }
    Ok(())
}

/// Compute NT scaling for NonNeg cone: W = diag(sqrt(s ./ z)).
pub fn nt_scaling_nonneg(
    cone: &NonNegCone,
    s: &[f64],
    z: &[f64],
) -> Result<ScalingBlock, NtScalingError> {
    check_dims(cone.dim(), s, z)?;
    if !cone.is_interior(s) || !cone.is_interior(z) {
        return Err(NtScalingError::NotInterior);
    }

    let d: Vec<f64> = s.iter().zip(z.iter()).map(|(si, zi)| (si / zi).sqrt()).collect();
    Ok(ScalingBlock::Diagonal { d })
}

/// Compute NT scaling for the second-order cone.
///
/// With s̄ = s/√det(s), z̄ = z/√det(z) and γ = sqrt((1 + s̄·z̄)/2), the scaling
/// point is w̄ = (s̄ + J z̄)/(2γ), where J = diag(1, -I). It has det(w̄) = 1
/// and η = (det(s)/det(z))^{1/4}.
pub fn nt_scaling_soc(
    cone: &SocCone,
    s: &[f64],
    z: &[f64],
) -> Result<ScalingBlock, NtScalingError> {
    check_dims(cone.dim(), s, z)?;
    if !cone.is_interior(s) || !cone.is_interior(z) {
        return Err(NtScalingError::NotInterior);
    }

    let s_scale = discriminant(s).sqrt();
    let z_scale = discriminant(z).sqrt();
    if !(s_scale > 0.0 && z_scale > 0.0) {
        return Err(NtScalingError::NotInterior);
    }

    let s_dot_z: f64 = s.iter().zip(z).map(|(a, b)| a * b).sum();
    let gamma = ((1.0 + s_dot_z / (s_scale * z_scale)) * 0.5).sqrt();

    let mut w = vec![0.0; s.len()];
    w[0] = s[0] / s_scale + z[0] / z_scale;
    for i in 1..s.len() {
        w[i] = s[i] / s_scale - z[i] / z_scale;
    }
    let inv = 1.0 / (2.0 * gamma);
    w.iter_mut().for_each(|wi| *wi *= inv);
    // det(w) = 1 exactly
    w[0] = (1.0 + w[1..].iter().map(|v| v * v).sum::<f64>()).sqrt();

    let eta = (s_scale / z_scale).sqrt();
    if !eta.is_finite() || w.iter().any(|v| !v.is_finite()) {
        return Err(NtScalingError::NotInterior);
    }

    Ok(ScalingBlock::SocStructured { w, eta })
}

/// Compute NT scaling for the PSD cone.
///
/// W_nt = S^{1/2} (S^{1/2} Z S^{1/2})^{-1/2} S^{1/2} satisfies W_nt Z W_nt = S.
/// The block stores G = W_nt^{1/2} and its inverse so that W(X) = G X G.
pub fn nt_scaling_psd(
    cone: &PsdCone,
    s: &[f64],
    z: &[f64],
) -> Result<ScalingBlock, NtScalingError> {
    check_dims(cone.dim(), s, z)?;
    let n = cone.size();

    let eig_s = SymmetricEigen::new(svec_to_mat(s, n));
    if eig_s.eigenvalues.iter().any(|&v| !(v > 0.0)) {
        return Err(NtScalingError::NotInterior);
    }
    let s_half = reconstruct(&eig_s, f64::sqrt);

    let m = symmetrize(&(&s_half * svec_to_mat(z, n) * &s_half));
    let eig_m = SymmetricEigen::new(m);
    if eig_m.eigenvalues.iter().any(|&v| !(v > 0.0)) {
        return Err(NtScalingError::NotInterior);
    }
    let m_inv_sqrt = reconstruct(&eig_m, |v| 1.0 / v.sqrt());

    let w_nt = symmetrize(&(&s_half * m_inv_sqrt * &s_half));
    let eig_w = SymmetricEigen::new(w_nt);
    if eig_w.eigenvalues.iter().any(|&v| !(v > 0.0 && v.is_finite())) {
        return Err(NtScalingError::NotInterior);
    }

    Ok(ScalingBlock::PsdStructured {
        g: reconstruct(&eig_w, f64::sqrt),
        g_inv: reconstruct(&eig_w, |v| 1.0 / v.sqrt()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cones::psd::mat_to_svec;
    use nalgebra::DMatrix;

    /// W z and W⁻¹ s must coincide.
    fn assert_nt_property(block: &ScalingBlock, s: &[f64], z: &[f64], tol: f64) {
        let mut wz = vec![0.0; s.len()];
        let mut winv_s = vec![0.0; s.len()];
        block.apply(z, &mut wz);
        block.apply_inv(s, &mut winv_s);
        for i in 0..s.len() {
            assert!(
                (wz[i] - winv_s[i]).abs() < tol * (1.0 + wz[i].abs()),
                "component {}: W z = {}, W^-1 s = {}",
                i, wz[i], winv_s[i]
            );
        }
    }

    #[test]
    fn test_nt_scaling_nonneg() {
        let cone = NonNegCone::new(3);
        let s = vec![4.0, 9.0, 16.0];
        let z = vec![1.0, 4.0, 4.0];

        let scaling = nt_scaling_nonneg(&cone, &s, &z).unwrap();
        match &scaling {
            ScalingBlock::Diagonal { d } => {
                assert!((d[0] - 2.0).abs() < 1e-12);
                assert!((d[1] - 1.5).abs() < 1e-12);
                assert!((d[2] - 2.0).abs() < 1e-12);
            }
            other => panic!("Expected diagonal scaling, got {:?}", other),
        }
        assert_nt_property(&scaling, &s, &z, 1e-12);
    }

    #[test]
    fn test_nt_scaling_rejects_boundary() {
        let cone = NonNegCone::new(2);
        assert!(matches!(
            nt_scaling_nonneg(&cone, &[1.0, 0.0], &[1.0, 1.0]),
            Err(NtScalingError::NotInterior)
        ));
        assert!(matches!(
            nt_scaling_nonneg(&cone, &[1.0], &[1.0, 1.0]),
            Err(NtScalingError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_nt_scaling_soc_property() {
        let cone = SocCone::new(3);
        let s = vec![3.0, 1.0, -1.5];
        let z = vec![2.0, -0.5, 0.8];

        let scaling = nt_scaling_soc(&cone, &s, &z).unwrap();
        if let ScalingBlock::SocStructured { w, .. } = &scaling {
            assert!((discriminant(w) - 1.0).abs() < 1e-12);
        }
        assert_nt_property(&scaling, &s, &z, 1e-12);
    }

    #[test]
    fn test_nt_scaling_soc_near_boundary() {
        let cone = SocCone::new(3);
        let s = vec![1.0, 0.6, 0.79];
        let z = vec![1.0, -0.6, -0.79];
        let scaling = nt_scaling_soc(&cone, &s, &z).unwrap();
        assert_nt_property(&scaling, &s, &z, 1e-10);
    }

    #[test]
    fn test_nt_scaling_soc_unit_determinant_far_from_center() {
        let cone = SocCone::new(3);
        let s = vec![1.0 + 1e-7, 1.0, 0.0];
        let z = vec![2.0, 0.5, 1.9];
        let scaling = nt_scaling_soc(&cone, &s, &z).unwrap();
        if let ScalingBlock::SocStructured { w, .. } = &scaling {
            assert!((discriminant(w) - 1.0).abs() < 1e-10, "det(w) = {}", discriminant(w));
        } else {
            panic!("expected an SOC block");
        }
        assert_nt_property(&scaling, &s, &z, 1e-6);
    }

    #[test]
    fn test_nt_scaling_psd_property() {
        let cone = PsdCone::new(3);
        let sm = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.5, 1.0, 3.0, -0.2, 0.5, -0.2, 2.0]);
        let zm = DMatrix::from_row_slice(3, 3, &[1.0, -0.3, 0.0, -0.3, 2.0, 0.4, 0.0, 0.4, 0.5]);
        let mut s = vec![0.0; 6];
        let mut z = vec![0.0; 6];
        mat_to_svec(&sm, &mut s);
        mat_to_svec(&zm, &mut z);

        let scaling = nt_scaling_psd(&cone, &s, &z).unwrap();
        assert_nt_property(&scaling, &s, &z, 1e-10);

        // λ = W z lies in the cone interior
        let mut lambda = vec![0.0; 6];
        scaling.apply(&z, &mut lambda);
        assert!(cone.is_interior(&lambda));
    }

    #[test]
    fn test_nt_scaling_psd_not_interior() {
        let cone = PsdCone::new(2);
        let s = vec![1.0, 0.0, -1.0];
        let z = vec![1.0, 0.0, 1.0];
        assert!(nt_scaling_psd(&cone, &s, &z).is_err());
    }
}
