//! Cone kernel trait definition.
//!
//! Every cone handled by the solver is symmetric: self-dual and homogeneous,
//! with an associated Euclidean Jordan algebra. The IPM only talks to cones
//! through this trait.

use crate::scaling::nt::NtScalingError;
use crate::scaling::ScalingBlock;

/// Core cone kernel interface.
///
/// # Coordinate Convention
///
/// All methods operate on contiguous slices of the global s/z vectors.
/// The cone kernel is responsible for a specific range [offset .. offset+dim].
///
/// # Jordan algebra
///
/// - NonNeg: elementwise product, identity = ones
/// - SOC: (t, x) ∘ (u, v) = (tu + x·v, tv + ux), identity = (1, 0)
/// - PSD: X ∘ Y = (XY + YX)/2 in svec coordinates, identity = svec(I)
pub trait ConeKernel: Send + Sync + std::fmt::Debug {
    /// Dimension of this cone in the m-dimensional slack/dual space.
    fn dim(&self) -> usize;

    /// Barrier degree ν for this cone (used in μ calculation).
    ///
    /// - NonNeg(n): n
    /// - SOC: 2 (regardless of dimension)
    /// - PSD(n): n
    fn barrier_degree(&self) -> usize;

    /// Check if s is in the strict interior of K (= K* for these cones).
    fn is_interior(&self, s: &[f64]) -> bool;

    /// Compute maximum step size α such that s + α * ds remains in K.
    ///
    /// Returns +∞ if the direction never leaves the cone and 0 if s is not
    /// interior. The IPM applies its own safety fraction.
    fn step_to_boundary(&self, s: &[f64], ds: &[f64]) -> f64;

    /// Smallest eigenvalue of s in the Jordan algebra (negative outside K).
    fn min_eigenvalue(&self, s: &[f64]) -> f64;

    /// Write the Jordan identity e into `out`.
    fn identity(&self, out: &mut [f64]);

    /// out = a ∘ b
    fn jordan_product(&self, a: &[f64], b: &[f64], out: &mut [f64]);

    /// Solve λ ∘ out = v for `out`, with λ in the interior of K.
    fn jordan_div(&self, lambda: &[f64], v: &[f64], out: &mut [f64]);

    /// Nesterov-Todd scaling W with W z = W⁻¹ s for interior (s, z).
    fn nt_scaling(&self, s: &[f64], z: &[f64]) -> Result<ScalingBlock, NtScalingError>;

    /// Scaling block for W = I (used during initialization).
    fn identity_scaling(&self) -> ScalingBlock;
}
