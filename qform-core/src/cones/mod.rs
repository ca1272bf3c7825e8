//! Cone kernel implementations.
//!
//! Interior tests, step-to-boundary, Jordan algebra and Nesterov-Todd
//! scaling for the supported symmetric cones.

pub mod nonneg;
pub mod psd;
pub mod soc;
pub mod traits;

pub use nonneg::NonNegCone;
pub use psd::PsdCone;
pub use soc::SocCone;
pub use traits::ConeKernel;

use crate::problem::ConeSpec;
use crate::scaling::nt::NtScalingError;
use crate::scaling::ScalingBlock;
use std::ops::Range;

/// Instantiate the kernel for a cone specification.
pub fn build_cone(spec: &ConeSpec) -> Box<dyn ConeKernel> {
    match *spec {
        ConeSpec::NonNeg { dim } => Box::new(NonNegCone::new(dim)),
        ConeSpec::Soc { dim } => Box::new(SocCone::new(dim)),
        ConeSpec::Psd { n } => Box::new(PsdCone::new(n)),
    }
}

/// Cartesian product K = K₁ × ... × K_p laid out contiguously in ℝ^m.
#[derive(Debug)]
pub struct ConeProduct {
    cones: Vec<Box<dyn ConeKernel>>,
    ranges: Vec<Range<usize>>,
    dim: usize,
    degree: usize,
}

impl ConeProduct {
    /// Build the kernels for `specs` in order.
    pub fn new(specs: &[ConeSpec]) -> Self {
        let cones: Vec<Box<dyn ConeKernel>> = specs.iter().map(build_cone).collect();
        let mut ranges = Vec::with_capacity(cones.len());
        let mut offset = 0;
        for cone in &cones {
            ranges.push(offset..offset + cone.dim());
            offset += cone.dim();
        }
        let degree = cones.iter().map(|c| c.barrier_degree()).sum();
        Self { cones, ranges, dim: offset, degree }
    }

    /// Total dimension m.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Total barrier degree ν.
    pub fn barrier_degree(&self) -> usize {
        self.degree
    }

    /// Iterate over (kernel, coordinate range) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&dyn ConeKernel, Range<usize>)> + '_ {
        self.cones.iter().map(|c| c.as_ref()).zip(self.ranges.iter().cloned())
    }

    pub fn is_interior(&self, s: &[f64]) -> bool {
        self.iter().all(|(cone, r)| cone.is_interior(&s[r]))
    }

    /// Largest α with s + α ds ∈ K (over all blocks).
    pub fn step_to_boundary(&self, s: &[f64], ds: &[f64]) -> f64 {
        self.iter()
            .map(|(cone, r)| cone.step_to_boundary(&s[r.clone()], &ds[r]))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn min_eigenvalue(&self, s: &[f64]) -> f64 {
        self.iter()
            .map(|(cone, r)| cone.min_eigenvalue(&s[r]))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn identity(&self, out: &mut [f64]) {
        for (cone, r) in self.iter() {
            cone.identity(&mut out[r]);
        }
    }

    pub fn jordan_product(&self, a: &[f64], b: &[f64], out: &mut [f64]) {
        for (cone, r) in self.iter() {
            cone.jordan_product(&a[r.clone()], &b[r.clone()], &mut out[r]);
        }
    }

    pub fn jordan_div(&self, lambda: &[f64], v: &[f64], out: &mut [f64]) {
        for (cone, r) in self.iter() {
            cone.jordan_div(&lambda[r.clone()], &v[r.clone()], &mut out[r]);
        }
    }

    /// NT scaling for every block.
    pub fn nt_scaling(&self, s: &[f64], z: &[f64]) -> Result<Vec<ScalingBlock>, NtScalingError> {
        self.iter()
            .map(|(cone, r)| cone.nt_scaling(&s[r.clone()], &z[r]))
            .collect()
    }

    /// W = I for every block.
    pub fn identity_scaling(&self) -> Vec<ScalingBlock> {
        self.cones.iter().map(|c| c.identity_scaling()).collect()
    }
}
