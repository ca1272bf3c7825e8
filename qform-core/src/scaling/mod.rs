//! Nesterov-Todd scaling for the symmetric cones.
//!
//! Each cone block carries a symmetric scaling operator W with
//! W z = W⁻¹ s = λ. The KKT system only needs W and W⁻¹ applied to vectors;
//! the Hessian-like block is H = W².

pub mod nt;

use crate::cones::psd::{mat_to_svec, svec_to_mat};
use nalgebra::DMatrix;

/// Scaling block representation for one cone.
#[derive(Debug, Clone)]
pub enum ScalingBlock {
    /// NonNeg cone: W = diag(d), d = sqrt(s ./ z)
    Diagonal { d: Vec<f64> },

    /// SOC: W = η [[w₀, w₁ᵀ], [w₁, I + w₁w₁ᵀ/(1 + w₀)]] with det(w) = 1
    SocStructured { w: Vec<f64>, eta: f64 },

    /// PSD: W(X) = G X G with G symmetric positive definite
    PsdStructured { g: DMatrix<f64>, g_inv: DMatrix<f64> },
}

impl ScalingBlock {
    /// Dimension of the block in svec coordinates.
    pub fn dim(&self) -> usize {
        match self {
            ScalingBlock::Diagonal { d } => d.len(),
            ScalingBlock::SocStructured { w, .. } => w.len(),
            ScalingBlock::PsdStructured { g, .. } => {
                let n = g.nrows();
                n * (n + 1) / 2
            }
        }
    }

    /// out = W v
    pub fn apply(&self, v: &[f64], out: &mut [f64]) {
        match self {
            ScalingBlock::Diagonal { d } => {
                for i in 0..d.len() {
                    out[i] = d[i] * v[i];
                }
            }
            ScalingBlock::SocStructured { w, eta } => soc_apply(w, *eta, 1.0, v, out),
            ScalingBlock::PsdStructured { g, .. } => psd_congruence(g, v, out),
        }
    }

    /// out = W⁻¹ v
    pub fn apply_inv(&self, v: &[f64], out: &mut [f64]) {
        match self {
            ScalingBlock::Diagonal { d } => {
                for i in 0..d.len() {
                    out[i] = v[i] / d[i];
                }
            }
            // W⁻¹ = (1/η) J W̄ J: same arrow form with w₁ negated
            ScalingBlock::SocStructured { w, eta } => soc_apply(w, 1.0 / *eta, -1.0, v, out),
            ScalingBlock::PsdStructured { g_inv, .. } => psd_congruence(g_inv, v, out),
        }
    }

    /// out = H⁻¹ v = W⁻¹ W⁻¹ v
    pub fn apply_h_inv(&self, v: &[f64], out: &mut [f64]) {
        match self {
            ScalingBlock::Diagonal { d } => {
                for i in 0..d.len() {
                    out[i] = v[i] / (d[i] * d[i]);
                }
            }
            _ => {
                let mut tmp = vec![0.0; v.len()];
                self.apply_inv(v, &mut tmp);
                self.apply_inv(&tmp, out);
            }
        }
    }
}

/// out = W v for a block-diagonal W.
pub fn apply_blocks(blocks: &[ScalingBlock], v: &[f64], out: &mut [f64]) {
    let mut offset = 0;
    for block in blocks {
        let r = offset..offset + block.dim();
        block.apply(&v[r.clone()], &mut out[r]);
        offset += block.dim();
    }
}

/// out = W⁻¹ v for a block-diagonal W.
pub fn apply_inv_blocks(blocks: &[ScalingBlock], v: &[f64], out: &mut [f64]) {
    let mut offset = 0;
    for block in blocks {
        let r = offset..offset + block.dim();
        block.apply_inv(&v[r.clone()], &mut out[r]);
        offset += block.dim();
    }
}

/// out = scale · [[w₀, σw₁ᵀ], [σw₁, I + w₁w₁ᵀ/(1 + w₀)]] v, σ = ±1
fn soc_apply(w: &[f64], scale: f64, sign: f64, v: &[f64], out: &mut [f64]) {
    let w0 = w[0];
    let w1_dot_v1: f64 = w[1..].iter().zip(&v[1..]).map(|(a, b)| a * b).sum();
    out[0] = scale * (w0 * v[0] + sign * w1_dot_v1);
    let c = sign * v[0] + w1_dot_v1 / (1.0 + w0);
    for i in 1..w.len() {
        out[i] = scale * (v[i] + c * w[i]);
    }
}

/// out = svec(G · smat(v) · G)
fn psd_congruence(g: &DMatrix<f64>, v: &[f64], out: &mut [f64]) {
    let x = svec_to_mat(v, g.nrows());
    let y = g * x * g;
    mat_to_svec(&((&y + y.transpose()) * 0.5), out);
}
