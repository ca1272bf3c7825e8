//! Conic program for metric fitting.
//!
//! For training samples (a_i, b_i, d_i) with z_i = a_i - b_i and
//! l_i(M) = z_i^T M z_i = g_i^T svec(M), the program is
//!
//! ```text
//! minimize    Σ e_i
//! subject to  e_i ≥ d_i² - 2 d_i t_i + l_i(M)      (residual rows)
//!             e_i ≥ 0                              (slack rows)
//!             ||(l_i(M) - 1, 2 t_i)|| ≤ l_i(M) + 1  (t_i² ≤ l_i(M))
//!             M ⪰ 0
//! ```
//!
//! With d_i ≥ 0 the optimum has t_i = sqrt(l_i(M)), so e_i is the squared
//! residual (d_i - sqrt(z_i^T M z_i))² and Σ e_i / N is the training MSE.

use std::ops::Range;

use qform_core::linalg::sparse;
use qform_core::{svec_index, svec_to_mat, ConeSpec, ProblemData};

use crate::error::{FitError, FitResult};
use crate::metric::QuadraticMetric;
use crate::sample::SampleSet;

/// Position of each variable block in x = [svec(M), t, e].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    /// Matrix order n.
    pub dim: usize,
    /// Number of training samples N.
    pub samples: usize,
}

impl VariableLayout {
    /// Layout for an n×n metric and N samples.
    pub fn new(dim: usize, samples: usize) -> Self {
        Self { dim, samples }
    }

    /// n(n+1)/2
    pub fn metric_len(&self) -> usize {
        self.dim * (self.dim + 1) / 2
    }

    /// svec(M) entries.
    pub fn metric(&self) -> Range<usize> {
        0..self.metric_len()
    }

    /// Predicted-distance variables t_i.
    pub fn distance(&self) -> Range<usize> {
        let start = self.metric_len();
        start..start + self.samples
    }

    /// Squared-residual slacks e_i.
    pub fn slack(&self) -> Range<usize> {
        let start = self.metric_len() + self.samples;
        start..start + self.samples
    }

    /// Total number of variables.
    pub fn num_vars(&self) -> usize {
        self.metric_len() + 2 * self.samples
    }

    /// Number of constraint rows: 2N linear, 3N SOC, n(n+1)/2 PSD.
    pub fn num_constraints(&self) -> usize {
        5 * self.samples + self.metric_len()
    }
}

/// Metric fitting program in solver form.
#[derive(Debug, Clone)]
pub struct MetricProgram {
    layout: VariableLayout,
    problem: ProblemData,
}

impl MetricProgram {
    /// Variable layout.
    pub fn layout(&self) -> VariableLayout {
        self.layout
    }

    /// Conic problem data.
    pub fn problem(&self) -> &ProblemData {
        &self.problem
    }

    /// Training MSE implied by an objective value.
    pub fn training_mse(&self, objective: f64) -> f64 {
        objective / self.layout.samples as f64
    }

    /// Read the fitted metric out of a primal solution.
    ///
    /// Negative eigenvalues beyond `psd_tolerance` (relative) are an error;
    /// smaller ones are projected onto the PSD cone.
    pub fn extract_metric(&self, x: &[f64], psd_tolerance: f64) -> FitResult<QuadraticMetric> {
        if x.len() != self.layout.num_vars() {
            return Err(FitError::DimensionMismatch {
                expected: self.layout.num_vars(),
                actual: x.len(),
            });
        }
        let m = svec_to_mat(&x[self.layout.metric()], self.layout.dim);
        if m.iter().any(|v| !v.is_finite()) {
            return Err(FitError::InvalidMetric("solver returned non-finite entries".to_string()));
        }

        let eigenvalues = m.symmetric_eigenvalues();
        let scale = eigenvalues.amax().max(1.0);
        let min_eig = eigenvalues.min();
        if min_eig < -psd_tolerance * scale {
            return Err(FitError::InvalidMetric(format!(
                "fitted matrix has eigenvalue {:.3e} below tolerance",
                min_eig
            )));
        }
        if min_eig < 0.0 {
            log::debug!("projecting fitted matrix onto PSD cone (min eigenvalue {:.3e})", min_eig);
        }
        QuadraticMetric::project_psd(m)
    }
}

/// Build the fitting program from training samples.
pub fn build_program(train: &SampleSet) -> FitResult<MetricProgram> {
    if train.is_empty() {
        return Err(FitError::EmptyTrainingSet);
    }
    let n = train.dim();
    if n == 0 {
        return Err(FitError::InvalidSample("points must have dimension > 0".to_string()));
    }

    let layout = VariableLayout::new(n, train.len());
    let big_n = layout.samples;
    let k = layout.metric_len();
    let t_col = layout.distance().start;
    let e_col = layout.slack().start;
    let soc_row = 2 * big_n;
    let psd_row = 5 * big_n;

    let mut q = vec![0.0; layout.num_vars()];
    q[layout.slack()].fill(1.0);

    let mut b = vec![0.0; layout.num_constraints()];
    let mut triplets = Vec::with_capacity(big_n * (3 * k + 6) + k);

    for (i, sample) in train.iter().enumerate() {
        let d = sample.distance();
        let g = lift(sample.difference().as_slice(), k);

        // e_i - l_i + 2 d_i t_i - d_i² ≥ 0
        for &(col, v) in &g {
            triplets.push((i, col, v));
        }
        triplets.push((i, t_col + i, -2.0 * d));
        triplets.push((i, e_col + i, -1.0));
        b[i] = -d * d;

        // e_i ≥ 0
        triplets.push((big_n + i, e_col + i, -1.0));

        // (l_i + 1, l_i - 1, 2 t_i) ∈ SOC
        let row = soc_row + 3 * i;
        for &(col, v) in &g {
            triplets.push((row, col, -v));
            triplets.push((row + 1, col, -v));
        }
        triplets.push((row + 2, t_col + i, -2.0));
        b[row] = 1.0;
        b[row + 1] = -1.0;
    }

    // svec(M) ∈ S₊
    for j in 0..k {
        triplets.push((psd_row + j, j, -1.0));
    }

    let mut cones = Vec::with_capacity(big_n + 2);
    cones.push(ConeSpec::NonNeg { dim: 2 * big_n });
    cones.extend((0..big_n).map(|_| ConeSpec::Soc { dim: 3 }));
    cones.push(ConeSpec::Psd { n });

    let problem = ProblemData {
        q,
        A: sparse::from_triplets(layout.num_constraints(), layout.num_vars(), triplets),
        b,
        cones,
    };
    problem.validate().map_err(FitError::InvalidConfig)?;

    log::debug!(
        "metric program: {} variables, {} constraints, {} cones",
        layout.num_vars(),
        layout.num_constraints(),
        problem.cones.len()
    );

    Ok(MetricProgram { layout, problem })
}

/// Nonzeros of g = svec(z z^T), so that g^T svec(M) = z^T M z.
fn lift(z: &[f64], len: usize) -> Vec<(usize, f64)> {
    let sqrt2 = std::f64::consts::SQRT_2;
    let mut g = Vec::with_capacity(len);
    for j in 0..z.len() {
        for i in 0..=j {
            let v = if i == j { z[i] * z[i] } else { sqrt2 * z[i] * z[j] };
            if v != 0.0 {
                g.push((svec_index(i, j), v));
            }
        }
    }
    g
}
