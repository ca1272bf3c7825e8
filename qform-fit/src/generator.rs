//! Synthetic distance data.
//!
//! Points are standard normal; observed distances are the ground-truth
//! metric distance plus Gaussian noise, clipped at zero. All randomness comes
//! from the caller's RNG.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::error::{FitError, FitResult};
use crate::metric::QuadraticMetric;
use crate::sample::{Sample, SampleSet};

/// Shape of a synthetic dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Point dimension n.
    pub dim: usize,

    /// Number of training samples N.
    pub train_samples: usize,

    /// Number of held-out samples.
    pub test_samples: usize,

    /// Standard deviation of the additive distance noise.
    pub noise_std: f64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dim: 5,
            train_samples: 100,
            test_samples: 10,
            noise_std: 1.0,
        }
    }
}

impl DataConfig {
    /// Check dimension and noise level.
    pub fn validate(&self) -> FitResult<()> {
        if self.dim == 0 {
            return Err(FitError::InvalidConfig("dim must be positive".to_string()));
        }
        if !(self.noise_std.is_finite() && self.noise_std >= 0.0) {
            return Err(FitError::InvalidConfig(format!(
                "noise_std must be finite and nonnegative, got {}",
                self.noise_std
            )));
        }
        Ok(())
    }
}

/// Ground truth together with training and held-out samples.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Metric the distances were drawn from.
    pub ground_truth: QuadraticMetric,

    /// Training samples.
    pub train: SampleSet,

    /// Held-out samples, drawn independently of `train`.
    pub test: SampleSet,
}

/// P = A A^T + I with A standard normal.
pub fn random_ground_truth<R: Rng + ?Sized>(n: usize, rng: &mut R) -> FitResult<QuadraticMetric> {
    if n == 0 {
        return Err(FitError::InvalidConfig("dim must be positive".to_string()));
    }
    let a: DMatrix<f64> = DMatrix::from_fn(n, n, |_, _| StandardNormal.sample(&mut *rng));
    let p = &a * a.transpose() + DMatrix::identity(n, n);
    QuadraticMetric::new(p, 0.0)
}

/// Draws noisy distance samples from a fixed metric.
#[derive(Debug, Clone)]
pub struct SampleGenerator<'a> {
    metric: &'a QuadraticMetric,
    noise_std: f64,
}

impl<'a> SampleGenerator<'a> {
    /// Create a generator. `noise_std` must be finite and nonnegative.
    pub fn new(metric: &'a QuadraticMetric, noise_std: f64) -> FitResult<Self> {
        if !(noise_std.is_finite() && noise_std >= 0.0) {
            return Err(FitError::InvalidConfig(format!(
                "noise_std must be finite and nonnegative, got {}",
                noise_std
            )));
        }
        Ok(Self { metric, noise_std })
    }

    /// Draw `count` samples.
    pub fn generate<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> FitResult<SampleSet> {
        let n = self.metric.dim();
        let mut set = SampleSet::with_capacity(n, count);
        for _ in 0..count {
            let a = random_point(n, rng);
            let b = random_point(n, rng);
            let noise: f64 = StandardNormal.sample(&mut *rng);
            let d = (self.metric.distance(&a, &b)? + self.noise_std * noise).max(0.0);
            set.push(Sample::new(a, b, d)?)?;
        }
        Ok(set)
    }
}

/// Random ground truth plus independent training and held-out sets.
pub fn generate_dataset<R: Rng + ?Sized>(config: &DataConfig, rng: &mut R) -> FitResult<Dataset> {
    config.validate()?;
    let ground_truth = random_ground_truth(config.dim, rng)?;
    let generator = SampleGenerator::new(&ground_truth, config.noise_std)?;
    let train = generator.generate(config.train_samples, rng)?;
    let test = generator.generate(config.test_samples, rng)?;
    log::debug!(
        "generated {} training and {} held-out samples in dimension {}",
        train.len(),
        test.len(),
        config.dim
    );
    Ok(Dataset {
        ground_truth,
        train,
        test,
    })
}

fn random_point<R: Rng + ?Sized>(n: usize, rng: &mut R) -> DVector<f64> {
    DVector::<f64>::from_fn(n, |_, _| StandardNormal.sample(&mut *rng))
}
