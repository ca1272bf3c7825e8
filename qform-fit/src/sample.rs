//! Distance samples.

use nalgebra::DVector;

use crate::error::{FitError, FitResult};

/// A pair of points with an observed distance between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    a: DVector<f64>,
    b: DVector<f64>,
    distance: f64,
}

impl Sample {
    /// Create a sample.
    ///
    /// Both points must share a positive dimension and have finite
    /// coordinates. The distance must be finite and nonnegative.
    pub fn new(a: DVector<f64>, b: DVector<f64>, distance: f64) -> FitResult<Self> {
        if a.len() != b.len() {
            return Err(FitError::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        if a.is_empty() {
            return Err(FitError::InvalidSample("points must have dimension > 0".to_string()));
        }
        if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
            return Err(FitError::InvalidSample("non-finite coordinate".to_string()));
        }
        if !(distance.is_finite() && distance >= 0.0) {
            return Err(FitError::InvalidSample(format!(
                "distance must be finite and nonnegative, got {}",
                distance
            )));
        }
        Ok(Self { a, b, distance })
    }

    /// First point.
    pub fn a(&self) -> &DVector<f64> {
        &self.a
    }

    /// Second point.
    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    /// Observed distance.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Dimension of the points.
    pub fn dim(&self) -> usize {
        self.a.len()
    }

    /// z = a - b
    pub fn difference(&self) -> DVector<f64> {
        &self.a - &self.b
    }
}

/// Samples over points of one fixed dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    dim: usize,
    samples: Vec<Sample>,
}

impl SampleSet {
    /// Empty set of `dim`-dimensional samples.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            samples: Vec::new(),
        }
    }

    /// Build a set from existing samples, checking every dimension.
    pub fn from_samples(dim: usize, samples: Vec<Sample>) -> FitResult<Self> {
        let mut set = Self::with_capacity(dim, samples.len());
        for sample in samples {
            set.push(sample)?;
        }
        Ok(set)
    }

    /// Empty set with room for `capacity` samples.
    pub fn with_capacity(dim: usize, capacity: usize) -> Self {
        Self {
            dim,
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append a sample of matching dimension.
    pub fn push(&mut self, sample: Sample) -> FitResult<()> {
        if sample.dim() != self.dim {
            return Err(FitError::DimensionMismatch {
                expected: self.dim,
                actual: sample.dim(),
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Point dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate over the samples.
    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Observed distances in sample order.
    pub fn distances(&self) -> Vec<f64> {
        self.samples.iter().map(Sample::distance).collect()
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(v: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(v)
    }

    #[test]
    fn test_sample_validation() {
        assert!(Sample::new(point(&[0.0, 1.0]), point(&[1.0, 1.0]), 1.0).is_ok());
        assert!(matches!(
            Sample::new(point(&[0.0, 1.0]), point(&[1.0]), 1.0),
            Err(FitError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            Sample::new(point(&[0.0]), point(&[1.0]), -0.5),
            Err(FitError::InvalidSample(_))
        ));
        assert!(matches!(
            Sample::new(point(&[f64::NAN]), point(&[1.0]), 0.5),
            Err(FitError::InvalidSample(_))
        ));
        assert!(Sample::new(point(&[]), point(&[]), 0.0).is_err());
    }

    #[test]
    fn test_difference() {
        let s = Sample::new(point(&[3.0, 1.0]), point(&[1.0, 4.0]), 2.0).unwrap();
        assert_eq!(s.difference(), point(&[2.0, -3.0]));
        assert_eq!(s.dim(), 2);
    }

    #[test]
    fn test_set_rejects_mixed_dimensions() {
        let mut set = SampleSet::new(2);
        set.push(Sample::new(point(&[0.0, 0.0]), point(&[1.0, 0.0]), 1.0).unwrap())
            .unwrap();
        let err = set
            .push(Sample::new(point(&[0.0]), point(&[1.0]), 1.0).unwrap())
            .unwrap_err();
        assert!(matches!(err, FitError::DimensionMismatch { expected: 2, actual: 1 }));
        assert_eq!(set.len(), 1);
        assert_eq!(set.distances(), vec![1.0]);
    }
}
