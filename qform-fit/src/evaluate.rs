//! Held-out evaluation.

use crate::error::{FitError, FitResult};
use crate::metric::QuadraticMetric;
use crate::sample::SampleSet;

/// Predicted distance sqrt(z^T M z) for every sample.
pub fn predicted_distances(metric: &QuadraticMetric, samples: &SampleSet) -> FitResult<Vec<f64>> {
    check_dim(metric, samples)?;
    samples
        .iter()
        .map(|s| metric.distance(s.a(), s.b()))
        .collect()
}

/// Mean of (predicted - observed)² over the samples.
pub fn mean_squared_error(metric: &QuadraticMetric, samples: &SampleSet) -> FitResult<f64> {
    check_dim(metric, samples)?;
    if samples.is_empty() {
        return Err(FitError::EmptyEvaluationSet);
    }
    let predicted = predicted_distances(metric, samples)?;
    let sum: f64 = predicted
        .iter()
        .zip(samples)
        .map(|(p, s)| (p - s.distance()).powi(2))
        .sum();
    Ok(sum / samples.len() as f64)
}

fn check_dim(metric: &QuadraticMetric, samples: &SampleSet) -> FitResult<()> {
    if metric.dim() != samples.dim() {
        return Err(FitError::DimensionMismatch {
            expected: metric.dim(),
            actual: samples.dim(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;
    use nalgebra::{DMatrix, DVector};

    fn set(entries: &[([f64; 2], [f64; 2], f64)]) -> SampleSet {
        let samples = entries
            .iter()
            .map(|(a, b, d)| {
                Sample::new(DVector::from_column_slice(a), DVector::from_column_slice(b), *d).unwrap()
            })
            .collect();
        SampleSet::from_samples(2, samples).unwrap()
    }

    #[test]
    fn test_zero_error_on_exact_predictions() {
        let metric = QuadraticMetric::new(DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 9.0]), 0.0)
            .unwrap();
        let samples = set(&[([1.0, 0.0], [0.0, 0.0], 2.0), ([0.0, 0.0], [0.0, 1.0], 3.0)]);
        assert_eq!(predicted_distances(&metric, &samples).unwrap(), vec![2.0, 3.0]);
        assert_eq!(mean_squared_error(&metric, &samples).unwrap(), 0.0);
    }

    #[test]
    fn test_mse_value() {
        let metric = QuadraticMetric::identity(2);
        // predictions 1 and 5; errors 1 and -2
        let samples = set(&[([1.0, 0.0], [0.0, 0.0], 2.0), ([3.0, 4.0], [0.0, 0.0], 3.0)]);
        assert!((mean_squared_error(&metric, &samples).unwrap() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_predictions_nonnegative_for_singular_metric() {
        let metric = QuadraticMetric::new(DMatrix::zeros(2, 2), 0.0).unwrap();
        let samples = set(&[([1.0, -7.0], [0.5, 3.0], 1.0)]);
        assert_eq!(predicted_distances(&metric, &samples).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_errors() {
        let samples = set(&[([1.0, 0.0], [0.0, 0.0], 1.0)]);
        let err = mean_squared_error(&QuadraticMetric::identity(3), &samples).unwrap_err();
        assert!(matches!(err, FitError::DimensionMismatch { expected: 3, actual: 2 }));

        let empty = SampleSet::new(2);
        assert!(matches!(
            mean_squared_error(&QuadraticMetric::identity(2), &empty),
            Err(FitError::EmptyEvaluationSet)
        ));
        assert!(predicted_distances(&QuadraticMetric::identity(2), &empty)
            .unwrap()
            .is_empty());
    }
}
