//! Elementwise statistics across an ensemble of same-shaped arrays.
//!
//! Each function takes a slice of `ndarray` arrays of identical shape (one
//! per posterior sample) and reduces across the sample axis, elementwise.
//! The functions are generic over the array dimension so the same code
//! serves eigenvalue vectors, stationary distributions, and full transition
//! matrices.

use ndarray::{Array, Dimension};

use crate::quantile_type7;

/// Error type for all fallible operations in the moira-stats ensemble module.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnsembleError {
    /// Returned when the sample collection is empty.
    #[error("ensemble is empty")]
    EmptyEnsemble,

    /// Returned when a sample's shape differs from the first sample's.
    #[error("sample {index} has shape {got:?}, expected {expected:?}")]
    ShapeMismatch {
        /// Index of the offending sample.
        index: usize,
        /// Shape of the first sample.
        expected: Vec<usize>,
        /// Shape of the offending sample.
        got: Vec<usize>,
    },

    /// Returned when the confidence level is outside the open interval (0, 1).
    #[error("confidence level {conf} is outside (0, 1)")]
    InvalidConfidence {
        /// The invalid confidence level.
        conf: f64,
    },
}

/// Validates that all samples share the first sample's shape.
fn check_shapes<D: Dimension>(samples: &[Array<f64, D>]) -> Result<(), EnsembleError> {
    let first = samples.first().ok_or(EnsembleError::EmptyEnsemble)?;
    for (index, s) in samples.iter().enumerate().skip(1) {
        if s.raw_dim() != first.raw_dim() {
            return Err(EnsembleError::ShapeMismatch {
                index,
                expected: first.shape().to_vec(),
                got: s.shape().to_vec(),
            });
        }
    }
    Ok(())
}

/// Elementwise arithmetic mean across the sample axis.
///
/// # Errors
///
/// Returns [`EnsembleError::EmptyEnsemble`] for an empty slice and
/// [`EnsembleError::ShapeMismatch`] if the samples disagree in shape.
pub fn ensemble_mean<D: Dimension>(
    samples: &[Array<f64, D>],
) -> Result<Array<f64, D>, EnsembleError> {
    check_shapes(samples)?;
    let mut acc = Array::<f64, D>::zeros(samples[0].raw_dim());
    for s in samples {
        acc += s;
    }
    acc /= samples.len() as f64;
    Ok(acc)
}

/// Elementwise standard deviation across the sample axis.
///
/// Uses the population convention (denominator N, not N-1), matching the
/// scalar convention used for ensemble summaries throughout moira. A
/// single-sample ensemble therefore yields all zeros.
///
/// # Errors
///
/// Returns [`EnsembleError::EmptyEnsemble`] for an empty slice and
/// [`EnsembleError::ShapeMismatch`] if the samples disagree in shape.
pub fn ensemble_std<D: Dimension>(
    samples: &[Array<f64, D>],
) -> Result<Array<f64, D>, EnsembleError> {
    let mean = ensemble_mean(samples)?;
    let mut acc = Array::<f64, D>::zeros(samples[0].raw_dim());
    for s in samples {
        let mut dev = s - &mean;
        dev.mapv_inplace(|d| d * d);
        acc += &dev;
    }
    acc /= samples.len() as f64;
    acc.mapv_inplace(f64::sqrt);
    Ok(acc)
}

/// Elementwise two-sided empirical confidence interval.
///
/// Returns `(lower, upper)`, each shaped like one sample. The bounds are the
/// type-7 empirical quantiles at levels `(1 - conf) / 2` and
/// `1 - (1 - conf) / 2`, widened elementwise to include the ensemble mean, so
/// that `lower <= mean <= upper` holds for every sample set. For a constant
/// sample set both bounds collapse to the mean.
///
/// # Errors
///
/// Returns [`EnsembleError::InvalidConfidence`] unless `0 < conf < 1`, plus
/// the shape errors of [`ensemble_mean`].
pub fn confidence_interval<D: Dimension>(
    samples: &[Array<f64, D>],
    conf: f64,
) -> Result<(Array<f64, D>, Array<f64, D>), EnsembleError> {
    if !(conf > 0.0 && conf < 1.0) {
        return Err(EnsembleError::InvalidConfidence { conf });
    }
    check_shapes(samples)?;

    let n = samples.len();
    let p_lo = (1.0 - conf) / 2.0;
    let p_hi = 1.0 - p_lo;

    // Gather the per-element sample columns in logical (row-major) order.
    let len = samples[0].len();
    let mut cols: Vec<Vec<f64>> = vec![Vec::with_capacity(n); len];
    for s in samples {
        for (k, &v) in s.iter().enumerate() {
            cols[k].push(v);
        }
    }

    let mean = ensemble_mean(samples)?;
    let mut lower = mean.clone();
    let mut upper = mean;
    for ((lo, hi), col) in lower
        .iter_mut()
        .zip(upper.iter_mut())
        .zip(cols.iter_mut())
    {
        col.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let m = *lo;
        *lo = quantile_type7(col, p_lo).min(m);
        *hi = quantile_type7(col, p_hi).max(m);
    }
    Ok((lower, upper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2, array};

    #[test]
    fn mean_of_vectors() {
        let samples = vec![array![1.0, 2.0], array![3.0, 4.0]];
        let m = ensemble_mean(&samples).unwrap();
        assert_relative_eq!(m[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(m[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn mean_of_matrices() {
        let samples = vec![
            array![[1.0, 0.0], [0.0, 1.0]],
            array![[0.0, 1.0], [1.0, 0.0]],
        ];
        let m = ensemble_mean(&samples).unwrap();
        for &v in m.iter() {
            assert_relative_eq!(v, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn mean_empty_errors() {
        let samples: Vec<Array1<f64>> = vec![];
        assert!(matches!(
            ensemble_mean(&samples),
            Err(EnsembleError::EmptyEnsemble)
        ));
    }

    #[test]
    fn mean_shape_mismatch_errors() {
        let samples = vec![Array1::zeros(2), Array1::zeros(3)];
        assert!(matches!(
            ensemble_mean(&samples),
            Err(EnsembleError::ShapeMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn std_population_convention() {
        // Two samples [0, 0] and [2, 4]: population std = half the spread.
        let samples = vec![array![0.0, 0.0], array![2.0, 4.0]];
        let s = ensemble_std(&samples).unwrap();
        assert_relative_eq!(s[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(s[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn std_single_sample_is_zero() {
        let samples = vec![array![1.0, 2.0, 3.0]];
        let s = ensemble_std(&samples).unwrap();
        assert!(s.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn interval_brackets_mean() {
        let samples: Vec<Array1<f64>> = (0..20).map(|i| array![i as f64, -(i as f64)]).collect();
        let m = ensemble_mean(&samples).unwrap();
        let (lo, hi) = confidence_interval(&samples, 0.95).unwrap();
        for k in 0..2 {
            assert!(lo[k] <= m[k], "lower {} > mean {}", lo[k], m[k]);
            assert!(hi[k] >= m[k], "upper {} < mean {}", hi[k], m[k]);
        }
    }

    #[test]
    fn interval_brackets_mean_skewed() {
        // Heavily skewed set: one zero among many ones. The plain 2.5%
        // quantile would exceed the mean; the widening must restore
        // lower <= mean.
        let mut samples: Vec<Array1<f64>> = vec![array![0.0]];
        samples.extend((0..60).map(|_| array![1.0]));
        let m = ensemble_mean(&samples).unwrap();
        let (lo, hi) = confidence_interval(&samples, 0.95).unwrap();
        assert!(lo[0] <= m[0]);
        assert!(hi[0] >= m[0]);
    }

    #[test]
    fn interval_collapses_for_constant_samples() {
        let samples: Vec<Array2<f64>> = (0..10).map(|_| Array2::from_elem((2, 2), 0.25)).collect();
        let (lo, hi) = confidence_interval(&samples, 0.95).unwrap();
        for (&l, &h) in lo.iter().zip(hi.iter()) {
            assert_relative_eq!(l, 0.25, epsilon = 1e-12);
            assert_relative_eq!(h, 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    fn interval_rejects_bad_confidence() {
        let samples = vec![array![1.0], array![2.0]];
        assert!(matches!(
            confidence_interval(&samples, 0.0),
            Err(EnsembleError::InvalidConfidence { .. })
        ));
        assert!(matches!(
            confidence_interval(&samples, 1.0),
            Err(EnsembleError::InvalidConfidence { .. })
        ));
    }

    #[test]
    fn interval_orders_bounds() {
        let samples: Vec<Array1<f64>> = (0..50).map(|i| array![(i % 7) as f64]).collect();
        let (lo, hi) = confidence_interval(&samples, 0.68).unwrap();
        assert!(lo[0] <= hi[0]);
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<EnsembleError>();
    }
}
