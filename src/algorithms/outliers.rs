//! IQR fence outlier classification

use super::validate_finite;
use crate::{AnalysisError, Result};

/// Tukey fence: outliers lie more than `k · IQR` outside `[Q1, Q3]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierFilter {
    pub fence: f64,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self { fence: 1.5 }
    }
}

impl OutlierFilter {
    pub fn new(fence: f64) -> Result<Self> {
        if !fence.is_finite() || fence < 0.0 {
            return Err(AnalysisError::invalid(format!(
                "outlier fence must be a non-negative number, got {}",
                fence
            )));
        }
        Ok(Self { fence })
    }

    /// `true` marks an inlier, in input order.
    pub fn classify(&self, values: &[f64]) -> Result<Vec<bool>> {
        if values.is_empty() {
            return Err(AnalysisError::invalid("cannot classify an empty column"));
        }
        validate_finite("values", values)?;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let q1 = quantile_sorted(&sorted, 0.25);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let (low, high) = (q1 - self.fence * iqr, q3 + self.fence * iqr);

        let inliers: Vec<bool> = values.iter().map(|&v| v >= low && v <= high).collect();
        tracing::debug!(
            q1,
            q3,
            rejected = inliers.iter().filter(|&&keep| !keep).count(),
            "outlier classification"
        );
        Ok(inliers)
    }
}

/// Default 1.5 · IQR classification.
pub fn classify(values: &[f64]) -> Result<Vec<bool>> {
    OutlierFilter::default().classify(values)
}

/// Quantile with linear interpolation between closest ranks, `sorted` ascending and non-empty.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantiles_interpolate_between_ranks() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile_sorted(&sorted, 0.25) - 1.75).abs() < 1e-12);
        assert!((quantile_sorted(&sorted, 0.75) - 3.25).abs() < 1e-12);
        assert_eq!(quantile_sorted(&[7.0], 0.75), 7.0);
    }

    #[test]
    fn test_negative_fence_rejected() {
        assert!(OutlierFilter::new(-1.0).is_err());
    }

    #[test]
    fn test_zero_fence_keeps_only_interquartile() {
        let filter = OutlierFilter::new(0.0).unwrap();
        let flags = filter.classify(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(flags, vec![false, true, true, true, false]);
    }
}
