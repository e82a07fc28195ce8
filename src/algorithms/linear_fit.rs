//! Least-squares line fitting over full scans or index sub-ranges

use super::{stats, validate_pair};
use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Degree-1 least-squares fit `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fitted line sampled for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedCurve {
    pub fit: LinearFit,
    pub points: Vec<(f64, f64)>,
}

/// Ordinary least-squares line through `(x, y)`.
pub fn fit_line(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    validate_pair(x, y, 1)?;

    let mut sorted = x.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup();
    if sorted.len() < 2 {
        return Err(AnalysisError::DegenerateFit {
            distinct: sorted.len(),
            samples: x.len(),
        });
    }

    // Centered sums keep the normal equations well conditioned for motor
    // positions far from zero.
    let x_mean = stats::mean(x).unwrap_or_default();
    let y_mean = stats::mean(y).unwrap_or_default();
    let (sxx, sxy) = x.iter().zip(y).fold((0.0, 0.0), |(sxx, sxy), (&xi, &yi)| {
        let dx = xi - x_mean;
        (sxx + dx * dx, sxy + dx * (yi - y_mean))
    });

    let slope = sxy / sxx;
    Ok(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

/// Fit, then sample the line on `num_points` evenly spaced x in `[min(x), max(x)]`.
pub fn fit_curve(x: &[f64], y: &[f64], num_points: usize) -> Result<FittedCurve> {
    if num_points < 2 {
        return Err(AnalysisError::invalid(format!(
            "a fitted curve needs at least 2 points, got {}",
            num_points
        )));
    }
    let fit = fit_line(x, y)?;
    let (lo, hi) = stats::extent(x).ok_or_else(|| AnalysisError::invalid("empty x"))?;
    let step = (hi - lo) / (num_points - 1) as f64;
    let points = (0..num_points)
        .map(|i| {
            let xi = if i == num_points - 1 { hi } else { lo + step * i as f64 };
            (xi, fit.evaluate(xi))
        })
        .collect();
    Ok(FittedCurve { fit, points })
}

/// Index range of a sub-fit, resolved against the scan length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitRange {
    /// First `n` samples
    Head(usize),
    /// Last `n` samples
    Tail(usize),
    /// Samples `start..end`
    Span { start: usize, end: usize },
}

impl FitRange {
    pub fn resolve(&self, len: usize) -> Result<Range<usize>> {
        let out_of_bounds = || {
            AnalysisError::invalid(format!(
                "fit range {:?} does not fit a scan of {} samples",
                self, len
            ))
        };
        let range = match *self {
            FitRange::Head(n) => 0..n,
            FitRange::Tail(n) if n <= len => len - n..len,
            FitRange::Tail(_) => return Err(out_of_bounds()),
            FitRange::Span { start, end } => start..end,
        };
        if range.start >= range.end || range.end > len {
            return Err(out_of_bounds());
        }
        Ok(range)
    }
}

/// Two independent fits over disjoint parts of a scan (typically the flanks)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualRegionFit {
    pub first: LinearFit,
    pub second: LinearFit,
    /// `|slope1 + slope2|`, near zero when the flanks mirror each other
    pub slope_difference: f64,
}

impl DualRegionFit {
    pub fn compute(x: &[f64], y: &[f64], first: FitRange, second: FitRange) -> Result<Self> {
        validate_pair(x, y, 2)?;
        let a = first.resolve(x.len())?;
        let b = second.resolve(x.len())?;
        let first = fit_line(&x[a.clone()], &y[a])?;
        let second = fit_line(&x[b.clone()], &y[b])?;
        Ok(Self {
            first,
            second,
            slope_difference: (first.slope + second.slope).abs(),
        })
    }
}
