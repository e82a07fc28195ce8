//! Savitzky–Golay smoothing
//!
//! Each output sample is the value, at that sample, of the least-squares
//! polynomial of degree `polyorder` fitted over a window of `window` samples.
//! Because the fit is linear in the samples, the whole window reduces to a
//! projection matrix `Q Qᵀ` (thin QR of the Vandermonde matrix): its middle
//! row gives the interior convolution weights and its outer rows evaluate the
//! edge polynomials.
//!
//! Boundaries follow the "interp" convention: the first and last `window / 2`
//! outputs come from the polynomial fitted to the first and last full window,
//! evaluated at those positions, rather than from padding.

use super::validate_finite;
use crate::{AnalysisError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Window length and polynomial degree of a Savitzky–Golay filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmoothingParams {
    pub window: usize,
    pub polyorder: usize,
}

impl SmoothingParams {
    pub fn new(window: usize, polyorder: usize) -> Self {
        Self { window, polyorder }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window == 0 || self.window % 2 == 0 {
            return Err(AnalysisError::invalid(format!(
                "smoothing window must be a positive odd number, got {}",
                self.window
            )));
        }
        if self.window < self.polyorder + 1 {
            return Err(AnalysisError::invalid(format!(
                "smoothing window {} too short for polynomial order {}",
                self.window, self.polyorder
            )));
        }
        Ok(())
    }
}

/// Smoothed intensities, same length as the source samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothedSignal {
    values: Vec<f64>,
    params: SmoothingParams,
}

impl SmoothedSignal {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn params(&self) -> SmoothingParams {
        self.params
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.values
    }
}

impl Deref for SmoothedSignal {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.values
    }
}

/// Savitzky–Golay filter with its projection matrix precomputed
#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    params: SmoothingParams,
    projection: DMatrix<f64>,
}

impl SavitzkyGolay {
    pub fn new(params: SmoothingParams) -> Result<Self> {
        params.validate()?;

        let window = params.window;
        let half = (window / 2) as f64;
        // Positions scaled to [-1, 1]; the projection does not depend on the scale.
        let scale = if half > 0.0 { half } else { 1.0 };
        let vandermonde = DMatrix::from_fn(window, params.polyorder + 1, |i, j| {
            ((i as f64 - half) / scale).powi(j as i32)
        });
        let q = vandermonde.qr().q();
        let projection = &q * q.transpose();

        Ok(Self { params, projection })
    }

    pub fn params(&self) -> SmoothingParams {
        self.params
    }

    /// Smooth `samples`; fails if the series is shorter than the window.
    pub fn apply(&self, samples: &[f64]) -> Result<SmoothedSignal> {
        let window = self.params.window;
        let n = samples.len();
        if n < window {
            return Err(AnalysisError::invalid(format!(
                "smoothing window {} exceeds series length {}",
                window, n
            )));
        }
        validate_finite("samples", samples)?;

        let half = window / 2;
        let weighted = |row: usize, start: usize| -> f64 {
            (0..window)
                .map(|j| self.projection[(row, j)] * samples[start + j])
                .sum()
        };

        let mut values = vec![0.0; n];
        for k in half..n - half {
            values[k] = weighted(half, k - half);
        }
        let tail_start = n - window;
        for k in 0..half {
            values[k] = weighted(k, 0);
            values[n - half + k] = weighted(half + 1 + k, tail_start);
        }

        Ok(SmoothedSignal {
            values,
            params: self.params,
        })
    }
}

/// One-shot smoothing; callers choose the parameters.
pub fn smooth(samples: &[f64], window: usize, polyorder: usize) -> Result<SmoothedSignal> {
    SavitzkyGolay::new(SmoothingParams::new(window, polyorder))?.apply(samples)
}
