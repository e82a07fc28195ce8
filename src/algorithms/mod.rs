// Signal-processing primitives shared by every measurement
pub mod crossings;
pub mod features;
pub mod linear_fit;
pub mod outliers;
pub mod smoothing;
pub mod stats;

pub use crossings::*;
pub use features::*;
pub use linear_fit::*;
pub use outliers::*;
pub use smoothing::*;

use crate::{AnalysisError, Result};

/// Checks a pair of parallel sample sequences before interpolation or fitting.
pub(crate) fn validate_pair(x: &[f64], y: &[f64], min_len: usize) -> Result<()> {
    if x.len() != y.len() {
        return Err(AnalysisError::invalid(format!(
            "x and y must have the same length ({} != {})",
            x.len(),
            y.len()
        )));
    }
    if x.len() < min_len {
        return Err(AnalysisError::invalid(format!(
            "at least {} samples required, got {}",
            min_len,
            x.len()
        )));
    }
    validate_finite("x", x)?;
    validate_finite("y", y)
}

pub(crate) fn validate_finite(name: &str, values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(AnalysisError::invalid(format!(
            "{} contains a non-finite value at index {}",
            name, index
        ))),
        None => Ok(()),
    }
}
