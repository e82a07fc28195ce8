use crate::algorithms::{validate_pair, SavitzkyGolay, SmoothedSignal, SmoothingParams};
use crate::Result;
use serde::{Deserialize, Serialize};

/// One motor sweep: axis positions against X-ray sensor intensity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    positions: Vec<f64>,
    intensities: Vec<f64>,
}

impl Scan {
    /// Builds a scan of at least two finite samples.
    pub fn new(positions: Vec<f64>, intensities: Vec<f64>) -> Result<Self> {
        validate_pair(&positions, &intensities, 2)?;
        Ok(Self {
            positions,
            intensities,
        })
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn smoothed(&self, params: SmoothingParams) -> Result<SmoothedSignal> {
        SavitzkyGolay::new(params)?.apply(&self.intensities)
    }
}
