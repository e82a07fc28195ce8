//! Synthetic scans for dry runs and tests
//!
//! Rocking curves are Gaussian peaks on a baseline; knife-edge scans are a
//! logistic transition between an open and a closed beam level. Noise is
//! additive Gaussian from a seeded generator so runs are reproducible.

use super::Scan;
use crate::{AnalysisError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Unit Gaussian peak `exp(-(x - center)² / spread)`
pub fn gaussian_peak(x: f64, center: f64, spread: f64) -> f64 {
    (-(x - center).powi(2) / spread).exp()
}

/// Sampling grid and noise of a synthetic sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticScan {
    pub start: f64,
    pub stop: f64,
    pub samples: usize,
    pub noise_std: f64,
    pub seed: u64,
}

impl Default for SyntheticScan {
    fn default() -> Self {
        Self {
            start: -20.0,
            stop: 20.0,
            samples: 81,
            noise_std: 0.0,
            seed: 42,
        }
    }
}

impl SyntheticScan {
    fn positions(&self) -> Result<Vec<f64>> {
        if self.samples < 2 {
            return Err(AnalysisError::invalid(format!(
                "a synthetic scan needs at least 2 samples, got {}",
                self.samples
            )));
        }
        let step = (self.stop - self.start) / (self.samples - 1) as f64;
        Ok((0..self.samples).map(|i| self.start + step * i as f64).collect())
    }

    fn sample<F: Fn(f64) -> f64>(&self, signal: F) -> Result<Scan> {
        let positions = self.positions()?;
        let noise = Normal::new(0.0, self.noise_std)
            .map_err(|e| AnalysisError::invalid(format!("noise standard deviation: {}", e)))?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let intensities = positions
            .iter()
            .map(|&x| signal(x) + if self.noise_std > 0.0 { noise.sample(&mut rng) } else { 0.0 })
            .collect();
        Scan::new(positions, intensities)
    }

    /// Gaussian peak of height `amplitude` above `baseline`.
    pub fn rocking_curve(
        &self,
        center: f64,
        amplitude: f64,
        baseline: f64,
        spread: f64,
    ) -> Result<Scan> {
        self.sample(|x| baseline + amplitude * gaussian_peak(x, center, spread))
    }

    /// Beam cut by an edge at `edge`: `open_level` before it, `closed_level` after.
    pub fn knife_edge(
        &self,
        edge: f64,
        open_level: f64,
        closed_level: f64,
        sharpness: f64,
    ) -> Result<Scan> {
        self.sample(|x| {
            let blocked = 1.0 / (1.0 + (-(x - edge) * sharpness).exp());
            open_level + (closed_level - open_level) * blocked
        })
    }
}
