//! Scan features built on smoothing and crossing detection
//!
//! - FWHM pair and center of a peaked rocking curve
//! - Half-max position between two plateau levels (knife-edge style scans)
//! - Signal value read at an arbitrary position

use super::crossings::{interpolate, no_crossing, sign_changes};
use super::{stats, validate_pair};
use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Full width at half maximum of a peaked signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FwhmResult {
    pub left: f64,
    pub right: f64,
    pub center: f64,
    /// `|right - left|`
    pub width: f64,
    pub max: f64,
    pub min: f64,
    pub half_level: f64,
}

/// Single crossing of the midpoint between two reference levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HalfMaxCrossing {
    pub position: f64,
    pub level: f64,
    pub level_start: f64,
    pub level_end: f64,
}

/// How the two plateau levels of an edge scan are measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlateauReference {
    /// Mean of the first `head` and of the last `tail` samples
    HeadAndTail { head: usize, tail: usize },
    /// Mean of the first `count` samples against a fully closed (zero) beam
    HeadOnly { count: usize },
}

/// FWHM of `y` using `half = (max + min) / 2`.
///
/// The first two crossings in index order form the pair; later crossings from
/// noise are ignored. Fewer than two is `InsufficientCrossings`.
pub fn fwhm_center(x: &[f64], y: &[f64]) -> Result<FwhmResult> {
    validate_pair(x, y, 2)?;
    let (min, max) = stats::extent(y).ok_or_else(|| AnalysisError::invalid("empty signal"))?;
    let half_level = (max + min) / 2.0;

    let brackets = sign_changes(y, half_level);
    if brackets.len() < 2 {
        return Err(AnalysisError::InsufficientCrossings {
            required: 2,
            found: brackets.len(),
            level: half_level,
        });
    }
    let left = interpolate(y, x, brackets[0], half_level);
    let right = interpolate(y, x, brackets[1], half_level);
    if brackets.len() > 2 {
        tracing::debug!(
            crossings = brackets.len(),
            "more than two half-max crossings, using the first pair"
        );
    }

    Ok(FwhmResult {
        left,
        right,
        center: (left + right) / 2.0,
        width: (right - left).abs(),
        max,
        min,
        half_level,
    })
}

/// First position where `y` crosses `(level_start + level_end) / 2`.
pub fn half_max_from_levels(
    x: &[f64],
    y: &[f64],
    level_start: f64,
    level_end: f64,
) -> Result<HalfMaxCrossing> {
    validate_pair(x, y, 2)?;
    let level = (level_start + level_end) / 2.0;
    let bracket = sign_changes(y, level)
        .into_iter()
        .next()
        .ok_or_else(|| no_crossing(y, level))?;

    Ok(HalfMaxCrossing {
        position: interpolate(y, x, bracket, level),
        level,
        level_start,
        level_end,
    })
}

/// Signal value at `x_pos`, interpolated between the bracketing samples.
pub fn peak_value_at(x: &[f64], y: &[f64], x_pos: f64) -> Result<f64> {
    super::value_at_vertical_line(x, y, x_pos)
}

/// Start and end reference levels of an edge scan.
pub fn plateau_levels(signal: &[f64], reference: PlateauReference) -> Result<(f64, f64)> {
    let head_mean = |count: usize| -> Result<f64> {
        if count == 0 || count > signal.len() {
            return Err(AnalysisError::invalid(format!(
                "plateau of {} samples does not fit a signal of {}",
                count,
                signal.len()
            )));
        }
        stats::mean(&signal[..count]).ok_or_else(|| AnalysisError::invalid("empty plateau"))
    };

    match reference {
        PlateauReference::HeadAndTail { head, tail } => {
            let start = head_mean(head)?;
            if tail == 0 || tail > signal.len() {
                return Err(AnalysisError::invalid(format!(
                    "plateau of {} samples does not fit a signal of {}",
                    tail,
                    signal.len()
                )));
            }
            let end = stats::mean(&signal[signal.len() - tail..])
                .ok_or_else(|| AnalysisError::invalid("empty plateau"))?;
            Ok((start, end))
        }
        PlateauReference::HeadOnly { count } => Ok((head_mean(count)?, 0.0)),
    }
}
