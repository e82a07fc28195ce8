//! Sign-change crossing detection with linear interpolation
//!
//! A crossing of a reference value exists wherever `sign(v[i] - reference)`
//! changes between consecutive samples. The crossing position is linearly
//! interpolated between the two bracketing samples; nothing is extrapolated
//! beyond the sampled range.
//!
//! Samples lying exactly on the reference are handled as a run: a run of
//! on-reference samples counts as one crossing, located at the first sample
//! of the run, and only if the signal actually changes side across it. A
//! signal that touches the reference and returns is not crossing it.

use super::{stats, validate_pair};
use crate::{AnalysisError, Result};

/// Bracket of one crossing: `lower == upper` when a sample hits the reference exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bracket {
    pub lower: usize,
    pub upper: usize,
}

fn side(value: f64, reference: f64) -> i8 {
    if value > reference {
        1
    } else if value < reference {
        -1
    } else {
        0
    }
}

/// All sign changes of `values` around `reference`, in index order.
pub(crate) fn sign_changes(values: &[f64], reference: f64) -> Vec<Bracket> {
    let mut brackets = Vec::new();
    let mut last_side = 0i8;
    let mut run_start: Option<usize> = None;

    for (i, &v) in values.iter().enumerate() {
        let s = side(v, reference);
        if s == 0 {
            run_start.get_or_insert(i);
            continue;
        }
        if last_side != 0 && s != last_side {
            let bracket = match run_start {
                Some(start) => Bracket { lower: start, upper: start },
                None => Bracket { lower: i - 1, upper: i },
            };
            brackets.push(bracket);
        }
        last_side = s;
        run_start = None;
    }
    brackets
}

/// Reads `to` at the point where `from` crosses `reference` inside `bracket`.
pub(crate) fn interpolate(from: &[f64], to: &[f64], bracket: Bracket, reference: f64) -> f64 {
    let Bracket { lower, upper } = bracket;
    if lower == upper {
        return to[lower];
    }
    to[lower] + (to[upper] - to[lower]) * (reference - from[lower]) / (from[upper] - from[lower])
}

pub(crate) fn no_crossing(values: &[f64], reference: f64) -> AnalysisError {
    let (min, max) = stats::extent(values).unwrap_or((f64::NAN, f64::NAN));
    AnalysisError::NoCrossingFound {
        target: reference,
        min,
        max,
    }
}

/// Interpolated x-positions where `y` crosses the horizontal line `y = level`.
///
/// Fails with `NoCrossingFound` when the level is never crossed. Callers that
/// need a specific number of crossings check the length themselves.
pub fn find_level_crossings(x: &[f64], y: &[f64], level: f64) -> Result<Vec<f64>> {
    validate_pair(x, y, 2)?;
    let crossings: Vec<f64> = sign_changes(y, level)
        .into_iter()
        .map(|bracket| interpolate(y, x, bracket, level))
        .collect();

    if crossings.is_empty() {
        return Err(no_crossing(y, level));
    }
    tracing::trace!(level, count = crossings.len(), "level crossings found");
    Ok(crossings)
}

/// Interpolated `y` where the x-sequence first crosses the vertical line `x = x_target`.
///
/// A sample placed exactly on the target also counts, so reading the signal at
/// the first or last sampled position is allowed.
pub fn value_at_vertical_line(x: &[f64], y: &[f64], x_target: f64) -> Result<f64> {
    validate_pair(x, y, 2)?;
    let crossing = sign_changes(x, x_target).into_iter().next();
    let exact = x.iter().position(|&v| v == x_target);

    let bracket = match (crossing, exact) {
        (Some(b), Some(i)) if i < b.lower => Bracket { lower: i, upper: i },
        (Some(b), _) => b,
        (None, Some(i)) => Bracket { lower: i, upper: i },
        (None, None) => return Err(no_crossing(x, x_target)),
    };
    Ok(interpolate(x, y, bracket, x_target))
}
