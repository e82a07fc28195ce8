use crate::algorithms::SmoothedSignal;
use crate::data::ResultTable;
use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column names of the accumulated result tables
pub mod columns {
    pub const PEAK_VALUE: &str = "Peak Value (au)";
    pub const Y_POSITION: &str = "Y-Axis Position (mm)";
    pub const Z_POSITION: &str = "Z-Axis Position (mm)";
    pub const X_POSITION: &str = "X-Axis Position (mm)";
    pub const W_POSITION: &str = "W-Axis Position (deg)";
    pub const SLOPE_1: &str = "Slope1";
    pub const SLOPE_2: &str = "Slope2";
    pub const SLOPE_DIFFERENCE: &str = "Difference Slopes";
    pub const FWHM: &str = "FWHM";
    pub const STEPPER_X_POSITION: &str = "X-Axis Position";
    pub const OMEGA_POSITION: &str = "Omega-Axis Position";
    pub const ROTATIONAL_POSITION: &str = "Rotational-Axis Position";
    pub const CENTER_PEAK_VALUE: &str = "Peak Value in center position (au)";
    pub const FIT_SLOPE: &str = "Slope of the linear fit";
    pub const OPEN_BEAM_VALUE: &str = "Fully Opened Beam Value (au)";
}

/// Motor axis whose position is recorded with a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
    W,
    Rotation,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::W => "W",
            Axis::Rotation => "rotational",
        };
        write!(f, "{}", name)
    }
}

/// Axis positions at which the current scan was taken
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisPositions {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub w: Option<f64>,
    pub rotation: Option<f64>,
}

impl AxisPositions {
    pub fn get(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::W => self.w,
            Axis::Rotation => self.rotation,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        let slot = match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
            Axis::W => &mut self.w,
            Axis::Rotation => &mut self.rotation,
        };
        *slot = Some(value);
    }

    /// Position of `axis`, which the measurement cannot do without.
    pub fn require(&self, axis: Axis) -> Result<f64> {
        match self.get(axis) {
            Some(value) if value.is_finite() => Ok(value),
            Some(value) => Err(AnalysisError::invalid(format!(
                "{} axis position must be finite, got {}",
                axis, value
            ))),
            None => Err(AnalysisError::invalid(format!(
                "the {} axis position of the scan is required",
                axis
            ))),
        }
    }
}

/// Per-call inputs besides the scan itself
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasurementContext<'a> {
    pub axes: AxisPositions,
    /// Reference table of a previous scan series (0° orientation for miscut)
    pub reference: Option<&'a ResultTable>,
}

impl<'a> MeasurementContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_axis(mut self, axis: Axis, value: f64) -> Self {
        self.axes.set(axis, value);
        self
    }

    pub fn with_reference(mut self, reference: &'a ResultTable) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// How fine Y alignment ranks peak values against half the open beam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Closeness {
    /// Smallest `peak - open_beam / 2`; favours the row furthest below the threshold
    #[default]
    Signed,
    /// Smallest `|peak - open_beam / 2|`
    Absolute,
}

/// Derived quantity of a measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// More scans are needed before the quantity can be derived
    Pending { rows: usize, required: usize },
    BendingAngle { slope: f64, bending_angle: f64 },
    TorsionAngle { torsion_angle: f64 },
    MiscutAngle { per_row: Vec<f64>, mean: f64 },
    FwhmCenter {
        center: f64,
        left: f64,
        right: f64,
        fwhm: f64,
        peak_value: f64,
    },
    HalfMaxPosition {
        position: f64,
        level: f64,
        level_start: f64,
        level_end: f64,
    },
    SlopeDifferenceOptimum {
        secondary_position: f64,
        center: f64,
        slope_difference: f64,
        std_dev: Option<f64>,
        inliers: usize,
    },
    FineYPosition { y_position: f64, peak_value: f64 },
    SlitOptimum { x_position: f64, rotation: f64, fwhm: f64 },
    BeamOffset { w_position: f64, x_position: f64, slope: f64 },
    OpenBeam { value: f64 },
    /// The scan was recorded but the table does not yield the quantity
    Failed { reason: String },
}

impl Outcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    /// One-line summary for logs and console output
    pub fn describe(&self) -> String {
        match self {
            Outcome::Pending { rows, required } => {
                format!("{} of {} scans recorded", rows, required)
            }
            Outcome::BendingAngle { slope, bending_angle } => {
                format!("bending angle {:.6} (slope {:.6})", bending_angle, slope)
            }
            Outcome::TorsionAngle { torsion_angle } => {
                format!("torsion angle {:.6}", torsion_angle)
            }
            Outcome::MiscutAngle { per_row, mean } => {
                format!("mean miscut angle {:.6} over {} positions", mean, per_row.len())
            }
            Outcome::FwhmCenter { center, fwhm, .. } => {
                format!("center {:.6}, FWHM {:.6}", center, fwhm)
            }
            Outcome::HalfMaxPosition { position, .. } => {
                format!("half-max position {:.6}", position)
            }
            Outcome::SlopeDifferenceOptimum {
                secondary_position,
                center,
                ..
            } => format!("optimum at {:.6} (center {:.6})", secondary_position, center),
            Outcome::FineYPosition { y_position, .. } => {
                format!("fine Y position {:.6}", y_position)
            }
            Outcome::SlitOptimum { x_position, rotation, .. } => {
                format!("slit center {:.6} at rotation {:.6}", x_position, rotation)
            }
            Outcome::BeamOffset { w_position, x_position, .. } => {
                format!("beam offset at W {:.6}, X {:.6}", w_position, x_position)
            }
            Outcome::OpenBeam { value } => format!("open beam value {:.6}", value),
            Outcome::Failed { reason } => format!("no result: {}", reason),
        }
    }
}

/// Everything a measurement hands back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementReport {
    pub procedure: String,
    /// Smoothed intensities, for plotting by the caller
    pub smoothed: SmoothedSignal,
    /// Row appended to the result table by this scan
    pub appended_row: Option<Vec<f64>>,
    /// Updated result table, for multi-scan measurements
    pub table: Option<ResultTable>,
    pub outcome: Outcome,
}
