//! Crystal angle measurements from repeated rocking-curve scans
//!
//! Every scan is a W (rotation) sweep. Its FWHM center is the Bragg
//! position, recorded together with the Y/Z axis position at which the scan
//! was taken. Fitting W against Y gives the bending of the crystal, W
//! against Z its torsion; two series taken 180° apart give the miscut.

use super::types::columns::{PEAK_VALUE, W_POSITION, Y_POSITION, Z_POSITION};
use super::{
    once_complete, Axis, MeasurementContext, MeasurementReport, Outcome, RockingCurve,
    ScanMeasurement,
};
use crate::algorithms::{fit_line, stats, LinearFit, SmoothingParams};
use crate::data::{ResultTable, Scan};
use crate::logging::MeasurementSpan;
use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

const BENDING_COLUMNS: [&str; 3] = [PEAK_VALUE, Y_POSITION, W_POSITION];
const TORSION_COLUMNS: [&str; 4] = [PEAK_VALUE, Y_POSITION, Z_POSITION, W_POSITION];
const MISCUT_COLUMNS: [&str; 3] = [PEAK_VALUE, Y_POSITION, W_POSITION];

/// Line through the Bragg positions and the angle derived from its slope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleFit {
    pub fit: LinearFit,
    pub angle: f64,
}

/// Per-position and mean miscut between the 0° and 180° series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiscutAngles {
    pub per_row: Vec<f64>,
    pub mean: f64,
}

/// `slope(w vs y) · crystal_thickness`
pub fn bending_angle(
    y_positions: &[f64],
    w_positions: &[f64],
    crystal_thickness: f64,
) -> Result<AngleFit> {
    validate_thickness(crystal_thickness)?;
    let fit = fit_line(y_positions, w_positions)?;
    Ok(AngleFit {
        fit,
        angle: fit.slope * crystal_thickness,
    })
}

/// `slope(w vs z)`, a pure angular ratio.
pub fn torsion_angle(z_positions: &[f64], w_positions: &[f64]) -> Result<AngleFit> {
    let fit = fit_line(z_positions, w_positions)?;
    Ok(AngleFit { fit, angle: fit.slope })
}

/// `(w0_i - w180_i) / 2` per row, and the mean over all rows.
pub fn miscut_angles(w_reference: &[f64], w_current: &[f64]) -> Result<MiscutAngles> {
    if w_reference.len() != w_current.len() {
        return Err(AnalysisError::IncompatibleTables {
            reference: w_reference.len(),
            current: w_current.len(),
        });
    }
    let per_row: Vec<f64> = w_reference
        .iter()
        .zip(w_current)
        .map(|(w0, w180)| (w0 - w180) / 2.0)
        .collect();
    let mean = stats::mean(&per_row)
        .ok_or_else(|| AnalysisError::invalid("miscut needs at least one row"))?;
    Ok(MiscutAngles { per_row, mean })
}

fn validate_thickness(thickness: f64) -> Result<()> {
    if !thickness.is_finite() || thickness <= 0.0 {
        return Err(AnalysisError::invalid(format!(
            "crystal thickness must be positive, got {}",
            thickness
        )));
    }
    Ok(())
}

fn validate_min_rows(min_rows: usize) -> Result<()> {
    if min_rows < 2 {
        return Err(AnalysisError::invalid(format!(
            "an angle fit needs at least 2 rows, configured {}",
            min_rows
        )));
    }
    Ok(())
}

/// Bending angle from W vs Y over repeated scans
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BendingAngle {
    pub smoothing: SmoothingParams,
    pub crystal_thickness: f64,
    pub min_rows: usize,
}

impl Default for BendingAngle {
    fn default() -> Self {
        Self {
            smoothing: SmoothingParams::new(11, 3),
            crystal_thickness: 1.0,
            min_rows: 3,
        }
    }
}

impl ScanMeasurement for BendingAngle {
    fn name(&self) -> &'static str {
        "bending_angle"
    }

    fn smoothing(&self) -> SmoothingParams {
        self.smoothing
    }

    fn columns(&self) -> &'static [&'static str] {
        &BENDING_COLUMNS
    }

    fn validate(&self) -> Result<()> {
        self.smoothing.validate()?;
        validate_thickness(self.crystal_thickness)?;
        validate_min_rows(self.min_rows)
    }

    fn measure(
        &self,
        scan: &Scan,
        context: &MeasurementContext<'_>,
        table: Option<ResultTable>,
        span: &MeasurementSpan,
    ) -> Result<MeasurementReport> {
        let y = context.axes.require(Axis::Y)?;
        let curve = RockingCurve::analyse(scan, self.smoothing, span)?;
        let row = vec![curve.peak_value, y, curve.fwhm.center];
        let table = ResultTable::append_or_start(table, self.columns(), row.clone())?;

        let outcome = once_complete(&table, self.min_rows, span, |table| {
            let bending = bending_angle(
                &table.column(Y_POSITION)?,
                &table.column(W_POSITION)?,
                self.crystal_thickness,
            )?;
            span.record_fit("w_vs_y", &bending.fit);
            Ok(Outcome::BendingAngle {
                slope: bending.fit.slope,
                bending_angle: bending.angle,
            })
        });
        Ok(curve.report(self.name(), row, table, outcome))
    }
}

/// Torsion angle from W vs Z over repeated scans
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorsionAngle {
    pub smoothing: SmoothingParams,
    pub min_rows: usize,
}

impl Default for TorsionAngle {
    fn default() -> Self {
        Self {
            smoothing: SmoothingParams::new(11, 3),
            min_rows: 3,
        }
    }
}

impl ScanMeasurement for TorsionAngle {
    fn name(&self) -> &'static str {
        "torsion_angle"
    }

    fn smoothing(&self) -> SmoothingParams {
        self.smoothing
    }

    fn columns(&self) -> &'static [&'static str] {
        &TORSION_COLUMNS
    }

    fn validate(&self) -> Result<()> {
        self.smoothing.validate()?;
        validate_min_rows(self.min_rows)
    }

    fn measure(
        &self,
        scan: &Scan,
        context: &MeasurementContext<'_>,
        table: Option<ResultTable>,
        span: &MeasurementSpan,
    ) -> Result<MeasurementReport> {
        let y = context.axes.require(Axis::Y)?;
        let z = context.axes.require(Axis::Z)?;
        let curve = RockingCurve::analyse(scan, self.smoothing, span)?;
        let row = vec![curve.peak_value, y, z, curve.fwhm.center];
        let table = ResultTable::append_or_start(table, self.columns(), row.clone())?;

        let outcome = once_complete(&table, self.min_rows, span, |table| {
            let torsion = torsion_angle(&table.column(Z_POSITION)?, &table.column(W_POSITION)?)?;
            span.record_fit("w_vs_z", &torsion.fit);
            Ok(Outcome::TorsionAngle {
                torsion_angle: torsion.angle,
            })
        });
        Ok(curve.report(self.name(), row, table, outcome))
    }
}

/// Miscut angle of a 180° series against its 0° reference series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MiscutAngle {
    pub smoothing: SmoothingParams,
}

impl Default for MiscutAngle {
    fn default() -> Self {
        Self {
            smoothing: SmoothingParams::new(11, 3),
        }
    }
}

impl ScanMeasurement for MiscutAngle {
    fn name(&self) -> &'static str {
        "miscut_angle"
    }

    fn smoothing(&self) -> SmoothingParams {
        self.smoothing
    }

    fn columns(&self) -> &'static [&'static str] {
        &MISCUT_COLUMNS
    }

    fn measure(
        &self,
        scan: &Scan,
        context: &MeasurementContext<'_>,
        table: Option<ResultTable>,
        span: &MeasurementSpan,
    ) -> Result<MeasurementReport> {
        let reference = context.reference.ok_or_else(|| {
            AnalysisError::invalid("miscut needs the table of the 0° scan series")
        })?;
        let w_reference = reference.column(W_POSITION)?;
        let y = context.axes.require(Axis::Y)?;

        let curve = RockingCurve::analyse(scan, self.smoothing, span)?;
        let row = vec![curve.peak_value, y, curve.fwhm.center];
        let table = ResultTable::append_or_start(table, self.columns(), row.clone())?;

        let outcome = once_complete(&table, w_reference.len(), span, |table| {
            let miscut = miscut_angles(&w_reference, &table.column(W_POSITION)?)?;
            Ok(Outcome::MiscutAngle {
                per_row: miscut.per_row,
                mean: miscut.mean,
            })
        });
        Ok(curve.report(self.name(), row, table, outcome))
    }
}
