//! Single-scan center searches and the open-beam reference

use super::types::columns::OPEN_BEAM_VALUE;
use super::{MeasurementContext, MeasurementReport, Outcome, RockingCurve, ScanMeasurement};
use crate::algorithms::{half_max_from_levels, plateau_levels, PlateauReference, SmoothingParams};
use crate::data::{ResultTable, Scan};
use crate::logging::MeasurementSpan;
use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

const OPEN_BEAM_COLUMNS: [&str; 1] = [OPEN_BEAM_VALUE];

/// Center of a peaked scan as the midpoint of its FWHM crossings
///
/// Used for the source/sensor alignment, the slit linear axis, the
/// monochromator Bragg peak and the crystal X/Z rocking curves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FwhmCenter {
    pub smoothing: SmoothingParams,
}

impl Default for FwhmCenter {
    fn default() -> Self {
        Self {
            smoothing: SmoothingParams::new(11, 3),
        }
    }
}

impl ScanMeasurement for FwhmCenter {
    fn name(&self) -> &'static str {
        "fwhm_center"
    }

    fn smoothing(&self) -> SmoothingParams {
        self.smoothing
    }

    fn measure(
        &self,
        scan: &Scan,
        _context: &MeasurementContext<'_>,
        _table: Option<ResultTable>,
        span: &MeasurementSpan,
    ) -> Result<MeasurementReport> {
        let curve = RockingCurve::analyse(scan, self.smoothing, span)?;
        let outcome = Outcome::FwhmCenter {
            center: curve.fwhm.center,
            left: curve.fwhm.left,
            right: curve.fwhm.right,
            fwhm: curve.fwhm.width,
            peak_value: curve.peak_value,
        };
        Ok(MeasurementReport {
            procedure: self.name().to_string(),
            smoothed: curve.smoothed,
            appended_row: None,
            table: None,
            outcome,
        })
    }
}

/// Position where an edge scan passes halfway between its two plateaus
///
/// Used where the beam is progressively blocked (monochromator linear and
/// rotational axes, crystal X/Z edges), so the scan has no peak to take the
/// FWHM of.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsymmetricHalfMax {
    pub smoothing: SmoothingParams,
    pub plateau: PlateauReference,
}

impl Default for AsymmetricHalfMax {
    fn default() -> Self {
        Self {
            smoothing: SmoothingParams::new(7, 2),
            plateau: PlateauReference::HeadAndTail { head: 5, tail: 5 },
        }
    }
}

impl ScanMeasurement for AsymmetricHalfMax {
    fn name(&self) -> &'static str {
        "asymmetric_half_max"
    }

    fn smoothing(&self) -> SmoothingParams {
        self.smoothing
    }

    fn validate(&self) -> Result<()> {
        self.smoothing.validate()?;
        match self.plateau {
            PlateauReference::HeadAndTail { head, tail } if head == 0 || tail == 0 => {
                Err(AnalysisError::invalid("plateau sample counts must be positive"))
            }
            PlateauReference::HeadOnly { count } if count == 0 => {
                Err(AnalysisError::invalid("plateau sample count must be positive"))
            }
            _ => Ok(()),
        }
    }

    fn measure(
        &self,
        scan: &Scan,
        _context: &MeasurementContext<'_>,
        _table: Option<ResultTable>,
        span: &MeasurementSpan,
    ) -> Result<MeasurementReport> {
        let smoothed = scan.smoothed(self.smoothing)?;
        let (level_start, level_end) = plateau_levels(&smoothed, self.plateau)?;
        let crossing = half_max_from_levels(scan.positions(), &smoothed, level_start, level_end)?;
        span.record_half_max(&crossing);

        Ok(MeasurementReport {
            procedure: self.name().to_string(),
            smoothed,
            appended_row: None,
            table: None,
            outcome: Outcome::HalfMaxPosition {
                position: crossing.position,
                level: crossing.level,
                level_start: crossing.level_start,
                level_end: crossing.level_end,
            },
        })
    }
}

/// Intensity of the unobstructed beam at its FWHM center
///
/// The latest row of the resulting table is the reference for
/// [`FineYAlignment`](super::FineYAlignment).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenBeamReference {
    pub smoothing: SmoothingParams,
}

impl Default for OpenBeamReference {
    fn default() -> Self {
        Self {
            smoothing: SmoothingParams::new(11, 3),
        }
    }
}

/// Latest open-beam value recorded in `table`.
pub fn latest_open_beam_value(table: &ResultTable) -> Result<f64> {
    let index = table.column_index(OPEN_BEAM_VALUE)?;
    table
        .last_row()
        .map(|row| row[index])
        .ok_or_else(|| AnalysisError::invalid("open beam table has no rows"))
}

impl ScanMeasurement for OpenBeamReference {
    fn name(&self) -> &'static str {
        "open_beam_reference"
    }

    fn smoothing(&self) -> SmoothingParams {
        self.smoothing
    }

    fn columns(&self) -> &'static [&'static str] {
        &OPEN_BEAM_COLUMNS
    }

    fn measure(
        &self,
        scan: &Scan,
        _context: &MeasurementContext<'_>,
        table: Option<ResultTable>,
        span: &MeasurementSpan,
    ) -> Result<MeasurementReport> {
        let curve = RockingCurve::analyse(scan, self.smoothing, span)?;
        let row = vec![curve.peak_value];
        let table = ResultTable::append_or_start(table, self.columns(), row.clone())?;
        span.record_table(table.len(), None);
        let outcome = Outcome::OpenBeam {
            value: curve.peak_value,
        };
        Ok(curve.report(self.name(), row, table, outcome))
    }
}
