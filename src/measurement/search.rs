//! Optimum searches over a series of scans at stepped axis positions
//!
//! Each scan contributes one row; after every scan the whole table is
//! searched again for the row minimizing (or, for the slit, maximizing) the
//! figure of merit.

use super::types::columns::{
    CENTER_PEAK_VALUE, FIT_SLOPE, FWHM, OMEGA_POSITION, ROTATIONAL_POSITION, SLOPE_1, SLOPE_2,
    SLOPE_DIFFERENCE, STEPPER_X_POSITION, W_POSITION, X_POSITION, Y_POSITION,
};
use super::{
    once_complete, settle, Axis, Closeness, MeasurementContext, MeasurementReport, Outcome,
    RockingCurve, ScanMeasurement,
};
use crate::algorithms::{
    fit_line, fwhm_center, stats, DualRegionFit, FitRange, OutlierFilter, SmoothingParams,
};
use crate::data::{ResultTable, Scan};
use crate::logging::MeasurementSpan;
use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

const CRYSTAL_SLOPE_COLUMNS: [&str; 5] =
    [SLOPE_1, SLOPE_2, SLOPE_DIFFERENCE, Y_POSITION, W_POSITION];
const MONOCHROMATOR_SLOPE_COLUMNS: [&str; 5] =
    [SLOPE_1, SLOPE_2, SLOPE_DIFFERENCE, STEPPER_X_POSITION, OMEGA_POSITION];
const FINE_Y_COLUMNS: [&str; 3] = [CENTER_PEAK_VALUE, Y_POSITION, W_POSITION];
const SLIT_COLUMNS: [&str; 3] = [FWHM, STEPPER_X_POSITION, ROTATIONAL_POSITION];
const BEAM_OFFSET_COLUMNS: [&str; 3] = [FIT_SLOPE, W_POSITION, X_POSITION];

/// Minimum of the slope difference over a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlopeSearchResult {
    /// Row of the minimum in the full table
    pub index: usize,
    pub secondary_position: f64,
    pub center: f64,
    pub slope_difference: f64,
    /// Sample standard deviation of the inlier differences
    pub std_dev: Option<f64>,
    pub inliers: usize,
}

/// `argmin(diffs)` over the inliers of `filter` (all rows when `None`).
///
/// The first minimum wins on ties.
pub fn slope_difference_optimum(
    diffs: &[f64],
    secondary: &[f64],
    centers: &[f64],
    filter: Option<&OutlierFilter>,
) -> Result<SlopeSearchResult> {
    if diffs.len() != secondary.len() || diffs.len() != centers.len() {
        return Err(AnalysisError::invalid("slope search columns differ in length"));
    }
    let keep = match filter {
        Some(filter) => filter.classify(diffs)?,
        None => vec![true; diffs.len()],
    };
    let candidates: Vec<(usize, f64)> = diffs
        .iter()
        .enumerate()
        .filter(|(i, _)| keep[*i])
        .map(|(i, &d)| (i, d))
        .collect();

    let values: Vec<f64> = candidates.iter().map(|&(_, d)| d).collect();
    let best = stats::argmin(&values)
        .ok_or_else(|| AnalysisError::invalid("no slope differences to search"))?;
    let index = candidates[best].0;

    Ok(SlopeSearchResult {
        index,
        secondary_position: secondary[index],
        center: centers[index],
        slope_difference: diffs[index],
        std_dev: stats::sample_std_dev(&values),
        inliers: values.len(),
    })
}

/// Which device a slope-difference search aligns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeSearchTarget {
    /// Crystal W sweeps stepped along Y
    CrystalYW,
    /// Monochromator omega sweeps stepped along X
    MonochromatorRotational,
}

impl SlopeSearchTarget {
    pub fn secondary_axis(&self) -> Axis {
        match self {
            SlopeSearchTarget::CrystalYW => Axis::Y,
            SlopeSearchTarget::MonochromatorRotational => Axis::X,
        }
    }

    fn columns(&self) -> &'static [&'static str] {
        match self {
            SlopeSearchTarget::CrystalYW => &CRYSTAL_SLOPE_COLUMNS,
            SlopeSearchTarget::MonochromatorRotational => &MONOCHROMATOR_SLOPE_COLUMNS,
        }
    }
}

/// Secondary-axis position where both flanks of the rocking curve mirror
/// each other (`|slope1 + slope2|` smallest)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeDifferenceSearch {
    pub smoothing: SmoothingParams,
    pub target: SlopeSearchTarget,
    pub first: FitRange,
    pub second: FitRange,
    /// IQR fence multiplier; `None` keeps every row
    pub outlier_fence: Option<f64>,
}

impl Default for SlopeDifferenceSearch {
    fn default() -> Self {
        Self {
            smoothing: SmoothingParams::new(11, 3),
            target: SlopeSearchTarget::CrystalYW,
            first: FitRange::Head(12),
            second: FitRange::Tail(12),
            outlier_fence: Some(1.5),
        }
    }
}

impl SlopeDifferenceSearch {
    /// Monochromator rotational search: same fits, no outlier rejection.
    pub fn monochromator() -> Self {
        Self {
            target: SlopeSearchTarget::MonochromatorRotational,
            outlier_fence: None,
            ..Self::default()
        }
    }

    fn filter(&self) -> Result<Option<OutlierFilter>> {
        self.outlier_fence.map(OutlierFilter::new).transpose()
    }
}

impl ScanMeasurement for SlopeDifferenceSearch {
    fn name(&self) -> &'static str {
        "slope_difference_search"
    }

    fn smoothing(&self) -> SmoothingParams {
        self.smoothing
    }

    fn columns(&self) -> &'static [&'static str] {
        self.target.columns()
    }

    fn validate(&self) -> Result<()> {
        self.smoothing.validate()?;
        self.filter().map(|_| ())
    }

    fn measure(
        &self,
        scan: &Scan,
        context: &MeasurementContext<'_>,
        table: Option<ResultTable>,
        span: &MeasurementSpan,
    ) -> Result<MeasurementReport> {
        let secondary = context.axes.require(self.target.secondary_axis())?;
        let curve = RockingCurve::analyse(scan, self.smoothing, span)?;
        let flanks =
            DualRegionFit::compute(scan.positions(), &curve.smoothed, self.first, self.second)?;
        span.record_fit("first_flank", &flanks.first);
        span.record_fit("second_flank", &flanks.second);

        let row = vec![
            flanks.first.slope,
            flanks.second.slope,
            flanks.slope_difference,
            secondary,
            curve.fwhm.center,
        ];
        let table = ResultTable::append_or_start(table, self.columns(), row.clone())?;
        span.record_table(table.len(), None);

        let columns = self.columns();
        let outcome = settle(|| {
            let optimum = slope_difference_optimum(
                &table.column(SLOPE_DIFFERENCE)?,
                &table.column(columns[3])?,
                &table.column(columns[4])?,
                self.filter()?.as_ref(),
            )?;
            tracing::debug!(
                row = optimum.index,
                inliers = optimum.inliers,
                rows = table.len(),
                "slope difference minimum"
            );
            Ok(Outcome::SlopeDifferenceOptimum {
                secondary_position: optimum.secondary_position,
                center: optimum.center,
                slope_difference: optimum.slope_difference,
                std_dev: optimum.std_dev,
                inliers: optimum.inliers,
            })
        });
        Ok(curve.report(self.name(), row, table, outcome))
    }
}

/// Row whose peak value is closest to half the open beam
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FineYResult {
    pub index: usize,
    pub y_position: f64,
    pub peak_value: f64,
    /// `peak_value - open_beam / 2`
    pub deviation: f64,
}

/// Picks the Y position where the crystal cuts the beam to half intensity.
pub fn fine_y_position(
    peaks: &[f64],
    y_positions: &[f64],
    open_beam: f64,
    closeness: Closeness,
) -> Result<FineYResult> {
    if peaks.len() != y_positions.len() {
        return Err(AnalysisError::invalid("fine alignment columns differ in length"));
    }
    if !open_beam.is_finite() {
        return Err(AnalysisError::invalid(format!(
            "open beam value must be finite, got {}",
            open_beam
        )));
    }
    let threshold = open_beam / 2.0;
    let ranked: Vec<f64> = peaks
        .iter()
        .map(|peak| match closeness {
            Closeness::Signed => peak - threshold,
            Closeness::Absolute => (peak - threshold).abs(),
        })
        .collect();
    let index = stats::argmin(&ranked).ok_or_else(|| AnalysisError::invalid("no rows to rank"))?;

    Ok(FineYResult {
        index,
        y_position: y_positions[index],
        peak_value: peaks[index],
        deviation: peaks[index] - threshold,
    })
}

/// Fine Y alignment against the open-beam intensity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FineYAlignment {
    pub smoothing: SmoothingParams,
    pub steps_required: usize,
    pub open_beam_value: f64,
    pub closeness: Closeness,
}

impl Default for FineYAlignment {
    fn default() -> Self {
        Self {
            smoothing: SmoothingParams::new(11, 3),
            steps_required: 5,
            open_beam_value: 0.0,
            closeness: Closeness::Signed,
        }
    }
}

impl ScanMeasurement for FineYAlignment {
    fn name(&self) -> &'static str {
        "fine_y_alignment"
    }

    fn smoothing(&self) -> SmoothingParams {
        self.smoothing
    }

    fn columns(&self) -> &'static [&'static str] {
        &FINE_Y_COLUMNS
    }

    fn validate(&self) -> Result<()> {
        self.smoothing.validate()?;
        if self.steps_required == 0 {
            return Err(AnalysisError::invalid("fine alignment needs at least one step"));
        }
        if !self.open_beam_value.is_finite() || self.open_beam_value <= 0.0 {
            return Err(AnalysisError::invalid(format!(
                "open beam value must be positive, got {}",
                self.open_beam_value
            )));
        }
        Ok(())
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

        let outcome = once_complete(&table, self.steps_required, span, |table| {
            let best = fine_y_position(
                &table.column(CENTER_PEAK_VALUE)?,
                &table.column(Y_POSITION)?,
                self.open_beam_value,
                self.closeness,
            )?;
            Ok(Outcome::FineYPosition {
                y_position: best.y_position,
                peak_value: best.peak_value,
            })
        });
        Ok(curve.report(self.name(), row, table, outcome))
    }
}

/// Row of maximum FWHM
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlitOptimum {
    pub index: usize,
    pub fwhm: f64,
    pub x_position: f64,
    pub rotation: f64,
}

/// The slit is aligned where its transmitted profile is widest; first maximum on ties.
pub fn slit_optimum(fwhm: &[f64], x_positions: &[f64], rotations: &[f64]) -> Result<SlitOptimum> {
    if fwhm.len() != x_positions.len() || fwhm.len() != rotations.len() {
        return Err(AnalysisError::invalid("slit columns differ in length"));
    }
    let index =
        stats::argmax(fwhm).ok_or_else(|| AnalysisError::invalid("no slit scans recorded"))?;
    Ok(SlitOptimum {
        index,
        fwhm: fwhm[index],
        x_position: x_positions[index],
        rotation: rotations[index],
    })
}

/// Slit linear sweeps at stepped rotational positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlitMaxFwhm {
    pub smoothing: SmoothingParams,
}

impl Default for SlitMaxFwhm {
    fn default() -> Self {
        Self {
            smoothing: SmoothingParams::new(11, 3),
        }
    }
}

impl ScanMeasurement for SlitMaxFwhm {
    fn name(&self) -> &'static str {
        "slit_max_fwhm"
    }

    fn smoothing(&self) -> SmoothingParams {
        self.smoothing
    }

    fn columns(&self) -> &'static [&'static str] {
        &SLIT_COLUMNS
    }

    fn measure(
        &self,
        scan: &Scan,
        context: &MeasurementContext<'_>,
        table: Option<ResultTable>,
        span: &MeasurementSpan,
    ) -> Result<MeasurementReport> {
        let rotation = context.axes.require(Axis::Rotation)?;
        let smoothed = scan.smoothed(self.smoothing)?;
        let fwhm = fwhm_center(scan.positions(), &smoothed)?;
        span.record_fwhm(&fwhm);

        let row = vec![fwhm.width, fwhm.center, rotation];
        let table = ResultTable::append_or_start(table, self.columns(), row.clone())?;
        span.record_table(table.len(), None);
        let outcome = settle(|| {
            let best = slit_optimum(
                &table.column(FWHM)?,
                &table.column(STEPPER_X_POSITION)?,
                &table.column(ROTATIONAL_POSITION)?,
            )?;
            Ok(Outcome::SlitOptimum {
                x_position: best.x_position,
                rotation: best.rotation,
                fwhm: best.fwhm,
            })
        });

        Ok(MeasurementReport {
            procedure: self.name().to_string(),
            smoothed,
            appended_row: Some(row),
            table: Some(table),
            outcome,
        })
    }
}

/// Row of minimum fitted slope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamOffset {
    pub index: usize,
    pub slope: f64,
    pub w_position: f64,
    pub x_position: f64,
}

pub fn beam_offset_optimum(
    slopes: &[f64],
    w_positions: &[f64],
    x_positions: &[f64],
) -> Result<BeamOffset> {
    if slopes.len() != w_positions.len() || slopes.len() != x_positions.len() {
        return Err(AnalysisError::invalid("beam offset columns differ in length"));
    }
    let index =
        stats::argmin(slopes).ok_or_else(|| AnalysisError::invalid("no offset scans recorded"))?;
    Ok(BeamOffset {
        index,
        slope: slopes[index],
        w_position: w_positions[index],
        x_position: x_positions[index],
    })
}

/// Crystal W offset: Y sweeps at stepped W/X positions, each reduced to the
/// slope of one line through the whole smoothed scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamOffsetSearch {
    pub smoothing: SmoothingParams,
}

impl Default for BeamOffsetSearch {
    fn default() -> Self {
        Self {
            smoothing: SmoothingParams::new(11, 3),
        }
    }
}

impl ScanMeasurement for BeamOffsetSearch {
    fn name(&self) -> &'static str {
        "beam_offset_search"
    }

    fn smoothing(&self) -> SmoothingParams {
        self.smoothing
    }

    fn columns(&self) -> &'static [&'static str] {
        &BEAM_OFFSET_COLUMNS
    }

    fn measure(
        &self,
        scan: &Scan,
        context: &MeasurementContext<'_>,
        table: Option<ResultTable>,
        span: &MeasurementSpan,
    ) -> Result<MeasurementReport> {
        let w = context.axes.require(Axis::W)?;
        let x = context.axes.require(Axis::X)?;
        let smoothed = scan.smoothed(self.smoothing)?;
        let fit = fit_line(scan.positions(), &smoothed)?;
        span.record_fit("whole_scan", &fit);

        let row = vec![fit.slope, w, x];
        let table = ResultTable::append_or_start(table, self.columns(), row.clone())?;
        span.record_table(table.len(), None);
        let outcome = settle(|| {
            let best = beam_offset_optimum(
                &table.column(FIT_SLOPE)?,
                &table.column(W_POSITION)?,
                &table.column(X_POSITION)?,
            )?;
            Ok(Outcome::BeamOffset {
                w_position: best.w_position,
                x_position: best.x_position,
                slope: best.slope,
            })
        });

        Ok(MeasurementReport {
            procedure: self.name().to_string(),
            smoothed,
            appended_row: Some(row),
            table: Some(table),
            outcome,
        })
    }
}
