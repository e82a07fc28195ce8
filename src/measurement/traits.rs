use super::types::{MeasurementContext, MeasurementReport};
use crate::algorithms::SmoothingParams;
use crate::data::{ResultTable, Scan};
use crate::logging::MeasurementSpan;
use crate::Result;

/// A derived measurement computed from one scan and, for multi-scan
/// procedures, the table accumulated by earlier calls
pub trait ScanMeasurement: Send + Sync {
    /// Returns the name of the measurement
    fn name(&self) -> &'static str;

    /// Smoothing applied to every scan before feature extraction
    fn smoothing(&self) -> SmoothingParams;

    /// Columns of the accumulated result table; empty for single-scan measurements
    fn columns(&self) -> &'static [&'static str] {
        &[]
    }

    /// Check the measurement parameters before touching any data
    fn validate(&self) -> Result<()> {
        self.smoothing().validate()
    }

    /// Analyse `scan`, appending to `table` (or starting one when absent)
    fn measure(
        &self,
        scan: &Scan,
        context: &MeasurementContext<'_>,
        table: Option<ResultTable>,
        span: &MeasurementSpan,
    ) -> Result<MeasurementReport>;
}
