//! Structured spans for measurement execution

use crate::algorithms::{FwhmResult, HalfMaxCrossing, LinearFit};
use std::time::Instant;
use tracing::{field, span, Level, Span};
use uuid::Uuid;

/// Span covering one measurement over one scan
pub struct MeasurementSpan {
    span: Span,
    start_time: Instant,
    procedure: String,
}

impl MeasurementSpan {
    /// Create a new measurement span; the scan context of the thread is attached when set.
    pub fn new(procedure: &str, samples: usize, correlation_id: Option<Uuid>) -> Self {
        let source = crate::logging::get_scan_context().map(|context| context.source);
        let span = span!(
            Level::INFO,
            "measurement",
            procedure = procedure,
            samples = samples,
            scan = source.as_deref(),
            correlation_id = correlation_id.map(|id| id.to_string()).as_deref(),
            center = field::Empty,
            fwhm = field::Empty,
            slope = field::Empty,
            table_rows = field::Empty,
            success = field::Empty,
            execution_time_us = field::Empty
        );

        Self {
            span,
            start_time: Instant::now(),
            procedure: procedure.to_string(),
        }
    }

    /// Record the FWHM of the smoothed rocking curve
    pub fn record_fwhm(&self, fwhm: &FwhmResult) {
        self.span.record("center", fwhm.center);
        self.span.record("fwhm", fwhm.width);
        tracing::debug!(
            parent: &self.span,
            left = fwhm.left,
            right = fwhm.right,
            center = fwhm.center,
            half_level = fwhm.half_level,
            "FWHM extracted"
        );
    }

    /// Record a half-max crossing between two plateau levels
    pub fn record_half_max(&self, crossing: &HalfMaxCrossing) {
        self.span.record("center", crossing.position);
        tracing::debug!(
            parent: &self.span,
            position = crossing.position,
            level_start = crossing.level_start,
            level_end = crossing.level_end,
            "half-max crossing located"
        );
    }

    pub fn record_fit(&self, label: &str, fit: &LinearFit) {
        self.span.record("slope", fit.slope);
        tracing::debug!(
            parent: &self.span,
            fit = label,
            slope = fit.slope,
            intercept = fit.intercept,
            "line fitted"
        );
    }

    /// Record the size of the accumulated result table
    pub fn record_table(&self, rows: usize, required: Option<usize>) {
        self.span.record("table_rows", rows);
        tracing::debug!(
            parent: &self.span,
            rows = rows,
            required = required,
            "result table updated"
        );
    }

    /// Record the final outcome
    pub fn record_result(&self, success: bool, description: &str) {
        let duration = self.start_time.elapsed();
        self.span.record("success", success);
        self.span.record("execution_time_us", duration.as_micros() as u64);

        if success {
            tracing::info!(
                parent: &self.span,
                procedure = %self.procedure,
                execution_time_us = duration.as_micros() as u64,
                description = description,
                "measurement completed"
            );
        } else {
            tracing::warn!(
                parent: &self.span,
                procedure = %self.procedure,
                description = description,
                "measurement failed"
            );
        }
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}
