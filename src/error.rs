//! Error taxonomy for scan analysis
//!
//! Every failure of the numerical core is reported through [`AnalysisError`].
//! Nothing is retried or replaced by a default value; the caller decides
//! whether to skip a scan, change parameters, or abort the procedure.

use thiserror::Error;

/// Errors returned by the signal-processing primitives and measurements
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A parameter or input sequence violates a documented constraint
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Fewer sign changes than the algorithm needs (e.g. FWHM needs two)
    #[error("Expected {required} crossings of level {level}, found {found}")]
    InsufficientCrossings {
        required: usize,
        found: usize,
        level: f64,
    },

    /// The reference value is never crossed within the sampled domain
    #[error("No crossing of {target} within sampled range [{min}, {max}]")]
    NoCrossingFound { target: f64, min: f64, max: f64 },

    /// Miscut computation with reference and current tables of different length
    #[error("Incompatible tables: reference has {reference} rows, current has {current}")]
    IncompatibleTables { reference: usize, current: usize },

    /// Rank-deficient line fit
    #[error("Degenerate fit: {distinct} distinct x value(s) among {samples} samples")]
    DegenerateFit { distinct: usize, samples: usize },

    /// Result table lacks a column a measurement reads
    #[error("Result table is missing column '{0}'")]
    MissingColumn(String),

    /// Appended row does not match the table schema
    #[error("Row has {actual} values but table has {expected} columns")]
    RowWidth { expected: usize, actual: usize },
}

impl AnalysisError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}
