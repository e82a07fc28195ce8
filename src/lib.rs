pub mod algorithms;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod measurement;
pub mod visualization;

pub use algorithms::*;
pub use data::*;
pub use error::AnalysisError;
pub use measurement::*;

pub type Result<T> = std::result::Result<T, AnalysisError>;
