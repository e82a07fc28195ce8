//! Structured logging for scan analysis
//!
//! Sets up `tracing` with a console layer and an optional daily JSON log
//! file, and keeps a per-thread correlation id and scan context so every
//! measurement of one invocation can be traced back to its scan log.

pub mod config;
pub mod spans;

use anyhow::Result;
use std::cell::RefCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

pub use config::LoggingConfig;
pub use spans::MeasurementSpan;

thread_local! {
    static CORRELATION_ID: RefCell<Option<Uuid>> = const { RefCell::new(None) };
}

/// Scan being analysed, attached to measurement spans
#[derive(Debug, Clone, PartialEq)]
pub struct ScanContext {
    pub source: String,
    pub samples: usize,
}

thread_local! {
    static SCAN_CONTEXT: RefCell<Option<ScanContext>> = const { RefCell::new(None) };
}

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the lifetime of the program.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let mut layers = Vec::new();
    let mut guard = None;

    if config.console_output {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_line_number(config.include_file_location)
            .with_file(config.include_file_location)
            .with_writer(std::io::stderr);
        layers.push(console_layer.boxed());
    }

    if let Some(ref log_dir) = config.log_directory {
        let file_appender = tracing_appender::rolling::daily(log_dir, "beamline-analysis.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .json();
        layers.push(file_layer.boxed());
        guard = Some(worker_guard);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    tracing::debug!("Logging system initialized with config: {:?}", config);
    Ok(guard)
}

/// Set a correlation ID for the current thread
pub fn set_correlation_id(id: Uuid) {
    CORRELATION_ID.with(|correlation_id| {
        *correlation_id.borrow_mut() = Some(id);
    });
}

/// Get the current correlation ID for this thread
pub fn get_correlation_id() -> Option<Uuid> {
    CORRELATION_ID.with(|correlation_id| *correlation_id.borrow())
}

/// Generate a new correlation ID and set it for the current thread
pub fn new_correlation_id() -> Uuid {
    let id = Uuid::new_v4();
    set_correlation_id(id);
    id
}

/// Clear the correlation ID for the current thread
pub fn clear_correlation_id() {
    CORRELATION_ID.with(|correlation_id| {
        *correlation_id.borrow_mut() = None;
    });
}

pub fn set_scan_context(context: ScanContext) {
    SCAN_CONTEXT.with(|scan_context| {
        *scan_context.borrow_mut() = Some(context);
    });
}

pub fn get_scan_context() -> Option<ScanContext> {
    SCAN_CONTEXT.with(|scan_context| scan_context.borrow().clone())
}

pub fn clear_scan_context() {
    SCAN_CONTEXT.with(|scan_context| {
        *scan_context.borrow_mut() = None;
    });
}
