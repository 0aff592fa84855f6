//! Prometheus metrics and structured logging for the quoter.
//!
//! - Structured logging with tracing (JSON in production)
//! - Prometheus counters and gauges for quoting and recovery

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
