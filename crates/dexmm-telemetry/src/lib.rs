//! Prometheus metrics and structured logging for dexmm.
//!
//! - Structured logging with tracing (JSON in production)
//! - Prometheus metrics for the market making rebalance loop

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
