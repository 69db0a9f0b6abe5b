//! Prometheus metrics and structured logging for the market-map sync pipeline.
//!
//! - Prometheus counters for markets upserted/removed, messages built, transactions signed and submitted
//! - Inclusion latency histogram
//! - Structured JSON logging with tracing in production, pretty output otherwise

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
