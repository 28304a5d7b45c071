//! edgerule Telemetry
//!
//! Logging and metrics for rule execution.
//!
//! Provides:
//! - Append-only per-rule JSON loggers with redaction of sensitive tokens
//! - A millisecond clock that never hands out the same timestamp twice
//! - Counters and latency totals for rule outcomes and module calls

pub mod clock;
pub mod logger;
pub mod metrics;
pub mod redact;

pub use clock::MonotonicClock;
pub use logger::{RuleLogger, LOG_NAME, LOG_PREFIX};
pub use metrics::{ExecutionMetrics, MetricsSnapshot};
pub use redact::{anonymize, Redactor};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::logger::RuleLogger;
    pub use crate::metrics::ExecutionMetrics;
    pub use crate::redact::Redactor;
}
