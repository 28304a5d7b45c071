//! Rule execution metrics
//!
//! Keeps in-process totals and forwards every observation to the `metrics`
//! facade, so whichever recorder the host installs sees them too.

use edgerule_core::RuleStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter of finished rules, labelled by `status`
pub const RULES_TOTAL: &str = "edgerule_rules_total";

/// Histogram of module invocation latency, labelled by `extension`
pub const MODULE_DURATION_US: &str = "edgerule_module_duration_us";

/// Counter of module timeouts
pub const MODULE_TIMEOUTS_TOTAL: &str = "edgerule_module_timeouts_total";

/// Metrics collector for rule executions
#[derive(Clone)]
pub struct ExecutionMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    rules_succeeded: AtomicU64,
    rules_not_met: AtomicU64,
    rules_failed: AtomicU64,
    module_calls: AtomicU64,
    module_timeouts: AtomicU64,
    module_latency_us: AtomicU64,
}

impl ExecutionMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    /// Register descriptions with the installed recorder
    pub fn describe() {
        metrics::describe_counter!(RULES_TOTAL, "Total number of rules executed by final status");
        metrics::describe_histogram!(
            MODULE_DURATION_US,
            metrics::Unit::Microseconds,
            "Module invocation latency in microseconds by extension"
        );
        metrics::describe_counter!(MODULE_TIMEOUTS_TOTAL, "Total number of module invocations that timed out");
    }

    /// Record the final status of a rule
    pub fn record_rule(&self, status: RuleStatus) {
        let counter = match status {
            RuleStatus::Success => &self.inner.rules_succeeded,
            RuleStatus::ConditionNotMet => &self.inner.rules_not_met,
            RuleStatus::Failed => &self.inner.rules_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        metrics::counter!(RULES_TOTAL, "status" => status.as_str()).increment(1);
    }

    /// Record one module invocation and its latency
    pub fn record_module_call(&self, extension: &str, latency_us: u64) {
        self.inner.module_calls.fetch_add(1, Ordering::Relaxed);
        self.inner
            .module_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);

        metrics::histogram!(MODULE_DURATION_US, "extension" => extension.to_string())
            .record(latency_us as f64);
    }

    /// Record a module invocation that hit its deadline
    pub fn record_module_timeout(&self) {
        self.inner.module_timeouts.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(MODULE_TIMEOUTS_TOTAL).increment(1);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rules_succeeded: self.inner.rules_succeeded.load(Ordering::Relaxed),
            rules_not_met: self.inner.rules_not_met.load(Ordering::Relaxed),
            rules_failed: self.inner.rules_failed.load(Ordering::Relaxed),
            module_calls: self.inner.module_calls.load(Ordering::Relaxed),
            module_timeouts: self.inner.module_timeouts.load(Ordering::Relaxed),
            module_latency_us: self.inner.module_latency_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub rules_succeeded: u64,
    pub rules_not_met: u64,
    pub rules_failed: u64,
    pub module_calls: u64,
    pub module_timeouts: u64,
    pub module_latency_us: u64,
}

impl MetricsSnapshot {
    /// Total rules executed
    pub fn rules_total(&self) -> u64 {
        self.rules_succeeded + self.rules_not_met + self.rules_failed
    }

    /// Average module latency
    pub fn avg_module_latency_us(&self) -> u64 {
        if self.module_calls == 0 {
            0
        } else {
            self.module_latency_us / self.module_calls
        }
    }
}
