//! Per-rule JSON logger
//!
//! Every rule gets its own [`RuleLogger`]. Entries are appended in call
//! order and returned verbatim in the rule's result, so they are built to
//! be JSON-stable: every argument becomes a string (non-strings are
//! JSON-serialized) and sensitive tokens are anonymized before storage.

use crate::clock::MonotonicClock;
use crate::redact::Redactor;
use edgerule_core::{LogAttributes, LogContext, LogEntry, LogLevel};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Name carried by every rule log entry
pub const LOG_NAME: &str = "evaluatingRule";

/// Prefix prepended to every entry's messages
pub const LOG_PREFIX: &str = "\u{1F680}";

/// Append-only log buffer for one rule
pub struct RuleLogger {
    context: LogContext,
    redactor: Arc<Redactor>,
    clock: MonotonicClock,
    entries: Mutex<Vec<LogEntry>>,
}

impl RuleLogger {
    /// Create a logger for the given rule
    pub fn new(rule_id: impl Into<String>, redactor: Arc<Redactor>) -> Self {
        Self::with_clock(rule_id, redactor, MonotonicClock::new())
    }

    /// Create a logger with a custom clock
    pub fn with_clock(rule_id: impl Into<String>, redactor: Arc<Redactor>, clock: MonotonicClock) -> Self {
        Self {
            context: LogContext {
                rule_id: rule_id.into(),
            },
            redactor,
            clock,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Rule this logger belongs to
    pub fn rule_id(&self) -> &str {
        &self.context.rule_id
    }

    pub fn log<I: IntoIterator<Item = Value>>(&self, args: I) {
        self.process(LogLevel::Log, args);
    }

    pub fn info<I: IntoIterator<Item = Value>>(&self, args: I) {
        self.process(LogLevel::Info, args);
    }

    pub fn debug<I: IntoIterator<Item = Value>>(&self, args: I) {
        self.process(LogLevel::Debug, args);
    }

    pub fn warn<I: IntoIterator<Item = Value>>(&self, args: I) {
        self.process(LogLevel::Warn, args);
    }

    pub fn error<I: IntoIterator<Item = Value>>(&self, args: I) {
        self.process(LogLevel::Error, args);
    }

    /// Snapshot of all entries logged so far
    pub fn get_json_logs(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Number of entries logged so far
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn process<I: IntoIterator<Item = Value>>(&self, level: LogLevel, args: I) {
        let mut messages = vec![LOG_PREFIX.to_string()];
        messages.extend(args.into_iter().map(|arg| self.render(arg)));

        // Timestamp and push under one lock so entry order matches timestamp order
        let mut entries = self.entries.lock();
        entries.push(LogEntry {
            name: LOG_NAME.to_string(),
            timestamp_ms: self.clock.now_ms(),
            attributes: LogAttributes { log_level: level },
            messages,
            context: self.context.clone(),
        });
    }

    fn render(&self, arg: Value) -> String {
        let text = match arg {
            Value::String(s) => s,
            other => other.to_string(),
        };

        self.redactor.redact(&text).into_owned()
    }
}

impl std::fmt::Debug for RuleLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleLogger")
            .field("rule_id", &self.context.rule_id)
            .field("entries", &self.len())
            .finish()
    }
}
