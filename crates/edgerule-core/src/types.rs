//! Declarative definitions and result shapes

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the privileged extension allowed to read host environment variables
pub const CORE_EXTENSION: &str = "core";

/// Host environment handed to `execute`
pub type Env = serde_json::Map<String, Value>;

/// A rule: ordered conditions followed by ordered actions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    /// Rule identifier
    pub id: String,

    /// Human readable rule name
    pub name: String,

    /// Conditions evaluated in order; absent means none
    #[serde(default)]
    pub conditions: Vec<DelegateRef>,

    /// Actions executed in order once all conditions are met
    #[serde(default)]
    pub actions: Vec<DelegateRef>,
}

/// Reference from a rule to a condition or action module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateRef {
    /// Registry key of the module to invoke
    pub module_path: String,

    /// Module settings, possibly containing `%dataElement%` tokens
    #[serde(default)]
    pub settings: Value,

    /// Invert a condition's result (ignored for actions)
    #[serde(default)]
    pub negate: bool,

    /// Per-module deadline in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Component identifier exposed to the module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Component name exposed to the module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DelegateRef {
    /// Create a reference with empty settings
    pub fn new(module_path: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
            settings: Value::Null,
            negate: false,
            timeout: None,
            id: None,
            name: None,
        }
    }

    /// Set the module settings
    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }

    /// Negate the condition result
    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    /// Set the timeout in milliseconds
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }
}

/// Extension metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDefinition {
    /// Display name used in log lines
    #[serde(default)]
    pub display_name: String,

    /// Extension-level settings, possibly containing tokens
    #[serde(default)]
    pub settings: Value,
}

/// A named, independently resolvable value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataElementDefinition {
    /// Registry key of the module producing the value
    pub module_path: String,

    /// Module settings, possibly referencing other data elements
    #[serde(default)]
    pub settings: Value,

    /// Substituted when the module yields null
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    /// Collapse whitespace in string values
    #[serde(default)]
    pub clean_text: bool,

    /// Lowercase string values
    #[serde(default)]
    pub force_lower_case: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DataElementDefinition {
    /// Create a definition with no transforms
    pub fn new(module_path: impl Into<String>, settings: Value) -> Self {
        Self {
            module_path: module_path.into(),
            settings,
            default_value: None,
            clean_text: false,
            force_lower_case: false,
            id: None,
            name: None,
        }
    }
}

/// Header value substitution applied to subrequests whose URL matches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderOverride {
    /// Placeholder key, written as `[[key]]` inside header values
    pub key: String,

    /// Replacement value
    pub value: String,

    /// Regular expression the request URL must match
    pub url_pattern: String,
}

/// Log levels available to rule loggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Log,
    Info,
    Debug,
    Warn,
    Error,
}

/// One entry in a rule's JSON log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Always `evaluatingRule`
    pub name: String,

    /// Milliseconds since the epoch, strictly increasing per logger
    pub timestamp_ms: i64,

    pub attributes: LogAttributes,

    /// Logged arguments; non-strings are JSON-serialized
    pub messages: Vec<String>,

    pub context: LogContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogAttributes {
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogContext {
    pub rule_id: String,
}

/// Terminal status of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Success,
    ConditionNotMet,
    Failed,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ConditionNotMet => "condition_not_met",
            Self::Failed => "failed",
        }
    }
}

/// Outcome of one rule, produced exactly once per rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
    pub rule_id: String,
    pub status: RuleStatus,
    pub logs: Vec<LogEntry>,
}
