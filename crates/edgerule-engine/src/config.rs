//! Engine and per-call configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Deadline applied to a delegate module when its reference sets none
pub const DEFAULT_MODULE_TIMEOUT_MS: u64 = 5000;

/// Engine-wide settings fixed at initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default per-module timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
        }
    }
}

impl EngineConfig {
    /// Timeout for a delegate, preferring its own override
    pub fn timeout_for(&self, delegate_timeout: Option<u64>) -> u64 {
        delegate_timeout.unwrap_or(self.default_timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_MODULE_TIMEOUT_MS
}

/// Options of a single `execute` call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOptions {
    /// Headers added to every subrequest made through the rule fetch
    #[serde(default)]
    pub headers_for_subrequests: BTreeMap<String, String>,
}

impl ExecuteOptions {
    /// Add a subrequest header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers_for_subrequests.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: EngineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_timeout_ms, 5000);
    }

    #[test]
    fn test_delegate_timeout_wins() {
        let config = EngineConfig {
            default_timeout_ms: 250,
        };
        assert_eq!(config.timeout_for(Some(10)), 10);
        assert_eq!(config.timeout_for(None), 250);
    }

    #[test]
    fn test_execute_options_json() {
        let options: ExecuteOptions =
            serde_json::from_str(r#"{"headersForSubrequests":{"x-id":"1"}}"#).unwrap();
        assert_eq!(options.headers_for_subrequests["x-id"], "1");
    }
}
