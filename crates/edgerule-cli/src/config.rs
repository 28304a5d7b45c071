//! Runner configuration

use edgerule_core::Env;
use edgerule_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Container file path
    #[serde(default)]
    pub container_path: Option<String>,

    /// Engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Headers added to every subrequest
    #[serde(default)]
    pub headers_for_subrequests: BTreeMap<String, String>,

    /// Environment variables exposed to core modules
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Tokens masked in rule logs, in addition to the container's
    #[serde(default)]
    pub log_sensitive_tokens: Vec<String>,

    /// Subrequest timeout in seconds
    #[serde(default = "default_subrequest_timeout")]
    pub subrequest_timeout_secs: u64,
}

impl RunnerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &crate::Cli) -> anyhow::Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(container) = &cli.container {
            config.container_path = Some(container.clone());
        }

        if let Some(timeout_ms) = cli.timeout_ms {
            config.engine.default_timeout_ms = timeout_ms;
        }

        config.headers_for_subrequests.extend(cli.headers.iter().cloned());
        config.env.extend(cli.env.iter().cloned());

        Ok(config)
    }

    /// Environment handed to the engine
    pub fn env(&self) -> Env {
        self.env
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect()
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            container_path: None,
            engine: EngineConfig::default(),
            headers_for_subrequests: BTreeMap::new(),
            env: BTreeMap::new(),
            log_sensitive_tokens: Vec::new(),
            subrequest_timeout_secs: default_subrequest_timeout(),
        }
    }
}

fn default_subrequest_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;
    use edgerule_engine::DEFAULT_MODULE_TIMEOUT_MS;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let cli = Cli::parse_from(["edgerule"]);
        let config = RunnerConfig::load("/nonexistent/edgerule.yaml", &cli).unwrap();

        assert!(config.container_path.is_none());
        assert_eq!(config.engine.default_timeout_ms, DEFAULT_MODULE_TIMEOUT_MS);
        assert_eq!(config.subrequest_timeout_secs, 30);
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
container_path: from-file.yaml
engine:
  default_timeout_ms: 100
headers_for_subrequests:
  x-a: file
  x-b: file
env:
  REGION: eu
log_sensitive_tokens: [secret]
"#
        )
        .unwrap();

        let cli = Cli::parse_from([
            "edgerule",
            "--container",
            "from-cli.yaml",
            "--timeout-ms",
            "250",
            "--header",
            "x-b=cli",
            "--env",
            "TIER=gold",
        ]);
        let config = RunnerConfig::load(file.path().to_str().unwrap(), &cli).unwrap();

        assert_eq!(config.container_path.as_deref(), Some("from-cli.yaml"));
        assert_eq!(config.engine.default_timeout_ms, 250);
        assert_eq!(config.headers_for_subrequests["x-a"], "file");
        assert_eq!(config.headers_for_subrequests["x-b"], "cli");
        assert_eq!(config.log_sensitive_tokens, vec!["secret".to_string()]);

        let env = config.env();
        assert_eq!(env["REGION"], "eu");
        assert_eq!(env["TIER"], "gold");
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "engine: [not, a, map]").unwrap();

        let cli = Cli::parse_from(["edgerule"]);
        assert!(RunnerConfig::load(file.path().to_str().unwrap(), &cli).is_err());
    }
}
