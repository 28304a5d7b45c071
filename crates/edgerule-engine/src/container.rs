//! Declarative container of rules, modules, extensions and data elements

use crate::module::Module;
use crate::registry::ModuleDefinition;
use edgerule_core::{
    DataElementDefinition, Error, ExtensionDefinition, HeaderOverride, Result, RuleDefinition,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Everything the engine is initialized from.
///
/// Module implementations cannot be expressed declaratively; they are bound
/// in code with [`Container::bind_module`] after loading.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,

    #[serde(default)]
    pub modules: HashMap<String, ModuleDefinition>,

    #[serde(default)]
    pub extensions: HashMap<String, ExtensionDefinition>,

    #[serde(default)]
    pub data_elements: HashMap<String, DataElementDefinition>,

    /// Opaque metadata exposed to modules
    #[serde(default)]
    pub build_info: Value,

    #[serde(default)]
    pub header_overrides: Vec<HeaderOverride>,

    /// Strings anonymized in every rule log
    #[serde(default)]
    pub log_sensitive_tokens: Vec<String>,
}

impl Container {
    /// Load a container from YAML (JSON is accepted too)
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::config(format!("Failed to parse container: {}", e)))
    }

    /// Load a container from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("Failed to parse container: {}", e)))
    }

    /// Load a container from a file, by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Bind an implementation to a declared module
    pub fn bind_module(&mut self, path: &str, exports: Arc<dyn Module>) -> Result<()> {
        let definition = self
            .modules
            .get_mut(path)
            .ok_or_else(|| Error::ModuleNotFound(path.to_string()))?;

        definition.exports = Some(exports);
        Ok(())
    }

    /// Bind every implementation whose path is declared, returning how many were bound
    pub fn bind_available<'a, I>(&mut self, modules: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, Arc<dyn Module>)>,
    {
        modules
            .into_iter()
            .filter(|(path, exports)| self.bind_module(path, exports.clone()).is_ok())
            .count()
    }

    /// Declared modules without an implementation
    pub fn unbound_modules(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .modules
            .iter()
            .filter(|(_, definition)| definition.exports.is_none())
            .map(|(path, _)| path.as_str())
            .collect();
        paths.sort_unstable();
        paths
    }
}
