//! Module registry
//!
//! Maps module paths to their metadata and bound implementation. The
//! registry is filled once during initialization and only read afterwards,
//! so rule chains share it through an `Arc` without locking.

use crate::module::Module;
use edgerule_core::{Error, ExtensionDefinition, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Metadata and implementation of one registered module
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDefinition {
    /// Extension that provides the module
    pub extension_name: String,

    /// Display name used in log lines and error messages
    pub display_name: String,

    /// Invocable implementation, bound in code after loading
    #[serde(skip)]
    pub exports: Option<Arc<dyn Module>>,
}

impl ModuleDefinition {
    /// Create a definition without an implementation
    pub fn new(extension_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            extension_name: extension_name.into(),
            display_name: display_name.into(),
            exports: None,
        }
    }

    /// Bind the implementation
    pub fn with_exports(mut self, exports: Arc<dyn Module>) -> Self {
        self.exports = Some(exports);
        self
    }
}

impl std::fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("extension_name", &self.extension_name)
            .field("display_name", &self.display_name)
            .field("exports", &self.exports.is_some())
            .finish()
    }
}

/// Registry of modules and extensions keyed by module path
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, ModuleDefinition>,
    extensions: HashMap<String, ExtensionDefinition>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every module and extension
    pub fn register(
        &mut self,
        modules: HashMap<String, ModuleDefinition>,
        extensions: HashMap<String, ExtensionDefinition>,
    ) {
        self.modules = modules;
        self.extensions = extensions;
    }

    /// Metadata of the module registered under `path`
    pub fn get_module_definition(&self, path: &str) -> Result<&ModuleDefinition> {
        self.modules
            .get(path)
            .ok_or_else(|| Error::ModuleNotFound(path.to_string()))
    }

    /// Definition of the extension providing the module under `path`
    pub fn get_extension_definition(&self, path: &str) -> Result<&ExtensionDefinition> {
        let module = self.get_module_definition(path)?;

        self.extensions
            .get(&module.extension_name)
            .ok_or_else(|| Error::ExtensionNotFound {
                extension: module.extension_name.clone(),
                path: path.to_string(),
            })
    }

    /// Implementation bound to the module under `path`
    pub fn get_module_exports(&self, path: &str) -> Result<Arc<dyn Module>> {
        self.get_module_definition(path)?
            .exports
            .clone()
            .ok_or_else(|| Error::NotAFunction(path.to_string()))
    }

    /// Number of registered modules
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Registered module paths
    pub fn module_paths(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }
}
