//! Delegate normalization
//!
//! Turns a rule's reference to a module, or a data element definition,
//! into everything needed to invoke it: the bound implementation, display
//! names and the owning extension. Lookups are not cached.

use crate::module::{Component, Module};
use crate::registry::ModuleRegistry;
use edgerule_core::{DataElementDefinition, DelegateRef, Result};
use serde_json::Value;
use std::sync::Arc;

/// Extension details attached to a normalized delegate
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionInfo {
    /// Registry name of the extension
    pub name: String,

    pub display_name: String,

    /// Raw extension settings, tokens unresolved
    pub settings: Value,
}

/// A delegate ready to be invoked
#[derive(Clone)]
pub struct DelegateConfig {
    pub module_path: String,

    /// Display name of the module
    pub display_name: String,

    pub exports: Arc<dyn Module>,

    pub extension: ExtensionInfo,

    /// Raw module settings, tokens unresolved
    pub settings: Value,

    pub negate: bool,

    pub timeout: Option<u64>,

    pub component: Component,
}

impl std::fmt::Debug for DelegateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateConfig")
            .field("module_path", &self.module_path)
            .field("display_name", &self.display_name)
            .field("extension", &self.extension)
            .field("negate", &self.negate)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Normalize a condition or action reference
pub fn normalize_delegate(delegate: &DelegateRef, registry: &ModuleRegistry) -> Result<DelegateConfig> {
    let mut config = resolve(&delegate.module_path, delegate.settings.clone(), registry)?;

    config.negate = delegate.negate;
    config.timeout = delegate.timeout;
    config.component = Component {
        id: delegate.id.clone(),
        name: delegate.name.clone(),
    };

    Ok(config)
}

/// Normalize a data element definition; the component name defaults to the element name
pub fn normalize_data_element(
    name: &str,
    definition: &DataElementDefinition,
    registry: &ModuleRegistry,
) -> Result<DelegateConfig> {
    let mut config = resolve(&definition.module_path, definition.settings.clone(), registry)?;

    config.component = Component {
        id: definition.id.clone(),
        name: Some(definition.name.clone().unwrap_or_else(|| name.to_string())),
    };

    Ok(config)
}

fn resolve(module_path: &str, settings: Value, registry: &ModuleRegistry) -> Result<DelegateConfig> {
    let module = registry.get_module_definition(module_path)?;
    let extension = registry.get_extension_definition(module_path)?;
    let exports = registry.get_module_exports(module_path)?;

    Ok(DelegateConfig {
        module_path: module_path.to_string(),
        display_name: module.display_name.clone(),
        exports,
        extension: ExtensionInfo {
            name: module.extension_name.clone(),
            display_name: extension.display_name.clone(),
            settings: extension.settings.clone(),
        },
        settings,
        negate: false,
        timeout: None,
        component: Component::default(),
    })
}
