//! Data element resolution
//!
//! Settings may reference data elements as `%name%` tokens. Resolving a
//! data element runs its module, whose own settings may reference further
//! data elements. Every resolution path carries the chain of names that led
//! to it; meeting a name already on the chain is a circular reference.
//! Siblings are resolved concurrently, each from its own copy of the chain.

use crate::context::ExecutionContext;
use crate::delegate::normalize_data_element;
use crate::invoker::call_module;
use crate::registry::ModuleRegistry;
use crate::text::clean_text;
use crate::tokens::TokenMatcher;
use edgerule_core::{DataElementDefinition, Error, Result};
use edgerule_telemetry::ExecutionMetrics;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves data element tokens against the registered definitions
pub struct DataElementResolver {
    registry: Arc<ModuleRegistry>,
    definitions: Arc<HashMap<String, DataElementDefinition>>,
    tokens: TokenMatcher,
    metrics: ExecutionMetrics,
}

impl DataElementResolver {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        definitions: Arc<HashMap<String, DataElementDefinition>>,
        metrics: ExecutionMetrics,
    ) -> Result<Self> {
        Ok(Self {
            registry,
            definitions,
            tokens: TokenMatcher::new()?,
            metrics,
        })
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &ExecutionMetrics {
        &self.metrics
    }

    /// Whether a data element is defined under `name`
    pub fn is_data_element(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Replace the data element tokens in `settings`; null settings become `{}`
    pub async fn resolve_settings(
        &self,
        settings: &Value,
        context: &ExecutionContext,
        call_stack: &[String],
    ) -> Result<Value> {
        if settings.is_null() {
            return Ok(Value::Object(Map::new()));
        }

        let names: Vec<String> = self
            .tokens
            .search_token_names(settings)
            .into_iter()
            .filter(|name| self.is_data_element(name))
            .collect();

        if names.is_empty() {
            return Ok(settings.clone());
        }

        let values = self.get_values(&names, context, call_stack).await?;
        Ok(self.tokens.replace_tokens(settings, &values))
    }

    /// Resolve several data elements concurrently
    pub async fn get_values(
        &self,
        names: &[String],
        context: &ExecutionContext,
        call_stack: &[String],
    ) -> Result<HashMap<String, Value>> {
        let values = try_join_all(
            names
                .iter()
                .map(|name| self.get_value(name, context, call_stack.to_vec())),
        )
        .await?;

        Ok(names.iter().cloned().zip(values).collect())
    }

    /// Resolve one data element reached through `call_stack`
    pub fn get_value<'a>(
        &'a self,
        name: &'a str,
        context: &'a ExecutionContext,
        mut call_stack: Vec<String>,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            let definition = self
                .definitions
                .get(name)
                .ok_or_else(|| Error::DataElementNotFound(name.to_string()))?;

            let seen = call_stack.iter().any(|entry| entry == name);
            call_stack.push(name.to_string());

            if seen {
                return Err(Error::CircularReference(call_stack));
            }

            let value = self
                .run_definition(name, definition, context, &call_stack)
                .await
                .map_err(|e| e.enhance_data_element(name))?;

            Ok(transform(definition, value))
        }
        .boxed()
    }

    async fn run_definition(
        &self,
        name: &str,
        definition: &DataElementDefinition,
        context: &ExecutionContext,
        call_stack: &[String],
    ) -> Result<Value> {
        let config = normalize_data_element(name, definition, &self.registry)?;
        call_module(&config, self, context, call_stack).await
    }
}

impl std::fmt::Debug for DataElementResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataElementResolver")
            .field("definitions", &self.definitions.len())
            .finish()
    }
}

/// Default substitution for null, then text transforms for strings
fn transform(definition: &DataElementDefinition, value: Value) -> Value {
    let mut value = match (value, &definition.default_value) {
        (Value::Null, Some(default)) => default.clone(),
        (value, _) => value,
    };

    if let Value::String(text) = &mut value {
        if definition.clean_text {
            *text = clean_text(text);
        }

        if definition.force_lower_case {
            *text = text.to_lowercase();
        }
    }

    value
}
