//! Module trait and the capability bag handed to modules

use crate::fetch::RuleFetch;
use async_trait::async_trait;
use edgerule_core::{Env, Result};
use edgerule_telemetry::RuleLogger;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Trait for all condition, action and data element modules
#[async_trait]
pub trait Module: Send + Sync {
    /// Run the module; the returned value becomes the module output
    async fn call(&self, context: ModuleContext) -> Result<Value>;
}

/// Adapter turning an async closure into a [`Module`]
pub struct FnModule<F> {
    func: F,
}

#[async_trait]
impl<F, Fut> Module for FnModule<F>
where
    F: Fn(ModuleContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    async fn call(&self, context: ModuleContext) -> Result<Value> {
        (self.func)(context).await
    }
}

/// Wrap an async closure as a shareable module
pub fn module_fn<F, Fut>(func: F) -> Arc<dyn Module>
where
    F: Fn(ModuleContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(FnModule { func })
}

/// Identity of the delegate or data element being invoked
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Component {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Identity of the rule being executed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleInfo {
    pub id: String,
    pub name: String,
}

/// Everything a module receives when it is invoked
#[derive(Clone)]
pub struct ModuleContext {
    /// Request data of the rule plus its `ruleStash`, as a snapshot
    pub arc: Value,

    pub utils: ModuleUtils,
}

/// Utilities exposed to a module
#[derive(Clone)]
pub struct ModuleUtils {
    pub(crate) settings: Value,
    pub(crate) extension_settings: Value,
    pub(crate) component: Component,
    pub(crate) env: Arc<Env>,
    pub(crate) rule: RuleInfo,
    pub(crate) build_info: Arc<Value>,
    pub(crate) logger: Arc<RuleLogger>,
    pub(crate) fetch: Arc<RuleFetch>,
}

impl ModuleUtils {
    /// Resolved module settings
    pub fn get_settings(&self) -> &Value {
        &self.settings
    }

    /// Resolved settings of the module's extension
    pub fn get_extension_settings(&self) -> &Value {
        &self.extension_settings
    }

    /// Identity of the invoked component
    pub fn get_component(&self) -> &Component {
        &self.component
    }

    /// Host environment; empty unless the module belongs to the core extension
    pub fn get_env(&self) -> &Env {
        &self.env
    }

    pub fn get_rule(&self) -> &RuleInfo {
        &self.rule
    }

    pub fn get_build_info(&self) -> &Value {
        &self.build_info
    }

    /// The rule's JSON logger
    pub fn logger(&self) -> &RuleLogger {
        &self.logger
    }

    /// The rule's logging fetch wrapper
    pub fn fetch(&self) -> &RuleFetch {
        &self.fetch
    }
}
