//! Module invocation
//!
//! Resolves a delegate's settings, assembles the [`ModuleContext`] and runs
//! the module on its own task. Running detached means a caller that stops
//! waiting (a timeout) abandons the module without aborting it.

use crate::context::ExecutionContext;
use crate::data_element::DataElementResolver;
use crate::delegate::DelegateConfig;
use crate::module::{ModuleContext, ModuleUtils, RuleInfo};
use edgerule_core::{Env, Error, Result, CORE_EXTENSION};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::debug;

/// Invoke a condition or action module on behalf of its rule.
///
/// Failures are normalized and wrapped with the module's display name and
/// the rule name.
pub async fn execute_delegate_module(
    config: &DelegateConfig,
    resolver: &DataElementResolver,
    context: &ExecutionContext,
) -> Result<Value> {
    call_module(config, resolver, context, &[])
        .await
        .map_err(|e| e.enhance_execution(config.display_name.as_str(), context.rule().name.as_str()))
}

/// Resolve settings with the given data element call stack and run the module
pub(crate) async fn call_module(
    config: &DelegateConfig,
    resolver: &DataElementResolver,
    context: &ExecutionContext,
    call_stack: &[String],
) -> Result<Value> {
    let (settings, extension_settings) = futures::try_join!(
        resolver.resolve_settings(&config.settings, context, call_stack),
        resolver.resolve_settings(&config.extension.settings, context, call_stack),
    )?;

    let env = if config.extension.name == CORE_EXTENSION {
        context.env.clone()
    } else {
        Arc::new(Env::new())
    };

    let module_context = ModuleContext {
        arc: context.arc_value(),
        utils: ModuleUtils {
            settings,
            extension_settings,
            component: config.component.clone(),
            env,
            rule: RuleInfo {
                id: context.rule().id.clone(),
                name: context.rule().name.clone(),
            },
            build_info: context.utils.build_info.clone(),
            logger: context.utils.logger.clone(),
            fetch: context.utils.fetch.clone(),
        },
    };

    let exports = config.exports.clone();
    let started = Instant::now();

    let result = match tokio::spawn(async move { exports.call(module_context).await }).await {
        Ok(result) => result,
        Err(e) => Err(join_error(e)),
    };

    let latency_us = started.elapsed().as_micros() as u64;
    resolver.metrics().record_module_call(&config.extension.name, latency_us);

    debug!(
        rule_id = %context.rule().id,
        module = %config.module_path,
        latency_us,
        ok = result.is_ok(),
        "Module invoked"
    );

    result.map_err(Error::normalize)
}

fn join_error(err: JoinError) -> Error {
    match err.try_into_panic() {
        Ok(payload) => Error::module(panic_message(payload.as_ref())),
        Err(err) => Error::internal(format!("module task did not complete: {}", err)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::new()
    }
}
