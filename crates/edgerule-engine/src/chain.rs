//! Sequential module chains
//!
//! A rule runs two chains: its conditions, then its actions. Each chain
//! invokes its modules strictly one after another and stops at the first
//! error. A single terminal handler logs that error to the rule log.

use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::data_element::DataElementResolver;
use crate::delegate::{normalize_delegate, DelegateConfig};
use crate::invoker::execute_delegate_module;
use crate::stage::ResultStage;
use crate::timeout::time_bounded;
use edgerule_core::{DelegateRef, Error, Result};
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

/// Ordered condition or action modules of one rule
pub struct ModuleChain<'a> {
    delegates: &'a [DelegateRef],
    stage: ResultStage,
    resolver: &'a DataElementResolver,
    config: &'a EngineConfig,
}

impl<'a> ModuleChain<'a> {
    pub fn new(
        delegates: &'a [DelegateRef],
        stage: ResultStage,
        resolver: &'a DataElementResolver,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            delegates,
            stage,
            resolver,
            config,
        }
    }

    /// Run every module in order, stopping at the first error.
    ///
    /// The error is logged to the rule log and returned unchanged.
    pub async fn run(&self, context: &mut ExecutionContext) -> Result<()> {
        if self.delegates.is_empty() {
            return Ok(());
        }

        let start = Instant::now();
        let result = self.run_modules(context).await;

        debug!(
            rule_id = %context.rule().id,
            stage = self.stage.as_str(),
            modules = self.delegates.len(),
            latency_us = start.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "Chain finished"
        );

        if let Err(e) = &result {
            log_module_error(context, e);
        }

        result
    }

    async fn run_modules(&self, context: &mut ExecutionContext) -> Result<()> {
        let configs = self
            .delegates
            .iter()
            .map(|delegate| normalize_delegate(delegate, self.resolver.registry()))
            .collect::<Result<Vec<_>>>()?;

        for config in &configs {
            log_delegate_module_call(context, config);

            let timeout_ms = self.config.timeout_for(config.timeout);
            let output = time_bounded(execute_delegate_module(config, self.resolver, context), timeout_ms)
                .await
                .map_err(|e| {
                    if matches!(e, Error::Timeout(_)) {
                        self.resolver.metrics().record_module_timeout();
                    }
                    e
                })?;

            log_delegate_module_output(context, config, &output);

            self.stage.apply(context, config, output)?;
        }

        Ok(())
    }
}

fn log_delegate_module_call(context: &ExecutionContext, config: &DelegateConfig) {
    context.logger().log([
        format!(
            "Calling \"{}\" module from the \"{}\" extension.",
            config.display_name, config.extension.display_name
        )
        .into(),
        "Event: ".into(),
        context.event().to_string().into(),
        "Rule Stash: ".into(),
        Value::Object(context.rule_stash.clone()).to_string().into(),
    ]);
}

fn log_delegate_module_output(context: &ExecutionContext, config: &DelegateConfig, output: &Value) {
    context.logger().log([
        format!(
            "\"{}\" module from the \"{}\" extension returned.",
            config.display_name, config.extension.display_name
        )
        .into(),
        "Output:".into(),
        output.clone(),
    ]);
}

fn log_module_error(context: &ExecutionContext, error: &Error) {
    let message = Value::String(error.to_string());

    if error.is_condition_not_met() {
        context.logger().info([message]);
    } else {
        context.logger().error([message]);
    }
}
