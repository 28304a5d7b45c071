//! Rule executor
//!
//! Runs every rule of a container concurrently against the same request
//! data. Each rule gets its own logger, fetch wrapper and copy of the
//! request data, runs its condition chain then its action chain, and ends
//! as exactly one [`RuleResult`]. Execution itself never fails; failures
//! are reported per rule.

use crate::chain::ModuleChain;
use crate::config::{EngineConfig, ExecuteOptions};
use crate::container::Container;
use crate::context::{ExecutionContext, RuleUtils};
use crate::data_element::DataElementResolver;
use crate::fetch::{CompiledOverride, Headers, HttpClient, RuleFetch};
use crate::module::RuleInfo;
use crate::outcome::return_rule_result;
use crate::registry::ModuleRegistry;
use crate::stage::ResultStage;
use edgerule_core::{Env, Result, RuleDefinition, RuleResult, RuleStatus};
use edgerule_telemetry::{ExecutionMetrics, Redactor, RuleLogger};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The initialized rule engine
pub struct RuleEngine {
    rules: Vec<RuleDefinition>,
    resolver: DataElementResolver,
    build_info: Arc<Value>,
    http_client: Arc<dyn HttpClient>,
    overrides: Arc<Vec<CompiledOverride>>,
    redactor: Arc<Redactor>,
    config: EngineConfig,
    metrics: ExecutionMetrics,
}

impl RuleEngine {
    /// Register the container's modules and prepare it for execution.
    ///
    /// Header override patterns and sensitive tokens are compiled here, so
    /// invalid ones fail initialization rather than a request.
    pub fn initialize(container: Container, http_client: Arc<dyn HttpClient>, config: EngineConfig) -> Result<Self> {
        let overrides = CompiledOverride::compile_all(&container.header_overrides)?;
        let redactor = Redactor::new(&container.log_sensitive_tokens)?;

        let mut registry = ModuleRegistry::new();
        registry.register(container.modules, container.extensions);

        let metrics = ExecutionMetrics::new();
        ExecutionMetrics::describe();

        let resolver = DataElementResolver::new(
            Arc::new(registry),
            Arc::new(container.data_elements),
            metrics.clone(),
        )?;

        info!(
            rules = container.rules.len(),
            modules = resolver.registry().module_count(),
            default_timeout_ms = config.default_timeout_ms,
            "Rule engine initialized"
        );

        Ok(Self {
            rules: container.rules,
            resolver,
            build_info: Arc::new(container.build_info),
            http_client,
            overrides: Arc::new(overrides),
            redactor: Arc::new(redactor),
            config,
            metrics,
        })
    }

    /// Execute every rule against `request_data`; results keep rule order
    pub async fn execute(&self, request_data: &Value, env: Env, options: ExecuteOptions) -> Vec<RuleResult> {
        let start = Instant::now();
        let env = Arc::new(env);
        let headers = Arc::new(options.headers_for_subrequests);

        let results = join_all(
            self.rules
                .iter()
                .map(|rule| self.execute_rule(rule, request_data.clone(), env.clone(), headers.clone())),
        )
        .await;

        debug!(
            rules = results.len(),
            latency_us = start.elapsed().as_micros() as u64,
            "Rules executed"
        );

        results
    }

    async fn execute_rule(
        &self,
        rule: &RuleDefinition,
        request_data: Value,
        env: Arc<Env>,
        headers: Arc<Headers>,
    ) -> RuleResult {
        let logger = Arc::new(RuleLogger::new(rule.id.as_str(), self.redactor.clone()));
        let fetch = Arc::new(RuleFetch::new(
            self.http_client.clone(),
            self.overrides.clone(),
            headers,
            logger.clone(),
        ));

        let utils = RuleUtils {
            rule: RuleInfo {
                id: rule.id.clone(),
                name: rule.name.clone(),
            },
            build_info: self.build_info.clone(),
            logger: logger.clone(),
            fetch,
        };

        let mut context = ExecutionContext::new(request_data, env, utils);

        logger.log([format!("Execution of rule \"{}\" is starting.", rule.name).into()]);

        let outcome = self.run_chains(rule, &mut context).await;

        logger.log([format!("Execution of rule \"{}\" is complete.", rule.name).into()]);

        let result = return_rule_result(&rule.id, &outcome, logger.get_json_logs());
        self.metrics.record_rule(result.status);

        match result.status {
            RuleStatus::Failed => warn!(rule_id = %rule.id, "Rule failed"),
            status => info!(rule_id = %rule.id, status = status.as_str(), "Rule finished"),
        }

        result
    }

    async fn run_chains(&self, rule: &RuleDefinition, context: &mut ExecutionContext) -> Result<()> {
        ModuleChain::new(&rule.conditions, ResultStage::CheckCondition, &self.resolver, &self.config)
            .run(context)
            .await?;

        ModuleChain::new(&rule.actions, ResultStage::StashAction, &self.resolver, &self.config)
            .run(context)
            .await
    }

    /// Number of rules in the container
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn registry(&self) -> &ModuleRegistry {
        self.resolver.registry()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execution metrics collected so far
    pub fn metrics(&self) -> &ExecutionMetrics {
        &self.metrics
    }
}
