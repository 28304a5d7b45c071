//! Per-rule execution context

use crate::fetch::RuleFetch;
use crate::module::RuleInfo;
use edgerule_core::Env;
use edgerule_telemetry::RuleLogger;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Key of the rule stash inside the module `arc`
pub const RULE_STASH_KEY: &str = "ruleStash";

/// Key under which non-object request data is placed
pub const EVENT_KEY: &str = "event";

static NULL: Value = Value::Null;

/// Utilities shared by every module of one rule
#[derive(Clone)]
pub struct RuleUtils {
    pub rule: RuleInfo,
    pub build_info: Arc<Value>,
    pub logger: Arc<RuleLogger>,
    pub fetch: Arc<RuleFetch>,
}

/// State threaded through a rule's condition and action chains.
///
/// Owned by exactly one rule; the request data is a private copy so no
/// module can observe another rule's changes.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Request data of the rule
    pub arc: Map<String, Value>,

    /// Outputs of earlier actions keyed by extension name
    pub rule_stash: Map<String, Value>,

    pub env: Arc<Env>,

    pub utils: RuleUtils,
}

impl ExecutionContext {
    /// Build a context from request data; non-object data lands under `event`
    pub fn new(request_data: Value, env: Arc<Env>, utils: RuleUtils) -> Self {
        let arc = match request_data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert(EVENT_KEY.to_string(), other);
                map
            }
        };

        Self {
            arc,
            rule_stash: Map::new(),
            env,
            utils,
        }
    }

    /// Snapshot of the request data with the current stash attached
    pub fn arc_value(&self) -> Value {
        let mut arc = self.arc.clone();
        arc.insert(RULE_STASH_KEY.to_string(), Value::Object(self.rule_stash.clone()));
        Value::Object(arc)
    }

    /// The `event` entry of the request data, null when absent
    pub fn event(&self) -> &Value {
        self.arc.get(EVENT_KEY).unwrap_or(&NULL)
    }

    pub fn logger(&self) -> &RuleLogger {
        &self.utils.logger
    }

    pub fn rule(&self) -> &RuleInfo {
        &self.utils.rule
    }
}
