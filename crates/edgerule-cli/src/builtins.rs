//! Built-in module library
//!
//! A small set of core modules the runner binds into any container that
//! declares them: a value comparison condition, path/constant/environment
//! data elements, a log action and a subrequest action.

use async_trait::async_trait;
use edgerule_core::{Error, LogLevel, Result};
use edgerule_engine::{FetchInit, Headers, Module, ModuleContext};
use regex::RegexBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const VALUE_COMPARISON: &str = "core/conditions/valueComparison";
pub const PATH: &str = "core/dataElements/path";
pub const CONSTANT: &str = "core/dataElements/constant";
pub const ENVIRONMENT_VARIABLE: &str = "core/dataElements/environmentVariable";
pub const LOG: &str = "core/actions/log";
pub const SEND_DATA: &str = "core/actions/sendData";

/// Every built-in module keyed by module path
pub fn modules() -> Vec<(&'static str, Arc<dyn Module>)> {
    vec![
        (VALUE_COMPARISON, Arc::new(ValueComparison) as Arc<dyn Module>),
        (PATH, Arc::new(PathElement)),
        (CONSTANT, Arc::new(ConstantElement)),
        (ENVIRONMENT_VARIABLE, Arc::new(EnvironmentVariable)),
        (LOG, Arc::new(LogAction)),
        (SEND_DATA, Arc::new(SendData)),
    ]
}

fn parse_settings<T: DeserializeOwned>(context: &ModuleContext) -> Result<T> {
    serde_json::from_value(context.utils.get_settings().clone())
        .map_err(|e| Error::module(format!("Invalid settings: {}", e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Operator {
    Equals,
    DoesNotEqual,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    MatchesRegex,
    DoesNotMatchRegex,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    IsTrue,
    IsTruthy,
    IsFalse,
    IsFalsy,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Comparison {
    operator: Operator,
    #[serde(default)]
    case_insensitive: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueComparisonSettings {
    #[serde(default)]
    left_operand: Value,
    comparison: Comparison,
    #[serde(default)]
    right_operand: Value,
}

/// Condition comparing two resolved operands
pub struct ValueComparison;

#[async_trait]
impl Module for ValueComparison {
    async fn call(&self, context: ModuleContext) -> Result<Value> {
        let settings: ValueComparisonSettings = parse_settings(&context)?;

        compare(
            settings.comparison.operator,
            settings.comparison.case_insensitive,
            &settings.left_operand,
            &settings.right_operand,
        )
        .map(Value::Bool)
    }
}

fn compare(operator: Operator, case_insensitive: bool, left: &Value, right: &Value) -> Result<bool> {
    let text = |value: &Value| {
        let text = operand_text(value);
        if case_insensitive {
            text.to_lowercase()
        } else {
            text
        }
    };

    let outcome = match operator {
        Operator::Equals => equals(left, right, case_insensitive),
        Operator::DoesNotEqual => !equals(left, right, case_insensitive),
        Operator::Contains => text(left).contains(&text(right)),
        Operator::DoesNotContain => !text(left).contains(&text(right)),
        Operator::StartsWith => text(left).starts_with(&text(right)),
        Operator::EndsWith => text(left).ends_with(&text(right)),
        Operator::MatchesRegex | Operator::DoesNotMatchRegex => {
            let pattern = RegexBuilder::new(&operand_text(right))
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|e| Error::module(format!("Invalid regular expression: {}", e)))?;
            pattern.is_match(&operand_text(left)) == (operator == Operator::MatchesRegex)
        }
        Operator::LessThan => numbers(left, right).is_some_and(|(l, r)| l < r),
        Operator::LessThanOrEqual => numbers(left, right).is_some_and(|(l, r)| l <= r),
        Operator::GreaterThan => numbers(left, right).is_some_and(|(l, r)| l > r),
        Operator::GreaterThanOrEqual => numbers(left, right).is_some_and(|(l, r)| l >= r),
        Operator::IsTrue => left == &Value::Bool(true),
        Operator::IsTruthy => truthy(left),
        Operator::IsFalse => left == &Value::Bool(false),
        Operator::IsFalsy => !truthy(left),
    };

    Ok(outcome)
}

fn equals(left: &Value, right: &Value, case_insensitive: bool) -> bool {
    if let Some((l, r)) = numbers(left, right) {
        return l == r;
    }

    match (left, right) {
        (Value::String(l), Value::String(r)) if case_insensitive => l.to_lowercase() == r.to_lowercase(),
        _ => operand_text(left) == operand_text(right),
    }
}

fn operand_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn numbers(left: &Value, right: &Value) -> Option<(f64, f64)> {
    Some((number(left)?, number(right)?))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Deserialize)]
struct PathSettings {
    #[serde(default)]
    path: String,
}

/// Data element reading a dotted path from the request data
pub struct PathElement;

#[async_trait]
impl Module for PathElement {
    async fn call(&self, context: ModuleContext) -> Result<Value> {
        let settings: PathSettings = parse_settings(&context)?;
        Ok(lookup_path(&context.arc, &settings.path))
    }
}

fn lookup_path(root: &Value, path: &str) -> Value {
    let path = path.strip_prefix("arc.").unwrap_or(path);
    if path.is_empty() || path == "arc" {
        return root.clone();
    }

    path.split('.')
        .try_fold(root, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
            _ => None,
        })
        .cloned()
        .unwrap_or(Value::Null)
}

#[derive(Debug, Deserialize)]
struct ConstantSettings {
    #[serde(default)]
    value: Value,
}

/// Data element returning its configured value
pub struct ConstantElement;

#[async_trait]
impl Module for ConstantElement {
    async fn call(&self, context: ModuleContext) -> Result<Value> {
        let settings: ConstantSettings = parse_settings(&context)?;
        Ok(settings.value)
    }
}

#[derive(Debug, Deserialize)]
struct EnvironmentVariableSettings {
    name: String,
}

/// Data element reading an environment variable; only core modules see env
pub struct EnvironmentVariable;

#[async_trait]
impl Module for EnvironmentVariable {
    async fn call(&self, context: ModuleContext) -> Result<Value> {
        let settings: EnvironmentVariableSettings = parse_settings(&context)?;
        Ok(context.utils.get_env().get(&settings.name).cloned().unwrap_or(Value::Null))
    }
}

#[derive(Debug, Deserialize)]
struct LogSettings {
    #[serde(default)]
    message: Value,
    #[serde(default = "default_log_level")]
    level: LogLevel,
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

/// Action writing a message to the rule log
pub struct LogAction;

#[async_trait]
impl Module for LogAction {
    async fn call(&self, context: ModuleContext) -> Result<Value> {
        let settings: LogSettings = parse_settings(&context)?;
        let logger = context.utils.logger();
        let args = [settings.message];

        match settings.level {
            LogLevel::Log => logger.log(args),
            LogLevel::Info => logger.info(args),
            LogLevel::Debug => logger.debug(args),
            LogLevel::Warn => logger.warn(args),
            LogLevel::Error => logger.error(args),
        }

        Ok(Value::Null)
    }
}

#[derive(Debug, Deserialize)]
struct SendDataSettings {
    url: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    headers: Headers,
    #[serde(default)]
    body: Value,
}

fn default_method() -> String {
    "POST".to_string()
}

/// Action sending a subrequest; outputs the response status and body
pub struct SendData;

#[async_trait]
impl Module for SendData {
    async fn call(&self, context: ModuleContext) -> Result<Value> {
        let settings: SendDataSettings = parse_settings(&context)?;

        let mut init = FetchInit {
            method: Some(settings.method),
            headers: settings.headers,
            body: None,
        };

        match settings.body {
            Value::Null => {}
            Value::String(body) => init.body = Some(body),
            body => {
                if !init.headers.keys().any(|name| name.eq_ignore_ascii_case("content-type")) {
                    init.headers.insert("content-type".to_string(), "application/json".to_string());
                }
                init.body = Some(body.to_string());
            }
        }

        let response = context.utils.fetch().fetch(settings.url, init).await?;

        Ok(json!({
            "status": response.status,
            "body": response.text(),
        }))
    }
}
