//! Rule execution integration tests
//!
//! End-to-end runs of the engine over mock modules: success, unmet
//! conditions, failing and hanging actions, and rule isolation.

mod common;

use common::{ContainerBuilder, MockModule, RecordingClient};
use edgerule_core::{DataElementDefinition, DelegateRef, Env, LogLevel, RuleDefinition, RuleResult, RuleStatus};
use edgerule_engine::{module_fn, Container, EngineConfig, ExecuteOptions, FetchInit, RuleEngine};
use edgerule_telemetry::LOG_PREFIX;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const CONDITION: &str = "core/conditions/customCode";
const ACTION: &str = "connector/actions/sendData";

fn rule(id: &str, name: &str, conditions: Vec<DelegateRef>, actions: Vec<DelegateRef>) -> RuleDefinition {
    RuleDefinition {
        id: id.to_string(),
        name: name.to_string(),
        conditions,
        actions,
    }
}

fn engine(container: Container) -> RuleEngine {
    RuleEngine::initialize(container, Arc::new(RecordingClient::default()), EngineConfig::default()).unwrap()
}

async fn run(engine: &RuleEngine, request: Value) -> Vec<RuleResult> {
    engine.execute(&request, Env::new(), ExecuteOptions::default()).await
}

fn base(condition: Arc<MockModule>, action: Arc<MockModule>) -> ContainerBuilder {
    ContainerBuilder::new()
        .extension("core", "Core")
        .extension("connector", "Cloud Connector")
        .module(CONDITION, "core", "Custom Code Condition", condition)
        .module(ACTION, "connector", "Send Beacon", action)
}

#[tokio::test]
async fn test_condition_met_runs_action_and_stashes_output() {
    let condition = MockModule::returning(json!(true));
    let action = MockModule::returning(json!("send data done"));
    let inspector = MockModule::returning(Value::Null);

    let mut container = base(condition.clone(), action.clone())
        .extension("inspect", "Inspector")
        .module("inspect/actions/peek", "inspect", "Peek", inspector.clone())
        .build();
    container.rules.push(rule(
        "RL1",
        "Rule 1",
        vec![DelegateRef::new(CONDITION).with_timeout(100)],
        vec![DelegateRef::new(ACTION), DelegateRef::new("inspect/actions/peek")],
    ));

    let results = run(&engine(container), json!({"event": {"xdm": {}}})).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, RuleStatus::Success);
    assert_eq!(condition.call_count(), 1);
    assert_eq!(action.call_count(), 1);

    let arc = inspector.last_arc().unwrap();
    assert_eq!(arc["ruleStash"]["connector"], json!("send data done"));
    assert_eq!(arc["event"], json!({"xdm": {}}));
}

#[tokio::test]
async fn test_unmet_condition_skips_actions() {
    let condition = MockModule::returning(json!(false));
    let action = MockModule::returning(json!("send data done"));

    let mut container = base(condition.clone(), action.clone()).build();
    container
        .rules
        .push(rule("RL1", "Rule 1", vec![DelegateRef::new(CONDITION)], vec![DelegateRef::new(ACTION)]));

    let results = run(&engine(container), json!({})).await;

    assert_eq!(results[0].status, RuleStatus::ConditionNotMet);
    assert_eq!(action.call_count(), 0);

    let not_met = results[0]
        .logs
        .iter()
        .find(|entry| entry.attributes.log_level == LogLevel::Info)
        .unwrap();
    assert_eq!(
        not_met.messages,
        vec![LOG_PREFIX, "Condition \"Custom Code Condition\" from rule \"Rule 1\" not met."]
    );
}

#[tokio::test]
async fn test_negated_condition() {
    let condition = MockModule::returning(json!(false));
    let action = MockModule::returning(json!(1));

    let mut container = base(condition, action.clone()).build();
    container.rules.push(rule(
        "RL1",
        "Rule 1",
        vec![DelegateRef::new(CONDITION).negated()],
        vec![DelegateRef::new(ACTION)],
    ));

    let results = run(&engine(container), json!({})).await;

    assert_eq!(results[0].status, RuleStatus::Success);
    assert_eq!(action.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_action_times_out() {
    let condition = MockModule::returning(json!(true));
    let action = MockModule::hanging();
    let after = MockModule::returning(json!("never"));

    let mut container = base(condition, action.clone())
        .module("core/actions/after", "core", "After", after.clone())
        .build();
    container.rules.push(rule(
        "RL1",
        "Rule 1",
        vec![DelegateRef::new(CONDITION)],
        vec![DelegateRef::new(ACTION).with_timeout(100), DelegateRef::new("core/actions/after")],
    ));

    let engine = engine(container);
    let started = tokio::time::Instant::now();
    let results = run(&engine, json!({})).await;

    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(results[0].status, RuleStatus::Failed);
    assert_eq!(action.call_count(), 1);
    assert_eq!(after.call_count(), 0);

    let error = results[0]
        .logs
        .iter()
        .find(|entry| entry.attributes.log_level == LogLevel::Error)
        .unwrap();
    assert!(error.messages[1].ends_with("longer than 0.1 seconds to complete."));
    assert_eq!(engine.metrics().snapshot().module_timeouts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_default_timeout_applies_without_override() {
    let condition = MockModule::slow(json!(true), Duration::from_millis(300));
    let action = MockModule::returning(json!(1));

    let mut container = base(condition, action.clone()).build();
    container
        .rules
        .push(rule("RL1", "Rule 1", vec![DelegateRef::new(CONDITION)], vec![DelegateRef::new(ACTION)]));

    let engine = RuleEngine::initialize(
        container,
        Arc::new(RecordingClient::default()),
        EngineConfig {
            default_timeout_ms: 250,
        },
    )
    .unwrap();

    let results = run(&engine, json!({})).await;

    assert_eq!(results[0].status, RuleStatus::Failed);
    assert_eq!(action.call_count(), 0);
}

#[tokio::test]
async fn test_failing_action_stops_later_actions() {
    let condition = MockModule::returning(json!(true));
    let action = MockModule::failing("some error");
    let after = MockModule::returning(json!("never"));

    let mut container = base(condition, action)
        .module("core/actions/after", "core", "After", after.clone())
        .build();
    container.rules.push(rule(
        "RL1",
        "Rule 1",
        vec![],
        vec![DelegateRef::new(ACTION), DelegateRef::new("core/actions/after")],
    ));

    let results = run(&engine(container), json!({})).await;

    assert_eq!(results[0].status, RuleStatus::Failed);
    assert_eq!(after.call_count(), 0);
    assert!(results[0].logs.iter().any(|entry| entry.messages[1]
        == "Failed to execute \"Send Beacon\" for rule \"Rule 1\". some error"));
}

#[tokio::test]
async fn test_zero_conditions_run_actions() {
    let action = MockModule::returning(json!("done"));

    let mut container = base(MockModule::returning(json!(false)), action.clone()).build();
    container
        .rules
        .push(rule("RL1", "Rule 1", vec![], vec![DelegateRef::new(ACTION)]));

    let results = run(&engine(container), json!({})).await;

    assert_eq!(results[0].status, RuleStatus::Success);
    assert_eq!(action.call_count(), 1);
}

#[tokio::test]
async fn test_data_element_self_reference() {
    let condition = MockModule::returning(json!(true));
    let action = MockModule::returning(json!("done"));

    let mut container = base(condition, action.clone())
        .module("core/dataElements/constant", "core", "Constant", MockModule::returning(json!("x")))
        .build();
    container.data_elements.insert(
        "A".to_string(),
        DataElementDefinition::new("core/dataElements/constant", json!({"value": "%A%"})),
    );
    container.rules.push(rule(
        "RL1",
        "Rule 1",
        vec![],
        vec![DelegateRef::new(ACTION).with_settings(json!({"url": "https://example.com?z=%A%"}))],
    ));

    let results = run(&engine(container), json!({})).await;

    assert_eq!(results[0].status, RuleStatus::Failed);
    assert_eq!(action.call_count(), 0);
    assert!(results[0]
        .logs
        .iter()
        .any(|entry| entry.messages[1].contains("Data element circular reference detected: A -> A")));
}

#[tokio::test]
async fn test_action_settings_resolve_data_elements() {
    let action = MockModule::returning(json!("done"));
    let precious = MockModule::returning(json!("  PRECIOUS  "));

    let mut container = base(MockModule::returning(json!(true)), action.clone())
        .module("core/dataElements/constant", "core", "Constant", precious)
        .build();
    let mut definition = DataElementDefinition::new("core/dataElements/constant", json!({}));
    definition.clean_text = true;
    definition.force_lower_case = true;
    container.data_elements.insert("myPrecious".to_string(), definition);
    container.rules.push(rule(
        "RL1",
        "Rule 1",
        vec![],
        vec![DelegateRef::new(ACTION).with_settings(json!({
            "url": "https://example.com?z=%myPrecious%",
            "raw": "%myPrecious%",
            "other": "%notAnElement%"
        }))],
    ));

    let results = run(&engine(container), json!({})).await;

    assert_eq!(results[0].status, RuleStatus::Success);
    assert_eq!(
        action.last_settings().unwrap(),
        json!({
            "url": "https://example.com?z=precious",
            "raw": "precious",
            "other": "%notAnElement%"
        })
    );
}

#[tokio::test]
async fn test_rules_are_isolated() {
    let failing = MockModule::failing("rule one broke");
    let counter = MockModule::returning(json!("ok"));

    let mut container = ContainerBuilder::new()
        .extension("core", "Core")
        .extension("connector", "Cloud Connector")
        .module("core/actions/fail", "core", "Fail", failing)
        .module("connector/actions/one", "connector", "One", counter.clone())
        .module(
            "core/actions/mutate",
            "core",
            "Mutate",
            module_fn(|ctx| async move { Ok(ctx.arc["event"].clone()) }),
        )
        .build();
    container
        .rules
        .push(rule("RL1", "Rule 1", vec![], vec![DelegateRef::new("core/actions/fail")]));
    container.rules.push(rule(
        "RL2",
        "Rule 2",
        vec![],
        vec![
            DelegateRef::new("connector/actions/one"),
            DelegateRef::new("core/actions/mutate"),
            DelegateRef::new("connector/actions/one"),
        ],
    ));

    let results = run(&engine(container), json!({"event": {"n": 1}})).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, RuleStatus::Failed);
    assert_eq!(results[1].status, RuleStatus::Success);
    assert_eq!(counter.call_count(), 2);

    assert!(results[1].logs.iter().all(|entry| entry.context.rule_id == "RL2"));
    assert!(results[1]
        .logs
        .iter()
        .all(|entry| entry.attributes.log_level != LogLevel::Error));
    assert!(!results[1]
        .logs
        .iter()
        .any(|entry| entry.messages.iter().any(|m| m.contains("rule one broke"))));

    // 3 module calls (call + output logs) plus rule start and end
    assert_eq!(results[1].logs.len(), 8);
}

#[tokio::test]
async fn test_env_visible_to_core_modules_only() {
    let read_env = || module_fn(|ctx| async move { Ok(Value::Object(ctx.utils.get_env().clone())) });
    let peek = MockModule::returning(Value::Null);

    let mut container = ContainerBuilder::new()
        .extension("core", "Core")
        .extension("connector", "Cloud Connector")
        .extension("inspect", "Inspector")
        .module("core/actions/env", "core", "Env", read_env())
        .module("connector/actions/env", "connector", "Env", read_env())
        .module("inspect/actions/peek", "inspect", "Peek", peek.clone())
        .build();
    container.rules.push(rule(
        "RL1",
        "Rule 1",
        vec![],
        vec![
            DelegateRef::new("core/actions/env"),
            DelegateRef::new("connector/actions/env"),
            DelegateRef::new("inspect/actions/peek"),
        ],
    ));

    let mut env = Env::new();
    env.insert("API_KEY".to_string(), json!("k"));

    let engine = engine(container);
    engine.execute(&json!({}), env, ExecuteOptions::default()).await;

    let stash = peek.last_arc().unwrap()["ruleStash"].clone();
    assert_eq!(stash["core"], json!({"API_KEY": "k"}));
    assert_eq!(stash["connector"], json!({}));
}

#[tokio::test]
async fn test_subrequests_carry_headers_and_are_logged() {
    let client = Arc::new(RecordingClient::default());
    let send = module_fn(|ctx| async move {
        let url = ctx.utils.get_settings()["url"].as_str().unwrap_or_default().to_string();
        let response = ctx
            .utils
            .fetch()
            .fetch(url, FetchInit::default().method("POST").header("x-token", "[[token]]"))
            .await?;
        Ok(json!(response.status))
    });

    let mut container = ContainerBuilder::new()
        .extension("connector", "Cloud Connector")
        .module(ACTION, "connector", "Send Beacon", send)
        .build();
    container.header_overrides.push(edgerule_core::HeaderOverride {
        key: "TOKEN".to_string(),
        value: "abc".to_string(),
        url_pattern: "^https://collect\\.".to_string(),
    });
    container.log_sensitive_tokens.push("abc-secret-value".to_string());
    container.rules.push(rule(
        "RL1",
        "Rule 1",
        vec![],
        vec![DelegateRef::new(ACTION).with_settings(json!({"url": "https://collect.example.com/e"}))],
    ));

    let engine = RuleEngine::initialize(container, client.clone(), EngineConfig::default()).unwrap();
    let results = engine
        .execute(
            &json!({}),
            Env::new(),
            ExecuteOptions::default().with_header("x-forwarded-id", "abc-secret-value"),
        )
        .await;

    assert_eq!(results[0].status, RuleStatus::Success);

    let requests = client.requests.lock();
    assert_eq!(requests[0].url, "https://collect.example.com/e");
    assert_eq!(requests[0].init.headers["x-token"], "abc");
    assert_eq!(requests[0].init.headers["x-forwarded-id"], "abc-secret-value");

    let fetch_log = results[0]
        .logs
        .iter()
        .find(|entry| entry.messages[1] == "FETCH")
        .unwrap();
    assert_eq!(fetch_log.messages[6], "Response Status");
    assert!(fetch_log.messages[5].contains("*****alue"));
    assert!(!fetch_log.messages[5].contains("abc-secret-value"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_unmet_condition_short_circuits(total in 1usize..6, unmet_seed in 0usize..6) {
        let unmet = unmet_seed % total;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

        let conditions: Vec<Arc<MockModule>> = (0..total)
            .map(|i| MockModule::returning(json!(i != unmet)))
            .collect();
        let action = MockModule::returning(json!("done"));

        let mut builder = ContainerBuilder::new()
            .extension("core", "Core")
            .module(ACTION, "core", "Action", action.clone());
        for (i, condition) in conditions.iter().enumerate() {
            builder = builder.module(&format!("core/conditions/c{}", i), "core", "Condition", condition.clone());
        }
        let mut container = builder.build();
        container.rules.push(rule(
            "RL1",
            "Rule 1",
            (0..total).map(|i| DelegateRef::new(format!("core/conditions/c{}", i))).collect(),
            vec![DelegateRef::new(ACTION)],
        ));

        let results = runtime.block_on(run(&engine(container), json!({})));

        prop_assert_eq!(results[0].status, RuleStatus::ConditionNotMet);
        prop_assert_eq!(action.call_count(), 0);
        for (i, condition) in conditions.iter().enumerate() {
            prop_assert_eq!(condition.call_count(), u32::from(i <= unmet));
        }
    }

    #[test]
    fn prop_failing_action_short_circuits(total in 1usize..6, failing_seed in 0usize..6) {
        let failing = failing_seed % total;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

        let actions: Vec<Arc<MockModule>> = (0..total)
            .map(|i| if i == failing { MockModule::failing("boom") } else { MockModule::returning(json!(i)) })
            .collect();

        let mut builder = ContainerBuilder::new().extension("core", "Core");
        for (i, action) in actions.iter().enumerate() {
            builder = builder.module(&format!("core/actions/a{}", i), "core", "Action", action.clone());
        }
        let mut container = builder.build();
        container.rules.push(rule(
            "RL1",
            "Rule 1",
            vec![],
            (0..total).map(|i| DelegateRef::new(format!("core/actions/a{}", i))).collect(),
        ));

        let results = runtime.block_on(run(&engine(container), json!({})));

        prop_assert_eq!(results[0].status, RuleStatus::Failed);
        for (i, action) in actions.iter().enumerate() {
            prop_assert_eq!(action.call_count(), u32::from(i <= failing));
        }
    }
}
