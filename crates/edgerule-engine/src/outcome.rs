//! Reduction of a finished rule into its result

use edgerule_core::{Error, LogEntry, RuleResult, RuleStatus};

/// Status of a rule from the outcome of its chains
pub fn rule_status(outcome: &Result<(), Error>) -> RuleStatus {
    match outcome {
        Ok(()) => RuleStatus::Success,
        Err(e) if e.is_condition_not_met() => RuleStatus::ConditionNotMet,
        Err(_) => RuleStatus::Failed,
    }
}

/// Build the rule result; logs are attached whatever the outcome
pub fn return_rule_result(rule_id: &str, outcome: &Result<(), Error>, logs: Vec<LogEntry>) -> RuleResult {
    RuleResult {
        rule_id: rule_id.to_string(),
        status: rule_status(outcome),
        logs,
    }
}
