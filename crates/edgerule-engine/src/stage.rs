//! Result stages applied after each module of a chain

use crate::context::ExecutionContext;
use crate::delegate::DelegateConfig;
use edgerule_core::{Error, Result};
use serde_json::Value;

/// What a chain does with each module output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStage {
    /// Outputs are condition results
    CheckCondition,

    /// Outputs are stashed under the module's extension name
    StashAction,
}

impl ResultStage {
    /// Apply the stage to one module output
    pub fn apply(&self, context: &mut ExecutionContext, config: &DelegateConfig, output: Value) -> Result<()> {
        match self {
            Self::CheckCondition => check_condition_result(context, config, &output),
            Self::StashAction => {
                add_action_result_to_stash(context, config, output);
                Ok(())
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckCondition => "conditions",
            Self::StashAction => "actions",
        }
    }
}

/// Whether a boolean condition result, possibly negated, counts as met
pub fn is_condition_met(result: bool, negate: bool) -> bool {
    result != negate
}

/// Reject non-boolean outputs and unmet conditions
pub fn check_condition_result(context: &ExecutionContext, config: &DelegateConfig, output: &Value) -> Result<()> {
    let rule_name = &context.rule().name;

    let result = output.as_bool().ok_or_else(|| {
        Error::InvalidConditionResult(format!(
            "Condition \"{}\" from rule \"{}\" did not return a boolean result.",
            config.display_name, rule_name
        ))
    })?;

    if !is_condition_met(result, config.negate) {
        return Err(Error::ConditionNotMet(format!(
            "Condition \"{}\" from rule \"{}\" not met.",
            config.display_name, rule_name
        )));
    }

    Ok(())
}

/// Record an action output in the rule stash under its extension name
pub fn add_action_result_to_stash(context: &mut ExecutionContext, config: &DelegateConfig, output: Value) {
    if config.extension.name.is_empty() {
        return;
    }

    context.rule_stash.insert(config.extension.name.clone(), output);
}
