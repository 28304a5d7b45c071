//! edgerule Core
//!
//! Core types and error handling shared across the edgerule crates.
//!
//! This crate provides:
//! - The closed error taxonomy used by every stage of a rule chain
//! - Declarative rule, delegate, data element and extension definitions
//! - The JSON shapes of log entries and rule results

pub mod error;
pub mod types;

pub use error::{Error, Result, NO_ERROR_INFORMATION};
pub use types::{
    DataElementDefinition, DelegateRef, Env, ExtensionDefinition, HeaderOverride, LogAttributes,
    LogContext, LogEntry, LogLevel, RuleDefinition, RuleResult, RuleStatus, CORE_EXTENSION,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{DelegateRef, LogEntry, LogLevel, RuleDefinition, RuleResult, RuleStatus};
}
