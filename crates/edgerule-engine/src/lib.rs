//! edgerule Engine
//!
//! Executes declarative rules against request data.
//!
//! A rule is an ordered list of conditions followed by an ordered list of
//! actions. Each rule runs as a sequential, short-circuiting chain:
//! - Conditions must return booleans; the first unmet condition ends the rule
//! - Action outputs are stashed per extension for later actions
//! - Every module call is bounded by a timeout
//! - Settings may reference data elements, resolved on demand with cycle detection
//!
//! All rules of a container run concurrently and each produces exactly one
//! [`RuleResult`](edgerule_core::RuleResult) carrying its JSON logs.

pub mod chain;
pub mod config;
pub mod container;
pub mod context;
pub mod data_element;
pub mod delegate;
pub mod executor;
pub mod fetch;
pub mod invoker;
pub mod module;
pub mod outcome;
pub mod registry;
pub mod stage;
pub mod text;
pub mod timeout;
pub mod tokens;

pub use chain::ModuleChain;
pub use config::{EngineConfig, ExecuteOptions, DEFAULT_MODULE_TIMEOUT_MS};
pub use container::Container;
pub use context::{ExecutionContext, RuleUtils};
pub use data_element::DataElementResolver;
pub use delegate::{normalize_data_element, normalize_delegate, DelegateConfig, ExtensionInfo};
pub use executor::RuleEngine;
pub use fetch::{FetchInit, FetchRequest, FetchResponse, Headers, HttpClient, RuleFetch};
pub use invoker::execute_delegate_module;
pub use module::{module_fn, Component, FnModule, Module, ModuleContext, ModuleUtils, RuleInfo};
pub use outcome::return_rule_result;
pub use registry::{ModuleDefinition, ModuleRegistry};
pub use stage::ResultStage;
pub use timeout::time_bounded;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{EngineConfig, ExecuteOptions};
    pub use crate::container::Container;
    pub use crate::executor::RuleEngine;
    pub use crate::fetch::{FetchInit, FetchResponse, HttpClient};
    pub use crate::module::{module_fn, Module, ModuleContext};
    pub use edgerule_core::prelude::*;
}
