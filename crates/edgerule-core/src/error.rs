//! Error types for edgerule
//!
//! Every failure that can end a rule chain is one variant of [`Error`].
//! Classification of a finished chain is a single `match` on this enum:
//! [`Error::ConditionNotMet`] is a control-flow signal, everything else is
//! a failure.

/// Result type alias using edgerule's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Message used when a module fails without saying why.
pub const NO_ERROR_INFORMATION: &str =
    "The extension triggered an error, but no error information was provided.";

/// Core error type for edgerule operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No module is registered under the given path
    #[error("Module \"{0}\" was not found.")]
    ModuleNotFound(String),

    /// The module exists but its extension is not registered
    #[error("Extension \"{extension}\" referenced by module \"{path}\" was not found.")]
    ExtensionNotFound { extension: String, path: String },

    /// The module definition has no invocable implementation bound to it
    #[error("Module \"{0}\" did not export a function.")]
    NotAFunction(String),

    /// No data element is defined under the given name
    #[error("Data element definition for \"{0}\" was not found.")]
    DataElementNotFound(String),

    /// A data element (transitively) references itself; holds the full chain
    #[error("Data element circular reference detected: {}", .0.join(" -> "))]
    CircularReference(Vec<String>),

    /// Resolving a data element failed after its definition was found
    #[error("Failed to execute module for data element \"{name}\". {source}")]
    DataElement {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// A condition evaluated to "not met"; not a failure
    #[error("{0}")]
    ConditionNotMet(String),

    /// A condition module returned something other than a boolean
    #[error("{0}")]
    InvalidConditionResult(String),

    /// A module did not settle within its deadline (milliseconds)
    #[error(
        "A timeout occurred because the module took longer than {} seconds to complete.",
        format_seconds(.0)
    )]
    Timeout(u64),

    /// A delegate module failed; carries the module and rule it belonged to
    #[error("Failed to execute \"{display_name}\" for rule \"{rule_name}\". {source}")]
    Execution {
        display_name: String,
        rule_name: String,
        #[source]
        source: Box<Error>,
    },

    /// Error raised by user module code
    #[error("{0}")]
    Module(String),

    /// Subrequest errors
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new module error
    pub fn module(msg: impl Into<String>) -> Self {
        Self::Module(msg.into())
    }

    /// Create a new fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error only signals that a condition was not met
    pub fn is_condition_not_met(&self) -> bool {
        matches!(self, Self::ConditionNotMet(_))
    }

    /// Replace an empty module error with the standard "no information" message
    pub fn normalize(self) -> Self {
        match self {
            Self::Module(msg) if msg.trim().is_empty() => Self::Module(NO_ERROR_INFORMATION.to_string()),
            other => other,
        }
    }

    /// Attach the failing delegate's display name and rule name
    pub fn enhance_execution(self, display_name: impl Into<String>, rule_name: impl Into<String>) -> Self {
        Self::Execution {
            display_name: display_name.into(),
            rule_name: rule_name.into(),
            source: Box::new(self.normalize()),
        }
    }

    /// Attach the name of the data element being resolved
    pub fn enhance_data_element(self, name: impl Into<String>) -> Self {
        Self::DataElement {
            name: name.into(),
            source: Box::new(self.normalize()),
        }
    }
}

/// Milliseconds rendered as seconds without trailing zeros (100 -> "0.1", 2000 -> "2")
fn format_seconds(timeout_ms: &u64) -> String {
    format!("{}", *timeout_ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            Error::Timeout(100).to_string(),
            "A timeout occurred because the module took longer than 0.1 seconds to complete."
        );
        assert_eq!(
            Error::Timeout(10).to_string(),
            "A timeout occurred because the module took longer than 0.01 seconds to complete."
        );
        assert_eq!(
            Error::Timeout(2000).to_string(),
            "A timeout occurred because the module took longer than 2 seconds to complete."
        );
    }

    #[test]
    fn test_circular_reference_message() {
        let err = Error::CircularReference(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "Data element circular reference detected: a -> b -> a");
    }

    #[test]
    fn test_normalize_empty_module_error() {
        assert_eq!(Error::module("").normalize().to_string(), NO_ERROR_INFORMATION);
        assert_eq!(Error::module("some error").normalize().to_string(), "some error");
    }

    #[test]
    fn test_enhance_execution() {
        let err = Error::module("some error").enhance_execution("module display name", "rule name");
        assert_eq!(
            err.to_string(),
            "Failed to execute \"module display name\" for rule \"rule name\". some error"
        );
        assert!(!err.is_condition_not_met());
    }

    #[test]
    fn test_enhance_data_element() {
        let err = Error::module("division by zero").enhance_data_element("testDataElement");
        assert_eq!(
            err.to_string(),
            "Failed to execute module for data element \"testDataElement\". division by zero"
        );
    }

    #[test]
    fn test_condition_not_met_classification() {
        assert!(Error::ConditionNotMet("not met".into()).is_condition_not_met());
        assert!(!Error::InvalidConditionResult("bad".into()).is_condition_not_met());
        assert!(!Error::Timeout(10).is_condition_not_met());
    }
}
