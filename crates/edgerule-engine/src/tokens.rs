//! `%name%` token search and substitution in settings values

use edgerule_core::{Error, Result};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Matcher for data element tokens inside settings
#[derive(Debug, Clone)]
pub struct TokenMatcher {
    single: Regex,
    embedded: Regex,
}

impl TokenMatcher {
    /// Compile the token patterns
    pub fn new() -> Result<Self> {
        Ok(Self {
            single: Regex::new(r"^%([^%]+)%$")
                .map_err(|e| Error::internal(format!("Failed to compile single token regex: {}", e)))?,
            embedded: Regex::new(r"%(.+?)%")
                .map_err(|e| Error::internal(format!("Failed to compile embedded token regex: {}", e)))?,
        })
    }

    /// Unique token names found in any string inside `value`, in first-seen order
    pub fn search_token_names(&self, value: &Value) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(value, &mut names);
        names
    }

    fn collect_names(&self, value: &Value, names: &mut Vec<String>) {
        match value {
            Value::String(s) => {
                for caps in self.embedded.captures_iter(s) {
                    let name = &caps[1];
                    if !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                }
            }
            Value::Array(items) => items.iter().for_each(|item| self.collect_names(item, names)),
            Value::Object(map) => map.values().for_each(|item| self.collect_names(item, names)),
            _ => {}
        }
    }

    /// Rebuild `value` with every known token replaced by its resolved value.
    ///
    /// A string that is exactly one token becomes the raw value; tokens
    /// embedded in longer strings are replaced by the value's text. Tokens
    /// missing from `values` are left as written.
    pub fn replace_tokens(&self, value: &Value, values: &HashMap<String, Value>) -> Value {
        match value {
            Value::String(s) => self.replace_in_string(s, values),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.replace_tokens(item, values)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.replace_tokens(item, values)))
                    .collect::<Map<String, Value>>(),
            ),
            other => other.clone(),
        }
    }

    fn replace_in_string(&self, s: &str, values: &HashMap<String, Value>) -> Value {
        if let Some(caps) = self.single.captures(s) {
            return match values.get(&caps[1]) {
                Some(resolved) => resolved.clone(),
                None => Value::String(s.to_string()),
            };
        }

        let replaced = self.embedded.replace_all(s, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(resolved) => render_embedded(resolved),
            None => caps[0].to_string(),
        });

        Value::String(replaced.into_owned())
    }
}

fn render_embedded(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
