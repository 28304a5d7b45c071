//! Redaction of sensitive tokens in log messages

use edgerule_core::{Error, Result};
use regex::Regex;
use std::borrow::Cow;

const MASK: &str = "*****";
const VISIBLE_SUFFIX: usize = 4;
const MIN_PARTIAL_LENGTH: usize = 9;

/// Mask a string, keeping only its last four characters visible.
///
/// Strings shorter than nine characters are fully masked; the empty string
/// stays empty.
pub fn anonymize(value: &str) -> String {
    let length = value.chars().count();

    if length == 0 {
        return String::new();
    }

    if length < MIN_PARTIAL_LENGTH {
        return MASK.to_string();
    }

    let suffix: String = value.chars().skip(length - VISIBLE_SUFFIX).collect();
    format!("{}{}", MASK, suffix)
}

/// Replaces every occurrence of a configured sensitive token with its
/// anonymized form
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    pattern: Option<Regex>,
}

impl Redactor {
    /// Compile one union pattern from the given tokens, matched literally
    pub fn new<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let alternatives: Vec<String> = tokens
            .iter()
            .map(|t| t.as_ref())
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return Ok(Self::none());
        }

        let pattern = Regex::new(&alternatives.join("|"))
            .map_err(|e| Error::config(format!("Failed to compile sensitive token pattern: {}", e)))?;

        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// A redactor that leaves text untouched
    pub fn none() -> Self {
        Self { pattern: None }
    }

    /// Whether any token is configured
    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    /// Anonymize all sensitive tokens in `text`
    pub fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(text, |caps: &regex::Captures<'_>| anonymize(&caps[0])),
            None => Cow::Borrowed(text),
        }
    }
}
