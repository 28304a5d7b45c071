//! Logging fetch wrapper handed to modules
//!
//! Every subrequest a module makes goes through [`RuleFetch`], which merges
//! the caller's subrequest headers, applies header overrides and logs the
//! exchange to the rule's JSON log.

use async_trait::async_trait;
use bytes::Bytes;
use edgerule_core::{Error, HeaderOverride, Result};
use edgerule_telemetry::RuleLogger;
use regex::{NoExpand, Regex, RegexBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;

/// Header name to value
pub type Headers = BTreeMap<String, String>;

/// Options of one subrequest
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchInit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    pub headers: Headers,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl FetchInit {
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A subrequest as sent to the HTTP client
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub init: FetchInit,
}

/// A fully read subrequest response
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl FetchResponse {
    /// Body decoded as UTF-8, lossily
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Body parsed as JSON
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Transport used for subrequests
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: FetchRequest) -> Result<FetchResponse>;
}

/// Header override compiled for matching
#[derive(Debug, Clone)]
pub struct CompiledOverride {
    url_pattern: Regex,
    placeholder: Regex,
    value: String,
}

impl CompiledOverride {
    /// Compile an override; invalid URL patterns are configuration errors
    pub fn compile(header_override: &HeaderOverride) -> Result<Self> {
        let url_pattern = Regex::new(&header_override.url_pattern).map_err(|e| {
            Error::config(format!(
                "Invalid url pattern \"{}\" for header override \"{}\": {}",
                header_override.url_pattern, header_override.key, e
            ))
        })?;

        let placeholder = RegexBuilder::new(&format!(r"\[\[{}\]\]", regex::escape(&header_override.key)))
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::config(format!("Invalid header override key \"{}\": {}", header_override.key, e)))?;

        Ok(Self {
            url_pattern,
            placeholder,
            value: header_override.value.clone(),
        })
    }

    /// Compile every override of a container
    pub fn compile_all(overrides: &[HeaderOverride]) -> Result<Vec<Self>> {
        overrides.iter().map(Self::compile).collect()
    }

    fn apply(&self, url: &str, headers: &mut Headers) {
        if !self.url_pattern.is_match(url) {
            return;
        }

        for value in headers.values_mut() {
            if let Cow::Owned(replaced) = self.placeholder.replace_all(value, NoExpand(&self.value)) {
                *value = replaced;
            }
        }
    }
}

/// Per-rule fetch with header merging, overrides and logging
pub struct RuleFetch {
    client: Arc<dyn HttpClient>,
    overrides: Arc<Vec<CompiledOverride>>,
    headers_for_subrequests: Arc<Headers>,
    logger: Arc<RuleLogger>,
}

impl RuleFetch {
    pub fn new(
        client: Arc<dyn HttpClient>,
        overrides: Arc<Vec<CompiledOverride>>,
        headers_for_subrequests: Arc<Headers>,
        logger: Arc<RuleLogger>,
    ) -> Self {
        Self {
            client,
            overrides,
            headers_for_subrequests,
            logger,
        }
    }

    /// Send a subrequest and log its outcome to the rule log
    pub async fn fetch(&self, url: impl Into<String>, mut init: FetchInit) -> Result<FetchResponse> {
        let url = url.into();

        init.headers.extend(
            self.headers_for_subrequests
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );

        for header_override in self.overrides.iter() {
            header_override.apply(&url, &mut init.headers);
        }

        let options = json!(init);
        let request = FetchRequest {
            url: url.clone(),
            init,
        };

        match self.client.send(request).await {
            Ok(response) => {
                let body = response.text();
                let body = if body.is_empty() { Cow::Borrowed("empty") } else { body };

                self.logger.log([
                    "FETCH".into(),
                    "Resource".into(),
                    url.into(),
                    "Options".into(),
                    options,
                    "Response Status".into(),
                    json!(response.status),
                    "Response Body".into(),
                    body.into_owned().into(),
                ]);

                Ok(response)
            }
            Err(e) => {
                error!(rule_id = %self.logger.rule_id(), url = %url, "Subrequest failed: {}", e);

                self.logger.error([
                    "FETCH".into(),
                    "Resource".into(),
                    url.into(),
                    "Options".into(),
                    options,
                    "Error".into(),
                    e.to_string().into(),
                ]);

                Err(e)
            }
        }
    }
}
