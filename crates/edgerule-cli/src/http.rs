//! reqwest-backed subrequest transport

use async_trait::async_trait;
use edgerule_core::{Error, Result};
use edgerule_engine::{FetchRequest, FetchResponse, Headers, HttpClient};
use reqwest::Method;
use std::time::Duration;

/// HTTP client used for rule subrequests
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: FetchRequest) -> Result<FetchResponse> {
        let method = request.init.method.as_deref().unwrap_or("GET");
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::fetch(format!("invalid method \"{}\"", method)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.init.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.init.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| Error::fetch(e.to_string()))?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();
        let body = response.bytes().await.map_err(|e| Error::fetch(e.to_string()))?;

        Ok(FetchResponse { status, headers, body })
    }
}
