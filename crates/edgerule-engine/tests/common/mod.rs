//! Mock modules and transports for testing
//!
//! Provides configurable implementations of the Module and HttpClient
//! traits for exercising rule chains, timeouts and error handling.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use edgerule_core::{Error, ExtensionDefinition, Result};
use edgerule_engine::{
    Container, FetchRequest, FetchResponse, Headers, HttpClient, Module, ModuleContext, ModuleDefinition,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a mock module does when called
#[derive(Debug, Clone)]
enum Behavior {
    Return(Value),
    Fail(String),
    Hang,
}

/// A configurable mock module
pub struct MockModule {
    behavior: Behavior,
    simulated_latency: Option<Duration>,
    call_count: AtomicU32,
    last_arc: Mutex<Option<Value>>,
    last_settings: Mutex<Option<Value>>,
}

impl MockModule {
    /// A module returning `value`
    pub fn returning(value: Value) -> Arc<Self> {
        Arc::new(Self::with_behavior(Behavior::Return(value)))
    }

    /// A module failing with `message`
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self::with_behavior(Behavior::Fail(message.to_string())))
    }

    /// A module that never settles
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self::with_behavior(Behavior::Hang))
    }

    /// A module returning `value` after `latency`
    pub fn slow(value: Value, latency: Duration) -> Arc<Self> {
        let mut module = Self::with_behavior(Behavior::Return(value));
        module.simulated_latency = Some(latency);
        Arc::new(module)
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            simulated_latency: None,
            call_count: AtomicU32::new(0),
            last_arc: Mutex::new(None),
            last_settings: Mutex::new(None),
        }
    }

    /// Number of times the module was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// The `arc` seen by the most recent call
    pub fn last_arc(&self) -> Option<Value> {
        self.last_arc.lock().clone()
    }

    /// The resolved settings seen by the most recent call
    pub fn last_settings(&self) -> Option<Value> {
        self.last_settings.lock().clone()
    }
}

#[async_trait]
impl Module for MockModule {
    async fn call(&self, context: ModuleContext) -> Result<Value> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_arc.lock() = Some(context.arc.clone());
        *self.last_settings.lock() = Some(context.utils.get_settings().clone());

        if let Some(latency) = self.simulated_latency {
            tokio::time::sleep(latency).await;
        }

        match &self.behavior {
            Behavior::Return(value) => Ok(value.clone()),
            Behavior::Fail(message) => Err(Error::module(message.clone())),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

/// Builder for containers made of mock modules
#[derive(Default)]
pub struct ContainerBuilder {
    container: Container,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension
    pub fn extension(mut self, name: &str, display_name: &str) -> Self {
        self.container.extensions.insert(
            name.to_string(),
            ExtensionDefinition {
                display_name: display_name.to_string(),
                settings: Value::Null,
            },
        );
        self
    }

    /// Register a module under `path` for `extension`
    pub fn module(mut self, path: &str, extension: &str, display_name: &str, module: Arc<dyn Module>) -> Self {
        self.container.modules.insert(
            path.to_string(),
            ModuleDefinition::new(extension, display_name).with_exports(module),
        );
        self
    }

    pub fn build(self) -> Container {
        self.container
    }
}

/// HTTP client recording every request and answering with a fixed response
#[derive(Default)]
pub struct RecordingClient {
    pub requests: Mutex<Vec<FetchRequest>>,
    pub body: &'static str,
}

#[async_trait]
impl HttpClient for RecordingClient {
    async fn send(&self, request: FetchRequest) -> Result<FetchResponse> {
        self.requests.lock().push(request);

        Ok(FetchResponse {
            status: 200,
            headers: Headers::new(),
            body: Bytes::from_static(self.body.as_bytes()),
        })
    }
}
