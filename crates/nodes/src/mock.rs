//! Test doubles: `MockApiClient` for the weather integration and `MockNode`
//! for exercising the engine without the built-in handlers.
//!
//! Both record every call they receive so tests can assert on traffic.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ExecutionContext;
use crate::integration::{ApiClient, ApiResponse};
use crate::output::StepOutput;
use crate::traits::{ExecutableNode, NodeInvocation, Route};
use crate::NodeError;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// MockApiClient
// ---------------------------------------------------------------------------

/// Canned weather responses keyed by URL substring.
///
/// Errors are matched before responses; a URL matching neither gets a
/// 25.0° reading.
#[derive(Debug, Clone, Default)]
pub struct MockApiClient {
    responses: Vec<(String, Value)>,
    errors: Vec<(String, String)>,
    /// Every URL requested, in call order.
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `body` to any URL containing `pattern`.
    pub fn with_response(mut self, pattern: impl Into<String>, body: Value) -> Self {
        self.responses.push((pattern.into(), body));
        self
    }

    /// Fail any URL containing `pattern` with an upstream error.
    pub fn with_error(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors.push((pattern.into(), message.into()));
        self
    }

    /// Fail every call.
    pub fn with_api_error(self, message: &str) -> Self {
        self.with_error("", format!("API error: {message}"))
    }

    /// Seed Sydney (28.5°) and Melbourne (22.1°), keyed on their latitude as
    /// the integration renders it.
    pub fn with_default_weather(self) -> Self {
        self.with_response("latitude=-33.868800", weather_body(28.5))
            .with_response("latitude=-37.813600", weather_body(22.1))
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

/// An Open-Meteo style `current_weather` body.
pub fn weather_body(temperature: f64) -> Value {
    json!({
        "current_weather": {
            "temperature": temperature,
            "time": "2024-01-01T12:00"
        }
    })
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn call(&self, url: &str) -> Result<ApiResponse, NodeError> {
        lock(&self.calls).push(url.to_owned());

        if let Some((_, msg)) = self.errors.iter().find(|(p, _)| url.contains(p.as_str())) {
            return Err(NodeError::UpstreamCall(msg.clone()));
        }

        let body = self
            .responses
            .iter()
            .find(|(p, _)| url.contains(p.as_str()))
            .map(|(_, body)| body.clone())
            .unwrap_or_else(|| weather_body(25.0));

        Ok(ApiResponse { status: 200, body })
    }
}

// ---------------------------------------------------------------------------
// MockNode
// ---------------------------------------------------------------------------

/// Behaviour injected into `MockNode` at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Succeed with this output.
    ReturnValue(Value),
    /// Fail with this error.
    Fail(NodeError),
}

/// A handler that records every node id it is invoked for and returns a
/// programmer-specified result.
#[derive(Debug)]
pub struct MockNode {
    /// Label used in test assertions.
    pub name: String,
    pub behaviour: MockBehaviour,
    /// Routing decision returned after a successful execute.
    pub route: Route,
    /// Node ids seen by this handler (in call order).
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockNode {
    /// Create a mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::ReturnValue(value),
            route: Route::All,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always fails with `error`.
    pub fn failing(name: impl Into<String>, error: NodeError) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::Fail(error),
            route: Route::All,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Route like a condition node that evaluated to `result`.
    pub fn branching(mut self, result: bool) -> Self {
        self.route = Route::Branch(result);
        self
    }

    /// Number of times this handler has been executed.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Node ids this handler ran for, in order.
    pub fn seen(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl ExecutableNode for MockNode {
    async fn execute(
        &self,
        node: NodeInvocation<'_>,
        _ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, NodeError> {
        lock(&self.calls).push(node.node_id.to_owned());

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => {
                // Tag the output with the handler and node so tests can trace
                // which invocation produced it.
                let mut out = json!({ "mock": self.name, "nodeId": node.node_id });
                if let (Some(out_obj), Some(v_obj)) = (out.as_object_mut(), v.as_object()) {
                    for (k, val) in v_obj {
                        out_obj.insert(k.clone(), val.clone());
                    }
                }
                Ok(StepOutput::Other(out))
            }
            MockBehaviour::Fail(err) => Err(err.clone()),
        }
    }

    fn route(&self, _ctx: &ExecutionContext) -> Result<Route, NodeError> {
        Ok(self.route)
    }
}
