//! Workflow execution engine.
//!
//! `WorkflowExecutor` is the central orchestrator:
//! 1. Copies the run's condition parameters into the variable bag as
//!    `condition_<key>`.
//! 2. Finds the start node and walks the graph depth-first, in edge-list
//!    order, dispatching each node through the `NodeRegistry`.
//! 3. Records one step per visit; after a node completes, its handler's
//!    `Route` decides which outgoing edges are followed.
//! 4. Stops at the first failing node. The failure is recorded on that
//!    node's step and becomes the run's error.
//!
//! Nodes reached along several paths run once per path. Cycles are cut off
//! by the `max_steps` visit cap; the visit that would exceed it is recorded
//! as a failed step without running the node.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use nodes::builtin::{self, Collaborators};
use nodes::{
    ExecutableNode, ExecutionContext, ExecutionStep, NodeError, NodeInvocation, NodeKind, Route,
};

use crate::models::{Edge, ExecutionRequest, ExecutionResponse, Node, RunStatus, Workflow};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum node visits in one run.
    pub max_steps: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { max_steps: 1000 }
    }
}

// ---------------------------------------------------------------------------
// Node registry
// ---------------------------------------------------------------------------

/// Maps `node_type` strings to shared `ExecutableNode` implementations.
pub type NodeRegistry = HashMap<String, Arc<dyn ExecutableNode>>;

/// Registry with a handler for each built-in kind.
pub fn builtin_registry(services: &Collaborators) -> NodeRegistry {
    builtin::handlers(services)
        .into_iter()
        .map(|(kind, handler)| (kind.as_str().to_owned(), handler))
        .collect()
}

/// Whether `edge` is followed after its source node routed `route`.
///
/// Under a branch, a `"true"` handle needs a true result, a `"false"` handle a
/// false one, and an unlabelled edge counts as the true branch. Any other
/// handle is never followed.
pub fn should_follow(edge: &Edge, route: Route) -> bool {
    match route {
        Route::All => true,
        Route::Branch(met) => match edge.source_handle.as_deref() {
            None | Some("true") => met,
            Some("false") => !met,
            Some(_) => false,
        },
    }
}

// ---------------------------------------------------------------------------
// WorkflowExecutor
// ---------------------------------------------------------------------------

/// Stateless orchestrator. Independent runs may share one executor
/// concurrently; each gets its own `ExecutionContext`.
pub struct WorkflowExecutor {
    registry: NodeRegistry,
    config: ExecutorConfig,
}

impl WorkflowExecutor {
    /// Create a new executor.
    pub fn new(registry: NodeRegistry, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    /// Add or replace the handler for `node_type`.
    pub fn register(&mut self, node_type: impl Into<String>, handler: Arc<dyn ExecutableNode>) {
        self.registry.insert(node_type.into(), handler);
    }

    /// Run the workflow and summarise the outcome.
    ///
    /// Never fails outright: every problem ends up as a `failed` response
    /// carrying the error message.
    #[instrument(skip(self, workflow, request), fields(workflow_id = %workflow.id))]
    pub async fn run(&self, workflow: &Workflow, request: &ExecutionRequest) -> ExecutionResponse {
        let mut ctx = ExecutionContext::new(workflow.id, request.form_data.clone());
        for (key, value) in request.condition.iter() {
            ctx.variables.set(format!("condition_{key}"), value.clone());
        }

        info!(
            execution_id = %ctx.execution_id,
            nodes = workflow.nodes.len(),
            edges = workflow.edges.len(),
            "starting workflow run"
        );

        let outcome = self.traverse(workflow, &mut ctx).await;
        let (status, error) = match outcome {
            Ok(()) => {
                info!(steps = ctx.steps.len(), "workflow run completed");
                (RunStatus::Completed, None)
            }
            Err(e) => {
                warn!(steps = ctx.steps.len(), error = %e, "workflow run failed");
                (RunStatus::Failed, Some(e.to_string()))
            }
        };

        ExecutionResponse {
            executed_at: Utc::now(),
            status,
            steps: ctx.steps,
            error,
        }
    }

    // -----------------------------------------------------------------------
    // Internal: depth-first walk from the start node.
    // -----------------------------------------------------------------------

    async fn traverse(
        &self,
        workflow: &Workflow,
        ctx: &mut ExecutionContext,
    ) -> Result<(), EngineError> {
        let node_map: HashMap<&str, &Node> = workflow
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n))
            .collect();

        let mut edge_map: HashMap<&str, Vec<&Edge>> = HashMap::new();
        for edge in &workflow.edges {
            edge_map.entry(edge.source.as_str()).or_default().push(edge);
        }

        let start = workflow
            .nodes
            .iter()
            .find(|n| n.node_type == NodeKind::Start.as_str())
            .ok_or(EngineError::NoStartNode)?;

        // Targets are pushed in reverse so they pop in edge-list order.
        let mut pending: Vec<&str> = vec![start.id.as_str()];
        let mut visits = 0usize;

        while let Some(node_id) = pending.pop() {
            let node = node_map
                .get(node_id)
                .copied()
                .ok_or_else(|| EngineError::UnknownNodeReference {
                    node_id: node_id.to_owned(),
                    side: "target",
                })?;

            if visits >= self.config.max_steps {
                let err = EngineError::StepLimitExceeded(self.config.max_steps);
                error!(node_id = %node.id, error = %err, "visit limit reached");
                ctx.add_step(
                    ExecutionStep::running(
                        node.id.as_str(),
                        node.node_type.as_str(),
                        node.label(),
                        node.description(),
                    )
                    .fail(err.to_string(), 0),
                );
                return Err(err);
            }
            visits += 1;

            let route = self.dispatch(node, ctx).await?;

            if let Some(outgoing) = edge_map.get(node_id) {
                for edge in outgoing.iter().rev() {
                    if should_follow(edge, route) {
                        pending.push(edge.target.as_str());
                    }
                }
            }
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal: run one node and record its step.
    // -----------------------------------------------------------------------

    async fn dispatch(
        &self,
        node: &Node,
        ctx: &mut ExecutionContext,
    ) -> Result<Route, EngineError> {
        let step = ExecutionStep::running(
            node.id.as_str(),
            node.node_type.as_str(),
            node.label(),
            node.description(),
        );
        debug!(node_id = %node.id, node_type = %node.node_type, "dispatching node");

        let started = Instant::now();
        let result = match self.registry.get(&node.node_type) {
            Some(handler) => {
                let invocation = NodeInvocation {
                    node_id: &node.id,
                    node_type: &node.node_type,
                    data: &node.data,
                };
                match handler.execute(invocation, ctx).await {
                    Ok(output) => handler.route(ctx).map(|route| (output, route)),
                    Err(e) => Err(e),
                }
            }
            None => Err(NodeError::UnknownNodeType(node.node_type.clone())),
        };
        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok((output, route)) => {
                debug!(node_id = %node.id, ?route, duration_ms = elapsed, "node completed");
                ctx.add_step(step.complete(output, elapsed));
                Ok(route)
            }
            Err(source) => {
                error!(
                    node_id = %node.id,
                    node_type = %node.node_type,
                    error = %source,
                    "node failed"
                );
                ctx.add_step(step.fail(source.to_string(), elapsed));
                Err(EngineError::NodeFailed {
                    node_id: node.id.clone(),
                    source,
                })
            }
        }
    }
}
