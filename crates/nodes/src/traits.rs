//! The `ExecutableNode` trait: the contract every node handler must fulfil.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::output::StepOutput;
use crate::NodeError;

/// The node being dispatched, as the graph source supplied it.
#[derive(Debug, Clone, Copy)]
pub struct NodeInvocation<'a> {
    pub node_id: &'a str,
    pub node_type: &'a str,
    /// Raw `data` payload; each handler parses the shape it expects.
    pub data: &'a Value,
}

/// Which outgoing edges the engine should follow after a node completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Follow every outgoing edge.
    All,
    /// Follow only edges whose branch handle matches this result.
    Branch(bool),
}

/// The core node trait.
///
/// The engine keeps a table of these keyed by node type and calls them one at
/// a time; a handler may read and write `ctx.variables` freely.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Run the node and return what it produced for the trace.
    async fn execute(
        &self,
        node: NodeInvocation<'_>,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, NodeError>;

    /// Decide which outgoing edges to follow. Called right after a
    /// successful `execute`.
    fn route(&self, _ctx: &ExecutionContext) -> Result<Route, NodeError> {
        Ok(Route::All)
    }
}
