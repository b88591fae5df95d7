//! Engine-level error types.

use nodes::NodeError;
use thiserror::Error;

/// Errors produced by the workflow engine (validation + execution).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    // ------ Validation errors ------

    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// An edge references a node ID that doesn't exist in the workflow.
    #[error("edge references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference {
        node_id: String,
        side: &'static str,
    },

    #[error("workflow must have exactly one start node, found {0}")]
    StartNodeCount(usize),

    #[error("workflow must have at least one end node")]
    NoEndNode,

    #[error("end node '{0}' is not reachable from the start node")]
    UnreachableEndNode(String),

    /// Topological sort detected a cycle.
    #[error("workflow graph contains a cycle")]
    CycleDetected,

    /// A node's data does not parse for its declared type.
    #[error("node '{node_id}' has invalid data: {source}")]
    InvalidNodeData {
        node_id: String,
        #[source]
        source: NodeError,
    },

    // ------ Execution errors ------

    #[error("no start node found")]
    NoStartNode,

    /// A node failed; the whole run is aborted. Displays as the node's own
    /// message, which is what the run response carries.
    #[error("{source}")]
    NodeFailed {
        node_id: String,
        #[source]
        source: NodeError,
    },

    /// The run visited more nodes than the configured cap allows.
    #[error("execution exceeded the limit of {0} node visits")]
    StepLimitExceeded(usize),
}
