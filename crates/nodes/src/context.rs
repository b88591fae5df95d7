//! Per-run execution state and the step trace.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::output::StepOutput;
use crate::value::Variables;

/// Lifecycle of a single node visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

/// One entry in the trace; appended exactly once per node visit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    pub node_id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    pub description: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<StepOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock time spent in the node, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl ExecutionStep {
    /// A step for a node that is about to run.
    pub fn running(
        node_id: impl Into<String>,
        node_type: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            node_type: node_type.into(),
            label: label.into(),
            description: description.into(),
            status: StepStatus::Running,
            output: None,
            error: None,
            duration: None,
        }
    }

    pub fn complete(mut self, output: StepOutput, duration_ms: u64) -> Self {
        self.status = StepStatus::Completed;
        self.output = Some(output);
        self.duration = Some(duration_ms);
        self
    }

    pub fn fail(mut self, error: impl Into<String>, duration_ms: u64) -> Self {
        self.status = StepStatus::Failed;
        self.error = Some(error.into());
        self.duration = Some(duration_ms);
        self
    }
}

/// State threaded through every node of one run.
///
/// Created by the engine when a run starts and dropped once the response is
/// built. Never shared between runs.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// ID of the workflow being run.
    pub workflow_id: Uuid,
    /// ID of this run.
    pub execution_id: Uuid,
    /// Values submitted with the run request.
    pub form_data: Variables,
    /// Values exchanged between nodes.
    pub variables: Variables,
    /// Trace of visited nodes, in visit order.
    pub steps: Vec<ExecutionStep>,
    pub started_at: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn new(workflow_id: Uuid, form_data: Variables) -> Self {
        Self {
            workflow_id,
            execution_id: Uuid::new_v4(),
            form_data,
            variables: Variables::new(),
            steps: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn add_step(&mut self, step: ExecutionStep) {
        self.steps.push(step);
    }
}
