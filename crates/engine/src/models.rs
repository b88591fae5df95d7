//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow graph looks like
//! in memory and on the wire (camelCase JSON, as the graph editor sends it),
//! plus the request/response pair of a single run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nodes::data::display_text;
use nodes::{ExecutionStep, NodeKind, Variables};

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Canvas coordinates. Display-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A single step in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within this workflow (referenced by edges).
    pub id: String,
    /// Maps to a registered `ExecutableNode` implementation.
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub position: Position,
    /// Kind-specific payload, parsed by the handler at dispatch time.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Node {
    pub fn new(
        id: impl Into<String>,
        node_type: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position: Position::default(),
            data,
        }
    }

    /// Label for the trace: the node's own, else its kind's default.
    pub fn label(&self) -> String {
        match display_text(&self.data).0 {
            Some(label) => label.to_owned(),
            None => self.kind_default(NodeKind::default_label),
        }
    }

    pub fn description(&self) -> String {
        match display_text(&self.data).1 {
            Some(description) => description.to_owned(),
            None => self.kind_default(NodeKind::default_description),
        }
    }

    fn kind_default(&self, pick: fn(&NodeKind) -> &'static str) -> String {
        self.node_type
            .parse::<NodeKind>()
            .map(|kind| pick(&kind).to_owned())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub stroke: String,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelStyle {
    pub fill: String,
    pub font_weight: String,
}

/// Directed edge from one node to another.
///
/// Only `source`, `target` and `source_handle` affect execution; the rest is
/// carried for the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    /// `"true"` / `"false"` on edges leaving a condition node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<EdgeStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_style: Option<LabelStyle>,
}

impl Edge {
    /// Convenience constructor for an unlabelled edge.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("e-{source}-{target}"),
            source,
            target,
            source_handle: None,
            target_handle: None,
            edge_type: None,
            animated: false,
            style: None,
            label: None,
            label_style: None,
        }
    }

    /// Same edge, tagged with a branch handle.
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Workflow {
    /// Convenience constructor for testing.
    pub fn new(name: impl Into<String>, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            nodes,
            edges,
        }
    }
}

// ---------------------------------------------------------------------------
// Run request / response
// ---------------------------------------------------------------------------

/// Inputs for one run: the submitted form and the condition parameters
/// (`operator`, `threshold`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    #[serde(default)]
    pub form_data: Variables,
    #[serde(default)]
    pub condition: Variables,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Summary of one run: overall status, the step trace, and the error that
/// stopped it, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResponse {
    pub executed_at: DateTime<Utc>,
    pub status: RunStatus,
    pub steps: Vec<ExecutionStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResponse {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
