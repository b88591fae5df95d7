//! Typed node payloads.
//!
//! Every node carries a `data` object whose shape depends on the node's
//! `type`. [`NodeData::parse`] selects the variant directly from that tag and
//! then runs the variant's structural validation.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NodeError;

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

/// The built-in node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    Form,
    Integration,
    Condition,
    Email,
    End,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        Self::Start,
        Self::Form,
        Self::Integration,
        Self::Condition,
        Self::Email,
        Self::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Form => "form",
            Self::Integration => "integration",
            Self::Condition => "condition",
            Self::Email => "email",
            Self::End => "end",
        }
    }

    /// Trace label used when a node's data doesn't provide one.
    pub fn default_label(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Form => "User Input",
            Self::Integration => "Weather API",
            Self::Condition => "Check Condition",
            Self::Email => "Send Alert",
            Self::End => "Complete",
        }
    }

    /// Trace description used when a node's data doesn't provide one.
    pub fn default_description(&self) -> &'static str {
        match self {
            Self::Start => "Begin weather check workflow",
            Self::Form => "Process collected data - name, email, location",
            Self::Integration => "Fetch current temperature",
            Self::Condition => "Evaluate temperature threshold",
            Self::Email => "Email weather alert notification",
            Self::End => "Workflow execution finished",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| NodeError::UnknownNodeType(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Shared metadata pieces
// ---------------------------------------------------------------------------

/// Which connection points a node exposes in the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandleConfig {
    #[serde(default)]
    pub source: bool,
    #[serde(default)]
    pub target: bool,
}

/// Handle configuration for condition nodes, whose source side lists the
/// branch tags (`["true", "false"]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchHandleConfig {
    #[serde(default)]
    pub source: Vec<String>,
    #[serde(default)]
    pub target: bool,
}

// ---------------------------------------------------------------------------
// Per-kind payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartNodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: StartMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    #[serde(default)]
    pub has_handles: HandleConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormNodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub metadata: FormMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormMetadata {
    #[serde(default)]
    pub has_handles: HandleConfig,
    pub input_fields: Vec<String>,
    #[serde(default)]
    pub output_variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationNodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub metadata: IntegrationMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationMetadata {
    #[serde(default)]
    pub has_handles: HandleConfig,
    #[serde(default)]
    pub input_variables: Vec<String>,
    /// URL template with `{lat}` / `{lon}` placeholders.
    pub api_endpoint: String,
    #[serde(default)]
    pub options: Vec<LocationOption>,
    #[serde(default)]
    pub output_variables: Vec<String>,
}

/// A named location the integration node can resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationOption {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionNodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub metadata: ConditionMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionMetadata {
    #[serde(default)]
    pub has_handles: BranchHandleConfig,
    /// Display-only; the operator and threshold arrive with the run request.
    pub condition_expression: String,
    #[serde(default)]
    pub output_variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailNodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub metadata: EmailMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMetadata {
    #[serde(default)]
    pub has_handles: HandleConfig,
    #[serde(default)]
    pub input_variables: Vec<String>,
    pub email_template: EmailTemplate,
    #[serde(default)]
    pub output_variables: Vec<String>,
}

/// Subject/body pair with `{{variable}}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndNodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: EndMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndMetadata {
    #[serde(default)]
    pub has_handles: HandleConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_variables: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parsing + validation
// ---------------------------------------------------------------------------

/// Implemented by every per-kind payload.
pub trait KindData: DeserializeOwned {
    const KIND: NodeKind;

    /// Report the first structural problem, if any.
    fn validate(&self) -> Result<(), NodeError>;

    /// Decode `raw` as this kind and validate it. A `null` payload decodes
    /// like an empty object.
    fn parse(raw: &Value) -> Result<Self, NodeError> {
        check_type_tag(Self::KIND, raw)?;
        let raw = match raw {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        let data: Self = serde_json::from_value(raw).map_err(|e| NodeError::Parse {
            node_type: Self::KIND.to_string(),
            message: e.to_string(),
        })?;
        data.validate()?;
        Ok(data)
    }
}

impl KindData for StartNodeData {
    const KIND: NodeKind = NodeKind::Start;
    fn validate(&self) -> Result<(), NodeError> {
        Ok(())
    }
}

impl KindData for FormNodeData {
    const KIND: NodeKind = NodeKind::Form;
    fn validate(&self) -> Result<(), NodeError> {
        if self.metadata.input_fields.is_empty() {
            return Err(NodeError::Validation(
                "form node must have at least one input field".into(),
            ));
        }
        Ok(())
    }
}

impl KindData for IntegrationNodeData {
    const KIND: NodeKind = NodeKind::Integration;
    fn validate(&self) -> Result<(), NodeError> {
        if self.metadata.api_endpoint.trim().is_empty() {
            return Err(NodeError::Validation(
                "integration node must have an API endpoint".into(),
            ));
        }
        Ok(())
    }
}

impl KindData for ConditionNodeData {
    const KIND: NodeKind = NodeKind::Condition;
    fn validate(&self) -> Result<(), NodeError> {
        if self.metadata.condition_expression.trim().is_empty() {
            return Err(NodeError::Validation(
                "condition node must have a condition expression".into(),
            ));
        }
        Ok(())
    }
}

impl KindData for EmailNodeData {
    const KIND: NodeKind = NodeKind::Email;
    fn validate(&self) -> Result<(), NodeError> {
        if self.metadata.email_template.subject.trim().is_empty() {
            return Err(NodeError::Validation("email node must have a subject".into()));
        }
        if self.metadata.email_template.body.trim().is_empty() {
            return Err(NodeError::Validation("email node must have a body".into()));
        }
        Ok(())
    }
}

impl KindData for EndNodeData {
    const KIND: NodeKind = NodeKind::End;
    fn validate(&self) -> Result<(), NodeError> {
        Ok(())
    }
}

/// A node payload, keyed by its kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeData {
    Start(StartNodeData),
    Form(FormNodeData),
    Integration(IntegrationNodeData),
    Condition(ConditionNodeData),
    Email(EmailNodeData),
    End(EndNodeData),
}

impl NodeData {
    /// Parse `raw` as the payload for `node_type`.
    ///
    /// # Errors
    /// - [`NodeError::UnknownNodeType`] for an unrecognised tag.
    /// - [`NodeError::Parse`] if the payload doesn't decode.
    /// - [`NodeError::Validation`] if it decodes but is structurally invalid.
    pub fn parse(node_type: &str, raw: &Value) -> Result<Self, NodeError> {
        Ok(match node_type.parse::<NodeKind>()? {
            NodeKind::Start => Self::Start(StartNodeData::parse(raw)?),
            NodeKind::Form => Self::Form(FormNodeData::parse(raw)?),
            NodeKind::Integration => Self::Integration(IntegrationNodeData::parse(raw)?),
            NodeKind::Condition => Self::Condition(ConditionNodeData::parse(raw)?),
            NodeKind::Email => Self::Email(EmailNodeData::parse(raw)?),
            NodeKind::End => Self::End(EndNodeData::parse(raw)?),
        })
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Start(_) => NodeKind::Start,
            Self::Form(_) => NodeKind::Form,
            Self::Integration(_) => NodeKind::Integration,
            Self::Condition(_) => NodeKind::Condition,
            Self::Email(_) => NodeKind::Email,
            Self::End(_) => NodeKind::End,
        }
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        match self {
            Self::Start(d) => d.validate(),
            Self::Form(d) => d.validate(),
            Self::Integration(d) => d.validate(),
            Self::Condition(d) => d.validate(),
            Self::Email(d) => d.validate(),
            Self::End(d) => d.validate(),
        }
    }
}

/// A payload that names its own `type` must agree with the node's type.
fn check_type_tag(kind: NodeKind, raw: &Value) -> Result<(), NodeError> {
    match raw.get("type").and_then(Value::as_str) {
        Some(tag) if tag != kind.as_str() => Err(NodeError::Validation(format!(
            "data type mismatch: expected {kind}, got {tag}"
        ))),
        _ => Ok(()),
    }
}

/// The `label` and `description` strings of a raw payload, if present.
pub fn display_text(raw: &Value) -> (Option<&str>, Option<&str>) {
    let text = |key: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };
    (text("label"), text("description"))
}
