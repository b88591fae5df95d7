//! Per-kind step outputs recorded in the execution trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::Variables;

/// Output of a start or end node: a fixed marker message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerOutput {
    pub message: String,
    pub node_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationOutput {
    pub temperature: f64,
    pub location: String,
    pub api_response: Value,
    pub endpoint: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionOutput {
    pub condition_met: bool,
    pub operator: String,
    pub threshold: f64,
    pub actual_value: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailOutput {
    pub email_draft: EmailDraft,
    pub delivery_status: String,
    pub message_id: String,
    pub email_sent: bool,
}

/// What a node produced, serialised as the bare per-kind object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepOutput {
    Start(MarkerOutput),
    /// Echo of the submitted form data.
    Form(Variables),
    Integration(IntegrationOutput),
    Condition(ConditionOutput),
    Email(EmailOutput),
    End(MarkerOutput),
    /// Output of a handler outside the built-in set.
    Other(Value),
}
