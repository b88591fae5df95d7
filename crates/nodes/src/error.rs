//! Node-level error type.

use thiserror::Error;

/// Errors returned while parsing, validating or executing a single node.
///
/// The engine records the message on the failing node's step and aborts the
/// run. Nothing here is retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NodeError {
    // ------ Node data ------

    /// The node's payload could not be decoded into its kind's shape.
    #[error("failed to parse {node_type} node data: {message}")]
    Parse { node_type: String, message: String },

    /// The payload decoded but is structurally invalid.
    #[error("{0}")]
    Validation(String),

    /// No handler (or data shape) exists for this type tag.
    #[error("unsupported node type: {0}")]
    UnknownNodeType(String),

    /// Submitted form values failed validation; every problem is listed.
    #[error("form validation failed: {}", .0.join("; "))]
    InvalidForm(Vec<String>),

    // ------ Variables ------

    /// A variable the node needs is absent from the run context.
    #[error("required input variable '{0}' not found")]
    MissingInput(String),

    /// A variable exists but holds the wrong kind of value.
    #[error("variable '{name}' must be {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    // ------ Integration ------

    #[error("city '{city}' not found in available options: [{}]", .available.join(", "))]
    LocationNotFound { city: String, available: Vec<String> },

    #[error("API call failed: {0}")]
    UpstreamCall(String),

    #[error("malformed API response: {0}")]
    MalformedResponse(String),

    // ------ Condition ------

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("condition result not found in context")]
    MissingConditionResult,

    // ------ Email ------

    #[error("recipient email is required")]
    InvalidRecipient,

    #[error("email subject is required")]
    InvalidSubject,

    /// The email transport rejected or failed to deliver the message.
    #[error("failed to send email: {0}")]
    Delivery(String),
}
