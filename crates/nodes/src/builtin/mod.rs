//! Built-in handlers for the six node kinds.

pub mod condition;
pub mod email;
pub mod form;
pub mod integration;
pub mod marker;

use std::sync::Arc;

use crate::data::NodeKind;
use crate::email::EmailSender;
use crate::integration::{ApiClient, WeatherIntegration};
use crate::traits::ExecutableNode;
use crate::validator::InputValidator;

pub use condition::{ConditionNode, Operator};
pub use email::EmailNode;
pub use form::FormNode;
pub use integration::IntegrationNode;
pub use marker::{EndNode, StartNode};

/// Sender address used when none is configured.
pub const DEFAULT_FROM_ADDRESS: &str = "weather-alerts@example.com";

/// External collaborators the built-in handlers depend on.
#[derive(Clone)]
pub struct Collaborators {
    pub api_client: Arc<dyn ApiClient>,
    pub email_sender: Arc<dyn EmailSender>,
    pub validator: Arc<dyn InputValidator>,
    /// `from` address written into email drafts.
    pub from_address: String,
}

/// One handler per built-in kind, wired to `services`.
pub fn handlers(services: &Collaborators) -> Vec<(NodeKind, Arc<dyn ExecutableNode>)> {
    let form: Arc<dyn ExecutableNode> = Arc::new(FormNode::new(services.validator.clone()));
    let integration: Arc<dyn ExecutableNode> = Arc::new(IntegrationNode::new(
        WeatherIntegration::new(services.api_client.clone()),
    ));
    let email: Arc<dyn ExecutableNode> = Arc::new(EmailNode::new(
        services.email_sender.clone(),
        services.from_address.clone(),
    ));

    let start: Arc<dyn ExecutableNode> = Arc::new(StartNode);
    let condition: Arc<dyn ExecutableNode> = Arc::new(ConditionNode);
    let end: Arc<dyn ExecutableNode> = Arc::new(EndNode);

    vec![
        (NodeKind::Start, start),
        (NodeKind::Form, form),
        (NodeKind::Integration, integration),
        (NodeKind::Condition, condition),
        (NodeKind::Email, email),
        (NodeKind::End, end),
    ]
}
