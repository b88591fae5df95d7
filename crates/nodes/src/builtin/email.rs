//! Email node: render the alert template and hand it to the sender.
//!
//! Templates see the run variables with `city` replaced by the canonical
//! `location` the integration resolved. When the run has a `name`, the body
//! opens with a `Hi <name>, ` greeting.

use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::Utc;
use regex::{Captures, Regex};
use tracing::info;
use uuid::Uuid;

use crate::context::ExecutionContext;
use crate::data::{EmailNodeData, KindData};
use crate::email::EmailSender;
use crate::output::{EmailDraft, EmailOutput, StepOutput};
use crate::traits::{ExecutableNode, NodeInvocation};
use crate::value::{Variable, Variables};
use crate::NodeError;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is valid"))
}

/// Substitute `{{name}}` placeholders from `vars`. Numbers render with one
/// decimal place; unknown names stay as written.
pub fn render_template<'t>(template: &'t str, vars: &Variables) -> Cow<'t, str> {
    placeholder().replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
        Some(Variable::Number(n)) => format!("{n:.1}"),
        Some(value) => value.to_string(),
        None => caps[0].to_owned(),
    })
}

pub struct EmailNode {
    sender: Arc<dyn EmailSender>,
    from: String,
}

impl EmailNode {
    pub fn new(sender: Arc<dyn EmailSender>, from: impl Into<String>) -> Self {
        Self {
            sender,
            from: from.into(),
        }
    }
}

#[async_trait]
impl ExecutableNode for EmailNode {
    async fn execute(
        &self,
        node: NodeInvocation<'_>,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, NodeError> {
        let data = EmailNodeData::parse(node.data)?;
        let template = &data.metadata.email_template;

        let to = ctx.variables.require_str("email")?.to_owned();
        let location = ctx.variables.require_str("location")?.to_owned();
        let name = ctx
            .variables
            .get("name")
            .and_then(Variable::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_owned);

        let mut vars = ctx.variables.clone();
        vars.set("city", location);

        let subject = render_template(&template.subject, &vars).into_owned();
        let body = render_template(&template.body, &vars);
        let body = match name {
            Some(name) => format!("Hi {name}, {body}"),
            None => body.into_owned(),
        };

        self.sender.send(&to, &subject, &body).await?;

        let message_id = format!("msg_{}", Uuid::new_v4().simple());
        info!(node_id = node.node_id, to = %to, message_id = %message_id, "alert email sent");

        Ok(StepOutput::Email(EmailOutput {
            email_draft: EmailDraft {
                to,
                from: self.from.clone(),
                subject,
                body,
                timestamp: Utc::now(),
            },
            delivery_status: "sent".into(),
            message_id,
            email_sent: true,
        }))
    }
}
