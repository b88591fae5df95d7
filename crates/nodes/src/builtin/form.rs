//! Form node: validate the submitted values and expose them as variables.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::data::{FormNodeData, KindData};
use crate::output::StepOutput;
use crate::traits::{ExecutableNode, NodeInvocation};
use crate::validator::InputValidator;
use crate::NodeError;

pub struct FormNode {
    validator: Arc<dyn InputValidator>,
}

impl FormNode {
    pub fn new(validator: Arc<dyn InputValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl ExecutableNode for FormNode {
    async fn execute(
        &self,
        node: NodeInvocation<'_>,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, NodeError> {
        let data = FormNodeData::parse(node.data)?;
        debug!(node_id = node.node_id, fields = ?data.metadata.input_fields, "executing form node");

        self.validator
            .validate_form_data(&ctx.form_data, &data.metadata.input_fields)?;

        for (key, value) in ctx.form_data.iter() {
            ctx.variables.set(key.clone(), value.clone());
        }

        Ok(StepOutput::Form(ctx.form_data.clone()))
    }
}
