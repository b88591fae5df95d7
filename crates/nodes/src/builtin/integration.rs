//! Integration node: fetch the current temperature for the submitted city.

use async_trait::async_trait;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::data::{IntegrationNodeData, KindData};
use crate::integration::WeatherIntegration;
use crate::output::{IntegrationOutput, StepOutput};
use crate::traits::{ExecutableNode, NodeInvocation};
use crate::NodeError;

pub struct IntegrationNode {
    integration: WeatherIntegration,
}

impl IntegrationNode {
    pub fn new(integration: WeatherIntegration) -> Self {
        Self { integration }
    }
}

#[async_trait]
impl ExecutableNode for IntegrationNode {
    async fn execute(
        &self,
        node: NodeInvocation<'_>,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, NodeError> {
        let data = IntegrationNodeData::parse(node.data)?;
        debug!(node_id = node.node_id, "executing integration node");

        let reading = self
            .integration
            .resolve_and_call(&data.metadata, &ctx.variables)
            .await?;

        ctx.variables.set("temperature", reading.temperature);
        ctx.variables.set("location", reading.location.clone());

        Ok(StepOutput::Integration(IntegrationOutput {
            temperature: reading.temperature,
            location: reading.location,
            api_response: reading.raw_response,
            endpoint: reading.url,
            status_code: reading.status,
        }))
    }
}
