//! Start and end nodes: no inputs, a fixed marker as output.

use async_trait::async_trait;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::data::{EndNodeData, KindData, StartNodeData};
use crate::output::{MarkerOutput, StepOutput};
use crate::traits::{ExecutableNode, NodeInvocation};
use crate::NodeError;

pub struct StartNode;

#[async_trait]
impl ExecutableNode for StartNode {
    async fn execute(
        &self,
        node: NodeInvocation<'_>,
        _ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, NodeError> {
        StartNodeData::parse(node.data)?;
        debug!(node_id = node.node_id, "executing start node");
        Ok(StepOutput::Start(MarkerOutput {
            message: "Begin weather check workflow".into(),
            node_id: node.node_id.to_owned(),
        }))
    }
}

pub struct EndNode;

#[async_trait]
impl ExecutableNode for EndNode {
    async fn execute(
        &self,
        node: NodeInvocation<'_>,
        _ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, NodeError> {
        EndNodeData::parse(node.data)?;
        debug!(node_id = node.node_id, "executing end node");
        Ok(StepOutput::End(MarkerOutput {
            message: "Workflow execution finished".into(),
            node_id: node.node_id.to_owned(),
        }))
    }
}
