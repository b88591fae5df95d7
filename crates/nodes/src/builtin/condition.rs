//! Condition node: compare the fetched temperature against the run's
//! operator/threshold pair and pick a branch.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::data::{ConditionNodeData, KindData};
use crate::output::{ConditionOutput, StepOutput};
use crate::traits::{ExecutableNode, NodeInvocation, Route};
use crate::NodeError;

/// Variable the condition result is written to.
pub const CONDITION_MET: &str = "conditionMet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    GreaterThan,
    LessThan,
    Equals,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::Equals => "equals",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThanOrEqual => "less_than_or_equal",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::Equals => "=",
            Self::GreaterThanOrEqual => "≥",
            Self::LessThanOrEqual => "≤",
        }
    }

    /// `actual <op> threshold`. `Equals` is an exact float comparison.
    pub fn evaluate(&self, actual: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => actual > threshold,
            Self::LessThan => actual < threshold,
            Self::Equals => actual == threshold,
            Self::GreaterThanOrEqual => actual >= threshold,
            Self::LessThanOrEqual => actual <= threshold,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greater_than" => Ok(Self::GreaterThan),
            "less_than" => Ok(Self::LessThan),
            "equals" => Ok(Self::Equals),
            "greater_than_or_equal" => Ok(Self::GreaterThanOrEqual),
            "less_than_or_equal" => Ok(Self::LessThanOrEqual),
            other => Err(NodeError::UnsupportedOperator(other.to_owned())),
        }
    }
}

pub struct ConditionNode;

#[async_trait]
impl ExecutableNode for ConditionNode {
    async fn execute(
        &self,
        node: NodeInvocation<'_>,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, NodeError> {
        ConditionNodeData::parse(node.data)?;

        let operator: Operator = ctx.variables.require_str("condition_operator")?.parse()?;
        let threshold = ctx.variables.require_number("condition_threshold")?;
        let temperature = ctx.variables.require_number("temperature")?;

        let met = operator.evaluate(temperature, threshold);
        ctx.variables.set(CONDITION_MET, met);

        debug!(
            node_id = node.node_id,
            %operator, threshold, temperature, met, "condition evaluated"
        );

        Ok(StepOutput::Condition(ConditionOutput {
            condition_met: met,
            operator: operator.as_str().to_owned(),
            threshold,
            actual_value: temperature,
            message: format!(
                "Temperature {:.1}°C {} {:.1}°C - condition {}",
                temperature,
                operator.symbol(),
                threshold,
                if met { "met" } else { "not met" }
            ),
        }))
    }

    fn route(&self, ctx: &ExecutionContext) -> Result<Route, NodeError> {
        match ctx.variables.require_bool(CONDITION_MET) {
            Ok(met) => Ok(Route::Branch(met)),
            Err(NodeError::MissingInput(_)) => Err(NodeError::MissingConditionResult),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Variables;
    use serde_json::json;
    use uuid::Uuid;

    fn data() -> serde_json::Value {
        json!({
            "label": "Check Condition",
            "metadata": { "conditionExpression": "temperature {{operator}} {{threshold}}" }
        })
    }

    fn ctx(operator: &str, threshold: f64, temperature: f64) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(Uuid::new_v4(), Variables::new());
        ctx.variables.set("condition_operator", operator);
        ctx.variables.set("condition_threshold", threshold);
        ctx.variables.set("temperature", temperature);
        ctx
    }

    async fn run(ctx: &mut ExecutionContext) -> Result<StepOutput, NodeError> {
        let data = data();
        let node = NodeInvocation {
            node_id: "condition-1",
            node_type: "condition",
            data: &data,
        };
        ConditionNode.execute(node, ctx).await
    }

    #[test]
    fn operators_compare_actual_against_threshold() {
        assert!(Operator::GreaterThan.evaluate(28.5, 25.0));
        assert!(!Operator::LessThan.evaluate(28.5, 25.0));
        assert!(Operator::Equals.evaluate(25.0, 25.0));
        assert!(Operator::GreaterThanOrEqual.evaluate(25.0, 25.0));
        assert!(Operator::LessThanOrEqual.evaluate(24.9, 25.0));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        assert_eq!(
            "between".parse::<Operator>(),
            Err(NodeError::UnsupportedOperator("between".into()))
        );
    }

    #[tokio::test]
    async fn greater_than_sets_condition_met() {
        let mut ctx = ctx("greater_than", 25.0, 28.5);
        let out = run(&mut ctx).await.unwrap();

        let StepOutput::Condition(out) = out else {
            panic!("expected condition output");
        };
        assert!(out.condition_met);
        assert_eq!(out.message, "Temperature 28.5°C > 25.0°C - condition met");
        assert_eq!(ctx.variables.require_bool(CONDITION_MET), Ok(true));
        assert_eq!(ConditionNode.route(&ctx), Ok(Route::Branch(true)));
    }

    #[tokio::test]
    async fn less_than_with_same_values_is_not_met() {
        let mut ctx = ctx("less_than", 25.0, 28.5);
        let StepOutput::Condition(out) = run(&mut ctx).await.unwrap() else {
            panic!("expected condition output");
        };
        assert!(!out.condition_met);
        assert_eq!(out.message, "Temperature 28.5°C < 25.0°C - condition not met");
        assert_eq!(ConditionNode.route(&ctx), Ok(Route::Branch(false)));
    }

    #[tokio::test]
    async fn missing_temperature_fails() {
        let mut ctx = ExecutionContext::new(Uuid::new_v4(), Variables::new());
        ctx.variables.set("condition_operator", "equals");
        ctx.variables.set("condition_threshold", 10.0);

        let err = run(&mut ctx).await.unwrap_err();
        assert_eq!(err, NodeError::MissingInput("temperature".into()));
    }

    #[tokio::test]
    async fn string_threshold_is_a_type_mismatch() {
        let mut ctx = ctx("equals", 0.0, 20.0);
        ctx.variables.set("condition_threshold", "25");

        let err = run(&mut ctx).await.unwrap_err();
        assert!(matches!(
            err,
            NodeError::TypeMismatch { name, .. } if name == "condition_threshold"
        ));
    }

    #[test]
    fn route_without_result_is_missing_condition_result() {
        let ctx = ExecutionContext::new(Uuid::new_v4(), Variables::new());
        assert_eq!(
            ConditionNode.route(&ctx),
            Err(NodeError::MissingConditionResult)
        );
    }
}
