//! Scenario tests for the workflow execution engine.
//!
//! The built-in handlers run against `MockApiClient` and
//! `InMemoryEmailSender`, so no network access is required. Traversal rules
//! are exercised with `MockNode` registries.

use std::sync::Arc;

use serde_json::{json, Value};

use nodes::builtin::{Collaborators, DEFAULT_FROM_ADDRESS};
use nodes::email::InMemoryEmailSender;
use nodes::mock::{MockApiClient, MockNode};
use nodes::validator::DefaultInputValidator;
use nodes::{ExecutableNode, NodeError, StepOutput, StepStatus, Variables};

use crate::executor::{builtin_registry, ExecutorConfig, NodeRegistry, WorkflowExecutor};
use crate::models::{Edge, ExecutionRequest, ExecutionResponse, Node, RunStatus, Workflow};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const ENDPOINT: &str =
    "https://api.open-meteo.com/v1/forecast?latitude={lat}&longitude={lon}&current_weather=true";

/// start → form → weather-api → condition ─true→ email → end
///                                         └false→ end
fn weather_workflow() -> Workflow {
    Workflow::new(
        "weather-alert",
        vec![
            Node::new("start", "start", json!({ "label": "Start" })),
            Node::new(
                "form",
                "form",
                json!({
                    "label": "User Input",
                    "metadata": {
                        "inputFields": ["name", "email", "city"],
                        "outputVariables": ["name", "email", "city"]
                    }
                }),
            ),
            Node::new(
                "weather-api",
                "integration",
                json!({
                    "label": "Weather API",
                    "metadata": {
                        "inputVariables": ["city"],
                        "apiEndpoint": ENDPOINT,
                        "options": [
                            { "city": "Sydney", "lat": -33.8688, "lon": 151.2093 },
                            { "city": "Melbourne", "lat": -37.8136, "lon": 144.9631 }
                        ],
                        "outputVariables": ["temperature"]
                    }
                }),
            ),
            Node::new(
                "condition",
                "condition",
                json!({
                    "label": "Check Condition",
                    "metadata": {
                        "conditionExpression": "temperature {{operator}} {{threshold}}",
                        "outputVariables": ["conditionMet"]
                    }
                }),
            ),
            Node::new(
                "email",
                "email",
                json!({
                    "label": "Send Alert",
                    "metadata": {
                        "inputVariables": ["name", "email", "city", "temperature"],
                        "emailTemplate": {
                            "subject": "Weather Alert",
                            "body": "Weather alert for {{city}}! Temperature is {{temperature}}°C!"
                        },
                        "outputVariables": ["emailSent"]
                    }
                }),
            ),
            Node::new("end", "end", json!({ "label": "Complete" })),
        ],
        vec![
            Edge::new("start", "form"),
            Edge::new("form", "weather-api"),
            Edge::new("weather-api", "condition"),
            Edge::new("condition", "email").with_handle("true"),
            Edge::new("condition", "end").with_handle("false"),
            Edge::new("email", "end"),
        ],
    )
}

fn request(city: &str, operator: &str, threshold: f64) -> ExecutionRequest {
    let mut form_data = Variables::new();
    form_data.set("name", "Alice");
    form_data.set("email", "alice@example.com");
    form_data.set("city", city);

    let mut condition = Variables::new();
    condition.set("operator", operator);
    condition.set("threshold", threshold);

    ExecutionRequest { form_data, condition }
}

struct Harness {
    executor: WorkflowExecutor,
    api: MockApiClient,
    emails: InMemoryEmailSender,
}

fn harness(api: MockApiClient) -> Harness {
    let emails = InMemoryEmailSender::new();
    let services = Collaborators {
        api_client: Arc::new(api.clone()),
        email_sender: Arc::new(emails.clone()),
        validator: Arc::new(DefaultInputValidator::new()),
        from_address: DEFAULT_FROM_ADDRESS.to_string(),
    };
    Harness {
        executor: WorkflowExecutor::new(builtin_registry(&services), ExecutorConfig::default()),
        api,
        emails,
    }
}

fn step_ids(resp: &ExecutionResponse) -> Vec<&str> {
    resp.steps.iter().map(|s| s.node_id.as_str()).collect()
}

/// Registry where `start` and `mock` nodes are served by the given mocks.
fn mock_registry(start: Arc<MockNode>, mock: Arc<MockNode>) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.insert("start".into(), start);
    registry.insert("mock".into(), mock);
    registry
}

fn mock_node(id: &str) -> Node {
    Node::new(id, "mock", Value::Null)
}

// ============================================================
// Built-in weather workflow
// ============================================================

#[tokio::test]
async fn alert_is_sent_when_sydney_is_above_threshold() {
    let h = harness(MockApiClient::new().with_default_weather());
    let resp = h
        .executor
        .run(&weather_workflow(), &request("Sydney", "greater_than", 25.0))
        .await;

    assert_eq!(resp.status, RunStatus::Completed, "error: {:?}", resp.error);
    assert!(resp.error.is_none());
    assert_eq!(
        step_ids(&resp),
        vec!["start", "form", "weather-api", "condition", "email", "end"]
    );
    assert!(resp.steps.iter().all(|s| s.status == StepStatus::Completed));

    match &resp.steps[3].output {
        Some(StepOutput::Condition(c)) => {
            assert!(c.condition_met);
            assert_eq!(c.actual_value, 28.5);
            assert_eq!(c.threshold, 25.0);
            assert_eq!(c.operator, "greater_than");
        }
        other => panic!("unexpected condition output: {other:?}"),
    }

    let sent = h.emails.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
    assert_eq!(
        sent[0].body,
        "Hi Alice, Weather alert for Sydney! Temperature is 28.5°C!"
    );

    assert_eq!(h.api.call_count(), 1);
    assert!(h.api.calls()[0].contains("latitude=-33.868800"));
}

#[tokio::test]
async fn alert_names_the_recipient_and_the_resolved_city() {
    let h = harness(MockApiClient::new().with_default_weather());
    let resp = h
        .executor
        .run(&weather_workflow(), &request("sydney", "greater_than", 25.0))
        .await;

    assert!(resp.is_completed(), "error: {:?}", resp.error);
    let sent = h.emails.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("Alice"), "{}", sent[0].body);
    assert!(sent[0].body.contains("Sydney"), "{}", sent[0].body);
    assert!(!sent[0].body.contains("sydney"), "{}", sent[0].body);

    match &resp.steps[4].output {
        Some(StepOutput::Email(e)) => assert_eq!(e.email_draft.body, sent[0].body),
        other => panic!("unexpected email output: {other:?}"),
    }
}

#[tokio::test]
async fn false_branch_skips_the_email() {
    let h = harness(MockApiClient::new().with_default_weather());
    let resp = h
        .executor
        .run(&weather_workflow(), &request("Sydney", "less_than", 25.0))
        .await;

    assert!(resp.is_completed());
    assert_eq!(
        step_ids(&resp),
        vec!["start", "form", "weather-api", "condition", "end"]
    );
    match &resp.steps[3].output {
        Some(StepOutput::Condition(c)) => assert!(!c.condition_met),
        other => panic!("unexpected condition output: {other:?}"),
    }
    assert!(h.emails.sent().is_empty());
}

#[tokio::test]
async fn melbourne_reading_flows_into_the_condition() {
    let h = harness(MockApiClient::new().with_default_weather());
    let resp = h
        .executor
        .run(&weather_workflow(), &request("melbourne", "greater_than", 25.0))
        .await;

    assert!(resp.is_completed());
    match &resp.steps[2].output {
        Some(StepOutput::Integration(i)) => {
            assert_eq!(i.temperature, 22.1);
            assert_eq!(i.location, "Melbourne");
            assert_eq!(i.status_code, 200);
        }
        other => panic!("unexpected integration output: {other:?}"),
    }
    assert!(h.emails.sent().is_empty());
}

#[tokio::test]
async fn upstream_failure_aborts_the_run() {
    let h = harness(MockApiClient::new().with_api_error("service unavailable"));
    let resp = h
        .executor
        .run(&weather_workflow(), &request("Sydney", "greater_than", 25.0))
        .await;

    assert_eq!(resp.status, RunStatus::Failed);
    assert_eq!(step_ids(&resp), vec!["start", "form", "weather-api"]);
    assert_eq!(resp.steps[0].status, StepStatus::Completed);
    assert_eq!(resp.steps[1].status, StepStatus::Completed);

    let failed = &resp.steps[2];
    assert_eq!(failed.status, StepStatus::Failed);
    assert!(failed.output.is_none());
    assert_eq!(
        failed.error.as_deref(),
        Some("API call failed: API error: service unavailable")
    );
    assert_eq!(resp.error, failed.error);
    assert!(h.emails.sent().is_empty());
}

#[tokio::test]
async fn unknown_city_fails_the_integration_step() {
    let h = harness(MockApiClient::new().with_default_weather());
    let resp = h
        .executor
        .run(&weather_workflow(), &request("Perth", "greater_than", 25.0))
        .await;

    assert_eq!(resp.status, RunStatus::Failed);
    assert_eq!(
        resp.error.as_deref(),
        Some("city 'Perth' not found in available options: [Sydney, Melbourne]")
    );
    assert_eq!(h.api.call_count(), 0);
}

#[tokio::test]
async fn null_form_field_is_reported_as_required() {
    let h = harness(MockApiClient::new().with_default_weather());
    let req: ExecutionRequest = serde_json::from_value(json!({
        "formData": { "name": "Alice", "email": "alice@example.com", "city": null },
        "condition": { "operator": "greater_than", "threshold": 25 }
    }))
    .unwrap();

    let resp = h.executor.run(&weather_workflow(), &req).await;

    assert_eq!(resp.status, RunStatus::Failed);
    assert_eq!(step_ids(&resp), vec!["start", "form"]);
    assert_eq!(resp.steps[1].status, StepStatus::Failed);
    let error = resp.error.unwrap_or_default();
    assert!(error.contains("field 'city' is required"), "{error}");
    assert_eq!(h.api.call_count(), 0);
}

#[tokio::test]
async fn invalid_form_submission_stops_at_the_form() {
    let h = harness(MockApiClient::new().with_default_weather());
    let mut req = request("Sydney", "greater_than", 25.0);
    req.form_data = Variables::new();
    req.form_data.set("name", "Alice");
    req.form_data.set("email", "not-an-address");

    let resp = h.executor.run(&weather_workflow(), &req).await;

    assert_eq!(resp.status, RunStatus::Failed);
    assert_eq!(step_ids(&resp), vec!["start", "form"]);
    let error = resp.error.unwrap_or_default();
    assert!(error.contains("must be a valid email address"), "{error}");
    assert!(error.contains("field 'city' is required"), "{error}");
}

#[tokio::test]
async fn unsupported_operator_fails_the_condition_step() {
    let h = harness(MockApiClient::new().with_default_weather());
    let resp = h
        .executor
        .run(&weather_workflow(), &request("Sydney", "between", 25.0))
        .await;

    assert_eq!(resp.status, RunStatus::Failed);
    assert_eq!(resp.steps.last().map(|s| s.node_id.as_str()), Some("condition"));
    assert_eq!(resp.error.as_deref(), Some("unsupported operator: between"));
}

#[tokio::test]
async fn missing_start_node_fails_without_steps() {
    let h = harness(MockApiClient::new());
    let mut workflow = weather_workflow();
    workflow.nodes.retain(|n| n.node_type != "start");

    let resp = h
        .executor
        .run(&workflow, &request("Sydney", "greater_than", 25.0))
        .await;

    assert_eq!(resp.status, RunStatus::Failed);
    assert!(resp.steps.is_empty());
    assert_eq!(resp.error.as_deref(), Some("no start node found"));
}

#[tokio::test]
async fn unknown_node_type_is_recorded_on_its_step() {
    let h = harness(MockApiClient::new());
    let workflow = Workflow::new(
        "custom",
        vec![
            Node::new("start", "start", Value::Null),
            Node::new("hook", "webhook", Value::Null),
            Node::new("end", "end", Value::Null),
        ],
        vec![Edge::new("start", "hook"), Edge::new("hook", "end")],
    );

    let resp = h.executor.run(&workflow, &ExecutionRequest::default()).await;

    assert_eq!(resp.status, RunStatus::Failed);
    assert_eq!(step_ids(&resp), vec!["start", "hook"]);
    assert_eq!(resp.steps[1].status, StepStatus::Failed);
    assert_eq!(
        resp.steps[1].error.as_deref(),
        Some("unsupported node type: webhook")
    );
}

#[tokio::test]
async fn steps_fall_back_to_kind_labels() {
    let h = harness(MockApiClient::new());
    let workflow = Workflow::new(
        "bare",
        vec![
            Node::new("s", "start", Value::Null),
            Node::new("e", "end", json!({ "label": "", "description": "Done" })),
        ],
        vec![Edge::new("s", "e")],
    );

    let resp = h.executor.run(&workflow, &ExecutionRequest::default()).await;

    assert!(resp.is_completed());
    assert_eq!(resp.steps[0].label, "Start");
    assert_eq!(resp.steps[0].description, "Begin weather check workflow");
    assert_eq!(resp.steps[1].label, "Complete");
    assert_eq!(resp.steps[1].description, "Done");
}

#[tokio::test]
async fn repeated_runs_produce_identical_traces() {
    fn normalised(resp: &ExecutionResponse) -> Value {
        fn strip(v: &mut Value) {
            match v {
                Value::Object(map) => {
                    for key in ["duration", "timestamp", "messageId"] {
                        map.remove(key);
                    }
                    map.values_mut().for_each(strip);
                }
                Value::Array(items) => items.iter_mut().for_each(strip),
                _ => {}
            }
        }
        let mut steps = serde_json::to_value(&resp.steps).unwrap();
        strip(&mut steps);
        steps
    }

    let h = harness(MockApiClient::new().with_default_weather());
    let workflow = weather_workflow();
    let req = request("Sydney", "greater_than", 25.0);

    let first = h.executor.run(&workflow, &req).await;
    let second = h.executor.run(&workflow, &req).await;

    assert_eq!(
        serde_json::to_string(&normalised(&first)).unwrap(),
        serde_json::to_string(&normalised(&second)).unwrap()
    );
    assert_eq!(h.emails.sent().len(), 2);
}

#[tokio::test]
async fn response_serialises_with_wire_names() {
    let h = harness(MockApiClient::new().with_default_weather());
    let resp = h
        .executor
        .run(&weather_workflow(), &request("Sydney", "greater_than", 25.0))
        .await;

    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["status"], "completed");
    assert!(json.get("error").is_none());
    assert!(json["executedAt"].is_string());

    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps[0]["nodeId"], "start");
    assert_eq!(steps[0]["type"], "start");
    assert_eq!(steps[0]["output"]["message"], "Begin weather check workflow");
    assert_eq!(steps[1]["output"]["city"], "Sydney");
    assert_eq!(steps[3]["output"]["conditionMet"], true);
    assert_eq!(
        steps[3]["output"]["message"],
        "Temperature 28.5°C > 25.0°C - condition met"
    );
    assert_eq!(steps[4]["output"]["deliveryStatus"], "sent");
    assert_eq!(steps[4]["output"]["emailDraft"]["to"], "alice@example.com");
    assert_eq!(steps[4]["output"]["emailDraft"]["from"], DEFAULT_FROM_ADDRESS);
}

// ============================================================
// Traversal rules (MockNode registries)
// ============================================================

#[tokio::test]
async fn diamond_runs_the_shared_node_once_per_path() {
    //   a
    //  / \
    // b   c
    //  \ /
    //   d
    let start = Arc::new(MockNode::returning("start", json!({})));
    let mock = Arc::new(MockNode::returning("mock", json!({})));
    let executor = WorkflowExecutor::new(
        mock_registry(start.clone(), mock.clone()),
        ExecutorConfig::default(),
    );

    let workflow = Workflow::new(
        "diamond",
        vec![Node::new("a", "start", Value::Null), mock_node("b"), mock_node("c"), mock_node("d")],
        vec![
            Edge::new("a", "b"),
            Edge::new("a", "c"),
            Edge::new("b", "d"),
            Edge::new("c", "d"),
        ],
    );

    let resp = executor.run(&workflow, &ExecutionRequest::default()).await;

    assert!(resp.is_completed());
    assert_eq!(step_ids(&resp), vec!["a", "b", "d", "c", "d"]);
    assert_eq!(mock.seen(), vec!["b", "d", "c", "d"]);
    assert_eq!(start.call_count(), 1);
}

#[tokio::test]
async fn cycle_is_cut_off_by_the_step_limit() {
    let start = Arc::new(MockNode::returning("start", json!({})));
    let mock = Arc::new(MockNode::returning("mock", json!({})));
    let executor = WorkflowExecutor::new(
        mock_registry(start, mock.clone()),
        ExecutorConfig { max_steps: 10 },
    );

    let workflow = Workflow::new(
        "loop",
        vec![Node::new("s", "start", Value::Null), mock_node("a"), mock_node("b")],
        vec![Edge::new("s", "a"), Edge::new("a", "b"), Edge::new("b", "a")],
    );

    let resp = executor.run(&workflow, &ExecutionRequest::default()).await;

    assert_eq!(resp.status, RunStatus::Failed);
    assert_eq!(resp.steps.len(), 11);
    assert_eq!(mock.call_count(), 9);
    assert_eq!(
        resp.error.as_deref(),
        Some("execution exceeded the limit of 10 node visits")
    );

    let (last, earlier) = resp.steps.split_last().unwrap();
    assert!(earlier.iter().all(|s| s.status == StepStatus::Completed));
    assert_eq!(last.node_id, "b");
    assert_eq!(last.status, StepStatus::Failed);
    assert_eq!(last.error, resp.error);
    assert!(last.output.is_none());
}

#[tokio::test]
async fn node_failure_stops_remaining_siblings() {
    let start = Arc::new(MockNode::returning("start", json!({})));
    let mock = Arc::new(MockNode::returning("mock", json!({})));
    let mut executor = WorkflowExecutor::new(
        mock_registry(start, mock.clone()),
        ExecutorConfig::default(),
    );
    executor.register(
        "broken",
        Arc::new(MockNode::failing("broken", NodeError::UpstreamCall("boom".into()))),
    );

    let workflow = Workflow::new(
        "fan-out",
        vec![
            Node::new("s", "start", Value::Null),
            Node::new("x", "broken", Value::Null),
            mock_node("y"),
        ],
        vec![Edge::new("s", "x"), Edge::new("s", "y")],
    );

    let resp = executor.run(&workflow, &ExecutionRequest::default()).await;

    assert_eq!(resp.status, RunStatus::Failed);
    assert_eq!(step_ids(&resp), vec!["s", "x"]);
    assert_eq!(resp.error.as_deref(), Some("API call failed: boom"));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn branch_routes_select_edges_by_handle() {
    async fn visited(result: bool) -> Vec<String> {
        let start = Arc::new(MockNode::returning("start", json!({})));
        let mock = Arc::new(MockNode::returning("mock", json!({})));
        let mut executor = WorkflowExecutor::new(
            mock_registry(start, mock.clone()),
            ExecutorConfig::default(),
        );
        executor.register(
            "gate",
            Arc::new(MockNode::returning("gate", json!({})).branching(result)),
        );

        let workflow = Workflow::new(
            "gate",
            vec![
                Node::new("s", "start", Value::Null),
                Node::new("g", "gate", Value::Null),
                mock_node("on-true"),
                mock_node("on-false"),
                mock_node("unlabelled"),
                mock_node("other-handle"),
            ],
            vec![
                Edge::new("s", "g"),
                Edge::new("g", "on-true").with_handle("true"),
                Edge::new("g", "on-false").with_handle("false"),
                Edge::new("g", "unlabelled"),
                Edge::new("g", "other-handle").with_handle("maybe"),
            ],
        );

        let resp = executor.run(&workflow, &ExecutionRequest::default()).await;
        assert!(resp.is_completed());
        mock.seen()
    }

    assert_eq!(visited(true).await, vec!["on-true", "unlabelled"]);
    assert_eq!(visited(false).await, vec!["on-false"]);
}

#[tokio::test]
async fn edge_to_missing_node_fails_when_reached() {
    let start = Arc::new(MockNode::returning("start", json!({})));
    let mock = Arc::new(MockNode::returning("mock", json!({})));
    let executor = WorkflowExecutor::new(
        mock_registry(start, mock.clone()),
        ExecutorConfig::default(),
    );

    let workflow = Workflow::new(
        "dangling",
        vec![Node::new("s", "start", Value::Null), mock_node("a")],
        vec![Edge::new("s", "a"), Edge::new("s", "ghost")],
    );

    let resp = executor.run(&workflow, &ExecutionRequest::default()).await;

    assert_eq!(resp.status, RunStatus::Failed);
    assert_eq!(step_ids(&resp), vec!["s", "a"]);
    assert_eq!(
        resp.error.as_deref(),
        Some("edge references unknown node 'ghost' (target side)")
    );
}

#[tokio::test]
async fn condition_parameters_are_prefixed_into_variables() {
    let h = harness(MockApiClient::new().with_default_weather());
    let mut req = request("Sydney", "greater_than_or_equal", 28.5);
    req.condition.set("unit", "celsius");

    let resp = h.executor.run(&weather_workflow(), &req).await;

    assert!(resp.is_completed());
    match &resp.steps[3].output {
        Some(StepOutput::Condition(c)) => {
            assert!(c.condition_met);
            assert_eq!(c.message, "Temperature 28.5°C ≥ 28.5°C - condition met");
        }
        other => panic!("unexpected condition output: {other:?}"),
    }
}

#[tokio::test]
async fn condition_node_without_its_result_cannot_route() {
    // A condition handler whose execute never writes `conditionMet`.
    struct Forgetful;

    #[async_trait::async_trait]
    impl ExecutableNode for Forgetful {
        async fn execute(
            &self,
            _node: nodes::NodeInvocation<'_>,
            _ctx: &mut nodes::ExecutionContext,
        ) -> Result<StepOutput, NodeError> {
            Ok(StepOutput::Other(json!({})))
        }

        fn route(&self, ctx: &nodes::ExecutionContext) -> Result<nodes::Route, NodeError> {
            nodes::builtin::ConditionNode.route(ctx)
        }
    }

    let start = Arc::new(MockNode::returning("start", json!({})));
    let mock = Arc::new(MockNode::returning("mock", json!({})));
    let mut executor = WorkflowExecutor::new(mock_registry(start, mock), ExecutorConfig::default());
    executor.register("condition", Arc::new(Forgetful));

    let workflow = Workflow::new(
        "forgetful",
        vec![Node::new("s", "start", Value::Null), Node::new("c", "condition", Value::Null)],
        vec![Edge::new("s", "c")],
    );

    let resp = executor.run(&workflow, &ExecutionRequest::default()).await;

    assert_eq!(resp.status, RunStatus::Failed);
    assert_eq!(resp.steps[1].status, StepStatus::Failed);
    assert_eq!(
        resp.error.as_deref(),
        Some("condition result not found in context")
    );
}
