/// End-to-end engine runs over small blueprints built with the node constructors

use anyhow::Result;
use async_trait::async_trait;
use blueprint_engine::blueprint::types::{port_types, PortTypes};
use blueprint_engine::nodes;
use blueprint_engine::{
    Blueprint, BlueprintDefinition, Connection, Engine, EngineError, ExecutionContext, Node, NodeHandler,
    NodeRegistry, PortMap,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Handler that counts its invocations and echoes its inputs
#[derive(Debug, Default)]
struct Counting {
    calls: AtomicUsize,
}

#[async_trait]
impl NodeHandler for Counting {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(node.inputs().clone())
    }

    fn validate(&self, _node: &Node) -> bool {
        true
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("input", "object")])
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("input", "object")])
    }
}

/// Handler that sleeps before answering
#[derive(Debug)]
struct Slow(Duration);

#[async_trait]
impl NodeHandler for Slow {
    async fn execute(&self, _node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        tokio::time::sleep(self.0).await;
        let mut result = PortMap::new();
        result.insert("value".into(), json!("slept"));
        Ok(result)
    }

    fn validate(&self, _node: &Node) -> bool {
        true
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        PortTypes::new()
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("value", "string")])
    }
}

fn uppercase_pipeline() -> Blueprint {
    let mut bp = Blueprint::with_id("upper", "Uppercase");
    bp.add_node(nodes::input("in", "Input", "hello"));
    bp.add_node(nodes::transform("tx", "Upper", "uppercase"));
    bp.add_node(nodes::output("out", "Output"));
    bp.connect("in", "tx");
    bp.connect("tx", "out");
    bp
}

#[tokio::test]
async fn input_transform_output_reports_named_result() {
    let mut bp = uppercase_pipeline();
    let result = Engine::new().execute(&mut bp).await.unwrap();
    assert_eq!(Value::Object(result), json!({"result": "HELLO"}));
}

#[tokio::test]
async fn failing_filter_reports_null() {
    let mut bp = Blueprint::with_id("filtered", "Filtered");
    bp.add_node(nodes::input("in", "Input", "hello"));
    bp.add_node(nodes::transform("tx", "Upper", "uppercase"));
    bp.add_node(nodes::filter("f", "Long", "length > 10"));
    bp.add_node(nodes::output("out", "Output"));
    bp.connect("in", "tx");
    bp.connect("tx", "f");
    bp.connect("f", "out");

    let result = Engine::new().execute(&mut bp).await.unwrap();
    assert_eq!(Value::Object(result), json!({"result": null}));
}

#[tokio::test]
async fn cycle_is_rejected_before_any_node_runs() {
    let counter = Arc::new(Counting::default());
    let mut bp = Blueprint::with_id("loop", "Loop");
    bp.add_node(Node::new("a", "A", "counting", counter.clone()));
    bp.add_node(Node::new("b", "B", "counting", counter.clone()));
    bp.connect("a", "b");
    bp.connect("b", "a");

    let report = Engine::new().execute_with_report(&mut bp).await;
    assert!(matches!(report.result, Err(EngineError::CycleDetected { ref id }) if id == "loop"));
    assert!(report.context.is_failed());
    assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn isolated_node_is_neither_run_nor_reported() {
    let counter = Arc::new(Counting::default());
    let mut bp = Blueprint::with_id("chain", "Chain");
    bp.add_node(nodes::input("in", "Input", 7));
    bp.add_node(Node::new("sink", "Sink", "counting", counter.clone()));
    bp.add_node(Node::new("lonely", "Lonely", "counting", counter.clone()));
    bp.connect("in", "sink");

    assert_eq!(bp.execution_order().len(), 2);

    let result = Engine::new().execute(&mut bp).await.unwrap();
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.len(), 1);
    assert_eq!(result["Sink"], json!({"input": 7}));
}

#[tokio::test]
async fn failing_node_aborts_with_its_id() {
    let mut bp = Blueprint::with_id("broken", "Broken");
    bp.add_node(nodes::input("in", "Input", "hello"));
    bp.add_node(
        nodes::transform("sub", "Slice", "substring")
            .with_property("start", 4)
            .with_property("end", 2),
    );
    bp.add_node(nodes::output("out", "Output"));
    bp.connect("in", "sub");
    bp.connect("sub", "out");

    let report = Engine::new().execute_with_report(&mut bp).await;
    let err = report.result.unwrap_err();
    assert_eq!(err.node_id(), Some("sub"));
    assert!(err.to_string().contains("sub"));
    assert!(!err.is_structural());
    assert!(report.context.is_failed());
    assert!(report.context.node_result("out").is_none());
}

#[tokio::test]
async fn timeout_is_checked_between_nodes() {
    let slow: Arc<dyn NodeHandler> = Arc::new(Slow(Duration::from_millis(50)));
    let mut bp = Blueprint::with_id("slow", "Slow");
    bp.add_node(Node::new("first", "First", "slow", slow.clone()));
    bp.add_node(Node::new("second", "Second", "slow", slow));
    bp.connect("first", "second");

    let report = Engine::with_timeout(Duration::from_millis(10)).execute_with_report(&mut bp).await;
    match report.result {
        Err(EngineError::Timeout { ref node_id, limit, .. }) => {
            assert_eq!(node_id, "second");
            assert_eq!(limit, Duration::from_millis(10));
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(report.context.is_timed_out());
    assert!(report.context.node_result("first").is_some());
}

#[tokio::test]
async fn fan_in_keeps_the_later_connection() {
    let counter = Arc::new(Counting::default());
    let mut bp = Blueprint::with_id("fan", "Fan-in");
    bp.add_node(nodes::input("a", "A", "first"));
    bp.add_node(nodes::input("b", "B", "second"));
    bp.add_node(Node::new("sink", "Sink", "counting", counter));
    bp.add_connection(Connection::new("c1", "a", "sink"));
    bp.add_connection(Connection::new("c2", "b", "sink"));

    let result = Engine::new().execute(&mut bp).await.unwrap();
    assert_eq!(result["Sink"], json!({"input": "second"}));
}

#[tokio::test]
async fn fan_out_sends_the_same_value_to_every_sink() {
    let mut bp = Blueprint::with_id("fan-out", "Fan-out");
    bp.add_node(nodes::input("in", "Input", "shared"));
    bp.add_node(nodes::named_output("left", "Left", "left"));
    bp.add_node(nodes::named_output("right", "Right", "right"));
    bp.connect("in", "left");
    bp.connect("in", "right");

    let result = Engine::new().execute(&mut bp).await.unwrap();
    assert_eq!(Value::Object(result), json!({"left": "shared", "right": "shared"}));
}

#[tokio::test]
async fn nest_with_repeated_keys_completes() {
    let mut bp = Blueprint::with_id("nest", "Nest");
    bp.add_node(nodes::advanced_transform("tree", "Tree", "nest"));
    bp.add_node(nodes::output("out", "Output"));
    bp.connect("tree", "out");

    let engine = Engine::new().with_global("data", json!([{"id": "x"}, {"id": "x", "parent_id": "x"}]));
    let result = engine.execute(&mut bp).await.unwrap();
    assert_eq!(result["result"], json!({"x": {"id": "x"}}));
}

#[tokio::test]
async fn oversized_image_fails_validation() {
    let mut bp = Blueprint::with_id("image", "Image");
    bp.add_node(
        nodes::image_input("img", "Huge")
            .with_property("width", 4_000_000_000i64)
            .with_property("height", 4_000_000_000i64),
    );
    bp.add_node(nodes::output("out", "Output"));
    bp.connect("img", "out");

    let engine = Engine::new();
    assert!(!engine.validate_blueprint(&bp));
    let err = engine.execute(&mut bp).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidBlueprint { .. }));
}

#[tokio::test]
async fn reruns_start_from_clean_node_io() {
    let engine = Engine::new();
    let mut bp = uppercase_pipeline();
    engine.execute(&mut bp).await.unwrap();

    bp.node_mut("in").unwrap().set_property("value", "again");
    let result = engine.execute(&mut bp).await.unwrap();
    assert_eq!(result["result"], json!("AGAIN"));
    assert_eq!(bp.node("out").unwrap().inputs().len(), 1);
}

#[tokio::test]
async fn seeded_data_global_feeds_unwired_advanced_nodes() {
    let mut bp = Blueprint::with_id("adv", "Advanced");
    bp.add_node(nodes::advanced_transform("sort", "Sort", "sort"));
    bp.add_node(nodes::advanced_filter("keep", "Keep", "count >= 3"));
    bp.connect("sort", "keep");

    let engine = Engine::new().with_global("data", json!([3, 1, 2]));
    let result = engine.execute(&mut bp).await.unwrap();
    assert_eq!(result["Keep"]["value"], json!([1, 2, 3]));
    assert_eq!(result["Keep"]["filtered_count"], json!(3));
}

#[tokio::test]
async fn definition_round_trip_runs_the_same() {
    let registry = NodeRegistry::with_builtins();
    let original = uppercase_pipeline();
    let json = serde_json::to_string(&BlueprintDefinition::from_blueprint(&original)).unwrap();

    let mut rebuilt = BlueprintDefinition::from_json(&json).unwrap().into_blueprint(&registry).unwrap();
    let result = Engine::new().execute(&mut rebuilt).await.unwrap();
    assert_eq!(result["result"], json!("HELLO"));
}
