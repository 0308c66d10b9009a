/// Node definition and the behaviour trait behind it
///
/// A `Node` carries identity, its explicit type tag, build-time properties and
/// the per-run input/output maps. What it does is delegated to a shared
/// `NodeHandler` selected by the type tag when the node is constructed.

use crate::blueprint::types::{new_id, PortMap, PortTypes, Position};
use crate::runtime::context::ExecutionContext;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::{fmt, sync::Arc};

/// Behaviour of one node kind
///
/// Handlers are stateless: all configuration is read from the node's property
/// bag and all run data from its resolved inputs, so one handler instance is
/// shared by every node of its type.
#[async_trait]
pub trait NodeHandler: Send + Sync + fmt::Debug {
    /// Produce this node's result from its resolved inputs
    async fn execute(&self, node: &Node, ctx: &mut ExecutionContext) -> Result<PortMap>;

    /// Check that the node's configuration is usable
    fn validate(&self, node: &Node) -> bool;

    /// Input ports this kind understands, with type names
    fn declared_inputs(&self, node: &Node) -> PortTypes;

    /// Output fields this kind produces, with type names
    fn declared_outputs(&self, node: &Node) -> PortTypes;

    /// Properties applied when a node of this kind is constructed
    fn default_properties(&self) -> PortMap {
        PortMap::new()
    }

    /// True for source-like nodes
    fn is_input_role(&self, _node: &Node) -> bool {
        false
    }

    /// True for sink-like nodes whose result is reported by the engine
    fn is_output_role(&self, _node: &Node) -> bool {
        false
    }

    /// Result field reported and published for an output-role node
    fn output_name(&self, _node: &Node) -> Option<String> {
        None
    }
}

/// A typed unit of computation inside a blueprint
#[derive(Debug, Clone)]
pub struct Node {
    id: String,
    name: String,
    node_type: String,
    properties: PortMap,
    position: Position,
    /// Resolved inputs of the current run
    inputs: PortMap,
    /// Result of the current run
    outputs: PortMap,
    handler: Arc<dyn NodeHandler>,
}

impl Node {
    /// Create a node; an empty id is replaced with a generated one
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        node_type: impl Into<String>,
        handler: Arc<dyn NodeHandler>,
    ) -> Self {
        let id = id.into();
        let id = if id.trim().is_empty() { new_id() } else { id };

        Self {
            id,
            name: name.into(),
            node_type: node_type.into(),
            properties: handler.default_properties(),
            position: Position::default(),
            inputs: PortMap::new(),
            outputs: PortMap::new(),
            handler,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Explicit type tag given at construction
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn handler(&self) -> &Arc<dyn NodeHandler> {
        &self.handler
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn properties(&self) -> &PortMap {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Builder form of [`Node::set_property`]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn remove_property(&mut self, key: &str) -> Option<Value> {
        self.properties.remove(key)
    }

    /// String property, if set to a string
    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// String property or `default` when unset or not a string
    pub fn str_property_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.str_property(key).unwrap_or(default)
    }

    /// Numeric property as f64
    pub fn f64_property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }

    /// Numeric property as i64; floats are truncated
    pub fn i64_property(&self, key: &str) -> Option<i64> {
        self.properties
            .get(key)
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
    }

    pub fn bool_property(&self, key: &str) -> Option<bool> {
        self.properties.get(key).and_then(Value::as_bool)
    }

    /// True when the property is a string with non-whitespace content
    pub fn has_text(&self, key: &str) -> bool {
        self.str_property(key).is_some_and(|s| !s.trim().is_empty())
    }

    pub fn inputs(&self) -> &PortMap {
        &self.inputs
    }

    pub fn input(&self, port: &str) -> Option<&Value> {
        self.inputs.get(port)
    }

    pub fn set_input(&mut self, port: impl Into<String>, value: impl Into<Value>) {
        self.inputs.insert(port.into(), value.into());
    }

    /// Replace all resolved inputs
    pub fn set_inputs(&mut self, inputs: PortMap) {
        self.inputs = inputs;
    }

    pub fn outputs(&self) -> &PortMap {
        &self.outputs
    }

    pub fn output(&self, port: &str) -> Option<&Value> {
        self.outputs.get(port)
    }

    pub fn set_outputs(&mut self, outputs: PortMap) {
        self.outputs = outputs;
    }

    /// Clear the per-run input and output maps
    pub fn reset_io(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
    }

    /// Run this node's behaviour against the given context
    pub async fn execute(&self, ctx: &mut ExecutionContext) -> Result<PortMap> {
        self.handler.execute(self, ctx).await
    }

    pub fn validate(&self) -> bool {
        self.handler.validate(self)
    }

    pub fn declared_inputs(&self) -> PortTypes {
        self.handler.declared_inputs(self)
    }

    pub fn declared_outputs(&self) -> PortTypes {
        self.handler.declared_outputs(self)
    }

    pub fn is_input_role(&self) -> bool {
        self.handler.is_input_role(self)
    }

    pub fn is_output_role(&self) -> bool {
        self.handler.is_output_role(self)
    }

    pub fn output_name(&self) -> Option<String> {
        self.handler.output_name(self)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.node_type, self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::types::port_types;
    use serde_json::json;

    #[derive(Debug)]
    struct Echo;

    #[async_trait]
    impl NodeHandler for Echo {
        async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
            Ok(node.inputs().clone())
        }

        fn validate(&self, node: &Node) -> bool {
            node.has_text("label")
        }

        fn declared_inputs(&self, _node: &Node) -> PortTypes {
            port_types(&[("value", "object")])
        }

        fn declared_outputs(&self, _node: &Node) -> PortTypes {
            port_types(&[("value", "object")])
        }

        fn default_properties(&self) -> PortMap {
            let mut props = PortMap::new();
            props.insert("label".into(), json!("echo"));
            props
        }
    }

    #[test]
    fn empty_id_gets_generated() {
        let node = Node::new("", "Echo", "echo", Arc::new(Echo));
        assert!(!node.id().is_empty());
        assert_eq!(node.node_type(), "echo");
    }

    #[test]
    fn defaults_apply_and_properties_override() {
        let node = Node::new("n1", "Echo", "echo", Arc::new(Echo));
        assert!(node.validate());

        let node = node.with_property("label", "  ");
        assert!(!node.validate());
        assert_eq!(node.str_property_or("missing", "fallback"), "fallback");
    }

    #[tokio::test]
    async fn execute_delegates_to_handler() {
        let mut node = Node::new("n1", "Echo", "echo", Arc::new(Echo));
        node.set_input("value", 42);
        let mut ctx = ExecutionContext::default();

        let result = node.execute(&mut ctx).await.unwrap();
        assert_eq!(result.get("value"), Some(&json!(42)));

        node.set_outputs(result);
        node.reset_io();
        assert!(node.inputs().is_empty());
        assert!(node.outputs().is_empty());
    }

    #[test]
    fn numeric_property_accessors() {
        let node = Node::new("n1", "Echo", "echo", Arc::new(Echo))
            .with_property("count", 3.9)
            .with_property("flag", true);
        assert_eq!(node.i64_property("count"), Some(3));
        assert_eq!(node.f64_property("count"), Some(3.9));
        assert_eq!(node.bool_property("flag"), Some(true));
        assert_eq!(node.f64_property("flag"), None);
    }
}
