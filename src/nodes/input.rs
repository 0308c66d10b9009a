/// Input node: emits its configured constant
///
/// Properties: `value` (required, non-null) and optional `data_type`. When
/// `data_type` is unset the JSON kind of `value` is reported.

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::types::{port_types, PortMap, PortTypes};
use crate::nodes::kind_name;
use crate::runtime::context::ExecutionContext;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct InputHandler;

impl InputHandler {
    fn data_type(node: &Node) -> String {
        match node.str_property("data_type") {
            Some(explicit) => explicit.to_string(),
            None => match node.property("value") {
                Some(Value::Null) | None => "string".to_string(),
                Some(value) => kind_name(value).to_string(),
            },
        }
    }
}

#[async_trait]
impl NodeHandler for InputHandler {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        let value = node.property("value").cloned().unwrap_or(Value::Null);

        let mut result = PortMap::new();
        result.insert("value".into(), value);
        result.insert("type".into(), json!(Self::data_type(node)));
        Ok(result)
    }

    fn validate(&self, node: &Node) -> bool {
        node.property("value").is_some_and(|v| !v.is_null())
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        PortTypes::new()
    }

    fn declared_outputs(&self, node: &Node) -> PortTypes {
        let data_type = Self::data_type(node);
        port_types(&[("value", data_type.as_str()), ("type", "string")])
    }

    fn is_input_role(&self, _node: &Node) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::nodes;
    use crate::runtime::context::ExecutionContext;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn emits_value_and_derived_type() {
        let node = nodes::input("in", "Input", "hello");
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();
        assert_eq!(result.get("value"), Some(&json!("hello")));
        assert_eq!(result.get("type"), Some(&json!("string")));

        let node = nodes::input("n", "Number", 4).with_property("data_type", "integer");
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();
        assert_eq!(result.get("type"), Some(&json!("integer")));
    }

    #[test]
    fn null_value_is_invalid() {
        assert!(nodes::input("in", "Input", 1).validate());
        assert!(!nodes::input("in", "Input", Value::Null).validate());
        assert!(nodes::input("in", "Input", 1).is_input_role());
        assert!(nodes::input("in", "Input", 1).declared_inputs().is_empty());
    }
}
