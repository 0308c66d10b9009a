/// Output node: reports whatever reaches it under a designated name

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::ports::{first_present, SINK_GLOBAL, SINK_INPUTS};
use crate::blueprint::types::{port_types, PortMap, PortTypes};
use crate::runtime::context::ExecutionContext;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

pub const DEFAULT_OUTPUT_NAME: &str = "result";
pub const DEFAULT_DATA_TYPE: &str = "object";

#[derive(Debug, Default, Clone, Copy)]
pub struct OutputHandler;

/// Value a sink displays
///
/// First present of the sink ports, then any other input, then the context
/// global "data", else null.
pub fn sink_value(node: &Node, ctx: &ExecutionContext) -> Value {
    first_present(node.inputs(), SINK_INPUTS)
        .or_else(|| node.inputs().values().next())
        .or_else(|| ctx.global(SINK_GLOBAL))
        .cloned()
        .unwrap_or(Value::Null)
}

#[async_trait]
impl NodeHandler for OutputHandler {
    async fn execute(&self, node: &Node, ctx: &mut ExecutionContext) -> Result<PortMap> {
        let value = sink_value(node, ctx);
        let output_name = node.str_property_or("output_name", DEFAULT_OUTPUT_NAME);

        tracing::debug!("📤 Output '{}' -> {} = {}", node.id(), output_name, value);

        let mut result = PortMap::new();
        result.insert("value".into(), value.clone());
        result.insert("output".into(), value.clone());
        result.insert("type".into(), json!(node.str_property_or("data_type", DEFAULT_DATA_TYPE)));
        // Inserted last so a name like "value" still reports the displayed value
        result.insert(output_name.to_string(), value);
        Ok(result)
    }

    fn validate(&self, node: &Node) -> bool {
        node.has_text("output_name")
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("output", "object"), ("value", "object"), ("result", "object")])
    }

    fn declared_outputs(&self, node: &Node) -> PortTypes {
        let data_type = node.str_property_or("data_type", DEFAULT_DATA_TYPE);
        let output_name = node.str_property_or("output_name", DEFAULT_OUTPUT_NAME);
        port_types(&[(output_name, data_type), ("type", "string")])
    }

    fn default_properties(&self) -> PortMap {
        let mut props = PortMap::new();
        props.insert("output_name".into(), json!(DEFAULT_OUTPUT_NAME));
        props.insert("data_type".into(), json!(DEFAULT_DATA_TYPE));
        props
    }

    fn is_output_role(&self, _node: &Node) -> bool {
        true
    }

    fn output_name(&self, node: &Node) -> Option<String> {
        Some(node.str_property_or("output_name", DEFAULT_OUTPUT_NAME).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes;

    #[tokio::test]
    async fn reports_under_output_name() {
        let mut node = nodes::output("o", "Out");
        node.set_input("input", "HELLO");
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();

        assert_eq!(result.get("result"), Some(&json!("HELLO")));
        assert_eq!(result.get("value"), Some(&json!("HELLO")));
        assert_eq!(result.get("type"), Some(&json!("object")));
        assert_eq!(node.output_name().as_deref(), Some("result"));
    }

    #[tokio::test]
    async fn sink_ports_take_precedence() {
        let mut node = nodes::named_output("o", "Out", "answer");
        node.set_input("input", "from input");
        node.set_input("result", "from result");
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();
        assert_eq!(result.get("answer"), Some(&json!("from result")));
    }

    #[tokio::test]
    async fn present_null_input_is_reported() {
        let mut node = nodes::output("o", "Out");
        node.set_input("input", Value::Null);
        let mut ctx = ExecutionContext::default();
        ctx.set_global("data", "global");
        let result = node.execute(&mut ctx).await.unwrap();
        assert_eq!(result.get("result"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn falls_back_to_global_data() {
        let node = nodes::output("o", "Out");
        let mut ctx = ExecutionContext::default();
        ctx.set_global("data", "global");
        let result = node.execute(&mut ctx).await.unwrap();
        assert_eq!(result.get("result"), Some(&json!("global")));

        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();
        assert_eq!(result.get("result"), Some(&Value::Null));
    }

    #[test]
    fn blank_output_name_is_invalid() {
        assert!(nodes::output("o", "Out").validate());
        assert!(!nodes::named_output("o", "Out", "").validate());
    }
}
