/// Transform node: applies a named operation to its primary input
///
/// Operation names are matched case-insensitively. An operation that does not
/// apply to the runtime type of the input passes it through unchanged, and an
/// unknown name behaves as `identity`.

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::types::{port_types, PortMap, PortTypes};
use crate::nodes::primary_input;
use crate::runtime::context::ExecutionContext;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const DEFAULT_OPERATION: &str = "identity";
const DEFAULT_MULTIPLIER: f64 = 2.0;
const DEFAULT_ADDEND: f64 = 1.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct TransformHandler;

/// Finite operation vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Uppercase,
    Lowercase,
    Reverse,
    Length,
    Multiply,
    Add,
    Substring,
    Identity,
}

impl Operation {
    fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "uppercase" => Operation::Uppercase,
            "lowercase" => Operation::Lowercase,
            "reverse" => Operation::Reverse,
            "length" => Operation::Length,
            "multiply" => Operation::Multiply,
            "add" => Operation::Add,
            "substring" => Operation::Substring,
            _ => Operation::Identity,
        }
    }
}

fn apply(op: Operation, input: &Value, node: &Node) -> Result<Value> {
    let output = match (op, input) {
        (Operation::Uppercase, Value::String(s)) => json!(s.to_uppercase()),
        (Operation::Lowercase, Value::String(s)) => json!(s.to_lowercase()),
        (Operation::Reverse, Value::String(s)) => json!(s.chars().rev().collect::<String>()),
        (Operation::Length, Value::String(s)) => json!(s.chars().count()),
        (Operation::Multiply, Value::Number(n)) => {
            let multiplier = node.f64_property("multiplier").unwrap_or(DEFAULT_MULTIPLIER);
            json!(n.as_f64().unwrap_or_default() * multiplier)
        }
        (Operation::Add, Value::Number(n)) => {
            let addend = node.f64_property("addend").unwrap_or(DEFAULT_ADDEND);
            json!(n.as_f64().unwrap_or_default() + addend)
        }
        (Operation::Substring, Value::String(s)) => json!(substring(s, node)?),
        _ => input.clone(),
    };
    Ok(output)
}

/// Character range `start..end`; out-of-range or inverted bounds are an error
fn substring(s: &str, node: &Node) -> Result<String> {
    let len = s.chars().count() as i64;
    let start = node.i64_property("start").unwrap_or(0);
    let end = node.i64_property("end").unwrap_or(len);

    if start < 0 || end > len || start > end {
        bail!("substring range {start}..{end} is out of bounds for length {len}");
    }

    Ok(s.chars()
        .skip(start as usize)
        .take((end - start) as usize)
        .collect())
}

#[async_trait]
impl NodeHandler for TransformHandler {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        let mut result = PortMap::new();

        let Some(input) = primary_input(node).filter(|v| !v.is_null()) else {
            result.insert("error".into(), json!("no input value provided"));
            return Ok(result);
        };

        let operation = node.str_property_or("operation", DEFAULT_OPERATION);
        let output = apply(Operation::parse(operation), input, node)?;

        tracing::debug!("🔄 Transform '{}' applied {} -> {}", node.id(), operation, output);

        result.insert("value".into(), output.clone());
        result.insert("output".into(), output);
        result.insert("operation".into(), json!(operation));
        result.insert("original".into(), input.clone());
        Ok(result)
    }

    fn validate(&self, node: &Node) -> bool {
        node.has_text("operation")
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("value", "object")])
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("value", "object"), ("operation", "string"), ("original", "object")])
    }

    fn default_properties(&self) -> PortMap {
        let mut props = PortMap::new();
        props.insert("operation".into(), json!(DEFAULT_OPERATION));
        props
    }
}

#[cfg(test)]
mod tests {
    use crate::blueprint::node::Node;
    use crate::nodes;
    use crate::runtime::context::ExecutionContext;
    use serde_json::{json, Value};

    async fn run(mut node: Node, input: Value) -> anyhow::Result<crate::blueprint::types::PortMap> {
        node.set_input("value", input);
        node.execute(&mut ExecutionContext::default()).await
    }

    #[tokio::test]
    async fn uppercase_reports_original_and_operation() {
        let result = run(nodes::transform("t", "T", "uppercase"), json!("hello")).await.unwrap();
        assert_eq!(result.get("value"), Some(&json!("HELLO")));
        assert_eq!(result.get("output"), Some(&json!("HELLO")));
        assert_eq!(result.get("original"), Some(&json!("hello")));
        assert_eq!(result.get("operation"), Some(&json!("uppercase")));
    }

    #[tokio::test]
    async fn operation_name_is_case_insensitive() {
        let result = run(nodes::transform("t", "T", "ReVeRsE"), json!("abc")).await.unwrap();
        assert_eq!(result.get("value"), Some(&json!("cba")));
    }

    #[tokio::test]
    async fn unknown_operation_is_identity() {
        let result = run(nodes::transform("t", "T", "frobnicate"), json!("abc")).await.unwrap();
        assert_eq!(result.get("value"), Some(&json!("abc")));
    }

    #[tokio::test]
    async fn numeric_operations_use_parameters() {
        let result = run(nodes::transform("t", "T", "multiply"), json!(3)).await.unwrap();
        assert_eq!(result.get("value"), Some(&json!(6.0)));

        let node = nodes::transform("t", "T", "add").with_property("addend", 0.5);
        let result = run(node, json!(1)).await.unwrap();
        assert_eq!(result.get("value"), Some(&json!(1.5)));
    }

    #[tokio::test]
    async fn mismatched_type_passes_through() {
        let result = run(nodes::transform("t", "T", "uppercase"), json!(42)).await.unwrap();
        assert_eq!(result.get("value"), Some(&json!(42)));

        let result = run(nodes::transform("t", "T", "length"), json!("héllo")).await.unwrap();
        assert_eq!(result.get("value"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn substring_uses_char_range() {
        let node = nodes::transform("t", "T", "substring")
            .with_property("start", 1)
            .with_property("end", 3);
        let result = run(node, json!("hello")).await.unwrap();
        assert_eq!(result.get("value"), Some(&json!("el")));
    }

    #[tokio::test]
    async fn substring_out_of_range_fails() {
        let node = nodes::transform("t", "T", "substring").with_property("end", 99);
        let err = run(node, json!("hello")).await.unwrap_err();
        assert!(err.to_string().contains("out of bounds"));
    }

    #[tokio::test]
    async fn missing_input_is_reported_in_band() {
        let node = nodes::transform("t", "T", "uppercase");
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();
        assert!(result.contains_key("error"));
        assert!(!result.contains_key("value"));
    }

    #[tokio::test]
    async fn default_input_port_is_accepted() {
        let mut node = nodes::transform("t", "T", "lowercase");
        node.set_input("input", "ABC");
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();
        assert_eq!(result.get("value"), Some(&json!("abc")));
    }

    #[test]
    fn blank_operation_is_invalid() {
        assert!(nodes::transform("t", "T", "identity").validate());
        assert!(!nodes::transform("t", "T", "  ").validate());
    }
}
