/// REST call simulation
///
/// Nothing is sent over the network. Responses are shaped like a typical
/// JSON API and derived from the configured URL so they are reproducible.
/// A GET node acts as a source; POST, PUT and DELETE nodes act as sinks.

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::types::{port_types, PortMap, PortTypes};
use crate::nodes::{input_of, port_map, seed_of};
use crate::runtime::context::ExecutionContext;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_URL: &str = "https://api.example.com/data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }

    fn of(node: &Node) -> Option<Self> {
        Self::parse(node.str_property_or("method", DEFAULT_METHOD))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ApiHandler;

fn mock_items(seed: u64) -> Value {
    let items: Vec<Value> = (1..=1 + seed % 5)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("Item {i}"),
                "description": format!("Description of item {i}"),
                "price": ((seed % 10_000 + i * 13) % 10_000) as f64 / 100.0,
                "active": (seed % 2 + i) % 2 == 0,
            })
        })
        .collect();
    Value::Array(items)
}

fn simulate(method: Method, seed: u64, body: Value) -> Value {
    let id = seed % 10_000;
    match method {
        Method::Get => json!({
            "data": mock_items(seed),
            "total": 1 + seed % 100,
            "page": 1,
            "limit": 10,
        }),
        Method::Post => json!({ "id": id, "created": true, "data": body }),
        Method::Put => json!({ "id": id, "updated": true, "data": body }),
        Method::Delete => json!({ "id": id, "deleted": true }),
    }
}

#[async_trait]
impl NodeHandler for ApiHandler {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        let method_name = node.str_property_or("method", DEFAULT_METHOD);
        let url = node.str_property_or("url", DEFAULT_URL);
        let seed = seed_of(url);

        let body = input_of(node, &["body", "value", "input"])
            .or_else(|| node.property("body"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        let (response, status_code) = match Method::parse(method_name) {
            Some(method) => (simulate(method, seed, body), 200),
            None => (json!(format!("Unsupported method: {method_name}")), 405),
        };

        tracing::debug!("🌐 API node '{}' simulated {} {} -> {}", node.id(), method_name, url, status_code);

        Ok(port_map(json!({
            "value": response,
            "output": response,
            "response": response,
            "method": method_name,
            "url": url,
            "headers": node.property("headers").cloned().unwrap_or_else(|| json!({})),
            "status_code": status_code,
            "response_time": 100 + seed % 2000,
            "success": (200..300).contains(&status_code),
        })))
    }

    fn validate(&self, node: &Node) -> bool {
        node.has_text("method") && node.has_text("url")
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("headers", "object"), ("body", "object"), ("params", "object")])
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[
            ("response", "object"),
            ("method", "string"),
            ("url", "string"),
            ("status_code", "int"),
            ("response_time", "int"),
            ("success", "boolean"),
        ])
    }

    fn default_properties(&self) -> PortMap {
        port_map(json!({
            "method": DEFAULT_METHOD,
            "url": DEFAULT_URL,
            "headers": {},
            "body": {},
        }))
    }

    fn is_input_role(&self, node: &Node) -> bool {
        Method::of(node) == Some(Method::Get)
    }

    fn is_output_role(&self, node: &Node) -> bool {
        matches!(Method::of(node), Some(Method::Post | Method::Put | Method::Delete))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes;

    #[tokio::test]
    async fn get_returns_reproducible_page() {
        let node = nodes::api("a", "Fetch", "get", "https://api.example.com/items");
        let first = node.execute(&mut ExecutionContext::default()).await.unwrap();
        let second = node.execute(&mut ExecutionContext::default()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first["status_code"], json!(200));
        assert_eq!(first["success"], json!(true));
        assert!(first["value"]["data"].as_array().is_some_and(|items| !items.is_empty()));
        assert!(node.is_input_role());
        assert!(!node.is_output_role());
    }

    #[tokio::test]
    async fn post_echoes_body_input() {
        let mut node = nodes::api("a", "Create", "POST", "https://api.example.com/items");
        node.set_input("body", json!({"name": "widget"}));
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();

        assert_eq!(result["value"]["created"], json!(true));
        assert_eq!(result["value"]["data"], json!({"name": "widget"}));
        assert!(node.is_output_role());
        assert_eq!(node.output_name(), None);
    }

    #[tokio::test]
    async fn unsupported_method_is_not_successful() {
        let node = nodes::api("a", "Patch", "PATCH", "https://api.example.com/items");
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();
        assert_eq!(result["status_code"], json!(405));
        assert_eq!(result["success"], json!(false));
        assert!(!node.is_input_role() && !node.is_output_role());
    }
}
