/// Text source and sink nodes

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::types::{port_types, PortMap, PortTypes};
use crate::nodes::{as_text, input_of, port_map};
use crate::runtime::context::ExecutionContext;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

const DEFAULT_PROMPT: &str = "Type your prompt here...";
const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_MAX_LENGTH: i64 = 1000;

/// Fields probed on a structured text payload, in order
const TEXT_FIELDS: &[&str] = &["text", "result", "value"];

/// Rough token count at ~4 characters per token, never below one
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() / 4).max(1)
}

/// Emits the configured prompt as a text payload
#[derive(Debug, Default, Clone, Copy)]
pub struct TextInputHandler;

#[async_trait]
impl NodeHandler for TextInputHandler {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        let prompt = node.str_property_or("prompt", DEFAULT_PROMPT);
        let language = node.str_property_or("language", DEFAULT_LANGUAGE);
        let max_length = node.i64_property("max_length").unwrap_or(DEFAULT_MAX_LENGTH);

        Ok(port_map(json!({
            "text": {
                "prompt": prompt,
                "language": language,
                "max_length": max_length,
                "length": prompt.chars().count(),
                "tokens": estimate_tokens(prompt),
                "timestamp": Utc::now().timestamp_millis(),
            },
            "prompt": prompt,
            "language": language,
        })))
    }

    fn validate(&self, node: &Node) -> bool {
        node.has_text("prompt")
            && node.has_text("language")
            && node.i64_property("max_length").is_some_and(|n| n > 0)
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        PortTypes::new()
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("text", "object"), ("prompt", "string"), ("language", "string")])
    }

    fn default_properties(&self) -> PortMap {
        port_map(json!({
            "prompt": DEFAULT_PROMPT,
            "language": DEFAULT_LANGUAGE,
            "max_length": DEFAULT_MAX_LENGTH,
        }))
    }

    fn is_input_role(&self, _node: &Node) -> bool {
        true
    }
}

/// Formats incoming text for a destination
#[derive(Debug, Default, Clone, Copy)]
pub struct TextOutputHandler;

impl TextOutputHandler {
    fn process(node: &Node, input: &Value) -> Value {
        let format = node.str_property_or("format", "plain");
        let destination = node.str_property_or("destination", "console");

        let mut processed = PortMap::new();
        let content = match input {
            Value::Object(map) => {
                if node.bool_property("include_metadata").unwrap_or(false) {
                    processed.insert("metadata".into(), input.clone());
                }
                TEXT_FIELDS
                    .iter()
                    .find_map(|key| map.get(*key))
                    .map(as_text)
                    .unwrap_or_else(|| input.to_string())
            }
            other => as_text(other),
        };

        processed.insert("length".into(), json!(content.chars().count()));
        processed.insert("word_count".into(), json!(content.split_whitespace().count()));
        processed.insert("processed_format".into(), json!(format));
        processed.insert("destination".into(), json!(destination));
        processed.insert("content".into(), json!(content));
        Value::Object(processed)
    }
}

#[async_trait]
impl NodeHandler for TextOutputHandler {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        let Some(input) = input_of(node, TEXT_FIELDS).filter(|v| !v.is_null()) else {
            return Ok(port_map(json!({ "error": "no text input provided" })));
        };

        Ok(port_map(json!({
            "text": Self::process(node, input),
            "format": node.str_property_or("format", "plain"),
            "destination": node.str_property_or("destination", "console"),
            "include_metadata": node.bool_property("include_metadata").unwrap_or(false),
            "status": "ready",
            "timestamp": Utc::now().timestamp_millis(),
        })))
    }

    fn validate(&self, node: &Node) -> bool {
        node.has_text("format") && node.has_text("destination")
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("text", "object"), ("result", "object"), ("value", "object")])
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[
            ("text", "object"),
            ("format", "string"),
            ("destination", "string"),
            ("include_metadata", "boolean"),
            ("status", "string"),
        ])
    }

    fn default_properties(&self) -> PortMap {
        port_map(json!({
            "format": "plain",
            "destination": "console",
            "include_metadata": false,
        }))
    }
}
