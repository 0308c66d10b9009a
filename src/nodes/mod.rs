/// Built-in node kinds
///
/// One handler per kind, each in its own module. The `types` tags are the
/// explicit discriminators used by the registry and the definition layer;
/// the free constructor functions build ready-to-use nodes for code that
/// assembles blueprints directly.

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::ports::{first_present, PRIMARY_INPUTS};
use crate::blueprint::types::PortMap;
use serde_json::Value;
use std::sync::Arc;

// Core data-flow kinds
pub mod input;
pub mod transform;
pub mod filter;
pub mod output;

// Text and AI simulations
pub mod text;
pub mod ai;

// Integration simulations (no real I/O)
pub mod api;
pub mod database;

// Media simulations with preview payloads
pub mod audio;
pub mod image;

// Rich transform/filter vocabularies
pub mod advanced;

pub use advanced::{AdvancedFilterHandler, AdvancedTransformHandler};
pub use ai::AiHandler;
pub use api::ApiHandler;
pub use audio::{AudioInputHandler, AudioOutputHandler};
pub use database::DatabaseHandler;
pub use filter::FilterHandler;
pub use image::{ImageInputHandler, ImageOutputHandler};
pub use input::InputHandler;
pub use output::OutputHandler;
pub use text::{TextInputHandler, TextOutputHandler};
pub use transform::TransformHandler;

/// Type tags of the built-in kinds
pub mod types {
    pub const INPUT: &str = "input";
    pub const TRANSFORM: &str = "transform";
    pub const FILTER: &str = "filter";
    pub const OUTPUT: &str = "output";
    pub const TEXT_INPUT: &str = "text_input";
    pub const TEXT_OUTPUT: &str = "text_output";
    pub const AI: &str = "ai";
    pub const API: &str = "api";
    pub const DATABASE: &str = "database";
    pub const AUDIO_INPUT: &str = "audio_input";
    pub const AUDIO_OUTPUT: &str = "audio_output";
    pub const IMAGE_INPUT: &str = "image_input";
    pub const IMAGE_OUTPUT: &str = "image_output";
    pub const ADVANCED_TRANSFORM: &str = "advanced_transform";
    pub const ADVANCED_FILTER: &str = "advanced_filter";
}

/// Every built-in kind paired with its handler
pub fn builtin_handlers() -> Vec<(&'static str, Arc<dyn NodeHandler>)> {
    vec![
        entry(types::INPUT, InputHandler),
        entry(types::TRANSFORM, TransformHandler),
        entry(types::FILTER, FilterHandler),
        entry(types::OUTPUT, OutputHandler),
        entry(types::TEXT_INPUT, TextInputHandler),
        entry(types::TEXT_OUTPUT, TextOutputHandler),
        entry(types::AI, AiHandler),
        entry(types::API, ApiHandler),
        entry(types::DATABASE, DatabaseHandler),
        entry(types::AUDIO_INPUT, AudioInputHandler),
        entry(types::AUDIO_OUTPUT, AudioOutputHandler),
        entry(types::IMAGE_INPUT, ImageInputHandler),
        entry(types::IMAGE_OUTPUT, ImageOutputHandler),
        entry(types::ADVANCED_TRANSFORM, AdvancedTransformHandler),
        entry(types::ADVANCED_FILTER, AdvancedFilterHandler),
    ]
}

fn entry<H: NodeHandler + 'static>(tag: &'static str, handler: H) -> (&'static str, Arc<dyn NodeHandler>) {
    let handler: Arc<dyn NodeHandler> = Arc::new(handler);
    (tag, handler)
}

fn build(
    node_type: &str,
    handler: Arc<dyn NodeHandler>,
    id: impl Into<String>,
    name: impl Into<String>,
) -> Node {
    Node::new(id, name, node_type, handler)
}

/// Source node emitting a constant
pub fn input(id: impl Into<String>, name: impl Into<String>, value: impl Into<Value>) -> Node {
    build(types::INPUT, Arc::new(InputHandler), id, name).with_property("value", value)
}

pub fn transform(id: impl Into<String>, name: impl Into<String>, operation: &str) -> Node {
    build(types::TRANSFORM, Arc::new(TransformHandler), id, name).with_property("operation", operation)
}

pub fn filter(id: impl Into<String>, name: impl Into<String>, condition: &str) -> Node {
    build(types::FILTER, Arc::new(FilterHandler), id, name).with_property("condition", condition)
}

/// Sink node reporting under "result"
pub fn output(id: impl Into<String>, name: impl Into<String>) -> Node {
    build(types::OUTPUT, Arc::new(OutputHandler), id, name)
}

/// Sink node reporting under a custom name
pub fn named_output(id: impl Into<String>, name: impl Into<String>, output_name: &str) -> Node {
    output(id, name).with_property("output_name", output_name)
}

pub fn text_input(id: impl Into<String>, name: impl Into<String>, prompt: &str) -> Node {
    build(types::TEXT_INPUT, Arc::new(TextInputHandler), id, name).with_property("prompt", prompt)
}

pub fn text_output(id: impl Into<String>, name: impl Into<String>) -> Node {
    build(types::TEXT_OUTPUT, Arc::new(TextOutputHandler), id, name)
}

pub fn ai(id: impl Into<String>, name: impl Into<String>, task: &str) -> Node {
    build(types::AI, Arc::new(AiHandler), id, name).with_property("task", task)
}

pub fn api(id: impl Into<String>, name: impl Into<String>, method: &str, url: &str) -> Node {
    build(types::API, Arc::new(ApiHandler), id, name)
        .with_property("method", method)
        .with_property("url", url)
}

pub fn database(id: impl Into<String>, name: impl Into<String>, operation: &str, table: &str) -> Node {
    build(types::DATABASE, Arc::new(DatabaseHandler), id, name)
        .with_property("operation", operation)
        .with_property("table", table)
}

pub fn audio_input(id: impl Into<String>, name: impl Into<String>) -> Node {
    build(types::AUDIO_INPUT, Arc::new(AudioInputHandler), id, name)
}

pub fn audio_output(id: impl Into<String>, name: impl Into<String>) -> Node {
    build(types::AUDIO_OUTPUT, Arc::new(AudioOutputHandler), id, name)
}

pub fn image_input(id: impl Into<String>, name: impl Into<String>) -> Node {
    build(types::IMAGE_INPUT, Arc::new(ImageInputHandler), id, name)
}

pub fn image_output(id: impl Into<String>, name: impl Into<String>) -> Node {
    build(types::IMAGE_OUTPUT, Arc::new(ImageOutputHandler), id, name)
}

pub fn advanced_transform(id: impl Into<String>, name: impl Into<String>, operation: &str) -> Node {
    build(types::ADVANCED_TRANSFORM, Arc::new(AdvancedTransformHandler), id, name)
        .with_property("operation", operation)
}

pub fn advanced_filter(id: impl Into<String>, name: impl Into<String>, condition: &str) -> Node {
    build(types::ADVANCED_FILTER, Arc::new(AdvancedFilterHandler), id, name)
        .with_property("condition", condition)
}

/// Operand of single-input kinds
pub(crate) fn primary_input(node: &Node) -> Option<&Value> {
    first_present(node.inputs(), PRIMARY_INPUTS)
}

/// First present input among `candidates`
pub(crate) fn input_of<'a>(node: &'a Node, candidates: &[&str]) -> Option<&'a Value> {
    first_present(node.inputs(), candidates)
}

/// JSON kind name of a value
pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render a value as text; strings are taken verbatim
pub(crate) fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Stable pseudo-random seed for simulated payloads
pub(crate) fn seed_of(text: &str) -> u64 {
    text.bytes()
        .fold(17u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)))
}

/// Build a `PortMap` from `json!({...})` output
pub(crate) fn port_map(value: Value) -> PortMap {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = PortMap::new();
            map.insert("value".into(), other);
            map
        }
    }
}
