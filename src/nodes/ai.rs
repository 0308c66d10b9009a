/// AI node: deterministic stand-in for a model call
///
/// No model is contacted. Each task produces a canned, reproducible response
/// derived from the input text so runs can be asserted on.

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::types::{port_types, PortMap, PortTypes};
use crate::nodes::text::estimate_tokens;
use crate::nodes::{as_text, input_of, port_map};
use crate::runtime::context::ExecutionContext;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TASK: &str = "text-generation";

const INPUT_PORTS: &[&str] = &["text", "prompt", "value", "input"];

/// Fields holding the text of a structured payload (e.g. a text_input result)
const NESTED_TEXT: &[&str] = &["prompt", "content", "text", "result", "value"];

const GENERATIONS: &[&str] = &[
    "Based on your prompt, here is a creative and informative answer...",
    "Looking at your request, I can offer the following perspective...",
    "Given the parameters provided, I suggest the following approach...",
    "From my analysis, here is my recommendation...",
    "Exploring the possibilities, I found an interesting solution...",
];

const COMPLETIONS: &[&str] = &[
    " and that completes the idea neatly.",
    " leading to a logical, well-structured conclusion.",
    " resulting in an effective and elegant solution.",
    " showing the practical use of the concept.",
    " laying a solid base for future work.",
];

const SENTIMENTS: &[&str] = &["Positive", "Neutral", "Negative"];

#[derive(Debug, Default, Clone, Copy)]
pub struct AiHandler;

/// Plain text carried by a value, unwrapping one level of structure
fn text_of(value: &Value) -> String {
    match value {
        Value::Object(map) => NESTED_TEXT
            .iter()
            .find_map(|key| map.get(*key))
            .map(text_of)
            .unwrap_or_else(|| value.to_string()),
        other => as_text(other),
    }
}

fn pick<'a>(choices: &[&'a str], text: &str) -> &'a str {
    choices[text.chars().count() % choices.len()]
}

/// Response for a task; unknown tasks echo the input with the model name
pub fn respond(task: &str, model: &str, text: &str) -> String {
    match task.to_lowercase().as_str() {
        "text-generation" => format!("{} (processed by {})", pick(GENERATIONS, text), model),
        "text-completion" => format!("{}{}", text, pick(COMPLETIONS, text)),
        "translation" => format!("[Translated by {}]: {}", model, text.to_uppercase()),
        "summarization" => {
            let head: String = text.chars().take(100).collect();
            format!("[Summary by {}]: {}...", model, head)
        }
        "sentiment-analysis" => format!("[Sentiment by {}]: {}", model, pick(SENTIMENTS, text)),
        "image-generation" => format!("[Image prompt by {}]: A visual rendering of: {}", model, text),
        "code-generation" => format!(
            "// Generated by {}\nfn main() {{\n    println!(\"{}\");\n}}",
            model,
            text.escape_default()
        ),
        _ => format!("Processed by {}: {}", model, text),
    }
}

#[async_trait]
impl NodeHandler for AiHandler {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        let Some(input) = input_of(node, INPUT_PORTS).filter(|v| !v.is_null()) else {
            return Ok(port_map(json!({ "error": "no input provided for AI processing" })));
        };

        let model = node.str_property_or("model", DEFAULT_MODEL);
        let task = node.str_property_or("task", DEFAULT_TASK);
        let text = text_of(input);
        let response = respond(task, model, &text);
        let len = text.chars().count();

        tracing::debug!("🤖 AI node '{}' ran {} on {} chars", node.id(), task, len);

        Ok(port_map(json!({
            "value": response,
            "output": response,
            "result": response,
            "model": model,
            "task": task,
            "confidence": 0.7 + (len % 30) as f64 / 100.0,
            "processing_time": 500 + (len * 37) % 1000,
            "tokens_used": estimate_tokens(&text),
        })))
    }

    fn validate(&self, node: &Node) -> bool {
        node.has_text("model") && node.has_text("task")
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("text", "string"), ("prompt", "string"), ("value", "object")])
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[
            ("result", "object"),
            ("model", "string"),
            ("task", "string"),
            ("confidence", "double"),
            ("processing_time", "int"),
            ("tokens_used", "int"),
        ])
    }

    fn default_properties(&self) -> PortMap {
        port_map(json!({ "model": DEFAULT_MODEL, "task": DEFAULT_TASK }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes;

    #[test]
    fn tasks_are_deterministic() {
        assert_eq!(respond("translation", "m", "hola"), "[Translated by m]: HOLA");
        assert_eq!(respond("mystery", "m", "x"), "Processed by m: x");
        assert_eq!(respond("sentiment-analysis", "m", "abc"), respond("sentiment-analysis", "m", "xyz"));
        assert!(respond("summarization", "m", &"a".repeat(300)).ends_with(&format!("{}...", "a".repeat(100))));
    }

    #[tokio::test]
    async fn reads_prompt_out_of_text_input_payload() {
        let mut node = nodes::ai("a", "Translate", "translation");
        node.set_input("input", json!({"prompt": "hello", "language": "en-US"}));
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();

        assert_eq!(result["value"], json!("[Translated by gpt-3.5-turbo]: HELLO"));
        assert_eq!(result["tokens_used"], json!(1));
        assert_eq!(result["confidence"], json!(0.75));
    }

    #[tokio::test]
    async fn missing_input_is_reported_in_band() {
        let node = nodes::ai("a", "Gen", "text-generation");
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();
        assert!(result.contains_key("error"));
        assert!(node.validate());
    }
}
