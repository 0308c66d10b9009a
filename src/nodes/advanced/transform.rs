/// Advanced transform: string formatting and collection reshaping
///
/// Parameters are read from the node's properties:
///
/// | operation   | properties                                          |
/// |-------------|-----------------------------------------------------|
/// | `format`    | `format` (uppercase, lowercase, capitalize, camelcase, snakecase, kebabcase, titlecase) |
/// | `extract`   | `pattern` (regex, default `\d+`)                    |
/// | `replace`   | `find`, `replace`                                   |
/// | `split`     | `delimiter` (default `,`)                           |
/// | `join`      | `delimiter` (default `,`)                           |
/// | `sort`      | `ascending` (default true)                          |
/// | `unique`    |                                                     |
/// | `group`     | `key_field` (default `id`)                          |
/// | `aggregate` | `aggregate_operation` (sum, average, count, min, max), `field` (default `value`) |
/// | `map`       | `transform` (uppercase, lowercase, capitalize, reverse, length) |
/// | `reduce`    | `reduce_operation` (concat, sum), `initial`         |
/// | `flatten`   |                                                     |
/// | `nest`      | `key_field`, `parent_field` (default `parent_id`)   |
/// | `merge`     |                                                     |
/// | `diff`      | `compare_with`                                      |

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::types::{port_types, PortMap, PortTypes};
use crate::nodes::advanced::resolve_input;
use crate::nodes::{as_text, kind_name, port_map};
use crate::runtime::context::ExecutionContext;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_OPERATION: &str = "format";
const DEFAULT_INPUT: &str = "Hello World";

/// Operations this kind understands
pub const OPERATIONS: &[&str] = &[
    "format", "extract", "replace", "split", "join", "sort", "unique", "group", "aggregate", "map",
    "reduce", "flatten", "nest", "merge", "diff",
];

static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("static camel-case regex"));
static WORD_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_-]+").expect("static separator regex"));

#[derive(Debug, Default, Clone, Copy)]
pub struct AdvancedTransformHandler;

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn capitalize_words(text: &str) -> String {
    text.split_whitespace().map(capitalize).collect::<Vec<_>>().join(" ")
}

fn camel_case(text: &str) -> String {
    let mut words = WORD_SEPARATORS.split(text.trim()).filter(|w| !w.is_empty());
    let mut out = words.next().map(str::to_lowercase).unwrap_or_default();
    for word in words {
        out.push_str(&capitalize(word));
    }
    out
}

fn separated_case(text: &str, separator: &str) -> String {
    let split = CAMEL_BOUNDARY.replace_all(text.trim(), "${1} ${2}");
    WORD_SEPARATORS
        .split(&split)
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(separator)
}

fn format_text(text: &str, mode: &str) -> String {
    match mode.to_lowercase().as_str() {
        "uppercase" => text.to_uppercase(),
        "lowercase" => text.to_lowercase(),
        "capitalize" | "titlecase" => capitalize_words(text),
        "camelcase" => camel_case(text),
        "snakecase" => separated_case(text, "_"),
        "kebabcase" => separated_case(text, "-"),
        _ => text.to_string(),
    }
}

fn map_item(item: &Value, transform: &str) -> Value {
    if item.is_null() {
        return Value::Null;
    }
    let text = as_text(item);
    match transform.to_lowercase().as_str() {
        "uppercase" => json!(text.to_uppercase()),
        "lowercase" => json!(text.to_lowercase()),
        "capitalize" => json!(capitalize_words(&text)),
        "reverse" => json!(text.chars().rev().collect::<String>()),
        "length" => json!(text.chars().count()),
        _ => item.clone(),
    }
}

/// Numbers order numerically, everything else by text
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => as_text(a).cmp(&as_text(b)),
    }
}

fn field_numbers<'a>(items: &'a [Value], field: &'a str) -> impl Iterator<Item = f64> + 'a {
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(move |obj| obj.get(field).and_then(Value::as_f64))
}

fn aggregate(items: &[Value], operation: &str, field: &str) -> Value {
    match operation.to_lowercase().as_str() {
        "sum" => json!(field_numbers(items, field).sum::<f64>()),
        "average" => {
            let values: Vec<f64> = field_numbers(items, field).collect();
            if values.is_empty() {
                json!(0.0)
            } else {
                json!(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        "count" => json!(items.len()),
        "min" => json!(field_numbers(items, field).reduce(f64::min).unwrap_or(0.0)),
        "max" => json!(field_numbers(items, field).reduce(f64::max).unwrap_or(0.0)),
        _ => Value::Array(items.to_vec()),
    }
}

fn flatten_into(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| flatten_into(item, out)),
        other => out.push(other.clone()),
    }
}

fn key_text(obj: &Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field).filter(|v| !v.is_null()).map(as_text)
}

/// Build parent/child trees keyed by each root's key
///
/// Items whose parent is missing or unknown become roots. Items caught in a
/// parent cycle are unreachable from any root and are dropped.
fn nest(items: &[Value], key_field: &str, parent_field: &str) -> Value {
    // Keys are unique; the first occurrence wins
    let mut seen = HashSet::new();
    let objects: Vec<(String, &Map<String, Value>)> = items
        .iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(i, obj)| (key_text(obj, key_field).unwrap_or_else(|| format!("item_{i}")), obj))
        .filter(|(key, _)| seen.insert(key.clone()))
        .collect();

    let known: HashMap<&str, &Map<String, Value>> =
        objects.iter().map(|(key, obj)| (key.as_str(), *obj)).collect();

    let mut children: HashMap<String, Vec<&str>> = HashMap::new();
    let mut roots = Vec::new();
    for (key, obj) in &objects {
        match key_text(obj, parent_field).filter(|p| known.contains_key(p.as_str())) {
            Some(parent) => children.entry(parent).or_default().push(key.as_str()),
            None => roots.push(key.as_str()),
        }
    }

    fn build(key: &str, known: &HashMap<&str, &Map<String, Value>>, children: &HashMap<String, Vec<&str>>) -> Value {
        let mut obj = known.get(key).map(|o| (*o).clone()).unwrap_or_default();
        if let Some(kids) = children.get(key) {
            let built = kids.iter().map(|kid| build(kid, known, children)).collect();
            obj.insert("children".into(), Value::Array(built));
        }
        Value::Object(obj)
    }

    let mut nested = Map::new();
    for root in roots {
        nested.insert(root.to_string(), build(root, &known, &children));
    }
    Value::Object(nested)
}

/// Apply one operation to `input`
pub fn apply(operation: &str, input: &Value, node: &Node) -> Result<Value> {
    let op = operation.to_lowercase();
    if input.is_null() && op != "split" && op != "join" {
        return Ok(Value::Null);
    }

    let delimiter = node.str_property_or("delimiter", ",");
    let key_field = node.str_property_or("key_field", "id");

    let output = match (op.as_str(), input) {
        ("format", _) => json!(format_text(&as_text(input), node.str_property_or("format", "default"))),
        ("extract", _) => {
            let pattern = node.str_property_or("pattern", r"\d+");
            let regex = Regex::new(pattern).with_context(|| format!("invalid pattern '{pattern}'"))?;
            let text = as_text(input);
            json!(regex.find_iter(&text).map(|m| m.as_str()).collect::<Vec<_>>())
        }
        ("replace", _) => {
            let text = as_text(input);
            match node.str_property_or("find", "") {
                "" => json!(text),
                find => json!(text.replace(find, node.str_property_or("replace", ""))),
            }
        }
        ("split", Value::Null) => json!([]),
        ("split", _) => json!(as_text(input).split(delimiter).collect::<Vec<_>>()),
        ("join", Value::Null) => json!(""),
        ("join", Value::Array(items)) => {
            json!(items.iter().map(as_text).collect::<Vec<_>>().join(delimiter))
        }
        ("join", _) => json!(as_text(input)),
        ("sort", Value::Array(items)) => {
            let mut sorted = items.clone();
            sorted.sort_by(compare_values);
            if !node.bool_property("ascending").unwrap_or(true) {
                sorted.reverse();
            }
            Value::Array(sorted)
        }
        ("unique", Value::Array(items)) => {
            let mut seen: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                if !seen.contains(item) {
                    seen.push(item.clone());
                }
            }
            Value::Array(seen)
        }
        ("group", Value::Array(items)) => {
            let mut groups = Map::new();
            for obj in items.iter().filter_map(Value::as_object) {
                let key = key_text(obj, key_field).unwrap_or_else(|| "unknown".to_string());
                let entry = groups.entry(key).or_insert_with(|| json!([]));
                if let Value::Array(members) = entry {
                    members.push(Value::Object(obj.clone()));
                }
            }
            Value::Object(groups)
        }
        ("aggregate", Value::Array(items)) => aggregate(
            items,
            node.str_property_or("aggregate_operation", "sum"),
            node.str_property_or("field", "value"),
        ),
        ("map", Value::Array(items)) => {
            let transform = node.str_property_or("transform", "uppercase");
            Value::Array(items.iter().map(|item| map_item(item, transform)).collect())
        }
        ("map", _) => map_item(input, node.str_property_or("transform", "uppercase")),
        ("reduce", Value::Array(items)) => {
            match node.str_property_or("reduce_operation", "concat").to_lowercase().as_str() {
                "sum" => json!(items.iter().filter_map(Value::as_f64).sum::<f64>()),
                _ => {
                    let initial = node.str_property_or("initial", "").to_string();
                    json!(items.iter().fold(initial, |acc, item| acc + &as_text(item)))
                }
            }
        }
        ("flatten", _) => {
            let mut flat = Vec::new();
            flatten_into(input, &mut flat);
            Value::Array(flat)
        }
        ("nest", Value::Array(items)) => {
            nest(items, key_field, node.str_property_or("parent_field", "parent_id"))
        }
        ("merge", Value::Array(items)) => {
            let mut merged = Map::new();
            for obj in items.iter().filter_map(Value::as_object) {
                merged.extend(obj.clone());
            }
            Value::Object(merged)
        }
        ("diff", Value::Array(items)) => match node.property("compare_with") {
            Some(Value::Array(other)) => {
                Value::Array(items.iter().filter(|item| !other.contains(item)).cloned().collect())
            }
            _ => input.clone(),
        },
        (known, _) if OPERATIONS.contains(&known) => input.clone(),
        _ => bail!("Unsupported operation: {operation}"),
    };

    Ok(output)
}

#[async_trait]
impl NodeHandler for AdvancedTransformHandler {
    async fn execute(&self, node: &Node, ctx: &mut ExecutionContext) -> Result<PortMap> {
        let operation = node.str_property_or("operation", DEFAULT_OPERATION);
        let input = resolve_input(node, ctx, DEFAULT_INPUT);

        let result = match apply(operation, &input, node) {
            Ok(output) => json!({
                "value": output,
                "output": output,
                "operation": operation,
                "success": true,
                "input_type": kind_name(&input),
                "output_type": kind_name(&output),
            }),
            Err(e) => {
                tracing::warn!("⚠️ Advanced transform '{}' failed: {:#}", node.id(), e);
                json!({
                    "error": format!("{e:#}"),
                    "operation": operation,
                    "success": false,
                })
            }
        };

        Ok(port_map(result))
    }

    fn validate(&self, node: &Node) -> bool {
        node.str_property("operation")
            .is_some_and(|op| OPERATIONS.contains(&op.trim().to_lowercase().as_str()))
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("data", "object"), ("parameters", "object")])
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[
            ("output", "object"),
            ("operation", "string"),
            ("success", "boolean"),
            ("input_type", "string"),
            ("output_type", "string"),
        ])
    }

    fn default_properties(&self) -> PortMap {
        port_map(json!({ "operation": DEFAULT_OPERATION }))
    }
}
