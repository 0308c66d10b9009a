/// Advanced filter: conditions parsed into a `Predicate`
///
/// Supported forms (keywords are case-insensitive, operands keep their case
/// and may be quoted):
///
/// - `true`, `false`, `always`, `never`
/// - `is_null`, `not_null` / `is_not_null`
/// - `is_string`, `is_number`, `is_boolean`
/// - `empty`, `not_empty`
/// - `has_key(name)`, `has_value v`
/// - `[field] == v`, `!=`, `>=`, `<=`, `>`, `<`
/// - `length > n` / `count >= n` (collection or string size)
/// - `[field] contains v`, `starts_with v`, `ends_with v`, `matches regex`
/// - `[field] in [a, b]`, `not_in [a, b]`
///
/// Anything else matches inputs whose text mentions the condition. Arrays
/// and objects pass a scalar predicate when any element or value does.

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::types::{port_types, PortMap, PortTypes};
use crate::nodes::advanced::resolve_input;
use crate::nodes::{as_text, port_map};
use crate::runtime::context::ExecutionContext;
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

pub const DEFAULT_CONDITION: &str = "true";
const DEFAULT_INPUT: &str = "test";

static KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\w+\s+)?(?P<op>not_in|in|contains|starts_with|ends_with|matches|has_value)\s+(?P<rhs>.+)$")
        .expect("static keyword regex")
});
static COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<lhs>.*?)\s*(?P<op>==|!=|>=|<=|>|<)\s*(?P<rhs>.*)$").expect("static comparison regex")
});
static HAS_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^has_key\(\s*['"]?(?P<key>[^'")]*?)['"]?\s*\)$"#).expect("static has_key regex")
});
static LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?P<items>[^\]]*)\]").expect("static list regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

impl Cmp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "==" => Some(Cmp::Eq),
            "!=" => Some(Cmp::Ne),
            ">=" => Some(Cmp::Ge),
            "<=" => Some(Cmp::Le),
            ">" => Some(Cmp::Gt),
            "<" => Some(Cmp::Lt),
            _ => None,
        }
    }

    fn holds(self, a: f64, b: f64) -> bool {
        match self {
            Cmp::Eq => a == b,
            Cmp::Ne => a != b,
            Cmp::Ge => a >= b,
            Cmp::Le => a <= b,
            Cmp::Gt => a > b,
            Cmp::Lt => a < b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    Number,
    Boolean,
}

/// A parsed filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Always(bool),
    IsNull,
    NotNull,
    IsKind(Kind),
    Empty,
    NotEmpty,
    HasKey(String),
    HasValue(String),
    Size(Cmp, String),
    Compare(Cmp, String),
    Text(TextOp, String),
    Matches(String),
    In(Vec<String>),
    NotIn(Vec<String>),
    Mentions(String),
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

fn parse_list(rhs: &str) -> Vec<String> {
    let items = LIST
        .captures(rhs)
        .and_then(|caps| caps.name("items"))
        .map_or(rhs, |m| m.as_str());
    items
        .split(',')
        .map(unquote)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl Predicate {
    /// Parse a condition string; never fails, unknown text becomes `Mentions`
    pub fn parse(condition: &str) -> Self {
        let raw = condition.trim();
        let lowered = raw.to_lowercase();

        match lowered.as_str() {
            "" | "true" | "always" => return Predicate::Always(true),
            "false" | "never" => return Predicate::Always(false),
            "is_null" | "null" => return Predicate::IsNull,
            "not_null" | "is_not_null" => return Predicate::NotNull,
            "is_string" => return Predicate::IsKind(Kind::String),
            "is_number" => return Predicate::IsKind(Kind::Number),
            "is_boolean" => return Predicate::IsKind(Kind::Boolean),
            "empty" | "is_empty" => return Predicate::Empty,
            "not_empty" | "non_empty" => return Predicate::NotEmpty,
            _ => {}
        }

        if let Some(caps) = HAS_KEY.captures(raw) {
            return Predicate::HasKey(caps["key"].trim().to_string());
        }

        if let Some(caps) = KEYWORD.captures(raw) {
            let rhs = unquote(&caps["rhs"]).to_string();
            return match caps["op"].to_lowercase().as_str() {
                "not_in" => Predicate::NotIn(parse_list(&caps["rhs"])),
                "in" => Predicate::In(parse_list(&caps["rhs"])),
                "contains" => Predicate::Text(TextOp::Contains, rhs),
                "starts_with" => Predicate::Text(TextOp::StartsWith, rhs),
                "ends_with" => Predicate::Text(TextOp::EndsWith, rhs),
                "matches" => Predicate::Matches(rhs),
                _ => Predicate::HasValue(rhs),
            };
        }

        if let Some(caps) = COMPARISON.captures(raw) {
            if let Some(cmp) = Cmp::parse(&caps["op"]) {
                let rhs = unquote(&caps["rhs"]).to_string();
                let lhs = caps["lhs"].trim().to_lowercase();
                return if lhs == "length" || lhs == "count" {
                    Predicate::Size(cmp, rhs)
                } else {
                    Predicate::Compare(cmp, rhs)
                };
            }
        }

        Predicate::Mentions(lowered)
    }

    /// Evaluate against a value; only an invalid `matches` pattern errors
    pub fn evaluate(&self, input: &Value) -> Result<bool> {
        if input.is_null() {
            return Ok(match self {
                Predicate::Always(verdict) => *verdict,
                Predicate::IsNull => true,
                _ => false,
            });
        }

        let verdict = match self {
            Predicate::Always(verdict) => *verdict,
            Predicate::IsNull => false,
            Predicate::NotNull => true,
            Predicate::IsKind(kind) => matches!(
                (kind, input),
                (Kind::String, Value::String(_)) | (Kind::Number, Value::Number(_)) | (Kind::Boolean, Value::Bool(_))
            ),
            Predicate::Empty => size_of(input) == Some(0),
            Predicate::NotEmpty => size_of(input) != Some(0),
            Predicate::HasKey(key) => input.as_object().is_some_and(|obj| obj.contains_key(key)),
            Predicate::HasValue(wanted) => elements(input).any(|v| as_text(v) == *wanted),
            Predicate::Size(cmp, n) => match (size_of(input), n.parse::<f64>()) {
                (Some(size), Ok(n)) => cmp.holds(size as f64, n),
                _ => false,
            },
            _ => match input {
                Value::Array(_) | Value::Object(_) => {
                    for element in elements(input) {
                        if !element.is_null() && self.evaluate_scalar(element)? {
                            return Ok(true);
                        }
                    }
                    false
                }
                scalar => self.evaluate_scalar(scalar)?,
            },
        };
        Ok(verdict)
    }

    fn evaluate_scalar(&self, input: &Value) -> Result<bool> {
        let text = as_text(input);
        let verdict = match self {
            Predicate::Compare(cmp, rhs) => {
                let number = input.as_f64().or_else(|| text.trim().parse().ok());
                match (number, rhs.parse::<f64>()) {
                    (Some(a), Ok(b)) => cmp.holds(a, b),
                    _ => match cmp {
                        Cmp::Eq => text == *rhs,
                        Cmp::Ne => text != *rhs,
                        _ => false,
                    },
                }
            }
            Predicate::Text(op, rhs) => {
                let (text, rhs) = (text.to_lowercase(), rhs.to_lowercase());
                match op {
                    TextOp::Contains => text.contains(&rhs),
                    TextOp::StartsWith => text.starts_with(&rhs),
                    TextOp::EndsWith => text.ends_with(&rhs),
                }
            }
            Predicate::Matches(pattern) => Regex::new(&format!("^(?:{pattern})$"))
                .with_context(|| format!("invalid pattern '{pattern}'"))?
                .is_match(&text),
            Predicate::In(items) => items.contains(&text),
            Predicate::NotIn(items) => !items.contains(&text),
            Predicate::Mentions(needle) => text.to_lowercase().contains(needle.as_str()),
            _ => self.evaluate(input)?,
        };
        Ok(verdict)
    }
}

/// Element count of collections, character count of strings
fn size_of(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        Value::String(s) => Some(s.chars().count()),
        _ => None,
    }
}

fn elements(value: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Value::Array(items) => Box::new(items.iter()),
        Value::Object(map) => Box::new(map.values()),
        other => Box::new(std::iter::once(other)),
    }
}

fn filtered_count(input: &Value, passes: bool) -> usize {
    match (passes, input) {
        (false, _) => 0,
        (true, Value::Array(items)) => items.len(),
        (true, Value::Object(map)) => map.len(),
        (true, _) => 1,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AdvancedFilterHandler;

#[async_trait]
impl NodeHandler for AdvancedFilterHandler {
    async fn execute(&self, node: &Node, ctx: &mut ExecutionContext) -> Result<PortMap> {
        let condition = node.str_property_or("condition", DEFAULT_CONDITION);
        let input = resolve_input(node, ctx, DEFAULT_INPUT);
        let predicate = Predicate::parse(condition);

        let result = match predicate.evaluate(&input) {
            Ok(passes) => {
                let output = if passes { input.clone() } else { Value::Null };
                json!({
                    "value": output,
                    "output": output,
                    "condition": condition,
                    "passes": passes,
                    "success": true,
                    "filtered_count": filtered_count(&input, passes),
                })
            }
            Err(e) => {
                tracing::warn!("⚠️ Advanced filter '{}' failed: {:#}", node.id(), e);
                json!({
                    "error": format!("{e:#}"),
                    "condition": condition,
                    "passes": false,
                    "success": false,
                })
            }
        };

        Ok(port_map(result))
    }

    fn validate(&self, node: &Node) -> bool {
        node.has_text("condition")
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("data", "object"), ("condition", "string")])
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[
            ("output", "object"),
            ("condition", "string"),
            ("passes", "boolean"),
            ("success", "boolean"),
            ("filtered_count", "int"),
        ])
    }

    fn default_properties(&self) -> PortMap {
        port_map(json!({ "condition": DEFAULT_CONDITION }))
    }
}
