/// Filter node: passes its input through when a condition holds
///
/// Conditions are lower-cased and trimmed, then matched against a fixed
/// vocabulary chosen by the runtime type of the input. Anything unrecognised
/// evaluates to false.

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::types::{port_types, PortMap, PortTypes};
use crate::nodes::primary_input;
use crate::runtime::context::ExecutionContext;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::str::FromStr;

pub const DEFAULT_CONDITION: &str = "true";

#[derive(Debug, Default, Clone, Copy)]
pub struct FilterHandler;

/// Evaluate `condition` against `input`
pub fn evaluate(input: &Value, condition: &str) -> bool {
    let cond = condition.trim().to_lowercase();
    if cond.is_empty() {
        return true;
    }

    if let Value::String(s) = input {
        if let Some(verdict) = string_condition(s, &cond) {
            return verdict;
        }
    }

    if let Some(n) = input.as_f64() {
        if let Some(verdict) = number_condition(n, &cond) {
            return verdict;
        }
    }

    if !input.is_null() {
        match cond.as_str() {
            "not_null" => return true,
            "is_null" => return false,
            _ => {}
        }
    }

    false
}

fn parse_or_false<T: FromStr>(arg: &str, check: impl FnOnce(T) -> bool) -> bool {
    arg.trim().parse::<T>().map(check).unwrap_or(false)
}

fn string_condition(s: &str, cond: &str) -> Option<bool> {
    let len = s.chars().count();

    let verdict = match cond {
        "true" | "always" => true,
        "false" | "never" => false,
        "not_empty" | "non_empty" => !s.is_empty(),
        "empty" => s.is_empty(),
        "contains_vowels" => s.chars().any(|c| "aeiouAEIOU".contains(c)),
        "starts_with_capital" => s.chars().next().is_some_and(char::is_uppercase),
        "is_numeric" => !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
        "is_alpha" => !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()),
        "is_alphanumeric" => !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()),
        _ => {
            // ">=" before ">" so "length >= 3" is not read as "length > = 3"
            if let Some(arg) = cond.strip_prefix("length >= ") {
                parse_or_false(arg, |min: usize| len >= min)
            } else if let Some(arg) = cond.strip_prefix("length > ") {
                parse_or_false(arg, |min: usize| len > min)
            } else if let Some(arg) = cond.strip_prefix("contains ") {
                s.contains(arg)
            } else if let Some(arg) = cond.strip_prefix("starts_with ") {
                s.starts_with(arg)
            } else if let Some(arg) = cond.strip_prefix("ends_with ") {
                s.ends_with(arg)
            } else if let Some(arg) = cond.strip_prefix("== ") {
                s == arg
            } else if let Some(arg) = cond.strip_prefix("!= ") {
                s != arg
            } else {
                return None;
            }
        }
    };
    Some(verdict)
}

fn number_condition(n: f64, cond: &str) -> Option<bool> {
    let verdict = match cond {
        "positive" => n > 0.0,
        "negative" => n < 0.0,
        "zero" => n == 0.0,
        "even" => n % 2.0 == 0.0,
        "odd" => n % 2.0 != 0.0,
        _ => {
            if let Some(arg) = cond.strip_prefix(">= ") {
                parse_or_false(arg, |t: f64| n >= t)
            } else if let Some(arg) = cond.strip_prefix("> ") {
                parse_or_false(arg, |t: f64| n > t)
            } else if let Some(arg) = cond.strip_prefix("<= ") {
                parse_or_false(arg, |t: f64| n <= t)
            } else if let Some(arg) = cond.strip_prefix("< ") {
                parse_or_false(arg, |t: f64| n < t)
            } else if let Some(arg) = cond.strip_prefix("== ") {
                parse_or_false(arg, |t: f64| n == t)
            } else if let Some(arg) = cond.strip_prefix("!= ") {
                parse_or_false(arg, |t: f64| n != t)
            } else {
                return None;
            }
        }
    };
    Some(verdict)
}

#[async_trait]
impl NodeHandler for FilterHandler {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        let mut result = PortMap::new();

        let Some(input) = primary_input(node).filter(|v| !v.is_null()) else {
            result.insert("error".into(), json!("no input value provided"));
            return Ok(result);
        };

        let condition = node.str_property_or("condition", DEFAULT_CONDITION);
        let passes = evaluate(input, condition);
        let output = if passes { input.clone() } else { Value::Null };

        tracing::debug!("🔍 Filter '{}' condition '{}' -> {}", node.id(), condition, passes);

        result.insert("value".into(), output.clone());
        result.insert("output".into(), output);
        result.insert("condition".into(), json!(condition));
        result.insert("passes".into(), json!(passes));
        result.insert("original".into(), input.clone());
        Ok(result)
    }

    fn validate(&self, node: &Node) -> bool {
        node.has_text("condition")
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("value", "object")])
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[
            ("value", "object"),
            ("condition", "string"),
            ("passes", "boolean"),
            ("original", "object"),
        ])
    }

    fn default_properties(&self) -> PortMap {
        let mut props = PortMap::new();
        props.insert("condition".into(), json!(DEFAULT_CONDITION));
        props
    }
}
