/// Advanced transform and filter nodes
///
/// Unlike the basic kinds these fall back to the context's "data" global and
/// then to a `default_value` property when nothing is wired in, and they
/// report their own failures in-band (`success: false`) instead of failing
/// the run.

use crate::blueprint::node::Node;
use crate::blueprint::ports::SINK_GLOBAL;
use crate::nodes::primary_input;
use crate::runtime::context::ExecutionContext;
use serde_json::Value;

// Collection and string reshaping
pub mod transform;

// Condition parser and evaluator
pub mod filter;

pub use filter::{AdvancedFilterHandler, Predicate};
pub use transform::AdvancedTransformHandler;

/// Operand resolution: primary input, then the "data" global, then `default_value`
pub(crate) fn resolve_input(node: &Node, ctx: &ExecutionContext, fallback: &str) -> Value {
    primary_input(node)
        .filter(|v| !v.is_null())
        .or_else(|| ctx.global(SINK_GLOBAL).filter(|v| !v.is_null()))
        .or_else(|| node.property("default_value"))
        .cloned()
        .unwrap_or_else(|| Value::String(fallback.to_string()))
}
