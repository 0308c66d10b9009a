/// Port resolution candidates
///
/// Every fallback chain used when reading values out of port maps is spelled
/// out here as an ordered list. A key that is present with a JSON `null`
/// counts as found; only missing keys fall through to the next candidate.

use crate::blueprint::types::PortMap;
use serde_json::Value;

/// Keys probed on an upstream result after the destination port name
pub const UPSTREAM_FALLBACK: &[&str] = &["value", "result"];

/// Input ports probed by sink-role nodes before "any other input"
pub const SINK_INPUTS: &[&str] = &["output", "value", "result"];

/// Input ports holding the single operand of transform-like nodes
pub const PRIMARY_INPUTS: &[&str] = &["value", "input"];

/// Context global consulted when a sink has no usable input
pub const SINK_GLOBAL: &str = "data";

/// Return the first candidate key present in `map`
pub fn first_present<'a>(map: &'a PortMap, candidates: &[&str]) -> Option<&'a Value> {
    candidates.iter().find_map(|key| map.get(*key))
}

/// Extract the value an upstream result offers to a destination port
///
/// Order: the destination port name, then [`UPSTREAM_FALLBACK`], then the
/// whole result object.
pub fn extract_for_port(result: &PortMap, to_port: &str) -> Value {
    result
        .get(to_port)
        .or_else(|| first_present(result, UPSTREAM_FALLBACK))
        .cloned()
        .unwrap_or_else(|| Value::Object(result.clone()))
}
