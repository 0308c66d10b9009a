/// Image load and export simulations

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::types::{port_types, PortMap, PortTypes};
use crate::nodes::{input_of, port_map};
use crate::runtime::context::ExecutionContext;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

const DEFAULT_SIDE: i64 = 512;
/// Pixels of the first row included in the preview
pub const PREVIEW_PIXELS: i64 = 8;

fn dims(node: &Node) -> (i64, i64, i64) {
    (
        node.i64_property("width").unwrap_or(DEFAULT_SIDE),
        node.i64_property("height").unwrap_or(DEFAULT_SIDE),
        node.i64_property("channels").unwrap_or(3),
    )
}

/// Raw buffer size in bytes; `None` when it does not fit in an i64
fn byte_size(width: i64, height: i64, channels: i64) -> Option<i64> {
    width.checked_mul(height)?.checked_mul(channels)
}

/// Leading pixels of a horizontal gradient (red ramps with x, blue fixed)
fn gradient_preview(width: i64) -> Vec<[i64; 3]> {
    (0..width.min(PREVIEW_PIXELS))
        .map(|x| [x * 255 / width, 0, 128])
        .collect()
}

/// Size estimate in bytes for an export format
pub fn estimate_file_size(format: &str, quality: i64) -> i64 {
    let base: i64 = 100_000;
    match format.to_uppercase().as_str() {
        "JPEG" | "JPG" => base.saturating_mul(quality) / 100,
        "PNG" => base * 2,
        "GIF" => base / 2,
        _ => base,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageInputHandler;

#[async_trait]
impl NodeHandler for ImageInputHandler {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        let source = node.str_property_or("source", "file");
        let format = node.str_property_or("format", "PNG");
        let (width, height, channels) = dims(node);
        let dimensions = format!("{width}x{height}");
        let size = byte_size(width, height, channels)
            .with_context(|| format!("image of {dimensions}x{channels} is too large"))?;

        Ok(port_map(json!({
            "image": {
                "source": source,
                "width": width,
                "height": height,
                "format": format,
                "channels": channels,
                "dimensions": dimensions,
                "size": size,
                "preview": gradient_preview(width),
                "timestamp": Utc::now().timestamp_millis(),
            },
            "source": source,
            "format": format,
            "dimensions": dimensions,
        })))
    }

    fn validate(&self, node: &Node) -> bool {
        let (width, height, channels) = dims(node);
        node.has_text("source")
            && node.has_text("format")
            && width > 0
            && height > 0
            && channels > 0
            && byte_size(width, height, channels).is_some()
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        PortTypes::new()
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[
            ("image", "object"),
            ("source", "string"),
            ("format", "string"),
            ("dimensions", "string"),
        ])
    }

    fn default_properties(&self) -> PortMap {
        port_map(json!({
            "source": "file",
            "width": DEFAULT_SIDE,
            "height": DEFAULT_SIDE,
            "format": "PNG",
            "channels": 3,
        }))
    }

    fn is_input_role(&self, _node: &Node) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageOutputHandler;

#[async_trait]
impl NodeHandler for ImageOutputHandler {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        let Some(input) = input_of(node, &["image", "value", "input"]).filter(|v| !v.is_null()) else {
            return Ok(port_map(json!({ "error": "no image data provided" })));
        };

        let format = node.str_property_or("format", "PNG");
        let destination = node.str_property_or("destination", "file");
        let quality = node.i64_property("quality").unwrap_or(90);
        let include_metadata = node.bool_property("include_metadata").unwrap_or(false);

        let mut processed = match input {
            Value::Object(map) => {
                let mut copy = map.clone();
                if include_metadata {
                    copy.insert(
                        "metadata".into(),
                        json!({
                            "original_format": map.get("format"),
                            "original_dimensions": map.get("dimensions"),
                            "original_source": map.get("source"),
                        }),
                    );
                }
                copy
            }
            other => port_map(json!({ "data": other })),
        };
        processed.insert("processed_format".into(), json!(format));
        processed.insert("processed_quality".into(), json!(quality));
        processed.insert("destination".into(), json!(destination));
        processed.insert("file_size".into(), json!(estimate_file_size(format, quality)));

        Ok(port_map(json!({
            "image": processed,
            "format": format,
            "destination": destination,
            "quality": quality,
            "include_metadata": include_metadata,
            "status": "ready",
            "timestamp": Utc::now().timestamp_millis(),
        })))
    }

    fn validate(&self, node: &Node) -> bool {
        node.has_text("format")
            && node.has_text("destination")
            && node.i64_property("quality").is_some_and(|q| (1..=100).contains(&q))
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("image", "object"), ("value", "object")])
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[
            ("image", "object"),
            ("format", "string"),
            ("destination", "string"),
            ("quality", "int"),
            ("status", "string"),
        ])
    }

    fn default_properties(&self) -> PortMap {
        port_map(json!({
            "format": "PNG",
            "destination": "file",
            "quality": 90,
            "include_metadata": false,
        }))
    }
}
