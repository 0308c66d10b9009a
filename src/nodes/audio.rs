/// Audio capture and playback simulations
///
/// The source synthesises a 440 Hz sine wave but only ships a short preview
/// of it together with the total sample count.

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::types::{port_types, PortMap, PortTypes};
use crate::nodes::{input_of, port_map};
use crate::runtime::context::ExecutionContext;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::f64::consts::PI;

const DEFAULT_SAMPLE_RATE: i64 = 44_100;
const DEFAULT_CHANNELS: i64 = 2;
const TONE_HZ: f64 = 440.0;
/// Samples included in the preview
pub const PREVIEW_SAMPLES: usize = 64;

fn sample_rate(node: &Node) -> i64 {
    node.i64_property("sample_rate").unwrap_or(DEFAULT_SAMPLE_RATE)
}

fn channels(node: &Node) -> i64 {
    node.i64_property("channels").unwrap_or(DEFAULT_CHANNELS)
}

/// First samples of the sine tone, rounded to 4 decimals
fn tone_preview(sample_rate: i64, total: usize) -> Vec<f64> {
    (0..total.min(PREVIEW_SAMPLES))
        .map(|i| {
            let s = (2.0 * PI * TONE_HZ * i as f64 / sample_rate as f64).sin();
            (s * 10_000.0).round() / 10_000.0
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AudioInputHandler;

#[async_trait]
impl NodeHandler for AudioInputHandler {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        let source = node.str_property_or("source", "microphone");
        let rate = sample_rate(node);
        let duration = node.f64_property("duration").unwrap_or(5.0);
        let total = (rate as f64 * duration).max(0.0) as usize;

        Ok(port_map(json!({
            "audio": {
                "source": source,
                "sample_rate": rate,
                "channels": channels(node),
                "duration": duration,
                "total_samples": total,
                "preview": tone_preview(rate, total),
                "timestamp": Utc::now().timestamp_millis(),
            },
            "source": source,
            "format": "PCM",
        })))
    }

    fn validate(&self, node: &Node) -> bool {
        node.has_text("source")
            && sample_rate(node) > 0
            && channels(node) > 0
            && node.f64_property("duration").is_some_and(|d| d > 0.0)
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        PortTypes::new()
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("audio", "object"), ("source", "string"), ("format", "string")])
    }

    fn default_properties(&self) -> PortMap {
        port_map(json!({
            "source": "microphone",
            "sample_rate": DEFAULT_SAMPLE_RATE,
            "channels": DEFAULT_CHANNELS,
            "duration": 5.0,
        }))
    }

    fn is_input_role(&self, _node: &Node) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AudioOutputHandler;

#[async_trait]
impl NodeHandler for AudioOutputHandler {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        let Some(input) = input_of(node, &["audio", "value", "input"]).filter(|v| !v.is_null()) else {
            return Ok(port_map(json!({ "error": "no audio data provided" })));
        };

        let format = node.str_property_or("format", "WAV");
        let destination = node.str_property_or("destination", "speaker");

        let mut processed = match input {
            Value::Object(map) => map.clone(),
            other => port_map(json!({ "data": other })),
        };
        processed.insert("processed_format".into(), json!(format));
        processed.insert("processed_sample_rate".into(), json!(sample_rate(node)));
        processed.insert("processed_channels".into(), json!(channels(node)));
        processed.insert("destination".into(), json!(destination));

        Ok(port_map(json!({
            "audio": processed,
            "format": format,
            "destination": destination,
            "sample_rate": sample_rate(node),
            "channels": channels(node),
            "status": "ready",
            "timestamp": Utc::now().timestamp_millis(),
        })))
    }

    fn validate(&self, node: &Node) -> bool {
        node.has_text("format") && node.has_text("destination") && sample_rate(node) > 0 && channels(node) > 0
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("audio", "object"), ("value", "object")])
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("audio", "object"), ("format", "string"), ("destination", "string"), ("status", "string")])
    }

    fn default_properties(&self) -> PortMap {
        port_map(json!({
            "format": "WAV",
            "destination": "speaker",
            "sample_rate": DEFAULT_SAMPLE_RATE,
            "channels": DEFAULT_CHANNELS,
        }))
    }
}
