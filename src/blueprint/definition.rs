/// Serializable blueprint definitions
///
/// The wire shape hosting layers exchange (JSON files, request bodies). Nodes
/// are described by a `type` discriminator and a property object; the
/// registry turns each one into a behaviour-carrying `Node`.

use crate::blueprint::{
    graph::Blueprint,
    registry::NodeRegistry,
    types::{Connection, PortMap, Position},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// A complete blueprint definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintDefinition {
    /// Blueprint id; generated when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

/// One node of a definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Node id; generated when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Registry type tag (e.g. "transform")
    #[serde(rename = "type")]
    pub node_type: String,
    /// Overrides applied on top of the kind's default properties
    #[serde(default)]
    pub properties: PortMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl BlueprintDefinition {
    /// Parse a JSON definition
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse blueprint definition")
    }

    /// Build a blueprint, resolving node types through the registry
    pub fn into_blueprint(self, registry: &NodeRegistry) -> Result<Blueprint> {
        let mut blueprint = match self.id {
            Some(id) => Blueprint::with_id(id, self.name),
            None => Blueprint::new(self.name),
        };
        blueprint.set_description(self.description);

        let mut seen = HashSet::new();
        for def in self.nodes {
            let mut node = registry
                .create(&def.node_type, def.id.unwrap_or_default(), def.name)
                .with_context(|| format!("Failed to build node of type '{}'", def.node_type))?;

            if !seen.insert(node.id().to_string()) {
                return Err(anyhow::anyhow!("Duplicate node id: {}", node.id()));
            }

            for (key, value) in def.properties {
                node.set_property(key, value);
            }
            if let Some(position) = def.position {
                node.set_position(position);
            }

            tracing::debug!("  ➕ Added node: '{}' (type: {})", node.id(), node.node_type());
            blueprint.add_node(node);
        }

        for connection in self.connections {
            tracing::debug!("  🔗 Added connection: {}", connection);
            blueprint.add_connection(connection);
        }

        for (key, value) in self.metadata {
            blueprint.set_metadata(key, value);
        }

        Ok(blueprint)
    }

    /// Capture a blueprint's static description (per-run maps are not included)
    pub fn from_blueprint(blueprint: &Blueprint) -> Self {
        let nodes = blueprint
            .nodes()
            .map(|node| NodeDefinition {
                id: Some(node.id().to_string()),
                name: node.name().to_string(),
                node_type: node.node_type().to_string(),
                properties: node.properties().clone(),
                position: Some(node.position()),
            })
            .collect();

        Self {
            id: Some(blueprint.id().to_string()),
            name: blueprint.name().to_string(),
            description: blueprint.description().to_string(),
            nodes,
            connections: blueprint.connections().to_vec(),
            metadata: blueprint
                .metadata()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PIPELINE: &str = r#"{
        "id": "bp-upper",
        "name": "Uppercase pipeline",
        "nodes": [
            {"id": "in", "name": "Input", "type": "input", "properties": {"value": "hello"}},
            {"id": "up", "name": "Upper", "type": "transform", "properties": {"operation": "uppercase"}},
            {"id": "out", "name": "Output", "type": "output", "position": {"x": 10.0, "y": 5.0}}
        ],
        "connections": [
            {"id": "c1", "from_node": "in", "to_node": "up"},
            {"id": "c2", "from_node": "up", "to_node": "out", "kind": "data"}
        ],
        "metadata": {"owner": "qa"}
    }"#;

    #[test]
    fn builds_blueprint_through_registry() {
        let registry = NodeRegistry::with_builtins();
        let bp = BlueprintDefinition::from_json(PIPELINE)
            .unwrap()
            .into_blueprint(&registry)
            .unwrap();

        assert_eq!(bp.id(), "bp-upper");
        assert_eq!(bp.node_count(), 3);
        assert_eq!(bp.node("up").unwrap().str_property("operation"), Some("uppercase"));
        assert_eq!(bp.node("out").unwrap().str_property("output_name"), Some("result"));
        assert_eq!(bp.node("out").unwrap().position(), Position::new(10.0, 5.0));
        assert_eq!(bp.metadata_value("owner"), Some(&json!("qa")));
        assert!(bp.validate());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let json = r#"{"name": "bad", "nodes": [{"name": "x", "type": "teleport"}]}"#;
        let err = BlueprintDefinition::from_json(json)
            .unwrap()
            .into_blueprint(&NodeRegistry::with_builtins())
            .unwrap_err();
        assert!(format!("{err:#}").contains("teleport"));
    }

    #[test]
    fn duplicate_node_ids_are_rejected() {
        let json = r#"{"name": "dup", "nodes": [
            {"id": "a", "name": "A", "type": "transform"},
            {"id": "a", "name": "B", "type": "transform"}
        ]}"#;
        let result = BlueprintDefinition::from_json(json)
            .unwrap()
            .into_blueprint(&NodeRegistry::with_builtins());
        assert!(result.is_err());
    }

    #[test]
    fn definition_survives_a_blueprint_round_trip() {
        let registry = NodeRegistry::with_builtins();
        let bp = BlueprintDefinition::from_json(PIPELINE)
            .unwrap()
            .into_blueprint(&registry)
            .unwrap();

        let rebuilt = BlueprintDefinition::from_blueprint(&bp)
            .into_blueprint(&registry)
            .unwrap();
        assert_eq!(rebuilt.connections(), bp.connections());
        assert_eq!(rebuilt.execution_order(), bp.execution_order());
    }
}
