/// Core blueprint type definitions
///
/// Connections, editor positions and the map aliases shared by nodes, the
/// engine and the definition layer. Values are carried as `serde_json::Value`
/// so any node can exchange any JSON-shaped payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Port name → value map used for node inputs, outputs and results
pub type PortMap = serde_json::Map<String, Value>;

/// Port name → declared type name (e.g. "value" → "object")
pub type PortTypes = BTreeMap<String, String>;

/// Default source port of a connection
pub const DEFAULT_FROM_PORT: &str = "output";

/// Default destination port of a connection
pub const DEFAULT_TO_PORT: &str = "input";

/// Generate a fresh identifier for nodes, connections and blueprints
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Build a [`PortTypes`] map from static pairs
pub fn port_types(pairs: &[(&str, &str)]) -> PortTypes {
    pairs
        .iter()
        .map(|(name, ty)| (name.to_string(), ty.to_string()))
        .collect()
}

/// Kind of a connection
///
/// Informational only: the scheduler treats every kind identically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    /// Data flow between ports
    #[default]
    Data,
    /// Control flow
    Control,
    /// Event propagation
    Event,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionKind::Data => "data",
            ConnectionKind::Control => "control",
            ConnectionKind::Event => "event",
        };
        f.write_str(name)
    }
}

fn default_from_port() -> String {
    DEFAULT_FROM_PORT.to_string()
}

fn default_to_port() -> String {
    DEFAULT_TO_PORT.to_string()
}

/// Directed, named-port edge between two nodes
///
/// Endpoints are not checked on insertion; `Blueprint::validate` rejects
/// connections whose nodes are missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection identifier within the blueprint
    #[serde(default = "new_id")]
    pub id: String,
    /// Source node ID
    pub from_node: String,
    /// Destination node ID
    pub to_node: String,
    /// Port read on the source side (informational)
    #[serde(default = "default_from_port")]
    pub from_port: String,
    /// Input port written on the destination node
    #[serde(default = "default_to_port")]
    pub to_port: String,
    /// Connection kind
    #[serde(default)]
    pub kind: ConnectionKind,
}

impl Connection {
    /// Create a data connection using the default `output` → `input` ports
    pub fn new(id: impl Into<String>, from_node: impl Into<String>, to_node: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from_node: from_node.into(),
            to_node: to_node.into(),
            from_port: default_from_port(),
            to_port: default_to_port(),
            kind: ConnectionKind::Data,
        }
    }

    /// Create a connection with a generated id
    pub fn between(from_node: impl Into<String>, to_node: impl Into<String>) -> Self {
        Self::new(new_id(), from_node, to_node)
    }

    /// Set both port names
    pub fn with_ports(mut self, from_port: impl Into<String>, to_port: impl Into<String>) -> Self {
        self.from_port = from_port.into();
        self.to_port = to_port.into();
        self
    }

    /// Set the connection kind
    pub fn with_kind(mut self, kind: ConnectionKind) -> Self {
        self.kind = kind;
        self
    }

    /// True if either endpoint is the given node
    pub fn touches(&self, node_id: &str) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}.{} -> {}.{}, {})",
            self.id, self.from_node, self.from_port, self.to_node, self.to_port, self.kind
        )
    }
}

/// Position of a node in the visual editor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate by the given deltas
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}
