/// Blueprint Model Layer
///
/// This module holds the static description of a computation graph:
/// - Type definitions (Connection, Position, port maps)
/// - Node entity and the NodeHandler behaviour trait
/// - The Blueprint container and its structural queries
/// - The node type registry and the serializable definition format

// Connection, Position and shared map aliases
pub mod types;

// Ordered port fallback lists
pub mod ports;

// Node entity and behaviour trait
pub mod node;

// Graph container: validation, cycle detection, ordering
pub mod graph;

// Lock-free registry of node kinds keyed by type tag
pub mod registry;

// Serde wire shape for blueprints
pub mod definition;

// Re-export commonly used types
pub use definition::{BlueprintDefinition, NodeDefinition};
pub use graph::Blueprint;
pub use node::{Node, NodeHandler};
pub use registry::NodeRegistry;
pub use types::{Connection, ConnectionKind, PortMap, PortTypes, Position};
