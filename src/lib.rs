/// Blueprint Engine: node-graph execution core
///
/// This library models computations as blueprints (graphs of typed nodes
/// joined by port-to-port connections) and runs them in dependency order with
/// fail-fast error handling and a cooperative timeout.

// Core configuration and setup
pub mod config;

// Engine error taxonomy
pub mod error;

// Blueprint model layer - nodes, connections, graph container, registry, wire format
pub mod blueprint;

// Built-in node kinds and their constructors
pub mod nodes;

// Runtime execution layer - per-run context and the dependency-ordered engine
pub mod runtime;

// Logging bootstrap and one-shot run helpers for the binary
pub mod runner;

// Re-export commonly used types for external consumers
pub use blueprint::{Blueprint, BlueprintDefinition, Connection, Node, NodeHandler, NodeRegistry, PortMap};
pub use error::EngineError;
pub use runtime::{Engine, ExecutionContext, ExecutionReport, ExecutionStatus};
