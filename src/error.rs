/// Engine error taxonomy
///
/// Structural errors are raised before any node runs. Execution errors and
/// timeouts abort the run that produced them; no partial results are returned.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by [`crate::runtime::Engine`]
#[derive(Debug, Error)]
pub enum EngineError {
    /// A node failed its own validation or a connection references a missing node
    #[error("blueprint '{id}' is invalid: {}", issues.join("; "))]
    InvalidBlueprint { id: String, issues: Vec<String> },

    /// A back-edge exists among connected nodes
    #[error("blueprint '{id}' contains a cycle")]
    CycleDetected { id: String },

    /// No node participates in any connection
    #[error("blueprint '{id}' has no connected nodes to execute")]
    NothingToExecute { id: String },

    /// The run exceeded its timeout; checked between node executions only
    #[error("execution timed out after {elapsed:?} (limit {limit:?}) before node '{node_id}'")]
    Timeout {
        node_id: String,
        elapsed: Duration,
        limit: Duration,
    },

    /// A node returned an error from `execute`
    #[error("node '{node_name}' ({node_id}) failed: {source:#}")]
    NodeFailed {
        node_id: String,
        node_name: String,
        #[source]
        source: anyhow::Error,
    },

    /// A node handed to `execute_node` failed its own validation
    #[error("node '{node_id}' is not valid")]
    InvalidNode { node_id: String },
}

impl EngineError {
    /// True for errors raised during pre-flight, before any node executed
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidBlueprint { .. }
                | EngineError::CycleDetected { .. }
                | EngineError::NothingToExecute { .. }
        )
    }

    /// Id of the node the error is attributed to, if any
    pub fn node_id(&self) -> Option<&str> {
        match self {
            EngineError::Timeout { node_id, .. }
            | EngineError::NodeFailed { node_id, .. }
            | EngineError::InvalidNode { node_id } => Some(node_id),
            _ => None,
        }
    }
}
