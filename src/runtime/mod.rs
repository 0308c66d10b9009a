/// Runtime Execution Layer
///
/// This module runs blueprints:
/// - Per-run execution context (results, published globals, status, timeout)
/// - The engine: pre-flight checks, topological scheduling, input resolution
///   and sink result collection

// Per-run scratch space and status
pub mod context;

// Dependency-ordered execution engine
pub mod engine;

// Re-export main types
pub use context::{ExecutionContext, ExecutionStatus};
pub use engine::{Engine, ExecutionReport};
