/// Hot-registration node type registry using ArcSwap
///
/// Maps explicit type tags ("transform", "filter", ...) to the handler that
/// implements them. Reads are lock-free; every registration swaps the whole
/// map so graph builders running concurrently always see a consistent set.

use crate::blueprint::node::{Node, NodeHandler};
use crate::nodes;
use anyhow::Result;
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};

/// Lock-free registry of node kinds
#[derive(Debug)]
pub struct NodeRegistry {
    /// Key: type tag, Value: shared handler for that kind
    handlers: ArcSwap<HashMap<String, Arc<dyn NodeHandler>>>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl NodeRegistry {
    /// Registry with no node kinds
    pub fn empty() -> Self {
        Self {
            handlers: ArcSwap::new(Arc::new(HashMap::new())),
        }
    }

    /// Registry pre-populated with every built-in node kind
    pub fn with_builtins() -> Self {
        let handlers: HashMap<String, Arc<dyn NodeHandler>> = nodes::builtin_handlers()
            .into_iter()
            .map(|(node_type, handler)| (node_type.to_string(), handler))
            .collect();

        tracing::debug!("Initialized node registry with {} built-in types", handlers.len());

        Self {
            handlers: ArcSwap::new(Arc::new(handlers)),
        }
    }

    /// Register or replace a node kind
    pub fn register(&self, node_type: impl Into<String>, handler: Arc<dyn NodeHandler>) {
        let node_type = node_type.into();

        let current = self.handlers.load();
        let mut updated = (**current).clone();
        let replaced = updated.insert(node_type.clone(), handler).is_some();
        self.handlers.store(Arc::new(updated));

        if replaced {
            tracing::info!("Replaced node type: {}", node_type);
        } else {
            tracing::info!("Registered node type: {}", node_type);
        }
    }

    /// Remove a node kind; nodes already built keep their handler
    pub fn unregister(&self, node_type: &str) -> bool {
        let current = self.handlers.load();
        let mut updated = (**current).clone();

        if updated.remove(node_type).is_some() {
            self.handlers.store(Arc::new(updated));
            tracing::info!("Unregistered node type: {}", node_type);
            true
        } else {
            false
        }
    }

    /// Get the handler for a type tag (lock-free read)
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.load().get(node_type).cloned()
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.handlers.load().contains_key(node_type)
    }

    /// Registered type tags, sorted
    pub fn node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.load().keys().cloned().collect();
        types.sort();
        types
    }

    /// Build a node of the given kind with its default properties
    pub fn create(&self, node_type: &str, id: impl Into<String>, name: impl Into<String>) -> Result<Node> {
        let handler = self
            .get(node_type)
            .ok_or_else(|| anyhow::anyhow!("Unknown node type: {}", node_type))?;

        Ok(Node::new(id, name, node_type, handler))
    }
}
