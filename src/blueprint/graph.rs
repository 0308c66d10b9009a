/// Blueprint graph container
///
/// Owns nodes and connections and answers the structural questions the engine
/// asks before a run: validity, cycles, execution order and sinks. Graph
/// algorithms run on a petgraph `DiGraph` projected from the current state.

use crate::blueprint::node::Node;
use crate::blueprint::types::{new_id, Connection};
use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, Control, DfsEvent, DfsPostOrder};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A named graph of nodes and connections
///
/// Connections are kept in insertion order. When several connections feed the
/// same destination port, the engine resolves them in that order, so the one
/// added last wins.
#[derive(Debug, Clone)]
pub struct Blueprint {
    id: String,
    name: String,
    description: String,
    nodes: BTreeMap<String, Node>,
    connections: Vec<Connection>,
    metadata: HashMap<String, Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Projection of the blueprint used by the graph algorithms
struct GraphView<'a> {
    graph: DiGraph<&'a str, ()>,
    index_of: HashMap<&'a str, NodeIndex>,
}

impl Blueprint {
    /// Create an empty blueprint with a generated id
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(new_id(), name)
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            nodes: BTreeMap::new(),
            connections: Vec::new(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // Nodes

    /// Insert a node, replacing any node with the same id
    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id().to_string(), node);
        self.touch();
    }

    /// Remove a node together with every connection touching it
    pub fn remove_node(&mut self, node_id: &str) -> Option<Node> {
        let removed = self.nodes.remove(node_id);
        self.connections.retain(|conn| !conn.touches(node_id));
        self.touch();
        removed
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(node_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes_by_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.values().filter(move |n| n.node_type() == node_type)
    }

    /// Nodes whose handler reports an input role
    pub fn input_nodes(&self) -> Vec<&Node> {
        self.nodes.values().filter(|n| n.is_input_role()).collect()
    }

    // Connections

    /// Append a connection; an existing connection with the same id is replaced in place
    pub fn add_connection(&mut self, connection: Connection) {
        match self.connections.iter_mut().find(|c| c.id == connection.id) {
            Some(existing) => *existing = connection,
            None => self.connections.push(connection),
        }
        self.touch();
    }

    /// Convenience for a default-port data connection with a generated id
    pub fn connect(&mut self, from_node: &str, to_node: &str) -> String {
        let connection = Connection::between(from_node, to_node);
        let id = connection.id.clone();
        self.add_connection(connection);
        id
    }

    pub fn remove_connection(&mut self, connection_id: &str) -> Option<Connection> {
        let position = self.connections.iter().position(|c| c.id == connection_id)?;
        self.touch();
        Some(self.connections.remove(position))
    }

    pub fn connection(&self, connection_id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == connection_id)
    }

    /// All connections in insertion order
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connections_from<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.from_node == node_id)
    }

    pub fn connections_to<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.to_node == node_id)
    }

    /// True if at least one connection touches the node
    pub fn is_connected(&self, node_id: &str) -> bool {
        self.connections.iter().any(|c| c.touches(node_id))
    }

    // Metadata

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
        self.touch();
    }

    pub fn remove_metadata(&mut self, key: &str) -> Option<Value> {
        let removed = self.metadata.remove(key);
        self.touch();
        removed
    }

    // Structure

    /// Reasons this blueprint cannot run; empty when valid
    pub fn validation_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for node in self.nodes.values() {
            if !node.validate() {
                issues.push(format!("node '{}' ({}) is not valid", node.id(), node.node_type()));
            }
        }

        for conn in &self.connections {
            for endpoint in [&conn.from_node, &conn.to_node] {
                if !self.nodes.contains_key(endpoint) {
                    issues.push(format!(
                        "connection '{}' references unknown node '{}'",
                        conn.id, endpoint
                    ));
                }
            }
        }

        issues
    }

    /// Every node validates and every connection endpoint exists
    pub fn validate(&self) -> bool {
        self.validation_issues().is_empty()
    }

    /// Depth-first search for a back-edge into a node still on the stack
    pub fn has_cycles(&self) -> bool {
        let view = self.graph_view();
        let found = depth_first_search(&view.graph, view.graph.node_indices(), |event| {
            match event {
                DfsEvent::BackEdge(_, _) => Control::Break(()),
                _ => Control::Continue,
            }
        });
        found.break_value().is_some()
    }

    /// Topological order of the connected nodes
    ///
    /// Each connected node seeds a post-order DFS sharing one visited set;
    /// reversing the collected sequence puts every node after its connected
    /// predecessors. Isolated nodes never appear. Only meaningful for acyclic
    /// blueprints.
    pub fn execution_order(&self) -> Vec<String> {
        let view = self.graph_view();
        let mut dfs = DfsPostOrder::empty(&view.graph);
        let mut order = Vec::new();

        for id in self.nodes.keys() {
            if !self.is_connected(id) {
                continue;
            }
            dfs.move_to(view.index_of[id.as_str()]);
            while let Some(ix) = dfs.next(&view.graph) {
                order.push(view.graph[ix].to_string());
            }
        }

        order.reverse();
        order
    }

    /// Connected nodes without outgoing connections
    pub fn sink_nodes(&self) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|n| self.is_connected(n.id()) && self.connections_from(n.id()).next().is_none())
            .collect()
    }

    fn graph_view(&self) -> GraphView<'_> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.connections.len());
        let mut index_of = HashMap::with_capacity(self.nodes.len());

        for id in self.nodes.keys() {
            index_of.insert(id.as_str(), graph.add_node(id.as_str()));
        }

        // Dangling connections are a validation concern, not a structural one
        for conn in &self.connections {
            if let (Some(&from), Some(&to)) = (
                index_of.get(conn.from_node.as_str()),
                index_of.get(conn.to_node.as_str()),
            ) {
                graph.add_edge(from, to, ());
            }
        }

        GraphView { graph, index_of }
    }
}

impl fmt::Display for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "blueprint '{}' ({}, {} nodes, {} connections)",
            self.name,
            self.id,
            self.nodes.len(),
            self.connections.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes;

    fn chain(ids: &[&str]) -> Blueprint {
        let mut bp = Blueprint::with_id("bp", "chain");
        for id in ids {
            bp.add_node(nodes::transform(*id, *id, "identity"));
        }
        for pair in ids.windows(2) {
            bp.connect(pair[0], pair[1]);
        }
        bp
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|n| n == id).unwrap()
    }

    #[test]
    fn order_follows_connections() {
        let mut bp = chain(&["c", "b", "a"]);
        bp.add_node(nodes::transform("d", "d", "identity"));
        bp.connect("c", "d");

        let order = bp.execution_order();
        assert_eq!(order.len(), 4);
        assert!(position(&order, "c") < position(&order, "b"));
        assert!(position(&order, "b") < position(&order, "a"));
        assert!(position(&order, "c") < position(&order, "d"));
        assert!(!bp.has_cycles());
    }

    #[test]
    fn isolated_nodes_are_not_ordered() {
        let mut bp = chain(&["a", "b"]);
        bp.add_node(nodes::input("lonely", "Lonely", "x"));

        let order = bp.execution_order();
        assert_eq!(order, vec!["a".to_string(), "b".to_string()]);
        assert!(!bp.is_connected("lonely"));
        assert!(bp.sink_nodes().iter().all(|n| n.id() != "lonely"));
    }

    #[test]
    fn back_edge_is_a_cycle() {
        let mut bp = chain(&["a", "b", "c"]);
        assert!(!bp.has_cycles());
        bp.connect("c", "a");
        assert!(bp.has_cycles());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut bp = chain(&["a"]);
        bp.connect("a", "a");
        assert!(bp.has_cycles());
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut bp = chain(&["a", "b", "d"]);
        bp.add_node(nodes::transform("c", "c", "identity"));
        bp.connect("a", "c");
        bp.connect("c", "d");
        assert!(!bp.has_cycles());

        let order = bp.execution_order();
        assert!(position(&order, "c") < position(&order, "d"));
        assert!(position(&order, "b") < position(&order, "d"));
    }

    #[test]
    fn dangling_connection_fails_validation() {
        let mut bp = chain(&["a", "b"]);
        assert!(bp.validate());

        bp.add_connection(Connection::new("dangling", "b", "ghost"));
        assert!(!bp.validate());
        let issues = bp.validation_issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("ghost"));
    }

    #[test]
    fn invalid_node_fails_validation() {
        let mut bp = chain(&["a"]);
        bp.add_node(nodes::input("in", "Input", serde_json::Value::Null));
        assert!(!bp.validate());
    }

    #[test]
    fn remove_node_drops_its_connections() {
        let mut bp = chain(&["a", "b", "c"]);
        assert!(bp.remove_node("b").is_some());
        assert!(bp.connections().is_empty());
        assert!(bp.execution_order().is_empty());
    }

    #[test]
    fn connection_with_same_id_replaces_in_place() {
        let mut bp = chain(&["a", "b", "c"]);
        bp.add_connection(Connection::new("first", "a", "c"));
        bp.add_connection(Connection::new("second", "b", "c"));
        bp.add_connection(Connection::new("first", "a", "b").with_ports("output", "value"));

        let ids: Vec<&str> = bp.connections().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids[ids.len() - 2..], ["first", "second"]);
        assert_eq!(bp.connection("first").unwrap().to_node, "b");
        assert!(bp.remove_connection("first").is_some());
        assert!(bp.remove_connection("first").is_none());
    }

    #[test]
    fn sinks_are_connected_nodes_without_outgoing_edges() {
        let mut bp = chain(&["a", "b"]);
        bp.add_node(nodes::transform("c", "c", "identity"));
        bp.connect("a", "c");

        let mut sinks: Vec<&str> = bp.sink_nodes().iter().map(|n| n.id()).collect();
        sinks.sort();
        assert_eq!(sinks, vec!["b", "c"]);
    }

    #[test]
    fn mutations_bump_updated_at() {
        let mut bp = Blueprint::new("meta");
        let created = bp.created_at();
        bp.set_metadata("owner", "ops");
        assert!(bp.updated_at() >= created);
        assert_eq!(bp.metadata_value("owner"), Some(&serde_json::json!("ops")));
    }
}
