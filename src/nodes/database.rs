/// Database operation simulation
///
/// No connection is opened; each statement kind returns a canned result for
/// the configured table. SELECT nodes act as sources, mutating statements as
/// sinks.

use crate::blueprint::node::{Node, NodeHandler};
use crate::blueprint::types::{port_types, PortMap, PortTypes};
use crate::nodes::{port_map, seed_of};
use crate::runtime::context::ExecutionContext;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

pub const DEFAULT_OPERATION: &str = "SELECT";
pub const DEFAULT_TABLE: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    Select,
    Insert,
    Update,
    Delete,
}

impl Statement {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "SELECT" => Some(Statement::Select),
            "INSERT" => Some(Statement::Insert),
            "UPDATE" => Some(Statement::Update),
            "DELETE" => Some(Statement::Delete),
            _ => None,
        }
    }

    fn of(node: &Node) -> Option<Self> {
        Self::parse(node.str_property_or("operation", DEFAULT_OPERATION))
    }

    fn is_mutation(self) -> bool {
        !matches!(self, Statement::Select)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DatabaseHandler;

fn mock_rows(seed: u64) -> Value {
    let rows: Vec<Value> = (1..=1 + seed % 5)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("User {i}"),
                "email": format!("user{i}@example.com"),
                "created_at": format!("2024-01-{i:02}"),
            })
        })
        .collect();
    Value::Array(rows)
}

fn simulate(statement: Statement, table: &str, seed: u64) -> Value {
    match statement {
        Statement::Select => json!({
            "query": format!("SELECT * FROM {table}"),
            "records": 1 + seed % 50,
            "columns": ["id", "name", "email", "created_at"],
            "data": mock_rows(seed),
        }),
        Statement::Insert => json!({
            "query": format!("INSERT INTO {table} VALUES (...)"),
            "inserted_id": seed % 10_000,
            "affected_rows": 1,
        }),
        Statement::Update => json!({
            "query": format!("UPDATE {table} SET ... WHERE ..."),
            "affected_rows": 1 + seed % 10,
        }),
        Statement::Delete => json!({
            "query": format!("DELETE FROM {table} WHERE ..."),
            "affected_rows": 1 + seed % 5,
        }),
    }
}

#[async_trait]
impl NodeHandler for DatabaseHandler {
    async fn execute(&self, node: &Node, _ctx: &mut ExecutionContext) -> Result<PortMap> {
        let operation = node.str_property_or("operation", DEFAULT_OPERATION);
        let table = node.str_property_or("table", DEFAULT_TABLE);
        let seed = seed_of(table);

        let (data, success) = match Statement::parse(operation) {
            Some(statement) => (simulate(statement, table, seed), true),
            None => (json!(format!("Unsupported operation: {operation}")), false),
        };

        tracing::debug!("🗄️ Database node '{}' simulated {} on {}", node.id(), operation, table);

        Ok(port_map(json!({
            "value": data,
            "output": data,
            "data": data,
            "operation": operation,
            "table": table,
            "rows_affected": 1 + seed % 100,
            "execution_time": 50 + seed % 500,
            "success": success,
        })))
    }

    fn validate(&self, node: &Node) -> bool {
        node.has_text("operation") && node.has_text("table")
    }

    fn declared_inputs(&self, _node: &Node) -> PortTypes {
        port_types(&[("query_params", "object"), ("connection_string", "string")])
    }

    fn declared_outputs(&self, _node: &Node) -> PortTypes {
        port_types(&[
            ("data", "object"),
            ("operation", "string"),
            ("table", "string"),
            ("rows_affected", "int"),
            ("execution_time", "int"),
            ("success", "boolean"),
        ])
    }

    fn default_properties(&self) -> PortMap {
        port_map(json!({ "operation": DEFAULT_OPERATION, "table": DEFAULT_TABLE }))
    }

    fn is_input_role(&self, node: &Node) -> bool {
        Statement::of(node) == Some(Statement::Select)
    }

    fn is_output_role(&self, node: &Node) -> bool {
        Statement::of(node).is_some_and(Statement::is_mutation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes;

    #[tokio::test]
    async fn select_lists_rows_for_table() {
        let node = nodes::database("d", "Users", "select", "customers");
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();

        assert_eq!(result["value"]["query"], json!("SELECT * FROM customers"));
        assert!(result["data"]["data"].as_array().is_some_and(|rows| !rows.is_empty()));
        assert_eq!(result["success"], json!(true));
        assert!(node.is_input_role());
    }

    #[tokio::test]
    async fn mutations_are_sinks() {
        let node = nodes::database("d", "Insert", "INSERT", "orders");
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();
        assert_eq!(result["value"]["affected_rows"], json!(1));
        assert!(node.is_output_role());
        assert!(!node.is_input_role());
    }

    #[tokio::test]
    async fn unknown_statement_fails_in_band() {
        let node = nodes::database("d", "Merge", "MERGE", "orders");
        let result = node.execute(&mut ExecutionContext::default()).await.unwrap();
        assert_eq!(result["success"], json!(false));
        assert!(!nodes::database("d", "Blank", "SELECT", " ").validate());
    }
}
