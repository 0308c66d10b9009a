/// Per-run execution state
///
/// A fresh `ExecutionContext` is created for every engine run and holds each
/// node's last result, values published during the run, named variables and
/// the run's status and timeout bookkeeping. It is never shared between runs.

use crate::blueprint::types::PortMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Default run timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::TimedOut => "timed_out",
        };
        f.write_str(name)
    }
}

/// Mutable scratch space of one run
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Key: node id, Value: that node's result in this run
    node_results: HashMap<String, PortMap>,
    /// Values published by output-role nodes and engine seeds
    global_data: HashMap<String, Value>,
    /// Free-form named variables
    variables: HashMap<String, Value>,
    status: ExecutionStatus,
    started: Instant,
    started_at: DateTime<Utc>,
    timeout: Duration,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ExecutionContext {
    /// Create a pending context; the clock starts now
    pub fn new(timeout: Duration) -> Self {
        Self {
            node_results: HashMap::new(),
            global_data: HashMap::new(),
            variables: HashMap::new(),
            status: ExecutionStatus::Pending,
            started: Instant::now(),
            started_at: Utc::now(),
            timeout,
        }
    }

    // Node results

    pub fn set_node_result(&mut self, node_id: impl Into<String>, result: PortMap) {
        self.node_results.insert(node_id.into(), result);
    }

    pub fn node_result(&self, node_id: &str) -> Option<&PortMap> {
        self.node_results.get(node_id)
    }

    pub fn node_results(&self) -> &HashMap<String, PortMap> {
        &self.node_results
    }

    // Global data

    pub fn set_global(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.global_data.insert(key.into(), value.into());
    }

    pub fn global(&self, key: &str) -> Option<&Value> {
        self.global_data.get(key)
    }

    pub fn globals(&self) -> &HashMap<String, Value> {
        &self.global_data
    }

    // Variables

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    // Status and timing

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ExecutionStatus) {
        self.status = status;
    }

    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == ExecutionStatus::Failed
    }

    pub fn is_timed_out(&self) -> bool {
        self.status == ExecutionStatus::TimedOut
    }

    /// Wall-clock time the context was created
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// True once more time than the timeout has elapsed
    pub fn has_timed_out(&self) -> bool {
        self.elapsed() > self.timeout
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "context(status={}, nodes={}, variables={}, elapsed={:?})",
            self.status,
            self.node_results.len(),
            self.variables.len(),
            self.elapsed()
        )
    }
}
