/// Dependency-ordered blueprint execution engine
///
/// Runs the connected nodes of a blueprint one at a time in topological
/// order. Each node's inputs are resolved from the results of its upstream
/// nodes, the run's timeout is checked between nodes, and the first failing
/// node aborts the whole run with no partial results.

use crate::blueprint::graph::Blueprint;
use crate::blueprint::node::Node;
use crate::blueprint::ports::extract_for_port;
use crate::blueprint::types::PortMap;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::runtime::context::{ExecutionContext, ExecutionStatus, DEFAULT_TIMEOUT};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Blueprint execution engine
///
/// Holds only immutable configuration: the run timeout and global seeds that
/// are copied into every run's context. Values published during a run live in
/// that run's context, so one engine can drive any number of runs.
#[derive(Debug, Clone)]
pub struct Engine {
    /// Key: global name, Value: seed copied into each fresh context
    globals: HashMap<String, Value>,
    timeout: Duration,
}

/// Outcome of a run together with the context it ran in
#[derive(Debug)]
pub struct ExecutionReport {
    pub context: ExecutionContext,
    pub result: Result<PortMap, EngineError>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with the default 30 second timeout and no seeds
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            globals: HashMap::new(),
            timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_timeout(config.timeout())
    }

    /// Add a global seed visible to every run
    pub fn with_global(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(key.into(), value.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn globals(&self) -> &HashMap<String, Value> {
        &self.globals
    }

    /// Pre-flight check without running anything
    pub fn validate_blueprint(&self, blueprint: &Blueprint) -> bool {
        blueprint.validate() && !blueprint.has_cycles()
    }

    /// Execute a blueprint and return the results of its sink nodes
    ///
    /// Output-role sinks with a designated output name are keyed by that name;
    /// every other sink is keyed by its node name and reports its whole result.
    pub async fn execute(&self, blueprint: &mut Blueprint) -> Result<PortMap, EngineError> {
        self.execute_with_report(blueprint).await.result
    }

    /// Same as [`Engine::execute`] but also hands back the run's context
    pub async fn execute_with_report(&self, blueprint: &mut Blueprint) -> ExecutionReport {
        let mut context = self.fresh_context();
        let result = self.run(blueprint, &mut context).await;
        if result.is_err() && !context.is_timed_out() {
            context.set_status(ExecutionStatus::Failed);
        }
        ExecutionReport { context, result }
    }

    /// Validate and run a single node, storing its result in `ctx`
    pub async fn execute_node(&self, node: &Node, ctx: &mut ExecutionContext) -> Result<PortMap, EngineError> {
        if !node.validate() {
            tracing::warn!("⚠️ Node {} failed validation", node);
            return Err(EngineError::InvalidNode {
                node_id: node.id().to_string(),
            });
        }

        let result = node.execute(ctx).await.map_err(|source| {
            tracing::error!("❌ Node {} failed: {:#}", node, source);
            EngineError::NodeFailed {
                node_id: node.id().to_string(),
                node_name: node.name().to_string(),
                source,
            }
        })?;

        ctx.set_node_result(node.id(), result.clone());
        Ok(result)
    }

    fn fresh_context(&self) -> ExecutionContext {
        let mut context = ExecutionContext::new(self.timeout);
        for (key, value) in &self.globals {
            context.set_global(key.clone(), value.clone());
        }
        context
    }

    async fn run(&self, blueprint: &mut Blueprint, ctx: &mut ExecutionContext) -> Result<PortMap, EngineError> {
        tracing::info!("🚀 Starting execution of {}", blueprint);

        let issues = blueprint.validation_issues();
        if !issues.is_empty() {
            tracing::warn!("⚠️ Blueprint '{}' failed validation: {}", blueprint.id(), issues.join("; "));
            return Err(EngineError::InvalidBlueprint {
                id: blueprint.id().to_string(),
                issues,
            });
        }

        if blueprint.has_cycles() {
            tracing::warn!("⚠️ Blueprint '{}' contains a cycle", blueprint.id());
            return Err(EngineError::CycleDetected {
                id: blueprint.id().to_string(),
            });
        }

        ctx.set_status(ExecutionStatus::Running);

        let order = blueprint.execution_order();
        if order.is_empty() {
            tracing::warn!("⚠️ Blueprint '{}' has no connected nodes", blueprint.id());
            return Err(EngineError::NothingToExecute {
                id: blueprint.id().to_string(),
            });
        }
        tracing::debug!("📋 Execution order: {:?}", order);

        for node in blueprint.nodes_mut() {
            node.reset_io();
        }

        for (step, node_id) in order.iter().enumerate() {
            if ctx.has_timed_out() {
                ctx.set_status(ExecutionStatus::TimedOut);
                tracing::error!("⏰ Execution timed out after {:?} before node '{}'", ctx.elapsed(), node_id);
                return Err(EngineError::Timeout {
                    node_id: node_id.clone(),
                    elapsed: ctx.elapsed(),
                    limit: ctx.timeout(),
                });
            }

            let inputs = resolve_inputs(blueprint, ctx, node_id);
            let node = ordered_node(blueprint, node_id)?;
            node.set_inputs(inputs);

            tracing::info!("📍 Step {}/{}: executing {}", step + 1, order.len(), node);
            let result = node.execute(ctx).await.map_err(|source| {
                tracing::error!("❌ Node {} failed: {:#}", node, source);
                EngineError::NodeFailed {
                    node_id: node.id().to_string(),
                    node_name: node.name().to_string(),
                    source,
                }
            })?;

            if node.is_output_role() {
                if let Some(name) = node.output_name() {
                    if let Some(value) = result.get(&name) {
                        tracing::debug!("📤 Publishing '{}' from node '{}'", name, node_id);
                        ctx.set_global(name, value.clone());
                    }
                }
            }

            node.set_outputs(result.clone());
            ctx.set_node_result(node_id.clone(), result);
            tracing::debug!("✅ Node '{}' completed", node_id);
        }

        ctx.set_status(ExecutionStatus::Completed);
        let results = collect_sink_results(blueprint, ctx);
        tracing::info!(
            "✅ Blueprint '{}' completed in {:?} with {} result(s)",
            blueprint.id(),
            ctx.elapsed(),
            results.len()
        );
        Ok(results)
    }
}

/// Node scheduled by the execution order; validation guarantees it exists
fn ordered_node<'a>(blueprint: &'a mut Blueprint, node_id: &str) -> Result<&'a mut Node, EngineError> {
    let id = blueprint.id().to_string();
    blueprint.node_mut(node_id).ok_or_else(|| {
        tracing::error!("❌ Ordered node '{}' is missing from blueprint '{}'", node_id, id);
        EngineError::InvalidBlueprint {
            id,
            issues: vec![format!("ordered node '{node_id}' does not exist")],
        }
    })
}

/// Inputs of one node from its incoming connections in insertion order
///
/// Two connections into the same port leave the later one's value.
fn resolve_inputs(blueprint: &Blueprint, ctx: &ExecutionContext, node_id: &str) -> PortMap {
    let mut inputs = PortMap::new();
    for conn in blueprint.connections_to(node_id) {
        if let Some(upstream) = ctx.node_result(&conn.from_node) {
            tracing::debug!("🔗 {} -> {}.{}", conn.from_node, node_id, conn.to_port);
            inputs.insert(conn.to_port.clone(), extract_for_port(upstream, &conn.to_port));
        }
    }
    inputs
}

fn collect_sink_results(blueprint: &Blueprint, ctx: &ExecutionContext) -> PortMap {
    let mut results = PortMap::new();
    for sink in blueprint.sink_nodes() {
        let Some(result) = ctx.node_result(sink.id()) else {
            continue;
        };

        let named = sink.is_output_role().then(|| sink.output_name()).flatten();
        match named {
            Some(name) => {
                let value = result
                    .get(&name)
                    .cloned()
                    .unwrap_or_else(|| Value::Object(result.clone()));
                results.insert(name, value);
            }
            None => {
                results.insert(sink.name().to_string(), Value::Object(result.clone()));
            }
        }
    }
    results
}
