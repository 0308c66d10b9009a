/// Blueprint runner: logging bootstrap and one-shot execution helpers
///
/// Used by the `blueprint-run` binary to load a JSON blueprint definition (or
/// the built-in demo), run it once and hand back the sink results.

use crate::blueprint::{Blueprint, BlueprintDefinition, NodeRegistry};
use crate::blueprint::types::PortMap;
use crate::config::{Config, LoggingConfig};
use crate::nodes;
use crate::runtime::Engine;
use anyhow::{Context, Result};
use std::path::Path;

/// Install the global fmt subscriber
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(logging.max_level())
        .with_target(logging.with_target)
        .with_thread_ids(true)
        .with_level(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}

/// Read and build a blueprint from a JSON definition file
pub async fn load_blueprint(path: &Path, registry: &NodeRegistry) -> Result<Blueprint> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read blueprint file {}", path.display()))?;

    let blueprint = BlueprintDefinition::from_json(&json)?.into_blueprint(registry)?;
    tracing::info!("📂 Loaded {} from {}", blueprint, path.display());
    Ok(blueprint)
}

/// Input "hello world" → uppercase → filter "length > 5" → output
pub fn demo_blueprint() -> Blueprint {
    let mut blueprint = Blueprint::with_id("demo", "Demo pipeline");
    blueprint.set_description("Uppercases a greeting and keeps it when it is long enough");

    blueprint.add_node(nodes::input("input", "Greeting", "hello world"));
    blueprint.add_node(nodes::transform("upper", "Uppercase", "uppercase"));
    blueprint.add_node(nodes::filter("long", "Long enough", "length > 5"));
    blueprint.add_node(nodes::output("output", "Result"));

    blueprint.connect("input", "upper");
    blueprint.connect("upper", "long");
    blueprint.connect("long", "output");
    blueprint
}

/// Run a blueprint file, or the demo when no path is given
pub async fn run(path: Option<&Path>, config: &Config) -> Result<PortMap> {
    let registry = NodeRegistry::with_builtins();
    let mut blueprint = match path {
        Some(path) => load_blueprint(path, &registry).await?,
        None => {
            tracing::info!("🧪 No blueprint file given, running the demo pipeline");
            demo_blueprint()
        }
    };

    let engine = Engine::from_config(&config.engine);
    let results = engine
        .execute(&mut blueprint)
        .await
        .with_context(|| format!("Execution of blueprint '{}' failed", blueprint.id()))?;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use serde_json::json;

    #[tokio::test]
    async fn demo_pipeline_reports_uppercased_greeting() {
        let config = Config {
            engine: EngineConfig { timeout_ms: 30_000 },
            logging: LoggingConfig::default(),
        };
        let results = run(None, &config).await.unwrap();
        assert_eq!(results.get("result"), Some(&json!("HELLO WORLD")));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let registry = NodeRegistry::with_builtins();
        let err = load_blueprint(Path::new("/nonexistent/blueprint.json"), &registry)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read blueprint file"));
    }
}
