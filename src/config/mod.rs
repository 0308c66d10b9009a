/// Configuration management for the blueprint engine
///
/// Handles the engine's run timeout and logging setup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine run parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Run timeout in milliseconds, checked between node executions
    pub timeout_ms: u64,
}

/// Tracing subscriber settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    /// Include the event target (module path) in log lines
    pub with_target: bool,
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for EngineConfig {
    /// Reads BLUEPRINT_TIMEOUT_MS, falling back to 30 seconds
    fn default() -> Self {
        Self {
            timeout_ms: std::env::var("BLUEPRINT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl Default for LoggingConfig {
    /// Reads BLUEPRINT_LOG_LEVEL and BLUEPRINT_LOG_TARGET
    fn default() -> Self {
        Self {
            level: std::env::var("BLUEPRINT_LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            with_target: std::env::var("BLUEPRINT_LOG_TARGET")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

impl LoggingConfig {
    /// Parsed level; unknown names fall back to INFO
    pub fn max_level(&self) -> tracing::Level {
        self.level.trim().parse().unwrap_or(tracing::Level::INFO)
    }
}
