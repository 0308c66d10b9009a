/// blueprint-run: execute a blueprint definition once
///
/// Usage: `blueprint-run [FILE]`
///
/// Loads the JSON blueprint definition at FILE (or the built-in demo pipeline
/// when no file is given), executes it and prints the sink results as JSON.

use blueprint_engine::{config::Config, runner};
use std::path::PathBuf;

/// Application entry point
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from BLUEPRINT_* environment variables
    let config = Config::default();
    runner::init_tracing(&config.logging)?;

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let results = runner::run(path.as_deref(), &config).await?;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
