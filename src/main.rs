//! Foreman engine entry point.
//!
//! Runs the engine headless with the built-in handler set until ctrl-c.
//! Transports and domain handlers are wired in by embedders through the
//! library API.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use foreman::application::Engine;
use foreman::cli::Cli;
use foreman::domain::ports::NullMetricSource;
use foreman::infrastructure::config::ConfigLoader;
use foreman::infrastructure::logging;
use foreman::services::{EchoHandler, HandlerRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    if let Some(workers) = cli.workers {
        config.worker_count = workers;
    }

    logging::init(&config.logging);

    let mut registry = HandlerRegistry::new();
    registry.register("echo", Arc::new(EchoHandler));

    let mut engine = Engine::new(config, registry, Arc::new(NullMetricSource));
    engine.start().await?;

    tokio::signal::ctrl_c().await?;

    engine.stop().await?;
    let stats = engine.stats().await;
    tracing::info!(
        tasks_processed = stats.tasks_processed,
        tasks_failed = stats.tasks_failed,
        "Engine exited"
    );

    Ok(())
}
