//! Concept Graph server binary.
//!
//! # Usage
//!
//! ```bash
//! # Defaults, layered with config/default.toml and CONCEPT_GRAPH__* variables
//! concept-graph-server
//!
//! # Explicit config file
//! concept-graph-server --config /etc/concept-graph.toml
//!
//! # Override listener and data directory
//! concept-graph-server --bind 0.0.0.0 --port 7420 --data-dir /var/lib/concept-graph
//!
//! # Debug logging
//! RUST_LOG=debug concept-graph-server
//! ```
//!
//! # Priority
//!
//! CLI arguments > environment variables > config file > defaults

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use concept_graph_core::Config;
use concept_graph_graph::KnowledgeEngine;
use concept_graph_server::Server;
use concept_graph_storage::spawn_reconciler;

/// Persistent knowledge graph server
#[derive(Parser, Debug)]
#[command(name = "concept-graph-server")]
#[command(version)]
#[command(about = "Persistent knowledge graph server with vector search and multi-hop reasoning")]
struct Cli {
    /// Configuration file (TOML). Without it, config/default.toml and
    /// CONCEPT_GRAPH__* environment variables are used.
    #[arg(long, env = "CONCEPT_GRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address override
    #[arg(long)]
    bind: Option<String>,

    /// TCP port override
    #[arg(long)]
    port: Option<u16>,

    /// Data directory override
    #[arg(long)]
    data_dir: Option<String>,
}

/// Apply CLI overrides to config. Called before validation.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(ref bind) = cli.bind {
        config.server.bind_address = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref dir) = cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::load().context("loading configuration")?,
    };
    apply_overrides(&mut config, &cli);
    config.validate()?;

    // Logs go to stderr; RUST_LOG wins over logging.level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Concept graph server starting...");
    info!(
        "Configuration: data_dir={}, dimension={}, cache_enabled={}",
        config.storage.data_dir, config.index.dimension, config.cache.enabled
    );
    if cli.bind.is_some() || cli.port.is_some() || cli.data_dir.is_some() {
        info!("CLI overrides applied: {:?}", cli);
    }

    let reconcile_interval = Duration::from_millis(config.storage.reconcile_interval_ms);
    let server_config = config.server.clone();
    let engine = Arc::new(
        tokio::task::spawn_blocking(move || KnowledgeEngine::open(config))
            .await
            .context("engine startup task failed")??,
    );

    let reconciler = spawn_reconciler(Arc::clone(engine.store()), reconcile_interval);

    let server = Server::bind(server_config, engine).await?;
    server.run_until(shutdown_signal()).await?;

    reconciler
        .shutdown()
        .await
        .context("final reconciliation failed")?;
    info!("Concept graph server shutdown complete");
    Ok(())
}
