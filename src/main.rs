//! Management API server entry point.
//!
//! Loads configuration, initializes observability and serves the API until
//! interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use management_api::config::{load_config, ApiConfig};
use management_api::http::HttpServer;
use management_api::jobs::LoggingPublisher;
use management_api::observability::metrics;
use management_api::storage::InMemoryStore;

#[derive(Debug, Parser)]
#[command(name = "management-api", about = "Management API server")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind address from the config.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "management_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ApiConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_path = %config.api.base_path,
        poll_interval_secs = config.broadcast.poll_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let store = Arc::new(InMemoryStore::new());
    let server = HttpServer::new(config, store, Arc::new(LoggingPublisher))?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
