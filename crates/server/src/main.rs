//! Arclight server binary.
//!
//! Opens the ledger database, spawns the channel-fed ingest loop (the
//! upstream network client hands sealed-ledger blobs to the sender half),
//! and serves the JSON-RPC endpoint until Ctrl-C or SIGTERM.
//!
//! # Usage
//!
//! ```bash
//! arclight --listen 0.0.0.0:8000 --data /var/lib/arclight
//!
//! ARCLIGHT_DATA=/var/lib/arclight ARCLIGHT_RETENTION_WINDOW=17280 arclight
//! ```

use std::io::IsTerminal;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use arclight_server::config::{Config, LogFormat};
use arclight_server::{AppState, build_router, ingest_loop, shutdown};
use arclight_storage::{Ingestor, LatestLedgerCache, LedgerReader, StorageEngine, TransactionReader};

/// Top-level error type for the server binary.
#[derive(Debug)]
enum ServerError {
    Config(arclight_server::config::ConfigError),
    Store(arclight_storage::StoreError),
    Server(std::io::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Config(e) => write!(f, "config error: {e}"),
            ServerError::Store(e) => write!(f, "store error: {e}"),
            ServerError::Server(e) => write!(f, "server error: {e}"),
        }
    }
}

impl std::error::Error for ServerError {}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config = Config::parse();
    config.validate().map_err(ServerError::Config)?;

    init_logging(&config);

    if let Some(metrics_addr) = config.metrics {
        init_metrics_exporter(metrics_addr)?;
    }

    std::fs::create_dir_all(&config.data).map_err(ServerError::Server)?;
    let db_path = config.db_path();
    tracing::info!(
        listen_addr = %config.listen,
        db_path = %db_path.display(),
        retention_window = config.retention_window,
        "Starting Arclight"
    );

    let engine = StorageEngine::open(&db_path).map_err(ServerError::Store)?;
    let cache = Arc::new(LatestLedgerCache::load(&engine).map_err(ServerError::Store)?);
    if cache.get().sequence != 0 {
        tracing::info!(latest = cache.get().sequence, "Resuming from existing ledger store");
    }

    let ingestor = Arc::new(Ingestor::new(engine.clone(), Arc::clone(&cache)));
    let (ledger_feed, feed_rx) = tokio::sync::mpsc::channel::<Vec<u8>>(64);
    let ingest_task =
        tokio::spawn(ingest_loop::run(feed_rx, ingestor, config.retention_window));
    // The network ingestion client attaches here; it outlives the server.
    let _ledger_feed = ledger_feed;

    let state = AppState {
        ledgers: Arc::new(LedgerReader::new(engine.clone(), Arc::clone(&cache))),
        transactions: Arc::new(TransactionReader::new(engine)),
    };
    let router = build_router(state);

    let listener =
        tokio::net::TcpListener::bind(config.listen).await.map_err(ServerError::Server)?;
    tracing::info!("Server ready, accepting connections");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await
        .map_err(ServerError::Server)?;

    drop(_ledger_feed);
    let _ = ingest_task.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the logging system based on configuration.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match config.log_format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stdout().is_terminal(),
    };

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init();
    } else {
        tracing_subscriber::registry().with(env_filter).with(fmt::layer()).init();
    }
}

/// Starts the Prometheus exporter serving `/metrics` on its own listener.
fn init_metrics_exporter(addr: SocketAddr) -> Result<(), ServerError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ServerError::Server(std::io::Error::other(e)))?;
    tracing::info!(metrics_addr = %addr, "Prometheus metrics exporter started");
    Ok(())
}
