//! Chat analytics ingestion service.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /ingest ──▶ http server ──▶ Service::submit ──▶ bounded queue
//!                                                              │
//!                                            ┌─────────────────┼─────────────────┐
//!                                            ▼                 ▼                 ▼
//!                                        worker 0          worker 1   ...   worker N-1
//!                                            │
//!                                            ├──▶ circuit breaker ──▶ sentiment analyzer
//!                                            └──▶ sink (retry + backoff)
//!
//!     GET /metrics, GET /health ◀── metrics aggregator + breaker state
//! ```
//!
//! Shutdown order on SIGINT/SIGTERM: stop accepting HTTP, cancel workers,
//! wait for in-flight messages, close the queue.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use chat_analytics::config::{load_config, AppConfig};
use chat_analytics::http::HttpServer;
use chat_analytics::lifecycle::shutdown_signal;
use chat_analytics::observability::{logging, metrics};
use chat_analytics::pipeline::Service;

#[derive(Parser)]
#[command(name = "chat-analytics")]
#[command(about = "Chat message ingestion and enrichment service", long_about = None)]
struct Args {
    /// Path to a TOML config file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init(&config.observability.log_level);

    tracing::info!("chat-analytics v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        workers = config.pipeline.worker_count,
        queue_capacity = config.pipeline.queue_capacity,
        failure_threshold = config.circuit_breaker.failure_threshold,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let service = Arc::new(Service::from_config(&config));
    service.start()?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config, service.clone());
    server.run(listener, shutdown_signal()).await?;

    let grace = Duration::from_secs(config.timeouts.shutdown_secs);
    if tokio::time::timeout(grace, service.shutdown()).await.is_err() {
        tracing::warn!(
            timeout_secs = config.timeouts.shutdown_secs,
            "Worker pool did not stop within the shutdown timeout"
        );
    }

    Ok(())
}
