//! API gateway binary.
//!
//! Startup order: logging, configuration, cache store, listener. Shutdown
//! order: stop accepting, drain in-flight forwards, release the cache
//! connection. Exit code 0 on clean shutdown, 1 otherwise.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;

use api_gateway::cache::CacheStore;
use api_gateway::http::GatewayServer;
use api_gateway::lifecycle::{signals, Shutdown};
use api_gateway::observability::{logging, metrics};
use api_gateway::{config, GatewayConfig};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gateway starting");

    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    error = %e,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Gateway terminated with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cache = Arc::new(CacheStore::new(&config.cache.url)?);
    cache.connect().await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(&config, cache.clone(), &shutdown)?;

    let server_rx = shutdown.subscribe();
    let server_task = tokio::spawn(async move { server.run(listener, server_rx).await });

    signals::wait_for_terminate().await;
    shutdown.trigger();

    server_task.await??;

    // In-flight requests have drained; the cache close cannot race a probe.
    cache.close().await?;

    Ok(())
}
