//! OS signal handling.
//!
//! Translates SIGTERM/SIGINT into the internal shutdown broadcast.

/// Wait until the process receives a termination signal.
#[cfg(unix)]
pub async fn wait_for_terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM received, shutting down gracefully");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
            tracing::info!("Interrupt received, shutting down gracefully");
        }
    }
}

#[cfg(not(unix))]
pub async fn wait_for_terminate() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Interrupt received, shutting down gracefully");
}
