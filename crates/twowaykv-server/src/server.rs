//! HTTP server setup.

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use twowaykv::BidirectionalIndex;

use crate::config::ServerConfig;
use crate::routes::build_router;
use crate::state::AppState;
use crate::telemetry;

/// Open the index and serve HTTP until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the index cannot be opened or the address cannot be bound.
pub async fn run(config: ServerConfig) -> Result<()> {
    let index = BidirectionalIndex::open_with_config(config.index_config())
        .with_context(|| format!("could not open index at {}", config.data_dir.display()))?;
    info!(data_dir = %config.data_dir.display(), "opened index");

    let state = AppState::new(index);
    let app = build_router(state.clone());
    let upkeep = telemetry::spawn_upkeep(state.metrics().clone());

    let addr = config.addr();
    let listener =
        TcpListener::bind(&addr).await.with_context(|| format!("could not bind {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("shutting down");
    upkeep.abort();
    state.index().flush()?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
