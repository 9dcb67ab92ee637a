//! Shared handler state.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use twowaykv::BidirectionalIndex;

use crate::error::{Result, ServerError};
use crate::telemetry;

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    index: Arc<BidirectionalIndex>,
    metrics: PrometheusHandle,
}

impl AppState {
    /// Wrap an open index, installing the metrics recorder on first use.
    pub fn new(index: BidirectionalIndex) -> Self {
        Self { index: Arc::new(index), metrics: telemetry::handle() }
    }

    /// The shared index.
    pub fn index(&self) -> &Arc<BidirectionalIndex> {
        &self.index
    }

    /// Renders the Prometheus exposition for `GET /metrics`.
    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    /// Run `f` against the index on the blocking thread pool.
    ///
    /// Index calls block on storage I/O and must stay off the async workers.
    pub async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&BidirectionalIndex) -> T + Send + 'static,
        T: Send + 'static,
    {
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || f(&index))
            .await
            .map_err(|e| ServerError::internal(format!("index task failed: {e}")))
    }
}
