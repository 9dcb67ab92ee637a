//! Prometheus request metrics.
//!
//! Every routed request increments [`REQUESTS_TOTAL`] and records its latency in
//! [`REQUEST_DURATION`], labelled by method, matched route and status. The
//! recorder is installed process-wide on first use and rendered by `GET /metrics`.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

/// Counter of handled HTTP requests.
pub const REQUESTS_TOTAL: &str = "twowaykv_http_requests_total";

/// Histogram of request latency in seconds.
pub const REQUEST_DURATION: &str = "twowaykv_http_request_duration_seconds";

/// Latency buckets in seconds, from sub-millisecond lookups to slow exports.
pub const LATENCY_BUCKETS: &[f64] =
    &[0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// How often histogram buffers are drained between scrapes.
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

static HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Handle to the process-wide Prometheus recorder, installing it if needed.
///
/// If another recorder already owns the global slot, the returned handle renders
/// a detached recorder and `/metrics` stays empty.
pub fn handle() -> PrometheusHandle {
    let mut slot = HANDLE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(handle) = slot.as_ref() {
        return handle.clone();
    }

    let handle = match builder().install_recorder() {
        Ok(handle) => {
            info!("installed Prometheus recorder");
            handle
        }
        Err(e) => {
            warn!(error = %e, "failed to install Prometheus recorder");
            builder().build_recorder().handle()
        }
    };
    *slot = Some(handle.clone());
    handle
}

fn builder() -> PrometheusBuilder {
    match PrometheusBuilder::new().set_buckets(LATENCY_BUCKETS) {
        Ok(builder) => builder,
        Err(e) => {
            warn!(error = %e, "invalid latency buckets, using summaries");
            PrometheusBuilder::new()
        }
    }
}

/// Drain the recorder periodically so long gaps between scrapes stay bounded.
pub fn spawn_upkeep(handle: PrometheusHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPKEEP_INTERVAL);
        loop {
            interval.tick().await;
            handle.run_upkeep();
        }
    })
}

/// Middleware recording [`REQUESTS_TOTAL`] and [`REQUEST_DURATION`].
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_owned(), |p| p.as_str().to_owned());
    let method = request.method().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(REQUEST_DURATION, "method" => method, "path" => path)
        .record(start.elapsed().as_secs_f64());

    response
}
