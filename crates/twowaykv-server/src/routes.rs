//! HTTP routes.
//!
//! | Method | Path               | Handler          |
//! |--------|--------------------|------------------|
//! | POST   | `/entries`         | [`post_entries`] |
//! | GET    | `/entries/random`  | [`random_entries`] |
//! | GET    | `/entries/search`  | [`search_entries`] |
//! | GET    | `/export`          | [`export`]       |
//! | GET    | `/health`          | [`health`]       |
//! | GET    | `/metrics`         | [`metrics`]      |
//!
//! Every route is wrapped by [`track_requests`], so `/metrics` also counts itself.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header;
use axum::middleware;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;
use twowaykv::{BatchCreator, BatchOutcome};

use crate::error::{Result, ServerError};
use crate::state::AppState;
use crate::telemetry::track_requests;

/// File name suggested for `GET /export` downloads.
pub const EXPORT_FILE_NAME: &str = "twowaykv_export.jsonl";

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/entries", post(post_entries))
        .route("/entries/random", get(random_entries))
        .route("/entries/search", get(search_entries))
        .route("/export", get(export))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route_layer(middleware::from_fn(track_requests))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

/// One item of a `POST /entries` body: a key to resolve or a value to look up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryRequest {
    /// Key to resolve, creating it if absent.
    #[serde(default)]
    pub key: Option<String>,
    /// Value to look up when no key is given.
    #[serde(default)]
    pub value: Option<u64>,
}

/// Query parameters of `POST /entries`.
#[derive(Debug, Deserialize)]
pub struct EntriesParams {
    /// Suppress `already exists` errors for existing keys.
    #[serde(default = "default_mute")]
    pub mute_already_exists: bool,
}

const fn default_mute() -> bool {
    true
}

/// Query parameters of `GET /entries/random`.
#[derive(Debug, Deserialize)]
pub struct RandomParams {
    /// Number of entries to sample.
    pub n: Option<usize>,
}

/// Query parameters of `GET /entries/search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Key prefix to match.
    #[serde(default)]
    pub prefix: String,
}

/// Resolve keys (creating missing ones) and look up values.
pub async fn post_entries(
    State(state): State<AppState>,
    params: std::result::Result<Query<EntriesParams>, QueryRejection>,
    body: std::result::Result<Json<Vec<EntryRequest>>, JsonRejection>,
) -> Result<Json<BatchOutcome>> {
    let Query(params) = params.map_err(|e| ServerError::bad_request(e.body_text()))?;
    let Json(requests) = body.map_err(|e| ServerError::bad_request(e.body_text()))?;

    if requests.is_empty() {
        return Err(ServerError::bad_request("Bad []entry or no entries passed"));
    }

    let mut keys = Vec::new();
    let mut values = Vec::new();
    for request in requests {
        match (request.key.filter(|k| !k.is_empty()), request.value.filter(|v| *v != 0)) {
            (Some(key), _) => keys.push(key),
            (None, Some(value)) => values.push(value),
            (None, None) => {
                return Err(ServerError::bad_request("Must provide valid key or value query string"))
            }
        }
    }

    debug!(keys = keys.len(), values = values.len(), "resolving entries");
    let mute = params.mute_already_exists;
    let outcome = state
        .blocking(move |index| {
            let mut outcome = index.create_if_absent(&keys, mute);
            if !values.is_empty() {
                let (entries, errors) = index.get_by_values(&values);
                outcome.entries.extend(entries);
                outcome.errors.extend(errors);
            }
            outcome
        })
        .await?;

    Ok(Json(outcome))
}

/// Return `n` random entries.
pub async fn random_entries(
    State(state): State<AppState>,
    params: std::result::Result<Query<RandomParams>, QueryRejection>,
) -> Result<Json<BatchOutcome>> {
    let Query(params) = params.map_err(|e| ServerError::bad_request(e.body_text()))?;
    let n = params.n.unwrap_or(0);

    let entries = state.blocking(move |index| index.sample(n)).await??;
    Ok(Json(BatchOutcome { entries, errors: Vec::new() }))
}

/// Return every entry whose key starts with `prefix`.
pub async fn search_entries(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<BatchOutcome>> {
    let Query(params) = params.map_err(|e| ServerError::bad_request(e.body_text()))?;

    let entries = state.blocking(move |index| index.search_by_prefix(&params.prefix)).await??;
    Ok(Json(BatchOutcome { entries, errors: Vec::new() }))
}

/// Return the JSON-lines export as a download.
///
/// The export is assembled in memory before the response is sent.
pub async fn export(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let body = state
        .blocking(|index| {
            let mut buffer = Vec::new();
            index.export_jsonl(&mut buffer).map(|_| buffer)
        })
        .await??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/x-ndjson".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{EXPORT_FILE_NAME}\"")),
        ],
        body,
    ))
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` when the server answers.
    pub status: String,
    /// Server version.
    pub version: String,
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string(), version: env!("CARGO_PKG_VERSION").to_string() })
}

/// Prometheus text exposition of the request metrics.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics().render(),
    )
}
