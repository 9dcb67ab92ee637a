//! HTTP server for twowaykv.
//!
//! This crate exposes a [`BidirectionalIndex`](twowaykv::BidirectionalIndex) over
//! JSON/HTTP and hosts the `twowaykv` binary.
//!
//! # Modules
//!
//! - [`config`] - Server settings and port resolution
//! - [`error`] - Error to HTTP status mapping
//! - [`routes`] - Router and request handlers
//! - [`server`] - Listener setup and shutdown
//! - [`state`] - Shared handler state
//! - [`telemetry`] - Prometheus request metrics

#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ErrorResponse, ServerError};
pub use routes::build_router;
pub use state::AppState;
