//! Relayer Service
//!
//! Lets reporters record payloads without paying for transactions. The
//! relayer hashes the canonical JSON of a payload and registers the hash on
//! the reporter's behalf using its own relayer account.
//!
//! ## Endpoints
//!
//! - `POST /submit` - `{payload, reporter}`, register the payload hash
//! - `POST /verify` - `{payload}`, look up the payload hash
//! - `GET /health` - Health check (reports live/mock mode)
//!
//! Without registry credentials the relayer runs in mock mode and only
//! returns the computed hash.

pub mod config;
pub mod handlers;
pub mod registry_client;
pub mod submitter;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::Config;
pub use registry_client::RegistryClient;
pub use submitter::{
    submitter_from_config, LiveSubmitter, MockSubmitter, Submission, Submitter, SubmitterMode,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub submitter: Arc<dyn Submitter>,
}

impl AppState {
    pub fn new(submitter: Arc<dyn Submitter>) -> Self {
        Self { submitter }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/submit", post(handlers::submit_handler))
        .route("/verify", post(handlers::verify_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
