//! Registry Node
//!
//! Write-once registry of content hashes. Each hash is recorded at most once,
//! attributed to a reporter and stamped with block time. Accounts holding the
//! relayer role may register on behalf of other reporters; admins manage
//! roles.
//!
//! ## Endpoints
//!
//! - `POST /api/registrations` - Register a hash for the caller
//! - `POST /api/registrations/relayed` - Register on behalf of a reporter
//! - `GET /api/registrations/{hash}` - Registration details
//! - `GET /api/registrations/{hash}/exists` - Existence check
//! - `GET /api/events?from=&limit=` - `HashRegistered` log in commit order
//! - `GET /api/roles/{role}` - Role members
//! - `GET|PUT|DELETE /api/roles/{role}/{account}` - Query, grant, revoke
//! - `GET /health` - Health check
//!
//! State-changing calls name their caller in the `x-caller-address` header.

pub mod config;
pub mod handlers;
pub mod ledger;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{Config, StorageBackend};
pub use handlers::{AppState, CALLER_HEADER};
pub use ledger::{Clock, FixedClock, Registry, SystemClock};
pub use storage::{MemoryStore, RedisStore, RegistrationStore};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/registrations", post(handlers::register_handler))
        .route(
            "/api/registrations/relayed",
            post(handlers::register_by_relayer_handler),
        )
        .route(
            "/api/registrations/{hash}",
            get(handlers::get_registration_handler),
        )
        .route(
            "/api/registrations/{hash}/exists",
            get(handlers::exists_handler),
        )
        .route("/api/events", get(handlers::list_events_handler))
        .route("/api/roles/{role}", get(handlers::list_role_members_handler))
        .route(
            "/api/roles/{role}/{account}",
            get(handlers::has_role_handler)
                .put(handlers::grant_role_handler)
                .delete(handlers::revoke_role_handler),
        )
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
