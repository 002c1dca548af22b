//! API request handlers for the registry node

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use provenance_common::{Address, ContentHash, Error, Receipt, Registration, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::ledger::Registry;

/// Header carrying the account a call is made from
pub const CALLER_HEADER: &str = "x-caller-address";

const DEFAULT_EVENTS_LIMIT: usize = 100;
const MAX_EVENTS_LIMIT: usize = 1000;

/// Shared application state
pub struct AppState {
    pub registry: Registry,
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "ok": false,
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized { .. } => StatusCode::FORBIDDEN,
            Error::AlreadyRegistered(_) => StatusCode::CONFLICT,
            Error::TransientChain(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Serialization(_) | Error::Internal(_) => {
                error!("Registry error: {:#}", err);
                return ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal server error".to_string(),
                };
            }
        };

        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

/// The calling account, taken from [`CALLER_HEADER`]
pub struct Caller(pub Address);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| ApiError::bad_request(format!("missing {} header", CALLER_HEADER)))?
            .to_str()
            .map_err(|_| ApiError::bad_request(format!("invalid {} header", CALLER_HEADER)))?;

        let address = Address::parse(value)?;
        if address.is_zero() {
            return Err(ApiError::bad_request("caller cannot be the zero address"));
        }
        Ok(Caller(address))
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))
}

fn parse_hash(raw: &str) -> Result<ContentHash, ApiError> {
    Ok(ContentHash::from_hex(raw)?)
}

fn parse_role_path(role: &str, account: &str) -> Result<(Role, Address), ApiError> {
    Ok((role.parse()?, Address::parse(account)?))
}

/// Request to register a hash for the caller
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub hash: ContentHash,
    #[serde(default)]
    pub ipfs_cid: String,
}

/// Request to register a hash on behalf of a reporter
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayedRegisterRequest {
    pub hash: ContentHash,
    pub reporter: Address,
    #[serde(default)]
    pub ipfs_cid: String,
}

/// Response from a committed registration
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub receipt: Receipt,
}

/// Registration details; zero-valued when `exists` is false
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub hash: ContentHash,
    pub exists: bool,
    #[serde(flatten)]
    pub registration: Registration,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub hash: ContentHash,
    pub registered: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    pub role: Role,
    pub account: Address,
    pub has_role: bool,
}

#[derive(Debug, Serialize)]
pub struct RoleChangeResponse {
    pub ok: bool,
    pub role: Role,
    pub account: Address,
    /// False when the call left the permission set as it was
    pub changed: bool,
}

/// Query for `GET /api/events`
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// First sequence number to return
    #[serde(default)]
    pub from: Option<u64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<Receipt>,
    /// Sequence number to pass as `from` for the next page
    pub next: u64,
}

#[derive(Debug, Serialize)]
pub struct RoleMembersResponse {
    pub role: Role,
    pub members: Vec<Address>,
    pub total: usize,
}

/// Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "registry-node",
        "storage": state.registry.backend()
    }))
}

/// Register a hash attributed to the caller
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let payload = json_body(body)?;
    info!("register {} from {}", payload.hash, caller);

    let receipt = state
        .registry
        .register(&caller, payload.hash, &payload.ipfs_cid)
        .await?;

    Ok(Json(RegisterResponse { ok: true, receipt }))
}

/// Register a hash on behalf of a reporter (relayers only)
pub async fn register_by_relayer_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    body: Result<Json<RelayedRegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let payload = json_body(body)?;
    info!(
        "registerByRelayer {} for {} from {}",
        payload.hash, payload.reporter, caller
    );

    let receipt = state
        .registry
        .register_by_relayer(&caller, payload.hash, &payload.reporter, &payload.ipfs_cid)
        .await?;

    Ok(Json(RegisterResponse { ok: true, receipt }))
}

/// Get registration details by hash
pub async fn get_registration_handler(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    let hash = parse_hash(&hash)?;
    let registration = state.registry.registration(&hash).await?;

    Ok(Json(RegistrationResponse {
        hash,
        exists: registration.exists(),
        registration,
    }))
}

/// Check whether a hash is registered
pub async fn exists_handler(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Json<ExistsResponse>, ApiError> {
    let hash = parse_hash(&hash)?;
    let registered = state.registry.is_registered(&hash).await?;

    Ok(Json(ExistsResponse { hash, registered }))
}

/// Page through `HashRegistered` events in commit order
pub async fn list_events_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> Result<Json<EventsResponse>, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::bad_request(format!("Invalid query: {}", e.body_text())))?;
    let from = query.from.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENTS_LIMIT)
        .min(MAX_EVENTS_LIMIT);

    let events = state.registry.events(from, limit).await?;
    let next = events.last().map_or(from, |receipt| receipt.sequence + 1);

    Ok(Json(EventsResponse { events, next }))
}

/// List members of a role
pub async fn list_role_members_handler(
    State(state): State<Arc<AppState>>,
    Path(role): Path<String>,
) -> Result<Json<RoleMembersResponse>, ApiError> {
    let role: Role = role.parse()?;
    let members = state.registry.role_members(role).await?;
    let total = members.len();

    Ok(Json(RoleMembersResponse {
        role,
        members,
        total,
    }))
}

pub async fn has_role_handler(
    State(state): State<Arc<AppState>>,
    Path((role, account)): Path<(String, String)>,
) -> Result<Json<RoleResponse>, ApiError> {
    let (role, account) = parse_role_path(&role, &account)?;
    let has_role = state.registry.has_role(role, &account).await?;

    Ok(Json(RoleResponse {
        role,
        account,
        has_role,
    }))
}

/// Grant a role (admins only)
pub async fn grant_role_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path((role, account)): Path<(String, String)>,
) -> Result<Json<RoleChangeResponse>, ApiError> {
    let (role, account) = parse_role_path(&role, &account)?;
    let changed = state.registry.grant_role(&caller, role, &account).await?;

    Ok(Json(RoleChangeResponse {
        ok: true,
        role,
        account,
        changed,
    }))
}

/// Revoke a role (admins only)
pub async fn revoke_role_handler(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path((role, account)): Path<(String, String)>,
) -> Result<Json<RoleChangeResponse>, ApiError> {
    let (role, account) = parse_role_path(&role, &account)?;
    let changed = state.registry.revoke_role(&caller, role, &account).await?;

    Ok(Json(RoleChangeResponse {
        ok: true,
        role,
        account,
        changed,
    }))
}
