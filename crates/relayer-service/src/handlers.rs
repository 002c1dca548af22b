//! API request handlers for the relayer

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use provenance_common::{payload_hash, Address, ContentHash, Error, Registration};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::submitter::Submission;
use crate::AppState;

pub const MOCK_NOTE: &str = "Relayer running in mock mode (no tx sent)";

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn validation(message: impl Into<String>) -> Self {
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
            Error::TransientChain(_) => {
                warn!("Relayer chain error: {}", err);
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::Serialization(_) | Error::Internal(_) => {
                error!("Relayer error: {:#}", err);
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

/// Response from `/submit`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<ContentHash>,
    pub hash: ContentHash,
}

/// Response from `/verify`
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub ok: bool,
    pub hash: ContentHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<Registration>,
}

fn request_body(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::validation(format!("Invalid JSON body: {}", e)))?;
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::validation("Invalid body: must be an object")),
    }
}

fn payload_object(body: &Map<String, Value>) -> Result<&Map<String, Value>, ApiError> {
    match body.get("payload") {
        Some(Value::Object(payload)) => Ok(payload),
        _ => Err(ApiError::validation("Invalid payload: must be an object")),
    }
}

fn reporter_address(body: &Map<String, Value>) -> Result<Address, ApiError> {
    let invalid = || {
        ApiError::validation("Invalid reporter: must be a valid non-zero Ethereum address")
    };

    let raw = body.get("reporter").and_then(Value::as_str).ok_or_else(invalid)?;
    match Address::parse(raw) {
        Ok(address) if !address.is_zero() => Ok(address),
        _ => Err(invalid()),
    }
}

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "relayer-service",
        "mode": state.submitter.mode()
    }))
}

/// Hash a payload and register it on behalf of the reporter
pub async fn submit_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let body = request_body(body)?;
    let payload = payload_object(&body)?;
    let reporter = reporter_address(&body)?;

    let payload = Value::Object(payload.clone());
    let hash = payload_hash(&payload);
    let ipfs_cid = payload
        .get("ipfsCid")
        .and_then(Value::as_str)
        .unwrap_or_default();

    info!("Submitting {} for reporter {}", hash, reporter);

    let response = match state.submitter.submit(hash, reporter, ipfs_cid).await? {
        Submission::Mock => SubmitResponse {
            ok: true,
            note: Some(MOCK_NOTE.to_string()),
            tx_hash: None,
            hash,
        },
        Submission::Committed { tx_hash } => SubmitResponse {
            ok: true,
            note: None,
            tx_hash: Some(tx_hash),
            hash,
        },
    };

    Ok(Json(response))
}

/// Hash a payload and report whether it is registered
pub async fn verify_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let body = request_body(body)?;
    let payload = Value::Object(payload_object(&body)?.clone());
    let hash = payload_hash(&payload);

    if state.submitter.mode() == crate::SubmitterMode::Mock {
        return Ok(Json(VerifyResponse {
            ok: true,
            hash,
            note: Some(MOCK_NOTE.to_string()),
            registered: None,
            registration: None,
        }));
    }

    let registration = state.submitter.lookup(&hash).await?;

    Ok(Json(VerifyResponse {
        ok: true,
        hash,
        note: None,
        registered: Some(registration.is_some()),
        registration,
    }))
}
