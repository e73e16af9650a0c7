//! Hub-local error type: maps dispatcher outcomes and HTTP input problems
//! onto the status codes in spec §6/§7.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use beacon_core::BeaconError;
use beacon_protocol::CodecError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    /// Missing agent id, unreadable body, empty `command` (HTTP 400).
    #[error("{0}")]
    BadRequest(String),
    /// Missing/empty bearer token (HTTP 401).
    #[error("unauthenticated")]
    Unauthenticated,
    /// Unknown agent id (HTTP 404).
    #[error("{0}")]
    NotFound(String),
    /// Agent offline or disconnected mid-flight (HTTP 503).
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Hub-side RPC deadline elapsed (HTTP 504).
    #[error("{0}")]
    GatewayTimeout(String),
    /// Decode failure or envelope-level error (HTTP 500).
    #[error("{0}")]
    Internal(String),
}

impl HubError {
    /// Translates a [`BeaconError`] returned by `Session::send_and_wait`
    /// per spec §4.5 step 5: `ctx` deadline → `GatewayTimeout`,
    /// `Disconnected` → `ServiceUnavailable`, anything else → `Internal`.
    pub fn from_session_error(err: BeaconError) -> Self {
        match err {
            BeaconError::Timeout { kind } => HubError::GatewayTimeout(format!("{kind} elapsed")),
            BeaconError::Transport(msg) => HubError::ServiceUnavailable(msg),
            BeaconError::NotFound(msg) => HubError::NotFound(msg),
            BeaconError::Validation(msg) | BeaconError::PolicyLimit(msg) | BeaconError::Internal(msg) => {
                HubError::Internal(msg)
            }
        }
    }
}

impl From<CodecError> for HubError {
    fn from(err: CodecError) -> Self {
        HubError::Internal(err.to_string())
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            HubError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            HubError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated".to_string()),
            HubError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            HubError::ServiceUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
            HubError::GatewayTimeout(m) => (StatusCode::GATEWAY_TIMEOUT, m.clone()),
            HubError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
