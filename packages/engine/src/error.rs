//! Engine errors and the JSON error body returned by HTTP handlers.

use std::net::SocketAddr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Errors raised while configuring, starting, or querying a [`Service`](crate::Service).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A configuration property is missing or cannot be parsed.
    #[error("invalid configuration property {key:?}: {reason}")]
    Config { key: String, reason: String },

    /// The configured address could not be bound. Never retried.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The server thread failed before it became ready.
    #[error("service failed to start: {0}")]
    Startup(String),

    /// The service does not currently hold a port.
    #[error("service is not running")]
    NotRunning,
}

/// The JSON body returned for all error responses.
///
/// ```json
/// { "error": "missing bearer token", "code": "unauthorized" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human-readable description of the problem.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            error: error.into(),
        }
    }
}

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Unauthorized(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
        };
        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
