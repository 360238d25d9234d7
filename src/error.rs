use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::aggregate::AggregateError;
use crate::spotify::UpstreamError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No session, or a session without an access token.
    #[error("Not authenticated")]
    Unauthenticated,
    /// Spotify answered with a non-2xx status (or `status` 0: no usable answer).
    #[error("{message}")]
    Upstream { status: u16, message: String },
    #[error("{0}")]
    InsufficientData(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            AppError::InsufficientData(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UpstreamError> for AppError {
    fn from(e: UpstreamError) -> Self {
        AppError::Upstream { status: e.status, message: e.message }
    }
}

impl From<AggregateError> for AppError {
    fn from(e: AggregateError) -> Self {
        match e {
            AggregateError::InsufficientData(msg) => AppError::InsufficientData(msg),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("session encoding failed: {}", e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Upstream { status: upstream, message } => {
                warn!(upstream_status = upstream, %message, "upstream request failed")
            }
            AppError::Internal(msg) => error!(%msg, "internal error"),
            _ => {}
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
