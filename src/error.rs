use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("provider unavailable: {0}")]
    Provider(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for TrackError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            TrackError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            TrackError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            TrackError::Provider(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            TrackError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
