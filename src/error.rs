use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Backend API error: {0}")]
    Backend(String),

    #[error("Maps API error: {0}")]
    MapsApi(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A user-initiated write failed; the message is shown to the user as is
    #[error("{message}")]
    UserFacing { message: String, cause: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn user_facing(message: &str, cause: impl std::fmt::Display) -> Self {
        AppError::UserFacing {
            message: message.to_string(),
            cause: cause.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Backend(format!("Request failed: {}", e))
    }
}

// Convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Backend(ref e) => {
                tracing::error!("Backend API error: {}", e);
                (StatusCode::BAD_GATEWAY, "Backend service error")
            }
            AppError::MapsApi(ref e) => {
                tracing::error!("Maps API error: {}", e);
                (StatusCode::BAD_GATEWAY, "Map service error")
            }
            AppError::InvalidRequest(ref e) => (StatusCode::BAD_REQUEST, e.as_str()),
            AppError::NotFound(ref e) => (StatusCode::NOT_FOUND, e.as_str()),
            AppError::Conflict(ref e) => (StatusCode::CONFLICT, e.as_str()),
            AppError::UserFacing {
                ref message,
                ref cause,
            } => {
                tracing::error!(cause = %cause, "{}", message);
                (StatusCode::BAD_GATEWAY, message.as_str())
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Unknown error"),
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
