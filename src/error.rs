// Error type for routes outside the auth module (health check)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors raised by infrastructure routes
///
/// Both variants map to HTTP 500; details are logged, never returned.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// JSON body for infrastructure errors
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error_code: String,
    pub message: String,
    /// ISO 8601 timestamp of when the error occurred
    pub timestamp: String,
}

impl ApiError {
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        let (error_code, message) = match self {
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                ("DATABASE_ERROR", "Error connecting to the database")
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                ("INTERNAL_ERROR", "An internal server error occurred")
            }
        };

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse {
                error_code: error_code.to_string(),
                message: message.to_string(),
                timestamp: Utc::now().to_rfc3339(),
            },
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}
