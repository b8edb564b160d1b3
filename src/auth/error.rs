// Authentication error types

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::token::{Scope, TokenError};

/// Every way an authentication operation can be rejected
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// No account is registered under the email
    #[error("Invalid email")]
    InvalidEmail,

    /// The account exists but the password does not match
    #[error("Invalid password")]
    InvalidPassword,

    /// Malformed token, bad signature or past its expiry
    #[error("Could not validate credentials")]
    InvalidSignatureOrExpired,

    #[error("Invalid scope for token: expected '{expected}', got '{actual}'")]
    ScopeMismatch { expected: Scope, actual: Scope },

    /// The presented refresh token is not the one on record; the stored
    /// token has been cleared and the user must log in again
    #[error("Invalid refresh token")]
    RefreshTokenRevoked,

    #[error("Could not validate credentials")]
    Unauthenticated,

    #[error("Missing authentication token")]
    MissingToken,

    /// Email confirmation token could not be decoded
    #[error("Invalid token for email verification")]
    UnprocessableToken,

    /// Email confirmation token decoded but names no known user
    #[error("Verification error")]
    VerificationError,

    #[error("Account already exists")]
    EmailAlreadyExists,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Password hashing error: {0}")]
    PasswordHashError(String),

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignatureOrExpired => AuthError::InvalidSignatureOrExpired,
            TokenError::ScopeMismatch { expected, actual } => {
                AuthError::ScopeMismatch { expected, actual }
            }
            TokenError::MissingSubject => AuthError::Unauthenticated,
        }
    }
}

impl AuthError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::ValidationError(_) | AuthError::VerificationError => StatusCode::BAD_REQUEST,
            AuthError::InvalidEmail
            | AuthError::InvalidPassword
            | AuthError::InvalidSignatureOrExpired
            | AuthError::ScopeMismatch { .. }
            | AuthError::RefreshTokenRevoked
            | AuthError::Unauthenticated
            | AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::UnprocessableToken => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::EmailAlreadyExists => StatusCode::CONFLICT,
            AuthError::DatabaseError(_)
            | AuthError::PasswordHashError(_)
            | AuthError::TokenGenerationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::ValidationError(_) => "VALIDATION_ERROR",
            AuthError::InvalidEmail => "INVALID_EMAIL",
            AuthError::InvalidPassword => "INVALID_PASSWORD",
            AuthError::InvalidSignatureOrExpired => "INVALID_TOKEN",
            AuthError::ScopeMismatch { .. } => "INVALID_SCOPE",
            AuthError::RefreshTokenRevoked => "REFRESH_TOKEN_REVOKED",
            AuthError::Unauthenticated => "UNAUTHENTICATED",
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::UnprocessableToken => "UNPROCESSABLE_TOKEN",
            AuthError::VerificationError => "VERIFICATION_ERROR",
            AuthError::EmailAlreadyExists => "CONFLICT",
            AuthError::DatabaseError(_)
            | AuthError::PasswordHashError(_)
            | AuthError::TokenGenerationError(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to send to clients (no internal details)
    pub fn error_message(&self) -> String {
        match self {
            AuthError::ValidationError(msg) => msg.clone(),
            AuthError::ScopeMismatch { .. } => "Invalid scope for token".to_string(),
            AuthError::DatabaseError(_)
            | AuthError::PasswordHashError(_)
            | AuthError::TokenGenerationError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AuthError::DatabaseError(_)
            | AuthError::PasswordHashError(_)
            | AuthError::TokenGenerationError(_) => error!("Auth internal error: {}", self),
            AuthError::RefreshTokenRevoked => warn!("Stale refresh token presented"),
            _ if status == StatusCode::UNAUTHORIZED => warn!("Rejected credentials: {}", self),
            _ => {}
        }

        let body = Json(json!({
            "error": self.error_code(),
            "message": self.error_message(),
        }));

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
