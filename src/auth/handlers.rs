// HTTP handlers for user authentication endpoints

use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;
use validator::Validate;

use crate::auth::{
    error::AuthError,
    middleware::{BearerToken, CurrentUser},
    models::{
        Confirmation, LoginRequest, MessageResponse, RegisterRequest, RequestEmail, SignupResponse,
        TokenResponse, UserResponse,
    },
    service::SessionService,
};

/// State shared by the user routes
#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<SessionService>,
    /// Base URL prepended to confirmation links
    pub public_base_url: Arc<str>,
}

impl AuthState {
    pub fn new(sessions: Arc<SessionService>, public_base_url: &str) -> Self {
        Self {
            sessions,
            public_base_url: Arc::from(public_base_url.trim_end_matches('/')),
        }
    }

    fn confirmation_link(&self, token: &str) -> String {
        format!("{}/api/users/confirmed_email/{}", self.public_base_url, token)
    }
}

impl FromRef<AuthState> for Arc<SessionService> {
    fn from_ref(state: &AuthState) -> Self {
        state.sessions.clone()
    }
}

fn validate<T: Validate>(payload: &T) -> Result<(), AuthError> {
    payload
        .validate()
        .map_err(|e| AuthError::ValidationError(format!("Validation failed: {}", e)))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/users/signup",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = SignupResponse),
        (status = 400, description = "Invalid input data"),
        (status = 409, description = "Account already exists")
    ),
    tag = "users"
)]
pub async fn signup_handler(
    State(state): State<AuthState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AuthError> {
    validate(&request)?;

    let user = state
        .sessions
        .register(&request.username, &request.email, &request.password)
        .await?;

    // Delivery is handled outside this service; the link is only traced
    let token = state.sessions.issue_email_confirmation(&user.email)?;
    debug!("Confirmation link for user id={}: {}", user.id, state.confirmation_link(&token));

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            new_user: user.into(),
            detail: "User successfully created. Check your email for confirmation.".to_string(),
        }),
    ))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access and refresh tokens", body = TokenResponse),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "users"
)]
pub async fn login_handler(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let pair = state.sessions.login(&request.email, &request.password).await?;
    Ok(Json(pair.into()))
}

/// Rotate the refresh token presented as the bearer credential
#[utoipa::path(
    get,
    path = "/api/users/refresh_token",
    responses(
        (status = 200, description = "New access and refresh tokens", body = TokenResponse),
        (status = 401, description = "Invalid, expired or revoked refresh token")
    ),
    tag = "users"
)]
pub async fn refresh_handler(
    State(state): State<AuthState>,
    BearerToken(token): BearerToken,
) -> Result<Json<TokenResponse>, AuthError> {
    let pair = state.sessions.refresh(&token).await?;
    Ok(Json(pair.into()))
}

/// Confirm an email address from a confirmation link
#[utoipa::path(
    get,
    path = "/api/users/confirmed_email/{token}",
    params(
        ("token" = String, Path, description = "Email confirmation token")
    ),
    responses(
        (status = 200, description = "Email confirmed", body = MessageResponse),
        (status = 400, description = "Verification error"),
        (status = 422, description = "Invalid token for email verification")
    ),
    tag = "users"
)]
pub async fn confirmed_email_handler(
    State(state): State<AuthState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, AuthError> {
    let message = match state.sessions.confirm(&token).await? {
        Confirmation::Confirmed(_) => "Email confirmed",
        Confirmation::AlreadyConfirmed(_) => "Your email is already confirmed",
    };
    Ok(Json(MessageResponse::new(message)))
}

/// Issue a new confirmation link for an unconfirmed account
#[utoipa::path(
    post,
    path = "/api/users/request_email",
    request_body = RequestEmail,
    responses(
        (status = 200, description = "Request accepted", body = MessageResponse),
        (status = 400, description = "Invalid input data")
    ),
    tag = "users"
)]
pub async fn request_email_handler(
    State(state): State<AuthState>,
    Json(request): Json<RequestEmail>,
) -> Result<Json<MessageResponse>, AuthError> {
    validate(&request)?;

    if let Some(token) = state.sessions.request_confirmation(&request.email).await? {
        debug!("Confirmation link re-issued: {}", state.confirmation_link(&token));
    }

    Ok(Json(MessageResponse::new("Check your email for confirmation.")))
}

/// Get current user information
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid access token")
    ),
    tag = "users"
)]
pub async fn me_handler(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}
