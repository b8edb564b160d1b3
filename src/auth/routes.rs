// Router for the /api/users endpoints

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth::handlers::{
    confirmed_email_handler, login_handler, me_handler, refresh_handler, request_email_handler,
    signup_handler, AuthState,
};

/// Build the user routes, to be nested under `/api/users`
pub fn routes(state: AuthState) -> Router {
    Router::new()
        .route("/signup", post(signup_handler))
        .route("/login", post(login_handler))
        .route("/refresh_token", get(refresh_handler))
        .route("/confirmed_email/:token", get(confirmed_email_handler))
        .route("/request_email", post(request_email_handler))
        .route("/me", get(me_handler))
        .with_state(state)
}
