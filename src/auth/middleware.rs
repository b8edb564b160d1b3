// Route guards for protected endpoints

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::{debug, warn};

use crate::auth::{error::AuthError, models::User, service::SessionService};

/// Raw bearer token taken from the Authorization header
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let endpoint = parts.uri.path();

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| {
                debug!("Missing Authorization header for endpoint: {}", endpoint);
                AuthError::MissingToken
            })?
            .to_str()
            .map_err(|_| {
                warn!("Invalid Authorization header format for endpoint: {}", endpoint);
                AuthError::InvalidSignatureOrExpired
            })?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                warn!(
                    "Authorization header missing 'Bearer ' prefix for endpoint: {}",
                    endpoint
                );
                AuthError::MissingToken
            })?;

        Ok(BearerToken(token.to_string()))
    }
}

/// Authenticated user extractor for protected routes
///
/// Resolves the access token through the shared [`SessionService`]; any
/// handler taking a `CurrentUser` is rejected with 401 before it runs.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Arc<SessionService>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let sessions = Arc::<SessionService>::from_ref(state);

        let user = sessions.resolve_current_user(&token).await?;
        debug!("Authenticated user id={} for {}", user.id, parts.uri.path());
        Ok(CurrentUser(user))
    }
}
