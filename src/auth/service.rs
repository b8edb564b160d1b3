// Session service - login, refresh rotation, current user and email confirmation

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::{
    error::AuthError,
    models::{Confirmation, User},
    password::PasswordService,
    repository::UserStore,
    token::{Scope, TokenError, TokenPair, TokenService},
};

/// Authentication orchestrator, built once at startup and shared by handlers
pub struct SessionService {
    users: Arc<dyn UserStore>,
    tokens: TokenService,
}

impl SessionService {
    /// Create a new SessionService
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenService) -> Self {
        Self { users, tokens }
    }

    /// Token service used to issue and decode tokens
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new user with a hashed password
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = PasswordService::hash_password(password)?;
        let user = self.users.create_user(username, email, &password_hash).await?;

        info!("Registered user id={}", user.id);
        Ok(user)
    }

    /// Check credentials and start a new session
    ///
    /// The returned refresh token replaces whatever was stored before.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidEmail)?;

        if !PasswordService::verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidPassword);
        }

        let pair = self.tokens.issue_pair(&user.email)?;
        self.users
            .save_refresh_token(user.id, Some(&pair.refresh_token))
            .await?;

        info!("User id={} logged in", user.id);
        Ok(pair)
    }

    /// Rotate a refresh token
    ///
    /// The presented token must equal the stored one exactly. On mismatch the
    /// stored token is cleared, which forces a new login.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, AuthError> {
        let email = self.tokens.decode(presented, Scope::Refresh)?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if user.refresh_token.as_deref() != Some(presented) {
            warn!("Refresh token mismatch for user id={}, revoking session", user.id);
            self.users.save_refresh_token(user.id, None).await?;
            return Err(AuthError::RefreshTokenRevoked);
        }

        let pair = self.tokens.issue_pair(&user.email)?;
        self.users
            .save_refresh_token(user.id, Some(&pair.refresh_token))
            .await?;

        debug!("Rotated refresh token for user id={}", user.id);
        Ok(pair)
    }

    /// Resolve the user behind an access token
    pub async fn resolve_current_user(&self, bearer: &str) -> Result<User, AuthError> {
        let email = self.tokens.decode(bearer, Scope::Access)?;

        self.users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    /// Issue a one-shot email confirmation token
    pub fn issue_email_confirmation(&self, email: &str) -> Result<String, AuthError> {
        self.tokens.issue_email(email)
    }

    /// Confirm the email address carried by a confirmation token
    pub async fn confirm(&self, token: &str) -> Result<Confirmation, AuthError> {
        let email = self
            .tokens
            .decode(token, Scope::EmailVerify)
            .map_err(|e: TokenError| {
                debug!("Email confirmation token rejected: {}", e);
                AuthError::UnprocessableToken
            })?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::VerificationError)?;

        if user.confirmed {
            return Ok(Confirmation::AlreadyConfirmed(user.email));
        }

        self.users.mark_confirmed(&user.email).await?;
        info!("Confirmed email for user id={}", user.id);
        Ok(Confirmation::Confirmed(user.email))
    }

    /// Issue a fresh confirmation token for an unconfirmed account
    ///
    /// Returns `None` when the email is unknown or already confirmed.
    pub async fn request_confirmation(&self, email: &str) -> Result<Option<String>, AuthError> {
        match self.users.find_by_email(email).await? {
            Some(user) if !user.confirmed => {
                Ok(Some(self.issue_email_confirmation(&user.email)?))
            }
            _ => Ok(None),
        }
    }
}
