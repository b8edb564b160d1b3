// User record storage used by the session service

use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::{error::AuthError, models::User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, refresh_token, avatar, confirmed, created_at";

/// Storage for user records
///
/// Each mutation is committed on its own; there is no compare-and-swap on
/// the refresh token, so two concurrent rotations for one user both succeed
/// and the last write wins.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Create a new user
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AuthError>;

    /// Replace the stored refresh token; `None` clears it
    async fn save_refresh_token(&self, user_id: i32, token: Option<&str>) -> Result<(), AuthError>;

    /// Mark the user's email as confirmed
    async fn mark_confirmed(&self, email: &str) -> Result<(), AuthError>;
}

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new PgUserStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let query = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))
    }

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AuthError> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AuthError::EmailAlreadyExists;
                    }
                }
                AuthError::DatabaseError(e.to_string())
            })
    }

    async fn save_refresh_token(&self, user_id: i32, token: Option<&str>) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET refresh_token = $1 WHERE id = $2")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn mark_confirmed(&self, email: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET confirmed = TRUE WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

/// In-memory user store for tests
#[cfg(test)]
#[derive(Default)]
pub struct InMemoryUserStore {
    users: tokio::sync::RwLock<Vec<User>>,
}

#[cfg(test)]
impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stored refresh token for `email`
    pub async fn stored_refresh_token(&self, email: &str) -> Option<String> {
        self.find_by_email(email)
            .await
            .ok()
            .flatten()
            .and_then(|user| user.refresh_token)
    }
}

#[cfg(test)]
#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AuthError> {
        let mut users = self.users.write().await;
        if users.iter().any(|user| user.email.eq_ignore_ascii_case(email)) {
            return Err(AuthError::EmailAlreadyExists);
        }

        let user = User {
            id: users.len() as i32 + 1,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            refresh_token: None,
            avatar: None,
            confirmed: false,
            created_at: chrono::Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn save_refresh_token(&self, user_id: i32, token: Option<&str>) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.iter_mut().find(|user| user.id == user_id) {
            user.refresh_token = token.map(str::to_string);
        }
        Ok(())
    }

    async fn mark_confirmed(&self, email: &str) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.iter_mut().find(|user| user.email.eq_ignore_ascii_case(email)) {
            user.confirmed = true;
        }
        Ok(())
    }
}
