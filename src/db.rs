use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use crate::error::ApiError;

/// Type alias for the PostgreSQL connection pool
pub type DbPool = PgPool;

/// Creates and configures a PostgreSQL connection pool
///
/// # Arguments
/// * `database_url` - PostgreSQL connection string
///
/// # Returns
/// * `Result<DbPool>` - Configured connection pool or error
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    tracing::debug!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

/// Round-trip a trivial query to prove the database is reachable
pub async fn ping(pool: &PgPool) -> Result<(), ApiError> {
    let result: Option<i32> = sqlx::query_scalar("SELECT 1")
        .fetch_optional(pool)
        .await?;

    match result {
        Some(1) => Ok(()),
        _ => Err(ApiError::InternalError(
            "Database is not configured correctly".to_string(),
        )),
    }
}
