mod auth;
mod config;
mod db;
mod error;

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    models::{
        LoginRequest, MessageResponse, RegisterRequest, RequestEmail, SignupResponse,
        TokenResponse, UserResponse,
    },
    AuthState, PgUserStore, SessionService, TokenService,
};
use config::AppConfig;
use error::ApiError;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        healthchecker,
        auth::handlers::signup_handler,
        auth::handlers::login_handler,
        auth::handlers::refresh_handler,
        auth::handlers::confirmed_email_handler,
        auth::handlers::request_email_handler,
        auth::handlers::me_handler,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            RequestEmail,
            SignupResponse,
            TokenResponse,
            MessageResponse,
            UserResponse
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "users", description = "Signup, login, token refresh and email confirmation")
    ),
    info(
        title = "Contacts API",
        version = "1.0.0",
        description = "Authentication endpoints for the contacts REST backend"
    )
)]
struct ApiDoc;

/// Handler for GET /api/healthchecker
#[utoipa::path(
    get,
    path = "/api/healthchecker",
    responses(
        (status = 200, description = "Database reachable"),
        (status = 500, description = "Error connecting to the database")
    ),
    tag = "health"
)]
async fn healthchecker(State(db): State<PgPool>) -> Result<Json<Value>, ApiError> {
    db::ping(&db).await?;
    Ok(Json(json!({ "message": "Welcome to Contacts API!" })))
}

/// Creates and configures the application router
fn create_router(db: PgPool, auth_state: AuthState) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let health = Router::new()
        .route("/api/healthchecker", get(healthchecker))
        .with_state(db);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(health)
        .nest("/api/users", auth::routes(auth_state))
        .layer(cors)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Contacts API - Starting...");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!("Loaded configuration: {:?}", config.jwt);

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let tokens = match TokenService::new(&config.jwt) {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let users = Arc::new(PgUserStore::new(db_pool.clone()));
    let sessions = Arc::new(SessionService::new(users, tokens));
    let auth_state = AuthState::new(sessions, &config.public_base_url);

    let app = create_router(db_pool, auth_state);

    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Contacts API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
