// Authentication module
// Password hashing, JWT issuance and validation, refresh-token rotation and email confirmation

pub mod clock;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod routes;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use error::AuthError;
pub use handlers::AuthState;
pub use middleware::{BearerToken, CurrentUser};
pub use models::{TokenResponse, User, UserResponse};
pub use password::PasswordService;
pub use repository::{PgUserStore, UserStore};
pub use routes::routes;
pub use service::SessionService;
pub use token::{Scope, TokenError, TokenPair, TokenService};
