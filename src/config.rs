// Process-wide configuration loaded from the environment
// Everything here is read once at startup; a failure aborts the process

use jsonwebtoken::Algorithm;
use std::str::FromStr;
use thiserror::Error;

/// Default access token lifetime (120 minutes)
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 120 * 60;
/// Default refresh token lifetime (7 days)
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;
/// Default email confirmation token lifetime (1 day)
pub const DEFAULT_EMAIL_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
/// Upper bound for any configured token lifetime (10 years)
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Startup-only configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// JWT signing settings shared by every token the service issues
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub algorithm: Algorithm,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub email_token_ttl_secs: i64,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("email_token_ttl_secs", &self.email_token_ttl_secs)
            .finish()
    }
}

impl JwtSettings {
    /// Settings with the default lifetimes and HS256
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            email_token_ttl_secs: DEFAULT_EMAIL_TOKEN_TTL_SECS,
        }
    }

    /// Reject settings the token service cannot sign with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::Empty("SECRET_KEY_JWT"));
        }
        if !matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::Invalid {
                name: "ALGORITHM",
                reason: format!("{:?} is not an HMAC algorithm", self.algorithm),
            });
        }

        check_ttl("ACCESS_TOKEN_TTL_SECS", self.access_token_ttl_secs)?;
        check_ttl("REFRESH_TOKEN_TTL_SECS", self.refresh_token_ttl_secs)?;
        check_ttl("EMAIL_TOKEN_TTL_SECS", self.email_token_ttl_secs)
    }
}

fn check_ttl(name: &'static str, secs: i64) -> Result<(), ConfigError> {
    if secs <= 0 || secs > MAX_TOKEN_TTL_SECS {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("{} is outside 1..={} seconds", secs, MAX_TOKEN_TTL_SECS),
        });
    }
    Ok(())
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Base URL used to build links sent to users (email confirmation)
    pub public_base_url: String,
    pub jwt: JwtSettings,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", lookup("PORT"), 8000u16)?;
        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let secret = lookup("SECRET_KEY_JWT").ok_or(ConfigError::Missing("SECRET_KEY_JWT"))?;
        let algorithm = match lookup("ALGORITHM") {
            Some(raw) => Algorithm::from_str(raw.trim()).map_err(|e| ConfigError::Invalid {
                name: "ALGORITHM",
                reason: e.to_string(),
            })?,
            None => Algorithm::HS256,
        };

        let jwt = JwtSettings {
            secret,
            algorithm,
            access_token_ttl_secs: parse_or(
                "ACCESS_TOKEN_TTL_SECS",
                lookup("ACCESS_TOKEN_TTL_SECS"),
                DEFAULT_ACCESS_TOKEN_TTL_SECS,
            )?,
            refresh_token_ttl_secs: parse_or(
                "REFRESH_TOKEN_TTL_SECS",
                lookup("REFRESH_TOKEN_TTL_SECS"),
                DEFAULT_REFRESH_TOKEN_TTL_SECS,
            )?,
            email_token_ttl_secs: parse_or(
                "EMAIL_TOKEN_TTL_SECS",
                lookup("EMAIL_TOKEN_TTL_SECS"),
                DEFAULT_EMAIL_TOKEN_TTL_SECS,
            )?,
        };
        jwt.validate()?;

        Ok(Self {
            database_url,
            host,
            port,
            public_base_url,
            jwt,
        })
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
