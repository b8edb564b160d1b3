// JWT token issuance and validation service

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::clock::{Clock, SystemClock};
use crate::auth::error::AuthError;
use crate::config::{ConfigError, JwtSettings};

/// Intended use of a token, carried in the `scope` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "access_token")]
    Access,
    #[serde(rename = "refresh_token")]
    Refresh,
    #[serde(rename = "email_token")]
    EmailVerify,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Access => "access_token",
            Scope::Refresh => "refresh_token",
            Scope::EmailVerify => "email_token",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a presented token was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token is malformed, has a bad signature or has expired")]
    InvalidSignatureOrExpired,

    #[error("Token scope '{actual}' does not match expected '{expected}'")]
    ScopeMismatch { expected: Scope, actual: Scope },

    #[error("Token has no subject")]
    MissingSubject,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub scope: Scope,
    /// Unique token id; two tokens issued in the same second still differ
    #[serde(default)]
    pub jti: String,
}

/// Access and refresh token issued together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token service for JWT operations
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
    email_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("email_ttl", &self.email_ttl)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

impl TokenService {
    /// Create a TokenService driven by the system clock
    pub fn new(settings: &JwtSettings) -> Result<Self, ConfigError> {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// Create a TokenService with an explicit time source
    pub fn with_clock(settings: &JwtSettings, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        settings.validate()?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            algorithm: settings.algorithm,
            access_ttl: Duration::seconds(settings.access_token_ttl_secs),
            refresh_ttl: Duration::seconds(settings.refresh_token_ttl_secs),
            email_ttl: Duration::seconds(settings.email_token_ttl_secs),
            clock,
        })
    }

    /// Default lifetime for tokens of the given scope
    pub fn ttl_for(&self, scope: Scope) -> Duration {
        match scope {
            Scope::Access => self.access_ttl,
            Scope::Refresh => self.refresh_ttl,
            Scope::EmailVerify => self.email_ttl,
        }
    }

    /// Issue a signed token for `subject` valid for `ttl` from now
    pub fn issue(&self, subject: &str, scope: Scope, ttl: Duration) -> Result<String, AuthError> {
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            AuthError::TokenGenerationError(format!("token lifetime {} overflows", ttl))
        })?;

        let claims = Claims {
            sub: Some(subject.to_string()),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            scope,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Generate an access token with the configured lifetime
    pub fn issue_access(&self, subject: &str) -> Result<String, AuthError> {
        self.issue(subject, Scope::Access, self.access_ttl)
    }

    /// Generate a refresh token with the configured lifetime
    pub fn issue_refresh(&self, subject: &str) -> Result<String, AuthError> {
        self.issue(subject, Scope::Refresh, self.refresh_ttl)
    }

    /// Generate an email confirmation token with the configured lifetime
    pub fn issue_email(&self, subject: &str) -> Result<String, AuthError> {
        self.issue(subject, Scope::EmailVerify, self.email_ttl)
    }

    /// Generate both access and refresh tokens
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue_access(subject)?,
            refresh_token: self.issue_refresh(subject)?,
        })
    }

    /// Verify signature, expiry and scope, returning the subject
    pub fn decode(&self, token: &str, expected: Scope) -> Result<String, TokenError> {
        let claims = self.decode_claims(token)?;

        if claims.scope != expected {
            return Err(TokenError::ScopeMismatch {
                expected,
                actual: claims.scope,
            });
        }

        match claims.sub {
            Some(sub) if !sub.is_empty() => Ok(sub),
            _ => Err(TokenError::MissingSubject),
        }
    }

    /// Verify signature and expiry without looking at the scope
    pub fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        // Expiry is checked below against our own clock, with no leeway
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                TokenError::InvalidSignatureOrExpired
            })?;

        if claims.exp <= self.clock.now().timestamp() {
            tracing::debug!("Token rejected: expired at {}", claims.exp);
            return Err(TokenError::InvalidSignatureOrExpired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    const SECRET: &str = "test_secret_key_for_testing_purposes";
    const ALL_SCOPES: [Scope; 3] = [Scope::Access, Scope::Refresh, Scope::EmailVerify];

    fn test_token_service() -> TokenService {
        TokenService::new(&JwtSettings::new(SECRET)).unwrap()
    }

    fn manual_token_service() -> (TokenService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let service = TokenService::with_clock(&JwtSettings::new(SECRET), clock.clone()).unwrap();
        (service, clock)
    }

    #[test]
    fn test_default_lifetimes() {
        let service = test_token_service();

        let access = service.decode_claims(&service.issue_access("a@x.com").unwrap()).unwrap();
        assert_eq!(access.exp - access.iat, 120 * 60);
        assert_eq!(access.scope, Scope::Access);

        let refresh = service.decode_claims(&service.issue_refresh("a@x.com").unwrap()).unwrap();
        assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 60 * 60);
        assert_eq!(refresh.scope, Scope::Refresh);

        let email = service.decode_claims(&service.issue_email("a@x.com").unwrap()).unwrap();
        assert_eq!(email.exp - email.iat, 24 * 60 * 60);
        assert_eq!(email.scope, Scope::EmailVerify);
    }

    #[test]
    fn test_ttl_overrides() {
        let mut settings = JwtSettings::new(SECRET);
        settings.access_token_ttl_secs = 30;
        let service = TokenService::new(&settings).unwrap();

        assert_eq!(service.ttl_for(Scope::Access), Duration::seconds(30));
        let claims = service.decode_claims(&service.issue_access("a@x.com").unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, 30);
    }

    #[test]
    fn test_scope_is_serialized_with_wire_names() {
        let service = test_token_service();
        let token = service.issue_refresh("a@x.com").unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let raw = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &validation,
        )
        .unwrap()
        .claims;

        assert_eq!(raw["scope"], "refresh_token");
        assert_eq!(raw["sub"], "a@x.com");
    }

    #[test]
    fn test_pair_tokens_differ() {
        let service = test_token_service();
        let first = service.issue_pair("a@x.com").unwrap();
        let second = service.issue_pair("a@x.com").unwrap();

        assert_ne!(first.access_token, first.refresh_token);
        assert_ne!(first.refresh_token, second.refresh_token);
    }

    #[test]
    fn test_overflowing_ttl_is_an_error() {
        let service = test_token_service();

        let result = service.issue("a@x.com", Scope::Access, Duration::days(50_000_000_000));
        assert!(matches!(result, Err(AuthError::TokenGenerationError(_))));
    }

    #[test]
    fn test_out_of_range_ttl_settings_rejected() {
        let mut settings = JwtSettings::new(SECRET);
        settings.refresh_token_ttl_secs = -5;
        assert!(TokenService::new(&settings).is_err());

        let mut settings = JwtSettings::new(SECRET);
        settings.access_token_ttl_secs = 100_000_000_000_000;
        assert!(TokenService::new(&settings).is_err());
    }

    #[test]
    fn test_zero_and_negative_ttl_rejected() {
        let service = test_token_service();

        let token = service.issue("a@x.com", Scope::Access, Duration::zero()).unwrap();
        assert_eq!(
            service.decode(&token, Scope::Access),
            Err(TokenError::InvalidSignatureOrExpired)
        );

        let token = service.issue("a@x.com", Scope::Access, Duration::minutes(-5)).unwrap();
        assert_eq!(
            service.decode(&token, Scope::Access),
            Err(TokenError::InvalidSignatureOrExpired)
        );
    }

    #[test]
    fn test_expiry_follows_clock() {
        let (service, clock) = manual_token_service();
        let token = service.issue_access("a@x.com").unwrap();

        clock.advance(Duration::minutes(119));
        assert_eq!(service.decode(&token, Scope::Access).unwrap(), "a@x.com");

        clock.advance(Duration::minutes(1));
        assert_eq!(
            service.decode(&token, Scope::Access),
            Err(TokenError::InvalidSignatureOrExpired)
        );
    }

    #[test]
    fn test_signature_verification() {
        let service1 = TokenService::new(&JwtSettings::new("secret1")).unwrap();
        let service2 = TokenService::new(&JwtSettings::new("secret2")).unwrap();

        let token = service1.issue_access("a@x.com").unwrap();
        assert!(service1.decode(&token, Scope::Access).is_ok());
        assert_eq!(
            service2.decode(&token, Scope::Access),
            Err(TokenError::InvalidSignatureOrExpired)
        );
    }

    #[test]
    fn test_algorithm_mismatch_rejected() {
        let mut settings = JwtSettings::new(SECRET);
        settings.algorithm = Algorithm::HS512;
        let hs512 = TokenService::new(&settings).unwrap();
        let hs256 = test_token_service();

        let token = hs512.issue_access("a@x.com").unwrap();
        assert!(hs512.decode(&token, Scope::Access).is_ok());
        assert_eq!(
            hs256.decode(&token, Scope::Access),
            Err(TokenError::InvalidSignatureOrExpired)
        );
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let service = test_token_service();

        for token in [
            "",
            "not.a.token",
            "invalid_token_format",
            "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.invalid.signature",
        ] {
            assert_eq!(
                service.decode(token, Scope::Access),
                Err(TokenError::InvalidSignatureOrExpired)
            );
        }
    }

    #[test]
    fn test_missing_subject() {
        let service = test_token_service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: None,
            iat: now,
            exp: now + 600,
            scope: Scope::Access,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(service.decode(&token, Scope::Access), Err(TokenError::MissingSubject));

        let token = service.issue("", Scope::Access, Duration::minutes(5)).unwrap();
        assert_eq!(service.decode(&token, Scope::Access), Err(TokenError::MissingSubject));
    }

    #[test]
    fn test_token_without_scope_rejected() {
        let service = test_token_service();
        let now = Utc::now().timestamp();
        let token = encode(
            &Header::default(),
            &serde_json::json!({ "sub": "a@x.com", "iat": now, "exp": now + 600 }),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            service.decode(&token, Scope::EmailVerify),
            Err(TokenError::InvalidSignatureOrExpired)
        );
    }

    #[test]
    fn test_empty_secret_is_configuration_error() {
        assert!(matches!(
            TokenService::new(&JwtSettings::new("")),
            Err(ConfigError::Empty(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_issue_decode_round_trip(
            email in "[a-z]{3,10}@[a-z]{3,10}\\.(com|org|net)",
            scope_idx in 0usize..3,
            ttl_secs in 60i64..1_000_000
        ) {
            let service = test_token_service();
            let scope = ALL_SCOPES[scope_idx];
            let token = service.issue(&email, scope, Duration::seconds(ttl_secs))?;
            prop_assert_eq!(service.decode(&token, scope), Ok(email));
        }

        #[test]
        fn prop_scope_mismatch_detected(
            email in "[a-z]{3,10}@[a-z]{3,10}\\.(com|org|net)",
            issued_idx in 0usize..3,
            expected_idx in 0usize..3
        ) {
            prop_assume!(issued_idx != expected_idx);
            let service = test_token_service();
            let issued = ALL_SCOPES[issued_idx];
            let expected = ALL_SCOPES[expected_idx];

            let token = service.issue(&email, issued, service.ttl_for(issued))?;
            prop_assert_eq!(
                service.decode(&token, expected),
                Err(TokenError::ScopeMismatch { expected, actual: issued })
            );
        }

        #[test]
        fn prop_malformed_tokens_rejected(malformed in "[a-zA-Z0-9]{10,50}") {
            let service = test_token_service();
            prop_assert_eq!(
                service.decode(&malformed, Scope::Access),
                Err(TokenError::InvalidSignatureOrExpired)
            );
        }
    }
}
