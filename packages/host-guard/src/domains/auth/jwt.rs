//! Session tokens issued after a successful OTP verification

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_SESSION_LIFETIME_HOURS: i64 = 24;

/// Claims carried by a session token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Identifier hash; a raw address never goes into a token
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub jti: String,
}

/// A signed token and when it stops being accepted
#[derive(Debug, Clone, Serialize)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SessionTokenError {
    #[error("session token has expired")]
    Expired,

    #[error("session token rejected: {0}")]
    Rejected(String),

    #[error("failed to sign session token: {0}")]
    Signing(String),
}

/// Signs and checks HS256 session tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    lifetime: Duration,
}

impl JwtService {
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            lifetime: Duration::hours(DEFAULT_SESSION_LIFETIME_HOURS),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issue a session for a verified identifier hash
    pub fn create_token(&self, identifier_hash: &str) -> Result<SessionToken, SessionTokenError> {
        let now = Utc::now();
        let expires_at = now + self.lifetime;

        let claims = Claims {
            sub: identifier_hash.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SessionTokenError::Signing(e.to_string()))?;

        Ok(SessionToken { token, expires_at })
    }

    /// Check signature, algorithm, issuer and expiry
    pub fn verify_token(&self, token: &str) -> Result<Claims, SessionTokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionTokenError::Expired,
                _ => SessionTokenError::Rejected(e.to_string()),
            })
    }
}
