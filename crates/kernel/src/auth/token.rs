//! JWT issuing and verification.

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthenticationError;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User ID.
    pub sub: String,
    /// Role IDs at issue time. Informational; roles are reloaded per request.
    #[serde(default)]
    pub role_ids: Vec<Uuid>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    /// Parse the subject as a user ID.
    pub fn user_id(&self) -> Result<Uuid, AuthenticationError> {
        self.sub
            .parse()
            .map_err(|_| AuthenticationError::Malformed)
    }
}

/// HS256 token service.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    lifetime_secs: i64,
}

impl TokenService {
    /// Create a token service. The secret should be at least 32 bytes.
    pub fn new(secret: &[u8], issuer: impl Into<String>, lifetime_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            lifetime_secs,
        }
    }

    /// Token lifetime in seconds.
    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Issue an access token for a user.
    pub fn issue(&self, user_id: Uuid, role_ids: Vec<Uuid>) -> Result<String> {
        let now = Utc::now().timestamp();
        self.encode(&TokenClaims {
            sub: user_id.to_string(),
            role_ids,
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.lifetime_secs,
        })
    }

    fn encode(&self, claims: &TokenClaims) -> Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .context("failed to encode access token")
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthenticationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_aud = false;

        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthenticationError::Expired,
                _ => AuthenticationError::Malformed,
            })
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The value must be exactly `Bearer <token>`.
pub fn parse_bearer(header: &str) -> Result<&str, AuthenticationError> {
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthenticationError::Malformed)?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthenticationError::Malformed);
    }

    Ok(token)
}
