//! Bearer-token issue and verification.
//!
//! Tokens are HS256 JWTs signed with a shared secret. The only claims the
//! sync core cares about are `sub` (the user identity bound to the
//! connection) and `exp`. Verification failures are terminal for a
//! handshake: the connection is refused and nothing is recorded.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::task::UserId;

/// JWT claims carried by a `TaskDeck` bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The user identity this token authenticates.
    pub sub: String,
    /// Expiry, seconds since the UNIX epoch.
    pub exp: u64,
}

/// Errors raised when issuing or verifying a token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token's expiry is in the past.
    #[error("token expired")]
    Expired,
    /// The token is malformed, unsigned, or signed with a different secret.
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Issues a signed token for the given user, valid for `ttl_secs`.
///
/// # Errors
///
/// Returns [`AuthError::Invalid`] if signing fails.
pub fn issue_token(user: &UserId, secret: &[u8], ttl_secs: u64) -> Result<String, AuthError> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let claims = Claims {
        sub: user.as_str().to_string(),
        exp: now.saturating_add(ttl_secs),
    };
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| AuthError::Invalid(e.to_string()))
}

/// Verifies a token's signature and expiry, returning the bound user.
///
/// # Errors
///
/// Returns [`AuthError::Expired`] for an out-of-date token and
/// [`AuthError::Invalid`] for anything else that fails validation.
pub fn verify_token(token: &str, secret: &[u8]) -> Result<UserId, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Invalid(e.to_string()),
        })?;
    Ok(UserId::new(data.claims.sub))
}
