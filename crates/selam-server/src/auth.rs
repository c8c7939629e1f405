//! Caller authentication.
//!
//! - **Cron secret**: shared secret presented by the scheduler that triggers
//!   the daily verse job.
//! - **Admin token**: bearer token for the verse editor API.
//! - **Identity token**: HS256 JWT issued to app users; its `sub` claim is
//!   the user id that owns a push token.

use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::config::ServerConfig;
use crate::error::ServerError;

/// Constant-time comparison of a presented secret against the expected one.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    let presented = presented.as_bytes();
    let expected = expected.as_bytes();
    presented.len() == expected.len() && presented.ct_eq(expected).unwrap_u8() == 1
}

/// `Authorization: Bearer <token>` first, then the `token` session cookie.
pub fn bearer_or_cookie_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == "token" && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Editor API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|auth| auth.strip_prefix("Bearer ").unwrap_or(auth))
        .unwrap_or("");

    if !secrets_match(token, expected) {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// An app user whose identity token checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub uid: String,
}

/// Verifies user identity tokens.
#[derive(Clone)]
pub struct IdentityVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl IdentityVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, ServerError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            let reason = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidSignature => "Invalid signature",
                _ => "Invalid authentication token",
            };
            tracing::debug!(error = %err, "Identity token rejected");
            ServerError::Unauthorized(reason.into())
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(ServerError::Unauthorized("Token has no subject".into()));
        }

        Ok(AuthenticatedUser {
            uid: data.claims.sub,
        })
    }

    /// Authenticate the caller of a request.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, ServerError> {
        let token = bearer_or_cookie_token(headers)
            .ok_or_else(|| ServerError::Unauthorized("Missing authentication token".into()))?;
        self.verify(&token)
    }
}

#[cfg(test)]
pub(crate) fn issue_test_token(secret: &str, sub: &str, ttl_secs: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let exp = (chrono::Utc::now().timestamp() + ttl_secs).max(0) as u64;
    let claims = Claims {
        sub: sub.to_string(),
        exp,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
