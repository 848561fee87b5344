//! Bearer-token security.
//!
//! Tokens are HMAC-SHA256 signed strings of the form
//! `<subject>.<expiry-unix-seconds>.<hex-mac>`, where the MAC covers
//! `<subject>.<expiry-unix-seconds>` and is keyed with the configured
//! `JWT.secret`. The subject may itself contain dots; parsing splits from
//! the right.
//!
//! These are not JWTs: there is no header segment and no base64url
//! encoding. Only the property name `JWT.secret` is shared with deployments
//! that hand out real JWTs, so the same configuration carries over.
//!
//! [`require_token`] is an Axum `from_fn` middleware that rejects every
//! request outside [`OPEN_PATHS`] unless it carries
//! `Authorization: Bearer <token>` with a valid, unexpired token. On success
//! the decoded [`Claims`] are inserted into the request extensions.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// Paths reachable without a token.
pub const OPEN_PATHS: &[&str] = &["/health"];

// ---------------------------------------------------------------------------
// Claims / TokenError
// ---------------------------------------------------------------------------

/// The verified contents of a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: String,
    pub expires_at: DateTime<Utc>,
}

/// Reasons a token is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature does not verify")]
    BadSignature,

    #[error("token expired at {0}")]
    Expired(DateTime<Utc>),
}

// ---------------------------------------------------------------------------
// TokenValidator
// ---------------------------------------------------------------------------

/// Issues and verifies bearer tokens with a shared secret.
///
/// Cheaply cloneable; the key is behind an `Arc`.
#[derive(Clone)]
pub struct TokenValidator {
    key: Arc<[u8]>,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator").finish_non_exhaustive()
    }
}

impl TokenValidator {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Arc::from(secret.as_bytes()),
        }
    }

    /// Issue a token for `subject` that expires after `ttl`.
    pub fn issue(&self, subject: &str, ttl: Duration) -> String {
        let expires = (Utc::now() + ttl).timestamp();
        let payload = format!("{subject}.{expires}");
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let sig = hex::encode(mac.finalize().into_bytes());
        format!("{payload}.{sig}")
    }

    /// Verify the signature and expiry of `token`.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let (payload, sig_hex) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (subject, expires) = payload.rsplit_once('.').ok_or(TokenError::Malformed)?;
        if subject.is_empty() {
            return Err(TokenError::Malformed);
        }

        let sig = hex::decode(sig_hex).map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig).map_err(|_| TokenError::BadSignature)?;

        let expires: i64 = expires.parse().map_err(|_| TokenError::Malformed)?;
        let expires_at = DateTime::from_timestamp(expires, 0).ok_or(TokenError::Malformed)?;
        if expires_at <= Utc::now() {
            return Err(TokenError::Expired(expires_at));
        }

        Ok(Claims {
            subject: subject.to_string(),
            expires_at,
        })
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(&self.key).expect("HMAC accepts keys of any length")
    }
}

// ---------------------------------------------------------------------------
// Middleware function
// ---------------------------------------------------------------------------

/// Axum `from_fn` middleware that enforces bearer-token authentication.
pub async fn require_token(
    validator: Arc<TokenValidator>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if OPEN_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token else {
        return ApiError::Unauthorized("missing bearer token".into()).into_response();
    };

    match validator.validate(token) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), error = %e, "rejected request");
            ApiError::Unauthorized(e.to_string()).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates() {
        let v = TokenValidator::new("secret");
        let token = v.issue("admin", Duration::minutes(5));
        let claims = v.validate(&token).unwrap();
        assert_eq!(claims.subject, "admin");
        assert!(claims.expires_at > Utc::now());
    }

    #[test]
    fn issued_token_is_subject_expiry_and_hex_mac() {
        let v = TokenValidator::new("secret");
        let before = Utc::now().timestamp();
        let token = v.issue("admin", Duration::minutes(5));

        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "admin");
        let expiry: i64 = parts[1].parse().unwrap();
        assert!(expiry >= before + 300 && expiry <= before + 301);
        assert_eq!(parts[2].len(), 64);
        assert!(parts[2].bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn subject_may_contain_dots() {
        let v = TokenValidator::new("secret");
        let token = v.issue("user.name@example.com", Duration::minutes(5));
        assert_eq!(v.validate(&token).unwrap().subject, "user.name@example.com");
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = TokenValidator::new("one").issue("admin", Duration::minutes(5));
        let err = TokenValidator::new("two").validate(&token).unwrap_err();
        assert_eq!(err, TokenError::BadSignature);
    }

    #[test]
    fn tampered_subject_is_rejected() {
        let v = TokenValidator::new("secret");
        let token = v.issue("guest", Duration::minutes(5));
        let forged = token.replacen("guest", "admin", 1);
        assert_eq!(v.validate(&forged).unwrap_err(), TokenError::BadSignature);
    }

    #[test]
    fn expired_token_is_rejected() {
        let v = TokenValidator::new("secret");
        let token = v.issue("admin", Duration::seconds(-10));
        assert!(matches!(v.validate(&token), Err(TokenError::Expired(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        let v = TokenValidator::new("secret");
        assert_eq!(v.validate("no-dots").unwrap_err(), TokenError::Malformed);
        assert_eq!(v.validate("a.b.zz").unwrap_err(), TokenError::Malformed);
        assert_eq!(v.validate(".123.00").unwrap_err(), TokenError::Malformed);
    }
}
