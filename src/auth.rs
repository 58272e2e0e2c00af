use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Department, Role};

/// Claims
///
/// The payload the backend signs into both access and refresh tokens. Only
/// `exp` matters to the client; the identity claims are carried so callers
/// can inspect a token without another round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiration time (seconds since the epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued-at time (seconds since the epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
}

impl Claims {
    /// Expiry as a timestamp, if the token carries one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// True when `exp` is present and not after `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp.is_some_and(|exp| exp <= now.timestamp())
    }
}

/// Why a token was rejected by the local structural check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token must have three dot-separated segments, found {0}")]
    SegmentCount(usize),
    #[error("token payload is not valid base64url")]
    PayloadEncoding,
    #[error("token payload is not a JSON claims object")]
    PayloadJson,
    #[error("token carries no expiry")]
    MissingExpiry,
    #[error("token expired at {0}")]
    Expired(DateTime<Utc>),
}

/// Decodes the middle segment of a JWT without checking the signature.
///
/// This is the client-side structural check only: three dot-separated
/// segments and a base64url JSON payload. Signature verification belongs to
/// the server.
///
/// # Errors
/// Returns the first structural problem found.
pub fn decode_claims_unverified(token: &str) -> Result<Claims, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|segment| segment.is_empty()) {
        return Err(TokenError::SegmentCount(segments.len()));
    }

    // Some issuers pad the payload; the URL-safe engine here expects no padding.
    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| TokenError::PayloadEncoding)?;

    serde_json::from_slice(&bytes).map_err(|_| TokenError::PayloadJson)
}

/// Validates a refresh token before a persisted session is trusted.
///
/// On top of the structural check, the token must carry an `exp` that lies
/// after `now`.
///
/// # Errors
/// `TokenError::MissingExpiry` or `TokenError::Expired` in addition to the
/// structural errors of [`decode_claims_unverified`].
pub fn validate_refresh_token(token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
    let claims = decode_claims_unverified(token)?;
    let expires_at = claims.expires_at().ok_or(TokenError::MissingExpiry)?;
    if claims.is_expired_at(now) {
        return Err(TokenError::Expired(expires_at));
    }
    Ok(claims)
}
