//! Advisory decoder for the bearer token's payload segment.
//!
//! The decoder answers exactly one question: *when does this token expire?*
//! It performs no signature verification; trust decisions belong to the
//! remote authority, and authorization facts come from the authenticated
//! `me`/login response bodies, never from client-side decoding.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Expiry plus the raw claims of a decoded token.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub expires_at: DateTime<Utc>,
    pub claims: serde_json::Map<String, Value>,
}

/// Structural decode failure.
///
/// Every caller must treat this as "already expired": a corrupt token is
/// never trusted as valid.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token is not a three-segment compact serialization")]
    Structure,

    #[error("token payload is not valid base64")]
    Base64,

    #[error("token payload is not a JSON object")]
    Json,

    #[error("token payload is missing a usable 'exp' claim")]
    MissingExpiry,
}

/// Extract expiry and claims from a compact `header.payload.signature` token.
pub fn decode(token: &str) -> Result<DecodedToken, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(DecodeError::Structure);
    };
    if segments.iter().any(|s| s.is_empty()) {
        return Err(DecodeError::Structure);
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.as_bytes())
        .map_err(|_| DecodeError::Base64)?;

    let Ok(Value::Object(claims)) = serde_json::from_slice::<Value>(&bytes) else {
        return Err(DecodeError::Json);
    };

    let exp = claims
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or(DecodeError::MissingExpiry)?;
    let expires_at = DateTime::from_timestamp(exp, 0).ok_or(DecodeError::MissingExpiry)?;

    Ok(DecodedToken { expires_at, claims })
}
