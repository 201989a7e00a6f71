//! Normalized API error taxonomy.

use std::collections::HashMap;

use thiserror::Error;

use crate::envelope::ErrorBody;

/// Result type used across the client layer.
pub type ApiResult<T> = Result<T, ApiError>;

/// Normalized outcome of a failed API call.
///
/// Only 401 handling lives inside the request coordinator (refresh and
/// single replay); every other failure is normalized into one of these
/// variants and surfaced to the caller untouched. `SessionExpired` is the
/// single terminal kind: it clears the session and signals a sign-in
/// redirect.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    /// The session can no longer be refreshed. The caller must sign in again.
    #[error("session expired")]
    SessionExpired,

    /// 422 with per-field messages, surfaced untouched for form display.
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, Vec<String>>,
    },

    /// 403. No session action is taken.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// 5xx. Never retried.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-success status outside the taxonomy above.
    #[error("unexpected response ({status}): {message}")]
    Unexpected { status: u16, message: String },

    /// No response was received. Never retried.
    #[error("network error: {0}")]
    Network(String),

    /// The response arrived but its body did not match the expected shape.
    #[error("malformed response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Numeric status for programmatic branching, where one applies.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::SessionExpired => Some(401),
            Self::Validation { .. } => Some(422),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Server { status, .. } | Self::Unexpected { status, .. } => Some(*status),
            Self::Network(_) | Self::Decode(_) => None,
        }
    }

    /// Per-field validation messages, populated only for [`ApiError::Validation`].
    pub fn field_errors(&self) -> Option<&HashMap<String, Vec<String>>> {
        match self {
            Self::Validation { field_errors, .. } => Some(field_errors),
            _ => None,
        }
    }
}

/// Map a non-success status plus its parsed body onto the taxonomy.
///
/// 401 is deliberately absent here: the request coordinator consumes it
/// before normalization (refresh-and-retry, or `SessionExpired`).
pub fn normalize_failure(status: u16, body: &ErrorBody) -> ApiError {
    let message = |fallback: &str| {
        body.display_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    };

    match status {
        422 => ApiError::Validation {
            message: message("validation failed"),
            field_errors: body.errors.clone().unwrap_or_default(),
        },
        403 => ApiError::Forbidden(message("you do not have permission")),
        404 => ApiError::NotFound(message("resource not found")),
        s if s >= 500 => ApiError::Server {
            status: s,
            message: message("server error"),
        },
        s => ApiError::Unexpected {
            status: s,
            message: message("request failed"),
        },
    }
}
