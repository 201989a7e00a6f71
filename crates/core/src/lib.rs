//! Wire contract shared by the client and app layers.
//!
//! This crate contains **pure data** (response envelope, normalized errors).
//! No transport, no state, no clock.

pub mod envelope;
pub mod error;

pub use envelope::{Envelope, ErrorBody};
pub use error::{ApiError, ApiResult, normalize_failure};
