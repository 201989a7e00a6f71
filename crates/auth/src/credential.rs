//! The bearer credential and its expiry math.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::token;

/// A bearer access token plus its expiry instant.
///
/// Credentials are immutable: refresh replaces the whole value, it never
/// mutates one in place. Expiry predicates are pure functions of a supplied
/// `now` so callers own the clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Build a credential from a raw token, reading `exp` advisorily.
    ///
    /// Fail-closed: an undecodable token yields a credential that is already
    /// expired at `now`, so the first use forces a refresh instead of
    /// trusting a corrupt token.
    pub fn from_token(access_token: impl Into<String>, now: DateTime<Utc>) -> Self {
        let access_token = access_token.into();
        let expires_at = match token::decode(&access_token) {
            Ok(decoded) => decoded.expires_at,
            Err(err) => {
                tracing::warn!(error = %err, "undecodable access token, treating as expired");
                now
            }
        };
        Self {
            access_token,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True once `now` is within `skew` of expiry (or past it).
    pub fn expires_within(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now >= self.expires_at - skew
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn expiry_is_a_pure_function_of_now() {
        let cred = Credential::new("t", at(1_000));

        assert!(!cred.is_expired(at(999)));
        assert!(cred.is_expired(at(1_000)));
        assert!(cred.is_expired(at(1_001)));
    }

    #[test]
    fn skew_moves_the_refresh_threshold_forward() {
        let cred = Credential::new("t", at(1_000));
        let skew = Duration::seconds(300);

        assert!(!cred.expires_within(at(699), skew));
        assert!(cred.expires_within(at(700), skew));
        assert!(cred.expires_within(at(1_500), skew));
    }

    #[test]
    fn corrupt_token_is_expired_on_arrival() {
        let now = at(5_000);
        let cred = Credential::from_token("not.a.token", now);

        assert!(cred.is_expired(now));
    }
}
