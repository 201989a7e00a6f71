//! Client configuration.

use std::time::Duration as StdDuration;

use chrono::Duration;

/// Environment override for the API base URL.
pub const API_BASE_ENV: &str = "KEYLINE_API_BASE";

/// Configuration for the authenticated API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the remote API, e.g. `https://api.example.com/api`.
    pub base_url: String,

    /// Per-request timeout.
    pub timeout: StdDuration,

    /// Lead time before actual expiry at which a credential is proactively
    /// refreshed.
    pub refresh_skew: Duration,

    /// Path of the refresh endpoint. A 401 from this path is terminal.
    pub refresh_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout: StdDuration::from_secs(10),
            refresh_skew: Duration::minutes(5),
            refresh_path: "/auth/refresh".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults with the base URL taken from `KEYLINE_API_BASE` when set.
    pub fn from_env() -> Self {
        match std::env::var(API_BASE_ENV) {
            Ok(base_url) if !base_url.trim().is_empty() => Self::new(base_url),
            _ => Self::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
        self.refresh_skew = skew;
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_api_contract() {
        let config = ClientConfig::default();

        assert_eq!(config.timeout, StdDuration::from_secs(10));
        assert_eq!(config.refresh_skew, Duration::minutes(5));
        assert_eq!(config.refresh_path, "/auth/refresh");
    }

    #[test]
    fn env_override_sets_the_base_url() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var(API_BASE_ENV, "https://env.example.com/api") };
        let config = ClientConfig::from_env();
        unsafe { std::env::remove_var(API_BASE_ENV) };

        assert_eq!(config.base_url, "https://env.example.com/api");

        let config = ClientConfig::from_env();
        assert_eq!(config.base_url, ClientConfig::default().base_url);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = ClientConfig::new("https://api.example.com")
            .with_refresh_skew(Duration::minutes(2))
            .with_refresh_path("/session/renew");

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.refresh_skew, Duration::minutes(2));
        assert_eq!(config.refresh_path, "/session/renew");
    }
}
