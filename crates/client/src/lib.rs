//! `keyline-client`
//!
//! **Responsibility:** the authenticated request coordinator.
//!
//! This crate provides:
//! - Credential attachment on every outbound call
//! - Proactive refresh when a credential is expiring soon
//! - Single-flight refresh coordination across concurrent requests
//! - Exactly-one replay of a 401-rejected request
//! - Session clearing plus a sign-in redirect signal on terminal failure
//!
//! The client is a **thin shell** around the remote API; UI navigation is
//! delegated to whoever consumes the [`SessionSignal`] channel.

pub mod auth_api;
pub mod client;
pub mod clock;
pub mod config;
pub mod refresh;
pub mod signals;
pub mod transport;

pub use auth_api::AuthApi;
pub use client::{ApiClient, ApiRequest, CredentialPolicy};
pub use clock::{Clock, SystemClock};
pub use config::ClientConfig;
pub use refresh::{RefreshCoordinator, RefreshTransport};
pub use signals::{SessionSignal, SessionSignals};
pub use transport::{HttpTransport, Method, RawRequest, RawResponse, ReqwestTransport};
