//! Auth endpoints: login, me, logout.
//!
//! Thin service over [`ApiClient`]. On success the session store is updated
//! as one atomic pair; the token's `exp` is read advisorily for expiry
//! while roles and permissions always come from the response body.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};

use keyline_auth::{Credential, Permission, Principal, Role};
use keyline_core::{ApiError, Envelope};

use crate::client::{ApiClient, ApiRequest};

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub username: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginPayload {
    pub user: UserProfile,
    pub access_token: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MePayload {
    pub email: String,
    pub username: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

pub struct AuthApi {
    client: Arc<ApiClient>,
}

impl AuthApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Authenticate and establish the session pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<Principal, ApiError> {
        let request = ApiRequest::post("/auth/login")
            .public()
            .with_body(json!({ "email": email, "password": password }));
        let envelope: Envelope<LoginPayload> = self.client.execute(request).await?;
        let payload = envelope.data;

        let credential = Credential::from_token(payload.access_token, self.client.now());
        let principal = Principal {
            email: payload.user.email,
            username: payload.user.username,
            display_name: payload.user.display_name,
            roles: payload.roles.into_iter().map(Role::new).collect(),
            permissions: payload.permissions.into_iter().map(Permission::new).collect(),
        };
        self.client.session().set(credential, principal.clone());

        tracing::info!(username = %principal.username, "signed in");
        Ok(principal)
    }

    /// Re-fetch the authoritative principal and re-pair it with the
    /// current credential.
    pub async fn me(&self) -> Result<Principal, ApiError> {
        let envelope: Envelope<MePayload> =
            self.client.execute(ApiRequest::post("/auth/me")).await?;
        let payload = envelope.data;

        let principal = Principal {
            email: payload.email,
            username: payload.username,
            display_name: payload.display_name,
            roles: payload.roles.into_iter().map(Role::new).collect(),
            permissions: payload.permissions.into_iter().map(Permission::new).collect(),
        };

        if !self.client.session().replace_principal(principal.clone()) {
            // Signed out while the call was in flight; a principal without
            // a credential is never stored.
            tracing::debug!("me() resolved without a live session");
        }
        Ok(principal)
    }

    /// Best-effort remote sign-out; the local session is cleared even when
    /// the wire call fails.
    pub async fn logout(&self) {
        let result: Result<Envelope<Value>, ApiError> =
            self.client.execute(ApiRequest::post("/auth/logout")).await;
        if let Err(err) = result {
            tracing::warn!(error = %err, "logout call failed, clearing session anyway");
        }
        self.client.session().clear();
        tracing::info!("signed out");
    }
}
