//! The outbound-call decorator.
//!
//! Every wrapped call gets the current credential attached, a proactive
//! refresh when that credential is expiring soon, and exactly one replay
//! after a 401. Other failures (403, 404, 422, 5xx, network)
//! pass through normalized, untouched and unretried.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use keyline_auth::SessionStore;
use keyline_core::{ApiError, Envelope, ErrorBody, normalize_failure};

use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::refresh::{RefreshCoordinator, WireRefresh};
use crate::signals::{SessionSignal, SessionSignals};
use crate::transport::{HttpTransport, Method, RawRequest, RawResponse, ReqwestTransport};

/// Whether a call carries the session credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPolicy {
    /// Attach the current credential, refreshing as needed.
    Attach,
    /// Login/register-class call: pass through unmodified, including its
    /// 401s. There is no session to refresh on its behalf.
    Skip,
}

/// One logical outbound call, before credential attachment.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub policy: CredentialPolicy,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            policy: CredentialPolicy::Attach,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn public(mut self) -> Self {
        self.policy = CredentialPolicy::Skip;
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The authenticated request coordinator.
///
/// Owns no global state: the session store, refresh coordinator, and signal
/// channel are constructed here and shared by `Arc`, so one composition
/// root can hold the whole client and tests can build isolated instances.
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    store: Arc<SessionStore>,
    refresh: Arc<RefreshCoordinator>,
    clock: Arc<dyn Clock>,
    signals: SessionSignals,
    config: ClientConfig,
}

impl ApiClient {
    /// Assemble a client over an explicit transport and clock.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> (Arc<Self>, watch::Receiver<Option<SessionSignal>>) {
        let store = Arc::new(SessionStore::new());
        let (signals, signal_rx) = SessionSignals::channel();
        let wire = Arc::new(WireRefresh::new(transport.clone(), &config));
        let refresh = Arc::new(RefreshCoordinator::new(
            store.clone(),
            wire,
            clock.clone(),
            config.refresh_skew,
            signals.clone(),
        ));

        let client = Arc::new(Self {
            transport,
            store,
            refresh,
            clock,
            signals,
            config,
        });
        (client, signal_rx)
    }

    /// Production assembly: `reqwest` transport and the system clock.
    pub fn from_config(
        config: ClientConfig,
    ) -> Result<(Arc<Self>, watch::Receiver<Option<SessionSignal>>), ApiError> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::new(config, transport, Arc::new(SystemClock)))
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Issue a call and decode its envelope.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Envelope<T>, ApiError> {
        let response = self.send_coordinated(&request).await?;

        let value: Value = if response.body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))?
        };
        Envelope::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ApiError> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
    ) -> Result<Envelope<T>, ApiError> {
        self.execute(ApiRequest::post(path).with_body(body)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
    ) -> Result<Envelope<T>, ApiError> {
        self.execute(ApiRequest::put(path).with_body(body)).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
    ) -> Result<Envelope<T>, ApiError> {
        self.execute(ApiRequest::patch(path).with_body(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ApiError> {
        self.execute(ApiRequest::delete(path)).await
    }

    async fn send_coordinated(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        if request.policy == CredentialPolicy::Skip {
            let response = self.dispatch(request, None).await?;
            return self.accept(response);
        }

        let now = self.clock.now();
        let bearer = match self.store.current() {
            // No credential: send bare, the remote side enforces presence.
            None => None,
            Some(cred) if cred.expires_within(now, self.config.refresh_skew) => {
                Some(self.refresh.ensure_fresh(None).await?.access_token)
            }
            Some(cred) => Some(cred.access_token),
        };

        let response = self.dispatch(request, bearer.as_deref()).await?;
        if response.status != 401 {
            return self.accept(response);
        }

        // A 401 from the refresh endpoint itself is terminal. Recursion is
        // ruled out by endpoint identity, not by counting attempts.
        if request.path == self.config.refresh_path {
            return Err(self.expire_session());
        }

        tracing::debug!(path = %request.path, "credential rejected, refreshing and replaying once");
        let credential = self.refresh.ensure_fresh(bearer.as_deref()).await?;
        let replay = self.dispatch(request, Some(&credential.access_token)).await?;
        if replay.status == 401 {
            // One replay per logical request; a second rejection is terminal.
            return Err(self.expire_session());
        }
        self.accept(replay)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<RawResponse, ApiError> {
        let raw = RawRequest {
            method: request.method,
            path: request.path.clone(),
            query: request.query.clone(),
            body: request.body.clone(),
            bearer: bearer.map(str::to_string),
        };
        self.transport.send(&raw).await
    }

    fn accept(&self, response: RawResponse) -> Result<RawResponse, ApiError> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(normalize_failure(
                response.status,
                &ErrorBody::parse(&response.body),
            ))
        }
    }

    fn expire_session(&self) -> ApiError {
        self.store.clear();
        self.signals.emit(SessionSignal::RedirectToSignIn);
        ApiError::SessionExpired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_default_to_credentialed() {
        let request = ApiRequest::get("/things").with_query("page", "2");

        assert_eq!(request.policy, CredentialPolicy::Attach);
        assert_eq!(request.query, vec![("page".to_string(), "2".to_string())]);
    }

    #[test]
    fn public_requests_skip_the_credential() {
        let request = ApiRequest::post("/auth/login").public();
        assert_eq!(request.policy, CredentialPolicy::Skip);
    }
}
