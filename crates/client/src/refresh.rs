//! Single-flight credential refresh.
//!
//! Any number of requests may discover an expiring credential at once; this
//! coordinator collapses that demand into one wire call. The state machine
//! is explicit: `Idle` or `InFlight` with a FIFO waiter list, guarded by one
//! mutex that is never held across IO.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Duration;
use serde_json::Value;
use tokio::sync::oneshot;

use keyline_auth::{Credential, SessionStore};
use keyline_core::{ApiError, ErrorBody, normalize_failure};

use crate::clock::Clock;
use crate::config::ClientConfig;
use crate::signals::{SessionSignal, SessionSignals};
use crate::transport::{HttpTransport, Method, RawRequest};

/// The one outcome shared by the performer and every queued waiter.
pub type RefreshOutcome = Result<Credential, ApiError>;

/// The raw refresh wire call.
///
/// Implementations return the new access token. They sit *below* the request
/// coordinator, so the refresh call is structurally exempt from
/// refresh-triggering logic.
#[async_trait]
pub trait RefreshTransport: Send + Sync {
    async fn refresh(&self) -> Result<String, ApiError>;
}

enum RefreshState {
    Idle,
    InFlight {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    store: Arc<SessionStore>,
    transport: Arc<dyn RefreshTransport>,
    clock: Arc<dyn Clock>,
    skew: Duration,
    signals: SessionSignals,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<SessionStore>,
        transport: Arc<dyn RefreshTransport>,
        clock: Arc<dyn Clock>,
        skew: Duration,
        signals: SessionSignals,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
            store,
            transport,
            clock,
            skew,
            signals,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return a usable credential, refreshing at most once system-wide to
    /// get there.
    ///
    /// `rejected` carries the token a 401 just bounced, when there is one.
    /// Proactive callers (`rejected == None`) short-circuit on a credential
    /// outside the skew window. Reactive callers short-circuit only when
    /// the stored credential already differs from the rejected one (some
    /// other request refreshed first): a server-rejected token is never
    /// handed back no matter how fresh it looks client-side.
    ///
    /// Callers arriving during an in-flight refresh suspend on a oneshot
    /// until the shared outcome lands; callers arriving after it completed
    /// take the fresh credential without queueing.
    pub async fn ensure_fresh(&self, rejected: Option<&str>) -> RefreshOutcome {
        enum Entry {
            Fresh(Credential),
            Waiter(oneshot::Receiver<RefreshOutcome>),
            Performer,
        }

        let entry = {
            let mut state = self.lock();
            match &mut *state {
                RefreshState::InFlight { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Entry::Waiter(rx)
                }
                RefreshState::Idle => {
                    let now = self.clock.now();
                    let reusable = self.store.current().filter(|cred| match rejected {
                        Some(token) => cred.access_token != token,
                        None => !cred.expires_within(now, self.skew),
                    });
                    match reusable {
                        Some(cred) => Entry::Fresh(cred),
                        None => {
                            *state = RefreshState::InFlight {
                                waiters: Vec::new(),
                            };
                            Entry::Performer
                        }
                    }
                }
            }
        };

        match entry {
            Entry::Fresh(credential) => Ok(credential),
            // A closed channel can only mean the performer vanished;
            // fail the waiter closed.
            Entry::Waiter(rx) => rx.await.unwrap_or(Err(ApiError::SessionExpired)),
            Entry::Performer => self.run_refresh().await,
        }
    }

    async fn run_refresh(&self) -> RefreshOutcome {
        let outcome = self.perform().await;

        // InFlight -> Idle and the waiter drain happen under one lock
        // acquisition: no waiter can observe Idle before the outcome exists.
        let waiters = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::InFlight { waiters } => waiters,
                RefreshState::Idle => Vec::new(),
            }
        };

        for waiter in waiters {
            // A dropped receiver means that caller abandoned its request;
            // its slot is drained regardless so the queue cannot wedge.
            let _ = waiter.send(outcome.clone());
        }

        outcome
    }

    async fn perform(&self) -> RefreshOutcome {
        tracing::debug!("refreshing access credential");

        match self.transport.refresh().await {
            Ok(token) => {
                let now = self.clock.now();
                let credential = Credential::from_token(token, now);
                if credential.is_expired(now) {
                    tracing::warn!("refresh returned an unusable token");
                    return self.expire_session();
                }
                if self.store.replace_credential(credential.clone()) {
                    tracing::debug!("access credential refreshed");
                    Ok(credential)
                } else {
                    // A logout raced the refresh; do not resurrect the session.
                    self.expire_session()
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "credential refresh failed");
                self.expire_session()
            }
        }
    }

    fn expire_session(&self) -> RefreshOutcome {
        self.store.clear();
        self.signals.emit(SessionSignal::RedirectToSignIn);
        Err(ApiError::SessionExpired)
    }

    #[cfg(test)]
    fn waiter_count(&self) -> usize {
        match &*self.lock() {
            RefreshState::InFlight { waiters } => waiters.len(),
            RefreshState::Idle => 0,
        }
    }
}

/// Production refresh call: `POST` to the refresh path over the raw
/// transport, relying on the cookie-backed session channel. Carries no
/// bearer header and no body.
pub struct WireRefresh {
    transport: Arc<dyn HttpTransport>,
    path: String,
}

impl WireRefresh {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &ClientConfig) -> Self {
        Self {
            transport,
            path: config.refresh_path.clone(),
        }
    }
}

#[async_trait]
impl RefreshTransport for WireRefresh {
    async fn refresh(&self) -> Result<String, ApiError> {
        let request = RawRequest {
            method: Method::Post,
            path: self.path.clone(),
            query: Vec::new(),
            body: None,
            bearer: None,
        };

        let response = self.transport.send(&request).await?;

        // The refresh endpoint's own rejection is terminal, never a trigger
        // for another refresh.
        if response.status == 401 {
            return Err(ApiError::SessionExpired);
        }
        if !response.is_success() {
            return Err(normalize_failure(
                response.status,
                &ErrorBody::parse(&response.body),
            ));
        }

        let value: Value = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        value
            .pointer("/data/access_token")
            .or_else(|| value.get("access_token"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Decode("refresh response missing access_token".to_string()))
    }
}
