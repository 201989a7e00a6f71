//! In-memory session store.
//!
//! The store is pure state plus expiry predicates; it performs no IO and
//! owns no clock. The access credential lives only here and is never
//! persisted client-side (the refresh channel is cookie-backed).

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use crate::{Credential, Principal};

/// A credential paired with its principal.
///
/// The pairing is the store's atomicity unit: observers see either both set
/// or both absent, never a mix.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub credential: Credential,
    pub principal: Principal,
}

/// Shared holder of the current session.
///
/// `set`/`clear`/`replace_credential` are atomic with respect to concurrent
/// reads. Readers receive cloned snapshots, so no lock is held across
/// caller code.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session(&self) -> Option<Session> {
        self.read().clone()
    }

    pub fn current(&self) -> Option<Credential> {
        self.read().as_ref().map(|s| s.credential.clone())
    }

    pub fn principal(&self) -> Option<Principal> {
        self.read().as_ref().map(|s| s.principal.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Atomically replace the session pair.
    pub fn set(&self, credential: Credential, principal: Principal) {
        *self.write() = Some(Session {
            credential,
            principal,
        });
    }

    /// Swap in a refreshed credential, keeping the paired principal.
    ///
    /// Returns `false` when the store is anonymous (a logout raced the
    /// refresh); the caller must treat that as an expired session rather
    /// than resurrect a principal-less credential.
    pub fn replace_credential(&self, credential: Credential) -> bool {
        let mut guard = self.write();
        match guard.as_mut() {
            Some(session) => {
                session.credential = credential;
                true
            }
            None => false,
        }
    }

    /// Swap in a re-fetched principal, keeping the paired credential.
    pub fn replace_principal(&self, principal: Principal) -> bool {
        let mut guard = self.write();
        match guard.as_mut() {
            Some(session) => {
                session.principal = principal;
                true
            }
            None => false,
        }
    }

    /// Reset to anonymous. Idempotent.
    pub fn clear(&self) {
        *self.write() = None;
    }

    /// An absent credential is always expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.read().as_ref() {
            Some(session) => session.credential.is_expired(now),
            None => true,
        }
    }

    /// An absent credential is always expiring soon.
    pub fn is_expiring_soon(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        match self.read().as_ref() {
            Some(session) => session.credential.expires_within(now, skew),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Permission, Role};

    fn principal(name: &str) -> Principal {
        Principal {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            display_name: name.to_string(),
            roles: vec![Role::new("user")],
            permissions: [Permission::new("things.read")].into_iter().collect(),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn credential_and_principal_share_presence() {
        let store = SessionStore::new();
        assert!(store.current().is_none());
        assert!(store.principal().is_none());

        store.set(Credential::new("t", at(1_000)), principal("ada"));
        assert!(store.current().is_some());
        assert!(store.principal().is_some());

        store.clear();
        assert!(store.current().is_none());
        assert!(store.principal().is_none());

        // Idempotent.
        store.clear();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn refresh_keeps_the_paired_principal() {
        let store = SessionStore::new();
        store.set(Credential::new("old", at(1_000)), principal("ada"));

        assert!(store.replace_credential(Credential::new("new", at(2_000))));
        assert_eq!(store.current().unwrap().access_token, "new");
        assert_eq!(store.principal().unwrap().username, "ada");
    }

    #[test]
    fn refresh_into_anonymous_store_is_refused() {
        let store = SessionStore::new();
        assert!(!store.replace_credential(Credential::new("new", at(2_000))));
        assert!(store.current().is_none());
    }

    #[test]
    fn absent_credential_is_always_expired() {
        let store = SessionStore::new();
        assert!(store.is_expired(at(0)));
        assert!(store.is_expiring_soon(at(0), Duration::seconds(300)));

        store.set(Credential::new("t", at(1_000)), principal("ada"));
        assert!(!store.is_expired(at(500)));
        assert!(store.is_expiring_soon(at(800), Duration::seconds(300)));
    }
}
