//! Injected wall clock.
//!
//! The auth crate keeps time as an explicit parameter; this trait is the
//! client-side source of that parameter, so tests can drive expiry without
//! real waiting.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
