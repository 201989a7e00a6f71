//! Session signals for the UI layer.
//!
//! The coordinator never navigates; it announces that navigation is needed
//! and the composition root's subscriber performs it.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// The session is terminally unusable; send the user to sign-in.
    RedirectToSignIn,
}

/// Sender half of the session signal channel.
#[derive(Debug, Clone)]
pub struct SessionSignals {
    tx: watch::Sender<Option<SessionSignal>>,
}

impl SessionSignals {
    pub fn channel() -> (Self, watch::Receiver<Option<SessionSignal>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }

    pub fn emit(&self, signal: SessionSignal) {
        // No subscriber is fine (e.g. headless tests); the send result is
        // intentionally ignored.
        let _ = self.tx.send(Some(signal));
    }
}
