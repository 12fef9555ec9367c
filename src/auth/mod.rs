//! Session state, token handling and cross-component auth signaling.

pub mod refresh;
pub mod session;
pub mod tokens;

pub use refresh::RefreshCoordinator;
pub use session::AuthSession;
pub use tokens::TokenStore;

use crate::api::User;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    /// The refresh flight failed; the session is no longer valid. Published
    /// by the refresh coordinator, consumed by the facade (and any guard
    /// that wants to redirect to sign-in).
    Invalidated,
}

/// Broadcast channel for session lifecycle events. Replaces the DOM custom
/// event the web client used for "logout happened" signaling.
#[derive(Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl AuthEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        // send only errs when nobody is subscribed, which is fine
        let _ = self.tx.send(event);
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Derived view of the session: who is signed in, and whether the initial
/// silent restore is still running.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub authenticated: bool,
    pub loading: bool,
}
