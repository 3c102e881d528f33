//! # Session Events
//!
//! Subscribe/notify channel for session changes. Views observe the session
//! through a [`SessionSubscription`] instead of polling shared state.
//!
//! ```text
//! ┌──────────────┐  publish()   ┌───────────────┐  recv()   ┌──────────────┐
//! │ SessionClient│ ───────────→ │ SessionEvents │ ────────→ │ ExpiryHandler│
//! │ SessionService              │  (broadcast)  │ ────────→ │ views        │
//! └──────────────┘              └───────────────┘           └──────────────┘
//! ```
//!
//! Publishing never blocks and never fails; with no subscribers the event is
//! dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::{Role, UserId};
use crate::ports::Navigator;

/// Maximum events buffered per subscriber before the oldest are dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Why a session was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    /// The user logged out.
    Logout,
    /// The server answered 401.
    Unauthorized,
}

/// A change to the held session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A persisted session was loaded at startup.
    Restored { user_id: Option<UserId>, role: Role },
    /// Login or registration produced a new session.
    Established { user_id: Option<UserId>, role: Role },
    /// The session was replaced by a profile update or refresh.
    Replaced { user_id: Option<UserId>, role: Role },
    /// The session was dropped.
    Cleared { reason: ClearReason },
    /// A credentialed request hit a 401. The top-level handler should
    /// navigate to `login_path`.
    Expired { login_path: String },
}

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Every publisher is gone.
    #[error("Session event channel closed")]
    Closed,
}

/// Broadcast channel for session events.
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
    published: AtomicU64,
}

impl SessionEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: SessionEvent) -> usize {
        let seq = self.published.fetch_add(1, Ordering::Relaxed) + 1;
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(seq, receivers, "Session event published");
                receivers
            }
            Err(broadcast::error::SendError(event)) => {
                debug!(seq, event = ?event, "Session event dropped (no subscribers)");
                0
            }
        }
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of [`SessionEvents`].
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionEvent>,
}

impl SessionSubscription {
    /// Waits for the next event. Lagging subscribers skip what they missed.
    pub async fn recv(&mut self) -> Result<SessionEvent, SubscriptionError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    /// Returns the next already-published event without waiting.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }
}

/// The single top-level handler allowed to navigate on session expiry.
pub struct ExpiryHandler {
    subscription: SessionSubscription,
    navigator: Arc<dyn Navigator>,
}

impl ExpiryHandler {
    pub fn new(subscription: SessionSubscription, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            subscription,
            navigator,
        }
    }

    /// Handles one event; returns true if it caused navigation.
    pub fn handle(&self, event: &SessionEvent) -> bool {
        if let SessionEvent::Expired { login_path } = event {
            warn!(login_path = %login_path, "Session expired, navigating to login");
            self.navigator.navigate(login_path);
            return true;
        }
        false
    }

    /// Processes everything already published. Returns the navigation count.
    pub fn drain_pending(&mut self) -> usize {
        let mut navigated = 0;
        while let Some(event) = self.subscription.try_recv() {
            if self.handle(&event) {
                navigated += 1;
            }
        }
        navigated
    }

    /// Runs until the event channel closes.
    pub async fn run(mut self) {
        while let Ok(event) = self.subscription.recv().await {
            self.handle(&event);
        }
        debug!("Expiry handler stopped");
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
