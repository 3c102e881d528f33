//! # Authentication State Machine
//!
//! ```text
//! [Uninitialized] ──initialize──→ [Anonymous | Authenticated]
//!                                        │
//!                               mutation starts
//!                                        ↓
//!                                    [Pending] ──settles──→ [Anonymous | Authenticated]
//! ```
//!
//! The error slot is orthogonal to the phase: a failed login leaves an
//! existing session in place and records the error next to it. The next
//! operation clears it.
//!
//! Every mutation takes an [`Epoch`]. Only the response belonging to the
//! latest epoch may touch the session; older ones are stale.

use serde::Serialize;

/// Externally visible phase of the authentication lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    /// Persisted state has not been loaded yet.
    Uninitialized,
    /// No session, nothing in flight.
    Anonymous,
    /// At least one auth mutation is in flight.
    Pending,
    /// A session with a token is held, nothing in flight.
    Authenticated,
}

/// Which form an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    Login,
    Registration,
    Profile,
}

/// Error shown next to the form identified by `scope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusError {
    pub scope: ErrorScope,
    pub message: String,
}

/// Snapshot of the state machine for UI rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub phase: AuthPhase,
    pub loading: bool,
    pub error: Option<StatusError>,
}

/// Sequence number of an auth mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Epoch(u64);

impl Epoch {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Mutable bookkeeping behind [`AuthStatus`].
///
/// Holds no session data; the authenticated flag is supplied by the caller
/// from the session store when a snapshot is taken.
#[derive(Debug, Default)]
pub struct StatusTracker {
    initialized: bool,
    in_flight: usize,
    latest: u64,
    error: Option<StatusError>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Starts an asynchronous mutation: new epoch, error cleared, loading.
    pub fn begin(&mut self) -> Epoch {
        self.in_flight += 1;
        self.advance()
    }

    /// Starts a synchronous mutation (logout). Invalidates everything in flight.
    pub fn advance(&mut self) -> Epoch {
        self.latest += 1;
        self.error = None;
        Epoch(self.latest)
    }

    /// Marks one asynchronous mutation as settled.
    pub fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn is_current(&self, epoch: Epoch) -> bool {
        epoch.0 == self.latest
    }

    pub fn fail(&mut self, scope: ErrorScope, message: impl Into<String>) {
        self.error = Some(StatusError {
            scope,
            message: message.into(),
        });
    }

    pub fn error(&self) -> Option<&StatusError> {
        self.error.as_ref()
    }

    pub fn snapshot(&self, authenticated: bool) -> AuthStatus {
        let phase = if !self.initialized {
            AuthPhase::Uninitialized
        } else if self.in_flight > 0 {
            AuthPhase::Pending
        } else if authenticated {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Anonymous
        };

        AuthStatus {
            phase,
            loading: !self.initialized || self.in_flight > 0,
            error: self.error.clone(),
        }
    }
}
