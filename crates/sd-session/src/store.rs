//! # Session Store
//!
//! Single owner of the current session. Keeps an in-memory copy and mirrors
//! every change to a persistent [`SessionStorage`] backend under one key.
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Memory and backend agree after every successful call | `set` writes the backend before memory, under the write lock |
//! | A malformed persisted record never surfaces | `load` removes it and starts anonymous |
//! | `clear` always empties memory | backend failures are logged, not returned |
//! | A rejected credential never clears a newer session | `clear_if_credential` compares under the write lock |

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::Session;
use crate::ports::{SessionStorage, StorageError};

/// In-memory session mirrored to a persistent backend.
pub struct SessionStore {
    backend: Arc<dyn SessionStorage>,
    key: String,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Creates an empty store. Call [`SessionStore::load`] to pick up a
    /// persisted record.
    pub fn new(backend: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            current: RwLock::new(None),
        }
    }

    /// Reads the persisted record into memory and returns it.
    ///
    /// A record that fails to decode is removed. A backend read failure is
    /// treated as "no session".
    pub fn load(&self) -> Option<Session> {
        let loaded = self.read_backend();
        *self.current.write() = loaded.clone();
        loaded
    }

    /// Re-reads the backend. Returns true if the in-memory session changed.
    pub fn reload(&self) -> bool {
        let loaded = self.read_backend();
        let mut current = self.current.write();
        if *current == loaded {
            return false;
        }
        debug!(
            had_session = current.is_some(),
            has_session = loaded.is_some(),
            "Session changed in storage"
        );
        *current = loaded;
        true
    }

    fn read_backend(&self) -> Option<Session> {
        let raw = match self.backend.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read persisted session");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding malformed persisted session");
                if let Err(e) = self.backend.remove(&self.key) {
                    warn!(key = %self.key, error = %e, "Failed to remove malformed session");
                }
                None
            }
        }
    }

    /// Replaces the session wholesale and persists it.
    ///
    /// # Errors
    /// Returns the backend error; memory is left unchanged in that case.
    pub fn set(&self, session: Session) -> Result<(), StorageError> {
        let encoded =
            serde_json::to_string(&session).map_err(|e| StorageError::Io(e.to_string()))?;

        let mut current = self.current.write();
        self.backend.write(&self.key, &encoded)?;
        info!(user_id = ?session.user_id(), role = %session.role(), "Session stored");
        *current = Some(session);
        Ok(())
    }

    /// Drops the session. Returns whether one was held.
    pub fn clear(&self) -> bool {
        let mut current = self.current.write();
        if let Err(e) = self.backend.remove(&self.key) {
            warn!(key = %self.key, error = %e, "Failed to remove persisted session");
        }
        let had = current.take().is_some();
        if had {
            info!("Session cleared");
        }
        had
    }

    /// Drops the session only if it still carries `sent`, the credential a
    /// rejected request went out with. Returns whether a session was dropped.
    ///
    /// A session installed after that request was issued has a different
    /// credential and is kept.
    pub fn clear_if_credential(&self, sent: Option<&str>) -> bool {
        let mut current = self.current.write();
        let held = current.as_ref().map(Session::bearer);
        match held {
            Some(bearer) if bearer == sent => {}
            Some(_) => {
                debug!("Rejected credential no longer held; session kept");
                return false;
            }
            None => return false,
        }
        if let Err(e) = self.backend.remove(&self.key) {
            warn!(key = %self.key, error = %e, "Failed to remove persisted session");
        }
        *current = None;
        info!("Session cleared");
        true
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// Bearer credential of the held session, if any.
    pub fn token(&self) -> Option<String> {
        self.current
            .read()
            .as_ref()
            .and_then(|s| s.bearer().map(str::to_string))
    }

    pub fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .as_ref()
            .is_some_and(Session::is_authenticated)
    }
}
