//! # Session Service
//!
//! Implements the [`AuthApi`] inbound port by wiring the session store, the
//! API client, the event channel and the access gate together.
//!
//! ## Settling a mutation
//!
//! ```text
//! begin() ──→ epoch N ──→ await response ──→ lock status
//!                                               │
//!                              epoch N still latest?
//!                               ├── no  → Superseded (nothing touched)
//!                               └── yes → store.set / status.fail
//! ```
//!
//! The epoch check and the store write happen under the same lock, so a
//! logout that lands while a login is in flight always wins.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::{ApiError, SessionClient};
use crate::domain::{
    validate_credentials, AccessGate, AuthStatus, Capability, Credentials, ErrorScope,
    GateDecision, ProfileForm, ProfileUpdate, RegistrationForm, RouteTable, Session,
    SessionConfig, SessionError, StatusTracker, ValidationError,
};
use crate::events::{ClearReason, SessionEvent, SessionEvents, SessionSubscription};
use crate::ports::{AuthApi, HttpTransport, SessionStorage};
use crate::store::SessionStore;

pub const LOGIN_FAILED: &str = "Login failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";
pub const PROFILE_UPDATE_FAILED: &str = "Profile update failed";
pub const PROFILE_LOAD_FAILED: &str = "Failed to load profile";

#[derive(Debug, Clone, Copy)]
enum Change {
    Established,
    Replaced,
}

impl Change {
    fn event(self, session: &Session) -> SessionEvent {
        let user_id = session.user_id();
        let role = session.role();
        match self {
            Change::Established => SessionEvent::Established { user_id, role },
            Change::Replaced => SessionEvent::Replaced { user_id, role },
        }
    }
}

/// Decrements the in-flight count if a mutation is dropped before settling.
struct InFlight<'a> {
    status: &'a Mutex<StatusTracker>,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.status.lock().finish();
        }
    }
}

/// Profile endpoints may answer with the user record alone. The credential
/// that authorized the call stays valid, so it is carried over.
fn keep_credential(session: Session, previous: String) -> Session {
    if session.bearer().is_some() {
        return session;
    }
    session.with_token(previous)
}

/// The session core.
pub struct SessionService {
    config: SessionConfig,
    store: Arc<SessionStore>,
    client: Arc<SessionClient>,
    events: Arc<SessionEvents>,
    gate: AccessGate,
    routes: RouteTable,
    status: Mutex<StatusTracker>,
    storage: Arc<dyn SessionStorage>,
    return_to_key: String,
    return_to: Mutex<Option<String>>,
}

impl SessionService {
    /// Builds the service with the default route table.
    ///
    /// The configuration is used as given; call
    /// [`SessionConfig::validate`] first.
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        Self::with_routes(config, transport, storage, RouteTable::default())
    }

    pub fn with_routes(
        config: SessionConfig,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn SessionStorage>,
        routes: RouteTable,
    ) -> Self {
        let events = Arc::new(SessionEvents::new());
        let store = Arc::new(SessionStore::new(storage.clone(), config.storage_key.clone()));
        let client = Arc::new(SessionClient::new(
            transport,
            store.clone(),
            events.clone(),
            config.login_path.clone(),
        ));

        Self {
            gate: AccessGate::new(config.login_path.clone()),
            return_to_key: format!("{}_return_to", config.storage_key),
            config,
            store,
            client,
            events,
            routes,
            status: Mutex::new(StatusTracker::new()),
            storage,
            return_to: Mutex::new(None),
        }
    }

    /// API client sharing this service's session, for directory calls.
    pub fn client(&self) -> &Arc<SessionClient> {
        &self.client
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn subscribe(&self) -> SessionSubscription {
        self.events.subscribe()
    }

    /// Loads the persisted session once.
    pub fn initialize(&self) -> AuthStatus {
        let mut status = self.status.lock();
        if !status.is_initialized() {
            if let Some(session) = self.store.load() {
                info!(user_id = ?session.user_id(), role = %session.role(), "Session restored");
                self.events.publish(SessionEvent::Restored {
                    user_id: session.user_id(),
                    role: session.role(),
                });
            } else {
                debug!("No persisted session");
            }
            status.mark_initialized();
        }
        status.snapshot(self.store.is_authenticated())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        let credentials = Credentials::new(email.trim(), password);
        validate_credentials(&credentials).map_err(|e| self.invalid(ErrorScope::Login, e))?;

        let client = &self.client;
        self.apply(ErrorScope::Login, LOGIN_FAILED, Change::Established, async move {
            client.login(&credentials).await
        })
        .await
    }

    pub async fn register(&self, form: RegistrationForm) -> Result<Session, SessionError> {
        let request = form
            .validate()
            .map_err(|e| self.invalid(ErrorScope::Registration, e))?;

        let client = &self.client;
        self.apply(
            ErrorScope::Registration,
            REGISTRATION_FAILED,
            Change::Established,
            async move { client.register(&request).await },
        )
        .await
    }

    /// Drops the session and invalidates every mutation in flight.
    pub fn logout(&self) {
        let mut status = self.status.lock();
        status.advance();
        if self.store.clear() {
            self.events.publish(SessionEvent::Cleared {
                reason: ClearReason::Logout,
            });
        }
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Session, SessionError> {
        let previous = self.require_credential()?;

        let client = &self.client;
        self.apply(
            ErrorScope::Profile,
            PROFILE_UPDATE_FAILED,
            Change::Replaced,
            async move {
                let session = client.update_profile(&update).await?;
                Ok(keep_credential(session, previous))
            },
        )
        .await
    }

    /// Validates a profile form and sends it as an update.
    pub async fn update_profile_form(&self, form: ProfileForm) -> Result<Session, SessionError> {
        let update = form
            .validate()
            .map_err(|e| self.invalid(ErrorScope::Profile, e))?;
        self.update_profile(update).await
    }

    pub async fn refresh_profile(&self) -> Result<Session, SessionError> {
        let previous = self.require_credential()?;

        let client = &self.client;
        self.apply(
            ErrorScope::Profile,
            PROFILE_LOAD_FAILED,
            Change::Replaced,
            async move {
                let session = client.get_profile().await?;
                Ok(keep_credential(session, previous))
            },
        )
        .await
    }

    /// A rejected form replaces whatever error the previous attempt left.
    fn invalid(&self, scope: ErrorScope, error: ValidationError) -> SessionError {
        let err = SessionError::Validation(error);
        self.status.lock().fail(scope, err.to_string());
        err
    }

    fn require_credential(&self) -> Result<String, SessionError> {
        match self.store.token() {
            Some(token) => Ok(token),
            None => {
                let err = SessionError::NotAuthenticated;
                self.status.lock().fail(ErrorScope::Profile, err.to_string());
                Err(err)
            }
        }
    }

    async fn apply<F>(
        &self,
        scope: ErrorScope,
        fallback: &str,
        change: Change,
        request: F,
    ) -> Result<Session, SessionError>
    where
        F: Future<Output = Result<Session, ApiError>>,
    {
        let epoch = self.status.lock().begin();
        let mut in_flight = InFlight {
            status: &self.status,
            settled: false,
        };

        let outcome = request.await;

        let mut status = self.status.lock();
        status.finish();
        in_flight.settled = true;

        if !status.is_current(epoch) {
            debug!(epoch = epoch.value(), ?scope, "Discarding stale response");
            return Err(SessionError::Superseded);
        }

        match outcome {
            Ok(session) => {
                if let Err(e) = self.store.set(session.clone()) {
                    warn!(error = %e, ?scope, "Failed to persist session");
                    let err = SessionError::Storage(e.to_string());
                    status.fail(scope, err.to_string());
                    return Err(err);
                }
                self.events.publish(change.event(&session));
                Ok(session)
            }
            Err(e) => {
                let err = e.into_session_error(fallback);
                debug!(error = %err, ?scope, "Session operation failed");
                status.fail(scope, err.to_string());
                Err(err)
            }
        }
    }

    /// Render-or-redirect for a view requiring `required`. A redirect
    /// records `requested_path` as the post-login destination.
    pub fn guard(&self, required: Capability, requested_path: &str) -> GateDecision {
        if self.config.reload_before_access_check {
            self.store.reload();
        }

        let session = self.store.current();
        let decision = self.gate.decide(required, session.as_ref(), requested_path);
        if let GateDecision::Redirect { return_to, .. } = &decision {
            debug!(path = %return_to, ?required, "Access denied, redirecting to login");
            self.remember_return_to(return_to);
        }
        decision
    }

    /// [`SessionService::guard`] with the capability looked up in the route table.
    pub fn guard_path(&self, path: &str) -> GateDecision {
        self.guard(self.routes.required_for(path), path)
    }

    /// The destination is also written to the session backend, so a login in
    /// a later process (or after a reload) still returns there.
    fn remember_return_to(&self, path: &str) {
        *self.return_to.lock() = Some(path.to_string());
        let encoded = Value::String(path.to_string()).to_string();
        if let Err(e) = self.storage.write(&self.return_to_key, &encoded) {
            warn!(key = %self.return_to_key, error = %e, "Failed to persist return destination");
        }
    }

    fn take_persisted_return_to(&self) -> Option<String> {
        let raw = match self.storage.read(&self.return_to_key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %self.return_to_key, error = %e, "Failed to read return destination");
                return None;
            }
        };
        if let Err(e) = self.storage.remove(&self.return_to_key) {
            warn!(key = %self.return_to_key, error = %e, "Failed to remove return destination");
        }
        serde_json::from_str::<String>(&raw).ok()
    }

    /// Where to go after a successful login. Consumes the recorded
    /// destination; falls back to the home path.
    pub fn take_return_to(&self) -> String {
        let held = self.return_to.lock().take();
        let persisted = self.take_persisted_return_to();
        held.or(persisted)
            .unwrap_or_else(|| self.config.home_path.clone())
    }

    pub fn current_session(&self) -> Option<Session> {
        self.store.current()
    }

    pub fn status(&self) -> AuthStatus {
        let status = self.status.lock();
        status.snapshot(self.store.is_authenticated())
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.store.current().is_some_and(|s| s.is_admin())
    }

    pub fn is_volunteer(&self) -> bool {
        self.store.current().is_some_and(|s| s.is_volunteer())
    }
}

#[async_trait]
impl AuthApi for SessionService {
    fn initialize(&self) -> AuthStatus {
        SessionService::initialize(self)
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        SessionService::login(self, email, password).await
    }

    async fn register(&self, form: RegistrationForm) -> Result<Session, SessionError> {
        SessionService::register(self, form).await
    }

    fn logout(&self) {
        SessionService::logout(self)
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<Session, SessionError> {
        SessionService::update_profile(self, update).await
    }

    async fn refresh_profile(&self) -> Result<Session, SessionError> {
        SessionService::refresh_profile(self).await
    }

    fn current_session(&self) -> Option<Session> {
        SessionService::current_session(self)
    }

    fn status(&self) -> AuthStatus {
        SessionService::status(self)
    }

    fn guard(&self, required: Capability, requested_path: &str) -> GateDecision {
        SessionService::guard(self, required, requested_path)
    }
}
