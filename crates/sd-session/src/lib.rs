//! # sd-session - Session and Authorization Core
//!
//! Client-side session handling for the support directory: who is signed
//! in, what they may see, and what happens when the server stops accepting
//! their credential.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         SessionService                           │
//! │                    (implements ports::AuthApi)                   │
//! │                                                                  │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐  │
//! │  │ StatusTracker│   │  AccessGate  │   │     RouteTable       │  │
//! │  │ phase/epochs │   │ render|redir │   │ path → capability    │  │
//! │  └──────────────┘   └──────────────┘   └──────────────────────┘  │
//! │          │                                                       │
//! │  ┌───────┴──────┐  401 → clear  ┌──────────────┐                 │
//! │  │ SessionClient│ ────────────→ │ SessionStore │                 │
//! │  └───────┬──────┘               └──────┬───────┘                 │
//! └──────────┼─────────────────────────────┼─────────────────────────┘
//!            │ HttpTransport               │ SessionStorage
//!            ▼                             ▼
//!     ReqwestTransport           MemoryStorage | FileStorage
//!
//!   SessionEvents ──→ ExpiryHandler ──→ Navigator (login entry point)
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Where |
//! |-----------|-------|
//! | Authenticated iff a session with a non-empty token is held | `Session::is_authenticated` |
//! | The session is only ever replaced wholesale with what the server returned | `SessionStore::set` |
//! | A 401 clears the session that sent the rejected credential, before the body is read | `SessionClient::request`, `SessionStore::clear_if_credential` |
//! | Only `SessionEvent::Expired` leads to navigation | `ExpiryHandler` |
//! | A response from a superseded mutation never touches the session | `SessionService` epochs, credential-matched clear |
//! | The persisted record is the server's object, field for field | `Session` keeps the raw record |
//! | Access checks never call the server | `AccessGate::decide` |
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use sd_session::{FileStorage, ReqwestTransport, SessionConfig, SessionService};
//!
//! let config = SessionConfig::from_env();
//! config.validate()?;
//! let transport = Arc::new(ReqwestTransport::new(&config)?);
//! let storage = Arc::new(FileStorage::open(".sd-session")?);
//! let service = SessionService::new(config, transport, storage);
//!
//! service.initialize();
//! service.login("a@x.org", "secret1").await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod client;
pub mod directory;
pub mod domain;
pub mod events;
pub mod ports;
pub mod service;
pub mod store;

pub use adapters::{FileStorage, MemoryStorage, ReqwestTransport};
pub use client::{ApiError, SessionClient};
pub use directory::DirectoryResource;
pub use domain::{
    AccessGate, AuthPhase, AuthStatus, Capability, ConfigError, ErrorScope, GateDecision,
    ProfileForm, ProfileUpdate, RegistrationForm, Role, RouteTable, Session, SessionConfig,
    SessionError, SessionRecordError, UserId, ValidationError,
};
pub use events::{ClearReason, ExpiryHandler, SessionEvent, SessionEvents, SessionSubscription};
pub use ports::{AuthApi, HttpTransport, Navigator, SessionStorage, StorageError, TransportError};
pub use service::SessionService;
pub use store::SessionStore;
