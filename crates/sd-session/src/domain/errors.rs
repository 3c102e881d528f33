//! Session error types.
//!
//! | Kind | Raised by | Effect on session |
//! |------|-----------|-------------------|
//! | `Validation` | form validation, before any request | none |
//! | `AuthFailure` | non-401 rejection from the server | none |
//! | `SessionExpired` | any 401 on a credentialed request | cleared |
//! | `Network` | transport failure | none |
//!
//! Only `SessionExpired` is allowed to force navigation.

use thiserror::Error;

/// Message reported for every expired-session failure.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Message reported when the server rejects a request without saying why.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong";

/// Message reported for transport failures. Details go to the log only.
pub const NETWORK_FAILURE_MESSAGE: &str = "Unable to reach the server. Please try again.";

/// Client-side validation failures. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("{field} is required")]
    MissingField { field: &'static str },
}

/// Errors surfaced by session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Rejected locally before any request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The server rejected the request (non-401).
    #[error("{message}")]
    AuthFailure { status: u16, message: String },

    /// A credentialed request came back 401. The session is gone.
    #[error("Your session has expired. Please log in again.")]
    SessionExpired,

    /// No response was received.
    #[error("{message}")]
    Network { message: String },

    /// The operation requires an authenticated session.
    #[error("You must be logged in to do that")]
    NotAuthenticated,

    /// A newer session operation started before this response arrived.
    #[error("Superseded by a newer session operation")]
    Superseded,

    /// A 2xx response body could not be decoded.
    #[error("Unexpected response from server: {0}")]
    Decode(String),

    /// The persistent session backend failed.
    #[error("Session storage failed: {0}")]
    Storage(String),
}

impl SessionError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, SessionError::SessionExpired)
    }
}
