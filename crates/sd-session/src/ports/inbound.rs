//! # Inbound Port - AuthApi
//!
//! Primary driving port used by the UI layer. Everything a view needs to
//! establish, observe, or drop a session goes through here.
//!
//! ## Operations
//!
//! | Method | Network | Touches session on |
//! |--------|---------|--------------------|
//! | `initialize` | no | startup (restores persisted record) |
//! | `login` | `POST /auth/login` | success |
//! | `register` | `POST /auth/register` | success |
//! | `logout` | no | always (clears) |
//! | `update_profile` | `PUT /auth/profile` | success (full replace) |
//! | `refresh_profile` | `GET /auth/profile` | success (full replace) |
//! | `guard` | no | never |

use async_trait::async_trait;

use crate::domain::{
    AuthStatus, Capability, GateDecision, ProfileUpdate, RegistrationForm, Session, SessionError,
};

/// Primary API for the session core.
///
/// # Example
///
/// ```rust,ignore
/// use sd_session::ports::AuthApi;
///
/// async fn sign_in(auth: &dyn AuthApi) {
///     auth.initialize();
///     match auth.login("a@x.org", "secret1").await {
///         Ok(session) => println!("welcome {}", session.full_name()),
///         Err(e) => eprintln!("{}", e),
///     }
/// }
/// ```
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Loads the persisted session. Runs once; later calls return the current status.
    fn initialize(&self) -> AuthStatus;

    /// Authenticates with email and password.
    ///
    /// # Errors
    /// - `Validation`: a field is empty (no request is sent)
    /// - `AuthFailure`: the server rejected the credentials
    /// - `Network`: the server could not be reached
    /// - `Superseded`: a newer auth operation started meanwhile
    async fn login(&self, email: &str, password: &str) -> Result<Session, SessionError>;

    /// Creates an account. Success also signs the new user in.
    async fn register(&self, form: RegistrationForm) -> Result<Session, SessionError>;

    /// Drops the session. Always succeeds and is idempotent.
    fn logout(&self);

    /// Sends a partial profile update and replaces the session with the
    /// server's full response.
    ///
    /// # Errors
    /// - `NotAuthenticated`: no session is held (no request is sent)
    /// - `SessionExpired`: the server answered 401
    async fn update_profile(&self, update: ProfileUpdate) -> Result<Session, SessionError>;

    /// Re-reads the profile from the server and replaces the session.
    async fn refresh_profile(&self) -> Result<Session, SessionError>;

    fn current_session(&self) -> Option<Session>;

    fn status(&self) -> AuthStatus;

    /// Render-or-redirect decision for a view.
    fn guard(&self, required: Capability, requested_path: &str) -> GateDecision;
}
