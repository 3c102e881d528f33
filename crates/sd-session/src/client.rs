//! # Session Client
//!
//! Request wrapper around the [`HttpTransport`] port. Every call goes through
//! [`SessionClient::request`], which:
//!
//! 1. attaches the held bearer credential, if any;
//! 2. on `401`, clears the session that sent the rejected credential before
//!    looking at the body;
//! 3. on any other non-2xx, extracts the server's `{message}`;
//! 4. on 2xx, parses the body as JSON (an empty body is `null`).
//!
//! A 401 on a request that carried a credential becomes
//! [`ApiError::SessionExpired`] and publishes [`SessionEvent::Expired`] so
//! the single top-level handler can navigate. A 401 without a credential
//! (a failed login) is an ordinary rejection.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{
    Credentials, ProfileUpdate, RegistrationRequest, Session, SessionError,
    GENERIC_FAILURE_MESSAGE, NETWORK_FAILURE_MESSAGE,
};
use crate::events::{ClearReason, SessionEvent, SessionEvents};
use crate::ports::{ApiRequest, ApiResponse, HttpMethod, HttpTransport};
use crate::store::SessionStore;

/// Errors returned by API calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// A credentialed request was answered with 401. The session is gone.
    #[error("Your session has expired. Please log in again.")]
    SessionExpired,

    /// The server answered with a non-2xx status.
    #[error("{}", .message.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE))]
    Rejected { status: u16, message: Option<String> },

    /// No response was received.
    #[error("Request failed: {0}")]
    Transport(String),

    /// A 2xx body did not have the expected shape.
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Converts to the session-level error, using `fallback` when the server
    /// gave no message.
    pub fn into_session_error(self, fallback: &str) -> SessionError {
        match self {
            ApiError::SessionExpired => SessionError::SessionExpired,
            ApiError::Rejected { status, message } => SessionError::AuthFailure {
                status,
                message: message.unwrap_or_else(|| fallback.to_string()),
            },
            ApiError::Transport(_) => SessionError::Network {
                message: NETWORK_FAILURE_MESSAGE.to_string(),
            },
            ApiError::Decode(detail) => SessionError::Decode(detail),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

/// API client bound to the session store.
pub struct SessionClient {
    transport: Arc<dyn HttpTransport>,
    store: Arc<SessionStore>,
    events: Arc<SessionEvents>,
    login_path: String,
}

impl SessionClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<SessionStore>,
        events: Arc<SessionEvents>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            store,
            events,
            login_path: login_path.into(),
        }
    }

    /// Sends a request with the held credential attached.
    pub async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let bearer = self.store.token();
        let credentialed = bearer.is_some();
        let request = request.with_bearer(bearer.clone());
        let method = request.method;
        let path = request.path.clone();

        debug!(%method, path = %path, credentialed, "Sending API request");

        let response = self.transport.send(request).await.map_err(|e| {
            warn!(%method, path = %path, error = %e, "API request failed");
            ApiError::Transport(e.message)
        })?;

        if response.status == 401 {
            return Err(self.unauthorized(&path, bearer.as_deref(), &response));
        }

        if !response.is_success() {
            let message = error_message(&response.body);
            debug!(%method, path = %path, status = response.status, "API request rejected");
            return Err(ApiError::Rejected {
                status: response.status,
                message,
            });
        }

        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn unauthorized(&self, path: &str, sent: Option<&str>, response: &ApiResponse) -> ApiError {
        // Only the session that owned the rejected credential is dropped.
        let cleared = self.store.clear_if_credential(sent);

        if sent.is_none() {
            debug!(path = %path, "Unauthenticated request rejected with 401");
            return ApiError::Rejected {
                status: 401,
                message: error_message(&response.body),
            };
        }

        if !cleared {
            debug!(path = %path, "Stale credential rejected; current session kept");
            return ApiError::SessionExpired;
        }

        warn!(path = %path, "Credential rejected, session expired");
        self.events.publish(SessionEvent::Cleared {
            reason: ClearReason::Unauthorized,
        });
        self.events.publish(SessionEvent::Expired {
            login_path: self.login_path.clone(),
        });
        ApiError::SessionExpired
    }

    async fn request_as<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let value = self.request(request).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(ApiRequest::new(HttpMethod::Get, path)).await
    }

    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        let query = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.request(ApiRequest::new(HttpMethod::Get, path).with_query(query))
            .await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.request(ApiRequest::new(HttpMethod::Post, path).with_body(body))
            .await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.request(ApiRequest::new(HttpMethod::Put, path).with_body(body))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.request(ApiRequest::new(HttpMethod::Delete, path)).await
    }

    /// `POST /auth/login`. Does not touch the store on success.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let body = serde_json::to_value(credentials).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.request_as(ApiRequest::new(HttpMethod::Post, "/auth/login").with_body(body))
            .await
    }

    /// `POST /auth/register`.
    pub async fn register(&self, registration: &RegistrationRequest) -> Result<Session, ApiError> {
        let body =
            serde_json::to_value(registration).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.request_as(ApiRequest::new(HttpMethod::Post, "/auth/register").with_body(body))
            .await
    }

    /// Registers an admin account. The caller's session is left alone; the
    /// returned record belongs to the new account.
    pub async fn register_admin(
        &self,
        registration: &RegistrationRequest,
    ) -> Result<Session, ApiError> {
        let mut body =
            serde_json::to_value(registration).map_err(|e| ApiError::Decode(e.to_string()))?;
        if let Value::Object(fields) = &mut body {
            fields.insert("role".to_string(), json!("admin"));
        }
        self.request_as(ApiRequest::new(HttpMethod::Post, "/auth/register").with_body(body))
            .await
    }

    /// `GET /auth/profile`.
    pub async fn get_profile(&self) -> Result<Session, ApiError> {
        self.request_as(ApiRequest::new(HttpMethod::Get, "/auth/profile"))
            .await
    }

    /// `PUT /auth/profile` with only the fields present in `update`.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Session, ApiError> {
        let body = serde_json::to_value(update).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.request_as(ApiRequest::new(HttpMethod::Put, "/auth/profile").with_body(body))
            .await
    }
}
