//! Outbound (Driven) ports for the session core.
//!
//! These traits define what the core needs from its surroundings: a way to
//! send HTTP requests, a persistent key-value area, and a way to navigate.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// HTTP methods used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound API request, relative to the API root.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path below the API root, e.g. `/auth/login`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Bearer credential to present, if any.
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_bearer(mut self, bearer: Option<String>) -> Self {
        self.bearer = bearer;
        self
    }
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Raw response: status plus unparsed body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Sends requests to the API server.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Persistent key-value area errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

/// A durable key-value area that survives restarts.
///
/// Values are opaque strings; the session store owns the encoding.
pub trait SessionStorage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Performs view navigation on behalf of the top-level handler.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Scripted transport for testing.
#[cfg(test)]
pub struct MockTransport {
    replies: parking_lot::Mutex<std::collections::VecDeque<MockReply>>,
    requests: parking_lot::Mutex<Vec<ApiRequest>>,
}

/// One scripted reply. A gated reply waits until the gate is notified.
#[cfg(test)]
pub struct MockReply {
    result: Result<ApiResponse, TransportError>,
    gate: Option<std::sync::Arc<tokio::sync::Notify>>,
}

#[cfg(test)]
impl MockReply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            result: Ok(ApiResponse::json(status, &body)),
            gate: None,
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            result: Ok(ApiResponse::new(status, body)),
            gate: None,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            result: Err(TransportError::new("connection refused")),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: std::sync::Arc<tokio::sync::Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            requests: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(self, reply: MockReply) -> Self {
        self.push(reply);
        self
    }

    pub fn push(&self, reply: MockReply) {
        self.replies.lock().push_back(reply);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[cfg(test)]
#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let reply = self.replies.lock().pop_front();
        self.requests.lock().push(request);
        let reply = reply.expect("MockTransport: no scripted reply left");
        if let Some(gate) = reply.gate {
            gate.notified().await;
        }
        reply.result
    }
}

/// Navigator that records every navigation, for testing.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNavigator {
    visited: parking_lot::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingNavigator {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }
}

#[cfg(test)]
impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visited.lock().push(path.to_string());
    }
}
