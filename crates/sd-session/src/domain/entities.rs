//! Core session entities.
//!
//! The `Session` is the only persistent entity on the client. It is stored
//! exactly as the server returned it. Nothing in here derives `role` or any
//! other field locally.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Opaque user identifier issued by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account role. The authoritative value always comes from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Volunteer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Volunteer => "volunteer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field names the server has used for the user identifier, in lookup order.
const USER_ID_FIELDS: [&str; 3] = ["_id", "userId", "id"];

/// A server payload that cannot be held as a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionRecordError {
    #[error("session record has no role")]
    MissingRole,
    #[error("invalid role in session record: {0}")]
    InvalidRole(String),
}

/// The authenticated identity record held by the client.
///
/// The record is kept exactly as the server returned it and serializes back
/// to the same JSON object. Only `role` must be present; every other field
/// is read on demand.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Session {
    record: Map<String, Value>,
    role: Role,
}

impl Session {
    pub fn from_record(record: Map<String, Value>) -> Result<Self, SessionRecordError> {
        let role = match record.get("role") {
            None | Some(Value::Null) => return Err(SessionRecordError::MissingRole),
            Some(value) => Role::deserialize(value)
                .map_err(|_| SessionRecordError::InvalidRole(value.to_string()))?,
        };
        Ok(Self { record, role })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.record.get(name)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.record.get(name).and_then(Value::as_str)
    }

    pub fn user_id(&self) -> Option<UserId> {
        USER_ID_FIELDS
            .iter()
            .find_map(|name| self.text(name))
            .map(UserId::new)
    }

    pub fn full_name(&self) -> &str {
        self.text("fullName").unwrap_or_default()
    }

    pub fn email(&self) -> &str {
        self.text("email").unwrap_or_default()
    }

    pub fn city(&self) -> Option<&str> {
        self.text("city")
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Raw token field, which may be empty.
    pub fn token(&self) -> Option<&str> {
        self.text("token")
    }

    /// Replaces the token field, leaving the rest of the record alone.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.record
            .insert("token".to_string(), Value::String(token.into()));
        self
    }

    /// Bearer credential, if present and non-empty.
    pub fn bearer(&self) -> Option<&str> {
        self.token().filter(|t| !t.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.role == Role::Admin
    }

    /// Volunteers and admins both see volunteer features.
    pub fn is_volunteer(&self) -> bool {
        self.is_authenticated() && matches!(self.role, Role::Volunteer | Role::Admin)
    }
}

impl TryFrom<Map<String, Value>> for Session {
    type Error = SessionRecordError;

    fn try_from(record: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_record(record)
    }
}

impl From<Session> for Map<String, Value> {
    fn from(session: Session) -> Self {
        session.record
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut record = self.record.clone();
        if let Some(token) = record.get_mut("token") {
            *token = Value::String("<redacted>".to_string());
        }
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("record", &record)
            .finish()
    }
}

/// Login request body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration request body, as sent to `POST /auth/register`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("city", &self.city)
            .finish()
    }
}

/// Partial profile update for `PUT /auth/profile`. Absent fields are not sent.
#[derive(Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfileUpdate {
    pub fn city(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ProfileUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileUpdate")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("city", &self.city)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_session(role: Role, token: Option<&str>) -> Session {
    let mut record = serde_json::json!({
        "_id": "64b7f0c2a1",
        "fullName": "Aino Virtanen",
        "email": "a@x.org",
        "city": "Tampere",
        "role": role.as_str(),
    });
    if let Some(token) = token {
        record["token"] = Value::String(token.to_string());
    }
    serde_json::from_value(record).expect("test session record")
}
