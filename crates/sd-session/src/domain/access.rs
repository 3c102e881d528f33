//! Access gate for role-restricted views.
//!
//! The gate is a pure function of the held session and the required
//! capability. It never talks to the server and never re-validates a token;
//! the server stays the authority on whether a credential is still good.

use serde::{Deserialize, Serialize};

use super::entities::{Role, Session};

/// Access level required to view a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    #[default]
    Guest,
    Authenticated,
    Admin,
}

impl Capability {
    pub fn is_satisfied_by(self, session: Option<&Session>) -> bool {
        match self {
            Capability::Guest => true,
            Capability::Authenticated => session.is_some_and(Session::is_authenticated),
            Capability::Admin => {
                session.is_some_and(|s| s.is_authenticated() && s.role() == Role::Admin)
            }
        }
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Render,
    /// Send the user to `to` and come back to `return_to` after login.
    Redirect { to: String, return_to: String },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Render)
    }
}

/// Render-or-redirect policy.
#[derive(Debug, Clone)]
pub struct AccessGate {
    login_path: String,
}

impl AccessGate {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn decide(
        &self,
        required: Capability,
        session: Option<&Session>,
        requested_path: &str,
    ) -> GateDecision {
        if required.is_satisfied_by(session) {
            return GateDecision::Render;
        }
        GateDecision::Redirect {
            to: self.login_path.clone(),
            return_to: requested_path.to_string(),
        }
    }
}

/// Maps view paths to the capability they require.
///
/// The longest matching prefix wins; unmatched paths are public.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<(String, Capability)>,
}

impl RouteTable {
    /// An empty table: every path is public.
    pub fn empty() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn with_route(mut self, path: impl Into<String>, capability: Capability) -> Self {
        self.routes.push((path.into(), capability));
        self
    }

    pub fn required_for(&self, path: &str) -> Capability {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        self.routes
            .iter()
            .filter(|(route, _)| matches_prefix(route, path))
            .max_by_key(|(route, _)| route.len())
            .map(|(_, capability)| *capability)
            .unwrap_or(Capability::Guest)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::empty()
            .with_route("/profile", Capability::Authenticated)
            .with_route("/admin/categories", Capability::Admin)
            .with_route("/admin/services", Capability::Admin)
    }
}

fn matches_prefix(route: &str, path: &str) -> bool {
    let route = route.trim_end_matches('/');
    match path.strip_prefix(route) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
