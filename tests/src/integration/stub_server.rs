//! In-process stand-in for the directory API.
//!
//! Implements just enough of `/api` to drive the session core end to end:
//! accounts and bearer tokens, profile reads and updates, public listings,
//! and an admin-only category create. Tokens can be revoked to simulate
//! server-side expiry.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct StubUser {
    id: String,
    full_name: String,
    email: String,
    password: String,
    city: Option<String>,
    role: String,
}

impl StubUser {
    fn to_json(&self) -> Value {
        let mut body = json!({
            "_id": self.id,
            "fullName": self.full_name,
            "email": self.email,
            "role": self.role,
            "createdAt": "2024-03-01T10:00:00.000Z",
        });
        if let Some(city) = &self.city {
            body["city"] = json!(city);
        }
        body
    }

    fn with_token(&self, token: &str) -> Value {
        let mut body = self.to_json();
        body["token"] = json!(token);
        body
    }
}

#[derive(Default)]
struct StubState {
    users: Mutex<HashMap<String, StubUser>>,
    tokens: Mutex<HashMap<String, String>>,
    categories: Mutex<Vec<Value>>,
    counter: AtomicU64,
    requests: AtomicU64,
}

impl StubState {
    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn issue_token(&self, email: &str) -> String {
        let token = format!("tok-{}", self.next());
        self.tokens.lock().insert(token.clone(), email.to_string());
        token
    }

    /// Resolves the bearer credential. `Err` is the 401 response.
    fn authenticate(&self, headers: &HeaderMap) -> Result<Option<StubUser>, Response> {
        let Some(header) = headers.get("authorization") else {
            return Ok(None);
        };
        let token = header
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix("Bearer "))
            .unwrap_or_default();

        let email = self.tokens.lock().get(token).cloned();
        let user = email.and_then(|email| self.users.lock().get(&email).cloned());
        match user {
            Some(user) => Ok(Some(user)),
            None => Err(error(StatusCode::UNAUTHORIZED, "Not authorized, token failed")),
        }
    }

    fn require_user(&self, headers: &HeaderMap) -> Result<StubUser, Response> {
        self.authenticate(headers)?
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Not authorized, no token"))
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn text(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

type Shared = State<Arc<StubState>>;

async fn health(State(state): Shared) -> Response {
    state.requests.fetch_add(1, Ordering::Relaxed);
    Json(json!({ "status": "ok", "message": "API is healthy" })).into_response()
}

async fn register(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.requests.fetch_add(1, Ordering::Relaxed);
    let (Some(full_name), Some(email), Some(password)) = (
        text(&body, "fullName"),
        text(&body, "email"),
        text(&body, "password"),
    ) else {
        return error(StatusCode::BAD_REQUEST, "Please provide all required fields");
    };

    let mut users = state.users.lock();
    if users.contains_key(&email) {
        return error(StatusCode::BAD_REQUEST, "User already exists");
    }

    let role = match text(&body, "role").as_deref() {
        Some("admin") => "admin",
        _ => "user",
    };
    let user = StubUser {
        id: format!("u{:04}", state.next()),
        full_name,
        email: email.clone(),
        password,
        city: text(&body, "city"),
        role: role.to_string(),
    };
    users.insert(email.clone(), user.clone());
    drop(users);

    let token = state.issue_token(&email);
    (StatusCode::CREATED, Json(user.with_token(&token))).into_response()
}

async fn login(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.requests.fetch_add(1, Ordering::Relaxed);
    let email = text(&body, "email").unwrap_or_default();
    let password = text(&body, "password").unwrap_or_default();

    let user = state.users.lock().get(&email).cloned();
    match user {
        Some(user) if user.password == password => {
            let token = state.issue_token(&email);
            Json(user.with_token(&token)).into_response()
        }
        _ => error(StatusCode::UNAUTHORIZED, "Invalid email or password"),
    }
}

async fn get_profile(State(state): Shared, headers: HeaderMap) -> Response {
    state.requests.fetch_add(1, Ordering::Relaxed);
    match state.require_user(&headers) {
        Ok(user) => Json(user.to_json()).into_response(),
        Err(response) => response,
    }
}

async fn update_profile(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.requests.fetch_add(1, Ordering::Relaxed);
    let user = match state.require_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let mut users = state.users.lock();
    if let Some(new_email) = text(&body, "email") {
        if new_email != user.email && users.contains_key(&new_email) {
            return error(StatusCode::BAD_REQUEST, "Email already in use");
        }
    }

    let Some(mut updated) = users.remove(&user.email) else {
        return error(StatusCode::NOT_FOUND, "User not found");
    };
    if let Some(full_name) = text(&body, "fullName") {
        updated.full_name = full_name;
    }
    if let Some(email) = text(&body, "email") {
        updated.email = email;
    }
    if let Some(city) = body.get("city").and_then(Value::as_str) {
        updated.city = (!city.is_empty()).then(|| city.to_string());
    }
    if let Some(password) = text(&body, "password") {
        updated.password = password;
    }
    users.insert(updated.email.clone(), updated.clone());
    drop(users);

    if updated.email != user.email {
        for email in state.tokens.lock().values_mut() {
            if *email == user.email {
                *email = updated.email.clone();
            }
        }
    }

    let token = state.issue_token(&updated.email);
    Json(updated.with_token(&token)).into_response()
}

async fn list_services(
    State(state): Shared,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.requests.fetch_add(1, Ordering::Relaxed);
    if let Err(response) = state.authenticate(&headers) {
        return response;
    }

    let services = vec![
        json!({"_id": "s1", "name": "Peer support group", "category": "c1"}),
        json!({"_id": "s2", "name": "Hospital transport", "category": "c2"}),
    ];
    let filtered: Vec<Value> = match params.get("category") {
        Some(category) => services
            .into_iter()
            .filter(|s| s["category"] == json!(category))
            .collect(),
        None => services,
    };
    Json(Value::Array(filtered)).into_response()
}

async fn list_categories(State(state): Shared, headers: HeaderMap) -> Response {
    state.requests.fetch_add(1, Ordering::Relaxed);
    if let Err(response) = state.authenticate(&headers) {
        return response;
    }
    Json(Value::Array(state.categories.lock().clone())).into_response()
}

async fn create_category(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.requests.fetch_add(1, Ordering::Relaxed);
    let user = match state.require_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if user.role != "admin" {
        return error(StatusCode::FORBIDDEN, "Not authorized as an admin");
    }

    let mut category = match body {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    category.insert("_id".to_string(), json!(format!("c{}", state.next())));
    let category = Value::Object(category);
    state.categories.lock().push(category.clone());
    (StatusCode::CREATED, Json(category)).into_response()
}

/// A running stub API. The server task is aborted on drop.
pub struct StubServer {
    addr: SocketAddr,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new()
            .route("/api/health", get(health))
            .route("/api/auth/register", post(register))
            .route("/api/auth/login", post(login))
            .route("/api/auth/profile", get(get_profile).put(update_profile))
            .route("/api/services", get(list_services))
            .route("/api/categories", get(list_categories).post(create_category))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// API root to configure the client with.
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Creates an account directly, bypassing the API.
    pub fn add_user(&self, email: &str, password: &str, role: &str) {
        let user = StubUser {
            id: format!("u{:04}", self.state.next()),
            full_name: "Aino Virtanen".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            city: Some("Tampere".to_string()),
            role: role.to_string(),
        };
        self.state.users.lock().insert(email.to_string(), user);
    }

    /// Invalidates every issued token, as a server-side expiry would.
    pub fn revoke_all_tokens(&self) {
        self.state.tokens.lock().clear();
    }

    pub fn request_count(&self) -> u64 {
        self.state.requests.load(Ordering::Relaxed)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
