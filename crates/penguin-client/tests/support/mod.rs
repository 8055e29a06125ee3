//! In-process fake of the user and chat services, served by axum on an
//! ephemeral port. Every request is recorded before it is handled.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use penguin_client::{AppState, ClientConfig, HttpChatApi, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub chat_id_header: Option<String>,
}

pub struct Backend {
    pub requests: Mutex<Vec<Recorded>>,
    /// Body of `GET /api/accessChat`.
    pub chats: Mutex<Value>,
    /// Body of `GET /api/getMessagesGroupedByChat`.
    pub messages: Mutex<Value>,
    /// Bodies received by `POST /api/sendMessage`.
    pub sent: Mutex<Vec<Value>>,
    /// Answer login with plain text plus a `token` cookie.
    pub cookie_login: AtomicBool,
    /// Reject every bearer token.
    pub tokens_revoked: AtomicBool,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            chats: Mutex::new(json!({ "message": "no chats found for the user" })),
            messages: Mutex::new(Value::Null),
            sent: Mutex::new(Vec::new()),
            cookie_login: AtomicBool::new(false),
            tokens_revoked: AtomicBool::new(false),
        }
    }
}

impl Backend {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Append a message the way the chat service stores it.
    pub fn add_message(&self, id: i64, chat_id: i64, text: &str) {
        let mut messages = self.messages.lock().unwrap();
        if !messages.is_object() {
            *messages = json!({});
        }
        let entry = messages
            .as_object_mut()
            .unwrap()
            .entry(chat_id.to_string())
            .or_insert_with(|| json!([]));
        entry.as_array_mut().unwrap().push(json!({
            "message_id": id,
            "chat_id": chat_id,
            "user_id": 1,
            "username": "ana",
            "message_text": text,
            "sent_at": "2024-11-02T10:00:00Z",
        }));
    }
}

pub struct FakeBackend {
    pub backend: Arc<Backend>,
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let backend = Arc::new(Backend::default());

        let app = Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/api/accessChat", get(access_chat))
            .route("/api/createChat", post(create_chat))
            .route("/api/getMessagesGroupedByChat", get(grouped_messages))
            .route("/api/sendMessage", post(send_message))
            .route("/api/getChatMembers", get(chat_members))
            .route("/api/addUserToChat", post(add_user))
            .route("/api/getAllUsers", get(all_users))
            .layer(middleware::from_fn_with_state(backend.clone(), record))
            .with_state(backend.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { backend, addr, task }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            user_service_url: format!("http://{}", self.addr),
            chat_service_url: format!("http://{}/api/", self.addr),
            poll_interval: Duration::from_millis(50),
            max_backoff: Duration::from_millis(200),
            request_timeout: Duration::from_secs(5),
            ..ClientConfig::default()
        }
    }

    pub fn api(&self) -> HttpChatApi {
        HttpChatApi::new(&self.config()).unwrap()
    }

    /// Client state talking to this backend, with an in-memory session.
    pub fn app_state(&self) -> AppState {
        AppState::new(
            SessionStore::in_memory(),
            Arc::new(self.api()),
            self.config(),
        )
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn record(State(backend): State<Arc<Backend>>, req: Request, next: Next) -> Response {
    let recorded = {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Recorded {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            authorization: header("authorization"),
            chat_id_header: header("chat_id"),
        }
    };
    backend.requests.lock().unwrap().push(recorded);
    next.run(req).await
}

/// Accepts `Bearer jwt-*` unless tokens have been revoked.
fn authorize(backend: &Backend, headers: &HeaderMap) -> Result<(), Response> {
    let valid = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token.starts_with("jwt-"));

    if !valid || backend.tokens_revoked.load(Ordering::SeqCst) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid token" })),
        )
            .into_response());
    }
    Ok(())
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["username"] == "taken" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "username already exists" })),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully!" })),
    )
        .into_response()
}

async fn login(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default().to_string();
    if body["password"] != "secret" {
        return (StatusCode::UNAUTHORIZED, "Invalid credentials\n").into_response();
    }

    let token = format!("jwt-{username}");
    if backend.cookie_login.load(Ordering::SeqCst) {
        (
            [(header::SET_COOKIE, format!("token={token}; Path=/; HttpOnly"))],
            "Login successful\n",
        )
            .into_response()
    } else {
        Json(json!({ "message": "Login successful", "token": token })).into_response()
    }
}

async fn access_chat(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&backend, &headers) {
        return resp;
    }
    Json(backend.chats.lock().unwrap().clone()).into_response()
}

async fn create_chat(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&backend, &headers) {
        return resp;
    }
    let name = body["chat_name"].clone();
    let mut chats = backend.chats.lock().unwrap();
    if !chats.is_array() {
        *chats = json!([]);
    }
    let list = chats.as_array_mut().unwrap();
    let id = list.len() as i64 + 1;
    list.push(json!({ "id": id, "chat_name": name, "owner_id": 1 }));
    (
        StatusCode::CREATED,
        Json(json!({ "message": "chat created successfully" })),
    )
        .into_response()
}

async fn grouped_messages(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&backend, &headers) {
        return resp;
    }
    Json(backend.messages.lock().unwrap().clone()).into_response()
}

async fn send_message(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&backend, &headers) {
        return resp;
    }
    let next_id = backend.sent.lock().unwrap().len() as i64 + 100;
    let chat_id = body["chat_id"].as_i64().unwrap_or_default();
    let text = body["message_text"].as_str().unwrap_or_default().to_string();
    backend.add_message(next_id, chat_id, &text);
    backend.sent.lock().unwrap().push(body);
    Json(json!({ "message": "Message sent" })).into_response()
}

async fn chat_members(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&backend, &headers) {
        return resp;
    }
    let chat_id = headers
        .get("chat_id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());
    if chat_id.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid chat ID" })),
        )
            .into_response();
    }
    Json(json!({
        "owner_id": 1,
        "owner_username": "ana",
        "participants": [
            { "UserID": 1, "Username": "ana" },
            { "UserID": 2, "Username": "bob" },
        ],
    }))
    .into_response()
}

async fn add_user(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&backend, &headers) {
        return resp;
    }
    if body["chat_id"] != 7 {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "only the chat owner can add users" })),
        )
            .into_response();
    }
    Json(json!({ "message": "User added to chat" })).into_response()
}

async fn all_users(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&backend, &headers) {
        return resp;
    }
    Json(json!(["ana", "bob", "cy"])).into_response()
}
