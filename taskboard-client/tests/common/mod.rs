//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An in-process fake of the Taskboard REST backend (axum on 127.0.0.1:0)
//! - A fake media host under `/media`
//! - Request recording for asserting what was (or was not) sent
//! - Session helpers for signing in as a given role

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use taskboard_client::api::TaskboardApi;
use taskboard_client::config::Config;
use taskboard_shared::models::user::{Role, User};
use taskboard_shared::session::{MemoryPersistence, SessionStore};

/// Token the fake backend accepts
pub const VALID_TOKEN: &str = "valid-token";

/// Password every seeded user signs in with
pub const PASSWORD: &str = "secret1";

/// One request as the fake backend saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

/// Mutable state behind the fake backend
pub struct BackendState {
    pub requests: Mutex<Vec<RecordedRequest>>,
    pub projects: Mutex<Vec<Value>>,
    pub tasks: Mutex<Vec<Value>>,
    pub users: Mutex<Vec<Value>>,
    pub task_list_delay: Mutex<Duration>,
    pub fail_status_updates: AtomicBool,
    pub fail_uploads: AtomicBool,
    next_id: AtomicI64,
}

impl BackendState {
    fn seeded() -> Self {
        BackendState {
            requests: Mutex::new(Vec::new()),
            projects: Mutex::new(vec![
                json!({ "id": 1, "name": "Apollo" }),
                json!({ "id": 2, "name": "Gemini" }),
            ]),
            tasks: Mutex::new(vec![
                json!({
                    "id": 1,
                    "title": "Design landing page",
                    "status": "To Do",
                    "priority": "High",
                    "tags": "design,web",
                    "projectId": 1,
                    "authorUserId": 1,
                    "assignedUserId": 2
                }),
                json!({
                    "id": 2,
                    "title": "Build release pipeline",
                    "status": "In Progress",
                    "priority": "Medium",
                    "projectId": 2,
                    "authorUserId": 1
                }),
            ]),
            users: Mutex::new(vec![
                json!({ "userId": 1, "username": "alice", "role": "Admin", "organizationId": 1 }),
                json!({ "userId": 2, "username": "dave", "role": "Developer", "organizationId": 1 }),
                json!({ "userId": 3, "username": "vera", "role": "Viewer", "organizationId": 1 }),
                json!({ "userId": 4, "username": "paula", "role": "Project Manager", "organizationId": 1 }),
            ]),
            task_list_delay: Mutex::new(Duration::ZERO),
            fail_status_updates: AtomicBool::new(false),
            fail_uploads: AtomicBool::new(false),
            next_id: AtomicI64::new(100),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Number of requests with this method and path
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Number of requests with this method, path and exact query string
    pub fn count_query(&self, method: &str, path: &str, query: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path && r.query.as_deref() == Some(query))
            .count()
    }

    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn set_role(&self, username: &str, role: &str) {
        let mut users = self.users.lock().unwrap();
        for user in users.iter_mut() {
            if user["username"] == username {
                user["role"] = json!(role);
            }
        }
    }
}

/// Running fake backend
pub struct FakeBackend {
    pub state: Arc<BackendState>,
    pub base_url: String,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::seeded());
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        FakeBackend {
            state,
            base_url: format!("http://{}", addr),
        }
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub backend: FakeBackend,
    pub config: Config,
    pub api: TaskboardApi,
    pub persistence: Arc<MemoryPersistence>,
}

impl TestContext {
    /// Creates a context with an empty session
    pub async fn new() -> Self {
        let backend = FakeBackend::start().await;

        let mut config = Config::with_base_url(&backend.base_url);
        config.media.host = Some(format!("{}/media", backend.base_url));
        config.media.cloud_name = Some("demo".to_string());
        config.api.timeout_secs = 5;

        let persistence = Arc::new(MemoryPersistence::default());
        let session = SessionStore::load(persistence.clone());
        let api = TaskboardApi::from_config(&config, session).unwrap();

        TestContext {
            backend,
            config,
            api,
            persistence,
        }
    }

    /// Creates a context already signed in with the given role
    pub async fn signed_in(role: Role) -> Self {
        let ctx = Self::new().await;
        ctx.api
            .session()
            .sign_in(VALID_TOKEN.to_string(), user_with_role(role));
        ctx
    }

    pub fn state(&self) -> &BackendState {
        &self.backend.state
    }
}

/// Seeded user matching a role
pub fn user_with_role(role: Role) -> User {
    let (user_id, username) = match role {
        Role::Admin => (1, "alice"),
        Role::Developer => (2, "dave"),
        Role::Viewer => (3, "vera"),
        Role::ProjectManager => (4, "paula"),
    };
    User {
        user_id: Some(user_id),
        username: username.to_string(),
        role,
        profile_picture_url: None,
        organization_id: Some(1),
    }
}

/// Polls `check` until it holds or the timeout expires
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn not_found() -> Response {
    reply(StatusCode::NOT_FOUND, json!({ "message": "Not found" }))
}

async fn handle(
    State(state): State<Arc<BackendState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let is_multipart = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let json_body: Value = if is_multipart {
        Value::String(String::from_utf8_lossy(&body).into_owned())
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: authorization.clone(),
        body: json_body.clone(),
    });

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    if segments.first() == Some(&"media") {
        return media_upload(&state, &json_body);
    }

    if segments.first() != Some(&"auth")
        && authorization.as_deref() != Some(&format!("Bearer {}", VALID_TOKEN))
    {
        return reply(StatusCode::UNAUTHORIZED, json!({ "message": "Unauthorized" }));
    }

    match (method.as_str(), segments.as_slice()) {
        ("POST", ["auth", "signin"]) => sign_in(&state, &json_body),
        ("POST", ["auth", "signup"]) => {
            reply(StatusCode::CREATED, json!({ "message": "Organization created" }))
        }

        ("GET", ["projects"]) => reply(StatusCode::OK, Value::Array(state.projects.lock().unwrap().clone())),
        ("POST", ["projects"]) => {
            let mut project = json_body;
            project["id"] = json!(state.next_id());
            state.projects.lock().unwrap().push(project.clone());
            reply(StatusCode::CREATED, project)
        }

        ("GET", ["tasks"]) => {
            let delay = *state.task_list_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let project_id: Option<i64> = uri
                .query()
                .and_then(|q| q.strip_prefix("projectId="))
                .and_then(|id| id.parse().ok());
            let tasks: Vec<Value> = state
                .tasks
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t["projectId"].as_i64() == project_id)
                .cloned()
                .collect();
            reply(StatusCode::OK, Value::Array(tasks))
        }
        ("POST", ["tasks"]) => {
            let mut task = json_body;
            task["id"] = json!(state.next_id());
            state.tasks.lock().unwrap().push(task.clone());
            reply(StatusCode::CREATED, task)
        }
        ("POST", ["tasks", "comment"]) => reply(
            StatusCode::CREATED,
            json!({
                "id": state.next_id(),
                "text": json_body["newComment"],
                "taskId": json_body["taskId"],
                "userId": json_body["userId"],
            }),
        ),
        ("POST", ["tasks", "attachment"]) => reply(
            StatusCode::CREATED,
            json!({
                "id": state.next_id(),
                "fileURL": json_body["fileURL"],
                "fileName": "image.png",
                "taskId": json_body["taskId"],
                "uploadedById": json_body["userId"],
            }),
        ),
        ("GET", ["tasks", "user", id]) => {
            let user_id: Option<i64> = id.parse().ok();
            let tasks: Vec<Value> = state
                .tasks
                .lock()
                .unwrap()
                .iter()
                .filter(|t| {
                    t["authorUserId"].as_i64() == user_id || t["assignedUserId"].as_i64() == user_id
                })
                .cloned()
                .collect();
            reply(StatusCode::OK, Value::Array(tasks))
        }
        ("PATCH", ["tasks", id, "status"]) => {
            if state.fail_status_updates.load(Ordering::SeqCst) {
                return reply(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Database unavailable" }),
                );
            }
            let task_id: Option<i64> = id.parse().ok();
            let mut tasks = state.tasks.lock().unwrap();
            match tasks.iter_mut().find(|t| t["id"].as_i64() == task_id) {
                Some(task) => {
                    task["status"] = json_body["status"].clone();
                    reply(StatusCode::OK, task.clone())
                }
                None => not_found(),
            }
        }
        ("DELETE", ["tasks", id]) => {
            let task_id: Option<i64> = id.parse().ok();
            let mut tasks = state.tasks.lock().unwrap();
            match tasks.iter().position(|t| t["id"].as_i64() == task_id) {
                Some(index) => reply(StatusCode::OK, tasks.remove(index)),
                None => not_found(),
            }
        }

        ("GET", ["search"]) => {
            let term = uri
                .query()
                .and_then(|q| q.strip_prefix("query="))
                .unwrap_or_default()
                .to_lowercase();
            let tasks: Vec<Value> = state
                .tasks
                .lock()
                .unwrap()
                .iter()
                .filter(|t| {
                    t["title"]
                        .as_str()
                        .is_some_and(|title| title.to_lowercase().contains(&term))
                })
                .cloned()
                .collect();
            reply(StatusCode::OK, json!({ "tasks": tasks }))
        }

        ("GET", ["users"]) => reply(StatusCode::OK, Value::Array(state.users.lock().unwrap().clone())),
        ("GET", ["users", username]) => {
            let users = state.users.lock().unwrap();
            match users.iter().find(|u| u["username"] == *username) {
                Some(user) => reply(StatusCode::OK, user.clone()),
                None => not_found(),
            }
        }
        ("POST", ["users"]) => {
            let mut user = json_body;
            user["userId"] = json!(state.next_id());
            if let Some(fields) = user.as_object_mut() {
                fields.remove("password");
            }
            state.users.lock().unwrap().push(user.clone());
            reply(StatusCode::CREATED, user)
        }
        ("PUT", ["users"]) | ("PATCH", ["users"]) => {
            let mut users = state.users.lock().unwrap();
            let user_id = json_body["userId"].as_i64();
            match users.iter_mut().find(|u| u["userId"].as_i64() == user_id) {
                Some(user) => {
                    if let (Some(target), Some(fields)) = (user.as_object_mut(), json_body.as_object()) {
                        for (key, value) in fields {
                            if key != "password" {
                                target.insert(key.clone(), value.clone());
                            }
                        }
                    }
                    reply(StatusCode::OK, user.clone())
                }
                None => not_found(),
            }
        }

        _ => not_found(),
    }
}

fn sign_in(state: &BackendState, body: &Value) -> Response {
    let users = state.users.lock().unwrap();
    let user = users.iter().find(|u| u["username"] == body["username"]);
    match user {
        Some(user) if body["password"] == PASSWORD => {
            reply(StatusCode::OK, json!({ "data": [VALID_TOKEN, user] }))
        }
        _ => reply(StatusCode::UNAUTHORIZED, json!({ "message": "Invalid credentials" })),
    }
}

fn media_upload(state: &BackendState, body: &Value) -> Response {
    if state.fail_uploads.load(Ordering::SeqCst) {
        return reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": { "message": "Upload failed" } }),
        );
    }
    let raw = body.as_str().unwrap_or_default();
    if !raw.contains("upload_preset") || !raw.contains("Image_Preset") {
        return reply(StatusCode::BAD_REQUEST, json!({ "error": "missing preset" }));
    }
    let id = state.next_id();
    reply(
        StatusCode::OK,
        json!({ "secure_url": format!("https://cdn.test/{}.png", id) }),
    )
}
