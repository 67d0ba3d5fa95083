//! Shared test fixtures: a scriptable stub backend speaking the wire
//! protocol the client expects, bound to an ephemeral port per test.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::models::{Project, Task};

const VALID_TOKEN: &str = "Bearer tok1";

#[derive(Default)]
struct BackendState {
    projects: Vec<Project>,
    next_id: i64,
    next_task_id: i64,
    list_calls: usize,
    fail_lists: bool,
    fail_deletes: bool,
    save_failure: Option<(u16, Value)>,
    save_delay: Option<Duration>,
}

type Shared = Arc<Mutex<BackendState>>;

pub struct StubBackend {
    addr: SocketAddr,
    state: Shared,
}

impl StubBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState {
            next_id: 1,
            next_task_id: 100,
            ..BackendState::default()
        }));

        let app = Router::new()
            .route("/login", post(login))
            .route("/projects", get(list_projects).post(create_project))
            .route("/projects/:id", put(update_project).delete(delete_project))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Replace the stored projects and bump the id counter past them.
    pub fn seed(&self, projects: Vec<Project>) {
        let mut state = self.state.lock();
        state.next_id = projects.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        state.projects = projects;
    }

    pub fn projects(&self) -> Vec<Project> {
        self.state.lock().projects.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().list_calls
    }

    pub fn fail_lists(&self, on: bool) {
        self.state.lock().fail_lists = on;
    }

    pub fn fail_deletes(&self, on: bool) {
        self.state.lock().fail_deletes = on;
    }

    /// Make every save answer `status` with `body` instead of persisting.
    pub fn set_save_failure(&self, status: u16, body: Value) {
        self.state.lock().save_failure = Some((status, body));
    }

    /// Delay every save before answering, to let tests overlap requests.
    pub fn set_save_delay(&self, delay: Duration) {
        self.state.lock().save_delay = Some(delay);
    }
}

fn unauthorized(headers: &HeaderMap) -> Option<Response> {
    let ok = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(VALID_TOKEN);
    (!ok).then(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Unauthenticated."})),
        )
            .into_response()
    })
}

fn failure(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

/// Build the canonical record the backend would persist, assigning ids to
/// tasks that arrived without one.
fn materialize(state: &mut BackendState, id: i64, body: &Value) -> Project {
    let mut tasks: Vec<Task> = body
        .get("tasks")
        .cloned()
        .map(|value| serde_json::from_value(value).unwrap_or_default())
        .unwrap_or_default();
    for task in &mut tasks {
        if task.id.is_none() {
            task.id = Some(state.next_task_id);
            state.next_task_id += 1;
        }
    }

    Project {
        id,
        name: body
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        description: body
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        user_id: Some(1),
        tasks,
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["email"] == "a@b.com" && body["password"] == "x" {
        let payload = json!({
            "data": {
                "access_token": "tok1",
                "user": {"id": 1, "name": "A", "email": "a@b.com", "milestone": "M1"}
            }
        });
        Json(payload).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn list_projects(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Some(response) = unauthorized(&headers) {
        return response;
    }
    let mut state = state.lock();
    state.list_calls += 1;
    if state.fail_lists {
        return failure(500, json!({"error": "boom"}));
    }
    Json(json!({"data": state.projects})).into_response()
}

async fn create_project(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(response) = unauthorized(&headers) {
        return response;
    }
    let delay = state.lock().save_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let save_failure = state.lock().save_failure.clone();
    if let Some((status, body)) = save_failure {
        return failure(status, body);
    }

    let mut state = state.lock();
    let id = state.next_id;
    state.next_id += 1;
    let project = materialize(&mut state, id, &body);
    state.projects.push(project.clone());
    Json(json!({"data": project})).into_response()
}

async fn update_project(
    Path(id): Path<i64>,
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(response) = unauthorized(&headers) {
        return response;
    }
    let delay = state.lock().save_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let save_failure = state.lock().save_failure.clone();
    if let Some((status, body)) = save_failure {
        return failure(status, body);
    }

    let mut state = state.lock();
    let project = materialize(&mut state, id, &body);
    match state.projects.iter_mut().find(|p| p.id == id) {
        Some(slot) => *slot = project.clone(),
        None => state.projects.push(project.clone()),
    }
    Json(json!({"data": project})).into_response()
}

async fn delete_project(
    Path(id): Path<i64>,
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Response {
    if let Some(response) = unauthorized(&headers) {
        return response;
    }
    let mut state = state.lock();
    if state.fail_deletes {
        return failure(500, json!({"error": "Something went wrong"}));
    }
    state.projects.retain(|p| p.id != id);
    StatusCode::NO_CONTENT.into_response()
}
