//! Integration tests for the HTTP remote store.
//!
//! Each test starts an in-process fake of the Ultimate Todo service on an
//! ephemeral port and drives a `SyncEngine` against it over real HTTP.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use rstest::rstest;
use serde_json::{Value, json};

use common::{TOKEN, server_id, token};
use ultimate_todo::auth::{BearerToken, StaticCredentials};
use ultimate_todo::cache::LocalCache;
use ultimate_todo::domain::{Task, TaskChanges, TaskDraft};
use ultimate_todo::error::SyncError;
use ultimate_todo::remote::{AuthClient, HttpRemoteStore, RemoteError, RemoteStore};
use ultimate_todo::sync::{Notification, RecordingNotifier, SyncEngine};

// =============================================================================
// Fake Service
// =============================================================================

#[derive(Default)]
struct Service {
    todos: Mutex<Vec<Value>>,
    next_id: Mutex<Vec<&'static str>>,
}

type Shared = Arc<Service>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(BearerToken::from_authorization_header)
        .is_some_and(|bearer| bearer.expose() == TOKEN)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Not authorized, no token" }))).into_response()
}

async fn list_todos(State(service): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "data": *service.todos.lock() })).into_response()
}

async fn create_todo(
    State(service): State<Shared>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let id = service.next_id.lock().pop().unwrap_or("generated");
    body["_id"] = json!(id);
    body["isCompleted"] = json!(false);
    body["createdAt"] = json!("2024-01-01T00:00:00Z");
    service.todos.lock().insert(0, body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update_todo(
    State(service): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(changes): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id == "boom" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Internal Server Error" })),
        )
            .into_response();
    }
    let mut todos = service.todos.lock();
    let Some(todo) = todos.iter_mut().find(|todo| todo["_id"] == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Todo not found" }))).into_response();
    };
    if let (Some(target), Some(fields)) = (todo.as_object_mut(), changes.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    Json(json!({ "data": todo })).into_response()
}

async fn delete_todo(
    State(service): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    service.todos.lock().retain(|todo| todo["_id"] != id);
    Json(json!({ "message": "Todo removed" })).into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "correct horse" {
        Json(json!({ "token": TOKEN })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials" }))).into_response()
    }
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!([])).into_response()
}

/// Serves the fake on an ephemeral port and returns its base URL.
async fn spawn_service(service: Shared) -> String {
    let app = Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/{id}", patch(update_todo).delete(delete_todo))
        .route("/api/auth/login", post(login))
        .route("/api/goals", get(slow))
        .with_state(service);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{address}")
}

struct Harness {
    engine: SyncEngine<Task>,
    service: Shared,
    notifier: Arc<RecordingNotifier>,
}

async fn harness(todos: Vec<Value>, next_ids: Vec<&'static str>) -> Harness {
    let service = Arc::new(Service {
        todos: Mutex::new(todos),
        next_id: Mutex::new(next_ids),
    });
    let base_url = spawn_service(service.clone()).await;
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = SyncEngine::new(
        Arc::new(HttpRemoteStore::<Task>::new(&base_url, Duration::from_secs(5))),
        LocalCache::in_memory("http"),
        Arc::new(StaticCredentials::new(token())),
    )
    .with_notifier(notifier.clone());
    Harness {
        engine,
        service,
        notifier,
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_create_adopts_server_assigned_id() {
    let harness = harness(Vec::new(), vec!["abc"]).await;

    let created = harness.engine.create(TaskDraft::new("Buy milk")).await.unwrap();

    assert_eq!(created.id, server_id("abc"));
    let ids: Vec<String> = harness
        .engine
        .snapshot()
        .iter()
        .map(|task| task.id.to_string())
        .collect();
    assert_eq!(ids, vec!["abc"]);
    assert_eq!(harness.engine.cached_snapshot(), harness.engine.snapshot());
    assert_eq!(harness.service.todos.lock()[0]["title"], "Buy milk");
}

#[rstest]
#[tokio::test]
async fn test_update_rejected_with_500_rolls_back() {
    let harness = harness(
        vec![json!({ "_id": "boom", "title": "Buy milk", "isCompleted": false })],
        Vec::new(),
    )
    .await;
    harness.engine.refresh().await.unwrap();

    let changes = TaskChanges {
        title: Some("Buy oat milk".to_string()),
        ..TaskChanges::default()
    };
    let result = harness.engine.update(&server_id("boom"), changes).await;

    assert!(matches!(
        result,
        Err(SyncError::RemoteRejected(RemoteError::Rejected { status: 500, .. }))
    ));
    assert_eq!(harness.engine.get(&server_id("boom")).unwrap().title, "Buy milk");
    assert_eq!(
        harness.notifier.errors(),
        vec![Notification::error("Internal Server Error")]
    );
}

#[rstest]
#[tokio::test]
async fn test_delete_removes_remote_record() {
    let harness = harness(
        vec![json!({ "_id": "abc", "title": "Buy milk", "isCompleted": false })],
        Vec::new(),
    )
    .await;
    harness.engine.refresh().await.unwrap();

    harness.engine.delete(&server_id("abc")).await.unwrap();

    assert!(harness.engine.is_empty());
    assert!(harness.engine.cached_snapshot().is_empty());
    assert!(harness.service.todos.lock().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_ids_are_escaped_in_paths() {
    let harness = harness(
        vec![
            json!({ "_id": "a/b c", "title": "Buy milk", "isCompleted": false }),
            json!({ "_id": "a", "title": "Walk dog", "isCompleted": false }),
        ],
        Vec::new(),
    )
    .await;
    harness.engine.refresh().await.unwrap();

    let toggled = harness.engine.toggle(&server_id("a/b c")).await.unwrap();
    harness.engine.delete(&server_id("a/b c")).await.unwrap();

    assert!(toggled.is_completed);
    let remaining = harness.service.todos.lock().clone();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["_id"], "a");
    assert_eq!(remaining[0]["isCompleted"], false);
}

#[rstest]
#[tokio::test]
async fn test_toggle_sends_only_the_flag() {
    let harness = harness(
        vec![json!({ "_id": "abc", "title": "Buy milk", "isCompleted": false, "priority": "high" })],
        Vec::new(),
    )
    .await;
    harness.engine.refresh().await.unwrap();

    let toggled = harness.engine.toggle(&server_id("abc")).await.unwrap();

    assert!(toggled.is_completed);
    let stored = harness.service.todos.lock()[0].clone();
    assert_eq!(stored["isCompleted"], true);
    assert_eq!(stored["priority"], "high");
}

// =============================================================================
// Transport Behavior
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_wrong_token_is_unauthorized() {
    let service = Arc::new(Service::default());
    let base_url = spawn_service(service).await;
    let store = HttpRemoteStore::<Task>::new(&base_url, Duration::from_secs(5));

    let result = store.list(&BearerToken::new("stolen").unwrap()).await;

    assert_eq!(
        result,
        Err(RemoteError::Unauthorized("Not authorized, no token".to_string()))
    );
}

#[rstest]
#[tokio::test]
async fn test_slow_response_times_out() {
    let base_url = spawn_service(Arc::new(Service::default())).await;
    let store = HttpRemoteStore::<ultimate_todo::domain::Goal>::new(
        &base_url,
        Duration::from_millis(100),
    );

    let result = store.list(&token()).await;

    assert_eq!(result, Err(RemoteError::Timeout(100)));
}

#[rstest]
#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let store = HttpRemoteStore::<Task>::new("http://127.0.0.1:1", Duration::from_secs(1));

    let result = store.list(&token()).await;

    assert!(matches!(result, Err(RemoteError::Transport(_))));
}

#[rstest]
#[case("correct horse", true)]
#[case("battery staple", false)]
#[tokio::test]
async fn test_login_returns_token(#[case] password: &str, #[case] accepted: bool) {
    let base_url = spawn_service(Arc::new(Service::default())).await;
    let auth = AuthClient::new(&base_url, Duration::from_secs(5));

    let result = auth.login("ada@example.com", password).await;

    if accepted {
        assert_eq!(result.unwrap().expose(), TOKEN);
    } else {
        assert_eq!(
            result.unwrap_err(),
            RemoteError::Unauthorized("Invalid credentials".to_string())
        );
    }
}
