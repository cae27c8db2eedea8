//! `SosotestClient` against a local mock backend.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use sosodesk_application::ports::{
    DebugService, EnvironmentService, InterfaceCatalogService, PlanContext,
};
use sosodesk_application::{BackendError, CancellationToken, DebugExecutor, DebugOptions};
use sosodesk_domain::{ClientSettings, EnvironmentGroup, InterfaceDefinition};
use sosodesk_infrastructure::{BackendPaths, SosotestClient, SystemClock};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Clone, Default)]
struct MockState {
    saved: Arc<Mutex<Vec<Value>>>,
    submitted: Arc<Mutex<Vec<Value>>>,
    polls: Arc<Mutex<u32>>,
}

fn envelope(code: i64, message: &str, body: Value) -> Json<Value> {
    Json(json!({"code": code, "message": message, "body": body}))
}

fn row(id: i64, url: &str) -> Value {
    json!({
        "id": id,
        "interfaceCode": format!("IF_{id}"),
        "title": format!("Interface {id}"),
        "method": "get",
        "url": url,
        "httpConfKey": "svc",
        "createdBy": "alice",
    })
}

async fn list(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let rows = match query.get("page").map(String::as_str) {
        Some("1") => vec![row(1, "/a"), row(2, "/b")],
        Some("2") => vec![row(3, "/c")],
        _ => Vec::new(),
    };
    envelope(10000, "ok", json!({"dataList": rows, "total": 3}))
}

async fn detail(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    match query.get("id").map(String::as_str) {
        Some("42") => envelope(10000, "ok", row(42, "/ping")),
        _ => envelope(10000, "ok", Value::Null),
    }
}

async fn save(State(state): State<MockState>, Json(payload): Json<Value>) -> Json<Value> {
    state.saved.lock().unwrap().push(payload);
    envelope(10000, "saved", Value::Null)
}

async fn submit(State(state): State<MockState>, Json(request): Json<Value>) -> Json<Value> {
    state.submitted.lock().unwrap().push(request);
    envelope(10000, "ok", json!({"debugId": "job-7"}))
}

async fn result(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    assert_eq!(query.get("debugId").map(String::as_str), Some("job-7"));
    let attempt = {
        let mut polls = state.polls.lock().unwrap();
        *polls += 1;
        *polls
    };
    if attempt < 3 {
        return envelope(1, "running", Value::Null);
    }
    envelope(
        10000,
        "ok",
        json!({
            "statusCode": 201,
            "headers": [{"name": "X-Trace", "value": "t-1"}],
            "responseBody": "{\"ok\":true}",
            "actualResult": {"ok": true},
            "totalTakeTime": 12.4,
            "assertResult": "PASS",
        }),
    )
}

async fn environments(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let rows = if query.get("httpConfKey").map(String::as_str) == Some("svc") {
        json!([
            {"confKey": "svc-test", "alias": "Test", "requestAddr": "http://t", "group": "test"},
            {"confKey": "svc-prod", "requestAddr": "http://p", "group": "online"},
        ])
    } else {
        json!([])
    };
    envelope(10000, "ok", rows)
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "database is down")
}

async fn rejected() -> Json<Value> {
    envelope(40001, "permission denied", Value::Null)
}

type MockBackend = (String, MockState, oneshot::Sender<()>, tokio::task::JoinHandle<()>);

async fn spawn_mock_backend() -> MockBackend {
    let state = MockState::default();
    let app = Router::new()
        .route("/api/interface/list", get(list))
        .route("/api/interface/detail", get(detail))
        .route("/api/interface/save", post(save))
        .route("/api/debug/submit", post(submit))
        .route("/api/debug/result", get(result))
        .route("/api/environment/list", get(environments))
        .route("/broken", get(broken))
        .route("/rejected", post(rejected))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend listener");
    let address = listener.local_addr().expect("mock backend address");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        server.await.expect("run mock backend");
    });
    (format!("http://{address}"), state, shutdown_tx, handle)
}

fn client_for(base_url: String) -> SosotestClient {
    let settings = ClientSettings {
        base_url,
        request_timeout_ms: 2_000,
        ..ClientSettings::default()
    };
    SosotestClient::new(&settings).expect("client")
}

fn plan() -> PlanContext {
    PlanContext {
        environment_key: "svc-test".to_string(),
        request_addr: "http://t".to_string(),
        run_id: "run-1".to_string(),
    }
}

#[tokio::test]
async fn pages_through_the_catalog_using_the_total() {
    let (base_url, _state, shutdown_tx, server) = spawn_mock_backend().await;
    let client = client_for(base_url);

    let first = client.list_page(1, 2).await.unwrap();
    let second = client.list_page(2, 2).await.unwrap();

    assert_eq!(first.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
    assert!(first.has_more);
    assert_eq!(second.items.len(), 1);
    assert!(!second.has_more);
    assert_eq!(second.items[0].endpoint_key, "svc");

    let _ = shutdown_tx.send(());
    let _ = server.await;
}

#[tokio::test]
async fn detail_of_a_missing_interface_is_not_found() {
    let (base_url, _state, shutdown_tx, server) = spawn_mock_backend().await;
    let client = client_for(base_url);

    let found = client.get_detail(42).await.unwrap();
    let missing = client.get_detail(5).await;

    assert_eq!(found.url, "/ping");
    assert_eq!(found.extra.get("createdBy"), Some(&json!("alice")));
    assert_eq!(missing, Err(BackendError::NotFound("5".to_string())));

    let _ = shutdown_tx.send(());
    let _ = server.await;
}

#[tokio::test]
async fn save_sends_only_allow_listed_fields() {
    let (base_url, state, shutdown_tx, server) = spawn_mock_backend().await;
    let client = client_for(base_url);
    let mut definition = client.get_detail(42).await.unwrap();
    definition.url = "/ping2".to_string();

    client.save(42, &definition).await.unwrap();

    let saved = state.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["id"], json!(42));
    assert_eq!(saved[0]["url"], json!("/ping2"));
    assert!(saved[0].get("createdBy").is_none());

    let _ = shutdown_tx.send(());
    let _ = server.await;
}

#[tokio::test]
async fn lists_environments_for_an_endpoint_key() {
    let (base_url, _state, shutdown_tx, server) = spawn_mock_backend().await;
    let client = client_for(base_url);

    let entries = EnvironmentService::list(&client, "svc").await.unwrap();
    let none = EnvironmentService::list(&client, "other").await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].label, "Test");
    assert_eq!(entries[1].label, "svc-prod");
    assert_eq!(entries[1].group, EnvironmentGroup::Online);
    assert!(none.is_empty());

    let _ = shutdown_tx.send(());
    let _ = server.await;
}

#[tokio::test]
async fn submit_carries_the_plan_and_returns_the_job() {
    let (base_url, state, shutdown_tx, server) = spawn_mock_backend().await;
    let client = client_for(base_url);
    let definition = InterfaceDefinition::new(42, "GET", "/ping");

    let job = client.submit(&definition, &plan()).await.unwrap().unwrap();

    assert_eq!(job.0, "job-7");
    let submitted = state.submitted.lock().unwrap().clone();
    assert_eq!(submitted[0]["httpConfKey"], json!("svc-test"));
    assert_eq!(submitted[0]["requestAddr"], json!("http://t"));
    assert_eq!(submitted[0]["interface"]["url"], json!("/ping"));

    let _ = shutdown_tx.send(());
    let _ = server.await;
}

#[tokio::test]
async fn executor_polls_the_live_client_until_done() {
    let (base_url, state, shutdown_tx, server) = spawn_mock_backend().await;
    let client = Arc::new(client_for(base_url));
    let executor = DebugExecutor::new(client, Arc::new(SystemClock::new()));
    let token = CancellationToken::new();
    let options = DebugOptions::new(token.receiver()).with_poll_interval(Duration::ZERO);
    let mut seen = Vec::new();

    let outcome = executor
        .execute_debug(
            &InterfaceDefinition::new(42, "GET", "/ping"),
            42,
            &plan(),
            options,
            |snapshot| seen.push(snapshot.clone()),
        )
        .await
        .unwrap();

    assert!(outcome.converged);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(seen.len(), 3);
    assert_eq!(outcome.snapshot.status, 201);
    assert_eq!(outcome.snapshot.duration_ms, 12);
    assert!(outcome.snapshot.body.contains("\"ok\": true"));
    assert_eq!(outcome.snapshot.headers[0].name, "X-Trace");
    assert_eq!(*state.polls.lock().unwrap(), 3);

    let _ = shutdown_tx.send(());
    let _ = server.await;
}

#[tokio::test]
async fn http_and_envelope_failures_are_classified() {
    let (base_url, _state, shutdown_tx, server) = spawn_mock_backend().await;
    let client = client_for(base_url).with_paths(BackendPaths {
        interface_detail: "/broken".to_string(),
        interface_save: "/rejected".to_string(),
        ..BackendPaths::default()
    });

    let detail = client.get_detail(42).await;
    let save = client.save(42, &InterfaceDefinition::new(42, "GET", "/x")).await;

    assert_eq!(
        detail,
        Err(BackendError::Status {
            status: 500,
            message: "database is down".to_string(),
        })
    );
    assert_eq!(
        save,
        Err(BackendError::Rejected {
            code: 40001,
            message: "permission denied".to_string(),
        })
    );

    let _ = shutdown_tx.send(());
    let _ = server.await;
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    let client = client_for(format!("http://{address}"));

    let error = client.list_page(1, 20).await.unwrap_err();

    assert!(error.is_transport(), "unexpected error: {error}");
}
