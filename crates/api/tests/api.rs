//! End-to-end API tests: enqueue a task over HTTP, poll until the result is
//! ready, and collect it.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use serde_json::{json, Value};
use uuid::Uuid;

use api::queue::{Dispatcher, TaskStore};
use api::server::middleware::sha256_hex;
use api::server::router;
use api::server::state::{AppState, Meta};

fn test_server() -> TestServer {
    let store = TaskStore::new();
    let (dispatcher, _handle) = Dispatcher::start(store.clone(), 2);
    let state = AppState::new(store, dispatcher, Meta::default());
    TestServer::new(router::build(state)).expect("failed to start test server")
}

/// Poll the status endpoint until it stops answering 202, or give up.
async fn poll_until_done(server: &TestServer, id: Uuid) -> Value {
    for _ in 0..200 {
        let res = server.get(&format!("/task/queue/{id}")).await;
        if res.status_code() != 202 {
            assert_eq!(res.status_code(), 200);
            return res.json::<Value>();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {id} never finished");
}

#[tokio::test]
async fn enqueue_poll_collect_flow() {
    let server = test_server();

    // Enqueue: 202 with a transaction id.
    let res = server
        .put("/task/queue")
        .json(&json!({"duration_ms": 0}))
        .await;
    assert_eq!(res.status_code(), 202);
    let id: Uuid = res.json::<Value>()["transaction_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    // Poll until the result is ready, then collect it.
    let record = poll_until_done(&server, id).await;
    assert_eq!(record["status"], "ready");
    assert_eq!(record["payload"]["status"], "task completed");

    // Collecting acknowledged the result: the record is now completed.
    let res = server.get(&format!("/task/queue/{id}")).await;
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.json::<Value>()["status"], "completed");

    // And it shows up in the full dump.
    let res = server.get("/task/queue/all").await;
    assert_eq!(res.status_code(), 200);
    let tasks = res.json::<Value>();
    assert_eq!(tasks["tasks"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_transaction_id_is_404() {
    let server = test_server();
    let res = server.get(&format!("/task/queue/{}", Uuid::new_v4())).await;
    assert_eq!(res.status_code(), 404);
}

#[tokio::test]
async fn enqueue_with_matching_checksum() {
    let server = test_server();
    let body = json!({"duration_ms": 0});
    let raw = serde_json::to_vec(&body).unwrap();

    let res = server
        .put("/task/queue")
        .add_header(
            HeaderName::from_static("x-payload-sha256"),
            HeaderValue::from_str(&sha256_hex(&raw)).unwrap(),
        )
        .bytes(raw.into())
        .content_type("application/json")
        .await;
    assert_eq!(res.status_code(), 202);
}

#[tokio::test]
async fn enqueue_with_bad_checksum_is_rejected() {
    let server = test_server();
    let body = json!({"duration_ms": 0});
    let raw = serde_json::to_vec(&body).unwrap();

    let res = server
        .put("/task/queue")
        .add_header(
            HeaderName::from_static("x-payload-sha256"),
            HeaderValue::from_str(&"0".repeat(64)).unwrap(),
        )
        .bytes(raw.into())
        .content_type("application/json")
        .await;
    assert_eq!(res.status_code(), 400);
    assert!(res.json::<Value>()["message"]
        .as_str()
        .unwrap()
        .contains("SHA256 hash mismatch"));
}

#[tokio::test]
async fn enqueue_rejects_non_json_body() {
    let server = test_server();
    let res = server
        .put("/task/queue")
        .bytes("definitely not json".into())
        .content_type("application/json")
        .await;
    assert_eq!(res.status_code(), 400);
    assert!(res.json::<Value>()["message"]
        .as_str()
        .unwrap()
        .contains("Invalid JSON"));
}

#[tokio::test]
async fn health_and_version_endpoints() {
    let server = test_server();

    let res = server.get("/healthz").await;
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.json::<Value>()["status"], "ok");

    let res = server.get("/version").await;
    assert_eq!(res.status_code(), 200);
    let body = res.json::<Value>();
    assert_eq!(body["name"], "task-queue-api");
    assert!(!body["version"].as_str().unwrap().is_empty());

    let res = server.get("/nope").await;
    assert_eq!(res.status_code(), 404);
}
