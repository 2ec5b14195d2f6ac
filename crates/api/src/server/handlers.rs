//! Axum request handlers for all service endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    EnqueueResponse, ErrorResponse, HealthResponse, TaskListResponse, TaskStatus, VersionResponse,
};
use common::ApiError;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use super::state::AppState;
use crate::queue::ROUTE_ENQUEUE;

/// Render an [`ApiError`] as its HTTP status plus the standard error body.
fn error_response(err: ApiError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse::new(err.code(), err.message());
    (status, Json(body)).into_response()
}

/// `GET /ping` — trivial liveness probe.
///
/// Replies `{"<service-name>": "pong"}`.
pub async fn ping(State(state): State<AppState>) -> Response {
    let mut body = serde_json::Map::new();
    body.insert(state.meta.name.clone(), json!("pong"));
    (StatusCode::OK, Json(serde_json::Value::Object(body))).into_response()
}

/// `GET /healthz` — readiness check.
///
/// Returns `200 OK` while the queue dispatcher is accepting work and
/// `503 Service Unavailable` once it has stopped.
pub async fn health(State(state): State<AppState>) -> Response {
    let worker_ready = state.dispatcher.is_running();
    let tasks_queued = state.store.len().await;

    let (status_code, status_str) = if worker_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        worker_ready,
        tasks_queued,
    };
    (status_code, Json(body)).into_response()
}

/// `GET /version` — service name, version, and copyright.
pub async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        name: state.meta.name.clone(),
        version: state.meta.version.clone(),
        copyright: state.meta.copyright.clone(),
    })
}

/// `PUT /task/queue` — enqueue a task for background processing.
///
/// Replies `202 Accepted` with a transaction id for tracking.
pub async fn enqueue_task(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    match state.dispatcher.enqueue(ROUTE_ENQUEUE, payload).await {
        Ok(transaction_id) => {
            (StatusCode::ACCEPTED, Json(EnqueueResponse { transaction_id })).into_response()
        }
        Err(e) => {
            warn!(error = %e, "enqueue rejected");
            error_response(ApiError::Unavailable("task queue is shut down".into()))
        }
    }
}

/// `GET /task/queue/all` — dump every record in the response store.
pub async fn task_queue_all(State(state): State<AppState>) -> Json<TaskListResponse> {
    Json(TaskListResponse {
        tasks: state.store.list().await,
    })
}

/// `GET /task/queue/{transaction_id}` — poll one task.
///
/// - unknown id → 404
/// - pending → 202 with a detail message
/// - ready → the record; collecting it acknowledges the result and marks the
///   record completed
/// - completed / failed → the record
pub async fn task_queue_status(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Response {
    let id = match Uuid::parse_str(&transaction_id) {
        Ok(id) => id,
        Err(_) => {
            return error_response(ApiError::BadRequest(format!(
                "invalid transaction id: {transaction_id}"
            )));
        }
    };

    let Some(record) = state.store.get(id).await else {
        return error_response(ApiError::NotFound("Task not found".into()));
    };

    match record.status {
        TaskStatus::Pending => {
            let detail = json!({"detail": format!("transaction_id: {id} is pending")});
            (StatusCode::ACCEPTED, Json(detail)).into_response()
        }
        TaskStatus::Ready => {
            // Collecting a ready result acknowledges it.
            if let Err(e) = state.store.mark_completed(id, false).await {
                warn!(transaction_id = %id, error = %e, "failed to acknowledge task");
            }
            (StatusCode::OK, Json(record)).into_response()
        }
        TaskStatus::Completed | TaskStatus::Failed => {
            (StatusCode::OK, Json(record)).into_response()
        }
    }
}

/// Catch-all 404 handler.
pub async fn not_found() -> Response {
    error_response(ApiError::NotFound(
        "the requested resource does not exist".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::{body::Body, http::Request, Router};
    use common::protocol::TaskRecord;
    use tower::ServiceExt;

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/healthz", get(health))
            .route("/ping", get(ping))
            .route("/version", get(version))
            .route("/task/queue/all", get(task_queue_all))
            .route("/task/queue/:transaction_id", get(task_queue_status))
            .with_state(state)
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn ping_uses_service_name_as_key() {
        let app = test_router(AppState::for_tests());
        let resp = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["task-queue-api"], "pong");
    }

    #[tokio::test]
    async fn health_is_ok_while_dispatcher_runs() {
        let app = test_router(AppState::for_tests());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["worker_ready"], true);
    }

    #[tokio::test]
    async fn version_reports_package_version() {
        let app = test_router(AppState::for_tests());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/version")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(resp).await;
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["name"], "task-queue-api");
    }

    #[tokio::test]
    async fn unknown_task_returns_404() {
        let app = test_router(AppState::for_tests());
        let uri = format!("/task/queue/{}", Uuid::new_v4());
        let resp = app
            .oneshot(Request::builder().uri(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "Task not found");
    }

    #[tokio::test]
    async fn malformed_transaction_id_returns_400() {
        let app = test_router(AppState::for_tests());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/task/queue/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn pending_task_returns_202() {
        let state = AppState::for_tests();
        let rec = TaskRecord::pending(Uuid::new_v4(), ROUTE_ENQUEUE, json!({}));
        let id = rec.transaction_id;
        state.store.insert(rec).await;

        let app = test_router(state);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri(&format!("/task/queue/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body = body_json(resp).await;
        assert!(body["detail"].as_str().unwrap().contains("pending"));
    }

    #[tokio::test]
    async fn collecting_ready_task_marks_it_completed() {
        let state = AppState::for_tests();
        let rec = TaskRecord::pending(Uuid::new_v4(), ROUTE_ENQUEUE, json!({}));
        let id = rec.transaction_id;
        state.store.insert(rec).await;
        state
            .store
            .update(id, json!({"status": "task completed"}), TaskStatus::Ready)
            .await
            .unwrap();

        let app = test_router(state.clone());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri(&format!("/task/queue/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ready");

        // Acknowledged: subsequent polls see the completed record.
        let fetched = state.store.get(id).await.unwrap();
        assert_eq!(fetched.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn task_queue_all_lists_records() {
        let state = AppState::for_tests();
        let rec = TaskRecord::pending(Uuid::new_v4(), ROUTE_ENQUEUE, json!({"n": 1}));
        state.store.insert(rec).await;

        let app = test_router(state);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/task/queue/all")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["tasks"].as_array().unwrap().len(), 1);
    }
}
