//! Axum router construction.

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/healthz", get(handlers::health))
        .route("/version", get(handlers::version))
        .route("/task/queue", put(handlers::enqueue_task))
        .route("/task/queue/all", get(handlers::task_queue_all))
        .route("/task/queue/:transaction_id", get(handlers::task_queue_status))
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn(middleware::verify_payload))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}
