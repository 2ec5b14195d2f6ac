//! Request and response types exchanged over the HTTP API.
//!
//! These types are serialised as JSON on the wire and, when a data directory
//! is configured, in the on-disk task snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Task lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle status of a queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Accepted into the queue, not yet processed.
    Pending,
    /// Processed successfully; result waiting to be collected.
    Ready,
    /// Result collected by the caller.
    Completed,
    /// Processing failed; payload carries the error detail.
    Failed,
}

impl TaskStatus {
    /// Returns `true` if the task will not change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A single task as stored in the response store and returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Tracking identifier handed back to the caller at enqueue time.
    pub transaction_id: Uuid,
    /// Name of the route the task was submitted through; selects the processor.
    pub route: String,
    /// Submitted payload while pending; processor result (or error detail) afterwards.
    pub payload: serde_json::Value,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// When the task was accepted.
    pub submitted_at: DateTime<Utc>,
    /// When processing finished, if it has.
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Construct a new record in the [`TaskStatus::Pending`] state.
    pub fn pending(transaction_id: Uuid, route: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            transaction_id,
            route: route.into(),
            payload,
            status: TaskStatus::Pending,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Enqueue endpoint
// ---------------------------------------------------------------------------

/// Successful response body for `PUT /task/queue` (202 Accepted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResponse {
    /// Identifier for polling `GET /task/queue/{transaction_id}`.
    pub transaction_id: Uuid,
}

/// Response body for `GET /task/queue/all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListResponse {
    /// Every record currently held in the response store.
    pub tasks: Vec<TaskRecord>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health and version
// ---------------------------------------------------------------------------

/// Response body for `GET /healthz`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether the queue dispatcher is accepting work.
    pub worker_ready: bool,
    /// Number of records currently held in the response store.
    pub tasks_queued: usize,
}

/// Response body for `GET /version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    /// Service name.
    pub name: String,
    /// Semantic version of the running binary.
    pub version: String,
    /// Copyright line.
    pub copyright: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_serialises_snake_case() {
        assert_eq!(serde_json::to_string(&TaskStatus::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&TaskStatus::Ready).unwrap(), "\"ready\"");
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Ready.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn pending_record_round_trip() {
        let rec = TaskRecord::pending(Uuid::new_v4(), "put_task_queue", json!({"job": "resize"}));
        let encoded = serde_json::to_string(&rec).unwrap();
        let decoded: TaskRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.transaction_id, rec.transaction_id);
        assert_eq!(decoded.status, TaskStatus::Pending);
        assert_eq!(decoded.payload["job"], "resize");
        assert!(decoded.finished_at.is_none());
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("not_found", "Task not found");
        assert_eq!(e.code, "not_found");
        assert!(e.message.contains("Task not found"));
    }

    #[test]
    fn health_response_serde() {
        let h = HealthResponse {
            status: "ok".into(),
            worker_ready: true,
            tasks_queued: 2,
        };
        let encoded = serde_json::to_string(&h).unwrap();
        let decoded: HealthResponse = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.tasks_queued, 2);
        assert!(decoded.worker_ready);
    }
}
