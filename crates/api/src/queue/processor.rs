//! Task processors, dispatched by route name.
//!
//! Each enqueue route maps to a processor function of the same name. Submitting
//! a task through a route with no processor fails the task rather than the
//! request; the error surfaces in the task's result payload.

use std::time::Duration;

use serde_json::json;
use thiserror::Error;

/// Route name for `PUT /task/queue`.
pub const ROUTE_ENQUEUE: &str = "put_task_queue";

/// Processor name reported in task results.
const PROCESSOR_NAME: &str = "TaskProcessor";

/// Default simulated workload duration for the enqueue route.
const DEFAULT_TASK_DURATION_MS: u64 = 15_000;

/// Errors produced while processing a task.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The route name has no registered processor.
    #[error("Unknown route: {0}")]
    UnknownRoute(String),
}

/// Process one task synchronously.
///
/// Runs on the blocking thread pool; processors are free to block.
///
/// # Errors
///
/// Returns [`ProcessError::UnknownRoute`] if `route` has no processor.
pub fn process(route: &str, payload: &serde_json::Value) -> Result<serde_json::Value, ProcessError> {
    match route {
        ROUTE_ENQUEUE => Ok(put_task_queue(payload)),
        other => Err(ProcessError::UnknownRoute(other.to_owned())),
    }
}

/// Processor for the enqueue route: a simulated long-running workload.
///
/// The duration can be overridden per task via a `duration_ms` payload field.
fn put_task_queue(payload: &serde_json::Value) -> serde_json::Value {
    let duration_ms = payload
        .get("duration_ms")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(DEFAULT_TASK_DURATION_MS);

    std::thread::sleep(Duration::from_millis(duration_ms));

    json!({
        "status": "task completed",
        "processor": PROCESSOR_NAME,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_route_is_rejected() {
        let err = process("delete_everything", &json!({})).unwrap_err();
        assert!(err.to_string().contains("delete_everything"));
    }

    #[test]
    fn enqueue_route_completes() {
        let result = process(ROUTE_ENQUEUE, &json!({"duration_ms": 0})).unwrap();
        assert_eq!(result["status"], "task completed");
        assert_eq!(result["processor"], "TaskProcessor");
    }

    #[test]
    fn duration_override_is_honoured() {
        let start = std::time::Instant::now();
        process(ROUTE_ENQUEUE, &json!({"duration_ms": 10})).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
