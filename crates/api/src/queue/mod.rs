//! Background task queue: dispatcher, worker pool, and response store.
//!
//! # Lifecycle
//!
//! 1. [`Dispatcher::start`] spawns the dispatcher task and hands back a
//!    cheaply-cloneable handle for enqueueing.
//! 2. [`Dispatcher::enqueue`] allocates a transaction id, records the task as
//!    pending in the [`TaskStore`], and pushes it onto the channel.
//! 3. The dispatcher pulls tasks off the channel and runs each processor on
//!    the blocking thread pool, bounded by the configured worker count.
//! 4. Results land back in the store as `ready` (or `failed`), where the HTTP
//!    layer serves them to polling callers.
//! 5. When every dispatcher handle has been dropped the channel closes; the
//!    dispatcher drains in-flight work and exits.

pub mod processor;
pub mod store;

pub use processor::ROUTE_ENQUEUE;
pub use store::TaskStore;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::protocol::{TaskRecord, TaskStatus};
use serde_json::json;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Capacity of the channel between the HTTP layer and the dispatcher.
const QUEUE_DEPTH: usize = 256;

/// Errors produced when enqueueing.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The dispatcher has shut down and no longer accepts work.
    #[error("task queue is shut down")]
    Closed,
}

/// A task in flight between the HTTP layer and the worker pool.
#[derive(Debug)]
struct QueuedTask {
    transaction_id: Uuid,
    route: String,
    payload: serde_json::Value,
}

/// Handle for submitting tasks to the background worker pool.
///
/// Clones share one channel; the dispatcher stops once all clones are dropped.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<QueuedTask>,
    running: Arc<AtomicBool>,
    store: TaskStore,
}

impl Dispatcher {
    /// Spawn the dispatcher task.
    ///
    /// `worker_count` bounds how many tasks execute concurrently. Returns the
    /// enqueue handle and the dispatcher's join handle, which resolves after
    /// shutdown once in-flight tasks have drained.
    pub fn start(store: TaskStore, worker_count: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let running = Arc::new(AtomicBool::new(true));

        let handle = tokio::spawn(run(rx, store.clone(), worker_count, running.clone()));
        info!(worker_count, "queue dispatcher started");

        (Self { tx, running, store }, handle)
    }

    /// Returns `true` while the dispatcher is accepting and processing work.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.tx.is_closed()
    }

    /// Submit a task for background processing.
    ///
    /// The task is recorded as pending before it is queued, so a caller can
    /// poll its transaction id immediately.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the dispatcher has shut down; the
    /// record is then marked failed.
    pub async fn enqueue(
        &self,
        route: &str,
        payload: serde_json::Value,
    ) -> Result<Uuid, QueueError> {
        let transaction_id = Uuid::new_v4();
        self.store
            .insert(TaskRecord::pending(transaction_id, route, payload.clone()))
            .await;

        let task = QueuedTask {
            transaction_id,
            route: route.to_owned(),
            payload,
        };
        if self.tx.send(task).await.is_err() {
            // Dispatcher gone: fail the record so the caller sees a terminal state.
            let _ = self
                .store
                .update(
                    transaction_id,
                    json!({"error": "task queue is shut down"}),
                    TaskStatus::Failed,
                )
                .await;
            return Err(QueueError::Closed);
        }

        debug!(%transaction_id, route, "task enqueued");
        Ok(transaction_id)
    }
}

/// Dispatcher loop: receive tasks and fan them out to the worker pool.
async fn run(
    mut rx: mpsc::Receiver<QueuedTask>,
    store: TaskStore,
    worker_count: usize,
    running: Arc<AtomicBool>,
) {
    let semaphore = Arc::new(Semaphore::new(worker_count));

    while let Some(task) = rx.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break,
        };
        let store = store.clone();
        tokio::spawn(async move {
            execute(task, store).await;
            drop(permit);
        });
    }

    // Channel closed: wait for every in-flight task before reporting stopped.
    let _ = semaphore.acquire_many(worker_count as u32).await;
    running.store(false, Ordering::SeqCst);
    info!("queue dispatcher stopped");
}

/// Run one task's processor and record the outcome.
async fn execute(task: QueuedTask, store: TaskStore) {
    let QueuedTask {
        transaction_id,
        route,
        payload,
    } = task;
    debug!(%transaction_id, route, "processing task");

    let worker_route = route.clone();
    let joined =
        tokio::task::spawn_blocking(move || processor::process(&worker_route, &payload)).await;

    let (result, status) = match joined {
        Ok(Ok(result)) => (result, TaskStatus::Ready),
        Ok(Err(e)) => (json!({"error": e.to_string()}), TaskStatus::Failed),
        Err(e) => (
            json!({"error": format!("task processor panicked: {e}")}),
            TaskStatus::Failed,
        ),
    };

    if let Err(e) = store.update(transaction_id, result, status).await {
        warn!(%transaction_id, error = %e, "failed to record task outcome");
    }
}
