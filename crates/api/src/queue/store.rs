//! [`TaskStore`]: thread-safe response store for queued tasks.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use common::protocol::{TaskRecord, TaskStatus};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// Errors produced by the task store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the given transaction id.
    #[error("task not found: {0}")]
    TaskNotFound(Uuid),
}

/// Thread-safe store mapping transaction ids to task records.
///
/// Wraps an `Arc<RwLock<HashMap>>` so that:
/// - Many concurrent read-lock holders (status polls, list requests) can look
///   up records simultaneously without contention.
/// - Writers (the enqueue handler and the worker pool) atomically update
///   individual records.
///
/// When a snapshot path is configured, every mutation rewrites the snapshot
/// file so that state survives a restart. Without one, state is memory-only.
#[derive(Clone, Debug)]
pub struct TaskStore {
    inner: Arc<RwLock<HashMap<Uuid, TaskRecord>>>,
    snapshot_path: Option<Arc<PathBuf>>,
}

impl TaskStore {
    /// Create a new, empty, memory-only [`TaskStore`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            snapshot_path: None,
        }
    }

    /// Create a store that persists a snapshot to `path` after every mutation.
    pub fn with_snapshot(path: PathBuf) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            snapshot_path: Some(Arc::new(path)),
        }
    }

    /// Load records from the snapshot file, if one exists.
    ///
    /// Returns the number of records loaded. A missing file is not an error;
    /// a corrupt one is, so that startup fails loudly rather than silently
    /// discarding state.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read or parsed.
    pub async fn load(&self) -> anyhow::Result<usize> {
        let Some(path) = &self.snapshot_path else {
            return Ok(0);
        };
        if !path.is_file() {
            return Ok(0);
        }

        let bytes = tokio::fs::read(path.as_ref())
            .await
            .with_context(|| format!("failed to read task snapshot {}", path.display()))?;
        let records: Vec<TaskRecord> = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse task snapshot {}", path.display()))?;

        let count = records.len();
        let mut inner = self.inner.write().await;
        for record in records {
            inner.insert(record.transaction_id, record);
        }
        drop(inner);
        Ok(count)
    }

    /// Return the number of records currently held.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Return `true` if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Insert a new record.
    pub async fn insert(&self, record: TaskRecord) {
        let mut inner = self.inner.write().await;
        inner.insert(record.transaction_id, record);
        drop(inner);
        self.persist().await;
    }

    /// Replace a record's payload and status.
    ///
    /// Entering a [`TaskStatus::Ready`] or [`TaskStatus::Failed`] state stamps
    /// `finished_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] if the id has no record.
    pub async fn update(
        &self,
        id: Uuid,
        payload: serde_json::Value,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner.get_mut(&id).ok_or(StoreError::TaskNotFound(id))?;
        record.payload = payload;
        record.status = status;
        if matches!(status, TaskStatus::Ready | TaskStatus::Failed) {
            record.finished_at = Some(Utc::now());
        }
        drop(inner);
        self.persist().await;
        Ok(())
    }

    /// Look up a record by transaction id.
    pub async fn get(&self, id: Uuid) -> Option<TaskRecord> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Return all records, oldest first.
    pub async fn list(&self) -> Vec<TaskRecord> {
        let inner = self.inner.read().await;
        let mut records: Vec<TaskRecord> = inner.values().cloned().collect();
        records.sort_by_key(|r| r.submitted_at);
        records
    }

    /// Acknowledge a collected result.
    ///
    /// With `purge` the record is deleted; otherwise its status becomes
    /// [`TaskStatus::Completed`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] if the id has no record.
    pub async fn mark_completed(&self, id: Uuid, purge: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if purge {
            inner.remove(&id).ok_or(StoreError::TaskNotFound(id))?;
        } else {
            let record = inner.get_mut(&id).ok_or(StoreError::TaskNotFound(id))?;
            record.status = TaskStatus::Completed;
        }
        drop(inner);
        self.persist().await;
        Ok(())
    }

    /// Rewrite the snapshot file, if persistence is configured.
    ///
    /// Snapshot failures are logged and do not fail the triggering request;
    /// the in-memory state remains authoritative.
    async fn persist(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let records = self.list().await;
        let bytes = match serde_json::to_vec_pretty(&records) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "failed to serialise task snapshot");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(path.as_ref(), bytes).await {
            warn!(error = %e, path = %path.display(), "failed to write task snapshot");
        }
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}
