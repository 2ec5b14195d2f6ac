//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use chrono::{Datelike, Utc};

use crate::queue::{Dispatcher, TaskStore};

/// Build-time service metadata served by `/ping` and `/version`.
#[derive(Debug, Clone)]
pub struct Meta {
    /// Service name.
    pub name: String,
    /// Semantic version of the running binary.
    pub version: String,
    /// Copyright line.
    pub copyright: String,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            name: "task-queue-api".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            copyright: format!("\u{00A9}{} Code Monkeys", Utc::now().year()),
        }
    }
}

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or `Arc`-backed) so that
/// Axum can clone the state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe response store for queued tasks.
    pub store: TaskStore,
    /// Handle for submitting tasks to the worker pool.
    pub dispatcher: Dispatcher,
    /// Build-time service metadata.
    pub meta: Arc<Meta>,
}

impl AppState {
    /// Create a new [`AppState`].
    pub fn new(store: TaskStore, dispatcher: Dispatcher, meta: Meta) -> Self {
        Self {
            store,
            dispatcher,
            meta: Arc::new(meta),
        }
    }

    /// State backed by an empty store and a single-worker dispatcher,
    /// suitable for tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let store = TaskStore::new();
        let (dispatcher, _handle) = Dispatcher::start(store.clone(), 1);
        Self::new(store, dispatcher, Meta::default())
    }
}
