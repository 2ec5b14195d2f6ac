//! `task-queue-api` — a multi-threaded HTTP API with a background task queue.
//!
//! Callers enqueue JSON tasks over HTTP, receive a transaction id, and poll
//! for the result while a bounded worker pool processes tasks in the
//! background. See [`server`] for the HTTP surface and [`queue`] for the
//! worker side.

pub mod args;
pub mod config;
pub mod queue;
pub mod server;
pub mod telemetry;
