//! Structured logging setup via `tracing`.
//!
//! The log format is selectable at startup: `default` (timestamped), `minimal`
//! (message only), `debug` (with source locations), or `json`.
//!
//! # Telemetry invariants
//!
//! - Task payloads must never appear in log fields; log transaction ids only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`), and
//!   `RUST_LOG` takes precedence when set.

pub mod init;

pub use init::init_telemetry;
