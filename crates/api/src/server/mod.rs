//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Verify request payloads (JSON validity, optional SHA-256 checksum).
//! - Inject shared application state (`AppState`) into handlers.
//! - Build and drive the TLS listener when TLS is configured.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod tls;
