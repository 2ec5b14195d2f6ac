//! Axum middleware applied to the router.
//!
//! Payload verification runs before any handler: mutating requests must carry
//! valid JSON, and when the `x-payload-sha256` header is present the body's
//! SHA-256 digest must match it. The tower-http layers (tracing, timeout,
//! compression) are attached in [`super::router`].

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::ErrorResponse;
use sha2::{Digest, Sha256};

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the caller-computed hex SHA-256 of the request body.
pub const PAYLOAD_SHA256_HEADER: &str = "x-payload-sha256";

/// Largest request body the verification layer will buffer.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Verify the body of mutating requests before the handler runs.
///
/// POST/PUT/PATCH bodies must parse as JSON; if the caller supplied
/// [`PAYLOAD_SHA256_HEADER`], the body digest must match. Other methods pass
/// through untouched.
pub async fn verify_payload(req: Request, next: Next) -> Response {
    if !matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH) {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(b) => b,
        Err(_) => return bad_request("unable to read request body"),
    };

    if serde_json::from_slice::<serde_json::Value>(&bytes).is_err() {
        return bad_request("Invalid JSON in request body");
    }

    if let Some(expected) = parts.headers.get(PAYLOAD_SHA256_HEADER) {
        let Ok(expected) = expected.to_str() else {
            return bad_request("x-payload-sha256 header is not valid ASCII");
        };
        let computed = sha256_hex(&bytes);
        if !computed.eq_ignore_ascii_case(expected.trim()) {
            return bad_request("SHA256 hash mismatch for request body");
        }
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    next.run(req).await
}

/// Hex-encoded SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn bad_request(message: &str) -> Response {
    let err = ErrorResponse::new("bad_request", message);
    (StatusCode::BAD_REQUEST, Json(err)).into_response()
}
