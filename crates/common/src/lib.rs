//! Common types, protocol definitions, and errors shared across `task-queue-api` crates.

pub mod error;
pub mod protocol;

pub use error::ApiError;
pub use protocol::{TaskRecord, TaskStatus};
