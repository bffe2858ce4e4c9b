//! Structured logging facility for change tracking
//!
//! This module provides:
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - An in-memory capture of operation events for test assertions
//!
//! # Usage
//!
//! ```rust
//! use trackable_core::logging_facility::{init, Profile};
//!
//! // Initialize once at application startup
//! init(Profile::Development);
//! ```
//!
//! Cascades and commits log a start/end pair per operation; inconsistent
//! cascades log a warning carrying the root entity.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, OpEvent, TestCapture};

/// Milliseconds since `started`, saturating
#[doc(hidden)]
pub fn elapsed_ms(started: std::time::Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
