//! Error types shared by callable endpoints.
//!
//! This crate provides pure data types for reporting failures to callers:
//! - Canonical error codes (`ErrorCode`) with their wire and HTTP statuses
//! - The wire error envelope (`CallableError`)
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod code;
pub mod error;

pub use code::ErrorCode;
pub use error::{CallableError, ErrorBody, ErrorEnvelope};

/// Helper to attach upstream provenance to an error.
///
/// Produces `details = {"service": <service>, "reason": <reason>}` so callers
/// can tell which external dependency failed and with which native reason.
pub fn upstream(
    code: ErrorCode,
    service: &str,
    reason: &str,
    message: impl Into<String>,
) -> CallableError {
    CallableError::new(code, message).with_details(serde_json::json!({
        "service": service,
        "reason": reason,
    }))
}
