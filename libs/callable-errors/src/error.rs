//! Wire error envelope for callable endpoints (pure data model)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::code::ErrorCode;

/// A caller-visible failure: canonical code, human-readable message and
/// optional structured details.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct CallableError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
}

/// Body of the `error` field on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    /// Upper-snake status, e.g. `PERMISSION_DENIED`.
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// `{"error": {...}}` as sent to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl CallableError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Internal failure with a fixed, non-leaking message.
    pub fn internal() -> Self {
        Self::new(ErrorCode::Internal, "INTERNAL")
    }

    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                status: self.code.wire_status().to_owned(),
                message: self.message.clone(),
                details: self.details.clone(),
            },
        }
    }

    /// Rebuild an error from a received envelope. Unknown statuses become
    /// `unknown`.
    pub fn from_envelope(envelope: ErrorEnvelope) -> Self {
        let code = ErrorCode::from_wire_status(&envelope.error.status).unwrap_or(ErrorCode::Unknown);
        Self {
            code,
            message: envelope.error.message,
            details: envelope.error.details,
        }
    }
}

impl std::fmt::Display for CallableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CallableError {}

/// Axum integration: make `CallableError` directly usable as a response
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for CallableError {
    fn into_response(self) -> axum::response::Response {
        let status = self.code.http_status();
        if status.is_server_error() {
            tracing::warn!(code = %self.code, message = %self.message, "callable failed");
        }
        let mut resp = axum::Json(self.to_envelope()).into_response();
        *resp.status_mut() = status;
        resp
    }
}
