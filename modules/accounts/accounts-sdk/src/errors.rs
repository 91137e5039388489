//! Public error types for the `accounts` module.
//!
//! These errors are safe to expose to other modules and consumers.

use callable_errors::ErrorCode;
use thiserror::Error;

/// Errors that can be returned by `AccountsClientV1`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccountsError {
    /// The caller is not allowed to invoke the operation (not
    /// authenticated, or holding the wrong role).
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// The request data is invalid.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A managed service (identity service, role store) failed.
    #[error("{service} failed ({reason}): {message}")]
    Upstream {
        code: ErrorCode,
        service: String,
        reason: String,
        message: String,
    },

    /// An internal error occurred.
    #[error("Internal error")]
    Internal,
}

impl AccountsError {
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn upstream(
        code: ErrorCode,
        service: impl Into<String>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Upstream {
            code,
            service: service.into(),
            reason: reason.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::Internal
    }

    /// Canonical code reported to callers for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Self::Validation { .. } => ErrorCode::InvalidArgument,
            Self::Upstream { code, .. } => *code,
            Self::Internal => ErrorCode::Internal,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_variant() {
        assert_eq!(
            AccountsError::permission_denied("Not authenticated").code(),
            ErrorCode::PermissionDenied
        );
        assert_eq!(AccountsError::validation("x").code(), ErrorCode::InvalidArgument);
        assert_eq!(
            AccountsError::upstream(ErrorCode::AlreadyExists, "identity", "EMAIL_EXISTS", "m").code(),
            ErrorCode::AlreadyExists
        );
        assert_eq!(AccountsError::internal().code(), ErrorCode::Internal);
    }

    #[test]
    fn upstream_display_names_service_and_reason() {
        let e = AccountsError::upstream(
            ErrorCode::NotFound,
            "identity",
            "USER_NOT_FOUND",
            "no such account",
        );
        assert_eq!(e.to_string(), "identity failed (USER_NOT_FOUND): no such account");
    }
}
