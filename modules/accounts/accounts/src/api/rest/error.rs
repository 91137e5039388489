use callable_errors::CallableError;

use crate::domain::error::DomainError;

/// Map a domain error to the error returned to callers.
///
/// Guard refusals are `permission-denied` with the guard's message; upstream
/// failures keep their code and carry `{service, reason}` details.
pub fn domain_error_to_callable(e: &DomainError) -> CallableError {
    match e {
        DomainError::Unauthenticated | DomainError::WrongRole { .. } => {
            CallableError::permission_denied(e.to_string())
        }
        DomainError::Validation { .. } => CallableError::invalid_argument(e.to_string()),
        DomainError::Upstream(u) => {
            callable_errors::upstream(u.code, u.service, &u.reason, u.message.clone())
        }
        DomainError::Misconfigured(msg) => {
            tracing::error!(error = %msg, "accounts module misconfigured");
            CallableError::internal()
        }
    }
}

impl From<DomainError> for CallableError {
    fn from(e: DomainError) -> Self {
        domain_error_to_callable(&e)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use callable_errors::ErrorCode;
    use serde_json::json;

    use super::*;
    use crate::domain::ports::{IDENTITY_SERVICE, UpstreamError};

    #[test]
    fn wrong_role_is_permission_denied() {
        let e = DomainError::WrongRole {
            expected: "admin".to_owned(),
            actual: Some("editor".to_owned()),
        };
        let err = domain_error_to_callable(&e);
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(err.message, "Wrong role, expected admin, got editor");
        assert_eq!(err.details, None);
    }

    #[test]
    fn upstream_carries_provenance() {
        let e = DomainError::Upstream(UpstreamError::new(
            ErrorCode::AlreadyExists,
            IDENTITY_SERVICE,
            "EMAIL_EXISTS",
            "The email address is already in use by another account.",
        ));
        let err = CallableError::from(e);
        assert_eq!(err.code, ErrorCode::AlreadyExists);
        assert_eq!(
            err.details,
            Some(json!({"service": "identity-toolkit", "reason": "EMAIL_EXISTS"}))
        );
    }

    #[test]
    fn misconfiguration_does_not_leak() {
        let err = domain_error_to_callable(&DomainError::Misconfigured("no role store".into()));
        assert_eq!(err.code, ErrorCode::Internal);
        assert!(!err.message.contains("role store"));
    }
}
