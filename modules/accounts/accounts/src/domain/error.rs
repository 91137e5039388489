use accounts_sdk::AccountsError;
use thiserror::Error;

use super::guard::GuardError;
use super::ports::UpstreamError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Wrong role, expected {expected}, got {}", .actual.as_deref().unwrap_or("null"))]
    WrongRole {
        expected: String,
        actual: Option<String>,
    },

    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Misconfigured: {0}")]
    Misconfigured(String),
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether the caller was refused by the role guard.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::WrongRole { .. })
    }
}

impl From<GuardError> for DomainError {
    fn from(e: GuardError) -> Self {
        match e {
            GuardError::Unauthenticated => Self::Unauthenticated,
            GuardError::WrongRole { expected, actual } => Self::WrongRole { expected, actual },
            GuardError::RoleStore(upstream) => Self::Upstream(upstream),
            GuardError::NoRoleStore => Self::Misconfigured(e.to_string()),
        }
    }
}

impl From<DomainError> for AccountsError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Unauthenticated | DomainError::WrongRole { .. } => {
                AccountsError::permission_denied(e.to_string())
            }
            DomainError::Validation { .. } => AccountsError::validation(e.to_string()),
            DomainError::Upstream(u) => {
                AccountsError::upstream(u.code, u.service, u.reason, u.message)
            }
            DomainError::Misconfigured(_) => AccountsError::internal(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use callable_errors::ErrorCode;

    use super::*;
    use crate::domain::ports::IDENTITY_SERVICE;

    #[test]
    fn guard_failures_become_permission_denied() {
        let e: AccountsError = DomainError::from(GuardError::WrongRole {
            expected: "admin".to_owned(),
            actual: Some("editor".to_owned()),
        })
        .into();
        assert_eq!(
            e,
            AccountsError::permission_denied("Wrong role, expected admin, got editor")
        );

        let e: AccountsError = DomainError::from(GuardError::Unauthenticated).into();
        assert_eq!(e, AccountsError::permission_denied("Not authenticated"));
    }

    #[test]
    fn upstream_keeps_native_classification() {
        let upstream = UpstreamError::new(
            ErrorCode::NotFound,
            IDENTITY_SERVICE,
            "USER_NOT_FOUND",
            "no such account",
        );
        let e: AccountsError = DomainError::from(upstream).into();
        assert_eq!(e.code(), ErrorCode::NotFound);
        assert!(matches!(e, AccountsError::Upstream { ref reason, .. } if reason == "USER_NOT_FOUND"));
    }

    #[test]
    fn missing_role_store_is_internal() {
        let e = DomainError::from(GuardError::NoRoleStore);
        assert!(matches!(e, DomainError::Misconfigured(_)));
        assert_eq!(AccountsError::from(e), AccountsError::Internal);
    }
}
