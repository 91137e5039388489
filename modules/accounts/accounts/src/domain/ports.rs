//! Outbound ports of the accounts domain.
//!
//! The service only sees these traits; production adapters live in
//! `crate::infra` and in-memory fakes in `crate::test_support`.

use async_trait::async_trait;
use accounts_sdk::{AccountId, NewAccount};
use callable_errors::ErrorCode;
use serde_json::Value;
use thiserror::Error;

/// Service name reported for identity service failures
pub const IDENTITY_SERVICE: &str = "identity-toolkit";

/// Service name reported for role store failures
pub const ROLE_STORE_SERVICE: &str = "realtime-database";

/// Failure reported by a managed service, already classified.
///
/// `reason` is the service's own reason code (e.g. `EMAIL_EXISTS`) and is
/// passed to callers unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{service} failed ({reason}): {message}")]
pub struct UpstreamError {
    pub code: ErrorCode,
    pub service: &'static str,
    pub reason: String,
    pub message: String,
}

impl UpstreamError {
    pub fn new(
        code: ErrorCode,
        service: &'static str,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            service,
            reason: reason.into(),
            message: message.into(),
        }
    }
}

pub type IdentityError = UpstreamError;
pub type RoleStoreError = UpstreamError;

/// Account management in the external identity service
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account with email/password sign-in linked under the same
    /// email, returning the id issued by the service.
    async fn create_account(&self, account: &NewAccount) -> Result<AccountId, IdentityError>;

    async fn delete_account(&self, id: &AccountId) -> Result<(), IdentityError>;
}

/// Read-only access to role records keyed by account id
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Raw value stored at `{table}/{uid}/{column}`, `None` when absent or
    /// null. Values are returned as stored; the guard decides what matches.
    async fn read_role(
        &self,
        table: &str,
        uid: &str,
        column: &str,
    ) -> Result<Option<Value>, RoleStoreError>;
}
