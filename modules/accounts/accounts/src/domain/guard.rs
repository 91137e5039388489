//! Role authorization guard.
//!
//! Each entry operation runs [`RoleGuard::authorize`] with its configured
//! [`RolePolicy`] before any side effect. The guard reads at most one role
//! record per call and never writes one.

use std::fmt;
use std::sync::Arc;

use callable_security::CallContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::identity::resolve_identity;
use super::ports::{RoleStore, RoleStoreError};

/// Authorization requirement of an entry operation.
///
/// Written in configuration as `public`, `any_authenticated` or
/// `{specific_role: <role>}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolePolicy {
    /// Anyone may call, no identity required.
    #[default]
    Public,
    /// Any authenticated caller.
    AnyAuthenticated,
    /// Authenticated callers whose stored role equals the given value.
    SpecificRole(String),
}

impl fmt::Display for RolePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::AnyAuthenticated => f.write_str("any_authenticated"),
            Self::SpecificRole(role) => write!(f, "specific_role({role})"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("Not authenticated")]
    Unauthenticated,

    /// `actual` is `None` when the caller has no role record. Non-string
    /// records carry their JSON rendering.
    #[error("Wrong role, expected {expected}, got {}", .actual.as_deref().unwrap_or("null"))]
    WrongRole {
        expected: String,
        actual: Option<String>,
    },

    #[error("policy requires a role but no role store is configured")]
    NoRoleStore,

    #[error(transparent)]
    RoleStore(#[from] RoleStoreError),
}

struct RoleLookup {
    store: Arc<dyn RoleStore>,
    table: String,
    column: String,
}

/// Decides whether a caller may proceed under a [`RolePolicy`]
pub struct RoleGuard {
    lookup: Option<RoleLookup>,
}

impl RoleGuard {
    /// Guard reading roles from `{table}/{uid}/{column}` in `store`.
    pub fn new(store: Arc<dyn RoleStore>, table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            lookup: Some(RoleLookup {
                store,
                table: table.into(),
                column: column.into(),
            }),
        }
    }

    /// Guard without a role store. `SpecificRole` policies fail with
    /// [`GuardError::NoRoleStore`] after the identity check.
    #[must_use]
    pub fn without_role_store() -> Self {
        Self { lookup: None }
    }

    /// # Errors
    /// - [`GuardError::Unauthenticated`] if the policy needs an identity and
    ///   `ctx` has none
    /// - [`GuardError::WrongRole`] if the stored role differs from the
    ///   required one
    /// - [`GuardError::RoleStore`] if the role lookup fails
    pub async fn authorize(&self, ctx: &CallContext, policy: &RolePolicy) -> Result<(), GuardError> {
        let expected = match policy {
            RolePolicy::Public => return Ok(()),
            RolePolicy::AnyAuthenticated => return resolve_identity(ctx).map(|_| ()),
            RolePolicy::SpecificRole(role) => role,
        };

        let uid = resolve_identity(ctx)?;
        let lookup = self.lookup.as_ref().ok_or(GuardError::NoRoleStore)?;
        let stored = lookup
            .store
            .read_role(&lookup.table, uid, &lookup.column)
            .await?;

        match stored {
            Some(Value::String(role)) if role == *expected => Ok(()),
            other => Err(GuardError::WrongRole {
                expected: expected.clone(),
                actual: other.map(render_role),
            }),
        }
    }
}

fn render_role(value: Value) -> String {
    match value {
        Value::String(role) => role,
        other => other.to_string(),
    }
}
