use std::sync::Arc;

use accounts_sdk::{AccountId, NewAccount};
use callable_security::CallContext;
use tracing::{debug, info, warn};

use super::error::DomainError;
use super::guard::{RoleGuard, RolePolicy};
use super::ports::IdentityProvider;
use crate::config::EntryPolicies;

// ============================================================================
// Service Implementation
// ============================================================================

/// Guarded account lifecycle.
///
/// `register_user` and `unregister_user` run the role guard with their
/// configured policy first; nothing reaches the identity service when the
/// guard refuses.
pub struct AccountsService {
    identity: Arc<dyn IdentityProvider>,
    guard: RoleGuard,
    policies: EntryPolicies,
}

impl AccountsService {
    pub fn new(identity: Arc<dyn IdentityProvider>, guard: RoleGuard, policies: EntryPolicies) -> Self {
        Self {
            identity,
            guard,
            policies,
        }
    }

    #[must_use]
    pub fn policies(&self) -> &EntryPolicies {
        &self.policies
    }

    /// Entry operation `registerUser`.
    ///
    /// # Errors
    /// Guard failures, then [`DomainError::Validation`] for empty input, then
    /// identity service failures.
    pub async fn register_user(
        &self,
        ctx: &CallContext,
        account: NewAccount,
    ) -> Result<AccountId, DomainError> {
        self.authorize(ctx, "registerUser", &self.policies.register_user)
            .await?;
        self.create_account(account).await
    }

    /// Entry operation `unregisterUser`.
    ///
    /// # Errors
    /// Guard failures, then [`DomainError::Validation`] for an empty id, then
    /// identity service failures.
    pub async fn unregister_user(&self, ctx: &CallContext, id: AccountId) -> Result<(), DomainError> {
        self.authorize(ctx, "unregisterUser", &self.policies.unregister_user)
            .await?;
        self.delete_account(&id).await
    }

    /// Create an account without any authorization check.
    ///
    /// # Errors
    /// [`DomainError::Validation`] if email or password is empty,
    /// [`DomainError::Upstream`] if the identity service refuses.
    pub async fn create_account(&self, account: NewAccount) -> Result<AccountId, DomainError> {
        if account.email.trim().is_empty() {
            return Err(DomainError::validation("email", "must be a non-empty string"));
        }
        if account.password.is_empty() {
            return Err(DomainError::validation("password", "must be a non-empty string"));
        }

        let id = self.identity.create_account(&account).await?;
        info!(uid = %id, "account created");
        Ok(id)
    }

    /// Delete an account without any authorization check.
    ///
    /// # Errors
    /// [`DomainError::Validation`] if `id` is empty, [`DomainError::Upstream`]
    /// if the identity service refuses.
    pub async fn delete_account(&self, id: &AccountId) -> Result<(), DomainError> {
        if id.as_str().trim().is_empty() {
            return Err(DomainError::validation("uid", "must be a non-empty string"));
        }

        self.identity.delete_account(id).await?;
        info!(uid = %id, "account deleted");
        Ok(())
    }

    async fn authorize(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        policy: &RolePolicy,
    ) -> Result<(), DomainError> {
        let caller = ctx.uid().unwrap_or("anonymous");
        match self.guard.authorize(ctx, policy).await {
            Ok(()) => {
                debug!(operation, %policy, caller, "authorized");
                Ok(())
            }
            Err(e) => {
                warn!(operation, %policy, caller, error = %e, "authorization refused");
                Err(e.into())
            }
        }
    }
}
