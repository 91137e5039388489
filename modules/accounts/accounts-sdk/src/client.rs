//! `AccountsClientV1` trait definition.
//!
//! Every call is made on behalf of a caller described by a `CallContext`; the
//! configured role policy of the operation is enforced before any side
//! effect.

use async_trait::async_trait;
use callable_security::CallContext;

use crate::errors::AccountsError;
use crate::models::{AccountId, NewAccount};

/// Public API trait for the `accounts` module.
#[async_trait]
pub trait AccountsClientV1: Send + Sync {
    /// Create an account with email/password sign-in and return its id.
    async fn register_user(
        &self,
        ctx: &CallContext,
        account: NewAccount,
    ) -> Result<AccountId, AccountsError>;

    /// Delete the account with the given id.
    async fn unregister_user(&self, ctx: &CallContext, id: AccountId)
    -> Result<(), AccountsError>;
}
