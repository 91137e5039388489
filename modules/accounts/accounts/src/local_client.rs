use std::sync::Arc;

use accounts_sdk::{AccountId, AccountsClientV1, AccountsError, NewAccount};
use async_trait::async_trait;
use callable_security::CallContext;

use crate::domain::service::AccountsService;

/// In-process [`AccountsClientV1`] over the domain service.
///
/// Runs the same role guard as the HTTP callables.
pub struct AccountsLocalClient {
    service: Arc<AccountsService>,
}

impl AccountsLocalClient {
    #[must_use]
    pub fn new(service: Arc<AccountsService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl AccountsClientV1 for AccountsLocalClient {
    async fn register_user(
        &self,
        ctx: &CallContext,
        account: NewAccount,
    ) -> Result<AccountId, AccountsError> {
        self.service
            .register_user(ctx, account)
            .await
            .map_err(Into::into)
    }

    async fn unregister_user(&self, ctx: &CallContext, id: AccountId) -> Result<(), AccountsError> {
        self.service
            .unregister_user(ctx, id)
            .await
            .map_err(Into::into)
    }
}
