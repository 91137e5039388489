use std::sync::Arc;

use accounts_sdk::AccountsClientV1;
use axum::Router;
use callable_auth::CallerState;

use crate::api::rest::routes;
use crate::config::{AccountsConfig, ConfigError};
use crate::domain::guard::RoleGuard;
use crate::domain::ports::{IdentityProvider, RoleStore};
use crate::domain::service::AccountsService;
use crate::local_client::AccountsLocalClient;

/// The accounts module: the guarded service plus its two callables.
///
/// Built once at startup from already constructed clients.
#[derive(Clone)]
pub struct AccountsModule {
    service: Arc<AccountsService>,
}

impl AccountsModule {
    /// # Errors
    /// Returns [`ConfigError`] if `config` is invalid, or if it names a
    /// role store and `role_store` is `None`.
    pub fn new(
        config: &AccountsConfig,
        identity: Arc<dyn IdentityProvider>,
        role_store: Option<Arc<dyn RoleStore>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let guard = match (&config.role_store, role_store) {
            (Some(location), Some(store)) => {
                RoleGuard::new(store, location.table.clone(), location.column.clone())
            }
            (Some(_), None) => return Err(ConfigError::RoleStoreClientMissing),
            (None, _) => RoleGuard::without_role_store(),
        };

        tracing::info!(
            register_user = %config.policies.register_user,
            unregister_user = %config.policies.unregister_user,
            role_store = config.role_store.is_some(),
            "accounts module initialized"
        );

        let service = AccountsService::new(identity, guard, config.policies.clone());
        Ok(Self {
            service: Arc::new(service),
        })
    }

    #[must_use]
    pub fn service(&self) -> Arc<AccountsService> {
        Arc::clone(&self.service)
    }

    /// In-process client running the same guarded operations
    #[must_use]
    pub fn client(&self) -> Arc<dyn AccountsClientV1> {
        Arc::new(AccountsLocalClient::new(self.service()))
    }

    /// Router serving `POST /registerUser` and `POST /unregisterUser`
    #[must_use]
    pub fn router(&self, caller: CallerState) -> Router {
        routes::register_routes(Router::new(), self.service(), caller)
    }
}
