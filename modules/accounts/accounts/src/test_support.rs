//! In-memory implementations of the outbound ports.
//!
//! Used by unit and integration tests, and by local runs without managed
//! services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use accounts_sdk::{AccountId, NewAccount};
use async_trait::async_trait;
use callable_errors::ErrorCode;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::ports::{
    IDENTITY_SERVICE, IdentityError, IdentityProvider, RoleStore, RoleStoreError, UpstreamError,
};

#[derive(Default)]
struct Accounts {
    by_id: HashMap<String, String>,
}

/// Identity provider keeping accounts in a map.
///
/// Enforces email uniqueness and reports the same reasons as the managed
/// service (`EMAIL_EXISTS`, `USER_NOT_FOUND`).
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    accounts: Mutex<Accounts>,
    creates: AtomicUsize,
    deletes: AtomicUsize,
}

impl InMemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create_account` calls, successful or not.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of `delete_account` calls, successful or not.
    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.accounts.lock().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn email_of(&self, id: &AccountId) -> Option<String> {
        self.accounts.lock().await.by_id.get(id.as_str()).cloned()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn create_account(&self, account: &NewAccount) -> Result<AccountId, IdentityError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().await;

        if accounts.by_id.values().any(|email| email == &account.email) {
            return Err(UpstreamError::new(
                ErrorCode::AlreadyExists,
                IDENTITY_SERVICE,
                "EMAIL_EXISTS",
                "The email address is already in use by another account.",
            ));
        }

        let id = Uuid::new_v4().simple().to_string();
        accounts.by_id.insert(id.clone(), account.email.clone());
        Ok(AccountId::new(id))
    }

    async fn delete_account(&self, id: &AccountId) -> Result<(), IdentityError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().await;

        if accounts.by_id.remove(id.as_str()).is_none() {
            return Err(UpstreamError::new(
                ErrorCode::NotFound,
                IDENTITY_SERVICE,
                "USER_NOT_FOUND",
                "There is no user record corresponding to the provided identifier.",
            ));
        }
        Ok(())
    }
}

/// Role store backed by a map of `table/uid/column` paths to JSON values.
#[derive(Default)]
pub struct InMemoryRoleStore {
    records: Mutex<HashMap<String, Value>>,
    failure: Mutex<Option<UpstreamError>>,
    reads: AtomicUsize,
}

impl InMemoryRoleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_role(&self, table: &str, uid: &str, column: &str, role: impl Into<Value>) {
        self.records
            .lock()
            .await
            .insert(record_path(table, uid, column), role.into());
    }

    /// Make every following read fail with `error`.
    pub async fn fail_with(&self, error: UpstreamError) {
        *self.failure.lock().await = Some(error);
    }

    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

fn record_path(table: &str, uid: &str, column: &str) -> String {
    format!("{table}/{uid}/{column}")
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn read_role(
        &self,
        table: &str,
        uid: &str,
        column: &str,
    ) -> Result<Option<Value>, RoleStoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.lock().await.clone() {
            return Err(err);
        }

        Ok(self
            .records
            .lock()
            .await
            .get(&record_path(table, uid, column))
            .filter(|v| !v.is_null())
            .cloned())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_rejected_until_deleted() {
        let idp = InMemoryIdentityProvider::new();
        let account = NewAccount::new("a@x.com", "hunter2");

        let id = idp.create_account(&account).await.unwrap();
        let dup = idp.create_account(&account).await.unwrap_err();
        assert_eq!(dup.code, ErrorCode::AlreadyExists);
        assert_eq!(dup.reason, "EMAIL_EXISTS");

        idp.delete_account(&id).await.unwrap();
        assert!(idp.create_account(&account).await.is_ok());
        assert_eq!(idp.create_calls(), 3);
    }

    #[tokio::test]
    async fn role_values_are_returned_as_stored() {
        let store = InMemoryRoleStore::new();
        store.set_role("roles", "u-1", "role", "admin").await;
        store.set_role("roles", "u-2", "role", 7).await;
        store.set_role("roles", "u-4", "role", Value::Null).await;

        assert_eq!(
            store.read_role("roles", "u-1", "role").await.unwrap(),
            Some(Value::from("admin"))
        );
        assert_eq!(
            store.read_role("roles", "u-2", "role").await.unwrap(),
            Some(Value::from(7))
        );
        assert_eq!(store.read_role("roles", "u-3", "role").await.unwrap(), None);
        assert_eq!(store.read_role("roles", "u-4", "role").await.unwrap(), None);
        assert_eq!(store.reads(), 4);
    }
}
