#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Accounts module implementation
//!
//! Two callables, `registerUser` and `unregisterUser`, each guarded by a
//! configurable role policy. The public API is defined in `accounts-sdk` and
//! re-exported here.

pub use accounts_sdk::{AccountId, AccountsClientV1, AccountsError, NewAccount};

pub mod module;
pub use module::AccountsModule;

pub mod local_client;

#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
#[doc(hidden)]
pub mod test_support;

pub use config::{AccountsConfig, ConfigError, EntryPolicies, IdentityConfig, RoleStoreConfig};
pub use domain::guard::{GuardError, RoleGuard, RolePolicy};
