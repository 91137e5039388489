//! Accounts SDK
//!
//! Public API of the `accounts` module:
//! - `AccountsClientV1` trait
//! - Model types (`NewAccount`, `AccountId`)
//! - Error type (`AccountsError`)
//!
//! ## Usage
//!
//! ```ignore
//! use accounts_sdk::{AccountsClientV1, NewAccount};
//!
//! let id = client.register_user(&ctx, NewAccount::new("a@x.com", "pw")).await?;
//! client.unregister_user(&ctx, id).await?;
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod client;
pub mod errors;
pub mod models;

pub use client::AccountsClientV1;
pub use errors::AccountsError;
pub use models::{AccountId, NewAccount};
