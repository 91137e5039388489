#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Caller identity and outbound credentials for callable endpoints.
//!
//! - [`IdTokenVerifier`]: verifies caller ID tokens against a JWKS
//! - [`axum_ext`]: middleware putting a [`callable_security::CallContext`] on
//!   every request, and the [`Caller`] extractor reading it
//! - [`service_account`]: service-account credentials and refreshed access
//!   tokens for calls to managed services

pub mod axum_ext;
pub mod claims_error;
pub mod config;
pub mod jwks;
pub mod service_account;
pub mod traits;
pub mod validation;
pub mod verifier;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use axum_ext::{Caller, CallerState, extract_bearer_token, resolve_caller};
pub use claims_error::ClaimsError;
pub use config::AuthConfig;
pub use jwks::{JwksKeyProvider, run_jwks_refresh_task};
pub use traits::{AccessTokenProvider, KeyProvider, TokenValidator};
pub use validation::ValidationConfig;
pub use verifier::IdTokenVerifier;
