//! Outbound service-account authentication.
//!
//! Loads service-account credentials and exchanges a signed JWT assertion
//! (RFC 7523 JWT-bearer grant) for access tokens used against the managed
//! identity and database services.

pub mod credentials;
pub mod error;
pub(crate) mod source;
pub mod token;

pub use credentials::{DEFAULT_TOKEN_URI, ServiceAccountCredentials};
pub use error::{CredentialsError, TokenError};
pub use source::DEFAULT_SCOPES;
pub use token::{ServiceAccountToken, TokenConfig};

/// Deserialized token endpoint response.
///
/// `Deserialize`-only so the access token cannot end up in serialized output.
#[derive(serde::Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}
