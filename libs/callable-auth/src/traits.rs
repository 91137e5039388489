use async_trait::async_trait;
use callable_security::{AuthInfo, SecretString};
use jsonwebtoken::Header;
use serde_json::Value;

use crate::claims_error::ClaimsError;
use crate::service_account::TokenError;

/// Source of verification keys for caller ID tokens
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Returns the name of this provider (for debugging/logging)
    fn name(&self) -> &str;

    /// Validate the JWT signature and decode its header and raw claims.
    ///
    /// Time-based and audience checks are left to the caller.
    async fn validate_and_decode(&self, token: &str) -> Result<(Header, Value), ClaimsError>;

    /// Refresh keys if this provider supports it (e.g., JWKS)
    async fn refresh_keys(&self) -> Result<(), ClaimsError> {
        Ok(())
    }
}

/// Turns a bearer token presented by a caller into a verified identity
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<AuthInfo, ClaimsError>;
}

/// Supplies OAuth2 access tokens for outbound calls to managed services
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Current bearer token. Never performs a network call on the hot path.
    ///
    /// # Errors
    /// Returns [`TokenError::Unavailable`] if no valid token is cached.
    fn access_token(&self) -> Result<SecretString, TokenError>;

    /// Drop the cached token after the upstream rejected it.
    async fn invalidate(&self) {}
}
