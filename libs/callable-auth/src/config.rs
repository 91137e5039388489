use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::jwks::{DEFAULT_JWKS_URI, JwksKeyProvider};
use crate::validation::{DEFAULT_ISSUER_PREFIX, ValidationConfig};
use crate::verifier::IdTokenVerifier;

/// Caller ID token verification settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// JWKS endpoint publishing the token signing keys
    #[serde(default = "default_jwks_uri")]
    pub jwks_uri: String,

    /// Expected issuer is this prefix followed by the project id
    #[serde(default = "default_issuer_prefix")]
    pub issuer_prefix: String,

    /// Leeway in seconds for time-based validations (exp, iat)
    #[serde(default = "default_leeway")]
    pub leeway_seconds: i64,

    /// Key lifetime in seconds when the JWKS response carries no `max-age`
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
}

fn default_jwks_uri() -> String {
    DEFAULT_JWKS_URI.to_owned()
}

fn default_issuer_prefix() -> String {
    DEFAULT_ISSUER_PREFIX.to_owned()
}

fn default_leeway() -> i64 {
    60
}

fn default_refresh_interval() -> u64 {
    300
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwks_uri: default_jwks_uri(),
            issuer_prefix: default_issuer_prefix(),
            leeway_seconds: default_leeway(),
            refresh_interval_seconds: default_refresh_interval(),
        }
    }
}

impl AuthConfig {
    /// Build a JWKS-backed verifier for tokens issued to `project_id`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn build_verifier(&self, project_id: &str) -> Result<IdTokenVerifier, reqwest::Error> {
        let keys = JwksKeyProvider::new(self.jwks_uri.clone())?
            .with_refresh_interval(Duration::from_secs(self.refresh_interval_seconds));

        Ok(IdTokenVerifier::new(
            Arc::new(keys),
            ValidationConfig::for_project(project_id, &self.issuer_prefix, self.leeway_seconds),
        ))
    }
}
