use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::guard::RolePolicy;

/// Base URL of the Identity Toolkit admin API
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

/// Configuration of the accounts module
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AccountsConfig {
    #[serde(default)]
    pub policies: EntryPolicies,

    /// Where caller roles are read from. Required when any policy names a
    /// specific role.
    #[serde(default)]
    pub role_store: Option<RoleStoreConfig>,
}

/// Role policy applied by each entry operation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EntryPolicies {
    #[serde(default)]
    pub register_user: RolePolicy,
    #[serde(default)]
    pub unregister_user: RolePolicy,
}

/// Location of role records: `{database_url}/{table}/{uid}/{column}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RoleStoreConfig {
    pub database_url: String,
    pub table: String,
    pub column: String,
}

/// Identity service client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_base_url")]
    pub base_url: String,

    /// Outbound request timeout (humantime, e.g. `10s`)
    #[serde(default = "default_identity_timeout", with = "humantime_duration")]
    pub timeout: Duration,
}

fn default_identity_base_url() -> String {
    DEFAULT_IDENTITY_BASE_URL.to_owned()
}

fn default_identity_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: default_identity_base_url(),
            timeout: default_identity_timeout(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("policy requires role `{role}` but no role_store is configured")]
    MissingRoleStore { role: String },

    #[error("role_store.{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("invalid URL in {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("specific_role must name a non-empty role")]
    EmptyRole,

    #[error("role_store is configured but no role store client was provided")]
    RoleStoreClientMissing,
}

impl AccountsConfig {
    /// Check cross-field rules serde cannot express.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for policy in [&self.policies.register_user, &self.policies.unregister_user] {
            if let RolePolicy::SpecificRole(role) = policy {
                if role.is_empty() {
                    return Err(ConfigError::EmptyRole);
                }
                if self.role_store.is_none() {
                    return Err(ConfigError::MissingRoleStore { role: role.clone() });
                }
            }
        }

        if let Some(store) = &self.role_store {
            store.validate()?;
        }

        Ok(())
    }
}

impl RoleStoreConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.table.trim().is_empty() {
            return Err(ConfigError::EmptyField { field: "table" });
        }
        if self.column.trim().is_empty() {
            return Err(ConfigError::EmptyField { field: "column" });
        }
        url::Url::parse(&self.database_url).map_err(|e| ConfigError::InvalidUrl {
            field: "role_store.database_url",
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

impl IdentityConfig {
    /// # Errors
    /// Returns [`ConfigError::InvalidUrl`] if `base_url` does not parse.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidUrl {
            field: "identity.base_url",
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// Serde support for `Duration` fields written as humantime strings
/// (`"10s"`, `"1m 30s"`).
pub mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    /// # Errors
    /// Returns the serializer's error.
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&humantime::format_duration(*d))
    }

    /// # Errors
    /// Returns an error if the value is not a humantime duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(&raw)
            .map_err(|e| de::Error::custom(format!("invalid duration `{raw}`: {e}")))
    }
}
