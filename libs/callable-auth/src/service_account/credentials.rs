use std::fmt;
use std::path::Path;

use callable_security::SecretString;
use jsonwebtoken::EncodingKey;
use serde::Deserialize;

use super::error::CredentialsError;

/// Token endpoint used when the credentials document does not name one
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Deserialize)]
struct RawCredentials {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    client_email: Option<String>,
    #[serde(default)]
    private_key: Option<SecretString>,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

/// Service-account identity used for all outbound calls
#[derive(Clone)]
pub struct ServiceAccountCredentials {
    project_id: String,
    client_email: String,
    private_key: SecretString,
    private_key_id: Option<String>,
    token_uri: String,
}

impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &self.private_key)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountCredentials {
    /// Parse a service-account JSON document.
    ///
    /// # Errors
    /// Returns [`CredentialsError`] if the document is not valid JSON or a
    /// required field (`project_id`, `client_email`, `private_key`) is
    /// missing or empty.
    pub fn from_json(json: &str) -> Result<Self, CredentialsError> {
        let raw: RawCredentials = serde_json::from_str(json)?;

        let project_id = non_empty(raw.project_id, "project_id")?;
        let client_email = non_empty(raw.client_email, "client_email")?;
        let private_key = raw
            .private_key
            .filter(|k| !k.is_empty())
            .ok_or(CredentialsError::MissingField("private_key"))?;

        Ok(Self {
            project_id,
            client_email,
            private_key: normalize_pem(&private_key),
            private_key_id: raw.private_key_id.filter(|id| !id.is_empty()),
            token_uri: raw
                .token_uri
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_owned()),
        })
    }

    /// Read and parse a service-account JSON file.
    ///
    /// # Errors
    /// Returns [`CredentialsError::Io`] if the file cannot be read, otherwise
    /// the same errors as [`from_json`](Self::from_json).
    pub fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        let json = std::fs::read_to_string(path).map_err(|source| CredentialsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[must_use]
    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    #[must_use]
    pub fn private_key_id(&self) -> Option<&str> {
        self.private_key_id.as_deref()
    }

    #[must_use]
    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// Override the token endpoint (emulators and tests).
    #[must_use]
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// RSA signing key for token assertions.
    ///
    /// # Errors
    /// Returns [`CredentialsError::InvalidKey`] if the PEM cannot be parsed.
    pub fn encoding_key(&self) -> Result<EncodingKey, CredentialsError> {
        EncodingKey::from_rsa_pem(self.private_key.expose().as_bytes())
            .map_err(|e| CredentialsError::InvalidKey(e.to_string()))
    }
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, CredentialsError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(CredentialsError::MissingField(field))
}

/// Keys pasted through environment variables often carry literal `\n`.
fn normalize_pem(key: &SecretString) -> SecretString {
    let raw = key.expose();
    if raw.contains('\n') || !raw.contains("\\n") {
        return key.clone();
    }
    SecretString::new(raw.replace("\\n", "\n"))
}
