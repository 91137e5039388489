use thiserror::Error;

/// Errors while loading service-account credentials.
///
/// Messages never include the private key.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to read credentials file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credentials document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("missing credentials field: {0}")]
    MissingField(&'static str),

    #[error("invalid private key: {0}")]
    InvalidKey(String),
}

/// Errors returned by the outbound service-account token flow.
///
/// No variant ever carries the assertion, the private key, or an access token.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenError {
    /// HTTP transport or status error during token acquisition.
    #[error("{0}")]
    Http(String),

    /// The signed assertion could not be produced.
    #[error("failed to sign token assertion: {0}")]
    Signing(String),

    /// The token endpoint returned a `token_type` that is not `Bearer`.
    #[error("unsupported token type: {0}")]
    UnsupportedTokenType(String),

    #[error("token config error: {0}")]
    ConfigError(String),

    /// The token watcher is not ready or has been shut down.
    #[error("token unavailable: {0}")]
    Unavailable(String),
}

impl TokenError {
    pub(crate) fn from_http(e: &reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Http(format!("service account token HTTP {status}")),
            None if e.is_timeout() => Self::Http("service account token request timed out".into()),
            None => Self::Http(format!("service account token transport error: {e}")),
        }
    }
}
