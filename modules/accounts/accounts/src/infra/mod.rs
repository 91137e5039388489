//! REST adapters for the managed services behind the domain ports.

pub mod identity_toolkit;
pub mod realtime_db;

pub use identity_toolkit::IdentityToolkitClient;
pub use realtime_db::RealtimeDatabaseClient;

use callable_auth::AccessTokenProvider;
use callable_errors::ErrorCode;
use callable_security::SecretString;
use thiserror::Error;
use url::Url;

use crate::domain::ports::UpstreamError;

#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("invalid service URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// `base` with `segments` appended as percent-encoded path segments.
///
/// `base` may carry a path prefix (emulators serve the API under one).
pub(crate) fn service_url<I>(base: &str, segments: I) -> Result<Url, ClientBuildError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let invalid = |reason: String| ClientBuildError::InvalidUrl {
        url: base.to_owned(),
        reason,
    };

    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("URL cannot be a base".to_owned()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn access_token(
    tokens: &dyn AccessTokenProvider,
    service: &'static str,
) -> Result<SecretString, UpstreamError> {
    tokens.access_token().map_err(|e| {
        tracing::warn!(service, error = %e, "no access token for outbound call");
        UpstreamError::new(
            ErrorCode::Unavailable,
            service,
            "ACCESS_TOKEN_UNAVAILABLE",
            "service credentials are not ready",
        )
    })
}

/// Failure to get any HTTP response at all.
pub(crate) fn transport_error(service: &'static str, e: &reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::new(ErrorCode::DeadlineExceeded, service, "TIMEOUT", "request timed out")
    } else {
        UpstreamError::new(
            ErrorCode::Unavailable,
            service,
            "TRANSPORT",
            format!("request failed: {e}"),
        )
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn service_url_keeps_base_path() {
        let url = service_url(
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/",
            ["v1", "projects", "demo", "accounts:delete"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/projects/demo/accounts:delete"
        );
    }

    #[test]
    fn service_url_encodes_segments() {
        let url = service_url("https://db.example.com", ["roles", "a/b c", "role.json"]).unwrap();
        assert_eq!(url.path(), "/roles/a%2Fb%20c/role.json");
    }

    #[test]
    fn service_url_rejects_non_base() {
        assert!(matches!(
            service_url("mailto:ops@example.com", ["x"]),
            Err(ClientBuildError::InvalidUrl { .. })
        ));
    }
}
