use std::time::Duration;

use aliri_clock::DurationSecs;
use aliri_tokens::sources::AsyncTokenSource;
use aliri_tokens::{AccessToken, IdToken, TokenLifetimeConfig, TokenWithLifetime};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;
use time::OffsetDateTime;
use zeroize::Zeroizing;

use super::credentials::ServiceAccountCredentials;
use super::error::TokenError;
use super::token::TokenConfig;

/// Scopes requested for the service account
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/identitytoolkit",
    "https://www.googleapis.com/auth/firebase.database",
    "https://www.googleapis.com/auth/userinfo.email",
];

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of the signed assertion itself (the endpoint caps it at 1 hour)
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Token source that exchanges a signed service-account assertion for an
/// access token.
///
/// Implements [`AsyncTokenSource`] so that `aliri_tokens` drives refresh
/// scheduling, jitter, and backoff.
pub struct ServiceAccountTokenSource {
    client: reqwest::Client,
    token_uri: String,
    client_email: String,
    key_id: Option<String>,
    signing_key: EncodingKey,
    scopes: String,
    default_ttl: Duration,
    refresh_offset: Duration,
    min_refresh_period: Duration,
}

impl ServiceAccountTokenSource {
    /// # Errors
    ///
    /// Returns [`TokenError::ConfigError`] if the private key is unusable or
    /// the HTTP client fails to build.
    pub fn new(
        credentials: &ServiceAccountCredentials,
        config: &TokenConfig,
    ) -> Result<Self, TokenError> {
        let signing_key = credentials
            .encoding_key()
            .map_err(|e| TokenError::ConfigError(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| TokenError::ConfigError(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            token_uri: credentials.token_uri().to_owned(),
            client_email: credentials.client_email().to_owned(),
            key_id: credentials.private_key_id().map(ToOwned::to_owned),
            signing_key,
            scopes: config.scopes.join(" "),
            default_ttl: config.default_ttl,
            refresh_offset: config.refresh_offset,
            min_refresh_period: config.min_refresh_period,
        })
    }

    fn sign_assertion(&self, now: i64) -> Result<Zeroizing<String>, TokenError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.key_id);

        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: &self.scopes,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        encode(&header, &claims, &self.signing_key)
            .map(Zeroizing::new)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

#[async_trait]
impl AsyncTokenSource for ServiceAccountTokenSource {
    type Error = TokenError;

    async fn request_token(&mut self) -> Result<TokenWithLifetime, Self::Error> {
        let assertion = self.sign_assertion(OffsetDateTime::now_utc().unix_timestamp())?;
        let fields = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        let token_resp: super::TokenResponse = self
            .client
            .post(&self.token_uri)
            .form(fields.as_slice())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| TokenError::from_http(&e))?
            .json()
            .await
            .map_err(|e| TokenError::from_http(&e))?;

        if let Some(ref tt) = token_resp.token_type
            && !tt.eq_ignore_ascii_case("bearer")
        {
            return Err(TokenError::UnsupportedTokenType(tt.clone()));
        }

        let lifetime_secs = token_resp.expires_in.unwrap_or(self.default_ttl.as_secs());
        let (freshness, min_stale) =
            refresh_params(lifetime_secs, &self.refresh_offset, &self.min_refresh_period);
        let lifetime_config = TokenLifetimeConfig::new(freshness, min_stale);

        tracing::debug!(lifetime_secs, "service account token acquired");

        let access_token = AccessToken::new(token_resp.access_token);
        Ok(lifetime_config.create_token(
            &access_token,
            None::<&IdToken>,
            DurationSecs(lifetime_secs),
        ))
    }
}

/// Compute `(freshness_period, min_staleness_period)` for
/// [`TokenLifetimeConfig`] so that the stale time never exceeds expiry.
///
/// - `offset < lifetime`: stale `offset` seconds before expiry.
/// - `offset >= lifetime`: stale at 50% of lifetime.
/// - zero lifetime: immediately stale.
#[allow(clippy::integer_division, clippy::cast_precision_loss)]
fn refresh_params(
    lifetime_secs: u64,
    refresh_offset: &Duration,
    min_refresh_period: &Duration,
) -> (f64, DurationSecs) {
    if lifetime_secs == 0 {
        return (0.0, DurationSecs(0));
    }

    let offset = refresh_offset.as_secs();
    let desired_delay = if offset < lifetime_secs {
        lifetime_secs - offset
    } else {
        lifetime_secs / 2
    };

    let freshness = (desired_delay as f64) / (lifetime_secs as f64);
    let min_stale = min_refresh_period.as_secs().min(desired_delay);

    (freshness, DurationSecs(min_stale))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::testing;
    use httpmock::prelude::*;

    fn source_for(server: &MockServer) -> ServiceAccountTokenSource {
        let creds = testing::service_account_credentials().with_token_uri(server.url("/token"));
        ServiceAccountTokenSource::new(&creds, &TokenConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn exchanges_signed_assertion_for_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .body_includes("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer")
                .body_includes("assertion=ey");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"access_token":"ya29.tok","expires_in":3599,"token_type":"Bearer"}"#);
        });

        let token = source_for(&server).request_token().await.unwrap();
        assert_eq!(token.access_token().as_str(), "ya29.tok");
        assert_eq!(token.lifetime(), DurationSecs(3599));
        mock.assert();
    }

    #[tokio::test]
    async fn assertion_carries_service_account_claims() {
        let server = MockServer::start();
        let source = source_for(&server);

        let assertion = source.sign_assertion(1_700_000_000).unwrap();
        let header = jsonwebtoken::decode_header(assertion.as_str()).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);

        let mut validation = jsonwebtoken::Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.set_audience(&[server.url("/token")]);
        let data = jsonwebtoken::decode::<serde_json::Value>(
            assertion.as_str(),
            &testing::decoding_key(),
            &validation,
        )
        .unwrap();

        assert_eq!(data.claims["iss"], testing::SERVICE_ACCOUNT_EMAIL);
        assert_eq!(data.claims["exp"], 1_700_000_000 + 3600);
        assert!(
            data.claims["scope"]
                .as_str()
                .unwrap()
                .contains("https://www.googleapis.com/auth/identitytoolkit")
        );
    }

    #[tokio::test]
    async fn missing_expires_in_uses_default_ttl() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"access_token":"tok"}"#);
        });

        let token = source_for(&server).request_token().await.unwrap();
        assert_eq!(token.lifetime(), DurationSecs(TokenConfig::default().default_ttl.as_secs()));
    }

    #[tokio::test]
    async fn rejected_grant_is_http_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(400)
                .header("content-type", "application/json")
                .body(r#"{"error":"invalid_grant"}"#);
        });

        let err = source_for(&server).request_token().await.unwrap_err();
        assert!(
            matches!(err, TokenError::Http(ref msg) if msg.contains("400")),
            "expected Http error with 400, got: {err}"
        );
    }

    #[tokio::test]
    async fn unsupported_token_type_returns_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"access_token":"tok","token_type":"mac"}"#);
        });

        let err = source_for(&server).request_token().await.unwrap_err();
        assert!(matches!(err, TokenError::UnsupportedTokenType(ref t) if t == "mac"));
    }

    #[test]
    fn refresh_params_normal_and_short_lived() {
        let (freshness, min_stale) =
            refresh_params(3600, &Duration::from_secs(300), &Duration::from_secs(10));
        assert!((freshness - 3300.0 / 3600.0).abs() < 1e-9);
        assert_eq!(min_stale, DurationSecs(10));

        let (freshness, _) = refresh_params(60, &Duration::from_secs(300), &Duration::from_secs(10));
        assert!((freshness - 0.5).abs() < 1e-9);

        assert_eq!(refresh_params(0, &Duration::ZERO, &Duration::ZERO).1, DurationSecs(0));
    }
}
