use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use aliri_clock::DurationSecs;
use aliri_tokens::backoff::ErrorBackoffConfig;
use aliri_tokens::jitter::RandomEarlyJitter;
use aliri_tokens::{TokenStatus, TokenWatcher};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use callable_security::SecretString;

use super::credentials::ServiceAccountCredentials;
use super::error::TokenError;
use super::source::{DEFAULT_SCOPES, ServiceAccountTokenSource};
use crate::traits::AccessTokenProvider;

/// Refresh tuning for service-account tokens
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub scopes: Vec<String>,
    /// Lifetime assumed when the endpoint omits `expires_in`
    pub default_ttl: Duration,
    /// How long before expiry a token turns stale
    pub refresh_offset: Duration,
    /// Lower bound on the stale window and base of the error backoff
    pub min_refresh_period: Duration,
    /// Upper bound of the random early refresh jitter
    pub jitter_max: Duration,
    pub http_timeout: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_owned()).collect(),
            default_ttl: Duration::from_secs(3600),
            refresh_offset: Duration::from_secs(300),
            min_refresh_period: Duration::from_secs(10),
            jitter_max: Duration::from_secs(30),
            http_timeout: Duration::from_secs(10),
        }
    }
}

struct TokenInner {
    watcher: TokenWatcher,
}

/// Handle for obtaining service-account bearer tokens.
///
/// Drives an `aliri_tokens::TokenWatcher` for background refresh and exposes
/// lock-free reads through `ArcSwap`. Clone freely across tasks.
#[derive(Clone)]
pub struct ServiceAccountToken {
    inner: Arc<ArcSwap<TokenInner>>,
    credentials: Arc<ServiceAccountCredentials>,
    config: Arc<TokenConfig>,
}

impl fmt::Debug for ServiceAccountToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountToken")
            .field("client_email", &self.credentials.client_email())
            .finish_non_exhaustive()
    }
}

impl ServiceAccountToken {
    /// Create the handle and start background refresh.
    ///
    /// Performs an initial token fetch, so an unreachable token endpoint or
    /// rejected credentials fail here rather than on the first call.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::ConfigError`] if the private key is unusable.
    /// Returns [`TokenError::Http`] if the initial token fetch fails.
    pub async fn new(
        credentials: ServiceAccountCredentials,
        config: TokenConfig,
    ) -> Result<Self, TokenError> {
        let source = ServiceAccountTokenSource::new(&credentials, &config)?;
        let watcher = spawn_watcher(source, &config).await?;

        tracing::info!(
            client_email = credentials.client_email(),
            "service account token source started"
        );

        Ok(Self {
            inner: Arc::new(ArcSwap::from_pointee(TokenInner { watcher })),
            credentials: Arc::new(credentials),
            config: Arc::new(config),
        })
    }

    /// Current bearer token, read without blocking on the network.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Unavailable`] if the cached token has expired
    /// and the background watcher has not refreshed it yet.
    pub fn get(&self) -> Result<SecretString, TokenError> {
        let guard = self.inner.load();
        let borrowed = guard.watcher.token();
        if matches!(borrowed.token_status(), TokenStatus::Expired) {
            return Err(TokenError::Unavailable(
                "token expired, refresh pending".into(),
            ));
        }
        Ok(SecretString::new(borrowed.access_token().as_str()))
    }

    /// Replace the watcher with a freshly spawned one.
    ///
    /// Called after an upstream 401 to discard a possibly revoked token. On
    /// failure the existing watcher stays in place.
    pub async fn invalidate(&self) {
        let source = match ServiceAccountTokenSource::new(&self.credentials, &self.config) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("service account token invalidation: failed to create source: {e}");
                return;
            }
        };

        let watcher = match spawn_watcher(source, &self.config).await {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!("service account token invalidation: initial fetch failed: {e}");
                return;
            }
        };

        self.inner.store(Arc::new(TokenInner { watcher }));
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountToken {
    fn access_token(&self) -> Result<SecretString, TokenError> {
        self.get()
    }

    async fn invalidate(&self) {
        ServiceAccountToken::invalidate(self).await;
    }
}

async fn spawn_watcher(
    source: ServiceAccountTokenSource,
    config: &TokenConfig,
) -> Result<TokenWatcher, TokenError> {
    let jitter = RandomEarlyJitter::new(DurationSecs(config.jitter_max.as_secs()));
    let backoff =
        ErrorBackoffConfig::new(config.min_refresh_period, config.min_refresh_period * 30, 2);

    TokenWatcher::spawn_from_token_source(source, jitter, backoff).await
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::testing;
    use httpmock::prelude::*;

    fn test_config() -> TokenConfig {
        TokenConfig {
            jitter_max: Duration::from_millis(0),
            min_refresh_period: Duration::from_millis(100),
            http_timeout: Duration::from_secs(5),
            ..TokenConfig::default()
        }
    }

    fn token_json(token: &str, expires_in: u64) -> String {
        format!(r#"{{"access_token":"{token}","expires_in":{expires_in},"token_type":"Bearer"}}"#)
    }

    #[test]
    fn token_is_send_sync_clone() {
        fn assert_traits<T: Send + Sync + Clone>() {}
        assert_traits::<ServiceAccountToken>();
    }

    #[tokio::test]
    async fn new_fetches_and_get_returns_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(token_json("tok-1", 3600));
        });

        let creds = testing::service_account_credentials().with_token_uri(server.url("/token"));
        let token = ServiceAccountToken::new(creds, test_config()).await.unwrap();

        assert_eq!(token.get().unwrap().expose(), "tok-1");
        assert_eq!(token.access_token().unwrap().expose(), "tok-1");
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn new_fails_when_endpoint_rejects() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(401)
                .header("content-type", "application/json")
                .body(r#"{"error":"invalid_client"}"#);
        });

        let creds = testing::service_account_credentials().with_token_uri(server.url("/token"));
        let err = ServiceAccountToken::new(creds, test_config()).await.unwrap_err();
        assert!(matches!(err, TokenError::Http(ref m) if m.contains("401")), "got: {err}");
    }

    #[tokio::test]
    async fn invalidate_replaces_token() {
        let server = MockServer::start();
        let mut first = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(token_json("tok-old", 3600));
        });

        let creds = testing::service_account_credentials().with_token_uri(server.url("/token"));
        let token = ServiceAccountToken::new(creds, test_config()).await.unwrap();
        assert_eq!(token.get().unwrap().expose(), "tok-old");

        first.delete();
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(token_json("tok-new", 3600));
        });

        token.invalidate().await;
        assert_eq!(token.get().unwrap().expose(), "tok-new");
    }

    #[tokio::test]
    async fn failed_invalidate_keeps_existing_token() {
        let server = MockServer::start();
        let mut ok = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(token_json("tok-keep", 3600));
        });

        let creds = testing::service_account_credentials().with_token_uri(server.url("/token"));
        let token = ServiceAccountToken::new(creds, test_config()).await.unwrap();

        ok.delete();
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(503);
        });

        token.invalidate().await;
        assert_eq!(token.get().unwrap().expose(), "tok-keep");
    }

    #[test]
    fn default_scopes_include_database() {
        let cfg = TokenConfig::default();
        assert!(cfg.scopes.iter().any(|s| s.ends_with("firebase.database")));
    }
}
