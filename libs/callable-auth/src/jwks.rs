//! Signing keys for caller ID tokens, fetched from a JWKS endpoint.
//!
//! The key set is read lock-free on every request. Fetches are serialized
//! behind one async mutex, so a burst of tokens with a freshly rotated `kid`
//! costs a single round trip.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use http::HeaderMap;
use http::header::CACHE_CONTROL;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, decode_header};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::claims_error::ClaimsError;
use crate::traits::KeyProvider;

/// Public keys used to sign Firebase ID tokens
pub const DEFAULT_JWKS_URI: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const MIN_KEY_TTL: Duration = Duration::from_secs(60);
const MAX_KEY_TTL: Duration = Duration::from_secs(24 * 3600);
const RETRY_BASE: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    #[serde(default)]
    alg: Option<String>,
    #[serde(default, rename = "use")]
    key_use: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

impl Jwk {
    fn is_rs256_signing_key(&self) -> bool {
        self.kty == "RSA"
            && self.alg.as_deref().is_none_or(|alg| alg == "RS256")
            && self.key_use.as_deref().is_none_or(|u| u == "sig")
    }
}

/// Keys currently trusted. `stale_at` is `None` until the first fetch.
#[derive(Default)]
struct KeySet {
    keys: HashMap<String, DecodingKey>,
    stale_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct FetchState {
    failures: u32,
    /// No fetch before this instant after a failure
    retry_at: Option<Instant>,
    last_unknown_kid_fetch: Option<Instant>,
}

/// [`KeyProvider`] backed by a remote JWKS document.
///
/// Keys are kept for the `max-age` the endpoint advertises in
/// `Cache-Control`, or for the configured refresh interval when it sends
/// none. An unknown `kid` triggers an immediate fetch, at most once per
/// cooldown. Failed fetches back off exponentially.
#[must_use]
pub struct JwksKeyProvider {
    jwks_uri: String,
    http: reqwest::Client,
    current: ArcSwap<KeySet>,
    fetch: Mutex<FetchState>,
    fallback_ttl: Duration,
    max_backoff: Duration,
    unknown_kid_cooldown: Duration,
}

impl JwksKeyProvider {
    /// Provider with a 10 second HTTP timeout.
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails (e.g., TLS setup)
    pub fn new(jwks_uri: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_http_timeout(jwks_uri, Duration::from_secs(10))
    }

    /// # Errors
    /// Returns error if HTTP client initialization fails (e.g., TLS setup)
    pub fn with_http_timeout(
        jwks_uri: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            jwks_uri: jwks_uri.into(),
            http: reqwest::Client::builder().timeout(timeout).build()?,
            current: ArcSwap::from_pointee(KeySet::default()),
            fetch: Mutex::new(FetchState::default()),
            fallback_ttl: Duration::from_secs(300),
            max_backoff: Duration::from_secs(3600),
            unknown_kid_cooldown: Duration::from_secs(60),
        })
    }

    /// Key lifetime when the endpoint sends no `max-age`
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.fallback_ttl = interval;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn with_unknown_kid_cooldown(mut self, cooldown: Duration) -> Self {
        self.unknown_kid_cooldown = cooldown;
        self
    }

    fn lookup(&self, kid: &str) -> Option<DecodingKey> {
        self.current.load().keys.get(kid).cloned()
    }

    fn is_stale(&self, now: Instant) -> bool {
        self.current.load().stale_at.is_none_or(|at| now >= at)
    }

    fn backoff(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(10);
        RETRY_BASE
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_backoff)
    }

    async fn fetch_key_set(
        &self,
    ) -> Result<(HashMap<String, DecodingKey>, Option<Duration>), ClaimsError> {
        let resp = self
            .http
            .get(&self.jwks_uri)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| map_http_error(&e))?;

        let ttl = max_age(resp.headers());
        let set: JwkSet = resp.json().await.map_err(|e| map_http_error(&e))?;
        Ok((decoding_keys(set)?, ttl))
    }

    /// Fetch and swap in a new key set. Caller holds the fetch lock.
    async fn refresh_locked(&self, state: &mut FetchState) -> Result<(), ClaimsError> {
        match self.fetch_key_set().await {
            Ok((keys, max_age)) => {
                let ttl = max_age
                    .unwrap_or(self.fallback_ttl)
                    .clamp(MIN_KEY_TTL, MAX_KEY_TTL);
                tracing::debug!(count = keys.len(), ttl_secs = ttl.as_secs(), "JWKS refreshed");
                self.current.store(Arc::new(KeySet {
                    keys,
                    stale_at: Some(Instant::now() + ttl),
                }));
                state.failures = 0;
                state.retry_at = None;
                Ok(())
            }
            Err(e) => {
                state.failures = state.failures.saturating_add(1);
                let wait = self.backoff(state.failures);
                state.retry_at = Some(Instant::now() + wait);
                tracing::warn!(
                    failures = state.failures,
                    retry_in_secs = wait.as_secs(),
                    error = %e,
                    "JWKS refresh failed"
                );
                Err(e)
            }
        }
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, ClaimsError> {
        if let Some(key) = self.lookup(kid) {
            return Ok(key);
        }

        let mut state = self.fetch.lock().await;
        // Another task may have fetched while this one waited for the lock.
        if let Some(key) = self.lookup(kid) {
            return Ok(key);
        }

        let now = Instant::now();
        let never_loaded = self.current.load().stale_at.is_none();
        let backing_off = state.retry_at.is_some_and(|at| now < at);
        let cooling_down = state
            .last_unknown_kid_fetch
            .is_some_and(|at| now.duration_since(at) < self.unknown_kid_cooldown);

        if never_loaded && backing_off {
            return Err(ClaimsError::JwksFetchFailed(format!(
                "no signing keys loaded after {} failed fetches",
                state.failures
            )));
        }
        if !never_loaded && (backing_off || cooling_down) {
            tracing::debug!(kid, "unknown kid, JWKS refetch suppressed");
            return Err(ClaimsError::UnknownKeyId(kid.to_owned()));
        }

        tracing::info!(kid, "unknown kid, fetching JWKS");
        state.last_unknown_kid_fetch = Some(now);
        self.refresh_locked(&mut state).await?;

        self.lookup(kid).ok_or_else(|| {
            tracing::warn!(kid, "kid absent from freshly fetched JWKS");
            ClaimsError::UnknownKeyId(kid.to_owned())
        })
    }
}

fn decoding_keys(set: JwkSet) -> Result<HashMap<String, DecodingKey>, ClaimsError> {
    let mut keys = HashMap::new();
    for jwk in set.keys.into_iter().filter(Jwk::is_rs256_signing_key) {
        let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
            tracing::debug!(kid = %jwk.kid, "RSA key without modulus or exponent skipped");
            continue;
        };
        let key = DecodingKey::from_rsa_components(n, e).map_err(|err| {
            ClaimsError::JwksFetchFailed(format!("invalid RSA key {}: {err}", jwk.kid))
        })?;
        keys.insert(jwk.kid, key);
    }

    if keys.is_empty() {
        return Err(ClaimsError::JwksFetchFailed(
            "JWKS contains no RS256 signing keys".into(),
        ));
    }
    Ok(keys)
}

/// `max-age` from a `Cache-Control` header, if any.
fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Verify the RS256 signature and decode raw claims.
///
/// Only the signature is checked here; `exp`, `aud` and `iss` are checked by
/// the caller so that error reporting stays uniform across key providers.
pub(crate) fn verify_signature(token: &str, key: &DecodingKey) -> Result<Value, ClaimsError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    let no_required: &[&str] = &[];
    validation.set_required_spec_claims(no_required);

    decode::<Value>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| ClaimsError::DecodeFailed(format!("signature check failed: {e}")))
}

/// Decode the header, reject anything but RS256 and return the `kid`.
pub(crate) fn rs256_header(token: &str) -> Result<(Header, String), ClaimsError> {
    let header = decode_header(token)
        .map_err(|e| ClaimsError::DecodeFailed(format!("Invalid JWT header: {e}")))?;

    if header.alg != Algorithm::RS256 {
        return Err(ClaimsError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
    }

    let kid = header
        .kid
        .clone()
        .ok_or_else(|| ClaimsError::DecodeFailed("Missing kid in JWT header".into()))?;

    Ok((header, kid))
}

#[async_trait]
impl KeyProvider for JwksKeyProvider {
    fn name(&self) -> &'static str {
        "jwks"
    }

    async fn validate_and_decode(&self, token: &str) -> Result<(Header, Value), ClaimsError> {
        let (header, kid) = rs256_header(token)?;
        let key = self.key_for(&kid).await?;
        let claims = verify_signature(token, &key)?;
        Ok((header, claims))
    }

    /// Fetch only when the key set is stale and no backoff is pending.
    async fn refresh_keys(&self) -> Result<(), ClaimsError> {
        let mut state = self.fetch.lock().await;
        let now = Instant::now();
        if !self.is_stale(now) || state.retry_at.is_some_and(|at| now < at) {
            return Ok(());
        }
        self.refresh_locked(&mut state).await
    }
}

/// Keep `provider`'s keys fresh until `cancellation_token` is cancelled.
///
/// The first tick fires immediately, so keys are loaded at startup.
pub async fn run_jwks_refresh_task(
    provider: Arc<dyn KeyProvider>,
    cancellation_token: CancellationToken,
) {
    let mut ticks = tokio::time::interval(Duration::from_secs(30));
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancellation_token.cancelled() => {
                tracing::info!(provider = provider.name(), "JWKS refresh task stopped");
                break;
            }
            _ = ticks.tick() => {
                // Failures are logged by the provider and retried on a later tick.
                if let Err(e) = provider.refresh_keys().await {
                    tracing::debug!(provider = provider.name(), error = %e, "JWKS refresh deferred");
                }
            }
        }
    }
}

fn map_http_error(e: &reqwest::Error) -> ClaimsError {
    match e.status() {
        Some(status) => ClaimsError::JwksFetchFailed(format!("JWKS HTTP {status}")),
        None if e.is_timeout() => ClaimsError::JwksFetchFailed("JWKS request timed out".into()),
        None if e.is_decode() => ClaimsError::JwksFetchFailed(format!("JWKS parse error: {e}")),
        None => ClaimsError::JwksFetchFailed(format!("JWKS transport error: {e}")),
    }
}
