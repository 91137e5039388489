use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use callable_auth::AccessTokenProvider;
use callable_errors::ErrorCode;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{ClientBuildError, access_token, service_url, transport_error};
use crate::domain::ports::{ROLE_STORE_SERVICE, RoleStore, RoleStoreError, UpstreamError};

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// [`RoleStore`] over the Realtime Database REST API.
///
/// Reads `GET {database_url}/{table}/{uid}/{column}.json`. `table` and
/// `column` may be nested paths (`org/roles`).
pub struct RealtimeDatabaseClient {
    http: reqwest::Client,
    base: Url,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl RealtimeDatabaseClient {
    /// # Errors
    /// Returns [`ClientBuildError`] if `database_url` is not a usable base
    /// URL or the HTTP client cannot be built.
    pub fn new(
        database_url: &str,
        timeout: Duration,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, ClientBuildError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base = service_url(database_url, std::iter::empty::<&str>())?;
        Ok(Self { http, base, tokens })
    }

    fn record_url(&self, table: &str, uid: &str, column: &str) -> Url {
        let mut segments: Vec<String> = split_path(table);
        segments.push(uid.to_owned());
        segments.extend(split_path(column));
        if let Some(last) = segments.last_mut() {
            last.push_str(".json");
        }

        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(&segments);
        }
        url
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[async_trait]
impl RoleStore for RealtimeDatabaseClient {
    #[instrument(name = "role_store.read_role", skip_all, fields(%table, %uid, %column))]
    async fn read_role(
        &self,
        table: &str,
        uid: &str,
        column: &str,
    ) -> Result<Option<Value>, RoleStoreError> {
        let token = access_token(self.tokens.as_ref(), ROLE_STORE_SERVICE)?;
        let resp = self
            .http
            .get(self.record_url(table, uid, column))
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| transport_error(ROLE_STORE_SERVICE, &e))?;

        let status = resp.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        let value: Value = resp.json().await.map_err(|e| {
            UpstreamError::new(
                ErrorCode::Unavailable,
                ROLE_STORE_SERVICE,
                "MALFORMED_RESPONSE",
                format!("unreadable response: {e}"),
            )
        })?;

        Ok(Some(value).filter(|v| !v.is_null()))
    }
}

pub(crate) fn classify_error(status: StatusCode, body: &str) -> RoleStoreError {
    let code = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorCode::PermissionDenied,
        StatusCode::NOT_FOUND => ErrorCode::NotFound,
        _ => ErrorCode::Unavailable,
    };
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|r| r.error)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_owned()
        });

    UpstreamError::new(
        code,
        ROLE_STORE_SERVICE,
        format!("HTTP_{}", status.as_u16()),
        message,
    )
}
