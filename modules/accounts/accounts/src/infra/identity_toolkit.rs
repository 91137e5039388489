use std::sync::Arc;

use accounts_sdk::{AccountId, NewAccount};
use async_trait::async_trait;
use callable_auth::AccessTokenProvider;
use callable_errors::ErrorCode;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use super::{ClientBuildError, access_token, service_url, transport_error};
use crate::config::IdentityConfig;
use crate::domain::ports::{IDENTITY_SERVICE, IdentityError, IdentityProvider, UpstreamError};

const PASSWORD_PROVIDER: &str = "password";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountRequest<'a> {
    email: &'a str,
    password: &'a str,
    link_provider_user_info: LinkedProvider<'a>,
}

/// Password credential linked under the account email
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkedProvider<'a> {
    provider_id: &'static str,
    raw_id: &'a str,
    email: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountResponse {
    #[serde(default)]
    local_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteAccountRequest<'a> {
    local_id: &'a str,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// [`IdentityProvider`] over the Identity Toolkit admin REST API
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    create_url: Url,
    delete_url: Url,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl IdentityToolkitClient {
    /// # Errors
    /// Returns [`ClientBuildError`] if `config.base_url` is not a usable base
    /// URL or the HTTP client cannot be built.
    pub fn new(
        config: &IdentityConfig,
        project_id: &str,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, ClientBuildError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let create_url = service_url(&config.base_url, ["v1", "projects", project_id, "accounts"])?;
        let delete_url =
            service_url(&config.base_url, ["v1", "projects", project_id, "accounts:delete"])?;

        Ok(Self {
            http,
            create_url,
            delete_url,
            tokens,
        })
    }

    async fn post<B: Serialize + Sync>(
        &self,
        url: &Url,
        body: &B,
    ) -> Result<reqwest::Response, IdentityError> {
        let token = access_token(self.tokens.as_ref(), IDENTITY_SERVICE)?;
        let resp = self
            .http
            .post(url.clone())
            .bearer_auth(token.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(IDENTITY_SERVICE, &e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("identity service rejected the access token, invalidating it");
            self.tokens.invalidate().await;
        }

        let body = resp.text().await.unwrap_or_default();
        let err = classify_error(status, &body);
        tracing::debug!(status = status.as_u16(), reason = %err.reason, "identity service call failed");
        Err(err)
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    #[instrument(name = "identity.create_account", skip_all)]
    async fn create_account(&self, account: &NewAccount) -> Result<AccountId, IdentityError> {
        let request = CreateAccountRequest {
            email: &account.email,
            password: account.password.expose(),
            link_provider_user_info: LinkedProvider {
                provider_id: PASSWORD_PROVIDER,
                raw_id: &account.email,
                email: &account.email,
            },
        };

        let body: CreateAccountResponse = self
            .post(&self.create_url, &request)
            .await?
            .json()
            .await
            .map_err(|e| {
                UpstreamError::new(
                    ErrorCode::Internal,
                    IDENTITY_SERVICE,
                    "MALFORMED_RESPONSE",
                    format!("unreadable response: {e}"),
                )
            })?;

        body.local_id
            .filter(|id| !id.is_empty())
            .map(AccountId::new)
            .ok_or_else(|| {
                UpstreamError::new(
                    ErrorCode::Internal,
                    IDENTITY_SERVICE,
                    "MISSING_LOCAL_ID",
                    "response carried no account id",
                )
            })
    }

    #[instrument(name = "identity.delete_account", skip_all, fields(uid = %id))]
    async fn delete_account(&self, id: &AccountId) -> Result<(), IdentityError> {
        let request = DeleteAccountRequest {
            local_id: id.as_str(),
        };
        self.post(&self.delete_url, &request).await?;
        Ok(())
    }
}

/// Classify an error response.
///
/// The service reports `{"error": {"message": "REASON : detail"}}`; known
/// reasons decide the code, anything else falls back to the HTTP status.
pub(crate) fn classify_error(status: StatusCode, body: &str) -> IdentityError {
    let raw = serde_json::from_str::<ErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_default();
    let (reason, detail) = match raw.split_once(" : ") {
        Some((reason, detail)) => (reason.trim(), detail.trim()),
        None => (raw.trim(), ""),
    };

    // Free-text messages (no reason code) keep the text as the message.
    let (reason, detail) = if is_reason_code(reason) {
        (reason.to_owned(), detail)
    } else {
        (format!("HTTP_{}", status.as_u16()), raw.trim())
    };

    let code = match reason.as_str() {
        "EMAIL_EXISTS" | "DUPLICATE_LOCAL_ID" => ErrorCode::AlreadyExists,
        "USER_NOT_FOUND" => ErrorCode::NotFound,
        "WEAK_PASSWORD" | "INVALID_EMAIL" | "INVALID_PASSWORD" | "MISSING_PASSWORD" => {
            ErrorCode::InvalidArgument
        }
        "PERMISSION_DENIED" | "INSUFFICIENT_PERMISSION" => ErrorCode::PermissionDenied,
        "QUOTA_EXCEEDED" => ErrorCode::ResourceExhausted,
        _ => code_for_status(status),
    };

    let message = if detail.is_empty() {
        reason.clone()
    } else {
        detail.to_owned()
    };

    UpstreamError::new(code, IDENTITY_SERVICE, reason, message)
}

fn is_reason_code(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn code_for_status(status: StatusCode) -> ErrorCode {
    match status {
        StatusCode::FORBIDDEN => ErrorCode::PermissionDenied,
        StatusCode::NOT_FOUND => ErrorCode::NotFound,
        StatusCode::TOO_MANY_REQUESTS => ErrorCode::ResourceExhausted,
        s if s.is_client_error() => ErrorCode::FailedPrecondition,
        _ => ErrorCode::Unavailable,
    }
}
