//! Axum extractor and middleware that resolve the caller of a callable

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use callable_errors::{CallableError, ErrorCode};
use callable_security::CallContext;

use crate::traits::TokenValidator;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Extractor for the [`CallContext`] inserted by [`resolve_caller`]
#[derive(Debug, Clone)]
pub struct Caller(pub CallContext);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = CallableError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallContext>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| {
                tracing::error!("CallContext not found - caller middleware not configured");
                CallableError::internal()
            })
    }
}

#[derive(Clone)]
pub struct CallerState {
    validator: Arc<dyn TokenValidator>,
}

impl CallerState {
    #[must_use]
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self { validator }
    }
}

/// Caller resolution middleware
///
/// - no `Authorization` header: anonymous `CallContext`
/// - valid bearer ID token: `CallContext` carrying the verified identity
/// - anything else: `unauthenticated` (401) and the handler never runs
///
/// The request id and user agent are recorded on the context either way.
pub async fn resolve_caller(
    State(CallerState { validator }): State<CallerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let mut builder = CallContext::builder();
    if let Some(id) = header_str(headers, REQUEST_ID_HEADER) {
        builder = builder.request_id(id);
    }
    if let Some(agent) = header_str(headers, header::USER_AGENT.as_str()) {
        builder = builder.add_environment_attribute("user_agent", agent);
    }

    if headers.contains_key(header::AUTHORIZATION) {
        let Some(token) = extract_bearer_token(headers) else {
            return CallableError::unauthenticated("Malformed Authorization header").into_response();
        };

        match validator.validate(token).await {
            Ok(auth) => {
                tracing::debug!(uid = auth.uid(), "caller authenticated");
                builder = builder.auth(auth);
            }
            Err(err) if err.is_provider_failure() => {
                tracing::warn!(error = %err, "unable to verify caller token");
                return CallableError::new(ErrorCode::Unavailable, "Unable to verify caller identity")
                    .into_response();
            }
            Err(err) => {
                tracing::debug!(error = %err, "caller token rejected");
                return CallableError::unauthenticated("Invalid ID token").into_response();
            }
        }
    }

    request.extensions_mut().insert(builder.build());
    next.run(request).await
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Extract Bearer token from Authorization header
#[must_use]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
