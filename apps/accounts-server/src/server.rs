use std::sync::Arc;
use std::time::Duration;

use accounts::AccountsModule;
use accounts::domain::ports::{IdentityProvider, RoleStore};
use accounts::infra::{IdentityToolkitClient, RealtimeDatabaseClient};
use anyhow::{Context, Result};
use axum::Router;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use callable_auth::axum_ext::REQUEST_ID_HEADER;
use callable_auth::service_account::{ServiceAccountCredentials, ServiceAccountToken, TokenConfig};
use callable_auth::{AccessTokenProvider, CallerState, run_jwks_refresh_task};
use http::{HeaderName, Request, Response, StatusCode};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use crate::config::{AppConfig, ServerConfig};
use crate::signals;

/// Initialize every client once, then serve until a shutdown signal.
///
/// # Errors
/// Returns an error if configuration is invalid, credentials or the initial
/// access token cannot be obtained, a client cannot be built, or the
/// listener cannot bind.
pub async fn run_server(config: AppConfig) -> Result<()> {
    config.validate()?;
    let addr = config.bind_addr()?;

    let credentials_path = config.credentials_path()?;
    let credentials = ServiceAccountCredentials::from_file(credentials_path).with_context(|| {
        format!(
            "failed to load service account credentials from {}",
            credentials_path.display()
        )
    })?;
    let project_id = credentials.project_id().to_owned();
    tracing::info!(
        project_id = %project_id,
        client_email = credentials.client_email(),
        "service account loaded"
    );

    let tokens: Arc<dyn AccessTokenProvider> = Arc::new(
        ServiceAccountToken::new(credentials, TokenConfig::default())
            .await
            .context("failed to obtain a service account access token")?,
    );

    let identity: Arc<dyn IdentityProvider> = Arc::new(IdentityToolkitClient::new(
        &config.identity,
        &project_id,
        Arc::clone(&tokens),
    )?);

    let role_store = match &config.accounts.role_store {
        Some(store) => {
            let client = RealtimeDatabaseClient::new(
                &store.database_url,
                config.identity.timeout,
                Arc::clone(&tokens),
            )?;
            Some(Arc::new(client) as Arc<dyn RoleStore>)
        }
        None => None,
    };

    let verifier = config
        .auth
        .build_verifier(&project_id)
        .context("failed to build the ID token verifier")?;
    let module = AccountsModule::new(&config.accounts, identity, role_store)?;

    let cancel = CancellationToken::new();
    signals::cancel_on_signal(cancel.clone());
    tokio::spawn(run_jwks_refresh_task(
        verifier.key_provider(),
        cancel.child_token(),
    ));

    let router = build_router(&module, CallerState::new(Arc::new(verifier)), &config.server);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    serve(listener, router, cancel).await
}

/// Callable routes plus `/healthz`, wrapped in the HTTP middleware stack.
pub fn build_router(module: &AccountsModule, caller: CallerState, config: &ServerConfig) -> Router {
    let router = module
        .router(caller)
        .route("/healthz", get(|| async { "ok" }));
    apply_middleware_stack(router, config)
}

/// Apply the HTTP middleware layers.
///
/// Registered innermost first; requests flow
/// `SetRequestId` → `PropagateRequestId` → Trace → Timeout → `BodyLimit` → Router.
pub fn apply_middleware_stack(mut router: Router, config: &ServerConfig) -> Router {
    // 4) Body limit
    router = router.layer(RequestBodyLimitLayer::new(config.body_limit_bytes));
    router = router.layer(DefaultBodyLimit::max(config.body_limit_bytes));

    // 3) Timeout
    router = router.layer(TimeoutLayer::with_status_code(
        StatusCode::GATEWAY_TIMEOUT,
        config.request_timeout,
    ));

    // 2) Trace
    router = apply_trace_layer(router);

    // 1) Request id, set if absent and echoed on the response
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    router = router.layer(PropagateRequestIdLayer::new(x_request_id.clone()));
    router.layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
}

fn apply_trace_layer(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<Body>| {
                let rid = req
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("n/a");

                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    version = ?req.version(),
                    request_id = %rid,
                    status = Empty,
                    latency_ms = Empty,
                )
            })
            .on_response(
                |res: &Response<Body>, latency: Duration, span: &tracing::Span| {
                    span.record("status", res.status().as_u16());
                    span.record("latency_ms", latency.as_millis());
                },
            ),
    )
}

/// Serve `router` on `listener` until `cancel` fires, then drain.
///
/// # Errors
/// Returns an error if the server fails while accepting connections.
pub async fn serve(listener: TcpListener, router: Router, cancel: CancellationToken) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "HTTP server bound");
    }

    let shutdown = async move {
        cancel.cancelled().await;
        tracing::info!("HTTP server shutting down gracefully");
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
