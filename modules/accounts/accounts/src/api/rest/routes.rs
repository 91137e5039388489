use std::sync::Arc;

use axum::routing::post;
use axum::{Extension, Router, middleware};
use callable_auth::{CallerState, resolve_caller};

use super::handlers;
use crate::domain::service::AccountsService;

pub const REGISTER_USER_PATH: &str = "/registerUser";
pub const UNREGISTER_USER_PATH: &str = "/unregisterUser";

/// Mount both callables on `router`.
///
/// Caller resolution runs only for these routes, so other routes on the
/// same router keep their own auth.
pub fn register_routes(router: Router, service: Arc<AccountsService>, caller: CallerState) -> Router {
    let callables = Router::new()
        .route(REGISTER_USER_PATH, post(handlers::register_user))
        .route(UNREGISTER_USER_PATH, post(handlers::unregister_user))
        .route_layer(middleware::from_fn_with_state(caller, resolve_caller))
        .layer(Extension(service));

    router.merge(callables)
}
