use std::sync::Arc;

use accounts_sdk::AccountId;
use axum::{Extension, Json};
use callable_auth::Caller;
use callable_errors::CallableError;

use super::dto::{CallBody, CallResponse, RegisterUserData, UnregisterUserData};
use crate::domain::service::AccountsService;

pub async fn register_user(
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<AccountsService>>,
    CallBody(data): CallBody<RegisterUserData>,
) -> Result<Json<CallResponse<AccountId>>, CallableError> {
    let id = svc.register_user(&ctx, data.into_new_account()).await?;
    Ok(Json(CallResponse::new(id)))
}

pub async fn unregister_user(
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<AccountsService>>,
    CallBody(data): CallBody<UnregisterUserData>,
) -> Result<Json<CallResponse<()>>, CallableError> {
    let id = AccountId::new(data.uid.unwrap_or_default());
    svc.unregister_user(&ctx, id).await?;
    Ok(Json(CallResponse::new(())))
}
