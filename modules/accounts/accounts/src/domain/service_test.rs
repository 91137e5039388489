#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use accounts_sdk::{AccountId, NewAccount};
use callable_errors::ErrorCode;
use callable_security::CallContext;

use super::error::DomainError;
use super::guard::{RoleGuard, RolePolicy};
use super::service::AccountsService;
use crate::config::EntryPolicies;
use crate::test_support::{InMemoryIdentityProvider, InMemoryRoleStore};

fn service_with(
    policies: EntryPolicies,
) -> (AccountsService, Arc<InMemoryIdentityProvider>, Arc<InMemoryRoleStore>) {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let roles = Arc::new(InMemoryRoleStore::new());
    let guard = RoleGuard::new(roles.clone(), "roles", "role");
    (
        AccountsService::new(identity.clone(), guard, policies),
        identity,
        roles,
    )
}

fn admin_only() -> EntryPolicies {
    EntryPolicies {
        register_user: RolePolicy::SpecificRole("admin".to_owned()),
        unregister_user: RolePolicy::SpecificRole("admin".to_owned()),
    }
}

#[tokio::test]
async fn public_register_succeeds_for_anyone() {
    let (svc, identity, roles) = service_with(EntryPolicies::default());

    for ctx in [CallContext::anonymous(), CallContext::for_uid("someone")] {
        let email = format!("{}@x.com", ctx.uid().unwrap_or("anon"));
        let id = svc
            .register_user(&ctx, NewAccount::new(email, "hunter2"))
            .await
            .unwrap();
        assert!(!id.as_str().is_empty());
    }
    assert_eq!(identity.len().await, 2);
    assert_eq!(roles.reads(), 0);
}

#[tokio::test]
async fn refused_caller_never_reaches_identity_service() {
    let (svc, identity, roles) = service_with(admin_only());
    roles.set_role("roles", "u-1", "role", "editor").await;

    let err = svc
        .register_user(&CallContext::for_uid("u-1"), NewAccount::new("a@x.com", "hunter2"))
        .await
        .unwrap_err();

    assert!(err.is_permission_denied());
    assert_eq!(err.to_string(), "Wrong role, expected admin, got editor");
    assert_eq!(identity.create_calls(), 0);
    assert_eq!(roles.reads(), 1);
}

#[tokio::test]
async fn admin_can_register_and_unregister() {
    let (svc, identity, roles) = service_with(admin_only());
    roles.set_role("roles", "root", "role", "admin").await;
    let ctx = CallContext::for_uid("root");

    let id = svc
        .register_user(&ctx, NewAccount::new("a@x.com", "hunter2"))
        .await
        .unwrap();
    assert_eq!(identity.email_of(&id).await.as_deref(), Some("a@x.com"));

    svc.unregister_user(&ctx, id).await.unwrap();
    assert!(identity.is_empty().await);
}

#[tokio::test]
async fn anonymous_caller_is_unauthenticated_under_any_authenticated() {
    let (svc, identity, _) = service_with(EntryPolicies {
        register_user: RolePolicy::AnyAuthenticated,
        unregister_user: RolePolicy::AnyAuthenticated,
    });

    let err = svc
        .unregister_user(&CallContext::anonymous(), AccountId::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::Unauthenticated);
    assert_eq!(identity.delete_calls(), 0);
}

#[tokio::test]
async fn empty_input_is_rejected_after_the_guard() {
    let (svc, identity, _) = service_with(EntryPolicies::default());
    let ctx = CallContext::anonymous();

    let err = svc
        .register_user(&ctx, NewAccount::new("  ", "hunter2"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { field: "email", .. }));

    let err = svc
        .register_user(&ctx, NewAccount::new("a@x.com", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { field: "password", .. }));

    let err = svc
        .unregister_user(&ctx, AccountId::new(""))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { field: "uid", .. }));

    assert_eq!(identity.create_calls() + identity.delete_calls(), 0);
}

#[tokio::test]
async fn unknown_uid_propagates_not_found() {
    let (svc, identity, _) = service_with(EntryPolicies::default());

    let err = svc
        .unregister_user(&CallContext::anonymous(), AccountId::new("nonexistent"))
        .await
        .unwrap_err();

    let DomainError::Upstream(upstream) = err else {
        panic!("expected upstream error, got {err:?}");
    };
    assert_eq!(upstream.code, ErrorCode::NotFound);
    assert_eq!(upstream.reason, "USER_NOT_FOUND");
    assert_eq!(identity.delete_calls(), 1);
    assert_eq!(identity.create_calls(), 0);
}

#[tokio::test]
async fn role_store_failure_is_upstream() {
    let (svc, _, roles) = service_with(admin_only());
    roles
        .fail_with(crate::domain::ports::UpstreamError::new(
            ErrorCode::PermissionDenied,
            crate::domain::ports::ROLE_STORE_SERVICE,
            "HTTP_401",
            "Permission denied",
        ))
        .await;

    let err = svc
        .register_user(&CallContext::for_uid("u-1"), NewAccount::new("a@x.com", "pw"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Upstream(ref u) if u.reason == "HTTP_401"));
}

#[tokio::test]
async fn email_is_forwarded_as_given() {
    let (svc, identity, _) = service_with(EntryPolicies::default());

    let id = svc
        .register_user(&CallContext::anonymous(), NewAccount::new(" a@x.com ", "hunter2"))
        .await
        .unwrap();
    assert_eq!(identity.email_of(&id).await.as_deref(), Some(" a@x.com "));

    let err = svc
        .register_user(&CallContext::anonymous(), NewAccount::new("   ", "hunter2"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
}
