#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Role guard behavior against the in-memory role store.

use std::sync::Arc;

use accounts::domain::guard::{GuardError, RoleGuard, RolePolicy};
use accounts::test_support::InMemoryRoleStore;
use callable_security::CallContext;

const TABLE: &str = "roles";
const COLUMN: &str = "role";

async fn guard_with_roles(roles: &[(&str, &str)]) -> (RoleGuard, Arc<InMemoryRoleStore>) {
    let store = Arc::new(InMemoryRoleStore::new());
    for (uid, role) in roles {
        store.set_role(TABLE, uid, COLUMN, *role).await;
    }
    (RoleGuard::new(store.clone(), TABLE, COLUMN), store)
}

#[tokio::test]
async fn anonymous_callers_pass_only_public() {
    let (guard, store) = guard_with_roles(&[]).await;
    let anon = CallContext::anonymous();

    assert!(guard.authorize(&anon, &RolePolicy::Public).await.is_ok());
    assert_eq!(
        guard.authorize(&anon, &RolePolicy::AnyAuthenticated).await,
        Err(GuardError::Unauthenticated)
    );
    for role in ["admin", "editor", ""] {
        assert_eq!(
            guard
                .authorize(&anon, &RolePolicy::SpecificRole(role.to_owned()))
                .await,
            Err(GuardError::Unauthenticated)
        );
    }
    assert_eq!(store.reads(), 0);
}

#[tokio::test]
async fn specific_role_passes_iff_roles_are_equal() {
    let roles = ["admin", "editor", "viewer", "Admin"];
    let assignments: Vec<(String, &str)> = roles.iter().map(|r| (format!("uid-{r}"), *r)).collect();
    let borrowed: Vec<(&str, &str)> = assignments.iter().map(|(u, r)| (u.as_str(), *r)).collect();
    let (guard, _) = guard_with_roles(&borrowed).await;

    for (uid, stored) in &borrowed {
        let ctx = CallContext::for_uid(*uid);
        for expected in roles {
            let result = guard
                .authorize(&ctx, &RolePolicy::SpecificRole(expected.to_owned()))
                .await;
            if *stored == expected {
                assert!(result.is_ok(), "{stored} vs {expected}");
            } else {
                let message = result.unwrap_err().to_string();
                assert!(message.contains(stored), "{message}");
                assert!(message.contains(expected), "{message}");
            }
        }
    }
}

#[tokio::test]
async fn editor_is_refused_admin() {
    let (guard, store) = guard_with_roles(&[("u-7", "editor")]).await;

    let err = guard
        .authorize(
            &CallContext::for_uid("u-7"),
            &RolePolicy::SpecificRole("admin".to_owned()),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GuardError::WrongRole {
            expected: "admin".to_owned(),
            actual: Some("editor".to_owned()),
        }
    );
    assert_eq!(err.to_string(), "Wrong role, expected admin, got editor");
    assert_eq!(store.reads(), 1);
}

#[tokio::test]
async fn any_authenticated_does_not_read_roles() {
    let (guard, store) = guard_with_roles(&[]).await;
    assert!(
        guard
            .authorize(&CallContext::for_uid("u-1"), &RolePolicy::AnyAuthenticated)
            .await
            .is_ok()
    );
    assert_eq!(store.reads(), 0);
}

#[tokio::test]
async fn non_string_role_never_matches() {
    let store = Arc::new(InMemoryRoleStore::new());
    store.set_role(TABLE, "u-1", COLUMN, serde_json::json!({"name": "admin"})).await;
    store.set_role(TABLE, "u-2", COLUMN, 7).await;
    let guard = RoleGuard::new(store.clone(), TABLE, COLUMN);

    let err = guard
        .authorize(
            &CallContext::for_uid("u-1"),
            &RolePolicy::SpecificRole("admin".to_owned()),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GuardError::WrongRole {
            expected: "admin".to_owned(),
            actual: Some(r#"{"name":"admin"}"#.to_owned()),
        }
    );

    // A number is not equal to its decimal string.
    let err = guard
        .authorize(
            &CallContext::for_uid("u-2"),
            &RolePolicy::SpecificRole("7".to_owned()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Wrong role, expected 7, got 7");
    assert_eq!(store.reads(), 2);
}
