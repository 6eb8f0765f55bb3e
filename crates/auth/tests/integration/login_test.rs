use super::common::TestContext;
use sentry_auth::LoginRequest;
use sentry_core::Role;
use std::collections::HashSet;

async fn register_user(ctx: &TestContext, email: &str, password: &str, role: Role) {
    let hash = ctx
        .password_hasher
        .hash_password(password)
        .expect("hash should succeed");

    let user = sentry_auth::User {
        id: sentry_core::UserId::new(),
        tenant_id: Some(sentry_core::TenantId::new()),
        email: email.to_string(),
        password_hash: hash,
        role,
        permissions: HashSet::new(),
        is_active: true,
        created_at: 0,
        updated_at: 0,
        last_login_at: None,
        expertise: std::collections::HashSet::new(),
        on_shift: false,
        avg_resolution_min: None,
        version: 0,
    };
    ctx.repository
        .insert_user(&user)
        .await
        .expect("insert should succeed");
}

#[tokio::test]
async fn test_successful_login() {
    let ctx = TestContext::new();
    register_user(&ctx, "logintest@example.com", "LoginPassword123!", Role::Technician).await;

    let result = ctx
        .auth_service
        .login(LoginRequest {
            email: "logintest@example.com".to_string(),
            password: "LoginPassword123!".to_string(),
        })
        .await;

    let response = result.expect("login should succeed");
    assert!(!response.access_token.is_empty());
    assert!(!response.refresh_token.is_empty());
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let ctx = TestContext::new();
    register_user(&ctx, "invalidlogin@example.com", "CorrectPassword123!", Role::Technician).await;

    let result = ctx
        .auth_service
        .login(LoginRequest {
            email: "invalidlogin@example.com".to_string(),
            password: "WrongPassword!".to_string(),
        })
        .await;

    assert!(result.is_err(), "login with wrong password should fail");
}

#[tokio::test]
async fn test_login_unknown_user() {
    let ctx = TestContext::new();

    let result = ctx
        .auth_service
        .login(LoginRequest {
            email: "ghost@example.com".to_string(),
            password: "whatever".to_string(),
        })
        .await;

    assert!(result.is_err(), "login for unregistered email should fail");
}

#[tokio::test]
async fn test_refresh_rotates_and_invalidates_old_token() {
    let ctx = TestContext::new();
    register_user(&ctx, "rotate@example.com", "RotatePassword123!", Role::TenantAdmin).await;

    let login = ctx
        .auth_service
        .login(LoginRequest {
            email: "rotate@example.com".to_string(),
            password: "RotatePassword123!".to_string(),
        })
        .await
        .expect("login should succeed");

    let refreshed = ctx
        .auth_service
        .refresh(&login.refresh_token)
        .await
        .expect("refresh should succeed");
    assert_ne!(login.access_token, refreshed.access_token);

    let replay = ctx.auth_service.refresh(&login.refresh_token).await;
    assert!(replay.is_err(), "a rotated-out refresh token must not be reusable");
}

#[tokio::test]
async fn test_logout_all_revokes_outstanding_tokens() {
    let ctx = TestContext::new();
    register_user(&ctx, "logoutall@example.com", "LogoutAllPassword123!", Role::MspAdmin).await;

    let login = ctx
        .auth_service
        .login(LoginRequest {
            email: "logoutall@example.com".to_string(),
            password: "LogoutAllPassword123!".to_string(),
        })
        .await
        .expect("login should succeed");

    let user = ctx
        .repository
        .get_user_by_email("logoutall@example.com")
        .await
        .expect("lookup should succeed")
        .expect("user should exist");

    ctx.auth_service
        .logout_all(user.id)
        .await
        .expect("logout-all should succeed");

    let result = ctx.auth_service.refresh(&login.refresh_token).await;
    assert!(result.is_err(), "refresh token must be revoked after logout-all");
}
