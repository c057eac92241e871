//! HTTP-level integration tests for login, refresh rotation, logout and RBAC.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{
    body_json, build_test_app, get, get_auth, post_auth, post_json, post_json_auth,
    seed_regular_user, seed_user,
};
use obmin_core::roles::ROLE_ADMIN;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Log in via the API and return the JSON response.
async fn login_user(app: Router, username: &str, password: &str) -> serde_json::Value {
    let body = json!({ "username": username, "password": password });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn tokens(json: &serde_json::Value) -> (String, String) {
    (
        json["access_token"].as_str().unwrap().to_string(),
        json["refresh_token"].as_str().unwrap().to_string(),
    )
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_login_success() {
    let app = build_test_app();
    let user = seed_regular_user(&app.store, "alice", "correct-pw").await;

    let json = login_user(app.router, "alice", "correct-pw").await;

    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["expires_in"], 15 * 60);
    assert_eq!(json["refresh_expires_in"], 7 * 24 * 3600);
    assert_eq!(json["user"]["id"], user.id);
    assert_eq!(json["user"]["username"], "alice");
    assert_eq!(json["user"]["role"], "ROLE_USER");
}

#[tokio::test]
async fn test_login_with_email() {
    let app = build_test_app();
    seed_regular_user(&app.store, "alice", "correct-pw").await;

    let json = login_user(app.router, "alice@test.com", "correct-pw").await;
    assert_eq!(json["user"]["username"], "alice");
}

/// Wrong password and unknown user are indistinguishable to the caller.
#[tokio::test]
async fn test_login_failures_are_uniform() {
    let app = build_test_app();
    seed_regular_user(&app.store, "alice", "correct-pw").await;

    let wrong = post_json(
        app.router.clone(),
        "/api/v1/auth/login",
        json!({ "username": "alice", "password": "nope" }),
    )
    .await;
    let unknown = post_json(
        app.router,
        "/api/v1/auth/login",
        json!({ "username": "nobody", "password": "nope" }),
    )
    .await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let wrong = body_json(wrong).await;
    let unknown = body_json(unknown).await;
    assert_eq!(wrong, unknown);
    assert_eq!(wrong["code"], "UNAUTHORIZED");
    assert_eq!(wrong["error"], "Authentication required");
}

#[tokio::test]
async fn test_username_cannot_take_over_email_login() {
    let app = build_test_app();
    let victim = seed_regular_user(&app.store, "victim", "victim-pw-1").await;

    let squat = post_json(
        app.router.clone(),
        "/api/v1/auth/register",
        json!({
            "username": "victim@test.com",
            "email": "mallory@test.com",
            "password": "mallory-pw-1",
            "confirm_password": "mallory-pw-1",
        }),
    )
    .await;
    assert_eq!(squat.status(), StatusCode::BAD_REQUEST);

    let json = login_user(app.router, "victim@test.com", "victim-pw-1").await;
    assert_eq!(json["user"]["id"], victim.id);
}

#[tokio::test]
async fn test_login_disabled_account_is_forbidden() {
    let app = build_test_app();
    let user = seed_regular_user(&app.store, "alice", "correct-pw").await;
    app.store.set_active(user.id, false).await;

    let response = post_json(
        app.router,
        "/api/v1/auth/login",
        json!({ "username": "alice", "password": "correct-pw" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_empty_password_is_bad_request() {
    let app = build_test_app();
    let response = post_json(
        app.router,
        "/api/v1/auth/login",
        json!({ "username": "alice", "password": "" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Refresh rotation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_refresh_rotates_and_old_token_is_rejected() {
    let app = build_test_app();
    seed_regular_user(&app.store, "alice", "correct-pw").await;
    let (_, old_refresh) = tokens(&login_user(app.router.clone(), "alice", "correct-pw").await);

    let response = post_json(
        app.router.clone(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": old_refresh }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_eq!(rotated["user"]["username"], "alice");
    let (new_access, new_refresh) = tokens(&rotated);
    assert_ne!(new_refresh, old_refresh);

    let replay = post_json(
        app.router.clone(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": old_refresh }),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

    let me = get_auth(app.router, "/api/v1/user/my-info", &new_access).await;
    assert_eq!(me.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_has_one_winner() {
    let app = build_test_app();
    seed_regular_user(&app.store, "alice", "correct-pw").await;
    let (_, refresh) = tokens(&login_user(app.router.clone(), "alice", "correct-pw").await);

    let attempts = (0..6).map(|_| {
        let router = app.router.clone();
        let refresh = refresh.clone();
        tokio::spawn(async move {
            post_json(
                router,
                "/api/v1/auth/refresh",
                json!({ "refresh_token": refresh }),
            )
            .await
            .status()
        })
    });
    let statuses: Vec<StatusCode> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert!(statuses
        .iter()
        .all(|s| *s == StatusCode::OK || *s == StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn test_access_token_cannot_be_used_to_refresh() {
    let app = build_test_app();
    seed_regular_user(&app.store, "alice", "correct-pw").await;
    let (access, _) = tokens(&login_user(app.router.clone(), "alice", "correct-pw").await);

    let response = post_json(
        app.router,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": access }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Logout and protected routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_my_info_requires_valid_access_token() {
    let app = build_test_app();
    seed_regular_user(&app.store, "alice", "correct-pw").await;
    let (access, refresh) = tokens(&login_user(app.router.clone(), "alice", "correct-pw").await);

    let anonymous = get(app.router.clone(), "/api/v1/user/my-info").await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let with_refresh = get_auth(app.router.clone(), "/api/v1/user/my-info", &refresh).await;
    assert_eq!(with_refresh.status(), StatusCode::UNAUTHORIZED);

    let garbage = get_auth(app.router.clone(), "/api/v1/user/my-info", "not-a-token").await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(app.router, "/api/v1/user/my-info", &access).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["username"], "alice");
    assert_eq!(json["roles"], json!(["ROLE_USER"]));
}

#[tokio::test]
async fn test_logout_revokes_access_and_refresh_tokens() {
    let app = build_test_app();
    seed_regular_user(&app.store, "alice", "correct-pw").await;
    let (access, refresh) = tokens(&login_user(app.router.clone(), "alice", "correct-pw").await);

    let response = post_json_auth(
        app.router.clone(),
        "/api/v1/auth/logout",
        json!({ "refresh_token": refresh }),
        &access,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.store.revoked_count().await, 2);

    // Signature and expiry are still fine, but the jti is revoked.
    let me = get_auth(app.router.clone(), "/api/v1/user/my-info", &access).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

    let refreshed = post_json(
        app.router,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh }),
    )
    .await;
    assert_eq!(refreshed.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_body_revokes_access_token() {
    let app = build_test_app();
    seed_regular_user(&app.store, "alice", "correct-pw").await;
    let (access, refresh) = tokens(&login_user(app.router.clone(), "alice", "correct-pw").await);

    let response = post_auth(app.router.clone(), "/api/v1/auth/logout", &access).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.store.revoked_count().await, 1);

    let me = get_auth(app.router.clone(), "/api/v1/user/my-info", &access).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

    // The refresh token was not presented, so it still rotates.
    let refreshed = post_json(
        app.router,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh }),
    )
    .await;
    assert_eq!(refreshed.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_requires_authentication() {
    let app = build_test_app();
    let response = post_json(app.router, "/api/v1/auth/logout", json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Store outages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_store_outage_is_service_unavailable() {
    let app = build_test_app();
    seed_regular_user(&app.store, "alice", "correct-pw").await;
    let (access, _) = tokens(&login_user(app.router.clone(), "alice", "correct-pw").await);

    app.store.set_available(false);

    let login = post_json(
        app.router.clone(),
        "/api/v1/auth/login",
        json!({ "username": "alice", "password": "correct-pw" }),
    )
    .await;
    assert_eq!(login.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(login).await["code"], "SERVICE_UNAVAILABLE");

    // The revocation lookup fails, which must not read as "unauthenticated".
    let me = get_auth(app.router, "/api/v1/user/my-info", &access).await;
    assert_eq!(me.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ---------------------------------------------------------------------------
// OAuth2 bridge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_oauth2_login_creates_validated_user() {
    let app = build_test_app();

    let body = json!({ "email": "olga@provider.test", "name": "olga" });
    let first = post_json(app.router.clone(), "/api/v1/auth/oauth2/login", body.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    assert_eq!(first["user"]["email"], "olga@provider.test");
    assert_eq!(first["user"]["email_validated"], true);

    let second = post_json(app.router, "/api/v1/auth/oauth2/login", body).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await["user"]["id"], first["user"]["id"]);
}

#[tokio::test]
async fn test_oauth2_name_matching_local_username_still_logs_in() {
    let app = build_test_app();
    let local = seed_regular_user(&app.store, "olga", "olga-pw-1").await;

    let response = post_json(
        app.router.clone(),
        "/api/v1/auth/oauth2/login",
        json!({ "email": "olga.other@provider.test", "name": "olga" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["user"]["email"], "olga.other@provider.test");
    assert_ne!(json["user"]["id"], local.id);
    let username = json["user"]["username"].as_str().unwrap();
    assert!(username.starts_with("olga-"), "got {username}");

    let local_login = login_user(app.router, "olga", "olga-pw-1").await;
    assert_eq!(local_login["user"]["id"], local.id);
}

#[tokio::test]
async fn test_oauth2_login_rejects_invalid_email() {
    let app = build_test_app();
    let response = post_json(
        app.router,
        "/api/v1/auth/oauth2/login",
        json!({ "email": "not-an-email" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// RBAC
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_admin_purge_requires_admin_role() {
    let app = build_test_app();
    seed_regular_user(&app.store, "alice", "correct-pw").await;
    seed_user(&app.store, "root", "root-pw-123", ROLE_ADMIN).await;

    let anonymous = post_json(
        app.router.clone(),
        "/api/v1/admin/confirmation-codes/purge",
        json!({}),
    )
    .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let (user_access, _) = tokens(&login_user(app.router.clone(), "alice", "correct-pw").await);
    let forbidden = post_json_auth(
        app.router.clone(),
        "/api/v1/admin/confirmation-codes/purge",
        json!({}),
        &user_access,
    )
    .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let (admin_access, _) = tokens(&login_user(app.router.clone(), "root", "root-pw-123").await);
    let response = post_json_auth(
        app.router,
        "/api/v1/admin/confirmation-codes/purge",
        json!({}),
        &admin_access,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["deleted"], 0);
}
