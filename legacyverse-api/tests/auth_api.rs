//! HTTP tests for the authentication endpoints

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{str_field, TestContext, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();

    let response = ctx.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["store"], "connected");
}

#[tokio::test]
async fn test_register_returns_user_and_tokens() {
    let ctx = TestContext::new();

    let body = ctx.register("John Doe", "John@Example.com").await;

    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["user"]["email"], "john@example.com");
    assert_eq!(body["user"]["username"], "johndoe");
    assert!(body["user"].get("password_hash").is_none());
    assert!(!str_field(&body, "access").is_empty());
    assert!(!str_field(&body, "refresh").is_empty());

    let second = ctx.register("John Doe", "john.doe@example.com").await;
    assert_eq!(second["user"]["username"], "johndoe1");
}

#[tokio::test]
async fn test_register_validation_errors() {
    let ctx = TestContext::new();

    let response = ctx
        .post(
            "/v1/auth/register",
            None,
            json!({
                "fullname": "Jane Doe",
                "email": "not-an-email",
                "password": "12345678",
                "confirm_password": "87654321",
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "validation_error");
    let fields: Vec<&str> = response.body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"confirm_password"));
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let ctx = TestContext::new();
    ctx.register("Jane Doe", "jane@example.com").await;

    let response = ctx
        .post(
            "/v1/auth/register",
            None,
            json!({
                "fullname": "Jane Again",
                "email": "JANE@example.com",
                "password": PASSWORD,
                "confirm_password": PASSWORD,
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["details"][0]["field"], "email");
    assert_eq!(ctx.store.user_count().await, 1);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let ctx = TestContext::new();
    ctx.register("Jane Doe", "jane@example.com").await;

    let wrong_password = ctx
        .post(
            "/v1/auth/login",
            None,
            json!({ "email": "jane@example.com", "password": "wrong-password" }),
        )
        .await;
    let unknown_email = ctx
        .post(
            "/v1/auth/login",
            None,
            json!({ "email": "ghost@example.com", "password": "wrong-password" }),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.status, unknown_email.status);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(wrong_password.body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_login_and_me() {
    let ctx = TestContext::new();
    ctx.register("Jane Doe", "jane@example.com").await;

    let login = ctx
        .post(
            "/v1/auth/login",
            None,
            json!({ "email": "jane@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);

    let me = ctx.get("/v1/auth/me", Some(str_field(&login.body, "access"))).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "janedoe");
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let ctx = TestContext::new();

    let missing = ctx.get("/v1/auth/me", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let garbage = ctx.get("/v1/auth/me", Some("not-a-jwt")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let body = ctx.register("Jane Doe", "jane@example.com").await;
    let with_refresh = ctx.get("/v1/auth/me", Some(str_field(&body, "refresh"))).await;
    assert_eq!(with_refresh.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_and_logout() {
    let ctx = TestContext::new();
    let body = ctx.register("Jane Doe", "jane@example.com").await;
    let access = str_field(&body, "access");
    let refresh = str_field(&body, "refresh");

    let refreshed = ctx.post("/v1/auth/refresh", None, json!({ "refresh": refresh })).await;
    assert_eq!(refreshed.status, StatusCode::OK);
    assert!(!str_field(&refreshed.body, "access").is_empty());

    let logout = ctx
        .post("/v1/auth/logout", Some(access), json!({ "refresh": refresh }))
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["message"], "Logout successful");

    let after = ctx.post("/v1/auth/refresh", None, json!({ "refresh": refresh })).await;
    assert_eq!(after.status, StatusCode::BAD_REQUEST);
    assert_eq!(after.body["error"], "invalid_token");
}

#[tokio::test]
async fn test_logout_all_ends_every_session() {
    let ctx = TestContext::new();
    let registered = ctx.register("Jane Doe", "jane@example.com").await;
    let login = ctx
        .post(
            "/v1/auth/login",
            None,
            json!({ "email": "jane@example.com", "password": PASSWORD }),
        )
        .await;

    let response = ctx
        .post("/v1/auth/logout-all", Some(str_field(&login.body, "access")), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["revoked"], 2);

    for refresh in [str_field(&registered, "refresh"), str_field(&login.body, "refresh")] {
        let after = ctx.post("/v1/auth/refresh", None, json!({ "refresh": refresh })).await;
        assert_eq!(after.status, StatusCode::BAD_REQUEST);
    }

    let anonymous = ctx.post("/v1/auth/logout-all", None, json!({})).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_requires_refresh_token() {
    let ctx = TestContext::new();
    let body = ctx.register("Jane Doe", "jane@example.com").await;

    let response = ctx
        .post("/v1/auth/logout", Some(str_field(&body, "access")), json!({}))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["details"][0]["field"], "refresh");
}

#[tokio::test]
async fn test_forgot_password_same_response_for_unknown_email() {
    let ctx = TestContext::new();
    ctx.register("Jane Doe", "jane@example.com").await;

    let known = ctx
        .post("/v1/auth/forgot-password", None, json!({ "email": "jane@example.com" }))
        .await;
    let unknown = ctx
        .post("/v1/auth/forgot-password", None, json!({ "email": "ghost@example.com" }))
        .await;

    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(known.body, unknown.body);
    assert!(known.body.get("token").is_none());
}

#[tokio::test]
async fn test_forgot_password_exposes_token_in_development() {
    let ctx = TestContext::with_env(&[("AUTH_EXPOSE_RESET_TOKEN", "true")]);
    ctx.register("Jane Doe", "jane@example.com").await;

    let known = ctx
        .post("/v1/auth/forgot-password", None, json!({ "email": "jane@example.com" }))
        .await;
    let unknown = ctx
        .post("/v1/auth/forgot-password", None, json!({ "email": "ghost@example.com" }))
        .await;

    assert_eq!(str_field(&known.body, "token").len(), 32);
    assert!(unknown.body.get("token").is_none());
}

#[tokio::test]
async fn test_reset_password_flow() {
    let ctx = TestContext::new();
    let body = ctx.register("Jane Doe", "jane@example.com").await;
    let old_refresh = str_field(&body, "refresh").to_string();
    let token = ctx.request_reset_token("jane@example.com").await;

    let reset = ctx
        .post(
            "/v1/auth/reset-password",
            None,
            json!({
                "token": token,
                "new_password": "new-river-stone-7",
                "confirm_password": "new-river-stone-7",
            }),
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK);
    assert_eq!(reset.body["message"], "Password reset successful");

    let reused = ctx
        .post(
            "/v1/auth/reset-password",
            None,
            json!({
                "token": token,
                "new_password": "another-river-9",
                "confirm_password": "another-river-9",
            }),
        )
        .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);
    assert_eq!(reused.body["error"], "token_used");

    let refresh = ctx
        .post("/v1/auth/refresh", None, json!({ "refresh": old_refresh }))
        .await;
    assert_eq!(refresh.status, StatusCode::BAD_REQUEST);

    let login = ctx
        .post(
            "/v1/auth/login",
            None,
            json!({ "email": "jane@example.com", "password": "new-river-stone-7" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_reset_token_expired() {
    let ctx = TestContext::new();
    ctx.register("Jane Doe", "jane@example.com").await;
    let token = ctx.request_reset_token("jane@example.com").await;

    ctx.clock.advance(Duration::minutes(61));

    let response = ctx
        .post(
            "/v1/auth/reset-password",
            None,
            json!({
                "token": token,
                "new_password": "new-river-stone-7",
                "confirm_password": "new-river-stone-7",
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "token_expired");
}

#[tokio::test]
async fn test_reset_link_uses_frontend_url() {
    let ctx = TestContext::new();
    ctx.register("Jane Doe", "jane@example.com").await;
    ctx.request_reset_token("jane@example.com").await;

    match ctx.notifier.last_for("jane@example.com").await {
        Some(legacyverse_shared::notify::Notification::PasswordReset { reset_url, .. }) => {
            assert!(reset_url.starts_with("https://app.legacyverse.test/reset-password?token="));
        }
        other => panic!("unexpected notification: {:?}", other),
    }
}

#[tokio::test]
async fn test_change_password() {
    let ctx = TestContext::new();
    let body = ctx.register("Jane Doe", "jane@example.com").await;
    let access = str_field(&body, "access");

    let wrong = ctx
        .post(
            "/v1/auth/change-password",
            Some(access),
            json!({
                "old_password": "not-my-password",
                "new_password": "new-river-stone-7",
                "confirm_password": "new-river-stone-7",
            }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let weak = ctx
        .post(
            "/v1/auth/change-password",
            Some(access),
            json!({
                "old_password": PASSWORD,
                "new_password": "password",
                "confirm_password": "password",
            }),
        )
        .await;
    assert_eq!(weak.status, StatusCode::UNPROCESSABLE_ENTITY);

    let changed = ctx
        .post(
            "/v1/auth/change-password",
            Some(access),
            json!({
                "old_password": PASSWORD,
                "new_password": "new-river-stone-7",
                "confirm_password": "new-river-stone-7",
            }),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);
    assert_eq!(changed.body["message"], "Password changed successfully");

    let refresh = ctx
        .post("/v1/auth/refresh", None, json!({ "refresh": str_field(&body, "refresh") }))
        .await;
    assert_eq!(refresh.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let ctx = TestContext::new();

    let response = ctx.get("/health", None).await;

    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "DENY");
    assert_eq!(response.headers["cache-control"], "no-store");
    assert!(response.headers.get("strict-transport-security").is_none());

    let production = TestContext::with_env(&[("API_PRODUCTION", "true")]);
    let response = production.get("/health", None).await;
    assert!(response.headers.get("strict-transport-security").is_some());
}
