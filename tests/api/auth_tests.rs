//! Authentication API Tests

use axum::http::StatusCode;
use axum_extra::extract::cookie::Cookie;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

use crate::common::{unique_email, unique_username, TestApp, TEST_PASSWORD};

#[tokio::test]
async fn test_register_with_valid_data() {
    let app = TestApp::new();
    let username = unique_username();
    let email = unique_email();

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": username,
            "email": email,
            "password": "ValidPassword123!",
            "fullName": "Test User"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["username"], username.as_str());
    assert_eq!(body["data"]["user"]["email"], email.to_lowercase().as_str());
    assert_eq!(body["data"]["user"]["postsCount"], 0);
    assert_eq!(body["data"]["tokenType"], "Bearer");
    assert!(body["data"]["accessToken"].as_str().is_some());
    assert!(body["data"]["refreshToken"].as_str().is_some());
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let cookie = response.cookie("accessToken");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.value(), body["data"]["accessToken"].as_str().unwrap());
}

#[test_case(json!({"username": "ab", "email": "a@example.com", "password": "ValidPassword123!"}), "username" ; "short username")]
#[test_case(json!({"username": "bad name!", "email": "a@example.com", "password": "ValidPassword123!"}), "username" ; "username charset")]
#[test_case(json!({"username": "valid_name", "email": "not-an-email", "password": "ValidPassword123!"}), "email" ; "invalid email")]
#[test_case(json!({"username": "valid_name", "email": "a@example.com", "password": "short"}), "password" ; "short password")]
#[tokio::test]
async fn test_register_rejects_invalid_fields(body: Value, field: &str) {
    let app = TestApp::new();

    let response = app.server.post("/api/v1/auth/register").json(&body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["details"][0]["field"], field);
}

#[tokio::test]
async fn test_register_duplicate_email_and_username() {
    let app = TestApp::new();
    let existing = app.signup().await;

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": unique_username(),
            "email": existing.email,
            "password": TEST_PASSWORD
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "EMAIL_EXISTS");

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": existing.username,
            "email": unique_email(),
            "password": TEST_PASSWORD
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "USERNAME_EXISTS");
}

#[tokio::test]
async fn test_login_with_valid_and_invalid_credentials() {
    let app = TestApp::new();
    let user = app.signup().await;

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": user.email, "password": TEST_PASSWORD }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["user"]["id"], user.id.to_string());

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": user.email, "password": "WrongPassword123!" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "INVALID_CREDENTIALS");

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": unique_email(), "password": TEST_PASSWORD }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_me_requires_authentication() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/auth/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "NOT_AUTHENTICATED");

    let response = app
        .server
        .get("/api/v1/auth/me")
        .authorization_bearer("not-a-jwt")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_me_returns_own_profile_with_bearer_or_cookie() {
    let app = TestApp::new();
    let user = app.signup().await;

    let response = app
        .server
        .get("/api/v1/auth/me")
        .authorization_bearer(&user.access_token)
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["username"], user.username.as_str());
    assert_eq!(body["data"]["email"], user.email.to_lowercase().as_str());

    let response = app
        .server
        .get("/api/v1/auth/me")
        .add_cookie(Cookie::new("accessToken", user.access_token.clone()))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["id"], user.id.to_string());
}

#[tokio::test]
async fn test_refresh_rotates_refresh_token() {
    let app = TestApp::new();
    let user = app.signup().await;

    let response = app
        .server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refreshToken": user.refresh_token }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    let new_access = body["data"]["accessToken"].as_str().unwrap().to_string();
    assert_ne!(body["data"]["refreshToken"], user.refresh_token.as_str());

    app.server
        .get("/api/v1/auth/me")
        .authorization_bearer(&new_access)
        .await
        .assert_status_ok();

    // The presented refresh token cannot be used twice
    let response = app
        .server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refreshToken": user.refresh_token }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "REVOKED_TOKEN");
}

#[tokio::test]
async fn test_access_token_is_not_a_refresh_token() {
    let app = TestApp::new();
    let user = app.signup().await;

    let response = app
        .server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refreshToken": user.access_token }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_logout_revokes_both_tokens() {
    let app = TestApp::new();
    let user = app.signup().await;

    let response = app
        .server
        .post("/api/v1/auth/logout")
        .authorization_bearer(&user.access_token)
        .json(&json!({ "refreshToken": user.refresh_token }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.cookie("accessToken").value(), "");

    let response = app
        .server
        .get("/api/v1/auth/me")
        .authorization_bearer(&user.access_token)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "REVOKED_TOKEN");

    let response = app
        .server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refreshToken": user.refresh_token }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_body_keeps_refresh_token() {
    let app = TestApp::new();
    let user = app.signup().await;

    app.server
        .post("/api/v1/auth/logout")
        .authorization_bearer(&user.access_token)
        .await
        .assert_status_ok();

    app.server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refreshToken": user.refresh_token }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    let user = app.signup().await;

    let response = app
        .server
        .put("/api/v1/auth/password")
        .authorization_bearer(&user.access_token)
        .json(&json!({ "currentPassword": "WrongPassword123!", "newPassword": "AnotherPassword456!" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "INVALID_PASSWORD");

    app.server
        .put("/api/v1/auth/password")
        .authorization_bearer(&user.access_token)
        .json(&json!({ "currentPassword": TEST_PASSWORD, "newPassword": "AnotherPassword456!" }))
        .await
        .assert_status_ok();

    app.server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": user.email, "password": TEST_PASSWORD }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": user.email, "password": "AnotherPassword456!" }))
        .await
        .assert_status_ok();
}
