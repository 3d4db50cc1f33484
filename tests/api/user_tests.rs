//! User and Follow API Tests

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::multipart::MultipartForm;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{png_part, TestApp};
use social_api::infrastructure::media::InMemoryMediaStore;

#[tokio::test]
async fn test_profile_by_username() {
    let app = TestApp::new();
    let user = app.signup().await;
    let viewer = app.signup().await;

    let profile = app.profile(&user, &viewer).await;
    assert_eq!(profile["id"], user.id.to_string());
    assert_eq!(profile["isOwnProfile"], false);
    assert_eq!(profile["isFollowing"], false);
    assert_eq!(profile["followStatus"], Value::Null);
    // Email is only disclosed to its owner
    assert!(profile.get("email").is_none());

    let response = app.server.get("/api/v1/users/nobody_by_this_name").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_update_profile() {
    let app = TestApp::new();
    let user = app.signup().await;

    let response = app
        .server
        .put("/api/v1/users/me")
        .authorization_bearer(&user.access_token)
        .json(&json!({ "fullName": "  Ada Lovelace  ", "bio": "Analyst", "website": "https://example.com" }))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["fullName"], "Ada Lovelace");
    assert_eq!(body["data"]["bio"], "Analyst");
    assert_eq!(body["data"]["website"], "https://example.com");

    let response = app
        .server
        .put("/api/v1/users/me")
        .authorization_bearer(&user.access_token)
        .json(&json!({ "website": "not a url" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_search_users() {
    let app = TestApp::new();
    let needle = app.signup_as("zebra_finder").await;
    app.signup().await;

    let response = app.server.get("/api/v1/users/search?q=ZEBRA").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], needle.id.to_string());

    app.server
        .get("/api/v1/users/search?q=")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_follow_public_account() {
    let app = TestApp::new();
    let follower = app.signup().await;
    let target = app.signup().await;

    assert_eq!(app.follow(&follower, &target).await, "accepted");

    let profile = app.profile(&target, &follower).await;
    assert_eq!(profile["followersCount"], 1);
    assert_eq!(profile["isFollowing"], true);
    assert_eq!(profile["followStatus"], "accepted");
    assert_eq!(app.profile(&follower, &follower).await["followingCount"], 1);

    let followers = app
        .server
        .get(&format!("/api/v1/users/{}/followers", target.id))
        .await
        .json::<Value>();
    assert_eq!(followers["data"]["items"][0]["username"], follower.username.as_str());

    let following = app
        .server
        .get(&format!("/api/v1/users/{}/following", follower.id))
        .await
        .json::<Value>();
    assert_eq!(following["data"]["items"][0]["username"], target.username.as_str());

    let response = app
        .server
        .post(&format!("/api/v1/users/{}/follow", target.id))
        .authorization_bearer(&follower.access_token)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "ALREADY_FOLLOWING");

    app.server
        .delete(&format!("/api/v1/users/{}/follow", target.id))
        .authorization_bearer(&follower.access_token)
        .await
        .assert_status_ok();
    assert_eq!(app.profile(&target, &follower).await["followersCount"], 0);

    let response = app
        .server
        .delete(&format!("/api/v1/users/{}/follow", target.id))
        .authorization_bearer(&follower.access_token)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "NOT_FOLLOWING");
}

#[tokio::test]
async fn test_cannot_follow_self_or_unknown_user() {
    let app = TestApp::new();
    let user = app.signup().await;

    let response = app
        .server
        .post(&format!("/api/v1/users/{}/follow", user.id))
        .authorization_bearer(&user.access_token)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "CANNOT_FOLLOW_SELF");

    let response = app
        .server
        .post("/api/v1/users/999999999/follow")
        .authorization_bearer(&user.access_token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_private_account_follow_requests() {
    let app = TestApp::new();
    let owner = app.signup_private().await;
    let accepted = app.signup().await;
    let rejected = app.signup().await;

    assert_eq!(app.follow(&accepted, &owner).await, "pending");
    assert_eq!(app.follow(&rejected, &owner).await, "pending");

    // Pending requests do not count as followers
    let profile = app.profile(&owner, &accepted).await;
    assert_eq!(profile["followersCount"], 0);
    assert_eq!(profile["followStatus"], "pending");
    assert_eq!(profile["isFollowing"], false);

    let requests = app
        .server
        .get("/api/v1/users/me/follow-requests")
        .authorization_bearer(&owner.access_token)
        .await
        .json::<Value>();
    assert_eq!(requests["data"]["pagination"]["total"], 2);

    app.server
        .post(&format!("/api/v1/users/me/follow-requests/{}/accept", accepted.id))
        .authorization_bearer(&owner.access_token)
        .await
        .assert_status_ok();
    app.server
        .delete(&format!("/api/v1/users/me/follow-requests/{}", rejected.id))
        .authorization_bearer(&owner.access_token)
        .await
        .assert_status_ok();

    let response = app
        .server
        .post(&format!("/api/v1/users/me/follow-requests/{}/accept", rejected.id))
        .authorization_bearer(&owner.access_token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "FOLLOW_REQUEST_NOT_FOUND");

    let profile = app.profile(&owner, &accepted).await;
    assert_eq!(profile["followersCount"], 1);
    assert_eq!(profile["isFollowing"], true);

    // Followers of a private account are hidden from non-followers
    app.server
        .get(&format!("/api/v1/users/{}/followers", owner.id))
        .authorization_bearer(&rejected.access_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .get(&format!("/api/v1/users/{}/followers", owner.id))
        .authorization_bearer(&accepted.access_token)
        .await
        .assert_status_ok();
}

async fn upload_avatar(app: &TestApp, token: &str) -> String {
    let response = app
        .server
        .post("/api/v1/users/me/avatar")
        .authorization_bearer(token)
        .multipart(MultipartForm::new().add_part("avatar", png_part("me.png")))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["avatarUrl"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_avatar_upload_replace_and_remove() {
    let media = Arc::new(InMemoryMediaStore::new());
    let app = TestApp::with_media(media.clone());
    let user = app.signup().await;

    let first = upload_avatar(&app, &user.access_token).await;
    assert!(media.contains(&first));

    let second = upload_avatar(&app, &user.access_token).await;
    assert_ne!(first, second);
    assert!(media.contains(&second));
    assert!(!media.contains(&first));

    let response = app
        .server
        .delete("/api/v1/users/me/avatar")
        .authorization_bearer(&user.access_token)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["avatarUrl"], Value::Null);
    assert!(media.is_empty());
}

#[tokio::test]
async fn test_avatar_upload_requires_file() {
    let app = TestApp::new();
    let user = app.signup().await;

    let response = app
        .server
        .post("/api/v1/users/me/avatar")
        .authorization_bearer(&user.access_token)
        .multipart(MultipartForm::new().add_text("note", "no file"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "VALIDATION_ERROR");
}
