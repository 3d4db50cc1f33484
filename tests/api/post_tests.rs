//! Post API Tests

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::multipart::MultipartForm;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{png_part, FailingDeleteMediaStore, TestApp};
use social_api::infrastructure::media::InMemoryMediaStore;

#[tokio::test]
async fn test_create_post_with_media() {
    let app = TestApp::new();
    let author = app.signup().await;

    let post = app.create_post(&author, "Sunset #travel #Food").await;

    assert_eq!(post["caption"], "Sunset #travel #Food");
    assert_eq!(post["user"]["id"], author.id.to_string());
    assert_eq!(post["media"].as_array().map(Vec::len), Some(1));
    assert_eq!(post["media"][0]["kind"], "image");
    assert_eq!(post["likesCount"], 0);
    assert_eq!(post["isLiked"], false);

    let profile = app.profile(&author, &author).await;
    assert_eq!(profile["postsCount"], 1);
    assert_eq!(profile["isOwnProfile"], true);
}

#[tokio::test]
async fn test_create_post_requires_media() {
    let app = TestApp::new();
    let author = app.signup().await;

    let response = app
        .server
        .post("/api/v1/posts")
        .authorization_bearer(&author.access_token)
        .multipart(MultipartForm::new().add_text("caption", "no picture"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["details"][0]["field"], "media");
}

#[tokio::test]
async fn test_create_post_rejects_unsupported_media() {
    let app = TestApp::new();
    let author = app.signup().await;

    let form = MultipartForm::new().add_part(
        "media",
        axum_test::multipart::Part::bytes(b"just text".to_vec())
            .file_name("notes.txt")
            .mime_type("text/plain"),
    );
    let response = app
        .server
        .post("/api/v1/posts")
        .authorization_bearer(&author.access_token)
        .multipart(form)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_create_post_requires_authentication() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/posts")
        .multipart(MultipartForm::new().add_part("media", png_part("a.png")))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_only_owner_can_update_or_delete() {
    let app = TestApp::new();
    let author = app.signup().await;
    let stranger = app.signup().await;
    let post = app.create_post(&author, "mine").await;
    let id = post["id"].as_str().unwrap();

    let response = app
        .server
        .put(&format!("/api/v1/posts/{id}"))
        .authorization_bearer(&stranger.access_token)
        .json(&json!({ "caption": "hijacked" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"], "ACCESS_DENIED");

    let response = app
        .server
        .delete(&format!("/api/v1/posts/{id}"))
        .authorization_bearer(&stranger.access_token)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = app
        .server
        .put(&format!("/api/v1/posts/{id}"))
        .authorization_bearer(&author.access_token)
        .json(&json!({ "caption": "edited", "commentsEnabled": false }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["caption"], "edited");
    assert_eq!(body["data"]["commentsEnabled"], false);
}

#[tokio::test]
async fn test_update_rejects_text_that_outgrows_its_limit_once_escaped() {
    let app = TestApp::new();
    let author = app.signup().await;
    let post = app.create_post(&author, "pinned").await;
    let url = format!("/api/v1/posts/{}", post["id"].as_str().unwrap());

    let response = app
        .server
        .put(&url)
        .authorization_bearer(&author.access_token)
        .json(&json!({ "location": "<".repeat(100) }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["details"][0]["field"], "location");

    let response = app
        .server
        .put(&url)
        .authorization_bearer(&author.access_token)
        .json(&json!({ "location": "<3 Lisbon" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["location"], "&lt;3 Lisbon");
}

#[tokio::test]
async fn test_get_unknown_post() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/posts/123456789").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "POST_NOT_FOUND");

    let response = app.server.get("/api/v1/posts/not-a-number").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_like_and_unlike() {
    let app = TestApp::new();
    let author = app.signup().await;
    let fan = app.signup().await;
    let post = app.create_post(&author, "like me").await;
    let like_url = format!("/api/v1/posts/{}/like", post["id"].as_str().unwrap());

    let response = app.server.post(&like_url).authorization_bearer(&fan.access_token).await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["liked"], true);
    assert_eq!(body["data"]["likesCount"], 1);

    let response = app.server.post(&like_url).authorization_bearer(&fan.access_token).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "ALREADY_LIKED");

    let likers = app
        .server
        .get(&format!("/api/v1/posts/{}/likes", post["id"].as_str().unwrap()))
        .await
        .json::<Value>();
    assert_eq!(likers["data"]["items"][0]["username"], fan.username.as_str());

    let response = app.server.delete(&like_url).authorization_bearer(&fan.access_token).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["likesCount"], 0);

    let response = app.server.delete(&like_url).authorization_bearer(&fan.access_token).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "NOT_LIKED");
}

#[tokio::test]
async fn test_like_rejected_when_likes_disabled() {
    let app = TestApp::new();
    let author = app.signup().await;
    let fan = app.signup().await;

    let form = MultipartForm::new()
        .add_text("likesEnabled", "false")
        .add_part("media", png_part("a.png"));
    let post = app
        .server
        .post("/api/v1/posts")
        .authorization_bearer(&author.access_token)
        .multipart(form)
        .await
        .json::<Value>();
    assert_eq!(post["data"]["likesEnabled"], false);

    let response = app
        .server
        .post(&format!("/api/v1/posts/{}/like", post["data"]["id"].as_str().unwrap()))
        .authorization_bearer(&fan.access_token)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "LIKES_DISABLED");
}

#[tokio::test]
async fn test_archive_lifecycle() {
    let app = TestApp::new();
    let author = app.signup().await;
    let viewer = app.signup().await;
    let post = app.create_post(&author, "soon hidden").await;
    let id = post["id"].as_str().unwrap();

    let response = app
        .server
        .post(&format!("/api/v1/posts/{id}/archive"))
        .authorization_bearer(&author.access_token)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["isArchived"], true);

    let response = app
        .server
        .post(&format!("/api/v1/posts/{id}/archive"))
        .authorization_bearer(&author.access_token)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "POST_ALREADY_ARCHIVED");

    // Archived posts disappear for everyone but the owner
    let response = app
        .server
        .get(&format!("/api/v1/posts/{id}"))
        .authorization_bearer(&viewer.access_token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    app.server
        .get(&format!("/api/v1/posts/{id}"))
        .authorization_bearer(&author.access_token)
        .await
        .assert_status_ok();

    let archived = app
        .server
        .get(&format!("/api/v1/posts/user/{}?archived=true", author.id))
        .authorization_bearer(&author.access_token)
        .await
        .json::<Value>();
    assert_eq!(archived["data"]["pagination"]["total"], 1);

    app.server
        .get(&format!("/api/v1/posts/user/{}?archived=true", author.id))
        .authorization_bearer(&viewer.access_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .post(&format!("/api/v1/posts/{id}/unarchive"))
        .authorization_bearer(&author.access_token)
        .await
        .assert_status_ok();

    let response = app
        .server
        .post(&format!("/api/v1/posts/{id}/unarchive"))
        .authorization_bearer(&author.access_token)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "POST_NOT_ARCHIVED");
}

#[tokio::test]
async fn test_private_account_posts_need_accepted_follow() {
    let app = TestApp::new();
    let owner = app.signup_private().await;
    let follower = app.signup().await;
    let post = app.create_post(&owner, "for friends").await;
    let url = format!("/api/v1/posts/{}", post["id"].as_str().unwrap());

    app.server.get(&url).await.assert_status(StatusCode::FORBIDDEN);
    app.server
        .get(&url)
        .authorization_bearer(&follower.access_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    assert_eq!(app.follow(&follower, &owner).await, "pending");
    app.server
        .get(&url)
        .authorization_bearer(&follower.access_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .post(&format!("/api/v1/users/me/follow-requests/{}/accept", follower.id))
        .authorization_bearer(&owner.access_token)
        .await
        .assert_status_ok();

    app.server
        .get(&url)
        .authorization_bearer(&follower.access_token)
        .await
        .assert_status_ok();

    let explore = app.server.get("/api/v1/posts/explore").await.json::<Value>();
    assert_eq!(explore["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_user_posts_pagination() {
    let app = TestApp::new();
    let author = app.signup().await;
    for i in 0..15 {
        app.create_post(&author, &format!("post {i}")).await;
    }

    let response = app
        .server
        .get(&format!("/api/v1/posts/user/{}?page=2&limit=10", author.id))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(5));
    assert_eq!(
        body["data"]["pagination"],
        json!({ "total": 15, "page": 2, "limit": 10, "pages": 2 })
    );
    // Newest first: page two holds the five oldest posts
    assert_eq!(body["data"]["items"][4]["caption"], "post 0");
}

#[tokio::test]
async fn test_feed_contains_own_and_followed_posts() {
    let app = TestApp::new();
    let reader = app.signup().await;
    let followed = app.signup().await;
    let other = app.signup().await;

    app.create_post(&reader, "mine").await;
    app.create_post(&followed, "followed").await;
    app.create_post(&other, "unrelated").await;
    assert_eq!(app.follow(&reader, &followed).await, "accepted");

    let feed = app
        .server
        .get("/api/v1/posts/feed")
        .authorization_bearer(&reader.access_token)
        .await
        .json::<Value>();

    let captions: Vec<&str> = feed["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["caption"].as_str())
        .collect();
    assert_eq!(captions.len(), 2);
    assert!(captions.contains(&"mine"));
    assert!(captions.contains(&"followed"));
}

#[tokio::test]
async fn test_delete_post_removes_media() {
    let media = Arc::new(InMemoryMediaStore::new());
    let app = TestApp::with_media(media.clone());
    let author = app.signup().await;
    let post = app.create_post(&author, "temporary").await;
    let url = post["media"][0]["url"].as_str().unwrap().to_string();
    assert!(media.contains(&url));

    app.server
        .delete(&format!("/api/v1/posts/{}", post["id"].as_str().unwrap()))
        .authorization_bearer(&author.access_token)
        .await
        .assert_status_ok();

    assert!(!media.contains(&url));
    assert_eq!(app.profile(&author, &author).await["postsCount"], 0);
}

#[tokio::test]
async fn test_delete_post_succeeds_when_media_delete_fails() {
    let media = Arc::new(FailingDeleteMediaStore::new());
    let app = TestApp::with_media(media.clone());
    let author = app.signup().await;
    let post = app.create_post(&author, "sticky media").await;
    let id = post["id"].as_str().unwrap();
    let url = post["media"][0]["url"].as_str().unwrap().to_string();

    app.server
        .delete(&format!("/api/v1/posts/{id}"))
        .authorization_bearer(&author.access_token)
        .await
        .assert_status_ok();

    assert!(media.contains(&url));
    assert_eq!(app.profile(&author, &author).await["postsCount"], 0);
    app.server
        .get(&format!("/api/v1/posts/{id}"))
        .authorization_bearer(&author.access_token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
