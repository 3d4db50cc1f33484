//! Hashtag API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::TestApp;

#[tokio::test]
async fn test_hashtags_follow_post_captions() {
    let app = TestApp::new();
    let author = app.signup().await;

    let first = app.create_post(&author, "Beach day #Travel #sun").await;
    app.create_post(&author, "Airport again #travel").await;

    let tag = app.server.get("/api/v1/hashtags/travel").await.json::<Value>();
    assert_eq!(tag["data"]["name"], "travel");
    assert_eq!(tag["data"]["postsCount"], 2);

    let trending = app.server.get("/api/v1/hashtags/trending").await.json::<Value>();
    assert_eq!(trending["data"][0]["name"], "travel");
    assert_eq!(trending["data"][1]["name"], "sun");

    let posts = app.server.get("/api/v1/hashtags/sun/posts").await.json::<Value>();
    assert_eq!(posts["data"]["pagination"]["total"], 1);
    assert_eq!(posts["data"]["items"][0]["id"], first["id"]);

    // Editing the caption relinks the post
    app.server
        .put(&format!("/api/v1/posts/{}", first["id"].as_str().unwrap()))
        .authorization_bearer(&author.access_token)
        .json(&json!({ "caption": "Beach day #beach" }))
        .await
        .assert_status_ok();

    let tag = app.server.get("/api/v1/hashtags/travel").await.json::<Value>();
    assert_eq!(tag["data"]["postsCount"], 1);
    let tag = app.server.get("/api/v1/hashtags/sun").await.json::<Value>();
    assert_eq!(tag["data"]["postsCount"], 0);
}

#[tokio::test]
async fn test_hashtag_search_is_prefix_based() {
    let app = TestApp::new();
    let author = app.signup().await;
    app.create_post(&author, "#travel #trail #food").await;

    let results = app.server.get("/api/v1/hashtags/search?q=%23TRA").await.json::<Value>();

    let names: Vec<&str> = results["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"travel"));
    assert!(names.contains(&"trail"));
}

#[tokio::test]
async fn test_unknown_hashtag() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/hashtags/nothing_here").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "HASHTAG_NOT_FOUND");

    app.server
        .get("/api/v1/hashtags/nothing_here/posts")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hashtag_posts_hide_private_authors() {
    let app = TestApp::new();
    let public = app.signup().await;
    let private = app.signup_private().await;
    app.create_post(&public, "#shared open").await;
    app.create_post(&private, "#shared closed").await;

    let posts = app.server.get("/api/v1/hashtags/shared/posts").await.json::<Value>();

    assert_eq!(posts["data"]["pagination"]["total"], 1);
    assert_eq!(posts["data"]["items"][0]["user"]["id"], public.id.to_string());
}
