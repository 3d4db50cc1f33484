//! Comment API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{TestApp, TestUser};

async fn comment(app: &TestApp, user: &TestUser, post_id: &str, body: Value) -> axum_test::TestResponse {
    app.server
        .post(&format!("/api/v1/posts/{post_id}/comments"))
        .authorization_bearer(&user.access_token)
        .json(&body)
        .await
}

async fn comments_count(app: &TestApp, post_id: &str) -> i64 {
    app.server
        .get(&format!("/api/v1/posts/{post_id}"))
        .await
        .json::<Value>()["data"]["commentsCount"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn test_comment_and_reply() {
    let app = TestApp::new();
    let author = app.signup().await;
    let commenter = app.signup().await;
    let post = app.create_post(&author, "discuss").await;
    let post_id = post["id"].as_str().unwrap();

    let response = comment(&app, &commenter, post_id, json!({ "content": "<b>Nice</b> shot" })).await;
    response.assert_status(StatusCode::CREATED);
    let top = response.json::<Value>()["data"].clone();
    assert_eq!(top["content"], "Nice shot");
    assert_eq!(top["parentId"], Value::Null);
    assert_eq!(top["user"]["id"], commenter.id.to_string());

    let top_id = top["id"].as_str().unwrap();
    let response = comment(&app, &author, post_id, json!({ "content": "Thanks", "parentId": top_id })).await;
    response.assert_status(StatusCode::CREATED);
    let reply = response.json::<Value>()["data"].clone();
    assert_eq!(reply["parentId"], top_id);

    // Replies cannot be nested
    let response = comment(
        &app,
        &commenter,
        post_id,
        json!({ "content": "deeper", "parentId": reply["id"] }),
    )
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "NESTED_REPLY");

    let listed = app
        .server
        .get(&format!("/api/v1/posts/{post_id}/comments"))
        .await
        .json::<Value>();
    assert_eq!(listed["data"]["pagination"]["total"], 1);
    assert_eq!(listed["data"]["items"][0]["repliesCount"], 1);

    let replies = app
        .server
        .get(&format!("/api/v1/comments/{top_id}/replies"))
        .await
        .json::<Value>();
    assert_eq!(replies["data"]["items"][0]["content"], "Thanks");

    assert_eq!(comments_count(&app, post_id).await, 2);
}

#[tokio::test]
async fn test_comment_validation_and_disabled_comments() {
    let app = TestApp::new();
    let author = app.signup().await;
    let post = app.create_post(&author, "quiet").await;
    let post_id = post["id"].as_str().unwrap();

    let response = comment(&app, &author, post_id, json!({ "content": "" })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "VALIDATION_ERROR");

    let response = comment(&app, &author, post_id, json!({ "content": "hi", "parentId": "424242" })).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "PARENT_COMMENT_NOT_FOUND");

    app.server
        .put(&format!("/api/v1/posts/{post_id}"))
        .authorization_bearer(&author.access_token)
        .json(&json!({ "commentsEnabled": false }))
        .await
        .assert_status_ok();

    let response = comment(&app, &author, post_id, json!({ "content": "hello" })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "COMMENTS_DISABLED");
}

#[tokio::test]
async fn test_delete_comment_removes_replies_from_count() {
    let app = TestApp::new();
    let author = app.signup().await;
    let commenter = app.signup().await;
    let stranger = app.signup().await;
    let post = app.create_post(&author, "thread").await;
    let post_id = post["id"].as_str().unwrap();

    let top = comment(&app, &commenter, post_id, json!({ "content": "first" }))
        .await
        .json::<Value>()["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    for text in ["a", "b"] {
        comment(&app, &author, post_id, json!({ "content": text, "parentId": top }))
            .await
            .assert_status(StatusCode::CREATED);
    }
    comment(&app, &stranger, post_id, json!({ "content": "second" }))
        .await
        .assert_status(StatusCode::CREATED);
    assert_eq!(comments_count(&app, post_id).await, 4);

    let response = app
        .server
        .delete(&format!("/api/v1/comments/{top}"))
        .authorization_bearer(&stranger.access_token)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    // The post owner may remove any comment on their post
    app.server
        .delete(&format!("/api/v1/comments/{top}"))
        .authorization_bearer(&author.access_token)
        .await
        .assert_status_ok();

    assert_eq!(comments_count(&app, post_id).await, 1);
    let response = app.server.get(&format!("/api/v1/comments/{top}/replies")).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "COMMENT_NOT_FOUND");
}

#[tokio::test]
async fn test_edit_and_like_comment() {
    let app = TestApp::new();
    let author = app.signup().await;
    let commenter = app.signup().await;
    let post = app.create_post(&author, "likes").await;
    let post_id = post["id"].as_str().unwrap();
    let id = comment(&app, &commenter, post_id, json!({ "content": "typo" }))
        .await
        .json::<Value>()["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    app.server
        .put(&format!("/api/v1/comments/{id}"))
        .authorization_bearer(&author.access_token)
        .json(&json!({ "content": "not yours" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = app
        .server
        .put(&format!("/api/v1/comments/{id}"))
        .authorization_bearer(&commenter.access_token)
        .json(&json!({ "content": "fixed" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["content"], "fixed");

    let like_url = format!("/api/v1/comments/{id}/like");
    let response = app.server.post(&like_url).authorization_bearer(&author.access_token).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["likesCount"], 1);

    let response = app.server.post(&like_url).authorization_bearer(&author.access_token).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "ALREADY_LIKED");

    app.server
        .delete(&like_url)
        .authorization_bearer(&author.access_token)
        .await
        .assert_status_ok();
    let response = app.server.delete(&like_url).authorization_bearer(&author.access_token).await;
    assert_eq!(response.json::<Value>()["error"], "NOT_LIKED");
}

#[tokio::test]
async fn test_comment_reduced_to_nothing_by_sanitising_is_rejected() {
    let app = TestApp::new();
    let author = app.signup().await;
    let post = app.create_post(&author, "markup").await;
    let post_id = post["id"].as_str().unwrap();

    let response = comment(&app, &author, post_id, json!({ "content": "<i></i>" })).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["details"][0]["field"], "content");
    assert_eq!(comments_count(&app, post_id).await, 0);
}
