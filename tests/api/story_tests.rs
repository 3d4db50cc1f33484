//! Story API Tests

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::multipart::MultipartForm;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::{png_part, TestApp, TestUser};
use social_api::application::services::StoryService;
use social_api::infrastructure::media::InMemoryMediaStore;

async fn post_story(app: &TestApp, author: &TestUser, caption: &str) -> Value {
    let form = MultipartForm::new()
        .add_text("caption", caption.to_string())
        .add_part("media", png_part("story.png"));
    let response = app
        .server
        .post("/api/v1/stories")
        .authorization_bearer(&author.access_token)
        .multipart(form)
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["data"].clone()
}

#[tokio::test]
async fn test_create_story_and_feed() {
    let app = TestApp::new();
    let author = app.signup().await;
    let follower = app.signup().await;
    let stranger = app.signup().await;
    app.follow(&follower, &author).await;

    let story = post_story(&app, &author, "morning").await;
    assert_eq!(story["caption"], "morning");
    assert_eq!(story["viewsCount"], 0);
    assert_eq!(story["mediaKind"], "image");

    let feed = app
        .server
        .get("/api/v1/stories/feed")
        .authorization_bearer(&follower.access_token)
        .await
        .json::<Value>();
    assert_eq!(feed["data"][0]["user"]["id"], author.id.to_string());
    assert_eq!(feed["data"][0]["hasUnviewed"], true);

    let feed = app
        .server
        .get("/api/v1/stories/feed")
        .authorization_bearer(&stranger.access_token)
        .await
        .json::<Value>();
    assert_eq!(feed["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_story_requires_media() {
    let app = TestApp::new();
    let author = app.signup().await;

    let response = app
        .server
        .post("/api/v1/stories")
        .authorization_bearer(&author.access_token)
        .multipart(MultipartForm::new().add_text("caption", "nothing"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_views_are_counted_once_and_listed_for_owner() {
    let app = TestApp::new();
    let author = app.signup().await;
    let viewer = app.signup().await;
    let story = post_story(&app, &author, "look").await;
    let id = story["id"].as_str().unwrap();

    for _ in 0..2 {
        let response = app
            .server
            .post(&format!("/api/v1/stories/{id}/view"))
            .authorization_bearer(&viewer.access_token)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["data"]["viewsCount"], 1);
    }

    // Owner views are not recorded
    let response = app
        .server
        .post(&format!("/api/v1/stories/{id}/view"))
        .authorization_bearer(&author.access_token)
        .await;
    assert_eq!(response.json::<Value>()["data"]["viewsCount"], 1);

    let viewers = app
        .server
        .get(&format!("/api/v1/stories/{id}/viewers"))
        .authorization_bearer(&author.access_token)
        .await
        .json::<Value>();
    assert_eq!(viewers["data"]["pagination"]["total"], 1);
    assert_eq!(viewers["data"]["items"][0]["user"]["id"], viewer.id.to_string());

    app.server
        .get(&format!("/api/v1/stories/{id}/viewers"))
        .authorization_bearer(&viewer.access_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let stories = app
        .server
        .get(&format!("/api/v1/stories/user/{}", author.id))
        .authorization_bearer(&viewer.access_token)
        .await
        .json::<Value>();
    assert_eq!(stories["data"][0]["viewed"], true);
}

#[tokio::test]
async fn test_private_author_stories_hidden() {
    let app = TestApp::new();
    let author = app.signup_private().await;
    let stranger = app.signup().await;
    let story = post_story(&app, &author, "friends only").await;

    app.server
        .get(&format!("/api/v1/stories/user/{}", author.id))
        .authorization_bearer(&stranger.access_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .post(&format!("/api/v1/stories/{}/view", story["id"].as_str().unwrap()))
        .authorization_bearer(&stranger.access_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_story_removes_media() {
    let media = Arc::new(InMemoryMediaStore::new());
    let app = TestApp::with_media(media.clone());
    let author = app.signup().await;
    let other = app.signup().await;
    let story = post_story(&app, &author, "short lived").await;
    let id = story["id"].as_str().unwrap();
    let url = story["mediaUrl"].as_str().unwrap().to_string();
    assert!(media.contains(&url));

    app.server
        .delete(&format!("/api/v1/stories/{id}"))
        .authorization_bearer(&other.access_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .delete(&format!("/api/v1/stories/{id}"))
        .authorization_bearer(&author.access_token)
        .await
        .assert_status_ok();

    assert!(!media.contains(&url));
    let response = app
        .server
        .post(&format!("/api/v1/stories/{id}/view"))
        .authorization_bearer(&other.access_token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "STORY_NOT_FOUND");
}

#[tokio::test]
async fn test_expired_stories_rejected_and_cleaned_up() {
    let app = TestApp::with_settings(|settings| settings.stories.lifetime_hours = 0);
    let author = app.signup().await;
    let viewer = app.signup().await;
    let story = post_story(&app, &author, "already gone").await;

    let response = app
        .server
        .post(&format!("/api/v1/stories/{}/view", story["id"].as_str().unwrap()))
        .authorization_bearer(&viewer.access_token)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "STORY_EXPIRED");

    let stories = app
        .server
        .get(&format!("/api/v1/stories/user/{}", author.id))
        .await
        .json::<Value>();
    assert_eq!(stories["data"].as_array().map(Vec::len), Some(0));

    let removed = app.state.services.stories.cleanup_expired().await.unwrap();
    assert_eq!(removed, 1);
}
