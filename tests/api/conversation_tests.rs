//! Conversation and Message API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{TestApp, TestUser};

async fn start_direct(app: &TestApp, from: &TestUser, to: &TestUser) -> axum_test::TestResponse {
    app.server
        .post("/api/v1/conversations")
        .authorization_bearer(&from.access_token)
        .json(&json!({ "participantIds": [to.id.to_string()] }))
        .await
}

async fn send(app: &TestApp, from: &TestUser, conversation_id: &str, content: &str) -> Value {
    let response = app
        .server
        .post(&format!("/api/v1/conversations/{conversation_id}/messages"))
        .authorization_bearer(&from.access_token)
        .json(&json!({ "content": content }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["data"].clone()
}

#[tokio::test]
async fn test_direct_conversation_is_reused() {
    let app = TestApp::new();
    let alice = app.signup().await;
    let bob = app.signup().await;

    let response = start_direct(&app, &alice, &bob).await;
    response.assert_status(StatusCode::CREATED);
    let created = response.json::<Value>()["data"].clone();
    assert_eq!(created["isGroup"], false);
    assert_eq!(created["members"].as_array().map(Vec::len), Some(2));

    let response = start_direct(&app, &bob, &alice).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["id"], created["id"]);
}

#[tokio::test]
async fn test_create_conversation_validation() {
    let app = TestApp::new();
    let alice = app.signup().await;
    let bob = app.signup().await;
    let carol = app.signup().await;

    let response = app
        .server
        .post("/api/v1/conversations")
        .authorization_bearer(&alice.access_token)
        .json(&json!({ "participantIds": [] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // A direct conversation has exactly one other participant
    let response = app
        .server
        .post("/api/v1/conversations")
        .authorization_bearer(&alice.access_token)
        .json(&json!({ "participantIds": [bob.id.to_string(), carol.id.to_string()] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/api/v1/conversations")
        .authorization_bearer(&alice.access_token)
        .json(&json!({ "participantIds": [bob.id.to_string()], "isGroup": true }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["details"][0]["field"], "name");

    let response = app
        .server
        .post("/api/v1/conversations")
        .authorization_bearer(&alice.access_token)
        .json(&json!({ "participantIds": ["987654321"] }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_messages_and_unread_count() {
    let app = TestApp::new();
    let alice = app.signup().await;
    let bob = app.signup().await;
    let outsider = app.signup().await;

    let conversation = start_direct(&app, &alice, &bob).await.json::<Value>()["data"].clone();
    let id = conversation["id"].as_str().unwrap();

    let first = send(&app, &bob, id, "hello").await;
    assert_eq!(first["sender"]["id"], bob.id.to_string());
    send(&app, &bob, id, "are you there?").await;

    let response = app
        .server
        .post(&format!("/api/v1/conversations/{id}/messages"))
        .authorization_bearer(&alice.access_token)
        .json(&json!({ "content": "yes", "replyToId": first["id"] }))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["data"]["replyToId"], first["id"]);

    let listed = app
        .server
        .get(&format!("/api/v1/conversations/{id}/messages"))
        .authorization_bearer(&alice.access_token)
        .await
        .json::<Value>();
    assert_eq!(listed["data"]["pagination"]["total"], 3);

    let conversations = app
        .server
        .get("/api/v1/conversations")
        .authorization_bearer(&alice.access_token)
        .await
        .json::<Value>();
    assert_eq!(conversations["data"]["items"][0]["id"], id);
    assert_eq!(conversations["data"]["items"][0]["lastMessage"]["content"], "yes");

    let view = app
        .server
        .get(&format!("/api/v1/conversations/{id}"))
        .authorization_bearer(&alice.access_token)
        .await
        .json::<Value>();
    assert_eq!(view["data"]["unreadCount"], 2);

    app.server
        .post(&format!("/api/v1/conversations/{id}/read"))
        .authorization_bearer(&alice.access_token)
        .await
        .assert_status_ok();
    let view = app
        .server
        .get(&format!("/api/v1/conversations/{id}"))
        .authorization_bearer(&alice.access_token)
        .await
        .json::<Value>();
    assert_eq!(view["data"]["unreadCount"], 0);

    // Non-members can neither read nor write
    app.server
        .get(&format!("/api/v1/conversations/{id}/messages"))
        .authorization_bearer(&outsider.access_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .post(&format!("/api/v1/conversations/{id}/messages"))
        .authorization_bearer(&outsider.access_token)
        .json(&json!({ "content": "let me in" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_edit_delete_and_react_to_message() {
    let app = TestApp::new();
    let alice = app.signup().await;
    let bob = app.signup().await;
    let conversation = start_direct(&app, &alice, &bob).await.json::<Value>()["data"].clone();
    let message = send(&app, &alice, conversation["id"].as_str().unwrap(), "helo").await;
    let message_id = message["id"].as_str().unwrap();

    app.server
        .put(&format!("/api/v1/messages/{message_id}"))
        .authorization_bearer(&bob.access_token)
        .json(&json!({ "content": "not mine" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = app
        .server
        .put(&format!("/api/v1/messages/{message_id}"))
        .authorization_bearer(&alice.access_token)
        .json(&json!({ "content": "hello" }))
        .await;
    response.assert_status_ok();
    let edited = response.json::<Value>()["data"].clone();
    assert_eq!(edited["content"], "hello");
    assert!(edited["editedAt"].is_string());

    let reactions_url = format!("/api/v1/messages/{message_id}/reactions");
    let response = app
        .server
        .post(&reactions_url)
        .authorization_bearer(&bob.access_token)
        .json(&json!({ "emoji": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["details"][0]["field"], "emoji");

    let response = app
        .server
        .post(&reactions_url)
        .authorization_bearer(&bob.access_token)
        .json(&json!({ "emoji": "👍" }))
        .await;
    response.assert_status_ok();
    let reactions = response.json::<Value>()["data"]["reactions"].clone();
    assert_eq!(reactions[0]["emoji"], "👍");
    assert_eq!(reactions[0]["userId"], bob.id.to_string());

    let response = app
        .server
        .post(&reactions_url)
        .authorization_bearer(&bob.access_token)
        .json(&json!({ "emoji": "👍" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "ALREADY_REACTED");

    let remove_url = format!("{reactions_url}/%F0%9F%91%8D");
    let response = app.server.delete(&remove_url).authorization_bearer(&bob.access_token).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["reactions"], json!([]));

    let response = app.server.delete(&remove_url).authorization_bearer(&bob.access_token).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "REACTION_NOT_FOUND");

    app.server
        .delete(&format!("/api/v1/messages/{message_id}"))
        .authorization_bearer(&bob.access_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .delete(&format!("/api/v1/messages/{message_id}"))
        .authorization_bearer(&alice.access_token)
        .await
        .assert_status_ok();

    let response = app
        .server
        .put(&format!("/api/v1/messages/{message_id}"))
        .authorization_bearer(&alice.access_token)
        .json(&json!({ "content": "gone" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "MESSAGE_NOT_FOUND");
}

#[tokio::test]
async fn test_group_administration() {
    let app = TestApp::new();
    let admin = app.signup().await;
    let member = app.signup().await;
    let newcomer = app.signup().await;

    let response = app
        .server
        .post("/api/v1/conversations")
        .authorization_bearer(&admin.access_token)
        .json(&json!({ "participantIds": [member.id.to_string()], "isGroup": true, "name": "Crew" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let group = response.json::<Value>()["data"].clone();
    let id = group["id"].as_str().unwrap();
    assert_eq!(group["isGroup"], true);
    assert_eq!(group["name"], "Crew");

    app.server
        .put(&format!("/api/v1/conversations/{id}"))
        .authorization_bearer(&member.access_token)
        .json(&json!({ "name": "Mutiny" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = app
        .server
        .put(&format!("/api/v1/conversations/{id}"))
        .authorization_bearer(&admin.access_token)
        .json(&json!({ "name": "Crew 2" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["name"], "Crew 2");

    let response = app
        .server
        .post(&format!("/api/v1/conversations/{id}/members"))
        .authorization_bearer(&admin.access_token)
        .json(&json!({ "userIds": [newcomer.id.to_string()] }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["members"].as_array().map(Vec::len), Some(3));

    // Members may leave on their own but not remove others
    app.server
        .delete(&format!("/api/v1/conversations/{id}/members/{}", newcomer.id))
        .authorization_bearer(&member.access_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .delete(&format!("/api/v1/conversations/{id}/members/{}", member.id))
        .authorization_bearer(&member.access_token)
        .await
        .assert_status_ok();
    let response = app
        .server
        .delete(&format!("/api/v1/conversations/{id}/members/{}", member.id))
        .authorization_bearer(&admin.access_token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "MEMBER_NOT_FOUND");

    app.server
        .delete(&format!("/api/v1/conversations/{id}"))
        .authorization_bearer(&newcomer.access_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .delete(&format!("/api/v1/conversations/{id}"))
        .authorization_bearer(&admin.access_token)
        .await
        .assert_status_ok();

    let response = app
        .server
        .get(&format!("/api/v1/conversations/{id}"))
        .authorization_bearer(&admin.access_token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "CONVERSATION_NOT_FOUND");
}

#[tokio::test]
async fn test_direct_conversation_cannot_be_renamed() {
    let app = TestApp::new();
    let alice = app.signup().await;
    let bob = app.signup().await;
    let conversation = start_direct(&app, &alice, &bob).await.json::<Value>()["data"].clone();

    let response = app
        .server
        .put(&format!("/api/v1/conversations/{}", conversation["id"].as_str().unwrap()))
        .authorization_bearer(&alice.access_token)
        .json(&json!({ "name": "Pair" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "NOT_A_GROUP");
}
