//! Rate Limiting Tests

use axum::http::{HeaderName, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{unique_email, TestApp, TEST_PEER};
use social_api::config::LimiterSettings;

const STRICT: LimiterSettings = LimiterSettings {
    max_requests: 2,
    window_ms: 15 * 60 * 1000,
};

fn forwarded_for(ip: &'static str) -> (HeaderName, HeaderValue) {
    (HeaderName::from_static("x-forwarded-for"), HeaderValue::from_static(ip))
}

async fn failed_login(app: &TestApp, ip: &'static str) -> axum_test::TestResponse {
    let (name, value) = forwarded_for(ip);
    app.server
        .post("/api/v1/auth/login")
        .add_header(name, value)
        .json(&json!({ "email": unique_email(), "password": "WrongPassword123!" }))
        .await
}

#[tokio::test]
async fn test_auth_limiter_rejects_after_limit() {
    let app = TestApp::with_settings(|settings| settings.rate_limit.auth = STRICT);

    let first = failed_login(&app, "203.0.113.7").await;
    first.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(first.header("x-ratelimit-limit"), "2");
    assert_eq!(first.header("x-ratelimit-remaining"), "1");

    failed_login(&app, "203.0.113.7")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let rejected = failed_login(&app, "203.0.113.7").await;
    rejected.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(rejected.header("x-ratelimit-remaining"), "0");
    let retry_after: u64 = rejected
        .header("retry-after")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 15 * 60);

    let body = rejected.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["details"]["retryAfter"], retry_after);
}

#[tokio::test]
async fn test_limits_are_tracked_per_client_behind_trusted_proxy() {
    let app = TestApp::with_settings(|settings| {
        settings.rate_limit.auth = STRICT;
        settings.rate_limit.trusted_proxies = vec![TEST_PEER];
    });

    for _ in 0..2 {
        failed_login(&app, "198.51.100.1").await;
    }
    failed_login(&app, "198.51.100.1")
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    failed_login(&app, "198.51.100.2")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rotating_forwarded_for_from_untrusted_peer_is_still_limited() {
    let app = TestApp::with_settings(|settings| settings.rate_limit.auth = STRICT);
    let addresses = ["203.0.113.1", "203.0.113.2", "203.0.113.3", "203.0.113.4", "203.0.113.5"];

    let mut rejected = 0;
    for ip in addresses {
        if failed_login(&app, ip).await.status_code() == StatusCode::TOO_MANY_REQUESTS {
            rejected += 1;
        }
    }

    assert_eq!(rejected, addresses.len() - 2);
}

#[tokio::test]
async fn test_authenticated_limiter_counts_per_user() {
    let app = TestApp::with_settings(|settings| settings.rate_limit.follow = STRICT);
    let follower = app.signup().await;
    let other = app.signup().await;
    let targets = [app.signup().await, app.signup().await, app.signup().await];

    for target in &targets[..2] {
        assert_eq!(app.follow(&follower, target).await, "accepted");
    }
    let response = app
        .server
        .post(&format!("/api/v1/users/{}/follow", targets[2].id))
        .authorization_bearer(&follower.access_token)
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);

    // Another account behind the same address has its own budget
    assert_eq!(app.follow(&other, &targets[2]).await, "accepted");
}

#[tokio::test]
async fn test_disabled_rate_limiting() {
    let app = TestApp::with_settings(|settings| {
        settings.rate_limit.auth = STRICT;
        settings.rate_limit.enabled = false;
    });

    for _ in 0..4 {
        let response = failed_login(&app, "192.0.2.10").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.maybe_header("x-ratelimit-limit").is_none());
    }
}
