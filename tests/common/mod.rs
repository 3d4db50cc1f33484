//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use axum::Extension;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use bytes::Bytes;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Word;
use fake::Fake;
use serde_json::Value;

use social_api::application::dto::request::RegisterRequest;
use social_api::application::services::AuthService;
use social_api::config::{LimiterSettings, Settings};
use social_api::infrastructure::media::{InMemoryMediaStore, MediaError, MediaStore, StoredMedia, UploadOptions};
use social_api::startup::{build_router, AppState};

pub const TEST_SECRET: &str = "integration-test-secret-that-is-long-enough";
pub const TEST_PASSWORD: &str = "TestPassword123!";

/// Limits high enough that ordinary tests never hit them.
const RELAXED: LimiterSettings = LimiterSettings {
    max_requests: 10_000,
    window_ms: 60 * 60 * 1000,
};

/// Socket peer of every test request, as if the API sat behind one proxy.
pub const TEST_PEER: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

/// Test application over in-memory repositories and media.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
}

impl TestApp {
    /// Application with relaxed rate limits and an in-memory media store.
    pub fn new() -> Self {
        Self::with(|_| {}, Arc::new(InMemoryMediaStore::new()))
    }

    /// Application over a specific media store.
    pub fn with_media(media: Arc<dyn MediaStore>) -> Self {
        Self::with(|_| {}, media)
    }

    /// Application whose settings are adjusted after the relaxed defaults.
    pub fn with_settings(configure: impl FnOnce(&mut Settings)) -> Self {
        Self::with(configure, Arc::new(InMemoryMediaStore::new()))
    }

    fn with(configure: impl FnOnce(&mut Settings), media: Arc<dyn MediaStore>) -> Self {
        let mut settings = Settings::for_testing(TEST_SECRET).expect("test settings");
        let limits = &mut settings.rate_limit;
        limits.api = RELAXED;
        limits.auth = RELAXED;
        limits.post_create = RELAXED;
        limits.comment_create = RELAXED;
        limits.message_send = RELAXED;
        limits.follow = RELAXED;
        configure(&mut settings);

        let state = AppState::in_memory(settings, media);
        let router = build_router(state.clone())
            .layer(Extension(ConnectInfo(SocketAddr::new(TEST_PEER, 40_000))));
        let server = TestServer::new(router).expect("test server");

        Self { server, state }
    }

    /// Register a fresh random user through the auth service.
    pub async fn signup(&self) -> TestUser {
        let username = unique_username();
        self.signup_as(&username).await
    }

    /// Register a user with the given username.
    pub async fn signup_as(&self, username: &str) -> TestUser {
        let email = unique_email();
        let auth = self
            .state
            .services
            .auth
            .register(RegisterRequest {
                username: username.to_string(),
                email: email.clone(),
                password: TEST_PASSWORD.to_string(),
                full_name: None,
            })
            .await
            .expect("register test user");

        TestUser {
            id: auth.user.id.parse().expect("numeric user id"),
            username: username.to_string(),
            email,
            access_token: auth.tokens.access_token,
            refresh_token: auth.tokens.refresh_token,
        }
    }

    /// Register a user and make the account private.
    pub async fn signup_private(&self) -> TestUser {
        let user = self.signup().await;
        self.server
            .put("/api/v1/users/me")
            .authorization_bearer(&user.access_token)
            .json(&serde_json::json!({ "isPrivate": true }))
            .await
            .assert_status_ok();
        user
    }

    /// Create a post with one image and return its JSON representation.
    pub async fn create_post(&self, author: &TestUser, caption: &str) -> Value {
        let form = MultipartForm::new()
            .add_text("caption", caption.to_string())
            .add_part("media", png_part("photo.png"));

        let response = self
            .server
            .post("/api/v1/posts")
            .authorization_bearer(&author.access_token)
            .multipart(form)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    /// `author` follows `target`; returns the resulting status.
    pub async fn follow(&self, follower: &TestUser, target: &TestUser) -> String {
        let response = self
            .server
            .post(&format!("/api/v1/users/{}/follow", target.id))
            .authorization_bearer(&follower.access_token)
            .await;
        response.json::<Value>()["data"]["status"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }

    /// Profile JSON of `user` as seen by `viewer`.
    pub async fn profile(&self, user: &TestUser, viewer: &TestUser) -> Value {
        self.server
            .get(&format!("/api/v1/users/{}", user.username))
            .authorization_bearer(&viewer.access_token)
            .await
            .json::<Value>()["data"]
            .clone()
    }
}

/// A registered user with a live token pair.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Generate a unique test email
pub fn unique_email() -> String {
    let email: String = SafeEmail().fake();
    format!("{}.{}", &uuid::Uuid::new_v4().simple().to_string()[..8], email)
}

/// Generate a unique test username
pub fn unique_username() -> String {
    let word: String = Word().fake();
    let word: String = word
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(12)
        .collect();
    format!("{}_{}", word, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

/// Smallest valid PNG: one transparent pixel.
pub const PNG_PIXEL: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, 0x00, 0x00,
    0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00,
    0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D,
    0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Multipart part carrying [`PNG_PIXEL`].
pub fn png_part(file_name: &str) -> Part {
    Part::bytes(PNG_PIXEL.to_vec())
        .file_name(file_name.to_string())
        .mime_type("image/png")
}

/// Media store whose uploads succeed and whose deletes always fail.
#[derive(Default)]
pub struct FailingDeleteMediaStore {
    inner: InMemoryMediaStore,
}

impl FailingDeleteMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner.contains(url)
    }
}

#[async_trait]
impl MediaStore for FailingDeleteMediaStore {
    async fn upload(&self, data: Bytes, content_type: &str, options: UploadOptions) -> Result<StoredMedia, MediaError> {
        self.inner.upload(data, content_type, options).await
    }

    async fn delete(&self, url: &str) -> Result<(), MediaError> {
        Err(MediaError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("storage unavailable for {url}"),
        )))
    }
}
