//! Request DTOs
//!
//! Data structures for API request bodies and query strings. Every struct is
//! validated with `validator` and then sanitised before it reaches a service.
//! Unknown fields are ignored.

use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::domain::Pagination;
use crate::shared::sanitize::{sanitize_html, sanitize_opt, Sanitize};

static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.]+$").expect("valid username regex"));

/// Snowflake ids travel as decimal strings.
fn validate_id(id: &str) -> Result<(), ValidationError> {
    match id.parse::<i64>() {
        Ok(v) if v > 0 => Ok(()),
        _ => Err(ValidationError::new("invalid_id").with_message("Invalid id".into())),
    }
}

fn validate_ids(ids: &Vec<String>) -> Result<(), ValidationError> {
    ids.iter().try_for_each(|id| validate_id(id))
}

/// Parse an id that already passed [`validate_id`].
pub fn parse_id(id: &str) -> i64 {
    id.parse().unwrap_or_default()
}

// ============================================================================
// Auth
// ============================================================================

/// Registration request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 30, message = "Username must be 3-30 characters"),
        regex(path = *USERNAME_REGEX, message = "Username may only contain letters, numbers, dots and underscores")
    )]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Full name must be at most 100 characters"))]
    pub full_name: Option<String>,
}

impl Sanitize for RegisterRequest {
    fn sanitize(&mut self) {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        sanitize_opt(&mut self.full_name);
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl Sanitize for LoginRequest {
    fn sanitize(&mut self) {
        self.email = self.email.trim().to_lowercase();
    }
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

impl Sanitize for RefreshTokenRequest {}

/// Logout body; the refresh token is optional.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

impl Sanitize for LogoutRequest {}

/// Change password request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

impl Sanitize for ChangePasswordRequest {}

// ============================================================================
// Users
// ============================================================================

/// Update profile request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100, message = "Full name must be at most 100 characters"))]
    pub full_name: Option<String>,

    #[validate(length(max = 150, message = "Bio must be at most 150 characters"))]
    pub bio: Option<String>,

    #[validate(
        url(message = "Website must be a valid URL"),
        length(max = 200, message = "Website must be at most 200 characters")
    )]
    pub website: Option<String>,

    pub is_private: Option<bool>,
}

impl Sanitize for UpdateProfileRequest {
    fn sanitize(&mut self) {
        sanitize_opt(&mut self.full_name);
        sanitize_opt(&mut self.bio);
    }
}

// ============================================================================
// Posts
// ============================================================================

/// Text fields of a new post; the media files arrive alongside in the
/// multipart form.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(max = 2200, message = "Caption must be at most 2200 characters"))]
    pub caption: Option<String>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    #[serde(default = "enabled")]
    pub likes_enabled: bool,

    #[serde(default = "enabled")]
    pub comments_enabled: bool,
}

fn enabled() -> bool {
    true
}

impl Sanitize for CreatePostRequest {
    fn sanitize(&mut self) {
        sanitize_opt(&mut self.caption);
        sanitize_opt(&mut self.location);
    }
}

/// Update post request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[validate(length(max = 2200, message = "Caption must be at most 2200 characters"))]
    pub caption: Option<String>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    pub likes_enabled: Option<bool>,
    pub comments_enabled: Option<bool>,
}

impl Sanitize for UpdatePostRequest {
    fn sanitize(&mut self) {
        sanitize_opt(&mut self.caption);
        sanitize_opt(&mut self.location);
    }
}

// ============================================================================
// Comments
// ============================================================================

/// Create comment request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Comment must be 1-1000 characters"))]
    pub content: String,

    #[validate(custom(function = "validate_id"))]
    pub parent_id: Option<String>,
}

impl Sanitize for CreateCommentRequest {
    fn sanitize(&mut self) {
        self.content = sanitize_html(&self.content);
    }
}

/// Update comment request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Comment must be 1-1000 characters"))]
    pub content: String,
}

impl Sanitize for UpdateCommentRequest {
    fn sanitize(&mut self) {
        self.content = sanitize_html(&self.content);
    }
}

// ============================================================================
// Conversations & messages
// ============================================================================

/// Create conversation request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    #[validate(
        length(min = 1, max = 50, message = "Between 1 and 50 participants are required"),
        custom(function = "validate_ids")
    )]
    pub participant_ids: Vec<String>,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[serde(default)]
    pub is_group: bool,
}

impl Sanitize for CreateConversationRequest {
    fn sanitize(&mut self) {
        sanitize_opt(&mut self.name);
    }
}

/// Rename a group conversation
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateConversationRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

impl Sanitize for UpdateConversationRequest {
    fn sanitize(&mut self) {
        self.name = sanitize_html(&self.name);
    }
}

/// Add members to a group conversation
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersRequest {
    #[validate(
        length(min = 1, max = 50, message = "Between 1 and 50 users are required"),
        custom(function = "validate_ids")
    )]
    pub user_ids: Vec<String>,
}

impl Sanitize for AddMembersRequest {}

/// Send message request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "Content must be 1-2000 characters"))]
    pub content: String,

    #[validate(custom(function = "validate_id"))]
    pub reply_to_id: Option<String>,
}

impl Sanitize for SendMessageRequest {
    fn sanitize(&mut self) {
        self.content = sanitize_html(&self.content);
    }
}

/// Edit message request
#[derive(Debug, Deserialize, Validate)]
pub struct EditMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "Content must be 1-2000 characters"))]
    pub content: String,
}

impl Sanitize for EditMessageRequest {
    fn sanitize(&mut self) {
        self.content = sanitize_html(&self.content);
    }
}

/// Add reaction request
#[derive(Debug, Deserialize, Validate)]
pub struct ReactionRequest {
    #[validate(length(min = 1, max = 16, message = "Emoji must be 1-16 characters"))]
    pub emoji: String,
}

impl Sanitize for ReactionRequest {
    fn sanitize(&mut self) {
        self.emoji = self.emoji.trim().to_string();
    }
}

// ============================================================================
// Stories
// ============================================================================

/// Text fields of a new story
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateStoryRequest {
    #[validate(length(max = 500, message = "Caption must be at most 500 characters"))]
    pub caption: Option<String>,
}

impl Sanitize for CreateStoryRequest {
    fn sanitize(&mut self) {
        sanitize_opt(&mut self.caption);
    }
}

// ============================================================================
// Uploads
// ============================================================================

/// One file part of a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub data: Bytes,
    pub content_type: String,
    pub file_name: Option<String>,
}

// ============================================================================
// Query strings
// ============================================================================

/// `?page=&limit=`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PaginationQuery {
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 50, message = "Limit must be 1-50"))]
    pub limit: Option<u32>,
}

impl PaginationQuery {
    pub fn pagination(&self) -> Pagination {
        to_pagination(self.page, self.limit)
    }
}

impl Sanitize for PaginationQuery {}

fn to_pagination(page: Option<u32>, limit: Option<u32>) -> Pagination {
    Pagination::new(page.unwrap_or(1), limit.unwrap_or(Pagination::DEFAULT_LIMIT))
}

/// `?q=&page=&limit=`
#[derive(Debug, Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(length(min = 1, max = 100, message = "Query must be 1-100 characters"))]
    pub q: String,

    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 50, message = "Limit must be 1-50"))]
    pub limit: Option<u32>,
}

impl SearchQuery {
    pub fn pagination(&self) -> Pagination {
        to_pagination(self.page, self.limit)
    }
}

impl Sanitize for SearchQuery {
    fn sanitize(&mut self) {
        self.q = self.q.trim().to_string();
    }
}

/// `GET /posts/user/{userId}?archived=&page=&limit=`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserPostsQuery {
    #[serde(default)]
    pub archived: bool,

    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 50, message = "Limit must be 1-50"))]
    pub limit: Option<u32>,
}

impl UserPostsQuery {
    pub fn pagination(&self) -> Pagination {
        to_pagination(self.page, self.limit)
    }
}

impl Sanitize for UserPostsQuery {}

/// `?limit=` for short ranked lists
#[derive(Debug, Default, Deserialize, Validate)]
pub struct LimitQuery {
    #[validate(range(min = 1, max = 50, message = "Limit must be 1-50"))]
    pub limit: Option<u32>,
}

impl LimitQuery {
    pub fn limit_or(&self, default: u32) -> i64 {
        self.limit.unwrap_or(default) as i64
    }
}

impl Sanitize for LimitQuery {}
