//! Post and Media entities and the post repository trait.
//!
//! Maps to the `posts`, `post_media`, `likes` and `post_hashtags` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;
use crate::domain::value_objects::{Page, Pagination};
use crate::shared::error::AppError;

/// Kind of an uploaded media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    pub fn from_str(s: &str) -> Self {
        match s {
            "video" => Self::Video,
            _ => Self::Image,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// Classify by MIME type; anything that is not `video/*` is an image.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("video/") {
            Self::Video
        } else {
            Self::Image
        }
    }
}

/// One media item of a post, ordered by `position`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    pub post_id: i64,
    pub url: String,
    pub kind: MediaKind,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub position: i32,
}

/// A post owned by one user.
///
/// `likes_count` and `comments_count` are denormalised and only ever changed
/// inside the transaction that inserts or deletes the mirrored rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub caption: Option<String>,
    pub location: Option<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub likes_enabled: bool,
    pub comments_enabled: bool,
    pub is_archived: bool,
    pub media: Vec<Media>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(id: i64, user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            caption: None,
            location: None,
            likes_count: 0,
            comments_count: 0,
            likes_enabled: true,
            comments_enabled: true,
            is_archived: false,
            media: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

/// Repository trait for posts, their media, likes and hashtag links.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert the post with its media, link `hashtags` (creating missing
    /// ones) and increment the author's `posts_count`, atomically.
    async fn create(&self, post: &Post, hashtags: &[String]) -> Result<Post, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, AppError>;

    /// Write caption, location, flags and archive state. When `hashtags` is
    /// given the post's hashtag links are replaced.
    async fn update(&self, post: &Post, hashtags: Option<&[String]>) -> Result<Post, AppError>;

    /// Delete the post and decrement the author's `posts_count`, atomically.
    /// Returns the deleted post (with media) so its files can be removed.
    async fn delete(&self, id: i64) -> Result<Option<Post>, AppError>;

    /// Posts of one author, newest first; `archived` selects archived or live posts.
    async fn find_by_user(
        &self,
        user_id: i64,
        archived: bool,
        pagination: Pagination,
    ) -> Result<Page<Post>, AppError>;

    /// Live posts of the given authors, newest first.
    async fn feed(&self, author_ids: &[i64], pagination: Pagination) -> Result<Page<Post>, AppError>;

    /// Live posts of public authors ordered by likes, then recency.
    async fn explore(&self, exclude_user: Option<i64>, pagination: Pagination) -> Result<Page<Post>, AppError>;

    /// Live posts of public authors carrying the hashtag, newest first.
    async fn find_by_hashtag(&self, tag: &str, pagination: Pagination) -> Result<Page<Post>, AppError>;

    /// Insert a like row and increment `likes_count`, atomically.
    /// Returns `false` if the like already existed (nothing changes).
    async fn add_like(&self, post_id: i64, user_id: i64) -> Result<bool, AppError>;

    /// Delete a like row and decrement `likes_count`, atomically.
    /// Returns `false` if there was no like (nothing changes).
    async fn remove_like(&self, post_id: i64, user_id: i64) -> Result<bool, AppError>;

    async fn has_liked(&self, post_id: i64, user_id: i64) -> Result<bool, AppError>;

    /// Subset of `post_ids` liked by `user_id`.
    async fn liked_post_ids(&self, user_id: i64, post_ids: &[i64]) -> Result<Vec<i64>, AppError>;

    /// Users who liked the post, most recent first.
    async fn likers(&self, post_id: i64, pagination: Pagination) -> Result<Page<User>, AppError>;
}
