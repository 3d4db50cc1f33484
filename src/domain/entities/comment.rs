//! Comment entity and repository trait.
//!
//! Maps to the `comments` and `comment_likes` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, Pagination};
use crate::shared::error::AppError;

/// A comment on a post. Replies point at a top-level comment through
/// `parent_id`; replies to replies are not allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub likes_count: i64,
    /// Computed on read
    pub replies_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(id: i64, post_id: i64, user_id: i64, parent_id: Option<i64>, content: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            post_id,
            user_id,
            parent_id,
            content,
            likes_count: 0,
            replies_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Repository trait for comments and comment likes.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert the comment and increment the post's `comments_count`, atomically.
    async fn create(&self, comment: &Comment) -> Result<Comment, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, AppError>;

    /// Write the comment content.
    async fn update(&self, comment: &Comment) -> Result<Comment, AppError>;

    /// Delete the comment and its replies and decrease the post's
    /// `comments_count` by the number of removed rows, atomically.
    /// Returns the number of removed rows (0 when the comment did not exist).
    async fn delete(&self, id: i64) -> Result<i64, AppError>;

    /// Top-level comments of a post, oldest first.
    async fn find_by_post(&self, post_id: i64, pagination: Pagination) -> Result<Page<Comment>, AppError>;

    /// Replies to a comment, oldest first.
    async fn replies(&self, parent_id: i64, pagination: Pagination) -> Result<Page<Comment>, AppError>;

    /// Insert a comment like and increment `likes_count`, atomically.
    async fn add_like(&self, comment_id: i64, user_id: i64) -> Result<bool, AppError>;

    /// Delete a comment like and decrement `likes_count`, atomically.
    async fn remove_like(&self, comment_id: i64, user_id: i64) -> Result<bool, AppError>;

    /// Subset of `comment_ids` liked by `user_id`.
    async fn liked_comment_ids(&self, user_id: i64, comment_ids: &[i64]) -> Result<Vec<i64>, AppError>;
}
