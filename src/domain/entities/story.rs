//! Story entity and repository trait.
//!
//! Maps to the `stories` and `story_views` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::post::MediaKind;
use crate::domain::value_objects::{Page, Pagination};
use crate::shared::error::AppError;

/// An ephemeral media item visible until `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: i64,
    pub user_id: i64,
    pub media_url: String,
    pub media_kind: MediaKind,
    pub caption: Option<String>,
    pub views_count: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Story {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

/// A single viewer of a story. Composite key `(story_id, viewer_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryView {
    pub story_id: i64,
    pub viewer_id: i64,
    pub viewed_at: DateTime<Utc>,
}

/// Repository trait for stories and their views.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    async fn create(&self, story: &Story) -> Result<Story, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Story>, AppError>;

    /// Delete a story, returning it so its media can be removed.
    async fn delete(&self, id: i64) -> Result<Option<Story>, AppError>;

    /// Unexpired stories of the given users, oldest first.
    async fn active_for_users(&self, user_ids: &[i64], now: DateTime<Utc>) -> Result<Vec<Story>, AppError>;

    /// Insert a view row and increment `views_count`, atomically.
    /// Returns `false` if the viewer had already seen the story.
    async fn record_view(&self, story_id: i64, viewer_id: i64) -> Result<bool, AppError>;

    /// Subset of `story_ids` already seen by `viewer_id`.
    async fn viewed_story_ids(&self, viewer_id: i64, story_ids: &[i64]) -> Result<Vec<i64>, AppError>;

    /// Views of a story, most recent first.
    async fn views(&self, story_id: i64, pagination: Pagination) -> Result<Page<StoryView>, AppError>;

    /// Remove every story expired at `now`, returning the removed stories.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<Vec<Story>, AppError>;
}
