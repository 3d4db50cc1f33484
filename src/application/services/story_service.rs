//! Story Service
//!
//! Ephemeral stories with per-viewer view tracking. Expired stories are
//! swept periodically by [`StoryService::cleanup_expired`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{info, instrument};

use super::support::{delete_media_best_effort, Authors};
use crate::application::dto::request::{CreateStoryRequest, UploadedFile};
use crate::application::dto::response::{
    Paginated, StoryGroupResponse, StoryResponse, StoryViewerResponse,
};
use crate::config::{MediaSettings, StorySettings};
use crate::domain::{
    FollowRepository, Page, Pagination, Story, StoryRepository, UserRepository, VisibilityService,
};
use crate::infrastructure::media::{media_key, MediaError, MediaStore, UploadOptions};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

#[async_trait]
pub trait StoryService: Send + Sync {
    async fn create(&self, user_id: i64, request: CreateStoryRequest, file: UploadedFile) -> Result<StoryResponse, StoryError>;

    /// Active stories of the user and accepted followings, grouped by author
    async fn feed(&self, user_id: i64) -> Result<Vec<StoryGroupResponse>, StoryError>;

    async fn user_stories(&self, user_id: i64, viewer_id: Option<i64>) -> Result<Vec<StoryResponse>, StoryError>;

    /// Record a view once per viewer; the owner's own views are not recorded
    async fn view(&self, user_id: i64, story_id: i64) -> Result<StoryResponse, StoryError>;

    async fn viewers(
        &self,
        user_id: i64,
        story_id: i64,
        pagination: Pagination,
    ) -> Result<Paginated<StoryViewerResponse>, StoryError>;

    async fn delete(&self, user_id: i64, story_id: i64) -> Result<(), StoryError>;

    /// Remove expired stories and their media. Returns the number removed.
    async fn cleanup_expired(&self) -> Result<usize, StoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    #[error("Story not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Story has expired")]
    Expired,

    #[error("Access denied")]
    AccessDenied,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<StoryError> for AppError {
    fn from(err: StoryError) -> Self {
        let message = err.to_string();
        match err {
            StoryError::NotFound => AppError::not_found("STORY_NOT_FOUND", message),
            StoryError::UserNotFound => AppError::not_found("USER_NOT_FOUND", message),
            StoryError::Expired => AppError::bad_request("STORY_EXPIRED", message),
            StoryError::AccessDenied => AppError::access_denied(),
            StoryError::Media(e) => e.into(),
            StoryError::App(e) => e,
        }
    }
}

pub struct StoryServiceImpl {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
    stories: Arc<dyn StoryRepository>,
    media: Arc<dyn MediaStore>,
    id_generator: Arc<SnowflakeGenerator>,
    media_settings: MediaSettings,
    story_settings: StorySettings,
}

impl StoryServiceImpl {
    pub fn new(
        users: Arc<dyn UserRepository>,
        follows: Arc<dyn FollowRepository>,
        stories: Arc<dyn StoryRepository>,
        media: Arc<dyn MediaStore>,
        id_generator: Arc<SnowflakeGenerator>,
        media_settings: MediaSettings,
        story_settings: StorySettings,
    ) -> Self {
        Self {
            users,
            follows,
            stories,
            media,
            id_generator,
            media_settings,
            story_settings,
        }
    }

    async fn owned(&self, user_id: i64, story_id: i64) -> Result<Story, StoryError> {
        let story = self.stories.find_by_id(story_id).await?.ok_or(StoryError::NotFound)?;
        if !story.is_owned_by(user_id) {
            return Err(StoryError::AccessDenied);
        }
        Ok(story)
    }

    async fn viewed_ids(&self, viewer_id: i64, stories: &[Story]) -> Result<HashSet<i64>, StoryError> {
        if stories.is_empty() {
            return Ok(HashSet::new());
        }
        let ids: Vec<i64> = stories.iter().map(|s| s.id).collect();
        Ok(self
            .stories
            .viewed_story_ids(viewer_id, &ids)
            .await?
            .into_iter()
            .collect())
    }
}

#[async_trait]
impl StoryService for StoryServiceImpl {
    #[instrument(skip(self, request, file), fields(size = file.data.len()))]
    async fn create(&self, user_id: i64, request: CreateStoryRequest, file: UploadedFile) -> Result<StoryResponse, StoryError> {
        let stored = self
            .media
            .upload(
                file.data,
                &file.content_type,
                UploadOptions::new("stories", media_key(user_id, 0), Some(self.media_settings.story_profile)),
            )
            .await?;

        let now = Utc::now();
        let story = Story {
            id: self.id_generator.generate(),
            user_id,
            media_url: stored.url,
            media_kind: stored.kind,
            caption: request.caption.filter(|c| !c.is_empty()),
            views_count: 0,
            expires_at: now + Duration::hours(self.story_settings.lifetime_hours),
            created_at: now,
        };

        let story = match self.stories.create(&story).await {
            Ok(story) => story,
            Err(e) => {
                delete_media_best_effort(self.media.as_ref(), &[story.media_url]).await;
                return Err(e.into());
            }
        };

        info!(story_id = story.id, user_id, "Story created");
        Ok(StoryResponse::new(story, true))
    }

    async fn feed(&self, user_id: i64) -> Result<Vec<StoryGroupResponse>, StoryError> {
        let mut authors = vec![user_id];
        authors.extend(self.follows.following_ids(user_id).await?);

        let stories = self.stories.active_for_users(&authors, Utc::now()).await?;
        let viewed = self.viewed_ids(user_id, &stories).await?;
        let users = Authors::load(self.users.as_ref(), stories.iter().map(|s| s.user_id)).await?;

        // Own tray first, then followings in the order they were listed
        let mut groups: Vec<StoryGroupResponse> = Vec::new();
        for author in authors {
            let own = author == user_id;
            let items: Vec<StoryResponse> = stories
                .iter()
                .filter(|s| s.user_id == author)
                .map(|s| StoryResponse::new(s.clone(), own || viewed.contains(&s.id)))
                .collect();
            if items.is_empty() {
                continue;
            }
            groups.push(StoryGroupResponse {
                user: users.get(author),
                has_unviewed: items.iter().any(|s| !s.viewed),
                stories: items,
            });
        }

        Ok(groups)
    }

    async fn user_stories(&self, user_id: i64, viewer_id: Option<i64>) -> Result<Vec<StoryResponse>, StoryError> {
        let owner = self.users.find_by_id(user_id).await?.ok_or(StoryError::UserNotFound)?;
        VisibilityService::ensure_can_view(&owner, viewer_id, self.follows.as_ref()).await?;

        let stories = self.stories.active_for_users(&[user_id], Utc::now()).await?;
        let viewed = match viewer_id {
            Some(viewer) => self.viewed_ids(viewer, &stories).await?,
            None => HashSet::new(),
        };

        Ok(stories
            .into_iter()
            .map(|story| {
                let seen = viewer_id == Some(story.user_id) || viewed.contains(&story.id);
                StoryResponse::new(story, seen)
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn view(&self, user_id: i64, story_id: i64) -> Result<StoryResponse, StoryError> {
        let story = self.stories.find_by_id(story_id).await?.ok_or(StoryError::NotFound)?;
        if story.is_expired_at(Utc::now()) {
            return Err(StoryError::Expired);
        }
        if story.is_owned_by(user_id) {
            return Ok(StoryResponse::new(story, true));
        }

        let owner = self.users.find_by_id(story.user_id).await?.ok_or(StoryError::NotFound)?;
        VisibilityService::ensure_can_view(&owner, Some(user_id), self.follows.as_ref()).await?;

        if self.stories.record_view(story_id, user_id).await? {
            info!(story_id, viewer_id = user_id, "Story view recorded");
        }
        let story = self.stories.find_by_id(story_id).await?.ok_or(StoryError::NotFound)?;
        Ok(StoryResponse::new(story, true))
    }

    async fn viewers(
        &self,
        user_id: i64,
        story_id: i64,
        pagination: Pagination,
    ) -> Result<Paginated<StoryViewerResponse>, StoryError> {
        self.owned(user_id, story_id).await?;

        let page = self.stories.views(story_id, pagination).await?;
        let users = Authors::load(self.users.as_ref(), page.items.iter().map(|v| v.viewer_id)).await?;
        let items = page
            .items
            .into_iter()
            .map(|view| StoryViewerResponse {
                user: users.get(view.viewer_id),
                viewed_at: view.viewed_at,
            })
            .collect();

        Ok(Paginated::new(Page::new(items, page.total), pagination))
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: i64, story_id: i64) -> Result<(), StoryError> {
        self.owned(user_id, story_id).await?;

        let story = self.stories.delete(story_id).await?.ok_or(StoryError::NotFound)?;
        delete_media_best_effort(self.media.as_ref(), &[story.media_url]).await;

        info!(story_id, "Story deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn cleanup_expired(&self) -> Result<usize, StoryError> {
        let expired = self.stories.delete_expired(Utc::now()).await?;
        let urls: Vec<String> = expired.into_iter().map(|s| s.media_url).collect();
        delete_media_best_effort(self.media.as_ref(), &urls).await;

        if !urls.is_empty() {
            info!(removed = urls.len(), "Expired stories removed");
        }
        Ok(urls.len())
    }
}
