use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{newest_first, oldest_first, MemoryStore};
use crate::domain::{Page, Pagination, Story, StoryRepository, StoryView};
use crate::shared::error::AppError;

pub struct MemoryStoryRepository {
    store: MemoryStore,
}

impl MemoryStoryRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StoryRepository for MemoryStoryRepository {
    async fn create(&self, story: &Story) -> Result<Story, AppError> {
        self.store.tables().write().stories.insert(story.id, story.clone());
        Ok(story.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Story>, AppError> {
        Ok(self.store.tables().read().stories.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<Option<Story>, AppError> {
        let mut tables = self.store.tables().write();
        let removed = tables.stories.remove(&id);
        if removed.is_some() {
            tables.story_views.retain(|(story_id, _), _| *story_id != id);
        }
        Ok(removed)
    }

    async fn active_for_users(&self, user_ids: &[i64], now: DateTime<Utc>) -> Result<Vec<Story>, AppError> {
        let tables = self.store.tables().read();
        let mut stories: Vec<Story> = tables
            .stories
            .values()
            .filter(|s| user_ids.contains(&s.user_id) && !s.is_expired_at(now))
            .cloned()
            .collect();
        oldest_first(&mut stories, |s| (s.created_at, s.id));
        Ok(stories)
    }

    async fn record_view(&self, story_id: i64, viewer_id: i64) -> Result<bool, AppError> {
        let mut tables = self.store.tables().write();
        if tables.story_views.contains_key(&(story_id, viewer_id)) {
            return Ok(false);
        }
        let Some(story) = tables.stories.get_mut(&story_id) else {
            return Err(AppError::not_found("STORY_NOT_FOUND", "Story not found"));
        };
        story.views_count += 1;
        tables.story_views.insert(
            (story_id, viewer_id),
            StoryView {
                story_id,
                viewer_id,
                viewed_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn viewed_story_ids(&self, viewer_id: i64, story_ids: &[i64]) -> Result<Vec<i64>, AppError> {
        let tables = self.store.tables().read();
        Ok(story_ids
            .iter()
            .copied()
            .filter(|id| tables.story_views.contains_key(&(*id, viewer_id)))
            .collect())
    }

    async fn views(&self, story_id: i64, pagination: Pagination) -> Result<Page<StoryView>, AppError> {
        let tables = self.store.tables().read();
        let mut views: Vec<StoryView> = tables
            .story_views
            .values()
            .filter(|v| v.story_id == story_id)
            .cloned()
            .collect();
        newest_first(&mut views, |v| (v.viewed_at, v.viewer_id));
        Ok(Page::from_vec(views, pagination))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<Vec<Story>, AppError> {
        let mut tables = self.store.tables().write();
        let expired: Vec<i64> = tables
            .stories
            .values()
            .filter(|s| s.is_expired_at(now))
            .map(|s| s.id)
            .collect();
        let mut removed = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(story) = tables.stories.remove(&id) {
                removed.push(story);
            }
        }
        tables
            .story_views
            .retain(|(story_id, _), _| !removed.iter().any(|s| s.id == *story_id));
        Ok(removed)
    }
}
