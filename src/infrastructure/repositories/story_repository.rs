//! Story Repository Implementation
//!
//! PostgreSQL implementation of the StoryRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{MediaKind, Page, Pagination, Story, StoryRepository, StoryView};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct StoryRow {
    id: i64,
    user_id: i64,
    media_url: String,
    media_kind: String,
    caption: Option<String>,
    views_count: i64,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<StoryRow> for Story {
    fn from(row: StoryRow) -> Self {
        Story {
            id: row.id,
            user_id: row.user_id,
            media_url: row.media_url,
            media_kind: MediaKind::from_str(&row.media_kind),
            caption: row.caption,
            views_count: row.views_count,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StoryViewRow {
    story_id: i64,
    viewer_id: i64,
    viewed_at: DateTime<Utc>,
}

/// PostgreSQL story repository implementation.
#[derive(Clone)]
pub struct PgStoryRepository {
    pool: PgPool,
}

impl PgStoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoryRepository for PgStoryRepository {
    async fn create(&self, story: &Story) -> Result<Story, AppError> {
        let row = sqlx::query_as::<_, StoryRow>(
            r#"
            INSERT INTO stories (id, user_id, media_url, media_kind, caption, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, media_url, media_kind, caption, views_count, expires_at, created_at
            "#,
        )
        .bind(story.id)
        .bind(story.user_id)
        .bind(&story.media_url)
        .bind(story.media_kind.as_str())
        .bind(&story.caption)
        .bind(story.expires_at)
        .bind(story.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Story>, AppError> {
        let row = sqlx::query_as::<_, StoryRow>(
            r#"
            SELECT id, user_id, media_url, media_kind, caption, views_count, expires_at, created_at
            FROM stories WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete(&self, id: i64) -> Result<Option<Story>, AppError> {
        let row = sqlx::query_as::<_, StoryRow>(
            r#"
            DELETE FROM stories WHERE id = $1
            RETURNING id, user_id, media_url, media_kind, caption, views_count, expires_at, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn active_for_users(&self, user_ids: &[i64], now: DateTime<Utc>) -> Result<Vec<Story>, AppError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, StoryRow>(
            r#"
            SELECT id, user_id, media_url, media_kind, caption, views_count, expires_at, created_at
            FROM stories
            WHERE user_id = ANY($1) AND expires_at > $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_ids)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn record_view(&self, story_id: i64, viewer_id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO story_views (story_id, viewer_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(story_id)
        .bind(viewer_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE stories SET views_count = views_count + 1 WHERE id = $1")
            .bind(story_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn viewed_story_ids(&self, viewer_id: i64, story_ids: &[i64]) -> Result<Vec<i64>, AppError> {
        if story_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT story_id FROM story_views WHERE viewer_id = $1 AND story_id = ANY($2)",
        )
        .bind(viewer_id)
        .bind(story_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn views(&self, story_id: i64, pagination: Pagination) -> Result<Page<StoryView>, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM story_views WHERE story_id = $1")
            .bind(story_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, StoryViewRow>(
            r#"
            SELECT story_id, viewer_id, viewed_at FROM story_views
            WHERE story_id = $1
            ORDER BY viewed_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(story_id)
        .bind(pagination.take())
        .bind(pagination.skip())
        .fetch_all(&self.pool)
        .await?;

        let views = rows
            .into_iter()
            .map(|r| StoryView {
                story_id: r.story_id,
                viewer_id: r.viewer_id,
                viewed_at: r.viewed_at,
            })
            .collect();

        Ok(Page::new(views, total))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<Vec<Story>, AppError> {
        let rows = sqlx::query_as::<_, StoryRow>(
            r#"
            DELETE FROM stories WHERE expires_at <= $1
            RETURNING id, user_id, media_url, media_kind, caption, views_count, expires_at, created_at
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
