//! Hashtag Repository Implementation
//!
//! Read side only; links are written by [`PgPostRepository`](super::PgPostRepository).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::user_repository::escape_like;
use crate::domain::{Hashtag, HashtagRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct HashtagRow {
    id: i64,
    name: String,
    posts_count: i64,
    created_at: DateTime<Utc>,
}

impl From<HashtagRow> for Hashtag {
    fn from(row: HashtagRow) -> Self {
        Hashtag {
            id: row.id,
            name: row.name,
            posts_count: row.posts_count,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL hashtag repository implementation.
#[derive(Clone)]
pub struct PgHashtagRepository {
    pool: PgPool,
}

impl PgHashtagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HashtagRepository for PgHashtagRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Hashtag>, AppError> {
        let row = sqlx::query_as::<_, HashtagRow>(
            "SELECT id, name, posts_count, created_at FROM hashtags WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn trending(&self, limit: i64) -> Result<Vec<Hashtag>, AppError> {
        let rows = sqlx::query_as::<_, HashtagRow>(
            r#"
            SELECT id, name, posts_count, created_at FROM hashtags
            WHERE posts_count > 0
            ORDER BY posts_count DESC, name ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn search(&self, prefix: &str, limit: i64) -> Result<Vec<Hashtag>, AppError> {
        let rows = sqlx::query_as::<_, HashtagRow>(
            r#"
            SELECT id, name, posts_count, created_at FROM hashtags
            WHERE name LIKE $1
            ORDER BY posts_count DESC, name ASC
            LIMIT $2
            "#,
        )
        .bind(format!("{}%", escape_like(prefix)))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
