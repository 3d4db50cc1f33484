//! Follow Repository Implementation
//!
//! Edge writes and the `followers_count` / `following_count` deltas of both
//! endpoints share one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::user_repository::{UserRow, USER_COLUMNS};
use crate::domain::{Follow, FollowRepository, FollowStatus, Page, Pagination, User};
use crate::infrastructure::database::is_unique_violation;
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct FollowRow {
    follower_id: i64,
    following_id: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl FollowRow {
    fn into_follow(self) -> Follow {
        Follow {
            follower_id: self.follower_id,
            following_id: self.following_id,
            status: FollowStatus::from_str(&self.status),
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL follow repository implementation.
#[derive(Clone)]
pub struct PgFollowRepository {
    pool: PgPool,
}

impl PgFollowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply `delta` to both sides of an accepted edge.
    async fn shift_counters(
        tx: &mut Transaction<'static, Postgres>,
        follower_id: i64,
        following_id: i64,
        delta: i64,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET following_count = following_count + $2 WHERE id = $1")
            .bind(follower_id)
            .bind(delta)
            .execute(&mut **tx)
            .await?;
        sqlx::query("UPDATE users SET followers_count = followers_count + $2 WHERE id = $1")
            .bind(following_id)
            .bind(delta)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn user_page(
        &self,
        count_sql: &str,
        list_sql: &str,
        user_id: i64,
        pagination: Pagination,
    ) -> Result<Page<User>, AppError> {
        let total = sqlx::query_scalar::<_, i64>(count_sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, UserRow>(list_sql)
            .bind(user_id)
            .bind(pagination.take())
            .bind(pagination.skip())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(rows.into_iter().map(UserRow::into_user).collect(), total))
    }
}

#[async_trait]
impl FollowRepository for PgFollowRepository {
    async fn find(&self, follower_id: i64, following_id: i64) -> Result<Option<Follow>, AppError> {
        let row = sqlx::query_as::<_, FollowRow>(
            r#"
            SELECT follower_id, following_id, status, created_at
            FROM follows
            WHERE follower_id = $1 AND following_id = $2
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FollowRow::into_follow))
    }

    async fn create(&self, follow: &Follow) -> Result<Follow, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, FollowRow>(
            r#"
            INSERT INTO follows (follower_id, following_id, status, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING follower_id, following_id, status, created_at
            "#,
        )
        .bind(follow.follower_id)
        .bind(follow.following_id)
        .bind(follow.status.as_str())
        .bind(follow.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::bad_request("ALREADY_FOLLOWING", "Already following this user")
            } else {
                AppError::Database(e)
            }
        })?;

        if follow.is_accepted() {
            Self::shift_counters(&mut tx, follow.follower_id, follow.following_id, 1).await?;
        }

        tx.commit().await?;
        Ok(row.into_follow())
    }

    async fn accept(&self, follower_id: i64, following_id: i64) -> Result<Option<Follow>, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, FollowRow>(
            r#"
            UPDATE follows SET status = 'accepted'
            WHERE follower_id = $1 AND following_id = $2 AND status = 'pending'
            RETURNING follower_id, following_id, status, created_at
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Self::shift_counters(&mut tx, follower_id, following_id, 1).await?;
        tx.commit().await?;

        Ok(Some(row.into_follow()))
    }

    async fn delete(&self, follower_id: i64, following_id: i64) -> Result<Option<Follow>, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, FollowRow>(
            r#"
            DELETE FROM follows
            WHERE follower_id = $1 AND following_id = $2
            RETURNING follower_id, following_id, status, created_at
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let follow = row.into_follow();
        if follow.is_accepted() {
            Self::shift_counters(&mut tx, follower_id, following_id, -1).await?;
        }
        tx.commit().await?;

        Ok(Some(follow))
    }

    async fn followers(&self, user_id: i64, pagination: Pagination) -> Result<Page<User>, AppError> {
        let list_sql = format!(
            r#"
            SELECT {USER_COLUMNS} FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = $1 AND f.status = 'accepted'
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );
        self.user_page(
            "SELECT COUNT(*) FROM follows WHERE following_id = $1 AND status = 'accepted'",
            &list_sql,
            user_id,
            pagination,
        )
        .await
    }

    async fn following(&self, user_id: i64, pagination: Pagination) -> Result<Page<User>, AppError> {
        let list_sql = format!(
            r#"
            SELECT {USER_COLUMNS} FROM follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = $1 AND f.status = 'accepted'
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );
        self.user_page(
            "SELECT COUNT(*) FROM follows WHERE follower_id = $1 AND status = 'accepted'",
            &list_sql,
            user_id,
            pagination,
        )
        .await
    }

    async fn pending_requests(&self, user_id: i64, pagination: Pagination) -> Result<Page<User>, AppError> {
        let list_sql = format!(
            r#"
            SELECT {USER_COLUMNS} FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = $1 AND f.status = 'pending'
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );
        self.user_page(
            "SELECT COUNT(*) FROM follows WHERE following_id = $1 AND status = 'pending'",
            &list_sql,
            user_id,
            pagination,
        )
        .await
    }

    async fn following_ids(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT following_id FROM follows WHERE follower_id = $1 AND status = 'accepted'",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
