//! Comment Repository Implementation
//!
//! PostgreSQL implementation of the CommentRepository trait. Every row
//! inserted or removed moves the post's `comments_count` inside the same
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Comment, CommentRepository, Page, Pagination};
use crate::shared::error::AppError;

const COMMENT_COLUMNS: &str = "c.id, c.post_id, c.user_id, c.parent_id, c.content, c.likes_count, \
     (SELECT COUNT(*) FROM comments r WHERE r.parent_id = c.id) AS replies_count, \
     c.created_at, c.updated_at";

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    parent_id: Option<i64>,
    content: String,
    likes_count: i64,
    replies_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            parent_id: row.parent_id,
            content: row.content,
            likes_count: row.likes_count,
            replies_count: row.replies_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL comment repository implementation.
#[derive(Clone)]
pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn page_where(
        &self,
        filter: &str,
        id: i64,
        pagination: Pagination,
    ) -> Result<Page<Comment>, AppError> {
        let count_sql = format!("SELECT COUNT(*) FROM comments c WHERE {filter}");
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        let list_sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c WHERE {filter} \
             ORDER BY c.created_at ASC, c.id ASC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, CommentRow>(&list_sql)
            .bind(id)
            .bind(pagination.take())
            .bind(pagination.skip())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(rows.into_iter().map(Comment::from).collect(), total))
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, user_id, parent_id, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(comment.parent_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(comment.post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.find_by_id(comment.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("comment {} missing after insert", comment.id)))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = $1");
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Comment::from))
    }

    async fn update(&self, comment: &Comment) -> Result<Comment, AppError> {
        let sql = format!(
            r#"
            UPDATE comments AS c SET content = $2, updated_at = NOW()
            WHERE c.id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(comment.id)
            .bind(&comment.content)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("COMMENT_NOT_FOUND", "Comment not found"))?;

        Ok(row.into())
    }

    async fn delete(&self, id: i64) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;

        let post_ids = sqlx::query_scalar::<_, i64>(
            "DELETE FROM comments WHERE id = $1 OR parent_id = $1 RETURNING post_id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let removed = post_ids.len() as i64;
        if let Some(post_id) = post_ids.first() {
            sqlx::query("UPDATE posts SET comments_count = comments_count - $2 WHERE id = $1")
                .bind(post_id)
                .bind(removed)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn find_by_post(&self, post_id: i64, pagination: Pagination) -> Result<Page<Comment>, AppError> {
        self.page_where("c.post_id = $1 AND c.parent_id IS NULL", post_id, pagination)
            .await
    }

    async fn replies(&self, parent_id: i64, pagination: Pagination) -> Result<Page<Comment>, AppError> {
        self.page_where("c.parent_id = $1", parent_id, pagination).await
    }

    async fn add_like(&self, comment_id: i64, user_id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO comment_likes (user_id, comment_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE comments SET likes_count = likes_count + 1 WHERE id = $1")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn remove_like(&self, comment_id: i64, user_id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM comment_likes WHERE user_id = $1 AND comment_id = $2")
            .bind(user_id)
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE comments SET likes_count = likes_count - 1 WHERE id = $1")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn liked_comment_ids(&self, user_id: i64, comment_ids: &[i64]) -> Result<Vec<i64>, AppError> {
        if comment_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT comment_id FROM comment_likes WHERE user_id = $1 AND comment_id = ANY($2)",
        )
        .bind(user_id)
        .bind(comment_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
