//! Post Repository Implementation
//!
//! PostgreSQL implementation of the PostRepository trait. Posts are loaded
//! first and their media attached with a second query per page.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::user_repository::{UserRow, USER_COLUMNS};
use crate::domain::{Media, MediaKind, Page, Pagination, Post, PostRepository, User};
use crate::shared::error::AppError;

const POST_COLUMNS: &str = "p.id, p.user_id, p.caption, p.location, p.likes_count, \
     p.comments_count, p.likes_enabled, p.comments_enabled, p.is_archived, \
     p.created_at, p.updated_at";

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: i64,
    user_id: i64,
    caption: Option<String>,
    location: Option<String>,
    likes_count: i64,
    comments_count: i64,
    likes_enabled: bool,
    comments_enabled: bool,
    is_archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRow {
    fn into_post(self, media: Vec<Media>) -> Post {
        Post {
            id: self.id,
            user_id: self.user_id,
            caption: self.caption,
            location: self.location,
            likes_count: self.likes_count,
            comments_count: self.comments_count,
            likes_enabled: self.likes_enabled,
            comments_enabled: self.comments_enabled,
            is_archived: self.is_archived,
            media,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MediaRow {
    id: i64,
    post_id: i64,
    url: String,
    kind: String,
    width: Option<i32>,
    height: Option<i32>,
    position: i32,
}

impl MediaRow {
    fn into_media(self) -> Media {
        Media {
            id: self.id,
            post_id: self.post_id,
            url: self.url,
            kind: MediaKind::from_str(&self.kind),
            width: self.width,
            height: self.height,
            position: self.position,
        }
    }
}

/// Which posts a listing selects.
enum PostScope<'a> {
    Author { user_id: i64, archived: bool },
    Authors(&'a [i64]),
    Explore { exclude_user: Option<i64> },
    Hashtag(&'a str),
}

impl PostScope<'_> {
    fn push_filter(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Self::Author { user_id, archived } => {
                qb.push("p.user_id = ")
                    .push_bind(*user_id)
                    .push(" AND p.is_archived = ")
                    .push_bind(*archived);
            }
            Self::Authors(ids) => {
                qb.push("p.is_archived = FALSE AND p.user_id = ANY(")
                    .push_bind(ids.to_vec())
                    .push(")");
            }
            Self::Explore { exclude_user } => {
                qb.push("p.is_archived = FALSE AND u.is_private = FALSE");
                if let Some(user_id) = exclude_user {
                    qb.push(" AND p.user_id <> ").push_bind(*user_id);
                }
            }
            Self::Hashtag(tag) => {
                qb.push(
                    "p.is_archived = FALSE AND u.is_private = FALSE AND p.id IN (\
                     SELECT ph.post_id FROM post_hashtags ph \
                     JOIN hashtags h ON h.id = ph.hashtag_id WHERE h.name = ",
                )
                .push_bind(tag.to_string())
                .push(")");
            }
        }
    }

    fn order(&self) -> &'static str {
        match self {
            Self::Explore { .. } => "p.likes_count DESC, p.created_at DESC",
            _ => "p.created_at DESC",
        }
    }
}

/// PostgreSQL post repository implementation.
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach media to each row, preserving row order.
    async fn with_media(&self, rows: Vec<PostRow>) -> Result<Vec<Post>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let media = sqlx::query_as::<_, MediaRow>(
            r#"
            SELECT id, post_id, url, kind, width, height, position
            FROM post_media
            WHERE post_id = ANY($1)
            ORDER BY position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_post: HashMap<i64, Vec<Media>> = HashMap::new();
        for row in media {
            by_post.entry(row.post_id).or_default().push(row.into_media());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let media = by_post.remove(&row.id).unwrap_or_default();
                row.into_post(media)
            })
            .collect())
    }

    /// Count and fetch one page of posts matching `scope`.
    async fn page(&self, scope: PostScope<'_>, pagination: Pagination) -> Result<Page<Post>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM posts p JOIN users u ON u.id = p.user_id WHERE ",
        );
        scope.push_filter(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut list = QueryBuilder::<Postgres>::new(format!(
            "SELECT {POST_COLUMNS} FROM posts p JOIN users u ON u.id = p.user_id WHERE "
        ));
        scope.push_filter(&mut list);
        list.push(" ORDER BY ")
            .push(scope.order())
            .push(" LIMIT ")
            .push_bind(pagination.take())
            .push(" OFFSET ")
            .push_bind(pagination.skip());
        let rows = list.build_query_as::<PostRow>().fetch_all(&self.pool).await?;

        Ok(Page::new(self.with_media(rows).await?, total))
    }

    /// Link each hashtag to the post, creating missing hashtags and
    /// incrementing `posts_count` for every new link.
    async fn link_hashtags(
        tx: &mut Transaction<'static, Postgres>,
        post_id: i64,
        hashtags: &[String],
    ) -> Result<(), AppError> {
        for name in hashtags {
            let hashtag_id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO hashtags (name) VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                "#,
            )
            .bind(name)
            .fetch_one(&mut **tx)
            .await?;

            let linked = sqlx::query(
                "INSERT INTO post_hashtags (post_id, hashtag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(hashtag_id)
            .execute(&mut **tx)
            .await?;

            if linked.rows_affected() > 0 {
                sqlx::query("UPDATE hashtags SET posts_count = posts_count + 1 WHERE id = $1")
                    .bind(hashtag_id)
                    .execute(&mut **tx)
                    .await?;
            }
        }
        Ok(())
    }

    /// Remove every hashtag link of the post, decrementing `posts_count`.
    async fn unlink_hashtags(tx: &mut Transaction<'static, Postgres>, post_id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE hashtags SET posts_count = posts_count - 1
            WHERE id IN (SELECT hashtag_id FROM post_hashtags WHERE post_id = $1)
            "#,
        )
        .bind(post_id)
        .execute(&mut **tx)
        .await?;

        sqlx::query("DELETE FROM post_hashtags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn create(&self, post: &Post, hashtags: &[String]) -> Result<Post, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO posts (id, user_id, caption, location, likes_enabled, comments_enabled,
                               is_archived, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(post.id)
        .bind(post.user_id)
        .bind(&post.caption)
        .bind(&post.location)
        .bind(post.likes_enabled)
        .bind(post.comments_enabled)
        .bind(post.is_archived)
        .bind(post.created_at)
        .execute(&mut *tx)
        .await?;

        for media in &post.media {
            sqlx::query(
                r#"
                INSERT INTO post_media (id, post_id, url, kind, width, height, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(media.id)
            .bind(post.id)
            .bind(&media.url)
            .bind(media.kind.as_str())
            .bind(media.width)
            .bind(media.height)
            .bind(media.position)
            .execute(&mut *tx)
            .await?;
        }

        Self::link_hashtags(&mut tx, post.id, hashtags).await?;

        sqlx::query("UPDATE users SET posts_count = posts_count + 1 WHERE id = $1")
            .bind(post.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.find_by_id(post.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("post {} missing after insert", post.id)))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, AppError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.with_media(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update(&self, post: &Post, hashtags: Option<&[String]>) -> Result<Post, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE posts
            SET caption = $2,
                location = $3,
                likes_enabled = $4,
                comments_enabled = $5,
                is_archived = $6,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(post.id)
        .bind(&post.caption)
        .bind(&post.location)
        .bind(post.likes_enabled)
        .bind(post.comments_enabled)
        .bind(post.is_archived)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::not_found("POST_NOT_FOUND", "Post not found"));
        }

        if let Some(hashtags) = hashtags {
            Self::unlink_hashtags(&mut tx, post.id).await?;
            Self::link_hashtags(&mut tx, post.id, hashtags).await?;
        }

        tx.commit().await?;

        self.find_by_id(post.id)
            .await?
            .ok_or_else(|| AppError::not_found("POST_NOT_FOUND", "Post not found"))
    }

    async fn delete(&self, id: i64) -> Result<Option<Post>, AppError> {
        let Some(post) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut tx = self.pool.begin().await?;

        Self::unlink_hashtags(&mut tx, id).await?;

        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("UPDATE users SET posts_count = posts_count - 1 WHERE id = $1")
            .bind(post.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(post))
    }

    async fn find_by_user(
        &self,
        user_id: i64,
        archived: bool,
        pagination: Pagination,
    ) -> Result<Page<Post>, AppError> {
        self.page(PostScope::Author { user_id, archived }, pagination).await
    }

    async fn feed(&self, author_ids: &[i64], pagination: Pagination) -> Result<Page<Post>, AppError> {
        if author_ids.is_empty() {
            return Ok(Page::empty());
        }
        self.page(PostScope::Authors(author_ids), pagination).await
    }

    async fn explore(&self, exclude_user: Option<i64>, pagination: Pagination) -> Result<Page<Post>, AppError> {
        self.page(PostScope::Explore { exclude_user }, pagination).await
    }

    async fn find_by_hashtag(&self, tag: &str, pagination: Pagination) -> Result<Page<Post>, AppError> {
        self.page(PostScope::Hashtag(tag), pagination).await
    }

    async fn add_like(&self, post_id: i64, user_id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO likes (user_id, post_id) VALUES ($1, $2) ON CONFLICT (user_id, post_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn remove_like(&self, post_id: i64, user_id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE posts SET likes_count = likes_count - 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn has_liked(&self, post_id: i64, user_id: i64) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn liked_post_ids(&self, user_id: i64, post_ids: &[i64]) -> Result<Vec<i64>, AppError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT post_id FROM likes WHERE user_id = $1 AND post_id = ANY($2)",
        )
        .bind(user_id)
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn likers(&self, post_id: i64, pagination: Pagination) -> Result<Page<User>, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            r#"
            SELECT {USER_COLUMNS} FROM likes l
            JOIN users u ON u.id = l.user_id
            WHERE l.post_id = $1
            ORDER BY l.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(post_id)
            .bind(pagination.take())
            .bind(pagination.skip())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(rows.into_iter().map(UserRow::into_user).collect(), total))
    }
}
