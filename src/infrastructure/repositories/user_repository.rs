//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait.
//! Maps between the database schema and domain User entity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Page, Pagination, User, UserRepository};
use crate::infrastructure::database::is_unique_violation;
use crate::shared::error::AppError;

/// Column list selected whenever a full user row is needed.
pub(crate) const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.full_name, \
     u.bio, u.website, u.avatar_url, u.is_private, u.is_verified, u.posts_count, \
     u.followers_count, u.following_count, u.created_at, u.updated_at";

/// Database row representation of the users table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    full_name: Option<String>,
    bio: Option<String>,
    website: Option<String>,
    avatar_url: Option<String>,
    is_private: bool,
    is_verified: bool,
    posts_count: i64,
    followers_count: i64,
    following_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert database row to domain User entity.
    pub(crate) fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            full_name: self.full_name,
            bio: self.bio,
            website: self.website,
            avatar_url: self.avatar_url,
            is_private: self.is_private,
            is_verified: self.is_verified,
            posts_count: self.posts_count,
            followers_count: self.followers_count,
            following_count: self.following_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: &str, value: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE {filter}");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(UserRow::into_user))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ANY($1)");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_one("LOWER(u.email) = LOWER($1)", email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.find_one("LOWER(u.username) = LOWER($1)", username).await
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        let sql = format!(
            r#"
            INSERT INTO users AS u (id, username, email, password_hash, full_name, bio, website,
                               avatar_url, is_private, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.full_name)
            .bind(&user.bio)
            .bind(&user.website)
            .bind(&user.avatar_url)
            .bind(user.is_private)
            .bind(user.is_verified)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::bad_request("USER_EXISTS", "User with this email or username already exists")
                } else {
                    AppError::Database(e)
                }
            })?;

        Ok(row.into_user())
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        let sql = format!(
            r#"
            UPDATE users AS u
            SET full_name = $2,
                bio = $3,
                website = $4,
                avatar_url = $5,
                is_private = $6,
                password_hash = $7,
                updated_at = NOW()
            WHERE u.id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.full_name)
            .bind(&user.bio)
            .bind(&user.website)
            .bind(&user.avatar_url)
            .bind(user.is_private)
            .bind(&user.password_hash)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", "User not found"))?;

        Ok(row.into_user())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn search(&self, query: &str, pagination: Pagination) -> Result<Page<User>, AppError> {
        let pattern = format!("%{}%", escape_like(query));

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users u WHERE u.username ILIKE $1 OR u.full_name ILIKE $1",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {USER_COLUMNS} FROM users u
            WHERE u.username ILIKE $1 OR u.full_name ILIKE $1
            ORDER BY u.followers_count DESC, u.username ASC
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&pattern)
            .bind(pagination.take())
            .bind(pagination.skip())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(rows.into_iter().map(UserRow::into_user).collect(), total))
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `LIKE`.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
